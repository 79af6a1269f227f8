// Copyright 2026 the Tessera Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use tessera::encoding::{clip, op, paint, pt, Rect};
use tessera::peniko::color::palette;
use tessera::Ops;
use tessera_tests::{render_sync, Harness, TestParams};

const RED: [u8; 4] = [255, 0, 0, 255];
const CLEAR: [u8; 4] = [0, 0, 0, 0];

#[test]
fn simple_rect() {
    let mut ops = Ops::new();
    let stack = clip::Rect::new(0, 0, 50, 50).push(&mut ops);
    paint::fill(&mut ops, palette::css::RED);
    stack.pop(&mut ops);

    let image = render_sync(&ops, &TestParams::new("simple_rect", 100, 100)).unwrap();
    assert_eq!(image.pixel(0, 0), RED);
    assert_eq!(image.pixel(49, 49), RED);
    assert_eq!(image.pixel(60, 0), CLEAR);
    assert_eq!(image.pixel(50, 10), CLEAR);
    assert_eq!(image.count(RED), 50 * 50);
    assert_eq!(image.count(CLEAR), 100 * 100 - 50 * 50);
}

#[test]
fn empty_ops_show_base_color() {
    let ops = Ops::new();
    let color = palette::css::PLUM;
    let params = TestParams {
        base_color: Some(color),
        ..TestParams::new("empty_ops", 20, 20)
    };
    let image = render_sync(&ops, &params).unwrap();
    let rgba = color.to_rgba8();
    let expected = [rgba.r, rgba.g, rgba.b, rgba.a];
    assert_eq!(image.count(expected), 20 * 20);
}

#[test]
fn unclipped_paint_fills_target() {
    let mut ops = Ops::new();
    paint::fill(&mut ops, palette::css::RED);
    paint::fill(&mut ops, palette::css::BLUE);

    let image = render_sync(&ops, &TestParams::new("unclipped_paint", 16, 16)).unwrap();
    assert_eq!(image.count([0, 0, 255, 255]), 16 * 16);
}

#[test]
fn offset_moves_clip() {
    let mut ops = Ops::new();
    let transform = op::offset(pt(10.0, 10.0)).push(&mut ops);
    let stack = clip::Rect::new(0, 0, 10, 10).push(&mut ops);
    paint::fill(&mut ops, palette::css::RED);
    stack.pop(&mut ops);
    transform.pop(&mut ops);
    // Painted after the pop: back in the untransformed space.
    let stack = clip::Rect::new(0, 0, 5, 5).push(&mut ops);
    paint::fill(&mut ops, palette::css::RED);
    stack.pop(&mut ops);

    let image = render_sync(&ops, &TestParams::new("offset", 40, 40)).unwrap();
    assert_eq!(image.pixel(10, 10), RED);
    assert_eq!(image.pixel(19, 19), RED);
    assert_eq!(image.pixel(20, 20), CLEAR);
    assert_eq!(image.pixel(2, 2), RED);
    assert_eq!(image.pixel(7, 7), CLEAR);
    assert_eq!(image.count(RED), 100 + 25);
}

#[test]
fn later_paint_wins() {
    let mut ops = Ops::new();
    paint::fill_shape(&mut ops, palette::css::RED, &clip::Rect::new(0, 0, 20, 20).op());
    paint::fill_shape(&mut ops, palette::css::BLUE, &clip::Rect::new(10, 0, 20, 20).op());

    let image = render_sync(&ops, &TestParams::new("later_paint", 20, 20)).unwrap();
    assert_eq!(image.pixel(5, 5), RED);
    assert_eq!(image.pixel(15, 5), [0, 0, 255, 255]);
}

#[test]
fn zero_sized_target_is_an_error() {
    let ops = Ops::new();
    let mut harness = Harness::default();
    let err = harness
        .render(&ops, &TestParams::new("zero_sized", 0, 10))
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<tessera::Error>(),
        Some(tessera::Error::InvalidTarget(0, 10))
    ));
}

#[test]
fn rerender_is_identical() {
    let mut ops = Ops::new();
    let ellipse = clip::Ellipse(Rect::new(2.0, 2.0, 18.0, 14.0)).op(&mut ops);
    paint::fill_shape(&mut ops, palette::css::RED, &ellipse);

    let mut harness = Harness::default();
    let params = TestParams::new("rerender", 20, 16);
    let first = harness.render(&ops, &params).unwrap();
    let second = harness.render(&ops, &params).unwrap();
    assert_eq!(first, second);
}
