// Copyright 2026 the Tessera Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::sync::Arc;

use tessera::encoding::paint::{self, ColorOp, ImageFilter, ImageOp, LinearGradientOp, PaintOp, RadialGradientOp};
use tessera::encoding::{clip, op, pt};
use tessera::peniko::color::palette;
use tessera::peniko::{Blob, ImageAlphaType, ImageData, ImageFormat};
use tessera::Ops;
use tessera_tests::{render_sync, TestParams};

const RED: [u8; 4] = [255, 0, 0, 255];
const CLEAR: [u8; 4] = [0, 0, 0, 0];

#[test]
fn linear_gradient_interpolates_in_linear_light() {
    let mut ops = Ops::new();
    LinearGradientOp {
        stop1: pt(0.0, 0.0),
        color1: palette::css::BLACK,
        stop2: pt(100.0, 0.0),
        color2: palette::css::WHITE,
    }
    .add(&mut ops);
    PaintOp.add(&mut ops);

    let image = render_sync(&ops, &TestParams::new("linear_gradient", 100, 4)).unwrap();
    let [r0, ..] = image.pixel(0, 2);
    let [r50, g50, b50, a50] = image.pixel(50, 2);
    let [r99, ..] = image.pixel(99, 2);
    assert!(r0 < r50 && r50 < r99);
    assert_eq!((r50, a50), (g50, 255));
    assert_eq!(r50, b50);
    // Halfway in linear light is well above half in sRGB.
    assert!((180..=195).contains(&r50), "{r50}");
    assert!(r99 >= 254);
}

#[test]
fn radial_gradient() {
    let mut ops = Ops::new();
    RadialGradientOp {
        center: pt(50.0, 50.0),
        color1: palette::css::RED,
        edge: pt(100.0, 50.0),
        color2: palette::css::BLUE,
        offset: 0.0,
    }
    .add(&mut ops);
    PaintOp.add(&mut ops);

    let image = render_sync(&ops, &TestParams::new("radial_gradient", 100, 100)).unwrap();
    let [r, _, b, _] = image.pixel(50, 50);
    assert!(r > 240 && b < 60, "{:?}", image.pixel(50, 50));
    // Beyond the edge the outer color extends.
    assert_eq!(image.pixel(0, 0), [0, 0, 255, 255]);
    assert_eq!(image.pixel(99, 99), [0, 0, 255, 255]);
}

#[test]
fn opacity_layer() {
    let mut ops = Ops::new();
    let opacity = paint::push_opacity(&mut ops, 0.5);
    paint::fill_shape(&mut ops, palette::css::RED, &clip::Rect::new(0, 0, 10, 10).op());
    opacity.pop(&mut ops);
    paint::fill_shape(&mut ops, palette::css::RED, &clip::Rect::new(10, 0, 20, 10).op());

    let image = render_sync(&ops, &TestParams::new("opacity", 20, 10)).unwrap();
    let [r, g, b, a] = image.pixel(5, 5);
    assert!((127..=129).contains(&a), "{a}");
    assert!(r.abs_diff(a) <= 1);
    assert_eq!((g, b), (0, 0));
    assert_eq!(image.pixel(15, 5), RED);
}

#[test]
fn nested_opacity_multiplies() {
    let mut ops = Ops::new();
    let outer = paint::push_opacity(&mut ops, 0.5);
    let inner = paint::push_opacity(&mut ops, 0.5);
    paint::fill(&mut ops, palette::css::WHITE);
    inner.pop(&mut ops);
    outer.pop(&mut ops);

    let image = render_sync(&ops, &TestParams::new("nested_opacity", 4, 4)).unwrap();
    let [.., a] = image.pixel(1, 1);
    assert!((63..=65).contains(&a), "{a}");
}

#[test]
fn image_covers_its_bounds() {
    let pixels = [
        255, 0, 0, 255, //
        0, 255, 0, 255, //
        0, 0, 255, 255, //
        255, 255, 255, 255,
    ];
    let image = ImageData {
        data: Blob::new(Arc::new(pixels.to_vec())),
        format: ImageFormat::Rgba8,
        alpha_type: ImageAlphaType::Alpha,
        width: 2,
        height: 2,
    };
    let mut ops = Ops::new();
    let transform = op::offset(pt(10.0, 10.0)).push(&mut ops);
    ImageOp::new(image).with_filter(ImageFilter::Nearest).add(&mut ops);
    PaintOp.add(&mut ops);
    transform.pop(&mut ops);

    let image = render_sync(&ops, &TestParams::new("image", 20, 20)).unwrap();
    assert_eq!(image.pixel(10, 10), RED);
    assert_eq!(image.pixel(11, 10), [0, 255, 0, 255]);
    assert_eq!(image.pixel(10, 11), [0, 0, 255, 255]);
    assert_eq!(image.pixel(11, 11), [255, 255, 255, 255]);
    assert_eq!(image.pixel(9, 10), CLEAR);
    assert_eq!(image.pixel(12, 12), CLEAR);
    assert_eq!(image.count(CLEAR), 20 * 20 - 4);
}

#[test]
fn load_restores_transform() {
    let mut ops = Ops::new();
    let state = op::save(&mut ops);
    op::offset(pt(10.0, 10.0)).add(&mut ops);
    ColorOp::new(palette::css::RED).add(&mut ops);
    state.load(&mut ops);
    let stack = clip::Rect::new(0, 0, 5, 5).push(&mut ops);
    PaintOp.add(&mut ops);
    stack.pop(&mut ops);

    let image = render_sync(&ops, &TestParams::new("load", 20, 20)).unwrap();
    // The material set after the save survives the load.
    assert_eq!(image.pixel(2, 2), RED);
    assert_eq!(image.pixel(12, 12), CLEAR);
    assert_eq!(image.count(RED), 25);
}

#[test]
fn load_keeps_current_clip() {
    let mut ops = Ops::new();
    let stack = clip::Rect::new(0, 0, 10, 10).push(&mut ops);
    let state = op::save(&mut ops);
    stack.pop(&mut ops);
    state.load(&mut ops);
    paint::fill(&mut ops, palette::css::RED.with_alpha(0.5));

    let image = render_sync(&ops, &TestParams::new("load_clip", 20, 20)).unwrap();
    assert_eq!(image.pixel(5, 5), image.pixel(15, 15));
    assert_ne!(image.pixel(15, 15), CLEAR);
}
