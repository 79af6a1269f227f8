// Copyright 2026 the Tessera Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::sync::Arc;

use tessera::encoding::paint::{ImageOp, PaintOp};
use tessera::encoding::{clip, op, paint, pt, Rect};
use tessera::peniko::color::palette;
use tessera::peniko::{Blob, ImageAlphaType, ImageData, ImageFormat};
use tessera::{Ops, RendererOptions};
use tessera_tests::{Harness, TestParams};

fn ellipse_at(ops: &mut Ops, x: f32) {
    let transform = op::offset(pt(x, 0.0)).push(ops);
    let ellipse = clip::Ellipse(Rect::new(0.0, 0.0, 20.0, 20.0)).op(ops);
    paint::fill_shape(ops, palette::css::RED, &ellipse);
    transform.pop(ops);
}

#[test]
fn unchanged_frames_reuse_device_resources() {
    let mut ops = Ops::new();
    ellipse_at(&mut ops, 0.0);
    let params = TestParams::new("reuse", 40, 20);
    let mut harness = Harness::default();

    let first = harness.render(&ops, &params).unwrap();
    let after_first = harness.stats();
    assert_eq!(harness.renderer.cached_paths(), 1);

    let second = harness.render(&ops, &params).unwrap();
    assert_eq!(harness.stats(), after_first);
    assert_eq!(first.data, second.data);
}

#[test]
fn translation_reuses_path_geometry() {
    let params = TestParams::new("translation", 60, 20);
    let mut harness = Harness::default();

    let mut ops = Ops::new();
    ellipse_at(&mut ops, 0.0);
    harness.render(&ops, &params).unwrap();
    let created = harness.stats().buffers_created;

    ops.reset();
    ellipse_at(&mut ops, 30.0);
    let image = harness.render(&ops, &params).unwrap();
    assert_eq!(harness.stats().buffers_created, created);
    assert_eq!(image.pixel(40, 10), [255, 0, 0, 255]);
    assert_eq!(image.pixel(10, 10), [0, 0, 0, 0]);
}

#[test]
fn unused_geometry_is_evicted() {
    let params = TestParams::new("eviction", 40, 20);
    let mut harness = Harness::new(RendererOptions {
        max_age: 2,
        ..RendererOptions::default()
    });
    let mut ops = Ops::new();
    ellipse_at(&mut ops, 0.0);
    harness.render(&ops, &params).unwrap();
    assert_eq!(harness.renderer.cached_paths(), 1);

    let empty = Ops::new();
    harness.render(&empty, &params).unwrap();
    assert_eq!(harness.renderer.cached_paths(), 1);
    let released = harness.stats().buffers_released;

    harness.render(&empty, &params).unwrap();
    assert_eq!(harness.renderer.cached_paths(), 0);
    assert_eq!(harness.stats().buffers_released, released + 1);
}

#[test]
fn dropping_the_renderer_releases_everything() {
    let pixels = vec![255; 4 * 4 * 4];
    let image = ImageData {
        data: Blob::new(Arc::new(pixels)),
        format: ImageFormat::Rgba8,
        alpha_type: ImageAlphaType::Alpha,
        width: 4,
        height: 4,
    };
    let mut ops = Ops::new();
    ellipse_at(&mut ops, 0.0);
    ImageOp::new(image).add(&mut ops);
    PaintOp.add(&mut ops);

    let mut harness = Harness::default();
    harness
        .render(&ops, &TestParams::new("release", 40, 20))
        .unwrap();
    let stats = harness.stats();
    assert_eq!(stats.textures_created, 1);
    assert!(stats.live() > 0);

    let Harness { device, renderer } = harness;
    drop(renderer);
    assert_eq!(device.stats().live(), 0);
}
