// Copyright 2026 the Tessera Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Materials and paint operations.

use peniko::color::{palette, AlphaColor, LinearSrgb, Srgb};
use peniko::{Color, ImageData};

use crate::clip;
use crate::math::Point;
use crate::ops::{read_f32, write_f32, OpType, Ops, Ref, StackId, StackKind};

/// Sets the material to a uniform color.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ColorOp {
    pub color: Color,
}

impl ColorOp {
    pub fn new(color: Color) -> Self {
        Self { color }
    }

    pub fn add(self, ops: &mut Ops) {
        let data = ops.write(OpType::Color.size());
        data[0] = OpType::Color as u8;
        write_color(&mut data[1..5], self.color);
    }
}

/// Sets the material to a linear gradient from `color1` at `stop1` to `color2` at `stop2`.
///
/// Colors are interpolated in linear sRGB.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct LinearGradientOp {
    pub stop1: Point,
    pub color1: Color,
    pub stop2: Point,
    pub color2: Color,
}

impl LinearGradientOp {
    pub fn add(self, ops: &mut Ops) {
        let data = ops.write(OpType::LinearGradient.size());
        data[0] = OpType::LinearGradient as u8;
        write_point(&mut data[1..9], self.stop1);
        write_point(&mut data[9..17], self.stop2);
        write_color(&mut data[17..21], self.color1);
        write_color(&mut data[21..25], self.color2);
    }

    /// Gradient parameter of `p`, clamped to `[0, 1]`.
    pub fn param(&self, p: Point) -> f32 {
        let d = self.stop2 - self.stop1;
        let len2 = d.dot(d);
        if len2 == 0.0 {
            return 1.0;
        }
        ((p - self.stop1).dot(d) / len2).clamp(0.0, 1.0)
    }
}

/// Sets the material to a radial gradient centred on `center`.
///
/// `color1` is used up to `offset` times the radius, `color2` from the radius `|edge - center|`
/// outwards.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RadialGradientOp {
    pub center: Point,
    pub color1: Color,
    pub edge: Point,
    pub color2: Color,
    pub offset: f32,
}

impl RadialGradientOp {
    pub fn add(self, ops: &mut Ops) {
        let data = ops.write(OpType::RadialGradient.size());
        data[0] = OpType::RadialGradient as u8;
        write_point(&mut data[1..9], self.center);
        write_point(&mut data[9..17], self.edge);
        write_color(&mut data[17..21], self.color1);
        write_color(&mut data[21..25], self.color2);
        write_f32(&mut data[25..], self.offset);
    }

    /// Gradient parameter of `p`, clamped to `[0, 1]`.
    pub fn param(&self, p: Point) -> f32 {
        let radius = self.center.distance(self.edge);
        if radius == 0.0 {
            return 1.0;
        }
        let offset = self.offset.clamp(0.0, 1.0);
        let r = p.distance(self.center) / radius;
        if offset >= 1.0 {
            return if r < 1.0 { 0.0 } else { 1.0 };
        }
        ((r - offset) / (1.0 - offset)).clamp(0.0, 1.0)
    }
}

/// Image sampling filter.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ImageFilter {
    #[default]
    Linear = 0,
    Nearest = 1,
}

/// Sets the material to an image placed at the origin at its natural size.
#[derive(Clone, Debug)]
pub struct ImageOp {
    pub image: ImageData,
    pub filter: ImageFilter,
}

impl ImageOp {
    pub fn new(image: ImageData) -> Self {
        Self {
            image,
            filter: ImageFilter::default(),
        }
    }

    pub fn with_filter(self, filter: ImageFilter) -> Self {
        Self { filter, ..self }
    }

    pub fn add(&self, ops: &mut Ops) {
        let data = ops.write1(OpType::Image.size(), Ref::Image(self.image.clone()));
        data[0] = OpType::Image as u8;
        data[1] = self.filter as u8;
    }
}

/// Fills the current clip area with the current material.
#[derive(Copy, Clone, Debug, Default)]
pub struct PaintOp;

impl PaintOp {
    pub fn add(self, ops: &mut Ops) {
        ops.write_op(OpType::Paint);
    }
}

/// Multiplies the alpha of everything painted until the returned stack is popped.
pub fn push_opacity(ops: &mut Ops, opacity: f32) -> OpacityStack {
    let (id, macro_id) = ops.push_op(StackKind::Opacity);
    let data = ops.write(OpType::PushOpacity.size());
    data[0] = OpType::PushOpacity as u8;
    write_f32(&mut data[1..], opacity.clamp(0.0, 1.0));
    OpacityStack { id, macro_id }
}

#[must_use = "a pushed opacity must be popped"]
#[derive(Debug)]
pub struct OpacityStack {
    id: StackId,
    macro_id: u32,
}

impl OpacityStack {
    pub fn pop(self, ops: &mut Ops) {
        ops.pop_op(StackKind::Opacity, self.id, self.macro_id);
        ops.write_op(OpType::PopOpacity);
    }
}

/// Fills the current clip with `color`.
pub fn fill(ops: &mut Ops, color: Color) {
    ColorOp::new(color).add(ops);
    PaintOp.add(ops);
}

/// Fills `shape` with `color`, leaving the clip unchanged afterwards.
pub fn fill_shape(ops: &mut Ops, color: Color, shape: &clip::Op) {
    let stack = shape.push(ops);
    fill(ops, color);
    stack.pop(ops);
}

fn write_point(buf: &mut [u8], p: Point) {
    write_f32(&mut buf[0..4], p.x);
    write_f32(&mut buf[4..8], p.y);
}

fn read_point(buf: &[u8]) -> Point {
    Point::new(read_f32(&buf[0..4]), read_f32(&buf[4..8]))
}

fn write_color(buf: &mut [u8], c: Color) {
    let c = c.to_rgba8();
    buf[..4].copy_from_slice(&[c.r, c.g, c.b, c.a]);
}

fn read_color(buf: &[u8]) -> Color {
    Color::from_rgba8(buf[0], buf[1], buf[2], buf[3])
}

fn expect(data: &[u8], t: OpType) {
    if data[0] != t as u8 {
        panic!("invalid op");
    }
}

pub fn decode_color(data: &[u8]) -> Color {
    expect(data, OpType::Color);
    read_color(&data[1..5])
}

pub fn decode_linear_gradient(data: &[u8]) -> LinearGradientOp {
    expect(data, OpType::LinearGradient);
    LinearGradientOp {
        stop1: read_point(&data[1..9]),
        stop2: read_point(&data[9..17]),
        color1: read_color(&data[17..21]),
        color2: read_color(&data[21..25]),
    }
}

pub fn decode_radial_gradient(data: &[u8]) -> RadialGradientOp {
    expect(data, OpType::RadialGradient);
    RadialGradientOp {
        center: read_point(&data[1..9]),
        edge: read_point(&data[9..17]),
        color1: read_color(&data[17..21]),
        color2: read_color(&data[21..25]),
        offset: read_f32(&data[25..29]),
    }
}

pub fn decode_image(data: &[u8], refs: &[Ref]) -> ImageOp {
    expect(data, OpType::Image);
    let Some(Ref::Image(image)) = refs.first() else {
        panic!("invalid op: image without data");
    };
    ImageOp {
        image: image.clone(),
        filter: if data[1] == ImageFilter::Nearest as u8 {
            ImageFilter::Nearest
        } else {
            ImageFilter::Linear
        },
    }
}

pub fn decode_opacity(data: &[u8]) -> f32 {
    expect(data, OpType::PushOpacity);
    read_f32(&data[1..5])
}

/// Converts a color to premultiplied linear sRGB components.
pub fn linear_premul(color: Color) -> [f32; 4] {
    color.convert::<LinearSrgb>().premultiply().components
}

/// Encodes premultiplied linear sRGB components as a color.
pub fn from_linear_premul(c: [f32; 4]) -> Color {
    if c[3] <= 0.0 {
        return palette::css::TRANSPARENT;
    }
    let a = c[3].min(1.0);
    let straight = [c[0] / a, c[1] / a, c[2] / a, a];
    AlphaColor::<LinearSrgb>::new(straight).convert::<Srgb>()
}

/// Interpolates two colors in premultiplied linear sRGB.
pub fn gradient_color(c1: Color, c2: Color, t: f32) -> [f32; 4] {
    let (a, b) = (linear_premul(c1), linear_premul(c2));
    std::array::from_fn(|i| a[i] + (b[i] - a[i]) * t)
}
