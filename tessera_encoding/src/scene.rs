// Copyright 2026 the Tessera Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Fixed-size scene commands consumed by the path tessellator.

use bytemuck::{Pod, Zeroable};
use peniko::Color;

use crate::math::{Affine2D, Point, Rect};

/// Size in bytes of an encoded [`Command`].
pub const COMMAND_SIZE: usize = size_of::<Command>();

static_assertions::const_assert_eq!(COMMAND_SIZE, 36);

/// Scene command opcode, stored in the low 16 bits of the first word.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
#[repr(transparent)]
pub struct SceneOp(pub u32);

impl SceneOp {
    pub const NOP: Self = Self(0);
    pub const STROKE_LINE: Self = Self(1);
    pub const FILL_LINE: Self = Self(2);
    pub const STROKE_QUAD: Self = Self(3);
    pub const FILL_QUAD: Self = Self(4);
    pub const STROKE_CUBIC: Self = Self(5);
    pub const FILL_CUBIC: Self = Self(6);
    pub const STROKE: Self = Self(7);
    pub const FILL: Self = Self(8);
    pub const LINE_WIDTH: Self = Self(9);
    pub const TRANSFORM: Self = Self(10);
    pub const BEGIN_CLIP: Self = Self(11);
    pub const END_CLIP: Self = Self(12);
    pub const FILL_IMAGE: Self = Self(13);

    /// Whether this is one of the stroke variants of a segment.
    pub fn is_stroke(self) -> bool {
        matches!(self, Self::STROKE_LINE | Self::STROKE_QUAD | Self::STROKE_CUBIC)
    }
}

/// A scene command: nine 32-bit words, the first holding the flags and opcode.
#[derive(Copy, Clone, PartialEq, Eq, Pod, Zeroable, Default)]
#[repr(C)]
pub struct Command(pub [u32; 9]);

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.op() {
            SceneOp::FILL_LINE | SceneOp::STROKE_LINE => {
                let (from, to) = decode_line(self);
                write!(f, "line({from:?} - {to:?})")
            }
            SceneOp::FILL_QUAD | SceneOp::STROKE_QUAD => {
                let (from, ctrl, to) = decode_quad(self);
                write!(f, "quad({from:?} - {ctrl:?} - {to:?})")
            }
            SceneOp::FILL_CUBIC | SceneOp::STROKE_CUBIC => {
                let (from, c1, c2, to) = decode_cubic(self);
                write!(f, "cubic({from:?} - {c1:?} - {c2:?} - {to:?})")
            }
            op => write!(f, "command({op:?}, {:?})", &self.0[1..]),
        }
    }
}

fn segment_op(fill: SceneOp, stroke: SceneOp, is_stroke: bool) -> SceneOp {
    if is_stroke {
        stroke
    } else {
        fill
    }
}

impl Command {
    fn with_op(op: SceneOp, flags: u16) -> Self {
        let mut cmd = Self::zeroed();
        cmd.0[0] = (u32::from(flags) << 16) | op.0;
        cmd
    }

    pub fn op(&self) -> SceneOp {
        SceneOp(self.0[0] & 0xffff)
    }

    pub fn flags(&self) -> u16 {
        (self.0[0] >> 16) as u16
    }

    /// Fill line segment.
    pub fn line(start: Point, end: Point) -> Self {
        Self::segment_line(start, end, false, 0)
    }

    /// Fill quadratic Bézier segment.
    pub fn quad(start: Point, ctrl: Point, end: Point) -> Self {
        Self::segment_quad(start, ctrl, end, false)
    }

    /// Fill cubic Bézier segment.
    pub fn cubic(start: Point, ctrl0: Point, ctrl1: Point, end: Point) -> Self {
        Self::segment_cubic(start, ctrl0, ctrl1, end, false)
    }

    pub fn stroke_line(start: Point, end: Point) -> Self {
        Self::segment_line(start, end, true, 0)
    }

    pub fn stroke_quad(start: Point, ctrl: Point, end: Point) -> Self {
        Self::segment_quad(start, ctrl, end, true)
    }

    pub fn stroke_cubic(start: Point, ctrl0: Point, ctrl1: Point, end: Point) -> Self {
        Self::segment_cubic(start, ctrl0, ctrl1, end, true)
    }

    /// Line segment with explicit stroke selection and flags.
    pub fn segment_line(start: Point, end: Point, is_stroke: bool, flags: u16) -> Self {
        let op = segment_op(SceneOp::FILL_LINE, SceneOp::STROKE_LINE, is_stroke);
        let mut cmd = Self::with_op(op, flags);
        cmd.0[1..3].copy_from_slice(&start.to_bits());
        cmd.0[3..5].copy_from_slice(&end.to_bits());
        cmd
    }

    fn segment_quad(start: Point, ctrl: Point, end: Point, is_stroke: bool) -> Self {
        let op = segment_op(SceneOp::FILL_QUAD, SceneOp::STROKE_QUAD, is_stroke);
        let mut cmd = Self::with_op(op, 0);
        cmd.0[1..3].copy_from_slice(&start.to_bits());
        cmd.0[3..5].copy_from_slice(&ctrl.to_bits());
        cmd.0[5..7].copy_from_slice(&end.to_bits());
        cmd
    }

    fn segment_cubic(start: Point, ctrl0: Point, ctrl1: Point, end: Point, is_stroke: bool) -> Self {
        let op = segment_op(SceneOp::FILL_CUBIC, SceneOp::STROKE_CUBIC, is_stroke);
        let mut cmd = Self::with_op(op, 0);
        cmd.0[1..3].copy_from_slice(&start.to_bits());
        cmd.0[3..5].copy_from_slice(&ctrl0.to_bits());
        cmd.0[5..7].copy_from_slice(&ctrl1.to_bits());
        cmd.0[7..9].copy_from_slice(&end.to_bits());
        cmd
    }

    /// Begins stroking with `color`.
    pub fn stroke(color: Color) -> Self {
        let mut cmd = Self::with_op(SceneOp::STROKE, 0);
        cmd.0[1] = pack_color(color);
        cmd
    }

    /// Begins filling with `color`.
    pub fn fill(color: Color) -> Self {
        let mut cmd = Self::with_op(SceneOp::FILL, 0);
        cmd.0[1] = pack_color(color);
        cmd
    }

    pub fn line_width(width: f32) -> Self {
        let mut cmd = Self::with_op(SceneOp::LINE_WIDTH, 0);
        cmd.0[1] = width.to_bits();
        cmd
    }

    pub fn transform(t: Affine2D) -> Self {
        let mut cmd = Self::with_op(SceneOp::TRANSFORM, 0);
        cmd.0[1..7].copy_from_slice(&t.to_bits());
        cmd
    }

    pub fn begin_clip(bounds: Rect) -> Self {
        Self::clip(SceneOp::BEGIN_CLIP, bounds)
    }

    pub fn end_clip(bounds: Rect) -> Self {
        Self::clip(SceneOp::END_CLIP, bounds)
    }

    fn clip(op: SceneOp, bounds: Rect) -> Self {
        let mut cmd = Self::with_op(op, 0);
        cmd.0[1..3].copy_from_slice(&bounds.min.to_bits());
        cmd.0[3..5].copy_from_slice(&bounds.max.to_bits());
        cmd
    }

    /// Fills with the image at `index` in the image table.
    pub fn fill_image(index: u32) -> Self {
        let mut cmd = Self::with_op(SceneOp::FILL_IMAGE, 0);
        cmd.0[1] = index;
        cmd
    }

    /// Writes the command as little-endian words into the first [`COMMAND_SIZE`] bytes of `buf`.
    pub fn encode(&self, buf: &mut [u8]) {
        for (word, dst) in self.0.iter().zip(buf[..COMMAND_SIZE].chunks_exact_mut(4)) {
            dst.copy_from_slice(&word.to_le_bytes());
        }
    }

    /// Reads a command from the first [`COMMAND_SIZE`] bytes of `buf`.
    pub fn decode(buf: &[u8]) -> Self {
        let buf = &buf[..COMMAND_SIZE];
        Self(std::array::from_fn(|i| {
            u32::from_le_bytes([buf[i * 4], buf[i * 4 + 1], buf[i * 4 + 2], buf[i * 4 + 3]])
        }))
    }

    fn point(&self, word: usize) -> Point {
        Point::new(f32::from_bits(self.0[word]), f32::from_bits(self.0[word + 1]))
    }
}

/// Packs a color as `R<<24 | G<<16 | B<<8 | A`.
pub fn pack_color(color: Color) -> u32 {
    let c = color.to_rgba8();
    u32::from_be_bytes([c.r, c.g, c.b, c.a])
}

pub fn unpack_color(packed: u32) -> Color {
    let [r, g, b, a] = packed.to_be_bytes();
    Color::from_rgba8(r, g, b, a)
}

fn expect_op(cmd: &Command, fill: SceneOp, stroke: SceneOp) {
    let op = cmd.op();
    if op != fill && op != stroke {
        panic!("invalid command: {op:?}");
    }
}

pub fn decode_line(cmd: &Command) -> (Point, Point) {
    expect_op(cmd, SceneOp::FILL_LINE, SceneOp::STROKE_LINE);
    (cmd.point(1), cmd.point(3))
}

pub fn decode_quad(cmd: &Command) -> (Point, Point, Point) {
    expect_op(cmd, SceneOp::FILL_QUAD, SceneOp::STROKE_QUAD);
    (cmd.point(1), cmd.point(3), cmd.point(5))
}

pub fn decode_cubic(cmd: &Command) -> (Point, Point, Point, Point) {
    expect_op(cmd, SceneOp::FILL_CUBIC, SceneOp::STROKE_CUBIC);
    (cmd.point(1), cmd.point(3), cmd.point(5), cmd.point(7))
}

pub fn decode_transform(cmd: &Command) -> Affine2D {
    expect_op(cmd, SceneOp::TRANSFORM, SceneOp::TRANSFORM);
    let mut bits = [0; 6];
    bits.copy_from_slice(&cmd.0[1..7]);
    Affine2D::from_bits(bits)
}

pub fn decode_color(cmd: &Command) -> Color {
    expect_op(cmd, SceneOp::FILL, SceneOp::STROKE);
    unpack_color(cmd.0[1])
}
