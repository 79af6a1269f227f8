// Copyright 2026 the Tessera Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::hash::{DefaultHasher, Hash, Hasher};

use peniko::Color;

use tessera_encoding::clip::{Dashes, StrokeStyle};
use tessera_encoding::paint::{ImageOp, LinearGradientOp, RadialGradientOp};
use tessera_encoding::{Affine2D, Rect};

/// List of [`Command`]s for an engine to execute in order.
#[derive(Default, Debug)]
pub struct Recording<'a> {
    pub commands: Vec<Command<'a>>,
}

/// Single command inside a [`Recording`] to get executed by an engine.
#[derive(Debug)]
pub enum Command<'a> {
    /// Fill the whole target with a linear premultiplied color.
    Clear([f32; 4]),
    Draw(DrawParams<'a>),
}

/// Identifies the device geometry built for a clip path.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct PathKey {
    /// Content hash of the path segments, or of the rectangle bounds.
    pub hash: u64,
    /// Stroke width, miter, cap and join bits; zero for fills.
    pub stroke: [u32; 4],
    /// Hash of the dash pattern; zero when solid.
    pub dashes: u64,
    /// Flattening level of detail, the binary exponent of the transform scale.
    pub lod: i8,
}

impl PathKey {
    pub fn new(
        hash: u64,
        stroke: Option<&StrokeStyle>,
        dashes: Option<&Dashes>,
        transform: &Affine2D,
    ) -> Self {
        let stroke = stroke.map_or([0; 4], |s| {
            [
                s.width.to_bits(),
                s.miter.to_bits(),
                s.cap as u32 + 1,
                s.join as u32 + 1,
            ]
        });
        let dashes = dashes.map_or(0, |d| {
            let mut h = DefaultHasher::new();
            d.phase.to_bits().hash(&mut h);
            for l in d.lengths.iter() {
                l.to_bits().hash(&mut h);
            }
            h.finish()
        });
        Self {
            hash,
            stroke,
            dashes,
            lod: lod(transform),
        }
    }

    /// Flattening tolerance in path units for a device space `tolerance`.
    pub fn tolerance(&self, tolerance: f32) -> f32 {
        tolerance / 2.0_f32.powi(i32::from(self.lod))
    }
}

fn lod(transform: &Affine2D) -> i8 {
    let scale = transform.max_scale();
    if !(scale > 0.0) || !scale.is_finite() {
        return 0;
    }
    scale.log2().ceil().clamp(-32.0, 32.0) as i8
}

/// Source of a clip path's geometry.
#[derive(Copy, Clone, Debug)]
pub enum ClipGeometry<'a> {
    /// Encoded path segments of an aux block.
    Path(&'a [u8]),
    /// A rectangle that does not map to a device aligned rectangle.
    Rect(Rect),
}

/// A clip path intersected into the coverage of a draw.
#[derive(Clone, Debug)]
pub struct ClipPath<'a> {
    pub key: PathKey,
    pub geometry: ClipGeometry<'a>,
    pub stroke: Option<StrokeStyle>,
    pub dashes: Option<Dashes>,
    /// Maps path coordinates to device pixels.
    pub transform: Affine2D,
}

/// The material of a draw, in user space.
#[derive(Clone, Debug)]
pub enum MaterialParams {
    Color(Color),
    LinearGradient(LinearGradientOp),
    RadialGradient(RadialGradientOp),
    Image(ImageOp),
}

/// Fill the scissor rectangle, masked by the clip paths, with a material.
#[derive(Clone, Debug)]
pub struct DrawParams<'a> {
    /// Device pixel bounds `[x0, y0, x1, y1)`, never empty.
    pub scissor: [u32; 4],
    pub clips: Vec<ClipPath<'a>>,
    pub material: MaterialParams,
    /// Maps user space to device pixels.
    pub transform: Affine2D,
    pub opacity: f32,
}

impl<'a> Recording<'a> {
    /// Appends a [`Command`] to the back of the [`Recording`].
    pub fn push(&mut self, cmd: Command<'a>) {
        self.commands.push(cmd);
    }

    pub fn clear(&mut self, color: [f32; 4]) {
        self.push(Command::Clear(color));
    }

    /// Issue a draw.
    pub fn draw(&mut self, params: DrawParams<'a>) {
        self.push(Command::Draw(params));
    }

    /// Number of draws.
    pub fn draw_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, Command::Draw(_)))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use tessera_encoding::clip::StrokeCap;
    use tessera_encoding::pt;

    use super::*;

    #[test]
    fn path_keys() {
        let id = Affine2D::IDENTITY;
        let fill = PathKey::new(1, None, None, &id);
        let style = StrokeStyle::new(2.0);
        let stroke = PathKey::new(1, Some(&style), None, &id);
        assert_ne!(fill, stroke);
        let square = style.with_cap(StrokeCap::Square);
        assert_ne!(stroke, PathKey::new(1, Some(&square), None, &id));
        let dashes = Dashes::new(0.0, [1.0, 2.0]);
        let dashed = PathKey::new(1, Some(&style), Some(&dashes), &id);
        assert_ne!(stroke, dashed);
        assert_eq!(dashed, PathKey::new(1, Some(&style), Some(&dashes), &id));
        // Translation keeps the key, scaling changes the level of detail.
        let moved = Affine2D::IDENTITY.offset(pt(10.0, 3.0));
        assert_eq!(fill, PathKey::new(1, None, None, &moved));
        let scaled = Affine2D::IDENTITY.scale(pt(0.0, 0.0), pt(4.0, 4.0));
        let big = PathKey::new(1, None, None, &scaled);
        assert_eq!(big.lod, 2);
        assert!((big.tolerance(0.25) - 0.0625).abs() < 1e-6);
    }
}
