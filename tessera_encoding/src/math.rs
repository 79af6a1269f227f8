// Copyright 2026 the Tessera Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Points, rectangles and the 2D affine transform used throughout the encoding.

use std::ops::{Add, Mul, Sub};

use bytemuck::{Pod, Zeroable};

/// A 2D point or vector.
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

/// Shorthand for [`Point::new`].
#[inline]
pub const fn pt(x: f32, y: f32) -> Point {
    Point { x, y }
}

impl Point {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    #[inline]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    #[inline]
    pub fn scale(self, s: f32) -> Self {
        Self::new(self.x * s, self.y * s)
    }

    #[inline]
    pub fn dot(self, other: Self) -> f32 {
        self.x * other.x + self.y * other.y
    }

    /// The z component of the 3D cross product.
    #[inline]
    pub fn cross(self, other: Self) -> f32 {
        self.x * other.y - self.y * other.x
    }

    #[inline]
    pub fn length(self) -> f32 {
        self.x.hypot(self.y)
    }

    #[inline]
    pub fn distance(self, other: Self) -> f32 {
        (self - other).length()
    }

    /// Returns the vector scaled to `len`, or zero for a zero vector.
    pub fn normalize_to(self, len: f32) -> Self {
        let l = self.length();
        if l == 0.0 {
            return Self::ZERO;
        }
        self.scale(len / l)
    }

    /// Rotates by 90 degrees counter-clockwise (in a y-down coordinate system, visually clockwise).
    #[inline]
    pub fn rot90_ccw(self) -> Self {
        Self::new(-self.y, self.x)
    }

    #[inline]
    pub fn rot90_cw(self) -> Self {
        Self::new(self.y, -self.x)
    }

    #[inline]
    pub fn lerp(self, other: Self, t: f32) -> Self {
        Self::new(
            self.x + (other.x - self.x) * t,
            self.y + (other.y - self.y) * t,
        )
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    pub(crate) fn to_bits(self) -> [u32; 2] {
        [self.x.to_bits(), self.y.to_bits()]
    }
}

impl Add for Point {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Self::new(self.x + other.x, self.y + other.y)
    }
}

impl Sub for Point {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Self::new(self.x - other.x, self.y - other.y)
    }
}

/// Axis-aligned rectangle; `min` is inclusive and `max` exclusive.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Rect {
    pub min: Point,
    pub max: Point,
}

impl Rect {
    /// The empty rectangle. Its union with any rectangle is that rectangle.
    pub const EMPTY: Self = Self {
        min: Point::new(f32::INFINITY, f32::INFINITY),
        max: Point::new(f32::NEG_INFINITY, f32::NEG_INFINITY),
    };

    /// A rectangle covering the whole plane.
    pub const INFINITE: Self = Self {
        min: Point::new(f32::NEG_INFINITY, f32::NEG_INFINITY),
        max: Point::new(f32::INFINITY, f32::INFINITY),
    };

    pub const fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self {
            min: Point::new(x0, y0),
            max: Point::new(x1, y1),
        }
    }

    /// Builds a rectangle spanning both points regardless of their order.
    pub fn from_points(a: Point, b: Point) -> Self {
        Self::new(a.x.min(b.x), a.y.min(b.y), a.x.max(b.x), a.y.max(b.y))
    }

    pub fn width(&self) -> f32 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f32 {
        self.max.y - self.min.y
    }

    pub fn is_empty(&self) -> bool {
        !(self.min.x < self.max.x && self.min.y < self.max.y)
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.min.x && p.x < self.max.x && p.y >= self.min.y && p.y < self.max.y
    }

    /// Grows the rectangle to include `p`.
    pub fn include(&mut self, p: Point) {
        self.min.x = self.min.x.min(p.x);
        self.min.y = self.min.y.min(p.y);
        self.max.x = self.max.x.max(p.x);
        self.max.y = self.max.y.max(p.y);
    }

    pub fn union(&self, other: &Self) -> Self {
        Self::new(
            self.min.x.min(other.min.x),
            self.min.y.min(other.min.y),
            self.max.x.max(other.max.x),
            self.max.y.max(other.max.y),
        )
    }

    pub fn intersect(&self, other: &Self) -> Self {
        let r = Self::new(
            self.min.x.max(other.min.x),
            self.min.y.max(other.min.y),
            self.max.x.min(other.max.x),
            self.max.y.min(other.max.y),
        );
        if r.is_empty() {
            return Self::default();
        }
        r
    }

    /// Grows the rectangle by `d` on every side.
    pub fn inflate(&self, d: f32) -> Self {
        Self::new(
            self.min.x - d,
            self.min.y - d,
            self.max.x + d,
            self.max.y + d,
        )
    }

    /// Smallest integer rectangle containing `self`, saturating at the `i32` range.
    pub fn round_out(&self) -> [i32; 4] {
        [
            self.min.x.floor() as i32,
            self.min.y.floor() as i32,
            self.max.x.ceil() as i32,
            self.max.y.ceil() as i32,
        ]
    }

    /// Bounding box of the rectangle after transformation.
    pub fn transform(&self, t: &Affine2D) -> Self {
        if self.is_empty() {
            return Self::default();
        }
        let mut r = Self::EMPTY;
        for p in [
            self.min,
            Point::new(self.max.x, self.min.y),
            self.max,
            Point::new(self.min.x, self.max.y),
        ] {
            r.include(t.transform(p));
        }
        r
    }
}

/// 2D affine transformation.
///
/// Maps `(x, y)` to `(sx*x + hx*y + ox, hy*x + sy*y + oy)`. Every builder method returns a new
/// transform that applies the operation *after* `self`.
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct Affine2D {
    sx: f32,
    hx: f32,
    ox: f32,
    hy: f32,
    sy: f32,
    oy: f32,
}

impl Default for Affine2D {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Affine2D {
    /// Identity transform.
    pub const IDENTITY: Self = Self::new(1.0, 0.0, 0.0, 0.0, 1.0, 0.0);

    /// Creates a transform from its coefficients, in the order returned by [`Self::elems`].
    pub const fn new(sx: f32, hx: f32, ox: f32, hy: f32, sy: f32, oy: f32) -> Self {
        Self {
            sx,
            hx,
            ox,
            hy,
            sy,
            oy,
        }
    }

    /// Translates by `v` after `self`.
    pub fn offset(self, v: Point) -> Self {
        Self {
            ox: self.ox + v.x,
            oy: self.oy + v.y,
            ..self
        }
    }

    /// Scales by `factor` around `pivot` after `self`.
    pub fn scale(self, pivot: Point, factor: Point) -> Self {
        let s = Self::new(
            factor.x,
            0.0,
            pivot.x - factor.x * pivot.x,
            0.0,
            factor.y,
            pivot.y - factor.y * pivot.y,
        );
        s * self
    }

    /// Rotates by `radians` around `pivot` after `self`.
    pub fn rotate(self, pivot: Point, radians: f32) -> Self {
        let (sin, cos) = radians.sin_cos();
        Self::around(pivot, cos, -sin, sin, cos) * self
    }

    /// Shears by the angles `ax` (along x) and `ay` (along y) around `pivot` after `self`.
    pub fn shear(self, pivot: Point, ax: f32, ay: f32) -> Self {
        let (tx, ty) = (ax.tan(), ay.tan());
        Self::around(pivot, 1.0, tx, ty, 1.0) * self
    }

    /// The linear map `[a b; c d]` conjugated by a translation to `pivot`.
    fn around(pivot: Point, a: f32, b: f32, c: f32, d: f32) -> Self {
        Self::new(
            a,
            b,
            pivot.x - a * pivot.x - b * pivot.y,
            c,
            d,
            pivot.y - c * pivot.x - d * pivot.y,
        )
    }

    /// Composes two transforms: the result applies `other` first, then `self`.
    pub fn mul(self, other: Self) -> Self {
        Self {
            sx: self.sx * other.sx + self.hx * other.hy,
            hx: self.sx * other.hx + self.hx * other.sy,
            ox: self.sx * other.ox + self.hx * other.oy + self.ox,
            hy: self.hy * other.sx + self.sy * other.hy,
            sy: self.hy * other.hx + self.sy * other.sy,
            oy: self.hy * other.ox + self.sy * other.oy + self.oy,
        }
    }

    /// Inverse transform. The result is not finite when `self` is singular.
    pub fn invert(self) -> Self {
        if self.sx == 1.0 && self.hx == 0.0 && self.hy == 0.0 && self.sy == 1.0 {
            return Self::IDENTITY.offset(Point::new(-self.ox, -self.oy));
        }
        let det = self.determinant();
        let sx = self.sy / det;
        let sy = self.sx / det;
        let hx = -self.hx / det;
        let hy = -self.hy / det;
        Self {
            sx,
            hx,
            ox: -sx * self.ox - hx * self.oy,
            hy,
            sy,
            oy: -hy * self.ox - sy * self.oy,
        }
    }

    pub fn determinant(&self) -> f32 {
        self.sx * self.sy - self.hx * self.hy
    }

    /// Whether the transform can be inverted to finite coefficients.
    pub fn is_invertible(&self) -> bool {
        let det = self.determinant();
        det != 0.0 && det.is_finite()
    }

    /// Whether the transform is a pure translation.
    pub fn is_translation(&self) -> bool {
        self.sx == 1.0 && self.hx == 0.0 && self.hy == 0.0 && self.sy == 1.0
    }

    /// Whether the transform maps axis-aligned rectangles to axis-aligned rectangles.
    pub fn is_axis_aligned(&self) -> bool {
        self.hx == 0.0 && self.hy == 0.0
    }

    pub fn transform(&self, p: Point) -> Point {
        Point::new(
            p.x * self.sx + p.y * self.hx + self.ox,
            p.x * self.hy + p.y * self.sy + self.oy,
        )
    }

    /// Transforms a vector, ignoring the translation.
    pub fn transform_vector(&self, v: Point) -> Point {
        Point::new(v.x * self.sx + v.y * self.hx, v.x * self.hy + v.y * self.sy)
    }

    /// Returns the coefficients `(sx, hx, ox, hy, sy, oy)`.
    pub fn elems(&self) -> (f32, f32, f32, f32, f32, f32) {
        (self.sx, self.hx, self.ox, self.hy, self.sy, self.oy)
    }

    /// Splits the transform into its linear part and its translation.
    pub fn split(self) -> (Self, Point) {
        (
            Self {
                ox: 0.0,
                oy: 0.0,
                ..self
            },
            Point::new(self.ox, self.oy),
        )
    }

    /// Largest factor by which the transform can stretch a unit vector.
    pub fn max_scale(&self) -> f32 {
        // Square root of the largest eigenvalue of MᵀM.
        let a = self.sx * self.sx + self.hy * self.hy;
        let b = self.sx * self.hx + self.hy * self.sy;
        let c = self.hx * self.hx + self.sy * self.sy;
        let mean = 0.5 * (a + c);
        let d = (0.25 * (a - c) * (a - c) + b * b).sqrt();
        (mean + d).sqrt()
    }

    pub(crate) fn to_bits(self) -> [u32; 6] {
        let (sx, hx, ox, hy, sy, oy) = self.elems();
        [sx, hx, ox, hy, sy, oy].map(f32::to_bits)
    }

    pub(crate) fn from_bits(bits: [u32; 6]) -> Self {
        let [sx, hx, ox, hy, sy, oy] = bits.map(f32::from_bits);
        Self::new(sx, hx, ox, hy, sy, oy)
    }
}

impl Mul for Affine2D {
    type Output = Self;

    #[inline]
    fn mul(self, other: Self) -> Self {
        Self::mul(self, other)
    }
}

/// Computes the transform that advances a point along an elliptical arc by one segment.
///
/// The ellipse passes through `p` and has foci `f1` and `f2`; the sweep `angle` is split into
/// `segments` equal steps. The returned transform maps a point on the ellipse to a point half a
/// step further along it, so applying it twice advances one segment.
pub fn arc_transform(p: Point, f1: Point, f2: Point, angle: f32, segments: u32) -> Affine2D {
    let (rx, ry, alpha) = if f1 == f2 {
        let r = f1.distance(p);
        (r, r, 0.0)
    } else {
        // 2a = |PF1| + |PF2|, c² = a² - b².
        let a = 0.5 * (f1.distance(p) + f2.distance(p));
        let c = 0.5 * f1.distance(f2);
        let b = (a * a - c * c).max(0.0).sqrt();
        let alpha = if f1.x == f2.x {
            if f1.y < f2.y {
                -std::f32::consts::FRAC_PI_2
            } else {
                std::f32::consts::FRAC_PI_2
            }
        } else {
            ((f1.x - f2.x).abs() * 0.5 / c).clamp(-1.0, 1.0).acos()
        };
        (a, b, alpha)
    };
    let theta = angle / segments.max(1) as f32;
    let center = f1.lerp(f2, 0.5);
    // Map the ellipse onto the unit circle, rotate, then map back.
    let to_circle = Affine2D::IDENTITY
        .offset(Point::ZERO - center)
        .rotate(Point::ZERO, -alpha)
        .scale(Point::ZERO, Point::new(1.0 / rx, 1.0 / ry));
    let rot = Affine2D::IDENTITY.rotate(Point::ZERO, 0.5 * theta);
    to_circle.invert() * rot * to_circle
}
