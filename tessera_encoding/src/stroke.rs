// Copyright 2026 the Tessera Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Stroke expansion: turns stroked paths into outlines fillable under the non-zero rule.
//!
//! Paths are first converted to quadratic Béziers grouped by contour. Dashing splits the
//! contours into runs, then each run is offset to both sides by half the stroke width, joined
//! and capped, and closed into rings.

use std::f32::consts::PI;

use bytemuck::{Pod, Zeroable};

use crate::clip::{Dashes, StrokeCap, StrokeJoin, StrokeStyle};
use crate::math::{arc_transform, Point, Rect};
use crate::scene::{decode_cubic, decode_line, decode_quad, Command, SceneOp};

/// Tolerance of the offset curves, in path units.
pub const STROKE_TOLERANCE: f32 = 0.01;

/// Contours that would split into more dash runs than this are stroked solid.
pub const MAX_DASH_RUNS: usize = 10_000;

/// Quadratic Bézier segment.
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct Quad {
    pub from: Point,
    pub ctrl: Point,
    pub to: Point,
}

impl Quad {
    /// A straight line as a quad.
    pub fn line(from: Point, to: Point) -> Self {
        Self {
            from,
            ctrl: from.lerp(to, 0.5),
            to,
        }
    }

    fn eval(&self, t: f32) -> Point {
        let a = self.from.lerp(self.ctrl, t);
        let b = self.ctrl.lerp(self.to, t);
        a.lerp(b, t)
    }

    fn deriv(&self, t: f32) -> Point {
        (self.ctrl - self.from).scale(2.0 * (1.0 - t)) + (self.to - self.ctrl).scale(2.0 * t)
    }

    /// Splits at `t` into two quads.
    fn split(&self, t: f32) -> (Self, Self) {
        let a = self.from.lerp(self.ctrl, t);
        let b = self.ctrl.lerp(self.to, t);
        let m = a.lerp(b, t);
        (
            Self {
                from: self.from,
                ctrl: a,
                to: m,
            },
            Self {
                from: m,
                ctrl: b,
                to: self.to,
            },
        )
    }

    /// The part of the curve between `t0` and `t1`.
    fn subsegment(&self, t0: f32, t1: f32) -> Self {
        let (left, _) = self.split(t1);
        if t1 <= 0.0 {
            return Self::line(self.from, self.from);
        }
        left.split(t0 / t1).1
    }

    fn is_point(&self) -> bool {
        self.from == self.ctrl && self.ctrl == self.to
    }

    /// Second difference, twice the distance the control point pulls the curve.
    fn dd(&self) -> Point {
        self.from - self.ctrl.scale(2.0) + self.to
    }

    /// Arc length.
    pub fn length(&self) -> f32 {
        // Closed form of ∫|B'(t)|dt, evaluated in f64 for stability.
        let a = self.dd();
        let b = (self.ctrl - self.from).scale(2.0);
        let aa = 4.0 * f64::from(a.dot(a));
        let bb = 4.0 * f64::from(a.dot(b));
        let cc = f64::from(b.dot(b));
        if aa <= 1e-10 * cc.max(1e-12) {
            return self.from.distance(self.to);
        }
        let sabc = 2.0 * (aa + bb + cc).sqrt();
        let a2 = aa.sqrt();
        let a32 = 2.0 * aa * a2;
        let c2 = 2.0 * cc.sqrt();
        let ba = bb / a2;
        let log_arg = (2.0 * a2 + ba + sabc) / (ba + c2);
        if !(log_arg > 0.0) || !log_arg.is_finite() {
            // Cusp: the curve doubles back on itself along a line.
            return self.flat_length();
        }
        ((a32 * sabc + a2 * bb * (sabc - c2) + (4.0 * cc * aa - bb * bb) * log_arg.ln())
            / (4.0 * a32)) as f32
    }

    fn flat_length(&self) -> f32 {
        const N: usize = 32;
        let mut len = 0.0;
        let mut prev = self.from;
        for i in 1..=N {
            let p = self.eval(i as f32 / N as f32);
            len += prev.distance(p);
            prev = p;
        }
        len
    }

    /// Parameter at which the arc length from `t0` reaches `len`.
    fn param_at_length(&self, t0: f32, len: f32) -> f32 {
        let (mut lo, mut hi) = (t0, 1.0_f32);
        for _ in 0..24 {
            let mid = 0.5 * (lo + hi);
            if self.subsegment(t0, mid).length() < len {
                lo = mid;
            } else {
                hi = mid;
            }
        }
        0.5 * (lo + hi)
    }
}

/// A line segment of a flattened outline, laid out as two vertices.
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct LineSegment {
    pub p0: Point,
    pub p1: Point,
}

/// A quad tagged with the contour it belongs to.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct StrokeQuad {
    pub contour: u32,
    pub quad: Quad,
}

/// Quads grouped into contours by consecutive equal contour indices.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StrokeQuads(pub Vec<StrokeQuad>);

impl StrokeQuads {
    /// Converts path segments into quads, splitting cubics to within `tolerance`.
    pub fn from_segments(segments: impl IntoIterator<Item = (u32, Command)>, tolerance: f32) -> Self {
        let mut out = Vec::new();
        for (contour, cmd) in segments {
            match cmd.op() {
                SceneOp::FILL_LINE | SceneOp::STROKE_LINE => {
                    let (from, to) = decode_line(&cmd);
                    out.push(StrokeQuad {
                        contour,
                        quad: Quad::line(from, to),
                    });
                }
                SceneOp::FILL_QUAD | SceneOp::STROKE_QUAD => {
                    let (from, ctrl, to) = decode_quad(&cmd);
                    out.push(StrokeQuad {
                        contour,
                        quad: Quad { from, ctrl, to },
                    });
                }
                SceneOp::FILL_CUBIC | SceneOp::STROKE_CUBIC => {
                    let (p0, p1, p2, p3) = decode_cubic(&cmd);
                    split_cubic(p0, p1, p2, p3, tolerance, |quad| {
                        out.push(StrokeQuad { contour, quad });
                    });
                }
                _ => {}
            }
        }
        Self(out)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Splits into contours.
    pub fn split(&self) -> Vec<&[StrokeQuad]> {
        self.0
            .chunk_by(|a, b| a.contour == b.contour)
            .collect()
    }

    /// Bounds of every point, control points included.
    pub fn bounds(&self) -> Rect {
        let mut r = Rect::EMPTY;
        for q in &self.0 {
            r.include(q.quad.from);
            r.include(q.quad.ctrl);
            r.include(q.quad.to);
        }
        if self.0.is_empty() {
            return Rect::default();
        }
        r
    }

    /// Expands the stroke into outline rings.
    ///
    /// A width of zero or less, or a dash pattern without length, produces nothing.
    pub fn stroke(&self, style: &StrokeStyle, dashes: Option<&Dashes>) -> Self {
        if !(style.width > 0.0) {
            return Self::default();
        }
        let dashed;
        let source = match dashes {
            Some(d) if !d.lengths.is_empty() => {
                dashed = self.dash(d);
                &dashed
            }
            _ => self,
        };
        let hw = 0.5 * style.width;
        let mut out = Vec::new();
        let mut contour = 0;
        for run in source.split() {
            let quads: Vec<Quad> = run
                .iter()
                .map(|q| q.quad)
                .filter(|q| !q.is_point())
                .collect();
            if quads.is_empty() {
                continue;
            }
            let (rhs, lhs) = offset(&quads, hw, style, STROKE_TOLERANCE);
            for ring in [Some(rhs), lhs].into_iter().flatten() {
                out.extend(ring.0.into_iter().map(|quad| StrokeQuad { contour, quad }));
                contour += 1;
            }
        }
        Self(out)
    }

    /// Splits the contours into dashes.
    ///
    /// Every "on" run becomes its own contour. On closed contours a dash crossing the start
    /// point stays in one piece. A contour needing more than [`MAX_DASH_RUNS`] runs is kept
    /// solid.
    pub fn dash(&self, dashes: &Dashes) -> Self {
        let mut pattern: Vec<f32> = dashes.lengths.iter().map(|l| l.max(0.0)).collect();
        if pattern.len() % 2 == 1 {
            pattern.extend_from_within(..);
        }
        let total: f32 = pattern.iter().sum();
        if !(total > 0.0) || !total.is_finite() {
            return Self::default();
        }
        let mut out: Vec<StrokeQuad> = Vec::new();
        let mut next_contour = 0;
        for run in self.split() {
            let run_len: f32 = run.iter().map(|q| q.quad.length()).sum();
            if run_len / total * pattern.len() as f32 > MAX_DASH_RUNS as f32 {
                out.extend(run.iter().map(|q| StrokeQuad {
                    contour: next_contour,
                    quad: q.quad,
                }));
                next_contour += 1;
                continue;
            }
            let mut walker = DashWalker::new(&pattern, dashes.phase.rem_euclid(total));
            let first_out = out.len();
            let starts_on = walker.is_on();
            let mut current = if starts_on {
                next_contour += 1;
                Some(next_contour - 1)
            } else {
                None
            };
            for sq in run {
                let q = sq.quad;
                let len = q.length();
                if len == 0.0 {
                    continue;
                }
                let (mut t, mut pos) = (0.0, 0.0);
                loop {
                    let left = len - pos;
                    if walker.remaining >= left {
                        if let Some(contour) = current {
                            out.push(StrokeQuad {
                                contour,
                                quad: q.subsegment(t, 1.0),
                            });
                        }
                        walker.remaining -= left;
                        break;
                    }
                    let t1 = q.param_at_length(t, walker.remaining);
                    if let Some(contour) = current {
                        if t1 > t {
                            out.push(StrokeQuad {
                                contour,
                                quad: q.subsegment(t, t1),
                            });
                        }
                    }
                    pos += walker.remaining;
                    t = t1;
                    walker.advance();
                    current = if walker.is_on() {
                        next_contour += 1;
                        Some(next_contour - 1)
                    } else {
                        None
                    };
                }
            }
            let closed = run[0].quad.from == run[run.len() - 1].quad.to;
            if closed && starts_on && current.is_some() && out.len() > first_out {
                let first = out[first_out].contour;
                let last = out[out.len() - 1].contour;
                if first != last {
                    // Join the dash ending at the seam with the one starting there.
                    let tail_start = out.iter().rposition(|q| q.contour != last).map_or(0, |i| i + 1);
                    let mut tail: Vec<StrokeQuad> = out.drain(tail_start..).collect();
                    for q in &mut tail {
                        q.contour = first;
                    }
                    tail.extend(out.drain(first_out..));
                    out.extend(tail);
                }
            }
        }
        out.retain(|q| !q.quad.is_point());
        Self(out)
    }

    /// Flattens the quads into line segments, closing every contour.
    pub fn to_lines(&self, tolerance: f32) -> Vec<LineSegment> {
        let mut lines = Vec::new();
        for run in self.split() {
            for sq in run {
                flatten_quad(&sq.quad, tolerance, &mut lines);
            }
            let (first, last) = (run[0].quad.from, run[run.len() - 1].quad.to);
            if first != last {
                lines.push(LineSegment { p0: last, p1: first });
            }
        }
        lines
    }
}

struct DashWalker<'a> {
    pattern: &'a [f32],
    index: usize,
    remaining: f32,
}

impl<'a> DashWalker<'a> {
    fn new(pattern: &'a [f32], mut phase: f32) -> Self {
        let mut index = 0;
        while phase >= pattern[index] {
            phase -= pattern[index];
            index = (index + 1) % pattern.len();
            if phase <= 0.0 {
                break;
            }
        }
        Self {
            pattern,
            index,
            remaining: pattern[index] - phase.max(0.0),
        }
    }

    fn is_on(&self) -> bool {
        self.index % 2 == 0
    }

    fn advance(&mut self) {
        self.index = (self.index + 1) % self.pattern.len();
        self.remaining = self.pattern[self.index];
    }
}

/// Approximates a cubic by quads to within `tolerance`.
pub fn split_cubic(p0: Point, p1: Point, p2: Point, p3: Point, tolerance: f32, mut emit: impl FnMut(Quad)) {
    // Error of the single quad approximation is √3/36·|p3 - 3p2 + 3p1 - p0|, and shrinks with
    // the cube of the number of pieces.
    let d = p3 - p2.scale(3.0) + p1.scale(3.0) - p0;
    let err = d.length() * 3.0_f32.sqrt() / 36.0;
    let n = ((err / tolerance.max(1e-6)).cbrt().ceil() as usize).clamp(1, 64);
    let at = |t: f32| {
        let mt = 1.0 - t;
        p0.scale(mt * mt * mt) + p1.scale(3.0 * mt * mt * t) + p2.scale(3.0 * mt * t * t) + p3.scale(t * t * t)
    };
    let deriv = |t: f32| {
        let mt = 1.0 - t;
        (p1 - p0).scale(3.0 * mt * mt) + (p2 - p1).scale(6.0 * mt * t) + (p3 - p2).scale(3.0 * t * t)
    };
    for i in 0..n {
        let (t0, t1) = (i as f32 / n as f32, (i + 1) as f32 / n as f32);
        let dt = (t1 - t0) / 3.0;
        let (a, b) = (at(t0), at(t1));
        // Control points of the sub-cubic.
        let c1 = a + deriv(t0).scale(dt);
        let c2 = b - deriv(t1).scale(dt);
        let ctrl = (c1 + c2).scale(0.75) - (a + b).scale(0.25);
        emit(Quad { from: a, ctrl, to: b });
    }
}

fn flatten_quad(q: &Quad, tolerance: f32, lines: &mut Vec<LineSegment>) {
    let n = ((q.dd().length() / (4.0 * tolerance.max(1e-6))).sqrt().ceil() as usize).clamp(1, 256);
    let mut prev = q.from;
    for i in 1..n {
        let p = q.eval(i as f32 / n as f32);
        lines.push(LineSegment { p0: prev, p1: p });
        prev = p;
    }
    lines.push(LineSegment { p0: prev, p1: q.to });
}

fn cos_between(a: Point, b: Point) -> f32 {
    let d = a.length() * b.length();
    if d == 0.0 {
        return 1.0;
    }
    (a.dot(b) / d).clamp(-1.0, 1.0)
}

fn start_normal(q: &Quad, hw: f32) -> Point {
    let mut t = q.ctrl - q.from;
    if t == Point::ZERO {
        t = q.to - q.from;
    }
    t.rot90_cw().normalize_to(hw)
}

fn end_normal(q: &Quad, hw: f32) -> Point {
    let mut t = q.to - q.ctrl;
    if t == Point::ZERO {
        t = q.to - q.from;
    }
    t.rot90_cw().normalize_to(hw)
}

/// A contour under construction.
#[derive(Default)]
struct Ring(Vec<Quad>);

impl Ring {
    fn pen(&self) -> Point {
        self.0.last().map_or(Point::ZERO, |q| q.to)
    }

    fn line_to(&mut self, p: Point) {
        let pen = self.pen();
        if pen != p {
            self.0.push(Quad::line(pen, p));
        }
    }

    /// Circular arc around `center` from the pen, sweeping `angle` radians.
    fn arc_around(&mut self, center: Point, angle: f32) {
        let segments = ((angle.abs() / (2.0 * PI / 16.0)).ceil() as u32).max(1);
        let m = arc_transform(self.pen(), center, center, angle, segments);
        for _ in 0..segments {
            let p0 = self.pen();
            let p1 = m.transform(p0);
            let p2 = m.transform(p1);
            let ctrl = p1.scale(2.0) - (p0 + p2).scale(0.5);
            self.0.push(Quad { from: p0, ctrl, to: p2 });
        }
    }

    /// Appends `quads`, bridging any gap with a line.
    fn append(&mut self, quads: Vec<Quad>) {
        if let (Some(last), Some(first)) = (self.0.last(), quads.first()) {
            if last.to != first.from {
                self.0.push(Quad::line(last.to, first.from));
            }
        }
        self.0.extend(quads);
    }

    fn close(&mut self) {
        if let (Some(first), Some(last)) = (self.0.first(), self.0.last()) {
            if first.from != last.to {
                self.0.push(Quad::line(last.to, first.from));
            }
        }
    }

    fn reverse(self) -> Vec<Quad> {
        self.0
            .into_iter()
            .rev()
            .map(|q| Quad {
                from: q.to,
                ctrl: q.ctrl,
                to: q.from,
            })
            .collect()
    }
}

#[derive(Copy, Clone)]
struct Segment {
    quad: Quad,
    n0: Point,
    n1: Point,
}

/// Offsets one contour by ±`hw`. Open contours yield one capped ring, closed contours an outer
/// and an inner ring of opposite orientation.
fn offset(quads: &[Quad], hw: f32, style: &StrokeStyle, tolerance: f32) -> (Ring, Option<Ring>) {
    let segments: Vec<Segment> = quads
        .iter()
        .map(|q| Segment {
            quad: *q,
            n0: start_normal(q, hw),
            n1: end_normal(q, hw),
        })
        .collect();
    let first = segments[0];
    let last = segments[segments.len() - 1];
    let closed = first.quad.from == last.quad.to;
    let (mut rhs, mut lhs) = (Ring::default(), Ring::default());
    for (i, seg) in segments.iter().enumerate() {
        rhs.append(offset_quad(seg, 1.0, tolerance));
        lhs.append(offset_quad(seg, -1.0, tolerance));
        let next = match segments.get(i + 1) {
            Some(next) => Some(next),
            None if closed => Some(&first),
            None => None,
        };
        if let Some(next) = next {
            if seg.n1 != next.n0 {
                join(style, &mut rhs, &mut lhs, hw, seg.quad.to, seg.n1, next.n0);
            }
        }
    }
    if closed {
        rhs.close();
        lhs.close();
        let inner = Ring(lhs.reverse());
        return (rhs, Some(inner));
    }
    let back = lhs.reverse();
    cap(style, &mut rhs, last.quad.to, last.n1);
    rhs.append(back);
    cap(style, &mut rhs, first.quad.from, Point::ZERO - first.n0);
    rhs.close();
    (rhs, None)
}

/// Offsets a segment to the side given by the sign of `side`, as a polyline of quads.
fn offset_quad(seg: &Segment, side: f32, tolerance: f32) -> Vec<Quad> {
    let q = &seg.quad;
    let hw = seg.n0.length();
    let theta = cos_between(seg.n0, seg.n1).acos();
    let err = q.dd().length() / 4.0 + hw * theta * theta / 8.0;
    let n = ((err / tolerance.max(1e-6)).sqrt().ceil() as usize).clamp(1, 128);
    let mut out = Vec::with_capacity(n);
    let mut prev = q.from + seg.n0.scale(side);
    for i in 1..=n {
        let p = if i == n {
            q.to + seg.n1.scale(side)
        } else {
            let t = i as f32 / n as f32;
            let mut d = q.deriv(t);
            if d == Point::ZERO {
                d = q.to - q.from;
            }
            q.eval(t) + d.rot90_cw().normalize_to(hw * side)
        };
        out.push(Quad::line(prev, p));
        prev = p;
    }
    out
}

/// Joins two segments meeting at `pivot`, with end normal `n0` and start normal `n1`.
fn join(style: &StrokeStyle, rhs: &mut Ring, lhs: &mut Ring, hw: f32, pivot: Point, n0: Point, n1: Point) {
    if style.miter > 0.0 && miter_join(style, rhs, lhs, hw, pivot, n0, n1) {
        return;
    }
    match style.join {
        StrokeJoin::Bevel => bevel_join(rhs, lhs, pivot, n1),
        StrokeJoin::Round => round_join(rhs, lhs, pivot, n0, n1),
    }
}

/// Whether the path turns clockwise (towards the right-hand side offset) at the join.
fn turns_cw(n0: Point, n1: Point) -> bool {
    n0.rot90_cw().dot(n1) >= 0.0
}

fn bevel_join(rhs: &mut Ring, lhs: &mut Ring, pivot: Point, n1: Point) {
    rhs.line_to(pivot + n1);
    lhs.line_to(pivot - n1);
}

fn round_join(rhs: &mut Ring, lhs: &mut Ring, pivot: Point, n0: Point, n1: Point) {
    let angle = cos_between(n0, n1).acos();
    if turns_cw(n0, n1) {
        lhs.arc_around(pivot, -angle);
        lhs.line_to(pivot - n1);
        rhs.line_to(pivot + n1);
    } else {
        rhs.arc_around(pivot, angle);
        rhs.line_to(pivot + n1);
        lhs.line_to(pivot - n1);
    }
}

/// Adds a miter join if it stays within the miter limit, returning whether it did.
fn miter_join(style: &StrokeStyle, rhs: &mut Ring, lhs: &mut Ring, hw: f32, pivot: Point, n0: Point, n1: Point) -> bool {
    let bisector = n0 + n1;
    let theta = cos_between(n0, n1).acos();
    let half_cos = (0.5 * theta).cos();
    if bisector.length() < 1e-6 * hw || half_cos < 1e-6 {
        // A full reversal has no finite miter.
        bevel_join(rhs, lhs, pivot, n1);
        return true;
    }
    // Slightly above one so that nearly straight joins are never clipped.
    let limit = style.miter.max(1.001);
    let len = hw / half_cos;
    if len > limit * hw {
        return false;
    }
    let tip = bisector.normalize_to(len);
    if turns_cw(n0, n1) {
        lhs.line_to(pivot - tip);
    } else {
        rhs.line_to(pivot + tip);
    }
    bevel_join(rhs, lhs, pivot, n1);
    true
}

/// Caps the end of a contour at `pivot`, where the ring pen is at `pivot + n`.
fn cap(style: &StrokeStyle, ring: &mut Ring, pivot: Point, n: Point) {
    match style.cap {
        StrokeCap::Flat => ring.line_to(pivot - n),
        StrokeCap::Square => {
            let e = pivot + n.rot90_ccw();
            ring.line_to(e + n);
            ring.line_to(e - n);
            ring.line_to(pivot - n);
        }
        StrokeCap::Round => {
            ring.arc_around(pivot, PI);
            ring.line_to(pivot - n);
        }
    }
}
