// Copyright 2026 the Tessera Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Path construction and clip operations.

use std::f32::consts::{PI, SQRT_2};
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::Arc;

use crate::math::{self, arc_transform, pt, Point};
use crate::op::{self, CallOp, MacroOp};
use crate::ops::{read_f32, read_u32, write_f32, OpType, Ops, Ref, StackId, StackKind};
use crate::scene::{Command, COMMAND_SIZE};

/// Number of quadratic segments an arc is split into.
pub const ARC_SEGMENTS: u32 = 16;

/// Encoded size of one path segment: contour index followed by a scene command.
pub const SEGMENT_SIZE: usize = 4 + COMMAND_SIZE;

/// Builds a path into an op stream.
///
/// The path is recorded as a macro whose body is an aux block of segments; [`Path::end`] returns
/// the [`PathSpec`] referring to it.
pub struct Path<'a> {
    ops: &'a mut Ops,
    macro_op: MacroOp,
    aux_start: usize,
    contour: u32,
    pen: Point,
    start: Point,
    open: bool,
    has_segments: bool,
    bounds: math::Rect,
}

/// An immutable, recorded path.
#[derive(Clone, Debug)]
pub struct PathSpec {
    spec: CallOp,
    open: bool,
    has_segments: bool,
    bounds: math::Rect,
    hash: u64,
}

impl PathSpec {
    /// Whether at least one contour was left unclosed.
    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn has_segments(&self) -> bool {
        self.has_segments
    }

    /// Bounds of every point of the path, control points included.
    pub fn bounds(&self) -> math::Rect {
        self.bounds
    }

    /// Hash of the encoded segments.
    pub fn hash(&self) -> u64 {
        self.hash
    }

    /// Freezes the stream the path was recorded in, so the path can be used in other streams.
    pub fn into_shared(self, ops: Arc<Ops>) -> Self {
        Self {
            spec: self.spec.into_shared(ops),
            ..self
        }
    }
}

impl<'a> Path<'a> {
    pub fn begin(ops: &'a mut Ops) -> Self {
        let macro_op = op::record(ops);
        let aux_start = ops.data().len();
        ops.write_op(OpType::Aux);
        Self {
            ops,
            macro_op,
            aux_start,
            contour: 0,
            pen: Point::ZERO,
            start: Point::ZERO,
            open: false,
            has_segments: false,
            bounds: math::Rect::EMPTY,
        }
    }

    /// Current pen position.
    pub fn pos(&self) -> Point {
        self.pen
    }

    pub fn end(self) -> PathSpec {
        let open = self.open || self.pen != self.start;
        let spec = self.macro_op.stop(self.ops);
        let mut hasher = DefaultHasher::new();
        self.ops.data()[self.aux_start..].hash(&mut hasher);
        PathSpec {
            spec,
            open,
            has_segments: self.has_segments,
            bounds: if self.has_segments {
                self.bounds
            } else {
                math::Rect::default()
            },
            hash: hasher.finish(),
        }
    }

    /// Moves the pen by `delta`, starting a new contour.
    pub fn move_by(&mut self, delta: Point) {
        self.move_to(self.pen + delta);
    }

    /// Moves the pen to `to`, starting a new contour.
    pub fn move_to(&mut self, to: Point) {
        self.open = self.open || self.pen != self.start;
        self.contour += 1;
        self.pen = to;
        self.start = to;
    }

    pub fn line(&mut self, delta: Point) {
        self.line_to(self.pen + delta);
    }

    pub fn line_to(&mut self, to: Point) {
        self.segment(Command::line(self.pen, to), &[to]);
        self.pen = to;
    }

    pub fn quad(&mut self, ctrl: Point, to: Point) {
        self.quad_to(self.pen + ctrl, self.pen + to);
    }

    pub fn quad_to(&mut self, ctrl: Point, to: Point) {
        self.segment(Command::quad(self.pen, ctrl, to), &[ctrl, to]);
        self.pen = to;
    }

    pub fn cube(&mut self, ctrl0: Point, ctrl1: Point, to: Point) {
        self.cube_to(self.pen + ctrl0, self.pen + ctrl1, self.pen + to);
    }

    /// Cubic Bézier to `to`. A curve whose points all equal the pen is dropped.
    pub fn cube_to(&mut self, ctrl0: Point, ctrl1: Point, to: Point) {
        if ctrl0 == self.pen && ctrl1 == self.pen && to == self.pen {
            return;
        }
        self.segment(Command::cubic(self.pen, ctrl0, ctrl1, to), &[ctrl0, ctrl1, to]);
        self.pen = to;
    }

    /// Elliptical arc through the pen with foci relative to the pen, sweeping `angle` radians
    /// (positive is counter-clockwise).
    pub fn arc(&mut self, f1: Point, f2: Point, angle: f32) {
        self.arc_to(self.pen + f1, self.pen + f2, angle);
    }

    /// Elliptical arc through the pen with absolute foci, approximated by quadratic segments.
    pub fn arc_to(&mut self, f1: Point, f2: Point, angle: f32) {
        let m = arc_transform(self.pen, f1, f2, angle, ARC_SEGMENTS);
        for _ in 0..ARC_SEGMENTS {
            let p0 = self.pen;
            let p1 = m.transform(p0);
            let p2 = m.transform(p1);
            let ctrl = p1.scale(2.0) - (p0 + p2).scale(0.5);
            self.quad_to(ctrl, p2);
        }
    }

    /// Closes the contour with a line back to its start.
    pub fn close(&mut self) {
        if self.pen != self.start {
            self.line_to(self.start);
        }
        self.contour += 1;
    }

    fn segment(&mut self, cmd: Command, points: &[Point]) {
        self.bounds.include(self.pen);
        for p in points {
            self.bounds.include(*p);
        }
        self.has_segments = true;
        let data = self.ops.write(SEGMENT_SIZE);
        data[..4].copy_from_slice(&self.contour.to_le_bytes());
        cmd.encode(&mut data[4..]);
    }
}

/// Iterates the `(contour, command)` pairs of an aux block, including its opcode byte.
pub fn decode_segments(aux: &[u8]) -> impl Iterator<Item = (u32, Command)> + '_ {
    if aux.first() != Some(&(OpType::Aux as u8)) {
        panic!("invalid op");
    }
    aux[1..]
        .chunks_exact(SEGMENT_SIZE)
        .map(|seg| (read_u32(&seg[..4]), Command::decode(&seg[4..])))
}

/// End cap style of open stroked contours.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum StrokeCap {
    #[default]
    Flat = 0,
    Square = 1,
    Round = 2,
}

/// Join style between stroked segments.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum StrokeJoin {
    #[default]
    Bevel = 0,
    Round = 1,
}

/// Stroke parameters.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct StrokeStyle {
    /// Line width. Strokes of width zero or less draw nothing.
    pub width: f32,
    /// Miter limit, in units of the half width. Zero disables miter joins and infinity always
    /// allows them.
    pub miter: f32,
    pub cap: StrokeCap,
    pub join: StrokeJoin,
}

impl StrokeStyle {
    pub fn new(width: f32) -> Self {
        Self {
            width,
            ..Default::default()
        }
    }

    pub fn with_cap(self, cap: StrokeCap) -> Self {
        Self { cap, ..self }
    }

    pub fn with_join(self, join: StrokeJoin) -> Self {
        Self { join, ..self }
    }

    pub fn with_miter(self, miter: f32) -> Self {
        Self { miter, ..self }
    }
}

/// Dash pattern: alternating on and off lengths, starting `phase` units into the pattern.
#[derive(Clone, Debug, PartialEq)]
pub struct Dashes {
    pub phase: f32,
    pub lengths: Arc<[f32]>,
}

impl Dashes {
    pub fn new(phase: f32, lengths: impl Into<Arc<[f32]>>) -> Self {
        Self {
            phase,
            lengths: lengths.into(),
        }
    }
}

/// Shape of a clip record.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Shape {
    /// The clip is its bounding rectangle.
    Rect = 0,
    /// The clip is the preceding path.
    Path = 1,
}

/// A clip area.
#[derive(Clone, Debug)]
pub struct Op {
    path: Option<PathSpec>,
    stroke: Option<StrokeStyle>,
    dashes: Option<Dashes>,
    outline: bool,
    bounds: math::Rect,
}

/// A pushed clip, restored by [`Stack::pop`].
#[must_use = "a pushed clip must be popped"]
#[derive(Debug)]
pub struct Stack {
    id: StackId,
    macro_id: u32,
}

impl Op {
    /// A clip that discards everything.
    pub fn empty() -> Self {
        Self::rect(math::Rect::default())
    }

    fn rect(bounds: math::Rect) -> Self {
        Self {
            path: None,
            stroke: None,
            dashes: None,
            outline: false,
            bounds,
        }
    }

    pub fn bounds(&self) -> math::Rect {
        self.bounds
    }

    /// Intersects the clip with the current clip until the returned stack is popped.
    pub fn push(&self, ops: &mut Ops) -> Stack {
        let (id, macro_id) = ops.push_op(StackKind::Clip);
        self.add(ops);
        Stack { id, macro_id }
    }

    /// Writes the path reference, the stroke and dash records, then the clip record.
    pub(crate) fn add(&self, ops: &mut Ops) {
        if let Some(path) = &self.path {
            let data = ops.write(OpType::Path.size());
            data[0] = OpType::Path as u8;
            data[1..9].copy_from_slice(&path.hash.to_le_bytes());
            path.spec.add(ops);
        }
        if let Some(style) = &self.stroke {
            let data = ops.write(OpType::Stroke.size());
            data[0] = OpType::Stroke as u8;
            write_f32(&mut data[1..], style.width);
            write_f32(&mut data[5..], style.miter);
            data[9] = style.cap as u8;
            data[10] = style.join as u8;
        }
        if let Some(dashes) = &self.dashes {
            let data = ops.write1(OpType::Dash.size(), Ref::Dashes(dashes.lengths.clone()));
            data[0] = OpType::Dash as u8;
            write_f32(&mut data[1..], dashes.phase);
            data[5] = dashes.lengths.len().min(u8::MAX as usize) as u8;
        }
        let data = ops.write(OpType::Clip.size());
        data[0] = OpType::Clip as u8;
        for (dst, v) in data[1..17].chunks_exact_mut(4).zip(self.bounds.round_out()) {
            dst.copy_from_slice(&v.to_le_bytes());
        }
        let shape = if self.path.is_some() {
            Shape::Path
        } else {
            Shape::Rect
        };
        data[17] = u8::from(self.outline);
        data[18] = shape as u8;
    }
}

impl Stack {
    pub fn pop(self, ops: &mut Ops) {
        ops.pop_op(StackKind::Clip, self.id, self.macro_id);
        ops.write_op(OpType::PopClip);
    }
}

/// A decoded clip record.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ClipRecord {
    pub bounds: math::Rect,
    pub outline: bool,
    pub shape: Shape,
}

pub fn decode_clip(data: &[u8]) -> ClipRecord {
    if data[0] != OpType::Clip as u8 {
        panic!("invalid op");
    }
    let b: [i32; 4] = std::array::from_fn(|i| read_u32(&data[1 + i * 4..]) as i32);
    ClipRecord {
        bounds: math::Rect::new(b[0] as f32, b[1] as f32, b[2] as f32, b[3] as f32),
        outline: data[17] != 0,
        shape: if data[18] == Shape::Path as u8 {
            Shape::Path
        } else {
            Shape::Rect
        },
    }
}

pub fn decode_stroke(data: &[u8]) -> StrokeStyle {
    if data[0] != OpType::Stroke as u8 {
        panic!("invalid op");
    }
    StrokeStyle {
        width: read_f32(&data[1..]),
        miter: read_f32(&data[5..]),
        cap: match data[9] {
            1 => StrokeCap::Square,
            2 => StrokeCap::Round,
            _ => StrokeCap::Flat,
        },
        join: match data[10] {
            1 => StrokeJoin::Round,
            _ => StrokeJoin::Bevel,
        },
    }
}

pub fn decode_dash(data: &[u8], refs: &[Ref]) -> Dashes {
    if data[0] != OpType::Dash as u8 {
        panic!("invalid op");
    }
    let Some(Ref::Dashes(lengths)) = refs.first() else {
        panic!("invalid op: dash without lengths");
    };
    Dashes {
        phase: read_f32(&data[1..]),
        lengths: lengths.clone(),
    }
}

/// Decodes the content hash of a path record.
pub fn decode_path(data: &[u8]) -> u64 {
    if data[0] != OpType::Path as u8 {
        panic!("invalid op");
    }
    let mut b = [0; 8];
    b.copy_from_slice(&data[1..9]);
    u64::from_le_bytes(b)
}

/// Fills the interior of a closed path under the non-zero winding rule.
#[derive(Clone, Debug)]
pub struct Outline {
    pub path: PathSpec,
}

impl Outline {
    /// # Panics
    ///
    /// Panics if any contour of the path is open.
    pub fn op(self) -> Op {
        if self.path.open {
            panic!("not all path contours are closed");
        }
        if !self.path.has_segments {
            return Op::empty();
        }
        Op {
            bounds: self.path.bounds,
            path: Some(self.path),
            stroke: None,
            dashes: None,
            outline: true,
        }
    }
}

/// The area covered by stroking a path.
#[derive(Clone, Debug)]
pub struct Stroke {
    pub path: PathSpec,
    pub style: StrokeStyle,
    /// `None` strokes solid. Dashes configured with an empty pattern stroke solid too.
    pub dashes: Option<Dashes>,
}

impl Stroke {
    pub fn new(path: PathSpec, width: f32) -> Self {
        Self {
            path,
            style: StrokeStyle::new(width),
            dashes: None,
        }
    }

    pub fn op(self) -> Op {
        if !(self.style.width > 0.0) || !self.path.has_segments {
            return Op::empty();
        }
        let hw = 0.5 * self.style.width;
        let mut reach = if self.style.cap == StrokeCap::Square {
            SQRT_2
        } else {
            1.0
        };
        if self.style.miter > 0.0 {
            reach = reach.max(self.style.miter);
        }
        Op {
            bounds: self.path.bounds.inflate(hw * reach),
            path: Some(self.path),
            stroke: Some(self.style),
            dashes: self.dashes,
            outline: false,
        }
    }
}

/// An integer rectangle clip.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Rect {
    pub x0: i32,
    pub y0: i32,
    pub x1: i32,
    pub y1: i32,
}

impl Rect {
    pub fn new(x0: i32, y0: i32, x1: i32, y1: i32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    pub fn to_f32(self) -> math::Rect {
        math::Rect::new(self.x0 as f32, self.y0 as f32, self.x1 as f32, self.y1 as f32)
    }

    /// The clip covering the rectangle, described by its bounds alone.
    pub fn op(self) -> Op {
        Op::rect(self.to_f32())
    }

    pub fn push(self, ops: &mut Ops) -> Stack {
        self.op().push(ops)
    }

    /// The rectangle as a closed path.
    pub fn path(self, ops: &mut Ops) -> PathSpec {
        let r = self.to_f32();
        let mut p = Path::begin(ops);
        p.move_to(r.min);
        p.line_to(pt(r.max.x, r.min.y));
        p.line_to(r.max);
        p.line_to(pt(r.min.x, r.max.y));
        p.close();
        p.end()
    }
}

/// A rectangle with rounded corners.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct RRect {
    pub rect: math::Rect,
    pub se: f32,
    pub sw: f32,
    pub nw: f32,
    pub ne: f32,
}

impl RRect {
    /// A rectangle with every corner rounded by `r`.
    pub fn uniform(rect: math::Rect, r: f32) -> Self {
        Self {
            rect,
            se: r,
            sw: r,
            nw: r,
            ne: r,
        }
    }

    pub fn op(self, ops: &mut Ops) -> Op {
        Outline {
            path: self.path(ops),
        }
        .op()
    }

    pub fn push(self, ops: &mut Ops) -> Stack {
        self.op(ops).push(ops)
    }

    /// The rounded rectangle as a closed path, with cubic corners.
    pub fn path(self, ops: &mut Ops) -> PathSpec {
        // 1 - 4/3·(√2 - 1): control point offset approximating a quarter circle.
        const IQ: f32 = 1.0 - 0.552_284_75;
        let Self { se, sw, nw, ne, .. } = self;
        let (w, n, e, s) = (
            self.rect.min.x,
            self.rect.min.y,
            self.rect.max.x,
            self.rect.max.y,
        );
        let mut p = Path::begin(ops);
        p.move_to(pt(w + nw, n));
        p.line_to(pt(e - ne, n));
        p.cube_to(pt(e - ne * IQ, n), pt(e, n + ne * IQ), pt(e, n + ne));
        p.line_to(pt(e, s - se));
        p.cube_to(pt(e, s - se * IQ), pt(e - se * IQ, s), pt(e - se, s));
        p.line_to(pt(w + sw, s));
        p.cube_to(pt(w + sw * IQ, s), pt(w, s - sw * IQ), pt(w, s - sw));
        p.line_to(pt(w, n + nw));
        p.cube_to(pt(w, n + nw * IQ), pt(w + nw * IQ, n), pt(w + nw, n));
        p.close();
        p.end()
    }
}

/// An ellipse inscribed in a rectangle.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Ellipse(pub math::Rect);

impl Ellipse {
    pub fn op(self, ops: &mut Ops) -> Op {
        if self.0.is_empty() {
            return Op::empty();
        }
        Outline {
            path: self.path(ops),
        }
        .op()
    }

    pub fn push(self, ops: &mut Ops) -> Stack {
        self.op(ops).push(ops)
    }

    /// The ellipse as a closed path of arcs.
    pub fn path(self, ops: &mut Ops) -> PathSpec {
        let b = self.0;
        let center = b.min.lerp(b.max, 0.5);
        let (rx, ry) = (0.5 * b.width(), 0.5 * b.height());
        let mut p = Path::begin(ops);
        if rx >= ry {
            let f = (rx * rx - ry * ry).sqrt();
            p.move_to(pt(center.x - rx, center.y));
            p.arc_to(center - pt(f, 0.0), center + pt(f, 0.0), 2.0 * PI);
        } else {
            let f = (ry * ry - rx * rx).sqrt();
            p.move_to(pt(center.x, center.y - ry));
            p.arc_to(center - pt(0.0, f), center + pt(0.0, f), 2.0 * PI);
        }
        p.close();
        p.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::Reader;
    use crate::scene::{decode_line, decode_quad, SceneOp};

    fn segments(ops: &Ops) -> Vec<(u32, Command)> {
        let mut out = Vec::new();
        for op in Reader::new(ops) {
            if op.op_type() == OpType::Aux {
                out.extend(decode_segments(op.data));
            }
        }
        out
    }

    fn add_outline(ops: &mut Ops, spec: PathSpec) {
        let stack = Outline { path: spec }.op().push(ops);
        stack.pop(ops);
    }

    #[test]
    fn open_path_outline_panics() {
        let result = std::panic::catch_unwind(|| {
            let mut ops = Ops::new();
            let mut p = Path::begin(&mut ops);
            p.move_to(pt(10.0, 10.0));
            p.line_to(pt(20.0, 10.0));
            p.line_to(pt(20.0, 20.0));
            let spec = p.end();
            assert!(spec.is_open());
            Outline { path: spec }.op()
        });
        assert!(result.is_err());
    }

    #[test]
    fn closed_path_outline() {
        let mut ops = Ops::new();
        let mut p = Path::begin(&mut ops);
        p.move_to(pt(10.0, 10.0));
        p.line_to(pt(20.0, 10.0));
        p.line_to(pt(20.0, 20.0));
        p.close();
        let spec = p.end();
        assert!(!spec.is_open());
        assert!(spec.has_segments());
        add_outline(&mut ops, spec);
        let segs = segments(&ops);
        assert_eq!(segs.len(), 3);
        assert_eq!(decode_line(&segs[2].1), (pt(20.0, 20.0), pt(10.0, 10.0)));
        assert!(segs.iter().all(|(contour, _)| *contour == 1));
    }

    #[test]
    fn move_marks_previous_contour_open() {
        let mut ops = Ops::new();
        let mut p = Path::begin(&mut ops);
        p.line_to(pt(5.0, 0.0));
        p.move_to(pt(10.0, 10.0));
        p.line_to(pt(20.0, 10.0));
        p.line_to(pt(10.0, 10.0));
        assert!(p.end().is_open());
    }

    #[test]
    fn empty_path() {
        let mut ops = Ops::new();
        let spec = Path::begin(&mut ops).end();
        assert!(!spec.has_segments());
        assert!(!spec.is_open());
        assert!(Outline { path: spec }.op().bounds().is_empty());
    }

    #[test]
    fn degenerate_cube_is_dropped() {
        let mut ops = Ops::new();
        let mut p = Path::begin(&mut ops);
        p.move_to(pt(3.0, 3.0));
        p.cube_to(pt(3.0, 3.0), pt(3.0, 3.0), pt(3.0, 3.0));
        p.cube(Point::ZERO, Point::ZERO, Point::ZERO);
        let spec = p.end();
        assert!(!spec.has_segments());
        assert!(segments(&ops).is_empty());
    }

    #[test]
    fn bounds_include_control_points() {
        let mut ops = Ops::new();
        let mut p = Path::begin(&mut ops);
        p.move_to(pt(10.0, 10.0));
        p.line_to(pt(20.0, 20.0));
        assert_eq!(p.end().bounds(), math::Rect::new(10.0, 10.0, 20.0, 20.0));

        let mut p = Path::begin(&mut ops);
        p.move_to(pt(10.0, 10.0));
        p.quad_to(pt(5.0, 30.0), pt(20.0, 20.0));
        assert_eq!(p.end().bounds(), math::Rect::new(5.0, 10.0, 20.0, 30.0));

        let mut p = Path::begin(&mut ops);
        p.move_to(pt(10.0, 10.0));
        p.cube_to(pt(0.0, 0.0), pt(30.0, 40.0), pt(20.0, 20.0));
        assert_eq!(p.end().bounds(), math::Rect::new(0.0, 0.0, 30.0, 40.0));
    }

    #[test]
    fn arc_is_sixteen_quads() {
        let mut ops = Ops::new();
        let mut p = Path::begin(&mut ops);
        p.move_to(pt(10.0, 0.0));
        p.arc_to(Point::ZERO, Point::ZERO, PI);
        let end = p.pos();
        assert!((end.x + 10.0).abs() < 1e-3 && end.y.abs() < 1e-3);
        let spec = p.end();
        let b = spec.bounds();
        assert!(b.max.y > 9.9 && b.max.y < 10.2);
        let stack = Stroke::new(spec, 1.0).op().push(&mut ops);
        stack.pop(&mut ops);
        let segs = segments(&ops);
        assert_eq!(segs.len(), ARC_SEGMENTS as usize);
        assert!(segs.iter().all(|(_, c)| c.op() == SceneOp::FILL_QUAD));
        let (_, _, last) = decode_quad(&segs[15].1);
        assert!((last.x + 10.0).abs() < 1e-3);
    }

    #[test]
    fn ellipse_bounds() {
        let mut ops = Ops::new();
        let spec = Ellipse(math::Rect::new(0.0, 0.0, 40.0, 20.0)).path(&mut ops);
        assert!(!spec.is_open());
        let b = spec.bounds();
        assert!(b.min.x.abs() < 0.5 && (b.max.x - 40.0).abs() < 0.5);
        assert!(b.min.y.abs() < 0.5 && (b.max.y - 20.0).abs() < 0.5);
        let spec = Ellipse(math::Rect::new(0.0, 0.0, 10.0, 30.0)).path(&mut ops);
        let b = spec.bounds();
        assert!((b.max.y - 30.0).abs() < 0.5 && (b.max.x - 10.0).abs() < 0.5);
    }

    #[test]
    fn rrect_is_closed() {
        let mut ops = Ops::new();
        let spec = RRect::uniform(math::Rect::new(0.0, 0.0, 50.0, 30.0), 5.0).path(&mut ops);
        assert!(!spec.is_open());
        assert_eq!(spec.bounds(), math::Rect::new(0.0, 0.0, 50.0, 30.0));
    }

    #[test]
    fn records_are_written_in_order() {
        let mut ops = Ops::new();
        let mut p = Path::begin(&mut ops);
        p.move_to(pt(0.0, 0.0));
        p.line_to(pt(10.0, 0.0));
        let spec = p.end();
        let hash = spec.hash();
        let op = Stroke {
            path: spec,
            style: StrokeStyle::new(2.0).with_cap(StrokeCap::Round),
            dashes: Some(Dashes::new(1.0, [3.0, 1.0])),
        }
        .op();
        let stack = op.push(&mut ops);
        stack.pop(&mut ops);
        let decoded: Vec<_> = Reader::new(&ops).collect();
        let types: Vec<_> = decoded.iter().map(|op| op.op_type()).collect();
        assert_eq!(
            types,
            vec![
                OpType::Path,
                OpType::Aux,
                OpType::Stroke,
                OpType::Dash,
                OpType::Clip,
                OpType::PopClip
            ]
        );
        assert_eq!(decode_path(decoded[0].data), hash);
        let style = decode_stroke(decoded[2].data);
        assert_eq!(style.width, 2.0);
        assert_eq!(style.cap, StrokeCap::Round);
        let dashes = decode_dash(decoded[3].data, decoded[3].refs);
        assert_eq!(dashes, Dashes::new(1.0, [3.0, 1.0]));
        let clip = decode_clip(decoded[4].data);
        assert_eq!(clip.shape, Shape::Path);
        assert!(!clip.outline);
        assert_eq!(clip.bounds, math::Rect::new(-1.0, -1.0, 11.0, 1.0));
    }

    #[test]
    fn zero_width_stroke_clips_everything() {
        let mut ops = Ops::new();
        let mut p = Path::begin(&mut ops);
        p.line_to(pt(10.0, 0.0));
        let op = Stroke::new(p.end(), 0.0).op();
        assert!(op.bounds().is_empty());
        assert!(op.path.is_none());
    }

    #[test]
    fn same_geometry_same_hash() {
        let mut a = Ops::new();
        let mut b = Ops::new();
        b.write(17);
        let ha = Rect::new(0, 0, 5, 5).path(&mut a).hash();
        let hb = Rect::new(0, 0, 5, 5).path(&mut b).hash();
        let hc = Rect::new(0, 0, 5, 6).path(&mut b).hash();
        assert_eq!(ha, hb);
        assert_ne!(ha, hc);
    }
}
