// Copyright 2026 the Tessera Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Take an op stream and collect the draws of a frame.

use std::collections::HashMap;

use peniko::color::palette;
use smallvec::SmallVec;

use tessera_encoding::clip::{self, Dashes, Shape, StrokeStyle};
use tessera_encoding::paint::{self, ImageOp};
use tessera_encoding::{decode_state_id, op, Affine2D, OpType, Ops, OpsId, Reader, Rect};

use crate::recording::{ClipGeometry, ClipPath, DrawParams, MaterialParams, PathKey, Recording};

/// The clip area: device bounds and the paths intersected into them.
#[derive(Clone, Debug)]
struct ClipState<'a> {
    bounds: Rect,
    paths: Vec<ClipPath<'a>>,
}

/// The state paints are drawn with.
#[derive(Clone, Debug)]
struct DrawState<'a> {
    transform: Affine2D,
    clip: ClipState<'a>,
    material: MaterialParams,
    opacity: f32,
}

/// The path a following clip record refers to.
#[derive(Default)]
struct PendingPath<'a> {
    hash: u64,
    aux: Option<&'a [u8]>,
    stroke: Option<StrokeStyle>,
    dashes: Option<Dashes>,
}

/// State for a collection in progress.
pub struct Render<'a> {
    viewport: Rect,
    state: DrawState<'a>,
    transforms: SmallVec<[Affine2D; 8]>,
    clips: Vec<ClipState<'a>>,
    opacities: SmallVec<[f32; 4]>,
    passes: u32,
    /// Saved transforms by stream, stream version and state id.
    saved: HashMap<(OpsId, u32, u32), Affine2D>,
    pending: PendingPath<'a>,
    recording: Recording<'a>,
}

impl<'a> Render<'a> {
    pub fn new(width: u32, height: u32) -> Self {
        let viewport = Rect::new(0.0, 0.0, width as f32, height as f32);
        Self {
            viewport,
            state: DrawState {
                transform: Affine2D::IDENTITY,
                clip: ClipState {
                    bounds: viewport,
                    paths: Vec::new(),
                },
                material: MaterialParams::Color(palette::css::BLACK),
                opacity: 1.0,
            },
            transforms: SmallVec::new(),
            clips: Vec::new(),
            opacities: SmallVec::new(),
            passes: 0,
            saved: HashMap::new(),
            pending: PendingPath::default(),
            recording: Recording::default(),
        }
    }

    /// Decodes `ops` and returns the draws it describes.
    pub fn collect(mut self, ops: &'a Ops, clear: Option<[f32; 4]>) -> Recording<'a> {
        if let Some(color) = clear {
            self.recording.clear(color);
        }
        for encoded in Reader::new(ops) {
            let data = encoded.data;
            match encoded.op_type() {
                OpType::Transform => {
                    let (t, push) = op::decode_transform(data);
                    if push {
                        self.transforms.push(self.state.transform);
                    }
                    self.state.transform = self.state.transform * t;
                }
                OpType::PopTransform => {
                    if let Some(t) = self.transforms.pop() {
                        self.state.transform = t;
                    }
                }
                OpType::PushOpacity => {
                    self.opacities.push(self.state.opacity);
                    self.state.opacity *= paint::decode_opacity(data);
                }
                OpType::PopOpacity => {
                    if let Some(o) = self.opacities.pop() {
                        self.state.opacity = o;
                    }
                }
                OpType::Pass => self.passes += 1,
                OpType::PopPass => self.passes = self.passes.saturating_sub(1),
                OpType::Save => {
                    let key = (encoded.key.ops, encoded.key.version, decode_state_id(data));
                    self.saved.insert(key, self.state.transform);
                }
                OpType::Load => {
                    let key = (encoded.key.ops, encoded.key.version, decode_state_id(data));
                    match self.saved.get(&key) {
                        Some(t) => self.state.transform = *t,
                        None => log::warn!("load of unknown state {}", key.2),
                    }
                }
                OpType::Color => {
                    self.state.material = MaterialParams::Color(paint::decode_color(data));
                }
                OpType::LinearGradient => {
                    self.state.material =
                        MaterialParams::LinearGradient(paint::decode_linear_gradient(data));
                }
                OpType::RadialGradient => {
                    self.state.material =
                        MaterialParams::RadialGradient(paint::decode_radial_gradient(data));
                }
                OpType::Image => {
                    self.state.material =
                        MaterialParams::Image(paint::decode_image(data, encoded.refs));
                }
                OpType::Path => {
                    self.pending.hash = clip::decode_path(data);
                }
                OpType::Aux => {
                    self.pending.aux = Some(data);
                }
                OpType::Stroke => {
                    self.pending.stroke = Some(clip::decode_stroke(data));
                }
                OpType::Dash => {
                    self.pending.dashes = Some(clip::decode_dash(data, encoded.refs));
                }
                OpType::Clip => {
                    let record = clip::decode_clip(data);
                    let pending = std::mem::take(&mut self.pending);
                    self.clips.push(self.state.clip.clone());
                    let geometry = match (record.shape, pending.aux) {
                        (Shape::Path, Some(aux)) => Some((pending.hash, ClipGeometry::Path(aux))),
                        _ => None,
                    };
                    let (stroke, dashes) = if record.outline {
                        (None, None)
                    } else {
                        (pending.stroke, pending.dashes)
                    };
                    add_clip(
                        &mut self.state,
                        record.bounds,
                        geometry,
                        stroke,
                        dashes,
                    );
                }
                OpType::PopClip => {
                    if let Some(c) = self.clips.pop() {
                        self.state.clip = c;
                    }
                }
                OpType::Paint => self.paint(),
                OpType::Macro | OpType::Call => {}
            }
        }
        if self.passes != 0 {
            log::debug!("{} passes left open at the end of the frame", self.passes);
        }
        self.recording
    }

    fn paint(&mut self) {
        let mut state = self.state.clone();
        if !state.transform.is_invertible() {
            log::debug!("skipping paint under a singular transform");
            return;
        }
        if let MaterialParams::Image(ImageOp { image, .. }) = &state.material {
            // Images cover their own bounds only.
            let bounds = Rect::new(0.0, 0.0, image.width as f32, image.height as f32);
            add_clip(&mut state, bounds, None, None, None);
        }
        let bounds = state.clip.bounds.intersect(&self.viewport);
        if bounds.is_empty() {
            return;
        }
        let [x0, y0, x1, y1] = bounds.round_out();
        let scissor = [x0, y0, x1, y1].map(|v| v.max(0) as u32);
        if scissor[0] >= scissor[2] || scissor[1] >= scissor[3] {
            return;
        }
        let opacity = state.opacity;
        if let MaterialParams::Color(color) = state.material {
            let covers_viewport = state.clip.paths.is_empty() && bounds == self.viewport;
            if covers_viewport && opacity >= 1.0 && color.components[3] >= 1.0 {
                // Everything painted so far is hidden.
                self.recording.commands.clear();
                self.recording.clear(paint::linear_premul(color));
                return;
            }
        }
        self.recording.draw(DrawParams {
            scissor,
            clips: state.clip.paths,
            material: state.material,
            transform: state.transform,
            opacity,
        });
    }
}

/// Intersects the clip of `state` with `bounds` in user space, and with a path when given.
fn add_clip<'a>(
    state: &mut DrawState<'a>,
    bounds: Rect,
    path: Option<(u64, ClipGeometry<'a>)>,
    stroke: Option<StrokeStyle>,
    dashes: Option<Dashes>,
) {
    let t = state.transform;
    let device_bounds = bounds.transform(&t);
    state.clip.bounds = state.clip.bounds.intersect(&device_bounds);
    let path = match path {
        Some(path) => Some(path),
        None if !t.is_axis_aligned() && !bounds.is_empty() => {
            // A rotated rectangle is not its device bounding box.
            Some((rect_hash(&bounds), ClipGeometry::Rect(bounds)))
        }
        None => None,
    };
    if let Some((hash, geometry)) = path {
        state.clip.paths.push(ClipPath {
            key: PathKey::new(hash, stroke.as_ref(), dashes.as_ref(), &t),
            geometry,
            stroke,
            dashes,
            transform: t,
        });
    }
}

fn rect_hash(r: &Rect) -> u64 {
    use std::hash::{DefaultHasher, Hash, Hasher};
    let mut h = DefaultHasher::new();
    "rect".hash(&mut h);
    [r.min.x, r.min.y, r.max.x, r.max.y]
        .map(f32::to_bits)
        .hash(&mut h);
    h.finish()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use peniko::Color;

    use tessera_encoding::clip::{Outline, Stroke};
    use tessera_encoding::paint::{ColorOp, PaintOp};
    use tessera_encoding::{pt, Point};

    use super::*;
    use crate::recording::Command;

    fn draws<'a>(recording: &'a Recording<'_>) -> Vec<&'a DrawParams<'a>> {
        recording
            .commands
            .iter()
            .filter_map(|c| match c {
                Command::Draw(d) => Some(d),
                Command::Clear(_) => None,
            })
            .collect()
    }

    fn red() -> Color {
        Color::from_rgba8(255, 0, 0, 255)
    }

    #[test]
    fn rect_clip_is_scissor() {
        let mut ops = Ops::new();
        paint::fill_shape(&mut ops, red(), &clip::Rect::new(0, 0, 50, 50).op());
        let recording = Render::new(100, 100).collect(&ops, None);
        let d = draws(&recording);
        assert_eq!(d.len(), 1);
        assert_eq!(d[0].scissor, [0, 0, 50, 50]);
        assert!(d[0].clips.is_empty());
    }

    #[test]
    fn offset_moves_scissor() {
        let mut ops = Ops::new();
        let t = op::offset(pt(10.0, 20.0)).push(&mut ops);
        paint::fill_shape(&mut ops, red(), &clip::Rect::new(0, 0, 5, 5).op());
        t.pop(&mut ops);
        paint::fill_shape(&mut ops, red(), &clip::Rect::new(0, 0, 5, 5).op());
        let recording = Render::new(100, 100).collect(&ops, None);
        let d = draws(&recording);
        assert_eq!(d[0].scissor, [10, 20, 15, 25]);
        assert_eq!(d[1].scissor, [0, 0, 5, 5]);
    }

    #[test]
    fn opaque_full_paint_clears() {
        let mut ops = Ops::new();
        paint::fill_shape(&mut ops, red(), &clip::Rect::new(0, 0, 5, 5).op());
        paint::fill(&mut ops, Color::from_rgba8(0, 0, 255, 255));
        let recording = Render::new(10, 10).collect(&ops, None);
        assert_eq!(recording.commands.len(), 1);
        assert!(matches!(recording.commands[0], Command::Clear(_)));
        assert_eq!(recording.draw_count(), 0);
    }

    #[test]
    fn path_clip() {
        let mut ops = Ops::new();
        let mut p = clip::Path::begin(&mut ops);
        p.move_to(pt(1.0, 1.0));
        p.line_to(pt(8.0, 1.0));
        p.line_to(pt(1.0, 8.0));
        p.close();
        let spec = p.end();
        let outline = Outline { path: spec.clone() }.op();
        paint::fill_shape(&mut ops, red(), &outline);
        let stroke = Stroke::new(spec, 2.0).op();
        paint::fill_shape(&mut ops, red(), &stroke);
        let recording = Render::new(20, 20).collect(&ops, None);
        let d = draws(&recording);
        assert_eq!(d.len(), 2);
        assert_eq!(d[0].clips.len(), 1);
        assert!(d[0].clips[0].stroke.is_none());
        assert!(matches!(d[0].clips[0].geometry, ClipGeometry::Path(_)));
        assert_eq!(d[1].clips[0].stroke.map(|s| s.width), Some(2.0));
        assert_ne!(d[0].clips[0].key, d[1].clips[0].key);
        assert_eq!(d[0].clips[0].key.hash, d[1].clips[0].key.hash);
        assert_eq!(d[1].scissor, [0, 0, 9, 9]);
    }

    #[test]
    fn degenerate_stroke_paints_nothing() {
        let mut ops = Ops::new();
        let mut p = clip::Path::begin(&mut ops);
        p.line_to(pt(10.0, 10.0));
        let spec = p.end();
        paint::fill_shape(&mut ops, red(), &Stroke::new(spec, 0.0).op());
        let recording = Render::new(20, 20).collect(&ops, None);
        assert_eq!(recording.draw_count(), 0);
    }

    #[test]
    fn rotated_rect_becomes_path() {
        let mut ops = Ops::new();
        let t = op::affine(Affine2D::IDENTITY.rotate(Point::ZERO, 0.5)).push(&mut ops);
        paint::fill_shape(&mut ops, red(), &clip::Rect::new(0, 0, 10, 10).op());
        t.pop(&mut ops);
        let recording = Render::new(20, 20).collect(&ops, None);
        let d = draws(&recording);
        assert_eq!(d[0].clips.len(), 1);
        assert!(matches!(d[0].clips[0].geometry, ClipGeometry::Rect(_)));
    }

    #[test]
    fn load_restores_transform_only() {
        let mut ops = Ops::new();
        let state = op::save(&mut ops);
        op::offset(pt(5.0, 5.0)).add(&mut ops);
        ColorOp::new(red()).add(&mut ops);
        state.load(&mut ops);
        let stack = clip::Rect::new(0, 0, 2, 2).push(&mut ops);
        PaintOp.add(&mut ops);
        stack.pop(&mut ops);
        let recording = Render::new(20, 20).collect(&ops, None);
        let d = draws(&recording);
        assert_eq!(d[0].scissor, [0, 0, 2, 2]);
        assert!(matches!(d[0].material, MaterialParams::Color(c) if c == red()));
    }

    #[test]
    fn load_does_not_restore_popped_clip() {
        let mut ops = Ops::new();
        let stack = clip::Rect::new(0, 0, 10, 10).push(&mut ops);
        let state = op::save(&mut ops);
        stack.pop(&mut ops);
        state.load(&mut ops);
        paint::fill(&mut ops, Color::from_rgba8(255, 0, 0, 128));
        let recording = Render::new(100, 100).collect(&ops, None);
        let d = draws(&recording);
        assert_eq!(d.len(), 1);
        assert_eq!(d[0].scissor, [0, 0, 100, 100]);
        assert!(d[0].clips.is_empty());
    }

    #[test]
    fn saved_states_are_per_stream() {
        let mut ops = Ops::new();
        let state = op::save(&mut ops);

        let mut child = Ops::new();
        let recording = op::record(&mut child);
        op::offset(pt(50.0, 50.0)).add(&mut child);
        let _ = op::save(&mut child);
        let call = recording.stop(&mut child).into_shared(Arc::new(child));
        call.add(&mut ops);

        state.load(&mut ops);
        paint::fill_shape(&mut ops, red(), &clip::Rect::new(0, 0, 10, 10).op());
        let recording = Render::new(100, 100).collect(&ops, None);
        let d = draws(&recording);
        assert_eq!(d[0].scissor, [0, 0, 10, 10]);
    }

    #[test]
    fn opacity_stack() {
        let mut ops = Ops::new();
        let o1 = paint::push_opacity(&mut ops, 0.5);
        let o2 = paint::push_opacity(&mut ops, 0.5);
        paint::fill_shape(&mut ops, red(), &clip::Rect::new(0, 0, 2, 2).op());
        o2.pop(&mut ops);
        paint::fill_shape(&mut ops, red(), &clip::Rect::new(0, 0, 2, 2).op());
        o1.pop(&mut ops);
        let recording = Render::new(20, 20).collect(&ops, None);
        let d = draws(&recording);
        assert!((d[0].opacity - 0.25).abs() < 1e-6);
        assert!((d[1].opacity - 0.5).abs() < 1e-6);
    }

    #[test]
    fn singular_transform_skips_paint() {
        let mut ops = Ops::new();
        let t = op::affine(Affine2D::IDENTITY.scale(Point::ZERO, pt(0.0, 1.0))).push(&mut ops);
        paint::fill_shape(&mut ops, red(), &clip::Rect::new(0, 0, 2, 2).op());
        t.pop(&mut ops);
        let recording = Render::new(20, 20).collect(&ops, None);
        assert_eq!(recording.draw_count(), 0);
    }

    #[test]
    fn image_paint_is_clipped_to_image() {
        use std::sync::Arc;

        use peniko::{Blob, ImageAlphaType, ImageData, ImageFormat};

        let image = ImageData {
            data: Blob::new(Arc::new(vec![255_u8; 4 * 4 * 3])),
            format: ImageFormat::Rgba8,
            alpha_type: ImageAlphaType::Alpha,
            width: 4,
            height: 3,
        };
        let mut ops = Ops::new();
        ImageOp::new(image).add(&mut ops);
        PaintOp.add(&mut ops);
        let recording = Render::new(20, 20).collect(&ops, None);
        let d = draws(&recording);
        assert_eq!(d[0].scissor, [0, 0, 4, 3]);
    }
}
