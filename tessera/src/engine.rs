// Copyright 2026 the Tessera Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use peniko::{ImageAlphaType, ImageData, ImageFormat};

use tessera_encoding::clip::decode_segments;
use tessera_encoding::paint::{linear_premul, ImageFilter};
use tessera_encoding::{pt, Affine2D, Quad, StrokeQuad, StrokeQuads};

use crate::cache::ResourceCache;
use crate::device::{
    BufferBinding, Coverage, Device, DeviceError, Material, Primitive, ProgramKind, Resource,
    TextureFilter, TextureFormat, Uniforms,
};
use crate::recording::{ClipGeometry, ClipPath, Command, DrawParams, MaterialParams, PathKey, Recording};
use crate::Result;

/// Flattened clip path geometry on the device.
pub(crate) struct PathGeometry<B> {
    buffer: B,
    vertices: u32,
}

impl<B: Resource> Resource for PathGeometry<B> {
    fn release(self) {
        self.buffer.release();
    }
}

/// The rectangle every cover draw is made of.
struct CoverQuad<B> {
    vertices: B,
    indices: B,
}

const QUAD_INDICES: [u16; 6] = [0, 1, 2, 0, 2, 3];

/// Executes recordings against a [`Device`], caching what it uploads.
pub(crate) struct Engine<D: Device> {
    paths: ResourceCache<PathKey, PathGeometry<D::Buffer>>,
    textures: ResourceCache<(u64, TextureFilter), D::Texture>,
    programs: ResourceCache<ProgramKind, D::Program>,
    quad: Option<CoverQuad<D::Buffer>>,
    tolerance: f32,
}

impl<D: Device> Engine<D> {
    pub(crate) fn new(max_age: u64, tolerance: f32) -> Self {
        Self {
            paths: ResourceCache::new(max_age),
            textures: ResourceCache::new(max_age),
            // Programs live as long as the engine.
            programs: ResourceCache::new(u64::MAX),
            quad: None,
            tolerance,
        }
    }

    pub(crate) fn run_recording(
        &mut self,
        device: &mut D,
        recording: &Recording<'_>,
        viewport: [u32; 2],
    ) -> Result<()> {
        let (clear, commands) = match recording.commands.split_first() {
            Some((Command::Clear(color), rest)) => (Some(*color), rest),
            _ => (None, &recording.commands[..]),
        };
        device.begin_frame(viewport, clear);
        let result = self.run_commands(device, commands, viewport);
        device.end_frame();
        result
    }

    fn run_commands(
        &mut self,
        device: &mut D,
        commands: &[Command<'_>],
        viewport: [u32; 2],
    ) -> Result<()> {
        for command in commands {
            match command {
                Command::Clear(color) => {
                    log::debug!("clear in the middle of a recording");
                    self.cover(
                        device,
                        [0, 0, viewport[0], viewport[1]],
                        Material::Color(*color),
                        Affine2D::IDENTITY,
                        Coverage::Ignore,
                        1.0,
                        None,
                    )?;
                }
                Command::Draw(draw) => self.draw(device, draw)?,
            }
        }
        Ok(())
    }

    /// Ends a frame, evicting unused geometry and textures.
    pub(crate) fn frame(&mut self) {
        self.paths.frame();
        self.textures.frame();
    }

    pub(crate) fn cached_paths(&self) -> usize {
        self.paths.len()
    }

    fn draw(&mut self, device: &mut D, draw: &DrawParams<'_>) -> Result<()> {
        let tolerance = self.tolerance;
        device.set_scissor(draw.scissor);
        // Stencil: rasterize every clip path into the coverage mask.
        for (i, clip) in draw.clips.iter().enumerate() {
            let geometry = self
                .paths
                .get_or_try_insert_with(clip.key, || build_path(device, clip, tolerance))?;
            let program = get_program(&mut self.programs, device, ProgramKind::Stencil)?;
            device.bind_program(program);
            let coverage = if i == 0 {
                Coverage::Replace
            } else {
                Coverage::Intersect
            };
            device.set_uniforms(&Uniforms::stencil(clip.transform, coverage));
            device.bind_vertex_buffer(&geometry.buffer);
            device.draw_arrays(Primitive::Lines, 0, geometry.vertices);
        }
        // Cover: shade the scissor rectangle where the mask allows.
        let coverage = if draw.clips.is_empty() {
            Coverage::Ignore
        } else {
            Coverage::Test
        };
        let (material, image) = match &draw.material {
            MaterialParams::Color(c) => (Material::Color(linear_premul(*c)), None),
            MaterialParams::LinearGradient(g) => (
                Material::LinearGradient {
                    start: g.stop1,
                    end: g.stop2,
                    color1: linear_premul(g.color1),
                    color2: linear_premul(g.color2),
                },
                None,
            ),
            MaterialParams::RadialGradient(g) => (
                Material::RadialGradient {
                    center: g.center,
                    radius: g.center.distance(g.edge),
                    offset: g.offset,
                    color1: linear_premul(g.color1),
                    color2: linear_premul(g.color2),
                },
                None,
            ),
            MaterialParams::Image(op) => (
                Material::Image {
                    width: op.image.width,
                    height: op.image.height,
                },
                Some((&op.image, op.filter)),
            ),
        };
        self.cover(
            device,
            draw.scissor,
            material,
            draw.transform.invert(),
            coverage,
            draw.opacity,
            image,
        )
    }

    #[allow(clippy::too_many_arguments, reason = "Mirrors the uniforms of a cover draw")]
    fn cover(
        &mut self,
        device: &mut D,
        scissor: [u32; 4],
        material: Material,
        material_transform: Affine2D,
        coverage: Coverage,
        opacity: f32,
        image: Option<(&ImageData, ImageFilter)>,
    ) -> Result<()> {
        device.set_scissor(scissor);
        let program = get_program(&mut self.programs, device, material.program())?;
        device.bind_program(program);
        if let Some((image, filter)) = image {
            let filter = match filter {
                ImageFilter::Linear => TextureFilter::Linear,
                ImageFilter::Nearest => TextureFilter::Nearest,
            };
            let texture = self
                .textures
                .get_or_try_insert_with((image.data.id(), filter), || {
                    upload_image(device, image, filter)
                })?;
            device.bind_texture(texture);
        }
        let quad = match self.quad.take() {
            Some(quad) => quad,
            None => new_cover_quad(device)?,
        };
        let quad = self.quad.insert(quad);
        let [x0, y0, x1, y1] = scissor.map(|v| v as f32);
        let corners = [pt(x0, y0), pt(x1, y0), pt(x1, y1), pt(x0, y1)];
        device.write_buffer(&quad.vertices, bytemuck::cast_slice(&corners));
        device.set_uniforms(&Uniforms {
            transform: Affine2D::IDENTITY,
            material_transform,
            coverage,
            opacity,
            material,
        });
        device.bind_vertex_buffer(&quad.vertices);
        device.bind_index_buffer(&quad.indices);
        device.draw_elements(Primitive::Triangles, 0, QUAD_INDICES.len() as u32);
        Ok(())
    }
}

impl<D: Device> Drop for Engine<D> {
    fn drop(&mut self) {
        if let Some(quad) = self.quad.take() {
            quad.vertices.release();
            quad.indices.release();
        }
    }
}

fn new_cover_quad<D: Device>(device: &mut D) -> Result<CoverQuad<D::Buffer>, DeviceError> {
    let vertices = device.new_buffer(BufferBinding::Vertices, 4 * 8)?;
    let indices = match device
        .new_immutable_buffer(BufferBinding::Indices, bytemuck::cast_slice(&QUAD_INDICES))
    {
        Ok(indices) => indices,
        Err(err) => {
            vertices.release();
            return Err(err);
        }
    };
    Ok(CoverQuad { vertices, indices })
}

fn get_program<'c, D: Device>(
    programs: &'c mut ResourceCache<ProgramKind, D::Program>,
    device: &mut D,
    kind: ProgramKind,
) -> Result<&'c D::Program, DeviceError> {
    programs.get_or_try_insert_with(kind, || {
        log::info!("creating {kind:?} program");
        device.new_program(kind)
    })
}

/// Flattens (and strokes) a clip path into line pairs and uploads them.
fn build_path<D: Device>(
    device: &mut D,
    clip: &ClipPath<'_>,
    tolerance: f32,
) -> Result<PathGeometry<D::Buffer>, DeviceError> {
    let tolerance = clip.key.tolerance(tolerance);
    let quads = match clip.geometry {
        ClipGeometry::Path(aux) => StrokeQuads::from_segments(decode_segments(aux), tolerance),
        ClipGeometry::Rect(r) => {
            let corners = [r.min, pt(r.max.x, r.min.y), r.max, pt(r.min.x, r.max.y)];
            StrokeQuads(
                (0..4)
                    .map(|i| StrokeQuad {
                        contour: 0,
                        quad: Quad::line(corners[i], corners[(i + 1) % 4]),
                    })
                    .collect(),
            )
        }
    };
    let outline = match &clip.stroke {
        Some(style) => quads.stroke(style, clip.dashes.as_ref()),
        None => quads,
    };
    let lines = outline.to_lines(tolerance);
    log::debug!("uploading clip path with {} edges", lines.len());
    let buffer = device.new_immutable_buffer(BufferBinding::Vertices, bytemuck::cast_slice(&lines))?;
    Ok(PathGeometry {
        buffer,
        vertices: (lines.len() * 2) as u32,
    })
}

fn upload_image<D: Device>(
    device: &mut D,
    image: &ImageData,
    filter: TextureFilter,
) -> Result<D::Texture, DeviceError> {
    let format = match (image.format, image.alpha_type) {
        (ImageFormat::Rgba8, ImageAlphaType::Alpha) => TextureFormat::Srgba8,
        (ImageFormat::Rgba8, ImageAlphaType::AlphaPremultiplied) => {
            TextureFormat::Srgba8Premultiplied
        }
        _ => return Err(DeviceError::UnsupportedFormat),
    };
    log::debug!("uploading {}x{} image", image.width, image.height);
    device.new_texture(format, image.width, image.height, filter, image.data.data())
}

#[cfg(test)]
mod tests {
    use peniko::Color;
    use tessera_encoding::{clip, paint, Ops};

    use super::*;
    use crate::cpu::{CpuBuffer, CpuDevice, CpuProgram, CpuTexture};
    use crate::render::Render;

    /// A CPU device that cannot allocate index buffers.
    #[derive(Default)]
    struct NoIndices {
        inner: CpuDevice,
        frames_ended: usize,
    }

    impl Device for NoIndices {
        type Buffer = CpuBuffer;
        type Texture = CpuTexture;
        type Program = CpuProgram;

        fn begin_frame(&mut self, viewport: [u32; 2], clear: Option<[f32; 4]>) {
            self.inner.begin_frame(viewport, clear);
        }

        fn end_frame(&mut self) {
            self.frames_ended += 1;
            self.inner.end_frame();
        }

        fn new_texture(
            &mut self,
            format: TextureFormat,
            width: u32,
            height: u32,
            filter: TextureFilter,
            pixels: &[u8],
        ) -> Result<CpuTexture, DeviceError> {
            self.inner.new_texture(format, width, height, filter, pixels)
        }

        fn new_buffer(&mut self, binding: BufferBinding, size: usize) -> Result<CpuBuffer, DeviceError> {
            self.inner.new_buffer(binding, size)
        }

        fn new_immutable_buffer(
            &mut self,
            binding: BufferBinding,
            data: &[u8],
        ) -> Result<CpuBuffer, DeviceError> {
            if binding == BufferBinding::Indices {
                return Err(DeviceError::OutOfMemory);
            }
            self.inner.new_immutable_buffer(binding, data)
        }

        fn write_buffer(&mut self, buffer: &CpuBuffer, data: &[u8]) {
            self.inner.write_buffer(buffer, data);
        }

        fn new_program(&mut self, kind: ProgramKind) -> Result<CpuProgram, DeviceError> {
            self.inner.new_program(kind)
        }

        fn bind_program(&mut self, program: &CpuProgram) {
            self.inner.bind_program(program);
        }

        fn bind_vertex_buffer(&mut self, buffer: &CpuBuffer) {
            self.inner.bind_vertex_buffer(buffer);
        }

        fn bind_index_buffer(&mut self, buffer: &CpuBuffer) {
            self.inner.bind_index_buffer(buffer);
        }

        fn bind_texture(&mut self, texture: &CpuTexture) {
            self.inner.bind_texture(texture);
        }

        fn set_uniforms(&mut self, uniforms: &Uniforms) {
            self.inner.set_uniforms(uniforms);
        }

        fn set_scissor(&mut self, rect: [u32; 4]) {
            self.inner.set_scissor(rect);
        }

        fn draw_arrays(&mut self, mode: Primitive, first: u32, count: u32) {
            self.inner.draw_arrays(mode, first, count);
        }

        fn draw_elements(&mut self, mode: Primitive, offset: u32, count: u32) {
            self.inner.draw_elements(mode, offset, count);
        }

        fn read_pixels(&mut self, rect: [u32; 4]) -> Result<Vec<u8>, DeviceError> {
            self.inner.read_pixels(rect)
        }
    }

    #[test]
    fn failed_cover_quad_releases_and_ends_frame() {
        let mut ops = Ops::new();
        let red = Color::from_rgba8(255, 0, 0, 255);
        paint::fill_shape(&mut ops, red, &clip::Rect::new(0, 0, 5, 5).op());
        let recording = Render::new(10, 10).collect(&ops, None);

        let mut device = NoIndices::default();
        let mut engine = Engine::<NoIndices>::new(1, 0.1);
        let result = engine.run_recording(&mut device, &recording, [10, 10]);
        assert!(matches!(result, Err(crate::Error::Device(DeviceError::OutOfMemory))));
        assert_eq!(device.frames_ended, 1);

        let stats = device.inner.stats();
        assert_eq!(stats.buffers_created, stats.buffers_released);
        drop(engine);
        assert_eq!(device.inner.stats().live(), 0);
    }
}
