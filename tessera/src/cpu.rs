// Copyright 2026 the Tessera Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A software [`Device`] that rasterizes at pixel centers.
//!
//! It is slow and exact, which makes it the reference backend for tests.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use peniko::color::{AlphaColor, Srgb};
use smallvec::SmallVec;

use tessera_encoding::paint::{from_linear_premul, linear_premul};
use tessera_encoding::{pt, Point};

use crate::device::{
    BufferBinding, Coverage, Device, DeviceError, Material, Primitive, ProgramKind, Resource,
    TextureFilter, TextureFormat, Uniforms,
};

/// Counts of device objects created and released.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct DeviceStats {
    pub buffers_created: usize,
    pub buffers_released: usize,
    pub textures_created: usize,
    pub textures_released: usize,
    pub programs_created: usize,
    pub programs_released: usize,
}

impl DeviceStats {
    /// Objects created and not yet released.
    pub fn live(&self) -> usize {
        self.buffers_created + self.textures_created + self.programs_created
            - self.buffers_released
            - self.textures_released
            - self.programs_released
    }
}

#[derive(Default)]
struct Counters(Cell<DeviceStats>);

impl Counters {
    fn update(&self, f: impl FnOnce(&mut DeviceStats)) {
        let mut stats = self.0.get();
        f(&mut stats);
        self.0.set(stats);
    }
}

pub struct CpuBuffer {
    binding: BufferBinding,
    data: Rc<RefCell<Vec<u8>>>,
    counters: Rc<Counters>,
}

impl Resource for CpuBuffer {
    fn release(self) {
        self.counters.update(|s| s.buffers_released += 1);
    }
}

struct Texels {
    width: u32,
    height: u32,
    filter: TextureFilter,
    /// Linear premultiplied.
    texels: Vec<[f32; 4]>,
}

impl Texels {
    fn texel(&self, x: i64, y: i64) -> [f32; 4] {
        let x = x.clamp(0, self.width as i64 - 1) as usize;
        let y = y.clamp(0, self.height as i64 - 1) as usize;
        self.texels[y * self.width as usize + x]
    }

    /// Samples at `p` in texel space. Outside the image is transparent.
    fn sample(&self, p: Point) -> [f32; 4] {
        if !(p.x >= 0.0 && p.y >= 0.0 && p.x < self.width as f32 && p.y < self.height as f32) {
            return [0.0; 4];
        }
        match self.filter {
            TextureFilter::Nearest => self.texel(p.x as i64, p.y as i64),
            TextureFilter::Linear => {
                let (x, y) = (p.x - 0.5, p.y - 0.5);
                let (x0, y0) = (x.floor(), y.floor());
                let (fx, fy) = (x - x0, y - y0);
                let (x0, y0) = (x0 as i64, y0 as i64);
                let top = mix(self.texel(x0, y0), self.texel(x0 + 1, y0), fx);
                let bottom = mix(self.texel(x0, y0 + 1), self.texel(x0 + 1, y0 + 1), fx);
                mix(top, bottom, fy)
            }
        }
    }
}

pub struct CpuTexture {
    texels: Rc<Texels>,
    counters: Rc<Counters>,
}

impl Resource for CpuTexture {
    fn release(self) {
        self.counters.update(|s| s.textures_released += 1);
    }
}

pub struct CpuProgram {
    kind: ProgramKind,
    counters: Rc<Counters>,
}

impl Resource for CpuProgram {
    fn release(self) {
        self.counters.update(|s| s.programs_released += 1);
    }
}

/// Software rendering target and rasterizer.
pub struct CpuDevice {
    width: u32,
    height: u32,
    /// Linear premultiplied.
    pixels: Vec<[f32; 4]>,
    mask: Vec<bool>,
    scissor: [u32; 4],
    program: Option<ProgramKind>,
    vertices: Option<Rc<RefCell<Vec<u8>>>>,
    indices: Option<Rc<RefCell<Vec<u8>>>>,
    texture: Option<Rc<Texels>>,
    uniforms: Uniforms,
    counters: Rc<Counters>,
}

impl Default for CpuDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl CpuDevice {
    pub fn new() -> Self {
        Self {
            width: 0,
            height: 0,
            pixels: Vec::new(),
            mask: Vec::new(),
            scissor: [0; 4],
            program: None,
            vertices: None,
            indices: None,
            texture: None,
            uniforms: Uniforms::stencil(Default::default(), Coverage::Ignore),
            counters: Rc::default(),
        }
    }

    pub fn stats(&self) -> DeviceStats {
        self.counters.0.get()
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    fn vertex_data(&self) -> Vec<Point> {
        let Some(vertices) = &self.vertices else {
            log::warn!("draw without a vertex buffer");
            return Vec::new();
        };
        vertices
            .borrow()
            .chunks_exact(size_of::<Point>())
            .map(bytemuck::pod_read_unaligned::<Point>)
            .collect()
    }

    fn draw(&mut self, mode: Primitive, points: &[Point]) {
        let t = self.uniforms.transform;
        let points: Vec<Point> = points.iter().map(|p| t.transform(*p)).collect();
        match (self.program, mode) {
            (None, _) => log::warn!("draw without a program"),
            (Some(ProgramKind::Stencil), Primitive::Lines) => self.stencil(&points),
            (Some(ProgramKind::Stencil), _) => log::warn!("stencil draws take lines"),
            (Some(_), Primitive::Triangles) => {
                let triangles: Vec<[Point; 3]> = points
                    .chunks_exact(3)
                    .map(|t| [t[0], t[1], t[2]])
                    .collect();
                self.cover(&triangles);
            }
            (Some(_), Primitive::TriangleStrip) => {
                let triangles: Vec<[Point; 3]> = points
                    .windows(3)
                    .map(|t| [t[0], t[1], t[2]])
                    .collect();
                self.cover(&triangles);
            }
            (Some(_), Primitive::Lines) => log::warn!("cover draws take triangles"),
        }
    }

    /// Rasterizes edges under the non-zero rule into the coverage mask.
    fn stencil(&mut self, points: &[Point]) {
        let coverage = self.uniforms.coverage;
        let [x0, y0, x1, y1] = self.scissor;
        for y in y0..y1 {
            let cy = y as f32 + 0.5;
            let mut crossings: SmallVec<[(f32, i32); 16]> = points
                .chunks_exact(2)
                .filter_map(|e| {
                    let (a, b) = (e[0], e[1]);
                    if (a.y <= cy) == (b.y <= cy) {
                        return None;
                    }
                    let x = a.x + (cy - a.y) / (b.y - a.y) * (b.x - a.x);
                    Some((x, if b.y > a.y { 1 } else { -1 }))
                })
                .collect();
            crossings.sort_by(|a, b| a.0.total_cmp(&b.0));
            let mut winding = 0;
            let mut next = 0;
            for x in x0..x1 {
                let cx = x as f32 + 0.5;
                while next < crossings.len() && crossings[next].0 <= cx {
                    winding += crossings[next].1;
                    next += 1;
                }
                let inside = winding != 0;
                let m = &mut self.mask[(y * self.width + x) as usize];
                match coverage {
                    Coverage::Replace => *m = inside,
                    Coverage::Intersect => *m &= inside,
                    Coverage::Ignore | Coverage::Test => {}
                }
            }
        }
    }

    /// Shades and blends every pixel center inside the triangles.
    fn cover(&mut self, triangles: &[[Point; 3]]) {
        let [x0, y0, x1, y1] = self.scissor;
        let stride = (x1 - x0) as usize;
        let mut hit = vec![false; stride * (y1 - y0) as usize];
        for [a, b, c] in triangles {
            let area = (*b - *a).cross(*c - *a);
            if area == 0.0 {
                continue;
            }
            for y in y0..y1 {
                for x in x0..x1 {
                    let p = pt(x as f32 + 0.5, y as f32 + 0.5);
                    let w = [
                        (*b - *a).cross(p - *a),
                        (*c - *b).cross(p - *b),
                        (*a - *c).cross(p - *c),
                    ];
                    if w.iter().all(|w| w * area >= 0.0) {
                        hit[(y - y0) as usize * stride + (x - x0) as usize] = true;
                    }
                }
            }
        }
        let uniforms = self.uniforms;
        for y in y0..y1 {
            for x in x0..x1 {
                if !hit[(y - y0) as usize * stride + (x - x0) as usize] {
                    continue;
                }
                let idx = (y * self.width + x) as usize;
                if uniforms.coverage == Coverage::Test && !self.mask[idx] {
                    continue;
                }
                let p = uniforms
                    .material_transform
                    .transform(pt(x as f32 + 0.5, y as f32 + 0.5));
                let src = self.shade(&uniforms.material, p).map(|c| c * uniforms.opacity);
                let dst = &mut self.pixels[idx];
                *dst = std::array::from_fn(|i| src[i] + dst[i] * (1.0 - src[3]));
            }
        }
    }

    fn shade(&self, material: &Material, p: Point) -> [f32; 4] {
        match *material {
            Material::None => [0.0; 4],
            Material::Color(c) => c,
            Material::LinearGradient {
                start,
                end,
                color1,
                color2,
            } => {
                let d = end - start;
                let len2 = d.dot(d);
                let t = if len2 > 0.0 {
                    ((p - start).dot(d) / len2).clamp(0.0, 1.0)
                } else {
                    1.0
                };
                mix(color1, color2, t)
            }
            Material::RadialGradient {
                center,
                radius,
                offset,
                color1,
                color2,
            } => {
                let r = if radius > 0.0 {
                    p.distance(center) / radius
                } else {
                    1.0
                };
                let t = if offset < 1.0 {
                    ((r - offset) / (1.0 - offset)).clamp(0.0, 1.0)
                } else if r < 1.0 {
                    0.0
                } else {
                    1.0
                };
                mix(color1, color2, t)
            }
            Material::Image { .. } => match &self.texture {
                Some(texture) => texture.sample(p),
                None => [0.0; 4],
            },
        }
    }
}

fn mix(a: [f32; 4], b: [f32; 4], t: f32) -> [f32; 4] {
    std::array::from_fn(|i| a[i] + (b[i] - a[i]) * t)
}

impl Device for CpuDevice {
    type Buffer = CpuBuffer;
    type Texture = CpuTexture;
    type Program = CpuProgram;

    fn begin_frame(&mut self, viewport: [u32; 2], clear: Option<[f32; 4]>) {
        let [width, height] = viewport;
        if (width, height) != (self.width, self.height) {
            self.width = width;
            self.height = height;
            let len = width as usize * height as usize;
            self.pixels = vec![[0.0; 4]; len];
            self.mask = vec![false; len];
        }
        if let Some(color) = clear {
            self.pixels.fill(color);
        }
        self.scissor = [0, 0, width, height];
    }

    fn end_frame(&mut self) {
        self.program = None;
        self.vertices = None;
        self.indices = None;
        self.texture = None;
    }

    fn new_texture(
        &mut self,
        format: TextureFormat,
        width: u32,
        height: u32,
        filter: TextureFilter,
        pixels: &[u8],
    ) -> Result<CpuTexture, DeviceError> {
        let len = width as usize * height as usize;
        if width == 0 || height == 0 || pixels.len() < len * format.bytes_per_pixel() {
            return Err(DeviceError::UnsupportedFormat);
        }
        let texels = pixels
            .chunks_exact(4)
            .take(len)
            .map(|p| {
                let [r, g, b, a] = [p[0], p[1], p[2], p[3]];
                let straight = match format {
                    TextureFormat::Srgba8 => [r, g, b, a],
                    TextureFormat::Srgba8Premultiplied if a == 0 => [0; 4],
                    TextureFormat::Srgba8Premultiplied => {
                        let unpremultiply =
                            |c: u8| ((c as u32 * 255 + a as u32 / 2) / a as u32).min(255) as u8;
                        [unpremultiply(r), unpremultiply(g), unpremultiply(b), a]
                    }
                };
                linear_premul(AlphaColor::<Srgb>::from_rgba8(
                    straight[0],
                    straight[1],
                    straight[2],
                    straight[3],
                ))
            })
            .collect();
        self.counters.update(|s| s.textures_created += 1);
        Ok(CpuTexture {
            texels: Rc::new(Texels {
                width,
                height,
                filter,
                texels,
            }),
            counters: self.counters.clone(),
        })
    }

    fn new_buffer(&mut self, binding: BufferBinding, size: usize) -> Result<CpuBuffer, DeviceError> {
        self.counters.update(|s| s.buffers_created += 1);
        Ok(CpuBuffer {
            binding,
            data: Rc::new(RefCell::new(vec![0; size])),
            counters: self.counters.clone(),
        })
    }

    fn new_immutable_buffer(
        &mut self,
        binding: BufferBinding,
        data: &[u8],
    ) -> Result<CpuBuffer, DeviceError> {
        self.counters.update(|s| s.buffers_created += 1);
        Ok(CpuBuffer {
            binding,
            data: Rc::new(RefCell::new(data.to_vec())),
            counters: self.counters.clone(),
        })
    }

    fn write_buffer(&mut self, buffer: &CpuBuffer, data: &[u8]) {
        let mut contents = buffer.data.borrow_mut();
        contents.clear();
        contents.extend_from_slice(data);
    }

    fn new_program(&mut self, kind: ProgramKind) -> Result<CpuProgram, DeviceError> {
        self.counters.update(|s| s.programs_created += 1);
        Ok(CpuProgram {
            kind,
            counters: self.counters.clone(),
        })
    }

    fn bind_program(&mut self, program: &CpuProgram) {
        self.program = Some(program.kind);
    }

    fn bind_vertex_buffer(&mut self, buffer: &CpuBuffer) {
        if buffer.binding != BufferBinding::Vertices {
            log::warn!("binding {:?} buffer as vertices", buffer.binding);
        }
        self.vertices = Some(buffer.data.clone());
    }

    fn bind_index_buffer(&mut self, buffer: &CpuBuffer) {
        if buffer.binding != BufferBinding::Indices {
            log::warn!("binding {:?} buffer as indices", buffer.binding);
        }
        self.indices = Some(buffer.data.clone());
    }

    fn bind_texture(&mut self, texture: &CpuTexture) {
        self.texture = Some(texture.texels.clone());
    }

    fn set_uniforms(&mut self, uniforms: &Uniforms) {
        self.uniforms = *uniforms;
    }

    fn set_scissor(&mut self, rect: [u32; 4]) {
        let x1 = rect[2].min(self.width);
        let y1 = rect[3].min(self.height);
        self.scissor = [rect[0].min(x1), rect[1].min(y1), x1, y1];
    }

    fn draw_arrays(&mut self, mode: Primitive, first: u32, count: u32) {
        let vertices = self.vertex_data();
        let start = (first as usize).min(vertices.len());
        let end = (start + count as usize).min(vertices.len());
        self.draw(mode, &vertices[start..end]);
    }

    fn draw_elements(&mut self, mode: Primitive, offset: u32, count: u32) {
        let vertices = self.vertex_data();
        let Some(indices) = &self.indices else {
            log::warn!("indexed draw without an index buffer");
            return;
        };
        let points: Vec<Point> = indices
            .borrow()
            .chunks_exact(2)
            .skip(offset as usize)
            .take(count as usize)
            .filter_map(|i| vertices.get(u16::from_le_bytes([i[0], i[1]]) as usize).copied())
            .collect();
        self.draw(mode, &points);
    }

    fn read_pixels(&mut self, rect: [u32; 4]) -> Result<Vec<u8>, DeviceError> {
        let [x0, y0, x1, y1] = rect;
        if x0 > x1 || y0 > y1 || x1 > self.width || y1 > self.height {
            return Err(DeviceError::Readback);
        }
        let mut out = Vec::with_capacity(((x1 - x0) * (y1 - y0) * 4) as usize);
        for y in y0..y1 {
            for x in x0..x1 {
                let c = self.pixels[(y * self.width + x) as usize];
                let rgba = from_linear_premul(c).to_rgba8();
                let premul = |v: u8| ((v as u32 * rgba.a as u32 + 127) / 255) as u8;
                out.extend([premul(rgba.r), premul(rgba.g), premul(rgba.b), rgba.a]);
            }
        }
        Ok(out)
    }
}
