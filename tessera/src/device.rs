// Copyright 2026 the Tessera Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The abstract rendering backend.
//!
//! A [`Device`] rasterizes line geometry into a coverage mask and covers masked pixels with a
//! material program. Handles it hands out are owned by the caller and returned through
//! [`Resource::release`].

use thiserror::Error;

use tessera_encoding::{Affine2D, Point};

/// A device-side object with an explicit release.
pub trait Resource {
    /// Releases the device memory behind the handle.
    fn release(self);
}

/// Errors reported by a [`Device`].
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum DeviceError {
    #[error("device out of memory")]
    OutOfMemory,
    #[error("unsupported texture format")]
    UnsupportedFormat,
    #[error("failed to create program {0:?}")]
    ProgramCreation(ProgramKind),
    #[error("failed to read back pixels")]
    Readback,
}

/// Pixel layout of texture data.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    /// sRGB encoded RGBA8 with separate alpha.
    Srgba8,
    /// sRGB encoded RGBA8 with premultiplied alpha.
    Srgba8Premultiplied,
}

impl TextureFormat {
    pub fn bytes_per_pixel(self) -> usize {
        4
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TextureFilter {
    Linear,
    Nearest,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum BufferBinding {
    /// Vertex positions, two f32 per vertex.
    Vertices,
    /// u16 indices.
    Indices,
}

/// The programs a device must provide.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ProgramKind {
    /// Rasterizes line pairs into the coverage mask under the non-zero rule.
    Stencil,
    Color,
    LinearGradient,
    RadialGradient,
    Image,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Primitive {
    /// Every two vertices form an edge.
    Lines,
    Triangles,
    TriangleStrip,
}

/// What a draw does with the coverage mask.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Coverage {
    /// Ignore the mask.
    Ignore,
    /// Only shade pixels inside the mask.
    Test,
    /// Replace the mask with the rasterized path.
    Replace,
    /// Keep the mask only where the rasterized path covers it.
    Intersect,
}

/// Material parameters, in material space. Colors are linear and premultiplied.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Material {
    None,
    Color([f32; 4]),
    LinearGradient {
        start: Point,
        end: Point,
        color1: [f32; 4],
        color2: [f32; 4],
    },
    RadialGradient {
        center: Point,
        radius: f32,
        offset: f32,
        color1: [f32; 4],
        color2: [f32; 4],
    },
    /// Samples the bound texture; material space is texel space.
    Image { width: u32, height: u32 },
}

impl Material {
    pub fn program(&self) -> ProgramKind {
        match self {
            Self::None => ProgramKind::Stencil,
            Self::Color(_) => ProgramKind::Color,
            Self::LinearGradient { .. } => ProgramKind::LinearGradient,
            Self::RadialGradient { .. } => ProgramKind::RadialGradient,
            Self::Image { .. } => ProgramKind::Image,
        }
    }
}

/// Per-draw program state.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Uniforms {
    /// Maps vertex positions to device pixels.
    pub transform: Affine2D,
    /// Maps device pixels to material space.
    pub material_transform: Affine2D,
    pub coverage: Coverage,
    pub opacity: f32,
    pub material: Material,
}

impl Uniforms {
    pub fn stencil(transform: Affine2D, coverage: Coverage) -> Self {
        Self {
            transform,
            material_transform: Affine2D::IDENTITY,
            coverage,
            opacity: 1.0,
            material: Material::None,
        }
    }
}

/// A rendering backend.
pub trait Device {
    type Buffer: Resource;
    type Texture: Resource;
    type Program: Resource;

    /// Starts a frame on a `width` × `height` target, optionally clearing it to a linear
    /// premultiplied color.
    fn begin_frame(&mut self, viewport: [u32; 2], clear: Option<[f32; 4]>);

    fn end_frame(&mut self);

    fn new_texture(
        &mut self,
        format: TextureFormat,
        width: u32,
        height: u32,
        filter: TextureFilter,
        pixels: &[u8],
    ) -> Result<Self::Texture, DeviceError>;

    /// Creates a writable buffer of `size` bytes.
    fn new_buffer(&mut self, binding: BufferBinding, size: usize) -> Result<Self::Buffer, DeviceError>;

    fn new_immutable_buffer(
        &mut self,
        binding: BufferBinding,
        data: &[u8],
    ) -> Result<Self::Buffer, DeviceError>;

    /// Writes `data` into a buffer created by [`Device::new_buffer`].
    fn write_buffer(&mut self, buffer: &Self::Buffer, data: &[u8]);

    fn new_program(&mut self, kind: ProgramKind) -> Result<Self::Program, DeviceError>;

    fn bind_program(&mut self, program: &Self::Program);

    fn bind_vertex_buffer(&mut self, buffer: &Self::Buffer);

    fn bind_index_buffer(&mut self, buffer: &Self::Buffer);

    fn bind_texture(&mut self, texture: &Self::Texture);

    fn set_uniforms(&mut self, uniforms: &Uniforms);

    /// Restricts drawing to the device pixel rectangle `[x0, y0, x1, y1)`.
    fn set_scissor(&mut self, rect: [u32; 4]);

    /// Draws `count` vertices starting at `first` from the bound vertex buffer.
    fn draw_arrays(&mut self, mode: Primitive, first: u32, count: u32);

    /// Draws `count` indices starting at `offset` from the bound index buffer.
    fn draw_elements(&mut self, mode: Primitive, offset: u32, count: u32);

    /// Reads the `[x0, y0, x1, y1)` rectangle as sRGB RGBA8 with premultiplied alpha.
    fn read_pixels(&mut self, rect: [u32; 4]) -> Result<Vec<u8>, DeviceError>;
}
