// Copyright 2026 the Tessera Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tessera renders retained operation streams with a stencil-then-cover [`Device`].
//!
//! Drawing is recorded into an [`Ops`] list with the builders of [`tessera_encoding`]. Each frame,
//! a [`Renderer`] decodes the list into draws, flattens clip paths into line geometry cached on
//! the device, rasterizes that geometry into a coverage mask and covers it with a color,
//! gradient or image material.
//!
//! ```ignore
//! let mut ops = Ops::new();
//! let clip = tessera::encoding::clip::Rect::new(0, 0, 50, 50).push(&mut ops);
//! paint::ColorOp::new(palette::css::RED).add(&mut ops);
//! paint::PaintOp.add(&mut ops);
//! clip.pop(&mut ops);
//!
//! let mut device = tessera::cpu::CpuDevice::new();
//! let mut renderer = Renderer::new(RendererOptions::default());
//! let params = RenderParams {
//!     base_color: Some(palette::css::TRANSPARENT),
//!     width: 100,
//!     height: 100,
//! };
//! renderer.render(&mut device, &ops, &params)?;
//! let pixels = device.read_pixels([0, 0, 100, 100])?;
//! ```

// LINEBENDER LINT SET - lib.rs - v2
// See https://linebender.org/wiki/canonical-lints/
// These lints aren't included in Cargo.toml because they
// shouldn't apply to examples and tests
#![warn(unused_crate_dependencies)]
#![warn(clippy::print_stdout, clippy::print_stderr)]
// Targeting e.g. 32-bit means structs containing usize can give false positives for 64-bit.
#![cfg_attr(target_pointer_width = "64", warn(clippy::trivially_copy_pass_by_ref))]
// END LINEBENDER LINT SET
#![cfg_attr(docsrs, feature(doc_auto_cfg))]
// The following lints are part of the Linebender standard set,
// but resolving them has been deferred for now.
// Feel free to send a PR that solves one or more of these.
#![allow(
    missing_docs,
    missing_debug_implementations,
    unnameable_types,
    unreachable_pub,
    clippy::cast_possible_truncation,
    clippy::missing_assert_message,
    clippy::shadow_unrelated,
    reason = "Deferred"
)]

mod cache;
mod engine;
mod recording;
mod render;

pub mod cpu;
pub mod device;
pub mod parallel;

pub mod low_level {
    //! Pieces of the renderer for building an alternative to [`Renderer`][crate::Renderer].

    pub use crate::cache::ResourceCache;
    pub use crate::recording::{
        ClipGeometry, ClipPath, Command, DrawParams, MaterialParams, PathKey, Recording,
    };
    pub use crate::render::Render;
}

/// Styling and composition primitives.
pub use peniko;
/// Operation stream encoding.
pub use tessera_encoding as encoding;

pub use device::{Device, DeviceError};
pub use parallel::record_parallel;
pub use tessera_encoding::{Affine2D, Ops};

use peniko::Color;
use thiserror::Error;

use engine::Engine;
use tessera_encoding::paint::linear_premul;

/// Errors that can occur in Tessera.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// The device failed to create or read back a resource.
    #[error(transparent)]
    Device(#[from] DeviceError),
    /// The render target has no pixels.
    #[error("invalid render target of size {0}x{1}")]
    InvalidTarget(u32, u32),
    /// Failed to start a worker thread.
    #[error("failed to spawn worker thread")]
    Spawn(#[source] std::io::Error),
}

pub(crate) type Result<T, E = Error> = std::result::Result<T, E>;

/// Options for creating a [`Renderer`].
#[derive(Copy, Clone, Debug)]
pub struct RendererOptions {
    /// Number of frames cached path geometry and textures survive without being used.
    pub max_age: u64,
    /// Flattening tolerance of clip paths, in device pixels.
    pub tolerance: f32,
}

impl Default for RendererOptions {
    fn default() -> Self {
        Self {
            max_age: 1,
            tolerance: 0.1,
        }
    }
}

/// Parameters used in a single render that are configurable by the client.
#[derive(Copy, Clone, Debug)]
pub struct RenderParams {
    /// Color the target is cleared to. `None` keeps its previous contents.
    pub base_color: Option<Color>,
    pub width: u32,
    pub height: u32,
}

/// Renders op streams to a [`Device`], keeping device resources alive between frames.
pub struct Renderer<D: Device> {
    engine: Engine<D>,
    frames: u64,
}

impl<D: Device> Renderer<D> {
    pub fn new(options: RendererOptions) -> Self {
        log::debug!(
            "creating renderer with max age {} and tolerance {}",
            options.max_age,
            options.tolerance
        );
        Self {
            engine: Engine::new(options.max_age, options.tolerance),
            frames: 0,
        }
    }

    /// Renders `ops` to `device`.
    ///
    /// Cached resources not used during this frame age by one, and those older than
    /// [`RendererOptions::max_age`] are released.
    pub fn render(&mut self, device: &mut D, ops: &Ops, params: &RenderParams) -> Result<()> {
        if params.width == 0 || params.height == 0 {
            return Err(Error::InvalidTarget(params.width, params.height));
        }
        let clear = params.base_color.map(linear_premul);
        let recording = render::Render::new(params.width, params.height).collect(ops, clear);
        log::trace!(
            "frame {}: {} draws",
            self.frames,
            recording.draw_count()
        );
        let result = self
            .engine
            .run_recording(device, &recording, [params.width, params.height]);
        self.engine.frame();
        self.frames += 1;
        result
    }

    /// Renders `ops` and reads the whole target back as sRGB RGBA8 with premultiplied alpha.
    pub fn render_to_pixels(
        &mut self,
        device: &mut D,
        ops: &Ops,
        params: &RenderParams,
    ) -> Result<Vec<u8>> {
        self.render(device, ops, params)?;
        Ok(device.read_pixels([0, 0, params.width, params.height])?)
    }

    /// Number of clip paths with geometry on the device.
    pub fn cached_paths(&self) -> usize {
        self.engine.cached_paths()
    }
}
