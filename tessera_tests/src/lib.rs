// Copyright 2026 the Tessera Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tessera tests.

// LINEBENDER LINT SET - lib.rs - v2
// See https://linebender.org/wiki/canonical-lints/
// These lints aren't included in Cargo.toml because they
// shouldn't apply to examples and tests
#![warn(unused_crate_dependencies)]
#![warn(clippy::print_stdout, clippy::print_stderr)]
// Targeting e.g. 32-bit means structs containing usize can give false positives for 64-bit.
#![cfg_attr(target_pointer_width = "64", warn(clippy::trivially_copy_pass_by_ref))]
// END LINEBENDER LINT SET
#![cfg_attr(docsrs, feature(doc_cfg))]
// The following lints are part of the Linebender standard set,
// but resolving them has been deferred for now.
// Feel free to send a PR that solves one or more of these.
#![allow(
    missing_debug_implementations,
    unreachable_pub,
    missing_docs,
    clippy::missing_assert_message,
    clippy::print_stderr,
    clippy::print_stdout,
    clippy::allow_attributes_without_reason
)]

use anyhow::{ensure, Result};
use tessera::cpu::{CpuDevice, DeviceStats};
use tessera::peniko::Color;
use tessera::{Ops, RenderParams, Renderer, RendererOptions};

pub struct TestParams {
    pub width: u32,
    pub height: u32,
    pub base_color: Option<Color>,
    pub name: String,
}

impl TestParams {
    pub fn new(name: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            base_color: Some(tessera::peniko::color::palette::css::TRANSPARENT),
            name: name.into(),
        }
    }

    fn render_params(&self) -> RenderParams {
        RenderParams {
            base_color: self.base_color,
            width: self.width,
            height: self.height,
        }
    }
}

/// Premultiplied sRGB RGBA8 pixels read back from a render.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Image {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl Image {
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = (y * self.width + x) as usize * 4;
        [self.data[i], self.data[i + 1], self.data[i + 2], self.data[i + 3]]
    }

    /// Number of pixels equal to `rgba`.
    pub fn count(&self, rgba: [u8; 4]) -> usize {
        self.data.chunks_exact(4).filter(|p| *p == rgba).count()
    }
}

/// A CPU device and a renderer kept across frames.
pub struct Harness {
    pub device: CpuDevice,
    pub renderer: Renderer<CpuDevice>,
}

impl Default for Harness {
    fn default() -> Self {
        Self::new(RendererOptions::default())
    }
}

impl Harness {
    pub fn new(options: RendererOptions) -> Self {
        Self {
            device: CpuDevice::new(),
            renderer: Renderer::new(options),
        }
    }

    pub fn render(&mut self, ops: &Ops, params: &TestParams) -> Result<Image> {
        let data = self
            .renderer
            .render_to_pixels(&mut self.device, ops, &params.render_params())?;
        ensure!(
            data.len() == (params.width * params.height * 4) as usize,
            "{}: unexpected readback size {}",
            params.name,
            data.len()
        );
        Ok(Image {
            width: params.width,
            height: params.height,
            data,
        })
    }

    pub fn stats(&self) -> DeviceStats {
        self.device.stats()
    }
}

/// Renders `ops` once on a fresh CPU device.
pub fn render_sync(ops: &Ops, params: &TestParams) -> Result<Image> {
    Harness::default().render(ops, params)
}
