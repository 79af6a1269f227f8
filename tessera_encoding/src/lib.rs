// Copyright 2026 the Tessera Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Retained operation stream encoding.
//!
//! An [`Ops`] list is a byte stream of operations with side references, recorded by the op
//! builders in [`op`], [`clip`] and [`paint`] and decoded by [`Reader`]. Path geometry is encoded
//! as fixed size scene [`Command`]s and expanded for stroking by [`stroke`].

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
    elided_lifetimes_in_paths,
    single_use_lifetimes,
    clippy::return_self_not_must_use,
    clippy::unseparated_literal_suffix,
    clippy::cast_possible_truncation,
    clippy::missing_assert_message,
    clippy::missing_panics_doc,
    unnameable_types,
    clippy::shadow_unrelated,
    clippy::exhaustive_enums,
    reason = "Deferred"
)]

pub mod clip;
pub mod math;
pub mod op;
mod ops;
pub mod paint;
mod reader;
mod scene;
pub mod stroke;

pub use math::{pt, Affine2D, Point, Rect};
pub use ops::{decode_state_id, CallTarget, OpType, Ops, OpsId, Pc, Ref, StackId, StackKind};
pub use reader::{EncodedOp, Key, Reader};
pub use scene::{
    decode_color, decode_cubic, decode_line, decode_quad, decode_transform, pack_color,
    unpack_color, Command, SceneOp, COMMAND_SIZE,
};
pub use stroke::{LineSegment, Quad, StrokeQuad, StrokeQuads};
