// Copyright 2026 the Tessera Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Recording helpers: macros and calls, transforms, saved state and passes.

use std::sync::Arc;

use crate::math::{Affine2D, Point};
use crate::ops::{read_u32, CallTarget, OpType, Ops, OpsId, Pc, StackId, StackKind};

/// An in-progress macro recording, started by [`record`].
#[must_use = "a macro must be stopped with `MacroOp::stop`"]
#[derive(Debug)]
pub struct MacroOp {
    ops: OpsId,
    version: u32,
    id: StackId,
    pc: Pc,
}

/// Starts recording a macro: subsequent ops are captured for replay instead of executing in place.
pub fn record(ops: &mut Ops) -> MacroOp {
    let id = ops.push_macro();
    let pc = ops.pc();
    ops.write(OpType::Macro.size())[0] = OpType::Macro as u8;
    MacroOp {
        ops: ops.id(),
        version: ops.version(),
        id,
        pc,
    }
}

impl MacroOp {
    /// Ends the recording and returns a [`CallOp`] replaying it.
    pub fn stop(self, ops: &mut Ops) -> CallOp {
        if ops.id() != self.ops || ops.version() != self.version {
            panic!("macro stopped in a different Ops");
        }
        ops.pop_macro(self.id);
        ops.fill_macro(self.pc);
        CallOp {
            ops: self.ops,
            version: self.version,
            shared: None,
            start: Pc {
                data: self.pc.data + OpType::Macro.size() as u32,
                refs: self.pc.refs,
            },
            end: ops.pc(),
        }
    }
}

/// Replays a recorded macro.
///
/// A call is local to the stream it was recorded in until [`CallOp::into_shared`] freezes that
/// stream, after which it can be added to any stream in any frame.
#[derive(Clone, Debug)]
pub struct CallOp {
    ops: OpsId,
    version: u32,
    shared: Option<Arc<Ops>>,
    start: Pc,
    end: Pc,
}

impl CallOp {
    pub fn add(&self, ops: &mut Ops) {
        match &self.shared {
            Some(target) => ops.add_call(CallTarget::Shared(target.clone()), self.start, self.end),
            None => {
                if ops.id() != self.ops {
                    panic!("call recorded in a different Ops");
                }
                if ops.version() != self.version {
                    panic!("call to a reset Ops");
                }
                ops.add_call(CallTarget::Local, self.start, self.end);
            }
        }
    }

    /// Freezes the stream the call was recorded in, making the call usable from any stream.
    pub fn into_shared(self, ops: Arc<Ops>) -> Self {
        if ops.id() != self.ops || ops.version() != self.version {
            panic!("call recorded in a different Ops");
        }
        Self {
            shared: Some(ops),
            ..self
        }
    }

    pub fn is_shared(&self) -> bool {
        self.shared.is_some()
    }

    /// Whether the call replays nothing.
    pub fn is_empty(&self) -> bool {
        self.start.data == self.end.data
    }

    /// The recorded range, excluding the macro header.
    pub fn range(&self) -> (Pc, Pc) {
        (self.start, self.end)
    }
}

/// Concatenates a transform to the current transform.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct TransformOp(pub Affine2D);

/// Shorthand for a translation [`TransformOp`].
pub fn offset(v: Point) -> TransformOp {
    TransformOp(Affine2D::IDENTITY.offset(v))
}

pub fn affine(t: Affine2D) -> TransformOp {
    TransformOp(t)
}

impl TransformOp {
    pub fn new(t: Affine2D) -> Self {
        Self(t)
    }

    /// Applies the transform until the end of the enclosing push or call.
    pub fn add(&self, ops: &mut Ops) {
        self.write(ops, false);
    }

    /// Applies the transform until the returned stack is popped.
    pub fn push(&self, ops: &mut Ops) -> TransformStack {
        let (id, macro_id) = ops.push_op(StackKind::Transform);
        self.write(ops, true);
        TransformStack { id, macro_id }
    }

    fn write(&self, ops: &mut Ops, push: bool) {
        let data = ops.write(OpType::Transform.size());
        data[0] = OpType::Transform as u8;
        data[1] = u8::from(push);
        for (dst, bits) in data[2..].chunks_exact_mut(4).zip(self.0.to_bits()) {
            dst.copy_from_slice(&bits.to_le_bytes());
        }
    }
}

/// Decodes a transform record into its transform and push flag.
pub fn decode_transform(data: &[u8]) -> (Affine2D, bool) {
    if data[0] != OpType::Transform as u8 {
        panic!("invalid op");
    }
    let mut bits = [0; 6];
    for (b, src) in bits.iter_mut().zip(data[2..].chunks_exact(4)) {
        *b = read_u32(src);
    }
    (Affine2D::from_bits(bits), data[1] != 0)
}

#[must_use = "a pushed transform must be popped"]
#[derive(Debug)]
pub struct TransformStack {
    id: StackId,
    macro_id: u32,
}

impl TransformStack {
    pub fn pop(self, ops: &mut Ops) {
        ops.pop_op(StackKind::Transform, self.id, self.macro_id);
        ops.write_op(OpType::PopTransform);
    }
}

/// A saved transform state.
#[derive(Copy, Clone, Debug)]
pub struct StateOp {
    ops: OpsId,
    version: u32,
    id: u32,
    macro_id: u32,
}

/// Saves the effective transform at this point of the stream.
pub fn save(ops: &mut Ops) -> StateOp {
    let macro_id = ops.macro_id();
    let id = ops.write_save();
    StateOp {
        ops: ops.id(),
        version: ops.version(),
        id,
        macro_id,
    }
}

impl StateOp {
    /// Restores the saved transform.
    pub fn load(&self, ops: &mut Ops) {
        if ops.id() != self.ops || ops.version() != self.version {
            panic!("state saved in a different Ops");
        }
        ops.write_load(self.id);
    }

    /// Id of the macro the state was saved in.
    pub fn macro_id(&self) -> u32 {
        self.macro_id
    }
}

/// Marks a pass-through region. Passes have no effect on rendering.
#[derive(Copy, Clone, Debug, Default)]
pub struct PassOp;

#[must_use = "a pushed pass must be popped"]
#[derive(Debug)]
pub struct PassStack {
    id: StackId,
    macro_id: u32,
}

impl PassOp {
    pub fn push(self, ops: &mut Ops) -> PassStack {
        let (id, macro_id) = ops.push_op(StackKind::Pass);
        ops.write_op(OpType::Pass);
        PassStack { id, macro_id }
    }
}

impl PassStack {
    pub fn pop(self, ops: &mut Ops) {
        ops.pop_op(StackKind::Pass, self.id, self.macro_id);
        ops.write_op(OpType::PopPass);
    }
}
