// Copyright 2026 the Tessera Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The op stream: an append-only byte buffer plus a typed reference table.

use std::num::NonZeroU64;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use peniko::ImageData;

/// Process-unique identity of an [`Ops`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct OpsId(pub NonZeroU64);

impl OpsId {
    pub fn next() -> Self {
        // We initialize with 1 so that the conversion below succeeds
        static ID_COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(NonZeroU64::new(ID_COUNTER.fetch_add(1, Ordering::Relaxed)).unwrap())
    }
}

/// Opcodes of the op stream.
///
/// Each opcode has a fixed encoded size (including the opcode byte) and a fixed number of
/// entries in the reference table, so a decoder can always advance without parsing payloads.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
#[repr(u8)]
pub enum OpType {
    Macro = 200,
    Call,
    Transform,
    PopTransform,
    PushOpacity,
    PopOpacity,
    Image,
    Paint,
    Color,
    LinearGradient,
    RadialGradient,
    Pass,
    PopPass,
    Save,
    Load,
    Aux,
    Clip,
    PopClip,
    Path,
    Stroke,
    Dash,
}

impl OpType {
    const ALL: [Self; 21] = [
        Self::Macro,
        Self::Call,
        Self::Transform,
        Self::PopTransform,
        Self::PushOpacity,
        Self::PopOpacity,
        Self::Image,
        Self::Paint,
        Self::Color,
        Self::LinearGradient,
        Self::RadialGradient,
        Self::Pass,
        Self::PopPass,
        Self::Save,
        Self::Load,
        Self::Aux,
        Self::Clip,
        Self::PopClip,
        Self::Path,
        Self::Stroke,
        Self::Dash,
    ];

    pub fn from_byte(b: u8) -> Option<Self> {
        let i = b.checked_sub(Self::Macro as u8)?;
        Self::ALL.get(i as usize).copied()
    }

    /// Encoded size in bytes, including the opcode byte.
    pub const fn size(self) -> usize {
        match self {
            Self::Macro => 1 + 4 + 4,
            Self::Call => 1 + 4 * 4,
            Self::Transform => 1 + 1 + 4 * 6,
            Self::PushOpacity => 1 + 4,
            Self::Image => 1 + 1,
            Self::Color => 1 + 4,
            Self::LinearGradient => 1 + 8 * 2 + 4 * 2,
            Self::RadialGradient => 1 + 8 * 2 + 4 * 2 + 4,
            Self::Save | Self::Load => 1 + 4,
            Self::Clip => 1 + 4 * 4 + 1 + 1,
            Self::Path => 1 + 8,
            Self::Stroke => 1 + 4 + 4 + 1 + 1,
            Self::Dash => 1 + 4 + 1,
            Self::PopTransform
            | Self::PopOpacity
            | Self::Paint
            | Self::Pass
            | Self::PopPass
            | Self::Aux
            | Self::PopClip => 1,
        }
    }

    /// Number of reference table entries the op consumes.
    pub const fn num_refs(self) -> usize {
        match self {
            Self::Call | Self::Image | Self::Dash => 1,
            _ => 0,
        }
    }
}

/// Target stream of a call.
#[derive(Clone, Debug)]
pub enum CallTarget {
    /// The stream containing the call op.
    Local,
    /// A frozen stream shared between frames and threads.
    Shared(Arc<Ops>),
}

/// Entry of the reference table.
#[derive(Clone, Debug)]
pub enum Ref {
    Call(CallTarget),
    Image(ImageData),
    Dashes(Arc<[f32]>),
}

/// A position in an op stream.
#[derive(Copy, Clone, Default, PartialEq, Eq, Hash, Debug)]
pub struct Pc {
    pub data: u32,
    pub refs: u32,
}

impl Pc {
    pub(crate) fn read(buf: &[u8]) -> Self {
        Self {
            data: read_u32(&buf[0..4]),
            refs: read_u32(&buf[4..8]),
        }
    }

    pub(crate) fn write(self, buf: &mut [u8]) {
        buf[0..4].copy_from_slice(&self.data.to_le_bytes());
        buf[4..8].copy_from_slice(&self.refs.to_le_bytes());
    }
}

/// Stacks with push/pop discipline.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum StackKind {
    Clip,
    Transform,
    Pass,
    Opacity,
}

impl StackKind {
    const COUNT: usize = 4;
}

/// Identifies a push so that the matching pop can be validated.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct StackId {
    id: u32,
    prev: u32,
}

#[derive(Clone, Default, Debug)]
struct Stack {
    current: u32,
    next_id: u32,
}

impl Stack {
    fn push(&mut self) -> StackId {
        self.next_id += 1;
        let sid = StackId {
            id: self.next_id,
            prev: self.current,
        };
        self.current = self.next_id;
        sid
    }

    fn check(&self, sid: StackId) {
        if self.current != sid.id {
            panic!("unbalanced operation");
        }
    }

    fn pop(&mut self, sid: StackId) {
        self.check(sid);
        self.current = sid.prev;
    }
}

/// An op stream.
///
/// Ops are recorded by appending encoded records with [`Ops::write`] and friends, and are
/// decoded with [`crate::Reader`]. [`Ops::reset`] clears the stream for the next frame while
/// keeping its allocations.
#[derive(Debug)]
pub struct Ops {
    id: OpsId,
    version: u32,
    data: Vec<u8>,
    refs: Vec<Ref>,
    next_state_id: u32,
    macro_stack: Stack,
    stacks: [Stack; StackKind::COUNT],
}

static_assertions::assert_impl_all!(Ops: Send, Sync);

impl Default for Ops {
    fn default() -> Self {
        Self::new()
    }
}

impl Ops {
    pub fn new() -> Self {
        Self {
            id: OpsId::next(),
            version: 0,
            data: Vec::new(),
            refs: Vec::new(),
            next_state_id: 0,
            macro_stack: Stack::default(),
            stacks: Default::default(),
        }
    }

    pub fn id(&self) -> OpsId {
        self.id
    }

    /// Incremented by every [`Ops::reset`].
    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn refs(&self) -> &[Ref] {
        &self.refs
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Clears the stream for reuse, invalidating every call and state recorded into it.
    #[doc(alias = "clear")]
    pub fn reset(&mut self) {
        self.data.clear();
        self.refs.clear();
        self.next_state_id = 0;
        self.macro_stack = Stack::default();
        self.stacks = Default::default();
        self.version = self.version.wrapping_add(1);
    }

    /// Current end of the stream.
    pub fn pc(&self) -> Pc {
        Pc {
            data: self.data.len() as u32,
            refs: self.refs.len() as u32,
        }
    }

    /// Appends `n` zeroed bytes and returns them for the caller to fill.
    pub fn write(&mut self, n: usize) -> &mut [u8] {
        let start = self.data.len();
        self.data.resize(start + n, 0);
        &mut self.data[start..]
    }

    /// Like [`Ops::write`], also appending one reference.
    pub fn write1(&mut self, n: usize, r: Ref) -> &mut [u8] {
        self.refs.push(r);
        self.write(n)
    }

    /// Like [`Ops::write`], also appending two references.
    pub fn write2(&mut self, n: usize, r1: Ref, r2: Ref) -> &mut [u8] {
        self.refs.push(r1);
        self.refs.push(r2);
        self.write(n)
    }

    /// Writes a bare opcode.
    pub(crate) fn write_op(&mut self, t: OpType) {
        self.write(t.size())[0] = t as u8;
    }

    pub fn push_macro(&mut self) -> StackId {
        self.macro_stack.push()
    }

    pub fn pop_macro(&mut self, id: StackId) {
        self.macro_stack.pop(id);
    }

    /// Id of the innermost macro being recorded.
    pub fn macro_id(&self) -> u32 {
        self.macro_stack.current
    }

    /// Completes the macro header at `start` with the current end of the stream.
    pub fn fill_macro(&mut self, start: Pc) {
        let pc = self.pc();
        let header = &mut self.data[start.data as usize..][..OpType::Macro.size()];
        if header[0] != OpType::Macro as u8 {
            panic!("invalid macro header");
        }
        pc.write(&mut header[1..9]);
    }

    /// Writes a call of the range `start..end` in `target`.
    pub fn add_call(&mut self, target: CallTarget, start: Pc, end: Pc) {
        let data = self.write1(OpType::Call.size(), Ref::Call(target));
        data[0] = OpType::Call as u8;
        start.write(&mut data[1..9]);
        end.write(&mut data[9..17]);
    }

    /// Pushes onto the `kind` stack, returning its id and the current macro id.
    pub fn push_op(&mut self, kind: StackKind) -> (StackId, u32) {
        (self.stacks[kind as usize].push(), self.macro_stack.current)
    }

    /// Pops the `kind` stack, panicking unless `sid` is its top and no macro boundary was crossed.
    pub fn pop_op(&mut self, kind: StackKind, sid: StackId, macro_id: u32) {
        if self.macro_stack.current != macro_id {
            panic!("stack push and pop must not cross macro boundary");
        }
        self.stacks[kind as usize].pop(sid);
    }

    /// Writes a save record under a fresh id and returns it.
    pub(crate) fn write_save(&mut self) -> u32 {
        self.next_state_id += 1;
        let id = self.next_state_id;
        let data = self.write(OpType::Save.size());
        data[0] = OpType::Save as u8;
        data[1..5].copy_from_slice(&id.to_le_bytes());
        id
    }

    pub(crate) fn write_load(&mut self, id: u32) {
        let data = self.write(OpType::Load.size());
        data[0] = OpType::Load as u8;
        data[1..5].copy_from_slice(&id.to_le_bytes());
    }
}

pub(crate) fn read_u32(buf: &[u8]) -> u32 {
    u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]])
}

pub(crate) fn read_f32(buf: &[u8]) -> f32 {
    f32::from_bits(read_u32(buf))
}

pub(crate) fn write_f32(buf: &mut [u8], v: f32) {
    buf[..4].copy_from_slice(&v.to_bits().to_le_bytes());
}

/// Decodes the state id of a save or load record.
pub fn decode_state_id(data: &[u8]) -> u32 {
    let t = data[0];
    if t != OpType::Save as u8 && t != OpType::Load as u8 {
        panic!("invalid op");
    }
    read_u32(&data[1..])
}
