// Copyright 2026 the Tessera Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Sequential decoding of an op stream, following calls into other streams.

use smallvec::SmallVec;

use crate::ops::{CallTarget, OpType, Ops, OpsId, Pc, Ref};

/// Identifies a decoded op.
///
/// Keys are stable for as long as the stream holding the op is not reset, which makes them
/// suitable for caching results derived from the op.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct Key {
    pub ops: OpsId,
    pub pc: u32,
    pub version: u32,
}

/// A decoded op: its encoded bytes and its references.
#[derive(Copy, Clone, Debug)]
pub struct EncodedOp<'a> {
    pub key: Key,
    pub data: &'a [u8],
    pub refs: &'a [Ref],
}

impl EncodedOp<'_> {
    pub fn op_type(&self) -> OpType {
        // The reader only yields ops whose type byte it validated.
        OpType::from_byte(self.data[0]).unwrap_or(OpType::Aux)
    }
}

#[derive(Clone, Copy)]
struct Frame<'a> {
    ops: &'a Ops,
    ret: Pc,
    end: Pc,
}

/// Decodes ops in execution order.
///
/// Macro bodies met in linear flow are skipped, call ops are entered, and an aux op is returned
/// together with the rest of the enclosing block as its payload.
pub struct Reader<'a> {
    ops: &'a Ops,
    pc: Pc,
    end: Pc,
    stack: SmallVec<[Frame<'a>; 8]>,
}

impl<'a> Reader<'a> {
    pub fn new(ops: &'a Ops) -> Self {
        Self {
            ops,
            pc: Pc::default(),
            end: ops.pc(),
            stack: SmallVec::new(),
        }
    }

    /// Returns the next op, or `None` at the end of the stream.
    ///
    /// # Panics
    ///
    /// Panics on malformed streams: unknown opcodes, truncated records, unterminated macros and
    /// calls without a target.
    pub fn decode(&mut self) -> Option<EncodedOp<'a>> {
        loop {
            if self.pc.data >= self.end.data {
                let frame = self.stack.pop()?;
                self.ops = frame.ops;
                self.pc = frame.ret;
                self.end = frame.end;
                continue;
            }
            let ops: &'a Ops = self.ops;
            let data = &ops.data()[self.pc.data as usize..self.end.data as usize];
            let t = OpType::from_byte(data[0])
                .unwrap_or_else(|| panic!("invalid op: unknown opcode {}", data[0]));
            let mut n = t.size();
            let nrefs = t.num_refs();
            if data.len() < n {
                panic!("invalid op: truncated {t:?}");
            }
            let refs = &ops.refs()[self.pc.refs as usize..][..nrefs];
            let key = Key {
                ops: ops.id(),
                pc: self.pc.data,
                version: ops.version(),
            };
            match t {
                OpType::Aux => {
                    n = data.len();
                }
                OpType::Macro => {
                    let end = Pc::read(&data[1..9]);
                    if end.data <= self.pc.data {
                        panic!("invalid op: unterminated macro");
                    }
                    self.pc = end;
                    continue;
                }
                OpType::Call => {
                    let target: &'a Ops = match &refs[0] {
                        Ref::Call(CallTarget::Local) => ops,
                        Ref::Call(CallTarget::Shared(target)) => &**target,
                        _ => panic!("invalid op: call without a target"),
                    };
                    let start = Pc::read(&data[1..9]);
                    let end = Pc::read(&data[9..17]);
                    self.stack.push(Frame {
                        ops,
                        ret: Pc {
                            data: self.pc.data + n as u32,
                            refs: self.pc.refs + nrefs as u32,
                        },
                        end: self.end,
                    });
                    self.ops = target;
                    self.pc = start;
                    self.end = end;
                    continue;
                }
                _ => {}
            }
            self.pc.data += n as u32;
            self.pc.refs += nrefs as u32;
            return Some(EncodedOp {
                key,
                data: &data[..n],
                refs,
            });
        }
    }
}

impl<'a> Iterator for Reader<'a> {
    type Item = EncodedOp<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        self.decode()
    }
}
