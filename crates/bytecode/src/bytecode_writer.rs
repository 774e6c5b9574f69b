// Copyright (c) 2023 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions,
// more details in file LICENSE and CONTRIBUTING.

use std::io::Write;

use mathvm_types::opcode::Opcode;

/// the per-function bytecode buffer.
///
/// an append-only byte sequence with a monotonically increasing write
/// cursor. all immediates are written little-endian. branch targets go
/// through `Label`, which patches the signed 16-bit displacements once
/// the target offset is known.
#[derive(Debug)]
pub struct Bytecode {
    buffer: Vec<u8>, // trait std::io::Write

    // the number of branch displacements that still wait
    // for their label to be bound
    pending_branch_refs: usize,
}

/// a branch target.
///
/// `write_branch` registers the offset of each emitted displacement
/// placeholder, `bind` records the current write cursor as the target
/// and patches every registered placeholder. a label must not be bound
/// twice, and every label must be bound before the function is sealed.
#[derive(Debug, Default)]
pub struct Label {
    refs: Vec<usize>,
    position: Option<usize>,
}

impl Label {
    pub fn new() -> Self {
        Self {
            refs: Vec::new(),
            position: None,
        }
    }

    pub fn is_bound(&self) -> bool {
        self.position.is_some()
    }
}

impl Bytecode {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self {
            buffer: Vec::<u8>::new(),
            pending_branch_refs: 0,
        }
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self {
            buffer: bytes,
            pending_branch_refs: 0,
        }
    }

    /// the current write cursor, i.e. the offset of
    /// the next instruction
    pub fn current_offset(&self) -> usize {
        self.buffer.len()
    }

    pub fn write_opcode(&mut self, opcode: Opcode) {
        self.buffer.write_all(&[opcode as u8]).unwrap();
    }

    pub fn write_i64(&mut self, value: i64) {
        self.buffer.write_all(&value.to_le_bytes()).unwrap();
    }

    pub fn write_f64(&mut self, value: f64) {
        self.buffer.write_all(&value.to_le_bytes()).unwrap();
    }

    pub fn write_u16(&mut self, value: u16) {
        self.buffer.write_all(&value.to_le_bytes()).unwrap();
    }

    pub fn write_i16(&mut self, value: i16) {
        self.buffer.write_all(&value.to_le_bytes()).unwrap();
    }

    /// emit a branch instruction targeting `label`.
    ///
    /// when the label is already bound (a backward branch) the
    /// displacement is final immediately, otherwise a placeholder is
    /// written and patched by `bind`. the displacement is relative to
    /// the first byte after the opcode.
    pub fn write_branch(&mut self, opcode: Opcode, label: &mut Label) {
        self.write_opcode(opcode);
        let ref_offset = self.current_offset();

        match label.position {
            Some(position) => {
                self.write_i16(displacement(ref_offset, position));
            }
            None => {
                label.refs.push(ref_offset);
                self.pending_branch_refs += 1;
                self.write_i16(0);
            }
        }
    }

    /// record the current write cursor as the label's target and patch
    /// every displacement registered so far.
    ///
    /// binding a label twice is a contract violation.
    pub fn bind(&mut self, label: &mut Label) {
        assert!(
            label.position.is_none(),
            "a label can only be bound once"
        );

        let position = self.current_offset();
        label.position = Some(position);

        for ref_offset in label.refs.drain(..) {
            let data = displacement(ref_offset, position).to_le_bytes();
            self.buffer[ref_offset..ref_offset + 2].copy_from_slice(&data);
            self.pending_branch_refs -= 1;
        }
    }

    /// true while some branch still points at an unbound label.
    /// the translator turns this into a compile error when it seals
    /// a function.
    pub fn has_unbound_refs(&self) -> bool {
        self.pending_branch_refs != 0
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }
}

fn displacement(ref_offset: usize, position: usize) -> i16 {
    let distance = position as isize - ref_offset as isize;
    i16::try_from(distance).expect("branch displacement exceeds 16 bits")
}

/// a chain-style writer for building code sequences by hand,
/// mainly in tests
///
/// ```rust
/// use mathvm_bytecode::BytecodeWriter;
/// use mathvm_types::opcode::Opcode;
///
/// let code = BytecodeWriter::new()
///     .write_opcode_i64(Opcode::iload, 11)
///     .write_opcode(Opcode::stop)
///     .to_bytes();
/// assert_eq!(code.len(), 10);
/// ```
pub struct BytecodeWriter {
    bytecode: Bytecode,
}

impl BytecodeWriter {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self {
            bytecode: Bytecode::new(),
        }
    }

    pub fn write_opcode(mut self, opcode: Opcode) -> Self {
        self.bytecode.write_opcode(opcode);
        self
    }

    pub fn write_opcode_i64(mut self, opcode: Opcode, value: i64) -> Self {
        self.bytecode.write_opcode(opcode);
        self.bytecode.write_i64(value);
        self
    }

    pub fn write_opcode_f64(mut self, opcode: Opcode, value: f64) -> Self {
        self.bytecode.write_opcode(opcode);
        self.bytecode.write_f64(value);
        self
    }

    pub fn write_opcode_u16(mut self, opcode: Opcode, value: u16) -> Self {
        self.bytecode.write_opcode(opcode);
        self.bytecode.write_u16(value);
        self
    }

    pub fn write_opcode_u16_u16(mut self, opcode: Opcode, param0: u16, param1: u16) -> Self {
        self.bytecode.write_opcode(opcode);
        self.bytecode.write_u16(param0);
        self.bytecode.write_u16(param1);
        self
    }

    pub fn write_opcode_i16(mut self, opcode: Opcode, displacement: i16) -> Self {
        self.bytecode.write_opcode(opcode);
        self.bytecode.write_i16(displacement);
        self
    }

    pub fn to_bytes(self) -> Vec<u8> {
        self.bytecode.into_bytes()
    }

    pub fn to_bytecode(self) -> Bytecode {
        self.bytecode
    }
}
