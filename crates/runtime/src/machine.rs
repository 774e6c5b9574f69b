// Copyright (c) 2023 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions,
// more details in file LICENSE and CONTRIBUTING.

// the machine state: the typed operand stack, the call-frame stack
// and the program counter.
//
// operand stack cells are 64-bit payloads, the instruction variants
// already encode the expected operand types, so the type tags exist
// only as a debug aid behind the `type_check` feature.
//
// a frame owns one untyped 64-bit cell per local slot, the
// parameters included. a context variable is resolved by scanning
// the frame stack from the top for the frame whose function carries
// the requested scope id. the language has no closures: this finds
// whichever invocation of the owning function happens to be on the
// stack, which is unsound for re-entrant enclosing calls and is a
// known limitation of the design, not something to fix here.

use std::io::Write;

use mathvm_bytecode::bytecode_reader::{
    read_param_f64, read_param_i16, read_param_i64, read_param_u16, read_param_u16_u16,
};
use mathvm_program::{Program, ENTRY_FUNCTION_NAME};
use mathvm_types::{HostValue, ValueType};
use tracing::trace;

use crate::RuntimeError;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct ProgramCounter {
    pub function_id: u16,
    pub offset: usize,
}

struct Frame {
    function_id: u16,
    scope_id: u16,
    return_pc: ProgramCounter,
    slots: Vec<u64>,
}

pub struct Machine<'a> {
    program: &'a Program,
    stack: Vec<u64>,

    #[cfg(feature = "type_check")]
    tags: Vec<ValueType>,

    frames: Vec<Frame>,
    pub pc: ProgramCounter,
    output: &'a mut dyn Write,
}

impl<'a> Machine<'a> {
    pub fn new(program: &'a Program, output: &'a mut dyn Write) -> Result<Self, RuntimeError> {
        let entry = program
            .function_by_name(ENTRY_FUNCTION_NAME)
            .ok_or_else(|| RuntimeError::new("the program has no entry function"))?;

        let mut machine = Self {
            program,
            stack: Vec::new(),
            #[cfg(feature = "type_check")]
            tags: Vec::new(),
            frames: Vec::new(),
            pc: ProgramCounter {
                function_id: entry.id,
                offset: 0,
            },
            output,
        };

        machine.frames.push(Frame {
            function_id: entry.id,
            scope_id: entry.scope_id,
            // the sentinel is never used, returning from the
            // outermost frame ends the run
            return_pc: ProgramCounter {
                function_id: entry.id,
                offset: 0,
            },
            slots: vec![0; entry.locals_count as usize],
        });
        Ok(machine)
    }

    pub fn program(&self) -> &'a Program {
        self.program
    }

    pub fn code(&self) -> &[u8] {
        self.program
            .function_by_id(self.pc.function_id)
            .code
            .as_bytes()
    }

    /// bind externally provided values to the matching top-level
    /// variables. names without a declared counterpart are ignored.
    pub fn bind_initial_vars(&mut self, initial_vars: &[(&str, HostValue)]) -> Result<(), RuntimeError> {
        for (name, value) in initial_vars {
            let Some(global) = self.program.globals().iter().find(|g| g.name == *name) else {
                continue;
            };
            let bits = match (global.value_type, value) {
                (ValueType::Int, HostValue::Int(v)) => *v as u64,
                (ValueType::Double, HostValue::Double(v)) => v.to_bits(),
                (ValueType::Str, HostValue::Str(literal)) => {
                    let id = self.program.string_constant_id(literal).ok_or_else(|| {
                        RuntimeError::new(format!(
                            "the initial value of '{}' is not in the string constant pool",
                            name
                        ))
                    })?;
                    id as u64
                }
                _ => {
                    return Err(RuntimeError::new(format!(
                        "the initial value of '{}' has the wrong type",
                        name
                    )));
                }
            };
            let slot = global.slot as usize;
            self.frames[0].slots[slot] = bits;
        }
        Ok(())
    }

    // ---- instruction parameters, read relative to the PC ----

    pub fn get_param_i64(&self) -> Result<i64, RuntimeError> {
        let (_, value) = read_param_i64(self.code(), self.pc.offset + 1)?;
        Ok(value)
    }

    pub fn get_param_f64(&self) -> Result<f64, RuntimeError> {
        let (_, value) = read_param_f64(self.code(), self.pc.offset + 1)?;
        Ok(value)
    }

    pub fn get_param_u16(&self) -> Result<u16, RuntimeError> {
        let (_, value) = read_param_u16(self.code(), self.pc.offset + 1)?;
        Ok(value)
    }

    pub fn get_param_i16(&self) -> Result<i16, RuntimeError> {
        let (_, value) = read_param_i16(self.code(), self.pc.offset + 1)?;
        Ok(value)
    }

    pub fn get_param_u16_u16(&self) -> Result<(u16, u16), RuntimeError> {
        let (_, param0, param1) = read_param_u16_u16(self.code(), self.pc.offset + 1)?;
        Ok((param0, param1))
    }

    /// the absolute branch target for a displacement relative to the
    /// first byte after the opcode, validated against the current
    /// function's code
    pub fn branch_target(&self, displacement: i16) -> Result<usize, RuntimeError> {
        let base = self.pc.offset as isize + 1;
        let target = base + displacement as isize;
        if target < 0 || target as usize >= self.code().len() {
            return Err(RuntimeError::new(format!(
                "branch target 0x{:04x} is outside the function's bytecode",
                target
            )));
        }
        Ok(target as usize)
    }

    // ---- the operand stack ----

    fn push_raw(&mut self, bits: u64, tag: ValueType) {
        self.stack.push(bits);
        #[cfg(feature = "type_check")]
        self.tags.push(tag);
        #[cfg(not(feature = "type_check"))]
        let _ = tag;
    }

    fn pop_raw(&mut self, expected: ValueType) -> Result<u64, RuntimeError> {
        #[cfg(feature = "type_check")]
        {
            let tag = self
                .tags
                .pop()
                .ok_or_else(|| RuntimeError::new("the operand stack is empty"))?;
            if tag != expected {
                return Err(RuntimeError::new(format!(
                    "operand type mismatch: expected {:?}, found {:?}",
                    expected, tag
                )));
            }
        }
        #[cfg(not(feature = "type_check"))]
        let _ = expected;

        self.stack
            .pop()
            .ok_or_else(|| RuntimeError::new("the operand stack is empty"))
    }

    pub fn push_i64(&mut self, value: i64) {
        self.push_raw(value as u64, ValueType::Int);
    }

    pub fn pop_i64(&mut self) -> Result<i64, RuntimeError> {
        Ok(self.pop_raw(ValueType::Int)? as i64)
    }

    pub fn push_f64(&mut self, value: f64) {
        self.push_raw(value.to_bits(), ValueType::Double);
    }

    pub fn pop_f64(&mut self) -> Result<f64, RuntimeError> {
        Ok(f64::from_bits(self.pop_raw(ValueType::Double)?))
    }

    pub fn push_str_id(&mut self, id: u16) {
        self.push_raw(id as u64, ValueType::Str);
    }

    pub fn pop_str_id(&mut self) -> Result<u16, RuntimeError> {
        Ok(self.pop_raw(ValueType::Str)? as u16)
    }

    pub fn swap(&mut self) -> Result<(), RuntimeError> {
        let length = self.stack.len();
        if length < 2 {
            return Err(RuntimeError::new("swap needs two operands"));
        }
        self.stack.swap(length - 1, length - 2);
        #[cfg(feature = "type_check")]
        {
            let length = self.tags.len();
            self.tags.swap(length - 1, length - 2);
        }
        Ok(())
    }

    pub fn drop_top(&mut self) -> Result<(), RuntimeError> {
        self.stack
            .pop()
            .ok_or_else(|| RuntimeError::new("the operand stack is empty"))?;
        #[cfg(feature = "type_check")]
        self.tags.pop();
        Ok(())
    }

    // ---- local and context variables ----

    pub fn local_bits(&self, slot: u16) -> Result<u64, RuntimeError> {
        let frame = self.frames.last().expect("a frame is always pushed");
        frame
            .slots
            .get(slot as usize)
            .copied()
            .ok_or_else(|| RuntimeError::new(format!("local slot {} is out of range", slot)))
    }

    pub fn set_local_bits(&mut self, slot: u16, bits: u64) -> Result<(), RuntimeError> {
        let frame = self.frames.last_mut().expect("a frame is always pushed");
        let cell = frame
            .slots
            .get_mut(slot as usize)
            .ok_or_else(|| RuntimeError::new(format!("local slot {} is out of range", slot)))?;
        *cell = bits;
        Ok(())
    }

    /// scan the frame stack from the top for the frame whose function
    /// carries the requested scope id
    pub fn context_bits(&self, scope_id: u16, slot: u16) -> Result<u64, RuntimeError> {
        let frame = self.find_context_frame(scope_id)?;
        frame
            .slots
            .get(slot as usize)
            .copied()
            .ok_or_else(|| RuntimeError::new(format!("context slot {} is out of range", slot)))
    }

    pub fn set_context_bits(
        &mut self,
        scope_id: u16,
        slot: u16,
        bits: u64,
    ) -> Result<(), RuntimeError> {
        let frame = self
            .frames
            .iter_mut()
            .rev()
            .find(|frame| frame.scope_id == scope_id)
            .ok_or_else(|| missing_scope(scope_id))?;
        let cell = frame
            .slots
            .get_mut(slot as usize)
            .ok_or_else(|| RuntimeError::new(format!("context slot {} is out of range", slot)))?;
        *cell = bits;
        Ok(())
    }

    fn find_context_frame(&self, scope_id: u16) -> Result<&Frame, RuntimeError> {
        self.frames
            .iter()
            .rev()
            .find(|frame| frame.scope_id == scope_id)
            .ok_or_else(|| missing_scope(scope_id))
    }

    // ---- call frames ----

    /// push a frame for the callee and move the PC to its first
    /// instruction. `return_pc` points at the instruction after the
    /// call.
    pub fn enter_function(
        &mut self,
        function_id: u16,
        return_pc: ProgramCounter,
    ) -> Result<(), RuntimeError> {
        if function_id >= self.program.functions_count() {
            return Err(RuntimeError::new(format!(
                "unknown function id {}",
                function_id
            )));
        }
        let callee = self.program.function_by_id(function_id);

        trace!(function_id, name = callee.name.as_str(), "call");

        self.frames.push(Frame {
            function_id,
            scope_id: callee.scope_id,
            return_pc,
            slots: vec![0; callee.locals_count as usize],
        });
        self.pc = ProgramCounter {
            function_id,
            offset: 0,
        };
        Ok(())
    }

    /// pop the current frame and restore the PC, true when the
    /// outermost frame returned and the run is over
    pub fn leave_function(&mut self) -> Result<bool, RuntimeError> {
        let frame = self
            .frames
            .pop()
            .ok_or_else(|| RuntimeError::new("return without a call frame"))?;

        trace!(function_id = frame.function_id, "return");

        if self.frames.is_empty() {
            return Ok(true);
        }
        self.pc = frame.return_pc;
        Ok(false)
    }

    // ---- output ----

    pub fn print(&mut self, text: std::fmt::Arguments) -> Result<(), RuntimeError> {
        self.output
            .write_fmt(text)
            .map_err(|e| RuntimeError::new(format!("the output stream failed: {}", e)))
    }
}

fn missing_scope(scope_id: u16) -> RuntimeError {
    RuntimeError::new(format!(
        "no frame for scope {} is on the call stack",
        scope_id
    ))
}
