// Copyright (c) 2023 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions,
// more details in file LICENSE and CONTRIBUTING.

// context variable access: the instruction carries the owning scope
// id and the slot, the frame is found on the call stack at run time.
// execution fails when no frame of the owning function is live.

use crate::{interpreter::InterpretResult, machine::Machine, RuntimeError};

pub fn load_ctx_ivar(machine: &mut Machine) -> Result<InterpretResult, RuntimeError> {
    let (scope_id, slot) = machine.get_param_u16_u16()?;
    let bits = machine.context_bits(scope_id, slot)?;
    machine.push_i64(bits as i64);
    Ok(InterpretResult::Move(5))
}

pub fn load_ctx_dvar(machine: &mut Machine) -> Result<InterpretResult, RuntimeError> {
    let (scope_id, slot) = machine.get_param_u16_u16()?;
    let bits = machine.context_bits(scope_id, slot)?;
    machine.push_f64(f64::from_bits(bits));
    Ok(InterpretResult::Move(5))
}

pub fn load_ctx_svar(machine: &mut Machine) -> Result<InterpretResult, RuntimeError> {
    let (scope_id, slot) = machine.get_param_u16_u16()?;
    let bits = machine.context_bits(scope_id, slot)?;
    machine.push_str_id(bits as u16);
    Ok(InterpretResult::Move(5))
}

pub fn store_ctx_ivar(machine: &mut Machine) -> Result<InterpretResult, RuntimeError> {
    let (scope_id, slot) = machine.get_param_u16_u16()?;
    let value = machine.pop_i64()?;
    machine.set_context_bits(scope_id, slot, value as u64)?;
    Ok(InterpretResult::Move(5))
}

pub fn store_ctx_dvar(machine: &mut Machine) -> Result<InterpretResult, RuntimeError> {
    let (scope_id, slot) = machine.get_param_u16_u16()?;
    let value = machine.pop_f64()?;
    machine.set_context_bits(scope_id, slot, value.to_bits())?;
    Ok(InterpretResult::Move(5))
}

pub fn store_ctx_svar(machine: &mut Machine) -> Result<InterpretResult, RuntimeError> {
    let (scope_id, slot) = machine.get_param_u16_u16()?;
    let id = machine.pop_str_id()?;
    machine.set_context_bits(scope_id, slot, id as u64)?;
    Ok(InterpretResult::Move(5))
}
