// Copyright (c) 2023 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions,
// more details in file LICENSE and CONTRIBUTING.

// local variable access. the slots are untyped 64-bit cells, the
// instruction variant decides the interpretation of the payload.
// slots 0..3 have dedicated one-byte instructions, the wide forms
// carry the slot as an uint16.

use crate::{interpreter::InterpretResult, machine::Machine, RuntimeError};

fn load_int(machine: &mut Machine, slot: u16, width: usize) -> Result<InterpretResult, RuntimeError> {
    let bits = machine.local_bits(slot)?;
    machine.push_i64(bits as i64);
    Ok(InterpretResult::Move(width))
}

fn load_double(
    machine: &mut Machine,
    slot: u16,
    width: usize,
) -> Result<InterpretResult, RuntimeError> {
    let bits = machine.local_bits(slot)?;
    machine.push_f64(f64::from_bits(bits));
    Ok(InterpretResult::Move(width))
}

fn load_str(machine: &mut Machine, slot: u16, width: usize) -> Result<InterpretResult, RuntimeError> {
    let bits = machine.local_bits(slot)?;
    machine.push_str_id(bits as u16);
    Ok(InterpretResult::Move(width))
}

fn store_int(
    machine: &mut Machine,
    slot: u16,
    width: usize,
) -> Result<InterpretResult, RuntimeError> {
    let value = machine.pop_i64()?;
    machine.set_local_bits(slot, value as u64)?;
    Ok(InterpretResult::Move(width))
}

fn store_double(
    machine: &mut Machine,
    slot: u16,
    width: usize,
) -> Result<InterpretResult, RuntimeError> {
    let value = machine.pop_f64()?;
    machine.set_local_bits(slot, value.to_bits())?;
    Ok(InterpretResult::Move(width))
}

fn store_str(
    machine: &mut Machine,
    slot: u16,
    width: usize,
) -> Result<InterpretResult, RuntimeError> {
    let id = machine.pop_str_id()?;
    machine.set_local_bits(slot, id as u64)?;
    Ok(InterpretResult::Move(width))
}

// the short forms

pub fn load_ivar_0(machine: &mut Machine) -> Result<InterpretResult, RuntimeError> {
    load_int(machine, 0, 1)
}

pub fn load_ivar_1(machine: &mut Machine) -> Result<InterpretResult, RuntimeError> {
    load_int(machine, 1, 1)
}

pub fn load_ivar_2(machine: &mut Machine) -> Result<InterpretResult, RuntimeError> {
    load_int(machine, 2, 1)
}

pub fn load_ivar_3(machine: &mut Machine) -> Result<InterpretResult, RuntimeError> {
    load_int(machine, 3, 1)
}

pub fn load_dvar_0(machine: &mut Machine) -> Result<InterpretResult, RuntimeError> {
    load_double(machine, 0, 1)
}

pub fn load_dvar_1(machine: &mut Machine) -> Result<InterpretResult, RuntimeError> {
    load_double(machine, 1, 1)
}

pub fn load_dvar_2(machine: &mut Machine) -> Result<InterpretResult, RuntimeError> {
    load_double(machine, 2, 1)
}

pub fn load_dvar_3(machine: &mut Machine) -> Result<InterpretResult, RuntimeError> {
    load_double(machine, 3, 1)
}

pub fn load_svar_0(machine: &mut Machine) -> Result<InterpretResult, RuntimeError> {
    load_str(machine, 0, 1)
}

pub fn load_svar_1(machine: &mut Machine) -> Result<InterpretResult, RuntimeError> {
    load_str(machine, 1, 1)
}

pub fn load_svar_2(machine: &mut Machine) -> Result<InterpretResult, RuntimeError> {
    load_str(machine, 2, 1)
}

pub fn load_svar_3(machine: &mut Machine) -> Result<InterpretResult, RuntimeError> {
    load_str(machine, 3, 1)
}

pub fn store_ivar_0(machine: &mut Machine) -> Result<InterpretResult, RuntimeError> {
    store_int(machine, 0, 1)
}

pub fn store_ivar_1(machine: &mut Machine) -> Result<InterpretResult, RuntimeError> {
    store_int(machine, 1, 1)
}

pub fn store_ivar_2(machine: &mut Machine) -> Result<InterpretResult, RuntimeError> {
    store_int(machine, 2, 1)
}

pub fn store_ivar_3(machine: &mut Machine) -> Result<InterpretResult, RuntimeError> {
    store_int(machine, 3, 1)
}

pub fn store_dvar_0(machine: &mut Machine) -> Result<InterpretResult, RuntimeError> {
    store_double(machine, 0, 1)
}

pub fn store_dvar_1(machine: &mut Machine) -> Result<InterpretResult, RuntimeError> {
    store_double(machine, 1, 1)
}

pub fn store_dvar_2(machine: &mut Machine) -> Result<InterpretResult, RuntimeError> {
    store_double(machine, 2, 1)
}

pub fn store_dvar_3(machine: &mut Machine) -> Result<InterpretResult, RuntimeError> {
    store_double(machine, 3, 1)
}

pub fn store_svar_0(machine: &mut Machine) -> Result<InterpretResult, RuntimeError> {
    store_str(machine, 0, 1)
}

pub fn store_svar_1(machine: &mut Machine) -> Result<InterpretResult, RuntimeError> {
    store_str(machine, 1, 1)
}

pub fn store_svar_2(machine: &mut Machine) -> Result<InterpretResult, RuntimeError> {
    store_str(machine, 2, 1)
}

pub fn store_svar_3(machine: &mut Machine) -> Result<InterpretResult, RuntimeError> {
    store_str(machine, 3, 1)
}

// the wide forms

pub fn load_ivar(machine: &mut Machine) -> Result<InterpretResult, RuntimeError> {
    let slot = machine.get_param_u16()?;
    load_int(machine, slot, 3)
}

pub fn load_dvar(machine: &mut Machine) -> Result<InterpretResult, RuntimeError> {
    let slot = machine.get_param_u16()?;
    load_double(machine, slot, 3)
}

pub fn load_svar(machine: &mut Machine) -> Result<InterpretResult, RuntimeError> {
    let slot = machine.get_param_u16()?;
    load_str(machine, slot, 3)
}

pub fn store_ivar(machine: &mut Machine) -> Result<InterpretResult, RuntimeError> {
    let slot = machine.get_param_u16()?;
    store_int(machine, slot, 3)
}

pub fn store_dvar(machine: &mut Machine) -> Result<InterpretResult, RuntimeError> {
    let slot = machine.get_param_u16()?;
    store_double(machine, slot, 3)
}

pub fn store_svar(machine: &mut Machine) -> Result<InterpretResult, RuntimeError> {
    let slot = machine.get_param_u16()?;
    store_str(machine, slot, 3)
}
