// Copyright (c) 2023 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions,
// more details in file LICENSE and CONTRIBUTING.

use crate::{interpreter::InterpretResult, machine::Machine, RuntimeError};

pub fn iload(machine: &mut Machine) -> Result<InterpretResult, RuntimeError> {
    let value = machine.get_param_i64()?;
    machine.push_i64(value);
    Ok(InterpretResult::Move(9))
}

pub fn dload(machine: &mut Machine) -> Result<InterpretResult, RuntimeError> {
    let value = machine.get_param_f64()?;
    machine.push_f64(value);
    Ok(InterpretResult::Move(9))
}

pub fn sload(machine: &mut Machine) -> Result<InterpretResult, RuntimeError> {
    let id = machine.get_param_u16()?;
    if id >= machine.program().string_constants_count() {
        return Err(RuntimeError::new(format!(
            "string constant {} is out of range",
            id
        )));
    }
    machine.push_str_id(id);
    Ok(InterpretResult::Move(3))
}

pub fn iload_0(machine: &mut Machine) -> Result<InterpretResult, RuntimeError> {
    machine.push_i64(0);
    Ok(InterpretResult::Move(1))
}

pub fn iload_1(machine: &mut Machine) -> Result<InterpretResult, RuntimeError> {
    machine.push_i64(1);
    Ok(InterpretResult::Move(1))
}

pub fn iload_m1(machine: &mut Machine) -> Result<InterpretResult, RuntimeError> {
    machine.push_i64(-1);
    Ok(InterpretResult::Move(1))
}

pub fn dload_0(machine: &mut Machine) -> Result<InterpretResult, RuntimeError> {
    machine.push_f64(0.0);
    Ok(InterpretResult::Move(1))
}

pub fn dload_1(machine: &mut Machine) -> Result<InterpretResult, RuntimeError> {
    machine.push_f64(1.0);
    Ok(InterpretResult::Move(1))
}

pub fn dload_m1(machine: &mut Machine) -> Result<InterpretResult, RuntimeError> {
    machine.push_f64(-1.0);
    Ok(InterpretResult::Move(1))
}

pub fn sload_0(machine: &mut Machine) -> Result<InterpretResult, RuntimeError> {
    machine.push_str_id(0);
    Ok(InterpretResult::Move(1))
}
