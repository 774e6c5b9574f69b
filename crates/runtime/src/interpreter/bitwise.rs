// Copyright (c) 2023 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions,
// more details in file LICENSE and CONTRIBUTING.

use crate::{interpreter::InterpretResult, machine::Machine, RuntimeError};

pub fn iaor(machine: &mut Machine) -> Result<InterpretResult, RuntimeError> {
    let a = machine.pop_i64()?;
    let b = machine.pop_i64()?;
    machine.push_i64(a | b);
    Ok(InterpretResult::Move(1))
}

pub fn iaand(machine: &mut Machine) -> Result<InterpretResult, RuntimeError> {
    let a = machine.pop_i64()?;
    let b = machine.pop_i64()?;
    machine.push_i64(a & b);
    Ok(InterpretResult::Move(1))
}

pub fn iaxor(machine: &mut Machine) -> Result<InterpretResult, RuntimeError> {
    let a = machine.pop_i64()?;
    let b = machine.pop_i64()?;
    machine.push_i64(a ^ b);
    Ok(InterpretResult::Move(1))
}
