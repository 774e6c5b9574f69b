// Copyright (c) 2023 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions,
// more details in file LICENSE and CONTRIBUTING.

// branches and calls. the conditional branches pop the upper operand
// 'a' and the lower operand 'b' and take the branch when 'b OP a'
// holds. displacements are relative to the first byte after the
// opcode and validated against the current function's code.

use crate::{interpreter::InterpretResult, machine::Machine, RuntimeError};

pub fn ja(machine: &mut Machine) -> Result<InterpretResult, RuntimeError> {
    let displacement = machine.get_param_i16()?;
    Ok(InterpretResult::Jump(machine.branch_target(displacement)?))
}

fn conditional(
    machine: &mut Machine,
    condition: fn(i64, i64) -> bool,
) -> Result<InterpretResult, RuntimeError> {
    let displacement = machine.get_param_i16()?;
    let a = machine.pop_i64()?;
    let b = machine.pop_i64()?;
    if condition(b, a) {
        Ok(InterpretResult::Jump(machine.branch_target(displacement)?))
    } else {
        Ok(InterpretResult::Move(3))
    }
}

pub fn ificmpe(machine: &mut Machine) -> Result<InterpretResult, RuntimeError> {
    conditional(machine, |b, a| b == a)
}

pub fn ificmpne(machine: &mut Machine) -> Result<InterpretResult, RuntimeError> {
    conditional(machine, |b, a| b != a)
}

pub fn ificmpg(machine: &mut Machine) -> Result<InterpretResult, RuntimeError> {
    conditional(machine, |b, a| b > a)
}

pub fn ificmpge(machine: &mut Machine) -> Result<InterpretResult, RuntimeError> {
    conditional(machine, |b, a| b >= a)
}

pub fn ificmpl(machine: &mut Machine) -> Result<InterpretResult, RuntimeError> {
    conditional(machine, |b, a| b < a)
}

pub fn ificmple(machine: &mut Machine) -> Result<InterpretResult, RuntimeError> {
    conditional(machine, |b, a| b <= a)
}

pub fn call(machine: &mut Machine) -> Result<InterpretResult, RuntimeError> {
    let function_id = machine.get_param_u16()?;
    Ok(InterpretResult::Call(function_id))
}

pub fn ret(_machine: &mut Machine) -> Result<InterpretResult, RuntimeError> {
    Ok(InterpretResult::Return)
}

pub fn stop(_machine: &mut Machine) -> Result<InterpretResult, RuntimeError> {
    Ok(InterpretResult::Stop)
}
