// Copyright (c) 2023 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions,
// more details in file LICENSE and CONTRIBUTING.

use crate::{interpreter::InterpretResult, machine::Machine, RuntimeError};

pub fn i2d(machine: &mut Machine) -> Result<InterpretResult, RuntimeError> {
    let value = machine.pop_i64()?;
    machine.push_f64(value as f64);
    Ok(InterpretResult::Move(1))
}

/// truncates toward zero
pub fn d2i(machine: &mut Machine) -> Result<InterpretResult, RuntimeError> {
    let value = machine.pop_f64()?;
    machine.push_i64(value as i64);
    Ok(InterpretResult::Move(1))
}

/// parse the pooled literal as a decimal integer
pub fn s2i(machine: &mut Machine) -> Result<InterpretResult, RuntimeError> {
    let id = machine.pop_str_id()?;
    if id >= machine.program().string_constants_count() {
        return Err(RuntimeError::new(format!(
            "string constant {} is out of range",
            id
        )));
    }
    let literal = machine.program().string_constant(id);
    let value = literal.parse::<i64>().map_err(|_| {
        RuntimeError::new(format!("cannot parse '{}' as an integer", literal))
    })?;
    machine.push_i64(value);
    Ok(InterpretResult::Move(1))
}
