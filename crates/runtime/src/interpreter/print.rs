// Copyright (c) 2023 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions,
// more details in file LICENSE and CONTRIBUTING.

// locale-independent printing: integers in decimal, doubles with the
// shortest digit sequence that round-trips, strings as raw bytes.

use crate::{interpreter::InterpretResult, machine::Machine, RuntimeError};

pub fn iprint(machine: &mut Machine) -> Result<InterpretResult, RuntimeError> {
    let value = machine.pop_i64()?;
    machine.print(format_args!("{}", value))?;
    Ok(InterpretResult::Move(1))
}

pub fn dprint(machine: &mut Machine) -> Result<InterpretResult, RuntimeError> {
    let value = machine.pop_f64()?;
    machine.print(format_args!("{}", value))?;
    Ok(InterpretResult::Move(1))
}

pub fn sprint(machine: &mut Machine) -> Result<InterpretResult, RuntimeError> {
    let id = machine.pop_str_id()?;
    if id >= machine.program().string_constants_count() {
        return Err(RuntimeError::new(format!(
            "string constant {} is out of range",
            id
        )));
    }
    let literal = machine.program().string_constant(id);
    machine.print(format_args!("{}", literal))?;
    Ok(InterpretResult::Move(1))
}
