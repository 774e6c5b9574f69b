// Copyright (c) 2023 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions,
// more details in file LICENSE and CONTRIBUTING.

use crate::{interpreter::InterpretResult, machine::Machine, RuntimeError};

pub fn swap(machine: &mut Machine) -> Result<InterpretResult, RuntimeError> {
    machine.swap()?;
    Ok(InterpretResult::Move(1))
}

pub fn pop(machine: &mut Machine) -> Result<InterpretResult, RuntimeError> {
    machine.drop_top()?;
    Ok(InterpretResult::Move(1))
}
