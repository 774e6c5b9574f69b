// Copyright (c) 2023 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions,
// more details in file LICENSE and CONTRIBUTING.

use std::cmp::Ordering;

use crate::{interpreter::InterpretResult, machine::Machine, RuntimeError};

/// push -1, 0 or +1 comparing the upper operand against the lower
pub fn icmp(machine: &mut Machine) -> Result<InterpretResult, RuntimeError> {
    let a = machine.pop_i64()?;
    let b = machine.pop_i64()?;
    let result = match a.cmp(&b) {
        Ordering::Less => -1,
        Ordering::Equal => 0,
        Ordering::Greater => 1,
    };
    machine.push_i64(result);
    Ok(InterpretResult::Move(1))
}

/// like `icmp`; pushes +1 when either operand is NaN, consumers must
/// not rely on any NaN-specific ordering
pub fn dcmp(machine: &mut Machine) -> Result<InterpretResult, RuntimeError> {
    let a = machine.pop_f64()?;
    let b = machine.pop_f64()?;
    let result = if a.is_nan() || b.is_nan() {
        1
    } else if a < b {
        -1
    } else if a > b {
        1
    } else {
        0
    };
    machine.push_i64(result);
    Ok(InterpretResult::Move(1))
}
