// Copyright (c) 2023 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions,
// more details in file LICENSE and CONTRIBUTING.

// helpers for building small programs by hand, mainly for unit tests
// here and in the translator crate.

use mathvm_bytecode::Bytecode;
use mathvm_program::{Program, ENTRY_FUNCTION_NAME};
use mathvm_types::{HostValue, ValueType};

use crate::{execute, RuntimeError};

/// a program whose entry function owns the given code, the entry
/// scope id is 0
pub fn build_program_with_entry(locals_count: u16, code: Bytecode) -> Program {
    let mut program = Program::new();
    let id = program
        .add_function(ENTRY_FUNCTION_NAME, vec![], ValueType::Void, 0)
        .unwrap();
    let function = program.function_by_id_mut(id);
    function.locals_count = locals_count;
    function.code = code;
    program
}

#[allow(clippy::too_many_arguments)]
pub fn add_function(
    program: &mut Program,
    name: &str,
    params: Vec<ValueType>,
    return_type: ValueType,
    scope_id: u16,
    locals_count: u16,
    code: Bytecode,
) -> u16 {
    let id = program
        .add_function(name, params, return_type, scope_id)
        .unwrap();
    let function = program.function_by_id_mut(id);
    function.locals_count = locals_count;
    function.code = code;
    id
}

/// run the program and collect everything it printed
pub fn run_capture(
    program: &Program,
    initial_vars: &[(&str, HostValue)],
) -> Result<String, RuntimeError> {
    let mut output: Vec<u8> = Vec::new();
    execute(program, initial_vars, &mut output)?;
    Ok(String::from_utf8(output).expect("the output is valid UTF-8"))
}
