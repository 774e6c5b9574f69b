// Copyright (c) 2023 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions,
// more details in file LICENSE and CONTRIBUTING.

// the fetch/decode/dispatch loop.
//
// one handler function per opcode, kept in a table indexed by the
// opcode byte. a handler reads its own immediates and reports how
// the PC moves on: sequentially, by a branch, into a callee or out
// of the current frame.

use std::io::Write;

use mathvm_program::Program;
use mathvm_types::{opcode::Opcode, HostValue};

use crate::{
    machine::{Machine, ProgramCounter},
    RuntimeError,
};

mod arithmetic;
mod bitwise;
mod comparison;
mod context;
mod control_flow;
mod conversion;
mod immediate;
mod local;
mod operand;
mod print;

pub enum InterpretResult {
    /// advance the PC by the instruction's width in bytes
    Move(usize),
    /// set the PC to an offset inside the current function
    Jump(usize),
    /// enter the function with the given id
    Call(u16),
    /// leave the current frame
    Return,
    /// the program is finished
    Stop,
}

type HandlerFunc = fn(&mut Machine) -> Result<InterpretResult, RuntimeError>;

fn unknown(machine: &mut Machine) -> Result<InterpretResult, RuntimeError> {
    let byte = machine.code()[machine.pc.offset];
    Err(RuntimeError::new(format!(
        "unknown opcode 0x{:02x} (at offset 0x{:04x})",
        byte, machine.pc.offset
    )))
}

pub struct Interpreter {
    handlers: Vec<HandlerFunc>,
}

impl Interpreter {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Interpreter {
        let mut handlers: Vec<HandlerFunc> = vec![unknown; 256];

        // immediate
        handlers[Opcode::iload as usize] = immediate::iload;
        handlers[Opcode::dload as usize] = immediate::dload;
        handlers[Opcode::sload as usize] = immediate::sload;
        handlers[Opcode::iload_0 as usize] = immediate::iload_0;
        handlers[Opcode::iload_1 as usize] = immediate::iload_1;
        handlers[Opcode::iload_m1 as usize] = immediate::iload_m1;
        handlers[Opcode::dload_0 as usize] = immediate::dload_0;
        handlers[Opcode::dload_1 as usize] = immediate::dload_1;
        handlers[Opcode::dload_m1 as usize] = immediate::dload_m1;
        handlers[Opcode::sload_0 as usize] = immediate::sload_0;

        // arithmetic
        handlers[Opcode::iadd as usize] = arithmetic::iadd;
        handlers[Opcode::isub as usize] = arithmetic::isub;
        handlers[Opcode::imul as usize] = arithmetic::imul;
        handlers[Opcode::idiv as usize] = arithmetic::idiv;
        handlers[Opcode::imod as usize] = arithmetic::imod;
        handlers[Opcode::dadd as usize] = arithmetic::dadd;
        handlers[Opcode::dsub as usize] = arithmetic::dsub;
        handlers[Opcode::dmul as usize] = arithmetic::dmul;
        handlers[Opcode::ddiv as usize] = arithmetic::ddiv;
        handlers[Opcode::ineg as usize] = arithmetic::ineg;
        handlers[Opcode::dneg as usize] = arithmetic::dneg;

        // bitwise
        handlers[Opcode::iaor as usize] = bitwise::iaor;
        handlers[Opcode::iaand as usize] = bitwise::iaand;
        handlers[Opcode::iaxor as usize] = bitwise::iaxor;

        // conversion
        handlers[Opcode::i2d as usize] = conversion::i2d;
        handlers[Opcode::d2i as usize] = conversion::d2i;
        handlers[Opcode::s2i as usize] = conversion::s2i;

        // comparison
        handlers[Opcode::icmp as usize] = comparison::icmp;
        handlers[Opcode::dcmp as usize] = comparison::dcmp;

        // operand stack
        handlers[Opcode::swap as usize] = operand::swap;
        handlers[Opcode::pop as usize] = operand::pop;

        // local variables, the short forms
        handlers[Opcode::load_ivar_0 as usize] = local::load_ivar_0;
        handlers[Opcode::load_ivar_1 as usize] = local::load_ivar_1;
        handlers[Opcode::load_ivar_2 as usize] = local::load_ivar_2;
        handlers[Opcode::load_ivar_3 as usize] = local::load_ivar_3;
        handlers[Opcode::load_dvar_0 as usize] = local::load_dvar_0;
        handlers[Opcode::load_dvar_1 as usize] = local::load_dvar_1;
        handlers[Opcode::load_dvar_2 as usize] = local::load_dvar_2;
        handlers[Opcode::load_dvar_3 as usize] = local::load_dvar_3;
        handlers[Opcode::load_svar_0 as usize] = local::load_svar_0;
        handlers[Opcode::load_svar_1 as usize] = local::load_svar_1;
        handlers[Opcode::load_svar_2 as usize] = local::load_svar_2;
        handlers[Opcode::load_svar_3 as usize] = local::load_svar_3;
        handlers[Opcode::store_ivar_0 as usize] = local::store_ivar_0;
        handlers[Opcode::store_ivar_1 as usize] = local::store_ivar_1;
        handlers[Opcode::store_ivar_2 as usize] = local::store_ivar_2;
        handlers[Opcode::store_ivar_3 as usize] = local::store_ivar_3;
        handlers[Opcode::store_dvar_0 as usize] = local::store_dvar_0;
        handlers[Opcode::store_dvar_1 as usize] = local::store_dvar_1;
        handlers[Opcode::store_dvar_2 as usize] = local::store_dvar_2;
        handlers[Opcode::store_dvar_3 as usize] = local::store_dvar_3;
        handlers[Opcode::store_svar_0 as usize] = local::store_svar_0;
        handlers[Opcode::store_svar_1 as usize] = local::store_svar_1;
        handlers[Opcode::store_svar_2 as usize] = local::store_svar_2;
        handlers[Opcode::store_svar_3 as usize] = local::store_svar_3;

        // local variables, the wide forms
        handlers[Opcode::load_ivar as usize] = local::load_ivar;
        handlers[Opcode::load_dvar as usize] = local::load_dvar;
        handlers[Opcode::load_svar as usize] = local::load_svar;
        handlers[Opcode::store_ivar as usize] = local::store_ivar;
        handlers[Opcode::store_dvar as usize] = local::store_dvar;
        handlers[Opcode::store_svar as usize] = local::store_svar;

        // context variables
        handlers[Opcode::load_ctx_ivar as usize] = context::load_ctx_ivar;
        handlers[Opcode::load_ctx_dvar as usize] = context::load_ctx_dvar;
        handlers[Opcode::load_ctx_svar as usize] = context::load_ctx_svar;
        handlers[Opcode::store_ctx_ivar as usize] = context::store_ctx_ivar;
        handlers[Opcode::store_ctx_dvar as usize] = context::store_ctx_dvar;
        handlers[Opcode::store_ctx_svar as usize] = context::store_ctx_svar;

        // print
        handlers[Opcode::iprint as usize] = print::iprint;
        handlers[Opcode::dprint as usize] = print::dprint;
        handlers[Opcode::sprint as usize] = print::sprint;

        // control flow
        handlers[Opcode::ja as usize] = control_flow::ja;
        handlers[Opcode::ificmpe as usize] = control_flow::ificmpe;
        handlers[Opcode::ificmpne as usize] = control_flow::ificmpne;
        handlers[Opcode::ificmpg as usize] = control_flow::ificmpg;
        handlers[Opcode::ificmpge as usize] = control_flow::ificmpge;
        handlers[Opcode::ificmpl as usize] = control_flow::ificmpl;
        handlers[Opcode::ificmple as usize] = control_flow::ificmple;
        handlers[Opcode::call as usize] = control_flow::call;
        handlers[Opcode::ret as usize] = control_flow::ret;
        handlers[Opcode::stop as usize] = control_flow::stop;

        Self { handlers }
    }

    /// run the program's entry function to completion
    pub fn execute(
        &self,
        program: &Program,
        initial_vars: &[(&str, HostValue)],
        output: &mut dyn Write,
    ) -> Result<(), RuntimeError> {
        let mut machine = Machine::new(program, output)?;
        machine.bind_initial_vars(initial_vars)?;
        self.run(&mut machine)
    }

    fn run(&self, machine: &mut Machine) -> Result<(), RuntimeError> {
        loop {
            let Some(&byte) = machine.code().get(machine.pc.offset) else {
                return Err(RuntimeError::new(
                    "the bytecode ended without a stop instruction",
                ));
            };

            match self.handlers[byte as usize](machine)? {
                InterpretResult::Move(width) => {
                    machine.pc.offset += width;
                }
                InterpretResult::Jump(target) => {
                    machine.pc.offset = target;
                }
                InterpretResult::Call(function_id) => {
                    let return_pc = ProgramCounter {
                        function_id: machine.pc.function_id,
                        // a call instruction is 3 bytes wide
                        offset: machine.pc.offset + 3,
                    };
                    machine.enter_function(function_id, return_pc)?;
                }
                InterpretResult::Return => {
                    if machine.leave_function()? {
                        return Ok(());
                    }
                }
                InterpretResult::Stop => {
                    return Ok(());
                }
            }
        }
    }
}

/// the one-shot convenience wrapper around `Interpreter`
pub fn execute(
    program: &Program,
    initial_vars: &[(&str, HostValue)],
    output: &mut dyn Write,
) -> Result<(), RuntimeError> {
    Interpreter::new().execute(program, initial_vars, output)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use mathvm_bytecode::{Bytecode, BytecodeWriter};
    use mathvm_types::{opcode::Opcode, HostValue, ValueType};

    use crate::utils::{add_function, build_program_with_entry, run_capture};

    fn run_entry(code: Bytecode) -> Result<String, crate::RuntimeError> {
        let program = build_program_with_entry(8, code);
        run_capture(&program, &[])
    }

    #[test]
    fn test_immediates_and_prints() {
        let code = BytecodeWriter::new()
            .write_opcode_i64(Opcode::iload, 42)
            .write_opcode(Opcode::iprint)
            .write_opcode_f64(Opcode::dload, 2.5)
            .write_opcode(Opcode::dprint)
            .write_opcode(Opcode::iload_m1)
            .write_opcode(Opcode::iprint)
            .write_opcode(Opcode::dload_1)
            .write_opcode(Opcode::dprint)
            .write_opcode(Opcode::stop)
            .to_bytecode();
        assert_eq!(run_entry(code).unwrap(), "422.5-11");
    }

    #[test]
    fn test_subtraction_takes_the_upper_operand_first() {
        // the upper operand is the left-hand side: 11 - 13
        let code = BytecodeWriter::new()
            .write_opcode_i64(Opcode::iload, 13)
            .write_opcode_i64(Opcode::iload, 11)
            .write_opcode(Opcode::isub)
            .write_opcode(Opcode::iprint)
            .write_opcode(Opcode::stop)
            .to_bytecode();
        assert_eq!(run_entry(code).unwrap(), "-2");
    }

    #[test]
    fn test_modulo_sign_follows_the_dividend() {
        let code = BytecodeWriter::new()
            .write_opcode_i64(Opcode::iload, 3)
            .write_opcode_i64(Opcode::iload, -7)
            .write_opcode(Opcode::imod)
            .write_opcode(Opcode::iprint)
            .write_opcode_i64(Opcode::iload, -3)
            .write_opcode_i64(Opcode::iload, 7)
            .write_opcode(Opcode::imod)
            .write_opcode(Opcode::iprint)
            .write_opcode(Opcode::stop)
            .to_bytecode();
        assert_eq!(run_entry(code).unwrap(), "-11");
    }

    #[test]
    fn test_division_by_zero_is_a_runtime_error() {
        let code = BytecodeWriter::new()
            .write_opcode(Opcode::iload_0)
            .write_opcode(Opcode::iload_1)
            .write_opcode(Opcode::idiv)
            .write_opcode(Opcode::stop)
            .to_bytecode();
        let error = run_entry(code).unwrap_err();
        assert!(error.message.contains("division by zero"));
    }

    #[test]
    fn test_icmp_is_three_valued() {
        // 3 against 5, 5 against 5, 7 against 5
        let code = BytecodeWriter::new()
            .write_opcode_i64(Opcode::iload, 5)
            .write_opcode_i64(Opcode::iload, 3)
            .write_opcode(Opcode::icmp)
            .write_opcode(Opcode::iprint)
            .write_opcode_i64(Opcode::iload, 5)
            .write_opcode_i64(Opcode::iload, 5)
            .write_opcode(Opcode::icmp)
            .write_opcode(Opcode::iprint)
            .write_opcode_i64(Opcode::iload, 5)
            .write_opcode_i64(Opcode::iload, 7)
            .write_opcode(Opcode::icmp)
            .write_opcode(Opcode::iprint)
            .write_opcode(Opcode::stop)
            .to_bytecode();
        assert_eq!(run_entry(code).unwrap(), "-101");
    }

    #[test]
    fn test_dcmp_treats_nan_as_greater() {
        let code = BytecodeWriter::new()
            .write_opcode(Opcode::dload_1)
            .write_opcode_f64(Opcode::dload, f64::NAN)
            .write_opcode(Opcode::dcmp)
            .write_opcode(Opcode::iprint)
            .write_opcode_f64(Opcode::dload, f64::NAN)
            .write_opcode(Opcode::dload_1)
            .write_opcode(Opcode::dcmp)
            .write_opcode(Opcode::iprint)
            .write_opcode(Opcode::stop)
            .to_bytecode();
        assert_eq!(run_entry(code).unwrap(), "11");
    }

    #[test]
    fn test_conversions() {
        let code = BytecodeWriter::new()
            .write_opcode_i64(Opcode::iload, 7)
            .write_opcode(Opcode::i2d)
            .write_opcode(Opcode::dprint)
            .write_opcode_f64(Opcode::dload, 2.9)
            .write_opcode(Opcode::d2i)
            .write_opcode(Opcode::iprint)
            .write_opcode_f64(Opcode::dload, -2.9)
            .write_opcode(Opcode::d2i)
            .write_opcode(Opcode::iprint)
            .write_opcode(Opcode::stop)
            .to_bytecode();
        assert_eq!(run_entry(code).unwrap(), "72-2");
    }

    #[test]
    fn test_s2i_parses_the_pooled_literal() {
        let mut program = build_program_with_entry(0, Bytecode::new());
        let id = program.add_string_constant("123").unwrap();
        assert_eq!(id, 2); // "<top>" takes index 1
        let entry = program.function_by_id_mut(0);
        entry.code = BytecodeWriter::new()
            .write_opcode_u16(Opcode::sload, id)
            .write_opcode(Opcode::s2i)
            .write_opcode(Opcode::iprint)
            .write_opcode(Opcode::stop)
            .to_bytecode();
        assert_eq!(run_capture(&program, &[]).unwrap(), "123");
    }

    #[test]
    fn test_s2i_rejects_a_non_numeric_literal() {
        let mut program = build_program_with_entry(0, Bytecode::new());
        let id = program.add_string_constant("abc").unwrap();
        let entry = program.function_by_id_mut(0);
        entry.code = BytecodeWriter::new()
            .write_opcode_u16(Opcode::sload, id)
            .write_opcode(Opcode::s2i)
            .write_opcode(Opcode::iprint)
            .write_opcode(Opcode::stop)
            .to_bytecode();
        let error = run_capture(&program, &[]).unwrap_err();
        assert!(error.message.contains("cannot parse"));
    }

    #[test]
    fn test_sprint_writes_the_raw_literal() {
        let mut program = build_program_with_entry(0, Bytecode::new());
        let id = program.add_string_constant("hello\n").unwrap();
        let entry = program.function_by_id_mut(0);
        entry.code = BytecodeWriter::new()
            .write_opcode_u16(Opcode::sload, id)
            .write_opcode(Opcode::sprint)
            .write_opcode(Opcode::sload_0)
            .write_opcode(Opcode::sprint)
            .write_opcode(Opcode::stop)
            .to_bytecode();
        assert_eq!(run_capture(&program, &[]).unwrap(), "hello\n");
    }

    #[test]
    fn test_swap_and_pop() {
        let code = BytecodeWriter::new()
            .write_opcode(Opcode::iload_1)
            .write_opcode_i64(Opcode::iload, 2)
            .write_opcode(Opcode::swap)
            .write_opcode(Opcode::iprint)
            .write_opcode(Opcode::iprint)
            .write_opcode_i64(Opcode::iload, 9)
            .write_opcode(Opcode::pop)
            .write_opcode(Opcode::stop)
            .to_bytecode();
        assert_eq!(run_entry(code).unwrap(), "12");
    }

    #[test]
    fn test_wide_local_forms() {
        let code = BytecodeWriter::new()
            .write_opcode_i64(Opcode::iload, 9)
            .write_opcode_u16(Opcode::store_ivar, 4)
            .write_opcode_u16(Opcode::load_ivar, 4)
            .write_opcode(Opcode::iprint)
            .write_opcode(Opcode::stop)
            .to_bytecode();
        assert_eq!(run_entry(code).unwrap(), "9");
    }

    #[test]
    fn test_branches() {
        // ja skips an iprint; ificmpl takes the branch for 1 < 2
        let code = BytecodeWriter::new()
            .write_opcode_i16(Opcode::ja, 12) // over "iload 7, iprint"
            .write_opcode_i64(Opcode::iload, 7)
            .write_opcode(Opcode::iprint)
            .write_opcode(Opcode::iload_1)
            .write_opcode_i64(Opcode::iload, 2)
            .write_opcode_i16(Opcode::ificmpl, 12) // over "iload 8, iprint"
            .write_opcode_i64(Opcode::iload, 8)
            .write_opcode(Opcode::iprint)
            .write_opcode(Opcode::iload_m1)
            .write_opcode(Opcode::iprint)
            .write_opcode(Opcode::stop)
            .to_bytecode();
        assert_eq!(run_entry(code).unwrap(), "-1");
    }

    #[test]
    fn test_every_conditional_branch_compares_below_against_top() {
        // the lower operand 'b' is pushed first, the branch is taken
        // when 'b OP a' holds
        let cases = [
            (Opcode::ificmpe, 2, 2, true),
            (Opcode::ificmpe, 2, 3, false),
            (Opcode::ificmpne, 1, 2, true),
            (Opcode::ificmpg, 3, 2, true),
            (Opcode::ificmpg, 2, 3, false),
            (Opcode::ificmpge, 2, 2, true),
            (Opcode::ificmpl, 2, 3, true),
            (Opcode::ificmpl, 3, 2, false),
            (Opcode::ificmple, 2, 2, true),
        ];
        for (opcode, b, a, taken) in cases {
            let code = BytecodeWriter::new()
                .write_opcode_i64(Opcode::iload, b)
                .write_opcode_i64(Opcode::iload, a)
                .write_opcode_i16(opcode, 6) // -> iload_1
                .write_opcode(Opcode::iload_0)
                .write_opcode_i16(Opcode::ja, 3) // -> iprint
                .write_opcode(Opcode::iload_1)
                .write_opcode(Opcode::iprint)
                .write_opcode(Opcode::stop)
                .to_bytecode();
            let expected = if taken { "1" } else { "0" };
            assert_eq!(run_entry(code).unwrap(), expected, "{:?} {} {}", opcode, b, a);
        }
    }

    #[test]
    fn test_branch_out_of_range_is_a_runtime_error() {
        let code = BytecodeWriter::new()
            .write_opcode_i16(Opcode::ja, 100)
            .write_opcode(Opcode::stop)
            .to_bytecode();
        let error = run_entry(code).unwrap_err();
        assert!(error.message.contains("outside the function's bytecode"));
    }

    #[test]
    fn test_call_and_return() {
        let mut program = build_program_with_entry(
            0,
            BytecodeWriter::new()
                .write_opcode_i64(Opcode::iload, 3)
                .write_opcode_i64(Opcode::iload, 2)
                .write_opcode_u16(Opcode::call, 1)
                .write_opcode(Opcode::iprint)
                .write_opcode(Opcode::stop)
                .to_bytecode(),
        );
        add_function(
            &mut program,
            "add",
            vec![ValueType::Int, ValueType::Int],
            ValueType::Int,
            1,
            2,
            BytecodeWriter::new()
                .write_opcode(Opcode::store_ivar_0)
                .write_opcode(Opcode::store_ivar_1)
                .write_opcode(Opcode::load_ivar_1)
                .write_opcode(Opcode::load_ivar_0)
                .write_opcode(Opcode::iadd)
                .write_opcode(Opcode::ret)
                .to_bytecode(),
        );
        assert_eq!(run_capture(&program, &[]).unwrap(), "5");
    }

    #[test]
    fn test_context_access_across_frames() {
        let mut program = build_program_with_entry(
            1,
            BytecodeWriter::new()
                .write_opcode_i64(Opcode::iload, 7)
                .write_opcode(Opcode::store_ivar_0)
                .write_opcode_u16(Opcode::call, 1)
                .write_opcode(Opcode::stop)
                .to_bytecode(),
        );
        add_function(
            &mut program,
            "g",
            vec![],
            ValueType::Void,
            1,
            0,
            BytecodeWriter::new()
                .write_opcode_u16_u16(Opcode::load_ctx_ivar, 0, 0)
                .write_opcode(Opcode::iprint)
                .write_opcode(Opcode::ret)
                .to_bytecode(),
        );
        assert_eq!(run_capture(&program, &[]).unwrap(), "7");
    }

    #[test]
    fn test_missing_context_frame_is_a_runtime_error() {
        let code = BytecodeWriter::new()
            .write_opcode_u16_u16(Opcode::load_ctx_ivar, 5, 0)
            .write_opcode(Opcode::iprint)
            .write_opcode(Opcode::stop)
            .to_bytecode();
        let error = run_entry(code).unwrap_err();
        assert!(error.message.contains("no frame for scope 5"));
    }

    #[test]
    fn test_unknown_opcode_is_a_runtime_error() {
        let program = build_program_with_entry(0, Bytecode::from_bytes(vec![0xee]));
        let error = run_capture(&program, &[]).unwrap_err();
        assert!(error.message.contains("unknown opcode 0xee"));
    }

    #[test]
    fn test_running_off_the_code_is_a_runtime_error() {
        let code = BytecodeWriter::new()
            .write_opcode(Opcode::iload_0)
            .write_opcode(Opcode::pop)
            .to_bytecode();
        let error = run_entry(code).unwrap_err();
        assert!(error.message.contains("without a stop"));
    }

    #[test]
    fn test_initial_vars_bind_by_name() {
        let mut program = build_program_with_entry(
            2,
            BytecodeWriter::new()
                .write_opcode(Opcode::load_ivar_0)
                .write_opcode(Opcode::iprint)
                .write_opcode(Opcode::load_dvar_1)
                .write_opcode(Opcode::dprint)
                .write_opcode(Opcode::stop)
                .to_bytecode(),
        );
        program.add_global("x", ValueType::Int, 0);
        program.add_global("y", ValueType::Double, 1);

        let output = run_capture(
            &program,
            &[
                ("x", HostValue::Int(9)),
                ("y", HostValue::Double(0.5)),
                ("unknown", HostValue::Int(1)),
            ],
        )
        .unwrap();
        assert_eq!(output, "90.5");
    }

    #[cfg(feature = "type_check")]
    #[test]
    fn test_operand_tags_are_checked() {
        let code = BytecodeWriter::new()
            .write_opcode(Opcode::iload_1)
            .write_opcode(Opcode::dprint)
            .write_opcode(Opcode::stop)
            .to_bytecode();
        let error = run_entry(code).unwrap_err();
        assert!(error.message.contains("operand type mismatch"));
    }
}
