// Copyright (c) 2023 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions,
// more details in file LICENSE and CONTRIBUTING.

// MathVM instructions are variable-length code.
//
// - an instruction starts with an 8-bit opcode
// - immediates follow the opcode directly, little-endian:
//   `iload` carries an int64, `dload` an IEEE-754 float64,
//   `sload` and `call` a 16-bit id, the variable instructions one or
//   two 16-bit ids, the branch instructions a signed 16-bit
//   displacement relative to the first byte after the opcode
//
// the operand stack is typed: the 'i' instructions expect int64 cells,
// the 'd' instructions float64 cells and the 's' instructions string
// ids. the translator guarantees the types line up, the interpreter
// only re-checks the tags when the `type_check` feature is on.

use num_enum::TryFromPrimitive;

#[repr(u8)]
#[derive(Debug, PartialEq, Eq, Clone, Copy, TryFromPrimitive)]
#[allow(non_camel_case_types)]
pub enum Opcode {
    //
    // immediate number
    //

    iload = 0x01,       // push int64                 (param: value:int64)
    dload,              // push float64               (param: value:float64)
    sload,              // push string id             (param: string_id:uint16)
    iload_0,            // push int64 0
    iload_1,            // push int64 1
    iload_m1,           // push int64 -1
    dload_0,            // push float64 0.0
    dload_1,            // push float64 1.0
    dload_m1,           // push float64 -1.0
    sload_0,            // push string id 0 (the empty literal)

    //
    // arithmetic
    //

    // the binary instructions pop the upper operand 'a' and the lower
    // operand 'b' and push 'a OP b'. code generation evaluates the
    // right operand first, so 'a' is the left-hand side.

    iadd = 0x10,
    isub,
    imul,
    idiv,               // division by zero is a runtime error
    imod,               // truncated division remainder, sign follows the dividend
    dadd,
    dsub,
    dmul,
    ddiv,
    ineg,
    dneg,

    //
    // bitwise (int64 only)
    //

    iaor = 0x20,
    iaand,
    iaxor,

    //
    // conversion
    //

    i2d = 0x28,
    d2i,                // truncates toward zero
    s2i,                // parses the pooled literal, a bad literal is a runtime error

    //
    // comparison
    //

    // push -1, 0 or +1 comparing the upper operand against the lower.
    // `dcmp` pushes +1 when either operand is NaN.

    icmp = 0x30,
    dcmp,

    //
    // operand stack
    //

    swap = 0x34,
    pop,

    //
    // local variables, short forms for slots 0..3
    //

    load_ivar_0 = 0x40,
    load_ivar_1,
    load_ivar_2,
    load_ivar_3,
    load_dvar_0,
    load_dvar_1,
    load_dvar_2,
    load_dvar_3,
    load_svar_0,
    load_svar_1,
    load_svar_2,
    load_svar_3,
    store_ivar_0,
    store_ivar_1,
    store_ivar_2,
    store_ivar_3,
    store_dvar_0,
    store_dvar_1,
    store_dvar_2,
    store_dvar_3,
    store_svar_0,
    store_svar_1,
    store_svar_2,
    store_svar_3,

    //
    // local variables, wide forms
    //

    load_ivar = 0x60,   // (param: slot:uint16)
    load_dvar,          // (param: slot:uint16)
    load_svar,          // (param: slot:uint16)
    store_ivar,         // (param: slot:uint16)
    store_dvar,         // (param: slot:uint16)
    store_svar,         // (param: slot:uint16)

    //
    // context variables, the owning scope is resolved
    // against the call-frame stack at run time
    //

    load_ctx_ivar = 0x68,   // (param: scope_id:uint16, slot:uint16)
    load_ctx_dvar,          // (param: scope_id:uint16, slot:uint16)
    load_ctx_svar,          // (param: scope_id:uint16, slot:uint16)
    store_ctx_ivar,         // (param: scope_id:uint16, slot:uint16)
    store_ctx_dvar,         // (param: scope_id:uint16, slot:uint16)
    store_ctx_svar,         // (param: scope_id:uint16, slot:uint16)

    //
    // print
    //

    iprint = 0x70,
    dprint,
    sprint,

    //
    // control flow
    //

    ja = 0x78,          // (param: displacement:int16)
    ificmpe,            // (param: displacement:int16)
    ificmpne,           // (param: displacement:int16)
    ificmpg,            // (param: displacement:int16)
    ificmpge,           // (param: displacement:int16)
    ificmpl,            // (param: displacement:int16)
    ificmple,           // (param: displacement:int16)
    call,               // (param: function_id:uint16)
    ret,
    stop,
}

pub const MAX_OPCODE_NUMBER: usize = 0x90;

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::{Opcode, MAX_OPCODE_NUMBER};

    #[test]
    fn test_opcode_from_u8() {
        assert_eq!(Opcode::try_from(0x01u8), Ok(Opcode::iload));
        assert_eq!(Opcode::try_from(0x30u8), Ok(Opcode::icmp));
        assert_eq!(Opcode::try_from(0x81u8), Ok(Opcode::stop));

        // gaps between the groups and the bytes past the last group
        // do not decode
        assert!(Opcode::try_from(0x00u8).is_err());
        assert!(Opcode::try_from(0x0bu8).is_err());
        assert!(Opcode::try_from(0x82u8).is_err());
    }

    #[test]
    fn test_opcode_numbers_fit_the_dispatch_table() {
        assert!((Opcode::stop as usize) < MAX_OPCODE_NUMBER);
    }
}
