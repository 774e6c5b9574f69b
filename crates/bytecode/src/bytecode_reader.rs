// Copyright (c) 2023 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions,
// more details in file LICENSE and CONTRIBUTING.

use mathvm_types::opcode::Opcode;

use crate::ReadError;

// the decoding primitives. every function takes the offset of the
// datum and returns the offset of the first byte after it, so the
// caller can thread a program counter through them.

pub fn read_opcode(code: &[u8], offset: usize) -> Result<(usize, Opcode), ReadError> {
    let byte = *code.get(offset).ok_or(ReadError::UnexpectedEnd(offset))?;
    let opcode = Opcode::try_from(byte).map_err(|_| ReadError::UnknownOpcode(byte, offset))?;
    Ok((offset + 1, opcode))
}

pub fn read_param_i64(code: &[u8], offset: usize) -> Result<(usize, i64), ReadError> {
    let data = get_bytes::<8>(code, offset)?;
    Ok((offset + 8, i64::from_le_bytes(data)))
}

pub fn read_param_f64(code: &[u8], offset: usize) -> Result<(usize, f64), ReadError> {
    let data = get_bytes::<8>(code, offset)?;
    Ok((offset + 8, f64::from_le_bytes(data)))
}

pub fn read_param_u16(code: &[u8], offset: usize) -> Result<(usize, u16), ReadError> {
    let data = get_bytes::<2>(code, offset)?;
    Ok((offset + 2, u16::from_le_bytes(data)))
}

pub fn read_param_i16(code: &[u8], offset: usize) -> Result<(usize, i16), ReadError> {
    let data = get_bytes::<2>(code, offset)?;
    Ok((offset + 2, i16::from_le_bytes(data)))
}

pub fn read_param_u16_u16(code: &[u8], offset: usize) -> Result<(usize, u16, u16), ReadError> {
    let (offset, param0) = read_param_u16(code, offset)?;
    let (offset, param1) = read_param_u16(code, offset)?;
    Ok((offset, param0, param1))
}

fn get_bytes<const N: usize>(code: &[u8], offset: usize) -> Result<[u8; N], ReadError> {
    code.get(offset..offset + N)
        .map(|slice| {
            let mut data = [0u8; N];
            data.copy_from_slice(slice);
            data
        })
        .ok_or(ReadError::UnexpectedEnd(offset))
}

/// a sequential decoder over one function's code,
/// the read cursor is independent of any writer
pub struct BytecodeReader<'a> {
    code: &'a [u8],
    offset: usize,
}

impl<'a> BytecodeReader<'a> {
    pub fn new(code: &'a [u8]) -> Self {
        Self { code, offset: 0 }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn is_end(&self) -> bool {
        self.offset == self.code.len()
    }

    pub fn read_opcode(&mut self) -> Result<Opcode, ReadError> {
        let (offset, opcode) = read_opcode(self.code, self.offset)?;
        self.offset = offset;
        Ok(opcode)
    }

    pub fn read_i64(&mut self) -> Result<i64, ReadError> {
        let (offset, value) = read_param_i64(self.code, self.offset)?;
        self.offset = offset;
        Ok(value)
    }

    pub fn read_f64(&mut self) -> Result<f64, ReadError> {
        let (offset, value) = read_param_f64(self.code, self.offset)?;
        self.offset = offset;
        Ok(value)
    }

    pub fn read_u16(&mut self) -> Result<u16, ReadError> {
        let (offset, value) = read_param_u16(self.code, self.offset)?;
        self.offset = offset;
        Ok(value)
    }

    pub fn read_i16(&mut self) -> Result<i16, ReadError> {
        let (offset, value) = read_param_i16(self.code, self.offset)?;
        self.offset = offset;
        Ok(value)
    }
}

// format one function's code as the following text:
//
// 0x0000  iload           7
// 0x0009  store_ivar_0
// 0x000a  load_ivar_0
// 0x000b  iload_1
// 0x000c  ificmpe         -> 0x0014
// 0x000f  call            fn:1
// 0x0012  pop
// 0x0013  ret
// 0x0014  stop
pub fn format_bytecode(code: &[u8]) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut offset = 0;

    while offset < code.len() {
        let (offset_param, opcode) = match read_opcode(code, offset) {
            Ok(item) => item,
            Err(e) => {
                lines.push(format!("0x{:04x}  !! {}", offset, e));
                break;
            }
        };

        let result = format_operands(code, offset_param, opcode);
        let (offset_next, param_text) = match result {
            Ok(item) => item,
            Err(e) => {
                lines.push(format!("0x{:04x}  !! {}", offset, e));
                break;
            }
        };

        if param_text.is_empty() {
            lines.push(format!("0x{:04x}  {:?}", offset, opcode));
        } else {
            lines.push(format!("0x{:04x}  {:<14}  {}", offset, format!("{:?}", opcode), param_text));
        }
        offset = offset_next;
    }

    lines.join("\n")
}

fn format_operands(
    code: &[u8],
    offset: usize,
    opcode: Opcode,
) -> Result<(usize, String), ReadError> {
    let item = match opcode {
        Opcode::iload => {
            let (next, value) = read_param_i64(code, offset)?;
            (next, format!("{}", value))
        }
        Opcode::dload => {
            let (next, value) = read_param_f64(code, offset)?;
            (next, format!("{}", value))
        }
        Opcode::sload => {
            let (next, id) = read_param_u16(code, offset)?;
            (next, format!("str:{}", id))
        }
        Opcode::load_ivar
        | Opcode::load_dvar
        | Opcode::load_svar
        | Opcode::store_ivar
        | Opcode::store_dvar
        | Opcode::store_svar => {
            let (next, slot) = read_param_u16(code, offset)?;
            (next, format!("slot:{}", slot))
        }
        Opcode::load_ctx_ivar
        | Opcode::load_ctx_dvar
        | Opcode::load_ctx_svar
        | Opcode::store_ctx_ivar
        | Opcode::store_ctx_dvar
        | Opcode::store_ctx_svar => {
            let (next, scope_id, slot) = read_param_u16_u16(code, offset)?;
            (next, format!("scope:{}  slot:{}", scope_id, slot))
        }
        Opcode::call => {
            let (next, function_id) = read_param_u16(code, offset)?;
            (next, format!("fn:{}", function_id))
        }
        Opcode::ja
        | Opcode::ificmpe
        | Opcode::ificmpne
        | Opcode::ificmpg
        | Opcode::ificmpge
        | Opcode::ificmpl
        | Opcode::ificmple => {
            let (next, displacement) = read_param_i16(code, offset)?;
            let target = offset as isize + displacement as isize;
            (next, format!("-> 0x{:04x}", target))
        }
        _ => (offset, String::new()),
    };
    Ok(item)
}
