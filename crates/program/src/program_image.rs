// Copyright (c) 2023 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions,
// more details in file LICENSE and CONTRIBUTING.

// the binary image layout:
//
// "MVM1"
// string pool
//   |-- uint16 entry count
//   |-- per entry: uint16 length, bytes
// function table
//   |-- uint16 entry count
//   |-- per entry:
//         uint16 name index (into the string pool)
//         uint8  return type
//         uint8  parameter count
//         uint8  parameter types ...
//         uint16 scope id
//         uint16 locals count
//         uint32 bytecode length
//         bytecode bytes
//
// all numbers are little-endian. the top-level variable descriptors
// are not part of the image, a loaded program can therefore not bind
// externally provided variables.

use std::io::Write;

use mathvm_bytecode::Bytecode;
use mathvm_types::ValueType;
use thiserror::Error;

use crate::{program::Program, ProgramError};

pub const IMAGE_MAGIC_NUMBER: &[u8; 4] = b"MVM1";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImageError {
    #[error("not a MathVM image")]
    BadMagic,

    #[error("image ends unexpectedly (at offset {0})")]
    UnexpectedEnd(usize),

    #[error("string constant {0} is not valid UTF-8")]
    BadString(u16),

    #[error("unknown value type byte 0x{0:02x}")]
    BadValueType(u8),

    #[error("function name index {0} is out of range")]
    BadNameIndex(u16),

    #[error(transparent)]
    Program(#[from] ProgramError),
}

pub fn save_program(program: &Program, writer: &mut dyn Write) -> std::io::Result<()> {
    writer.write_all(IMAGE_MAGIC_NUMBER)?;

    // string pool
    writer.write_all(&program.string_constants_count().to_le_bytes())?;
    for id in 0..program.string_constants_count() {
        let literal = program.string_constant(id).as_bytes();
        writer.write_all(&(literal.len() as u16).to_le_bytes())?;
        writer.write_all(literal)?;
    }

    // function table
    writer.write_all(&program.functions_count().to_le_bytes())?;
    for function in program.functions() {
        // the name was interned when the function was created
        let name_index = program
            .string_constant_id(&function.name)
            .expect("function name missing from the string pool");
        writer.write_all(&name_index.to_le_bytes())?;
        writer.write_all(&[function.return_type as u8, function.params.len() as u8])?;
        for &param in &function.params {
            writer.write_all(&[param as u8])?;
        }
        writer.write_all(&function.scope_id.to_le_bytes())?;
        writer.write_all(&function.locals_count.to_le_bytes())?;

        let code = function.code.as_bytes();
        writer.write_all(&(code.len() as u32).to_le_bytes())?;
        writer.write_all(code)?;
    }

    Ok(())
}

pub fn load_program(data: &[u8]) -> Result<Program, ImageError> {
    let mut reader = ImageReader { data, offset: 0 };

    if reader.read_bytes(4)? != IMAGE_MAGIC_NUMBER {
        return Err(ImageError::BadMagic);
    }

    let mut program = Program::new();

    // string pool, entry 0 is the reserved empty literal
    let string_count = reader.read_u16()?;
    for id in 0..string_count {
        let length = reader.read_u16()? as usize;
        let bytes = reader.read_bytes(length)?;
        let literal = std::str::from_utf8(bytes).map_err(|_| ImageError::BadString(id))?;
        program.add_string_constant(literal)?;
    }

    let function_count = reader.read_u16()?;
    for _ in 0..function_count {
        let name_index = reader.read_u16()?;
        if name_index >= program.string_constants_count() {
            return Err(ImageError::BadNameIndex(name_index));
        }
        let name = program.string_constant(name_index).to_owned();

        let return_type = read_value_type(&mut reader)?;
        let param_count = reader.read_u8()?;
        let mut params = Vec::with_capacity(param_count as usize);
        for _ in 0..param_count {
            params.push(read_value_type(&mut reader)?);
        }

        let scope_id = reader.read_u16()?;
        let locals_count = reader.read_u16()?;
        let code_length = reader.read_u32()? as usize;
        let code = reader.read_bytes(code_length)?.to_vec();

        let id = program.add_function(&name, params, return_type, scope_id)?;
        let function = program.function_by_id_mut(id);
        function.locals_count = locals_count;
        function.code = Bytecode::from_bytes(code);
    }

    Ok(program)
}

fn read_value_type(reader: &mut ImageReader) -> Result<ValueType, ImageError> {
    let byte = reader.read_u8()?;
    ValueType::try_from(byte).map_err(|_| ImageError::BadValueType(byte))
}

struct ImageReader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> ImageReader<'a> {
    fn read_bytes(&mut self, length: usize) -> Result<&'a [u8], ImageError> {
        let bytes = self
            .data
            .get(self.offset..self.offset + length)
            .ok_or(ImageError::UnexpectedEnd(self.offset))?;
        self.offset += length;
        Ok(bytes)
    }

    fn read_u8(&mut self) -> Result<u8, ImageError> {
        Ok(self.read_bytes(1)?[0])
    }

    fn read_u16(&mut self) -> Result<u16, ImageError> {
        let bytes = self.read_bytes(2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    fn read_u32(&mut self) -> Result<u32, ImageError> {
        let bytes = self.read_bytes(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use mathvm_bytecode::BytecodeWriter;
    use mathvm_types::{opcode::Opcode, ValueType};

    use crate::{
        program::Program,
        program_image::{load_program, save_program, ImageError, IMAGE_MAGIC_NUMBER},
    };

    fn build_sample_program() -> Program {
        let mut program = Program::new();
        program.add_string_constant("hello").unwrap();

        let top = program
            .add_function("<top>", vec![], ValueType::Void, 0)
            .unwrap();
        {
            let function = program.function_by_id_mut(top);
            function.locals_count = 1;
            function.code = BytecodeWriter::new()
                .write_opcode_i64(Opcode::iload, 2)
                .write_opcode_i64(Opcode::iload, 3)
                .write_opcode_u16(Opcode::call, 1)
                .write_opcode(Opcode::iprint)
                .write_opcode(Opcode::stop)
                .to_bytecode();
        }

        let add = program
            .add_function(
                "add",
                vec![ValueType::Int, ValueType::Int],
                ValueType::Int,
                1,
            )
            .unwrap();
        {
            let function = program.function_by_id_mut(add);
            function.locals_count = 2;
            function.code = BytecodeWriter::new()
                .write_opcode(Opcode::store_ivar_0)
                .write_opcode(Opcode::store_ivar_1)
                .write_opcode(Opcode::load_ivar_1)
                .write_opcode(Opcode::load_ivar_0)
                .write_opcode(Opcode::iadd)
                .write_opcode(Opcode::ret)
                .to_bytecode();
        }

        program
    }

    #[test]
    fn test_image_starts_with_the_magic_number() {
        let program = build_sample_program();
        let mut image_data: Vec<u8> = Vec::new();
        save_program(&program, &mut image_data).unwrap();

        assert_eq!(&image_data[0..4], IMAGE_MAGIC_NUMBER);
        // string pool entry count: "", "hello", "<top>", "add"
        assert_eq!(&image_data[4..6], &[4, 0]);
        // entry 0 is the reserved empty literal
        assert_eq!(&image_data[6..8], &[0, 0]);
    }

    #[test]
    fn test_image_round_trip() {
        let program = build_sample_program();
        let mut image_data: Vec<u8> = Vec::new();
        save_program(&program, &mut image_data).unwrap();

        let restored = load_program(&image_data).unwrap();

        // identical string pool
        assert_eq!(
            restored.string_constants_count(),
            program.string_constants_count()
        );
        for id in 0..program.string_constants_count() {
            assert_eq!(restored.string_constant(id), program.string_constant(id));
        }

        // identical function metadata, byte-identical bytecode
        assert_eq!(restored.functions_count(), program.functions_count());
        for (restored_fn, original_fn) in restored.functions().zip(program.functions()) {
            assert_eq!(restored_fn.name, original_fn.name);
            assert_eq!(restored_fn.scope_id, original_fn.scope_id);
            assert_eq!(restored_fn.params, original_fn.params);
            assert_eq!(restored_fn.return_type, original_fn.return_type);
            assert_eq!(restored_fn.locals_count, original_fn.locals_count);
            assert_eq!(restored_fn.code.as_bytes(), original_fn.code.as_bytes());
        }

        // saving the restored program reproduces the image bytes
        let mut second_image: Vec<u8> = Vec::new();
        save_program(&restored, &mut second_image).unwrap();
        assert_eq!(second_image, image_data);
    }

    #[test]
    fn test_load_rejects_foreign_data() {
        assert!(matches!(load_program(b"ELF!"), Err(ImageError::BadMagic)));
        assert!(matches!(
            load_program(b"MV"),
            Err(ImageError::UnexpectedEnd(0))
        ));
    }
}
