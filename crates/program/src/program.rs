// Copyright (c) 2023 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions,
// more details in file LICENSE and CONTRIBUTING.

use std::collections::HashMap;

use mathvm_bytecode::Bytecode;
use mathvm_types::ValueType;

use crate::ProgramError;

/// the name of the program entry function
pub const ENTRY_FUNCTION_NAME: &str = "<top>";

// 0xffff is reserved as an invalid-id sentinel, so the tables hold at
// most 0xffff entries and their counts always fit an uint16
const ID_MAX: usize = 0xffff;

/// one translated function: metadata plus its sealed bytecode buffer
#[derive(Debug)]
pub struct BytecodeFunction {
    pub id: u16,
    pub name: String,

    /// the id of the lexical scope of the function body. a variable
    /// whose owning scope carries this id is local to the function,
    /// every other variable needs the context instructions.
    pub scope_id: u16,

    pub params: Vec<ValueType>,
    pub return_type: ValueType,

    /// the number of frame slots, the parameters included
    pub locals_count: u16,

    pub code: Bytecode,
}

/// a variable declared at the top level of the entry function.
/// the interpreter binds externally provided values to these
/// before execution starts.
#[derive(Debug, PartialEq, Clone)]
pub struct GlobalVar {
    pub name: String,
    pub value_type: ValueType,
    pub slot: u16,
}

/// the translator's output: the function table, the string constant
/// pool and the top-level variable descriptors. mutated only during
/// translation, read-only inside the interpreter.
#[derive(Debug)]
pub struct Program {
    functions: Vec<BytecodeFunction>,
    function_ids: HashMap<String, u16>,

    // index 0 is reserved for the empty literal, so a dedicated
    // "push empty string" instruction exists
    string_constants: Vec<String>,
    string_ids: HashMap<String, u16>,

    globals: Vec<GlobalVar>,
}

impl Program {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        let mut program = Self {
            functions: Vec::new(),
            function_ids: HashMap::new(),
            string_constants: Vec::new(),
            string_ids: HashMap::new(),
            globals: Vec::new(),
        };

        let empty_id = program.add_string_constant("").unwrap();
        debug_assert_eq!(empty_id, 0);
        program
    }

    /// intern a string literal. insertion returns the existing index
    /// when the literal is already present, the pool only grows.
    pub fn add_string_constant(&mut self, literal: &str) -> Result<u16, ProgramError> {
        if let Some(&id) = self.string_ids.get(literal) {
            return Ok(id);
        }

        if self.string_constants.len() >= ID_MAX {
            return Err(ProgramError::TooManyStringConstants);
        }
        let id = self.string_constants.len() as u16;
        self.string_constants.push(literal.to_owned());
        self.string_ids.insert(literal.to_owned(), id);
        Ok(id)
    }

    pub fn string_constant(&self, id: u16) -> &str {
        &self.string_constants[id as usize]
    }

    pub fn string_constants_count(&self) -> u16 {
        self.string_constants.len() as u16
    }

    pub fn string_constant_id(&self, literal: &str) -> Option<u16> {
        self.string_ids.get(literal).copied()
    }

    /// create a function entry with an empty bytecode buffer and
    /// return its id. the name is interned into the string pool so
    /// the image writer can refer to it by index.
    pub fn add_function(
        &mut self,
        name: &str,
        params: Vec<ValueType>,
        return_type: ValueType,
        scope_id: u16,
    ) -> Result<u16, ProgramError> {
        if self.function_ids.contains_key(name) {
            return Err(ProgramError::DuplicateFunctionName(name.to_owned()));
        }

        if self.functions.len() >= ID_MAX {
            return Err(ProgramError::TooManyFunctions);
        }
        let id = self.functions.len() as u16;
        self.add_string_constant(name)?;

        self.functions.push(BytecodeFunction {
            id,
            name: name.to_owned(),
            scope_id,
            params,
            return_type,
            locals_count: 0,
            code: Bytecode::new(),
        });
        self.function_ids.insert(name.to_owned(), id);
        Ok(id)
    }

    pub fn function_by_id(&self, id: u16) -> &BytecodeFunction {
        &self.functions[id as usize]
    }

    pub fn function_by_id_mut(&mut self, id: u16) -> &mut BytecodeFunction {
        &mut self.functions[id as usize]
    }

    pub fn function_by_name(&self, name: &str) -> Option<&BytecodeFunction> {
        self.function_ids
            .get(name)
            .map(|&id| &self.functions[id as usize])
    }

    pub fn functions(&self) -> impl Iterator<Item = &BytecodeFunction> {
        self.functions.iter()
    }

    pub fn functions_count(&self) -> u16 {
        self.functions.len() as u16
    }

    pub fn add_global(&mut self, name: &str, value_type: ValueType, slot: u16) {
        self.globals.push(GlobalVar {
            name: name.to_owned(),
            value_type,
            slot,
        });
    }

    pub fn globals(&self) -> &[GlobalVar] {
        &self.globals
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use mathvm_types::ValueType;

    use crate::{program::Program, ProgramError};

    #[test]
    fn test_string_pool_reserves_the_empty_literal() {
        let mut program = Program::new();
        assert_eq!(program.string_constant(0), "");

        // inserting the empty literal again returns the reserved id
        assert_eq!(program.add_string_constant(""), Ok(0));
    }

    #[test]
    fn test_string_pool_deduplicates() {
        let mut program = Program::new();
        let id0 = program.add_string_constant("hello").unwrap();
        let id1 = program.add_string_constant("world").unwrap();
        let id2 = program.add_string_constant("hello").unwrap();

        assert_eq!(id0, 1);
        assert_eq!(id1, 2);
        assert_eq!(id2, id0);
        assert_eq!(program.string_constant(id1), "world");
        assert_eq!(program.string_constants_count(), 3);
    }

    #[test]
    fn test_string_pool_capacity_is_sixteen_bits() {
        let mut program = Program::new();
        let mut last = Ok(0);
        for i in 0..70000 {
            last = program.add_string_constant(&format!("s{}", i));
            if last.is_err() {
                break;
            }
        }
        assert_eq!(last, Err(ProgramError::TooManyStringConstants));
        assert_eq!(program.string_constants_count(), u16::MAX);
    }

    #[test]
    fn test_function_table() {
        let mut program = Program::new();
        let top = program
            .add_function("<top>", vec![], ValueType::Void, 0)
            .unwrap();
        let add = program
            .add_function(
                "add",
                vec![ValueType::Int, ValueType::Int],
                ValueType::Int,
                1,
            )
            .unwrap();

        assert_eq!(top, 0);
        assert_eq!(add, 1);
        assert_eq!(program.function_by_id(1).name, "add");
        assert_eq!(program.function_by_name("add").unwrap().id, 1);
        assert_eq!(program.function_by_name("mul").map(|f| f.id), None);
        assert_eq!(
            program.functions().map(|f| f.name.as_str()).collect::<Vec<_>>(),
            vec!["<top>", "add"]
        );

        // function names are interned
        assert_eq!(program.add_string_constant("add"), Ok(2));

        assert_eq!(
            program.add_function("add", vec![], ValueType::Void, 2),
            Err(ProgramError::DuplicateFunctionName("add".to_owned()))
        );
    }
}
