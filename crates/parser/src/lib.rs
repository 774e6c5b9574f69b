// Copyright (c) 2023 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions,
// more details in file LICENSE and CONTRIBUTING.

use mathvm_types::CompileError;

pub mod ast;
pub mod lexer;
pub mod parser;

use crate::ast::Block;

/// lex and parse one source file into the top-level statement block
pub fn parse_source(source: &str) -> Result<Block, CompileError> {
    let tokens = lexer::lex(source)?;
    parser::parse(tokens, source.len() as u32)
}
