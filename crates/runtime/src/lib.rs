// Copyright (c) 2023 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions,
// more details in file LICENSE and CONTRIBUTING.

use thiserror::Error;

pub mod interpreter;
pub mod machine;
pub mod utils;

pub use interpreter::{execute, Interpreter};

/// a terminal execution failure: division by zero, a missing context
/// frame, a branch out of range, an undecodable instruction. the
/// machine state is discarded, errors are never used as control flow.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("runtime error: {message}")]
pub struct RuntimeError {
    pub message: String,
}

impl RuntimeError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<mathvm_bytecode::ReadError> for RuntimeError {
    fn from(e: mathvm_bytecode::ReadError) -> Self {
        Self::new(e.to_string())
    }
}
