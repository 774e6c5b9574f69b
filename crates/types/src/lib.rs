// Copyright (c) 2023 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions,
// more details in file LICENSE and CONTRIBUTING.

use num_enum::TryFromPrimitive;
use thiserror::Error;

pub mod opcode;

/// the data type of
/// - variables and function parameters
/// - function return values
/// - the cells of the operand stack
///
/// 'Str' is a 16-bit index into the string constant pool, 'Void' only
/// occurs as a function return type, it is never representable on the
/// operand stack.
#[repr(u8)]
#[derive(Debug, PartialEq, Eq, Clone, Copy, TryFromPrimitive)]
pub enum ValueType {
    Void = 0x0,
    Int,
    Double,
    Str,
}

impl ValueType {
    pub fn is_numeric(&self) -> bool {
        matches!(self, ValueType::Int | ValueType::Double)
    }
}

/// the least common type of two numeric operands.
///
/// Int ⊔ Int = Int, any pair containing Double yields Double.
/// strings must be converted explicitly (S2I, then I2D if necessary)
/// before this lattice applies, so they have no entry here.
pub fn common_numeric_type(left: ValueType, right: ValueType) -> Option<ValueType> {
    match (left, right) {
        (ValueType::Int, ValueType::Int) => Some(ValueType::Int),
        (ValueType::Int, ValueType::Double)
        | (ValueType::Double, ValueType::Int)
        | (ValueType::Double, ValueType::Double) => Some(ValueType::Double),
        _ => None,
    }
}

/// a value handed in by the host before execution starts,
/// bound to a top-level variable by name.
#[derive(Debug, PartialEq, Clone)]
pub enum HostValue {
    Int(i64),
    Double(f64),
    Str(String),
}

/// the error of the translation stage, the first offending
/// source position (a byte offset) is attached.
///
/// both the parser and the translator produce this type, like the
/// runtime errors it is a terminal diagnosis and never used for
/// control flow.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} (at offset {position})")]
pub struct CompileError {
    pub message: String,
    pub position: u32,
}

impl CompileError {
    pub fn new(message: &str, position: u32) -> Self {
        Self {
            message: message.to_owned(),
            position,
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::{common_numeric_type, ValueType};

    #[test]
    fn test_common_numeric_type() {
        assert_eq!(
            common_numeric_type(ValueType::Int, ValueType::Int),
            Some(ValueType::Int)
        );
        assert_eq!(
            common_numeric_type(ValueType::Int, ValueType::Double),
            Some(ValueType::Double)
        );
        assert_eq!(
            common_numeric_type(ValueType::Double, ValueType::Int),
            Some(ValueType::Double)
        );
        assert_eq!(
            common_numeric_type(ValueType::Double, ValueType::Double),
            Some(ValueType::Double)
        );
        assert_eq!(common_numeric_type(ValueType::Str, ValueType::Int), None);
        assert_eq!(common_numeric_type(ValueType::Int, ValueType::Void), None);
    }

    #[test]
    fn test_value_type_from_u8() {
        assert_eq!(ValueType::try_from(0u8), Ok(ValueType::Void));
        assert_eq!(ValueType::try_from(2u8), Ok(ValueType::Double));
        assert!(ValueType::try_from(9u8).is_err());
    }
}
