// Copyright (c) 2023 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions,
// more details in file LICENSE and CONTRIBUTING.

// token types:
//
// - identifier and keyword:
//   /a-zA-Z_/ followed by /a-zA-Z0-9_/*, e.g.
//   x, add, print_all_2
// - number:
//   a decimal integer, or a floating literal with a decimal dot and
//   an optional exponent, e.g.
//   211, 3.14, 1.0e-2
//   note that '1..4' lexes as integer 1, the range operator, integer 4:
//   a dot only starts a fraction when a digit follows it.
// - string: a char sequence surrounded by single quotes, e.g.
//   'hello\n'
//   supported escapes: \\ \' \n \t \r
// - line comment: from the double slash to the end of the line, e.g.
//   // comment
// - operators and punctuation:
//   || && | ^ & == != < <= > >= + - * / % ! = += -= .. ( ) { } , ;

use mathvm_types::CompileError;

#[derive(Debug, PartialEq, Clone)]
pub enum TokenKind {
    Identifier(String),
    IntLiteral(i64),
    DoubleLiteral(f64),
    StringLiteral(String),

    // keywords
    Function,
    If,
    Else,
    While,
    For,
    In,
    Return,
    Print,
    IntType,
    DoubleType,
    StringType,
    VoidType,

    // punctuation
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
    Comma,
    Semicolon,

    // operators
    Assign,
    AddAssign,
    SubAssign,
    Or,
    And,
    BitOr,
    BitXor,
    BitAnd,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Not,
    Range,
}

#[derive(Debug, PartialEq, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub position: u32,
}

pub fn lex(source: &str) -> Result<Vec<Token>, CompileError> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens: Vec<Token> = Vec::new();
    let mut index = 0;

    // the byte offset of chars[index]; chars can be multi-byte
    // inside string literals and comments
    let mut offset = 0u32;

    macro_rules! push {
        ($kind:expr, $position:expr, $width:expr) => {{
            tokens.push(Token {
                kind: $kind,
                position: $position,
            });
            index += $width;
            offset += $width as u32;
        }};
    }

    while index < chars.len() {
        let ch = chars[index];
        let position = offset;

        match ch {
            ' ' | '\t' | '\r' | '\n' => {
                index += 1;
                offset += 1;
            }
            '/' if chars.get(index + 1) == Some(&'/') => {
                while index < chars.len() && chars[index] != '\n' {
                    offset += chars[index].len_utf8() as u32;
                    index += 1;
                }
            }
            '0'..='9' => {
                let (width, kind) = lex_number(&chars[index..], position)?;
                push!(kind, position, width);
            }
            'a'..='z' | 'A'..='Z' | '_' => {
                let mut end = index;
                while end < chars.len()
                    && (chars[end].is_ascii_alphanumeric() || chars[end] == '_')
                {
                    end += 1;
                }
                let word: String = chars[index..end].iter().collect();
                let kind = match word.as_str() {
                    "function" => TokenKind::Function,
                    "if" => TokenKind::If,
                    "else" => TokenKind::Else,
                    "while" => TokenKind::While,
                    "for" => TokenKind::For,
                    "in" => TokenKind::In,
                    "return" => TokenKind::Return,
                    "print" => TokenKind::Print,
                    "int" => TokenKind::IntType,
                    "double" => TokenKind::DoubleType,
                    "string" => TokenKind::StringType,
                    "void" => TokenKind::VoidType,
                    _ => TokenKind::Identifier(word.clone()),
                };
                push!(kind, position, word.len());
            }
            '\'' => {
                let (char_width, byte_width, literal) = lex_string(&chars[index..], position)?;
                tokens.push(Token {
                    kind: TokenKind::StringLiteral(literal),
                    position,
                });
                index += char_width;
                offset += byte_width;
            }
            _ => {
                let two: String = chars[index..(index + 2).min(chars.len())].iter().collect();
                let (width, kind) = match two.as_str() {
                    "||" => (2, TokenKind::Or),
                    "&&" => (2, TokenKind::And),
                    "==" => (2, TokenKind::Eq),
                    "!=" => (2, TokenKind::Ne),
                    "<=" => (2, TokenKind::Le),
                    ">=" => (2, TokenKind::Ge),
                    "+=" => (2, TokenKind::AddAssign),
                    "-=" => (2, TokenKind::SubAssign),
                    ".." => (2, TokenKind::Range),
                    _ => match ch {
                        '|' => (1, TokenKind::BitOr),
                        '^' => (1, TokenKind::BitXor),
                        '&' => (1, TokenKind::BitAnd),
                        '<' => (1, TokenKind::Lt),
                        '>' => (1, TokenKind::Gt),
                        '+' => (1, TokenKind::Add),
                        '-' => (1, TokenKind::Sub),
                        '*' => (1, TokenKind::Mul),
                        '/' => (1, TokenKind::Div),
                        '%' => (1, TokenKind::Mod),
                        '!' => (1, TokenKind::Not),
                        '=' => (1, TokenKind::Assign),
                        '(' => (1, TokenKind::LeftParen),
                        ')' => (1, TokenKind::RightParen),
                        '{' => (1, TokenKind::LeftBrace),
                        '}' => (1, TokenKind::RightBrace),
                        ',' => (1, TokenKind::Comma),
                        ';' => (1, TokenKind::Semicolon),
                        _ => {
                            return Err(CompileError::new(
                                &format!("unexpected character '{}'", ch),
                                position,
                            ));
                        }
                    },
                };
                push!(kind, position, width);
            }
        }
    }

    Ok(tokens)
}

// returns (consumed chars, token kind)
fn lex_number(chars: &[char], position: u32) -> Result<(usize, TokenKind), CompileError> {
    let mut end = 0;
    while end < chars.len() && chars[end].is_ascii_digit() {
        end += 1;
    }

    // a dot starts a fraction only when a digit follows, otherwise it
    // belongs to the range operator
    let mut is_double = false;
    if chars.get(end) == Some(&'.') && chars.get(end + 1).is_some_and(|c| c.is_ascii_digit()) {
        is_double = true;
        end += 1;
        while end < chars.len() && chars[end].is_ascii_digit() {
            end += 1;
        }
    }

    if matches!(chars.get(end), Some(&'e') | Some(&'E')) {
        let mut exponent_end = end + 1;
        if matches!(chars.get(exponent_end), Some(&'+') | Some(&'-')) {
            exponent_end += 1;
        }
        if chars.get(exponent_end).is_some_and(|c| c.is_ascii_digit()) {
            is_double = true;
            end = exponent_end;
            while end < chars.len() && chars[end].is_ascii_digit() {
                end += 1;
            }
        }
    }

    let text: String = chars[..end].iter().collect();
    let kind = if is_double {
        let value = text
            .parse::<f64>()
            .map_err(|_| CompileError::new("malformed floating literal", position))?;
        TokenKind::DoubleLiteral(value)
    } else {
        let value = text
            .parse::<i64>()
            .map_err(|_| CompileError::new("integer literal out of range", position))?;
        TokenKind::IntLiteral(value)
    };
    Ok((end, kind))
}

// returns (consumed chars, consumed bytes, the unescaped literal)
fn lex_string(chars: &[char], position: u32) -> Result<(usize, u32, String), CompileError> {
    let mut literal = String::new();
    let mut index = 1; // skip the opening quote
    let mut bytes = 1u32;

    loop {
        let ch = *chars
            .get(index)
            .ok_or_else(|| CompileError::new("unterminated string literal", position))?;
        bytes += ch.len_utf8() as u32;
        index += 1;

        match ch {
            '\'' => break,
            '\\' => {
                let escape = *chars
                    .get(index)
                    .ok_or_else(|| CompileError::new("unterminated string literal", position))?;
                bytes += escape.len_utf8() as u32;
                index += 1;
                match escape {
                    '\\' => literal.push('\\'),
                    '\'' => literal.push('\''),
                    'n' => literal.push('\n'),
                    't' => literal.push('\t'),
                    'r' => literal.push('\r'),
                    _ => {
                        return Err(CompileError::new(
                            &format!("unsupported escape '\\{}'", escape),
                            position,
                        ));
                    }
                }
            }
            _ => literal.push(ch),
        }
    }

    Ok((index, bytes, literal))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use mathvm_types::CompileError;

    use crate::lexer::{lex, TokenKind};

    fn kinds(source: &str) -> Vec<TokenKind> {
        lex(source).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_lex_declaration_and_assignment() {
        assert_eq!(
            kinds("int i; i = 0;"),
            vec![
                TokenKind::IntType,
                TokenKind::Identifier("i".to_owned()),
                TokenKind::Semicolon,
                TokenKind::Identifier("i".to_owned()),
                TokenKind::Assign,
                TokenKind::IntLiteral(0),
                TokenKind::Semicolon,
            ]
        );
    }

    #[test]
    fn test_lex_numbers() {
        assert_eq!(
            kinds("42 3.5 1.0e-2 2e3"),
            vec![
                TokenKind::IntLiteral(42),
                TokenKind::DoubleLiteral(3.5),
                TokenKind::DoubleLiteral(0.01),
                TokenKind::DoubleLiteral(2000.0),
            ]
        );
    }

    #[test]
    fn test_lex_range_is_not_a_fraction() {
        assert_eq!(
            kinds("1..4"),
            vec![
                TokenKind::IntLiteral(1),
                TokenKind::Range,
                TokenKind::IntLiteral(4),
            ]
        );
    }

    #[test]
    fn test_lex_string_with_escapes() {
        assert_eq!(
            kinds("'a\\n\\'b'"),
            vec![TokenKind::StringLiteral("a\n'b".to_owned())]
        );
    }

    #[test]
    fn test_lex_two_char_operators() {
        assert_eq!(
            kinds("<= >= == != && || += -="),
            vec![
                TokenKind::Le,
                TokenKind::Ge,
                TokenKind::Eq,
                TokenKind::Ne,
                TokenKind::And,
                TokenKind::Or,
                TokenKind::AddAssign,
                TokenKind::SubAssign,
            ]
        );
    }

    #[test]
    fn test_lex_comment_runs_to_end_of_line() {
        assert_eq!(
            kinds("1 // the answer\n2"),
            vec![TokenKind::IntLiteral(1), TokenKind::IntLiteral(2)]
        );
    }

    #[test]
    fn test_lex_positions() {
        let tokens = lex("if x").unwrap();
        assert_eq!(tokens[0].position, 0);
        assert_eq!(tokens[1].position, 3);
    }

    #[test]
    fn test_lex_rejects_stray_characters() {
        assert_eq!(
            lex("int @"),
            Err(CompileError::new("unexpected character '@'", 4))
        );
    }
}
