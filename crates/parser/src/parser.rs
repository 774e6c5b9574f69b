// Copyright (c) 2023 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions,
// more details in file LICENSE and CONTRIBUTING.

// a recursive-descent parser over the token stream.
//
// the statement grammar:
//
//   block       = '{' statement* '}'
//   statement   = type IDENT ';'
//               | 'function' rettype IDENT '(' params ')' block
//               | IDENT ('=' | '+=' | '-=') expression ';'
//               | 'if' '(' expression ')' block ('else' (block | if))?
//               | 'while' '(' expression ')' block
//               | 'for' '(' IDENT 'in' expression ')' block
//               | 'return' expression? ';'
//               | 'print' '(' expression (',' expression)* ')' ';'
//               | block
//               | expression ';'
//
// the expression grammar, loosest first:
//
//   range       = or ('..' or)?
//   or          = and ('||' and)*
//   and         = bitor ('&&' bitor)*
//   bitor       = bitxor ('|' bitxor)*
//   bitxor      = bitand ('^' bitand)*
//   bitand      = equality ('&' equality)*
//   equality    = relational (('==' | '!=') relational)*
//   relational  = additive (('<' | '<=' | '>' | '>=') additive)*
//   additive    = term (('+' | '-') term)*
//   term        = unary (('*' | '/' | '%') unary)*
//   unary       = ('-' | '!') unary | primary
//   primary     = literal | IDENT | IDENT '(' args ')' | '(' range ')'

use mathvm_types::{CompileError, ValueType};

use crate::{
    ast::{AssignOp, BinaryOp, Block, Expr, FunctionDecl, Stmt, UnaryOp},
    lexer::{Token, TokenKind},
};

pub fn parse(tokens: Vec<Token>, end_position: u32) -> Result<Block, CompileError> {
    let mut parser = Parser {
        tokens,
        index: 0,
        end_position,
    };

    let mut statements: Vec<Stmt> = Vec::new();
    while !parser.is_end() {
        statements.push(parser.parse_statement()?);
    }
    Ok(Block { statements })
}

struct Parser {
    tokens: Vec<Token>,
    index: usize,
    end_position: u32,
}

impl Parser {
    fn is_end(&self) -> bool {
        self.index == self.tokens.len()
    }

    fn position(&self) -> u32 {
        self.tokens
            .get(self.index)
            .map(|t| t.position)
            .unwrap_or(self.end_position)
    }

    fn peek(&self) -> Option<&TokenKind> {
        self.tokens.get(self.index).map(|t| &t.kind)
    }

    fn peek_at(&self, ahead: usize) -> Option<&TokenKind> {
        self.tokens.get(self.index + ahead).map(|t| &t.kind)
    }

    fn advance(&mut self) -> Option<TokenKind> {
        let kind = self.tokens.get(self.index).map(|t| t.kind.clone());
        if kind.is_some() {
            self.index += 1;
        }
        kind
    }

    fn consume(&mut self, expected: TokenKind, what: &str) -> Result<(), CompileError> {
        if self.peek() == Some(&expected) {
            self.index += 1;
            Ok(())
        } else {
            Err(CompileError::new(
                &format!("expected {}", what),
                self.position(),
            ))
        }
    }

    fn expect_identifier(&mut self, what: &str) -> Result<String, CompileError> {
        let position = self.position();
        match self.advance() {
            Some(TokenKind::Identifier(name)) => Ok(name),
            _ => Err(CompileError::new(&format!("expected {}", what), position)),
        }
    }

    // ---- statements ----

    fn parse_statement(&mut self) -> Result<Stmt, CompileError> {
        let position = self.position();
        match self.peek() {
            Some(TokenKind::IntType | TokenKind::DoubleType | TokenKind::StringType) => {
                let value_type = self.parse_value_type()?;
                let name = self.expect_identifier("a variable name")?;
                self.consume(TokenKind::Semicolon, "';' after the declaration")?;
                Ok(Stmt::VarDecl {
                    value_type,
                    name,
                    position,
                })
            }
            Some(TokenKind::Function) => self.parse_function(),
            Some(TokenKind::If) => self.parse_if(),
            Some(TokenKind::While) => self.parse_while(),
            Some(TokenKind::For) => self.parse_for(),
            Some(TokenKind::Return) => self.parse_return(),
            Some(TokenKind::Print) => self.parse_print(),
            Some(TokenKind::LeftBrace) => Ok(Stmt::Block(self.parse_block()?)),
            Some(TokenKind::Identifier(_))
                if matches!(
                    self.peek_at(1),
                    Some(TokenKind::Assign | TokenKind::AddAssign | TokenKind::SubAssign)
                ) =>
            {
                self.parse_assignment()
            }
            Some(_) => {
                let expr = self.parse_expression()?;
                self.consume(TokenKind::Semicolon, "';' after the expression")?;
                Ok(Stmt::Expression { expr })
            }
            None => Err(CompileError::new("unexpected end of input", position)),
        }
    }

    fn parse_value_type(&mut self) -> Result<ValueType, CompileError> {
        let position = self.position();
        match self.advance() {
            Some(TokenKind::IntType) => Ok(ValueType::Int),
            Some(TokenKind::DoubleType) => Ok(ValueType::Double),
            Some(TokenKind::StringType) => Ok(ValueType::Str),
            Some(TokenKind::VoidType) => Ok(ValueType::Void),
            _ => Err(CompileError::new("expected a type name", position)),
        }
    }

    fn parse_function(&mut self) -> Result<Stmt, CompileError> {
        let position = self.position();
        self.consume(TokenKind::Function, "'function'")?;
        let return_type = self.parse_value_type()?;
        let name = self.expect_identifier("a function name")?;

        self.consume(TokenKind::LeftParen, "'(' after the function name")?;
        let mut params: Vec<(ValueType, String)> = Vec::new();
        if self.peek() != Some(&TokenKind::RightParen) {
            loop {
                let param_type = self.parse_value_type()?;
                let param_name = self.expect_identifier("a parameter name")?;
                params.push((param_type, param_name));
                if self.peek() != Some(&TokenKind::Comma) {
                    break;
                }
                self.index += 1;
            }
        }
        self.consume(TokenKind::RightParen, "')' after the parameters")?;

        let body = self.parse_block()?;
        Ok(Stmt::Function(FunctionDecl {
            name,
            params,
            return_type,
            body,
            position,
        }))
    }

    fn parse_if(&mut self) -> Result<Stmt, CompileError> {
        let position = self.position();
        self.consume(TokenKind::If, "'if'")?;
        self.consume(TokenKind::LeftParen, "'(' after 'if'")?;
        let condition = self.parse_expression()?;
        self.consume(TokenKind::RightParen, "')' after the condition")?;
        let then_block = self.parse_block()?;

        let else_block = if self.peek() == Some(&TokenKind::Else) {
            self.index += 1;
            if self.peek() == Some(&TokenKind::If) {
                // 'else if' chains nest as a single-statement block
                let nested = self.parse_if()?;
                Some(Block {
                    statements: vec![nested],
                })
            } else {
                Some(self.parse_block()?)
            }
        } else {
            None
        };

        Ok(Stmt::If {
            condition,
            then_block,
            else_block,
            position,
        })
    }

    fn parse_while(&mut self) -> Result<Stmt, CompileError> {
        let position = self.position();
        self.consume(TokenKind::While, "'while'")?;
        self.consume(TokenKind::LeftParen, "'(' after 'while'")?;
        let condition = self.parse_expression()?;
        self.consume(TokenKind::RightParen, "')' after the condition")?;
        let body = self.parse_block()?;
        Ok(Stmt::While {
            condition,
            body,
            position,
        })
    }

    fn parse_for(&mut self) -> Result<Stmt, CompileError> {
        let position = self.position();
        self.consume(TokenKind::For, "'for'")?;
        self.consume(TokenKind::LeftParen, "'(' after 'for'")?;
        let variable = self.expect_identifier("the loop variable")?;
        self.consume(TokenKind::In, "'in'")?;
        let range = self.parse_expression()?;
        self.consume(TokenKind::RightParen, "')' after the range")?;
        let body = self.parse_block()?;
        Ok(Stmt::For {
            variable,
            range,
            body,
            position,
        })
    }

    fn parse_return(&mut self) -> Result<Stmt, CompileError> {
        let position = self.position();
        self.consume(TokenKind::Return, "'return'")?;
        let value = if self.peek() == Some(&TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.consume(TokenKind::Semicolon, "';' after 'return'")?;
        Ok(Stmt::Return { value, position })
    }

    fn parse_print(&mut self) -> Result<Stmt, CompileError> {
        let position = self.position();
        self.consume(TokenKind::Print, "'print'")?;
        self.consume(TokenKind::LeftParen, "'(' after 'print'")?;
        let mut args: Vec<Expr> = Vec::new();
        if self.peek() != Some(&TokenKind::RightParen) {
            loop {
                args.push(self.parse_expression()?);
                if self.peek() != Some(&TokenKind::Comma) {
                    break;
                }
                self.index += 1;
            }
        }
        self.consume(TokenKind::RightParen, "')' after the arguments")?;
        self.consume(TokenKind::Semicolon, "';' after 'print'")?;
        Ok(Stmt::Print { args, position })
    }

    fn parse_assignment(&mut self) -> Result<Stmt, CompileError> {
        let position = self.position();
        let name = self.expect_identifier("a variable name")?;
        let op = match self.advance() {
            Some(TokenKind::Assign) => AssignOp::Assign,
            Some(TokenKind::AddAssign) => AssignOp::AddAssign,
            Some(TokenKind::SubAssign) => AssignOp::SubAssign,
            _ => unreachable!("the caller checked the assignment operator"),
        };
        let value = self.parse_expression()?;
        self.consume(TokenKind::Semicolon, "';' after the assignment")?;
        Ok(Stmt::Assign {
            name,
            op,
            value,
            position,
        })
    }

    fn parse_block(&mut self) -> Result<Block, CompileError> {
        self.consume(TokenKind::LeftBrace, "'{'")?;
        let mut statements: Vec<Stmt> = Vec::new();
        while self.peek() != Some(&TokenKind::RightBrace) {
            if self.is_end() {
                return Err(CompileError::new("expected '}'", self.position()));
            }
            statements.push(self.parse_statement()?);
        }
        self.index += 1;
        Ok(Block { statements })
    }

    // ---- expressions ----

    fn parse_expression(&mut self) -> Result<Expr, CompileError> {
        // the range operator binds loosest and does not chain
        let left = self.parse_or()?;
        if self.peek() == Some(&TokenKind::Range) {
            let position = self.position();
            self.index += 1;
            let right = self.parse_or()?;
            Ok(Expr::Binary {
                op: BinaryOp::Range,
                left: Box::new(left),
                right: Box::new(right),
                position,
            })
        } else {
            Ok(left)
        }
    }

    fn parse_binary_chain(
        &mut self,
        operators: &[(TokenKind, BinaryOp)],
        next: fn(&mut Self) -> Result<Expr, CompileError>,
    ) -> Result<Expr, CompileError> {
        let mut left = next(self)?;
        loop {
            let Some(current) = self.peek() else {
                return Ok(left);
            };
            let Some((_, op)) = operators.iter().find(|(kind, _)| kind == current) else {
                return Ok(left);
            };
            let op = *op;
            let position = self.position();
            self.index += 1;
            let right = next(self)?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
                position,
            };
        }
    }

    fn parse_or(&mut self) -> Result<Expr, CompileError> {
        self.parse_binary_chain(&[(TokenKind::Or, BinaryOp::Or)], Self::parse_and)
    }

    fn parse_and(&mut self) -> Result<Expr, CompileError> {
        self.parse_binary_chain(&[(TokenKind::And, BinaryOp::And)], Self::parse_bit_or)
    }

    fn parse_bit_or(&mut self) -> Result<Expr, CompileError> {
        self.parse_binary_chain(&[(TokenKind::BitOr, BinaryOp::BitOr)], Self::parse_bit_xor)
    }

    fn parse_bit_xor(&mut self) -> Result<Expr, CompileError> {
        self.parse_binary_chain(&[(TokenKind::BitXor, BinaryOp::BitXor)], Self::parse_bit_and)
    }

    fn parse_bit_and(&mut self) -> Result<Expr, CompileError> {
        self.parse_binary_chain(&[(TokenKind::BitAnd, BinaryOp::BitAnd)], Self::parse_equality)
    }

    fn parse_equality(&mut self) -> Result<Expr, CompileError> {
        self.parse_binary_chain(
            &[
                (TokenKind::Eq, BinaryOp::Eq),
                (TokenKind::Ne, BinaryOp::Ne),
            ],
            Self::parse_relational,
        )
    }

    fn parse_relational(&mut self) -> Result<Expr, CompileError> {
        self.parse_binary_chain(
            &[
                (TokenKind::Lt, BinaryOp::Lt),
                (TokenKind::Le, BinaryOp::Le),
                (TokenKind::Gt, BinaryOp::Gt),
                (TokenKind::Ge, BinaryOp::Ge),
            ],
            Self::parse_additive,
        )
    }

    fn parse_additive(&mut self) -> Result<Expr, CompileError> {
        self.parse_binary_chain(
            &[
                (TokenKind::Add, BinaryOp::Add),
                (TokenKind::Sub, BinaryOp::Sub),
            ],
            Self::parse_term,
        )
    }

    fn parse_term(&mut self) -> Result<Expr, CompileError> {
        self.parse_binary_chain(
            &[
                (TokenKind::Mul, BinaryOp::Mul),
                (TokenKind::Div, BinaryOp::Div),
                (TokenKind::Mod, BinaryOp::Mod),
            ],
            Self::parse_unary,
        )
    }

    fn parse_unary(&mut self) -> Result<Expr, CompileError> {
        let position = self.position();
        let op = match self.peek() {
            Some(TokenKind::Sub) => Some(UnaryOp::Neg),
            Some(TokenKind::Not) => Some(UnaryOp::Not),
            _ => None,
        };
        if let Some(op) = op {
            self.index += 1;
            let operand = self.parse_unary()?;
            // negated numeric literals fold here, so '-1' and '-1.0'
            // reach the dedicated short instructions
            let expr = match (op, operand) {
                (UnaryOp::Neg, Expr::IntLiteral { value, .. }) => Expr::IntLiteral {
                    value: value.wrapping_neg(),
                    position,
                },
                (UnaryOp::Neg, Expr::DoubleLiteral { value, .. }) => Expr::DoubleLiteral {
                    value: -value,
                    position,
                },
                (op, operand) => Expr::Unary {
                    op,
                    operand: Box::new(operand),
                    position,
                },
            };
            Ok(expr)
        } else {
            self.parse_primary()
        }
    }

    fn parse_primary(&mut self) -> Result<Expr, CompileError> {
        let position = self.position();
        match self.advance() {
            Some(TokenKind::IntLiteral(value)) => Ok(Expr::IntLiteral { value, position }),
            Some(TokenKind::DoubleLiteral(value)) => Ok(Expr::DoubleLiteral { value, position }),
            Some(TokenKind::StringLiteral(value)) => Ok(Expr::StringLiteral { value, position }),
            Some(TokenKind::Identifier(name)) => {
                if self.peek() == Some(&TokenKind::LeftParen) {
                    self.index += 1;
                    let mut args: Vec<Expr> = Vec::new();
                    if self.peek() != Some(&TokenKind::RightParen) {
                        loop {
                            args.push(self.parse_expression()?);
                            if self.peek() != Some(&TokenKind::Comma) {
                                break;
                            }
                            self.index += 1;
                        }
                    }
                    self.consume(TokenKind::RightParen, "')' after the arguments")?;
                    Ok(Expr::Call {
                        name,
                        args,
                        position,
                    })
                } else {
                    Ok(Expr::Load { name, position })
                }
            }
            Some(TokenKind::LeftParen) => {
                let inner = self.parse_expression()?;
                self.consume(TokenKind::RightParen, "')'")?;
                Ok(inner)
            }
            _ => Err(CompileError::new("expected an expression", position)),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use mathvm_types::ValueType;

    use crate::{
        ast::{AssignOp, BinaryOp, Block, Expr, Stmt},
        parse_source,
    };

    #[test]
    fn test_parse_declaration_and_assignment() {
        let block = parse_source("int i; i = 3 + 4 * 5;").unwrap();
        assert_eq!(block.statements.len(), 2);
        assert_eq!(
            block.statements[0],
            Stmt::VarDecl {
                value_type: ValueType::Int,
                name: "i".to_owned(),
                position: 0,
            }
        );

        // precedence: 3 + (4 * 5)
        let Stmt::Assign { name, op, value, .. } = &block.statements[1] else {
            panic!("expected an assignment");
        };
        assert_eq!(name, "i");
        assert_eq!(*op, AssignOp::Assign);
        let Expr::Binary { op: BinaryOp::Add, right, .. } = value else {
            panic!("expected an addition");
        };
        assert!(matches!(**right, Expr::Binary { op: BinaryOp::Mul, .. }));
    }

    #[test]
    fn test_parse_function_declaration() {
        let block = parse_source("function int add(int a, int b) { return a + b; }").unwrap();
        let Stmt::Function(decl) = &block.statements[0] else {
            panic!("expected a function declaration");
        };
        assert_eq!(decl.name, "add");
        assert_eq!(decl.return_type, ValueType::Int);
        assert_eq!(
            decl.params,
            vec![
                (ValueType::Int, "a".to_owned()),
                (ValueType::Int, "b".to_owned())
            ]
        );
        assert_eq!(decl.body.statements.len(), 1);
    }

    #[test]
    fn test_parse_if_else_chain() {
        let block = parse_source("if (a) { } else if (b) { } else { }").unwrap();
        let Stmt::If { else_block: Some(else_block), .. } = &block.statements[0] else {
            panic!("expected an if with an else");
        };
        assert!(matches!(
            else_block.statements[0],
            Stmt::If { else_block: Some(_), .. }
        ));
    }

    #[test]
    fn test_parse_for_over_range() {
        let block = parse_source("for (i in 1..4) { print(i); }").unwrap();
        let Stmt::For { variable, range, body, .. } = &block.statements[0] else {
            panic!("expected a for loop");
        };
        assert_eq!(variable, "i");
        assert!(matches!(
            range,
            Expr::Binary { op: BinaryOp::Range, .. }
        ));
        assert_eq!(body.statements.len(), 1);
    }

    #[test]
    fn test_negated_literals_fold() {
        let block = parse_source("int i; i = -1;").unwrap();
        let Stmt::Assign { value, .. } = &block.statements[1] else {
            panic!("expected an assignment");
        };
        assert!(matches!(value, Expr::IntLiteral { value: -1, .. }));

        // a negated variable stays a unary node
        let block = parse_source("int i; i = -i;").unwrap();
        let Stmt::Assign { value, .. } = &block.statements[1] else {
            panic!("expected an assignment");
        };
        assert!(matches!(value, Expr::Unary { .. }));
    }

    #[test]
    fn test_parse_call_statement() {
        let block = parse_source("g();").unwrap();
        assert_eq!(
            block.statements[0],
            Stmt::Expression {
                expr: Expr::Call {
                    name: "g".to_owned(),
                    args: vec![],
                    position: 0,
                }
            }
        );
    }

    #[test]
    fn test_parse_bare_block() {
        let block = parse_source("{ int i; }").unwrap();
        assert!(matches!(&block.statements[0], Stmt::Block(Block { statements }) if statements.len() == 1));
    }

    #[test]
    fn test_parse_error_carries_the_position() {
        let error = parse_source("int ;").unwrap_err();
        assert_eq!(error.position, 4);
        assert!(error.message.contains("variable name"));
    }

    #[test]
    fn test_parse_error_at_end_of_input() {
        let error = parse_source("int i").unwrap_err();
        assert_eq!(error.position, 5);
    }
}
