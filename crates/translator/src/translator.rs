// Copyright (c) 2023 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions,
// more details in file LICENSE and CONTRIBUTING.

// the lowering pass from the AST to bytecode.
//
// one compile context per function is kept on a stack, each context
// carries the function's bytecode buffer and the compile-time
// top-of-stack type. the TOS type register selects the typed
// instruction variants and decides where conversions are inserted.
//
// every expression leaves exactly one value on the operand stack,
// every statement leaves the stack unchanged.
//
// blocks are translated in two passes: the first pass declares the
// block's variables and functions, the second emits code for the
// statements. the bodies of the functions declared in the block are
// translated afterwards, each in a freshly pushed context, so a
// function can call a sibling that is declared later in the same
// block.

use mathvm_bytecode::{Bytecode, Label};
use mathvm_parser::ast::{AssignOp, BinaryOp, Block, Expr, Stmt, UnaryOp};
use mathvm_parser::parse_source;
use mathvm_program::{Program, ENTRY_FUNCTION_NAME};
use mathvm_types::{common_numeric_type, opcode::Opcode, CompileError, ValueType};
use tracing::trace;

use crate::scope::{ScopeArena, VarLocation};

/// translate one source file into an executable program
pub fn translate(source: &str) -> Result<Program, CompileError> {
    let ast = parse_source(source)?;
    Translator::new().run(&ast)
}

struct CompileContext {
    function_id: u16,

    /// the id of the function's body scope, a variable owned by any
    /// other function scope needs the context instructions
    function_scope_id: u16,

    /// the innermost scope while generating, blocks nest inside the
    /// body scope
    current_scope: u16,

    return_type: ValueType,
    code: Bytecode,
    tos_type: ValueType,
}

struct Translator {
    program: Program,
    arena: ScopeArena,
    contexts: Vec<CompileContext>,
}

impl Translator {
    fn new() -> Self {
        Self {
            program: Program::new(),
            arena: ScopeArena::new(),
            contexts: Vec::new(),
        }
    }

    fn run(mut self, ast: &Block) -> Result<Program, CompileError> {
        let root_scope = self.arena.create_scope(None, true, 0)?;
        let entry_id = self
            .program
            .add_function(ENTRY_FUNCTION_NAME, vec![], ValueType::Void, root_scope)
            .expect("the function table is empty");

        self.translate_function_body(entry_id, root_scope, &[], ast, 0)?;
        Ok(self.program)
    }

    // ---- context helpers ----

    fn ctx(&mut self) -> &mut CompileContext {
        self.contexts.last_mut().expect("a context is always pushed")
    }

    fn current_scope(&self) -> u16 {
        self.contexts
            .last()
            .expect("a context is always pushed")
            .current_scope
    }

    fn tos(&self) -> ValueType {
        self.contexts
            .last()
            .expect("a context is always pushed")
            .tos_type
    }

    fn set_tos(&mut self, value_type: ValueType) {
        self.ctx().tos_type = value_type;
    }

    fn code(&mut self) -> &mut Bytecode {
        &mut self.ctx().code
    }

    // ---- functions ----

    fn translate_function_body(
        &mut self,
        function_id: u16,
        scope_id: u16,
        params: &[(ValueType, String)],
        body: &Block,
        position: u32,
    ) -> Result<(), CompileError> {
        trace!(function_id, scope_id, "translating function body");

        let return_type = self.program.function_by_id(function_id).return_type;
        self.contexts.push(CompileContext {
            function_id,
            function_scope_id: scope_id,
            current_scope: scope_id,
            return_type,
            code: Bytecode::new(),
            tos_type: ValueType::Void,
        });

        // the prologue drains the arguments into the parameter slots,
        // argument 0 is on top of the stack at entry
        let mut param_locations: Vec<VarLocation> = Vec::new();
        for (param_type, param_name) in params {
            let location =
                self.arena
                    .declare_variable(scope_id, param_name, *param_type, position)?;
            param_locations.push(location);
        }
        for location in param_locations {
            self.emit_store_var(location);
        }

        self.translate_block_in_current_scope(body)?;

        if !block_ends_with_return(body) {
            if function_id == 0 {
                self.code().write_opcode(Opcode::stop);
            } else {
                self.code().write_opcode(Opcode::ret);
            }
        }

        let context = self.contexts.pop().expect("the context pushed above");
        if context.code.has_unbound_refs() {
            return Err(CompileError::new(
                "a branch label was left unbound at the end of the function",
                position,
            ));
        }

        let locals_count = self.arena.slot_count(scope_id);
        let function = self.program.function_by_id_mut(function_id);
        function.locals_count = locals_count;
        function.code = context.code;
        Ok(())
    }

    // ---- blocks ----

    fn translate_block_in_current_scope(&mut self, block: &Block) -> Result<(), CompileError> {
        let scope_id = self.current_scope();

        // pass 1: declare the block's variables and functions
        for stmt in &block.statements {
            match stmt {
                Stmt::VarDecl {
                    value_type,
                    name,
                    position,
                } => {
                    let location =
                        self.arena
                            .declare_variable(scope_id, name, *value_type, *position)?;
                    if scope_id == 0 {
                        // a top-level variable, the host may bind a
                        // value to it before execution
                        self.program.add_global(name, *value_type, location.slot);
                    }
                }
                Stmt::Function(decl) => {
                    let body_scope =
                        self.arena
                            .create_scope(Some(scope_id), true, decl.position)?;
                    let param_types: Vec<ValueType> =
                        decl.params.iter().map(|(param_type, _)| *param_type).collect();
                    let function_id = self
                        .program
                        .add_function(&decl.name, param_types, decl.return_type, body_scope)
                        .map_err(|e| CompileError::new(&e.to_string(), decl.position))?;
                    self.arena
                        .declare_function(scope_id, &decl.name, function_id, decl.position)?;
                }
                _ => {}
            }
        }

        // pass 2: emit code for the statements
        for stmt in &block.statements {
            self.translate_statement(stmt)?;
        }

        // pass 3: translate the bodies of the declared functions
        for stmt in &block.statements {
            if let Stmt::Function(decl) = stmt {
                let function_id = self
                    .arena
                    .resolve_function(scope_id, &decl.name)
                    .expect("the function was declared in pass 1");
                let body_scope = self.program.function_by_id(function_id).scope_id;
                self.translate_function_body(
                    function_id,
                    body_scope,
                    &decl.params,
                    &decl.body,
                    decl.position,
                )?;
            }
        }

        Ok(())
    }

    fn translate_nested_block(&mut self, block: &Block, position: u32) -> Result<(), CompileError> {
        let parent = self.current_scope();
        let scope_id = self.arena.create_scope(Some(parent), false, position)?;

        self.ctx().current_scope = scope_id;
        self.translate_block_in_current_scope(block)?;
        self.ctx().current_scope = parent;
        Ok(())
    }

    // ---- statements ----

    fn translate_statement(&mut self, stmt: &Stmt) -> Result<(), CompileError> {
        match stmt {
            // handled in the declaration passes
            Stmt::VarDecl { .. } | Stmt::Function(_) => Ok(()),

            Stmt::Assign {
                name,
                op,
                value,
                position,
            } => self.translate_assignment(name, *op, value, *position),

            Stmt::If {
                condition,
                then_block,
                else_block,
                position,
            } => self.translate_if(condition, then_block, else_block.as_ref(), *position),

            Stmt::While {
                condition,
                body,
                position,
            } => self.translate_while(condition, body, *position),

            Stmt::For {
                variable,
                range,
                body,
                position,
            } => self.translate_for(variable, range, body, *position),

            Stmt::Return { value, position } => self.translate_return(value.as_ref(), *position),

            Stmt::Print { args, .. } => {
                for arg in args {
                    self.translate_expression(arg)?;
                    let opcode = match self.tos() {
                        ValueType::Int => Opcode::iprint,
                        ValueType::Double => Opcode::dprint,
                        ValueType::Str => Opcode::sprint,
                        ValueType::Void => {
                            return Err(CompileError::new(
                                "cannot print a void value",
                                arg.position(),
                            ));
                        }
                    };
                    self.code().write_opcode(opcode);
                }
                Ok(())
            }

            Stmt::Expression { expr } => {
                self.translate_expression(expr)?;
                // keep the stack balanced, a non-void result is unused
                if self.tos() != ValueType::Void {
                    self.code().write_opcode(Opcode::pop);
                }
                Ok(())
            }

            Stmt::Block(block) => self.translate_nested_block(block, 0),
        }
    }

    fn translate_assignment(
        &mut self,
        name: &str,
        op: AssignOp,
        value: &Expr,
        position: u32,
    ) -> Result<(), CompileError> {
        let location = self
            .arena
            .resolve_variable(self.current_scope(), name)
            .ok_or_else(|| {
                CompileError::new(&format!("unresolved variable '{}'", name), position)
            })?;

        match op {
            AssignOp::Assign => {
                self.translate_expression(value)?;
                self.coerce_tos(location.value_type, value.position())?;
                self.emit_store_var(location);
            }
            AssignOp::AddAssign | AssignOp::SubAssign => {
                // compound assignment exists for integer variables only
                if location.value_type != ValueType::Int {
                    return Err(CompileError::new(
                        "compound assignment needs an integer variable",
                        position,
                    ));
                }
                self.translate_expression(value)?;
                self.coerce_tos(ValueType::Int, value.position())?;
                self.emit_load_var(location);
                let opcode = if op == AssignOp::AddAssign {
                    Opcode::iadd
                } else {
                    Opcode::isub
                };
                self.code().write_opcode(opcode);
                self.emit_store_var(location);
            }
        }
        Ok(())
    }

    fn translate_if(
        &mut self,
        condition: &Expr,
        then_block: &Block,
        else_block: Option<&Block>,
        position: u32,
    ) -> Result<(), CompileError> {
        self.translate_expression(condition)?;
        self.require_int_condition(condition.position())?;

        let mut else_label = Label::new();
        self.code().write_opcode(Opcode::iload_0);
        self.code().write_branch(Opcode::ificmpe, &mut else_label);

        self.translate_nested_block(then_block, position)?;

        match else_block {
            Some(block) => {
                let mut end_label = Label::new();
                self.code().write_branch(Opcode::ja, &mut end_label);
                self.code().bind(&mut else_label);
                self.translate_nested_block(block, position)?;
                self.code().bind(&mut end_label);
            }
            None => {
                self.code().bind(&mut else_label);
            }
        }
        Ok(())
    }

    fn translate_while(
        &mut self,
        condition: &Expr,
        body: &Block,
        position: u32,
    ) -> Result<(), CompileError> {
        let mut head_label = Label::new();
        let mut exit_label = Label::new();

        self.code().bind(&mut head_label);
        self.translate_expression(condition)?;
        self.require_int_condition(condition.position())?;
        self.code().write_opcode(Opcode::iload_0);
        self.code().write_branch(Opcode::ificmpe, &mut exit_label);

        self.translate_nested_block(body, position)?;

        self.code().write_branch(Opcode::ja, &mut head_label);
        self.code().bind(&mut exit_label);
        Ok(())
    }

    fn translate_for(
        &mut self,
        variable: &str,
        range: &Expr,
        body: &Block,
        position: u32,
    ) -> Result<(), CompileError> {
        let Expr::Binary {
            op: BinaryOp::Range,
            left: lo,
            right: hi,
            ..
        } = range
        else {
            return Err(CompileError::new(
                "a for loop iterates over a range",
                range.position(),
            ));
        };

        // an undeclared loop variable is declared as an int in the
        // current scope
        let location = match self.arena.resolve_variable(self.current_scope(), variable) {
            Some(location) => location,
            None => {
                self.arena
                    .declare_variable(self.current_scope(), variable, ValueType::Int, position)?
            }
        };
        if location.value_type != ValueType::Int {
            return Err(CompileError::new(
                "the loop variable must be an integer",
                position,
            ));
        }

        self.translate_expression(lo)?;
        self.require_int_range_bound(lo.position())?;
        self.emit_store_var(location);

        let mut head_label = Label::new();
        let mut exit_label = Label::new();
        self.code().bind(&mut head_label);

        // exits when the variable exceeds the upper bound
        self.translate_expression(hi)?;
        self.require_int_range_bound(hi.position())?;
        self.emit_load_var(location);
        self.code().write_opcode(Opcode::icmp);
        self.code().write_opcode(Opcode::iload_1);
        self.code().write_branch(Opcode::ificmpe, &mut exit_label);

        self.translate_nested_block(body, position)?;

        self.emit_load_var(location);
        self.code().write_opcode(Opcode::iload_1);
        self.code().write_opcode(Opcode::iadd);
        self.emit_store_var(location);
        self.code().write_branch(Opcode::ja, &mut head_label);
        self.code().bind(&mut exit_label);
        Ok(())
    }

    fn translate_return(
        &mut self,
        value: Option<&Expr>,
        position: u32,
    ) -> Result<(), CompileError> {
        let return_type = self.contexts.last().unwrap().return_type;
        match (value, return_type) {
            (Some(expr), ValueType::Void) => {
                return Err(CompileError::new(
                    "cannot return a value from a void function",
                    expr.position(),
                ));
            }
            (Some(expr), target) => {
                self.translate_expression(expr)?;
                // return values convert between the numeric types only
                self.coerce_numeric_tos(target, expr.position())?;
            }
            (None, ValueType::Void) => {}
            (None, _) => {
                return Err(CompileError::new(
                    "this function must return a value",
                    position,
                ));
            }
        }
        self.code().write_opcode(Opcode::ret);
        Ok(())
    }

    // ---- expressions ----

    fn translate_expression(&mut self, expr: &Expr) -> Result<(), CompileError> {
        match expr {
            Expr::IntLiteral { value, .. } => {
                match value {
                    0 => self.code().write_opcode(Opcode::iload_0),
                    1 => self.code().write_opcode(Opcode::iload_1),
                    -1 => self.code().write_opcode(Opcode::iload_m1),
                    _ => {
                        self.code().write_opcode(Opcode::iload);
                        self.code().write_i64(*value);
                    }
                }
                self.set_tos(ValueType::Int);
            }
            Expr::DoubleLiteral { value, .. } => {
                if value.to_bits() == 0f64.to_bits() {
                    self.code().write_opcode(Opcode::dload_0);
                } else if value.to_bits() == 1f64.to_bits() {
                    self.code().write_opcode(Opcode::dload_1);
                } else if value.to_bits() == (-1f64).to_bits() {
                    self.code().write_opcode(Opcode::dload_m1);
                } else {
                    self.code().write_opcode(Opcode::dload);
                    self.code().write_f64(*value);
                }
                self.set_tos(ValueType::Double);
            }
            Expr::StringLiteral { value, position } => {
                if value.is_empty() {
                    self.code().write_opcode(Opcode::sload_0);
                } else {
                    let id = self
                        .program
                        .add_string_constant(value)
                        .map_err(|e| CompileError::new(&e.to_string(), *position))?;
                    self.code().write_opcode(Opcode::sload);
                    self.code().write_u16(id);
                }
                self.set_tos(ValueType::Str);
            }
            Expr::Load { name, position } => {
                let location = self
                    .arena
                    .resolve_variable(self.current_scope(), name)
                    .ok_or_else(|| {
                        CompileError::new(&format!("unresolved variable '{}'", name), *position)
                    })?;
                self.emit_load_var(location);
                self.set_tos(location.value_type);
            }
            Expr::Unary {
                op,
                operand,
                position,
            } => self.translate_unary(*op, operand, *position)?,
            Expr::Binary {
                op,
                left,
                right,
                position,
            } => self.translate_binary(*op, left, right, *position)?,
            Expr::Call {
                name,
                args,
                position,
            } => self.translate_call(name, args, *position)?,
        }
        Ok(())
    }

    fn translate_unary(
        &mut self,
        op: UnaryOp,
        operand: &Expr,
        position: u32,
    ) -> Result<(), CompileError> {
        self.translate_expression(operand)?;
        match op {
            UnaryOp::Neg => {
                let opcode = match self.tos() {
                    ValueType::Int => Opcode::ineg,
                    ValueType::Double => Opcode::dneg,
                    _ => {
                        return Err(CompileError::new(
                            "cannot negate a non-numeric value",
                            position,
                        ));
                    }
                };
                self.code().write_opcode(opcode);
            }
            UnaryOp::Not => {
                if self.tos() != ValueType::Int {
                    return Err(CompileError::new(
                        "'!' needs an integer operand",
                        position,
                    ));
                }
                self.emit_boolean_not();
            }
        }
        Ok(())
    }

    fn translate_binary(
        &mut self,
        op: BinaryOp,
        left: &Expr,
        right: &Expr,
        position: u32,
    ) -> Result<(), CompileError> {
        match op {
            BinaryOp::Range => Err(CompileError::new(
                "the range operator is only allowed in a for loop",
                position,
            )),

            // the integer-only group; `&&` and `||` do not
            // short-circuit, both operands are always evaluated
            BinaryOp::Or
            | BinaryOp::And
            | BinaryOp::BitOr
            | BinaryOp::BitXor
            | BinaryOp::BitAnd
            | BinaryOp::Mod => {
                self.translate_expression(right)?;
                self.require_int_operand(op, right.position())?;
                self.translate_expression(left)?;
                self.require_int_operand(op, left.position())?;

                let opcode = match op {
                    BinaryOp::Or | BinaryOp::BitOr => Opcode::iaor,
                    BinaryOp::And | BinaryOp::BitAnd => Opcode::iaand,
                    BinaryOp::BitXor => Opcode::iaxor,
                    BinaryOp::Mod => Opcode::imod,
                    _ => unreachable!(),
                };
                self.code().write_opcode(opcode);
                self.set_tos(ValueType::Int);
                Ok(())
            }

            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div => {
                let common = self.translate_numeric_operands(left, right)?;
                let opcode = match (op, common) {
                    (BinaryOp::Add, ValueType::Int) => Opcode::iadd,
                    (BinaryOp::Sub, ValueType::Int) => Opcode::isub,
                    (BinaryOp::Mul, ValueType::Int) => Opcode::imul,
                    (BinaryOp::Div, ValueType::Int) => Opcode::idiv,
                    (BinaryOp::Add, ValueType::Double) => Opcode::dadd,
                    (BinaryOp::Sub, ValueType::Double) => Opcode::dsub,
                    (BinaryOp::Mul, ValueType::Double) => Opcode::dmul,
                    (BinaryOp::Div, ValueType::Double) => Opcode::ddiv,
                    _ => unreachable!(),
                };
                self.code().write_opcode(opcode);
                self.set_tos(common);
                Ok(())
            }

            BinaryOp::Eq
            | BinaryOp::Ne
            | BinaryOp::Gt
            | BinaryOp::Ge
            | BinaryOp::Lt
            | BinaryOp::Le => {
                let common = self.translate_numeric_operands(left, right)?;
                let compare = if common == ValueType::Int {
                    Opcode::icmp
                } else {
                    Opcode::dcmp
                };
                self.code().write_opcode(compare);

                // the three-valued result is reduced to a boolean
                match op {
                    BinaryOp::Eq => self.emit_boolean_not(),
                    BinaryOp::Ne => {
                        // any non-zero value is truthy
                    }
                    BinaryOp::Gt => {
                        self.code().write_opcode(Opcode::iload_1);
                        self.code().write_opcode(Opcode::icmp);
                        self.emit_boolean_not();
                    }
                    BinaryOp::Ge => {
                        // the comparison value must stay the upper
                        // operand, so cmp.cmp(-1) yields 1 iff cmp >= 0
                        self.code().write_opcode(Opcode::iload_m1);
                        self.code().write_opcode(Opcode::swap);
                        self.code().write_opcode(Opcode::icmp);
                    }
                    BinaryOp::Lt => {
                        self.code().write_opcode(Opcode::iload_m1);
                        self.code().write_opcode(Opcode::icmp);
                        self.emit_boolean_not();
                    }
                    BinaryOp::Le => {
                        self.code().write_opcode(Opcode::iload_1);
                        self.code().write_opcode(Opcode::icmp);
                    }
                    _ => unreachable!(),
                }
                self.set_tos(ValueType::Int);
                Ok(())
            }
        }
    }

    /// evaluate the operands right-then-left, so the left operand
    /// ends up on top, convert strings through S2I and lift both
    /// sides to the common numeric type. an I2D targeting the deeper
    /// stack slot travels through SWAP.
    fn translate_numeric_operands(
        &mut self,
        left: &Expr,
        right: &Expr,
    ) -> Result<ValueType, CompileError> {
        self.translate_expression(right)?;
        let right_type = self.numeric_tos(right.position())?;

        self.translate_expression(left)?;
        let left_type = self.numeric_tos(left.position())?;

        let common = common_numeric_type(left_type, right_type)
            .expect("both operand types were checked to be numeric");

        if common == ValueType::Double {
            if left_type == ValueType::Int {
                self.code().write_opcode(Opcode::i2d);
            }
            if right_type == ValueType::Int {
                self.code().write_opcode(Opcode::swap);
                self.code().write_opcode(Opcode::i2d);
                self.code().write_opcode(Opcode::swap);
            }
        }
        Ok(common)
    }

    fn translate_call(
        &mut self,
        name: &str,
        args: &[Expr],
        position: u32,
    ) -> Result<(), CompileError> {
        let function_id = self
            .arena
            .resolve_function(self.current_scope(), name)
            .ok_or_else(|| {
                CompileError::new(&format!("unresolved function '{}'", name), position)
            })?;

        let function = self.program.function_by_id(function_id);
        let param_types = function.params.clone();
        let return_type = function.return_type;

        if args.len() != param_types.len() {
            return Err(CompileError::new(
                &format!(
                    "the function '{}' takes {} arguments, {} given",
                    name,
                    param_types.len(),
                    args.len()
                ),
                position,
            ));
        }

        // arguments are evaluated in reverse declared order, so
        // argument 0 is on top of the stack at entry
        for (arg, param_type) in args.iter().zip(param_types.iter()).rev() {
            self.translate_expression(arg)?;
            self.coerce_tos(*param_type, arg.position())?;
        }

        self.code().write_opcode(Opcode::call);
        self.code().write_u16(function_id);
        self.set_tos(return_type);
        Ok(())
    }

    // ---- type discipline ----

    /// convert the top of stack to `target` where the lattice allows:
    /// Int <-> Double directly, Str through S2I (and I2D for a Double
    /// target)
    fn coerce_tos(&mut self, target: ValueType, position: u32) -> Result<(), CompileError> {
        let tos = self.tos();
        match (tos, target) {
            (a, b) if a == b => {}
            (ValueType::Int, ValueType::Double) => {
                self.code().write_opcode(Opcode::i2d);
            }
            (ValueType::Double, ValueType::Int) => {
                self.code().write_opcode(Opcode::d2i);
            }
            (ValueType::Str, ValueType::Int) => {
                self.code().write_opcode(Opcode::s2i);
            }
            (ValueType::Str, ValueType::Double) => {
                self.code().write_opcode(Opcode::s2i);
                self.code().write_opcode(Opcode::i2d);
            }
            _ => {
                return Err(CompileError::new(
                    &format!(
                        "type mismatch: expected {}, found {}",
                        type_name(target),
                        type_name(tos)
                    ),
                    position,
                ));
            }
        }
        self.set_tos(target);
        Ok(())
    }

    /// the numeric-only variant, used for return values
    fn coerce_numeric_tos(&mut self, target: ValueType, position: u32) -> Result<(), CompileError> {
        let tos = self.tos();
        match (tos, target) {
            (a, b) if a == b => {}
            (ValueType::Int, ValueType::Double) => {
                self.code().write_opcode(Opcode::i2d);
            }
            (ValueType::Double, ValueType::Int) => {
                self.code().write_opcode(Opcode::d2i);
            }
            _ => {
                return Err(CompileError::new(
                    &format!(
                        "type mismatch: expected {}, found {}",
                        type_name(target),
                        type_name(tos)
                    ),
                    position,
                ));
            }
        }
        self.set_tos(target);
        Ok(())
    }

    /// a string TOS converts through S2I, a double or int TOS passes,
    /// everything else is an error. returns the resulting type.
    fn numeric_tos(&mut self, position: u32) -> Result<ValueType, CompileError> {
        match self.tos() {
            ValueType::Int => Ok(ValueType::Int),
            ValueType::Double => Ok(ValueType::Double),
            ValueType::Str => {
                self.code().write_opcode(Opcode::s2i);
                self.set_tos(ValueType::Int);
                Ok(ValueType::Int)
            }
            ValueType::Void => Err(CompileError::new(
                "a void expression has no value",
                position,
            )),
        }
    }

    fn require_int_condition(&mut self, position: u32) -> Result<(), CompileError> {
        if self.tos() != ValueType::Int {
            return Err(CompileError::new(
                "the condition must be an integer expression",
                position,
            ));
        }
        Ok(())
    }

    fn require_int_range_bound(&mut self, position: u32) -> Result<(), CompileError> {
        if self.tos() != ValueType::Int {
            return Err(CompileError::new(
                "the range bounds must be integer expressions",
                position,
            ));
        }
        Ok(())
    }

    fn require_int_operand(&mut self, op: BinaryOp, position: u32) -> Result<(), CompileError> {
        if self.tos() != ValueType::Int {
            return Err(CompileError::new(
                &format!("'{}' needs integer operands", operator_text(op)),
                position,
            ));
        }
        Ok(())
    }

    // ---- emission helpers ----

    fn emit_load_var(&mut self, location: VarLocation) {
        let function_scope_id = self.contexts.last().unwrap().function_scope_id;
        if location.scope_id == function_scope_id {
            if location.slot < 4 {
                let opcode = short_load_opcode(location.value_type, location.slot);
                self.code().write_opcode(opcode);
            } else {
                let opcode = match location.value_type {
                    ValueType::Int => Opcode::load_ivar,
                    ValueType::Double => Opcode::load_dvar,
                    ValueType::Str => Opcode::load_svar,
                    ValueType::Void => unreachable!("variables are never void"),
                };
                self.code().write_opcode(opcode);
                self.code().write_u16(location.slot);
            }
        } else {
            let opcode = match location.value_type {
                ValueType::Int => Opcode::load_ctx_ivar,
                ValueType::Double => Opcode::load_ctx_dvar,
                ValueType::Str => Opcode::load_ctx_svar,
                ValueType::Void => unreachable!("variables are never void"),
            };
            self.code().write_opcode(opcode);
            self.code().write_u16(location.scope_id);
            self.code().write_u16(location.slot);
        }
    }

    fn emit_store_var(&mut self, location: VarLocation) {
        let function_scope_id = self.contexts.last().unwrap().function_scope_id;
        if location.scope_id == function_scope_id {
            if location.slot < 4 {
                let opcode = short_store_opcode(location.value_type, location.slot);
                self.code().write_opcode(opcode);
            } else {
                let opcode = match location.value_type {
                    ValueType::Int => Opcode::store_ivar,
                    ValueType::Double => Opcode::store_dvar,
                    ValueType::Str => Opcode::store_svar,
                    ValueType::Void => unreachable!("variables are never void"),
                };
                self.code().write_opcode(opcode);
                self.code().write_u16(location.slot);
            }
        } else {
            let opcode = match location.value_type {
                ValueType::Int => Opcode::store_ctx_ivar,
                ValueType::Double => Opcode::store_ctx_dvar,
                ValueType::Str => Opcode::store_ctx_svar,
                ValueType::Void => unreachable!("variables are never void"),
            };
            self.code().write_opcode(opcode);
            self.code().write_u16(location.scope_id);
            self.code().write_u16(location.slot);
        }
    }

    /// replace the integer on top of the stack with 1 when it is 0,
    /// with 0 otherwise
    fn emit_boolean_not(&mut self) {
        let mut set_one = Label::new();
        let mut finish = Label::new();

        self.code().write_opcode(Opcode::iload_0);
        self.code().write_branch(Opcode::ificmpe, &mut set_one);
        self.code().write_opcode(Opcode::iload_0);
        self.code().write_branch(Opcode::ja, &mut finish);
        self.code().bind(&mut set_one);
        self.code().write_opcode(Opcode::iload_1);
        self.code().bind(&mut finish);
    }
}

fn block_ends_with_return(block: &Block) -> bool {
    matches!(block.statements.last(), Some(Stmt::Return { .. }))
}

fn short_load_opcode(value_type: ValueType, slot: u16) -> Opcode {
    match (value_type, slot) {
        (ValueType::Int, 0) => Opcode::load_ivar_0,
        (ValueType::Int, 1) => Opcode::load_ivar_1,
        (ValueType::Int, 2) => Opcode::load_ivar_2,
        (ValueType::Int, 3) => Opcode::load_ivar_3,
        (ValueType::Double, 0) => Opcode::load_dvar_0,
        (ValueType::Double, 1) => Opcode::load_dvar_1,
        (ValueType::Double, 2) => Opcode::load_dvar_2,
        (ValueType::Double, 3) => Opcode::load_dvar_3,
        (ValueType::Str, 0) => Opcode::load_svar_0,
        (ValueType::Str, 1) => Opcode::load_svar_1,
        (ValueType::Str, 2) => Opcode::load_svar_2,
        (ValueType::Str, 3) => Opcode::load_svar_3,
        _ => unreachable!("the caller checked the type and the slot"),
    }
}

fn short_store_opcode(value_type: ValueType, slot: u16) -> Opcode {
    match (value_type, slot) {
        (ValueType::Int, 0) => Opcode::store_ivar_0,
        (ValueType::Int, 1) => Opcode::store_ivar_1,
        (ValueType::Int, 2) => Opcode::store_ivar_2,
        (ValueType::Int, 3) => Opcode::store_ivar_3,
        (ValueType::Double, 0) => Opcode::store_dvar_0,
        (ValueType::Double, 1) => Opcode::store_dvar_1,
        (ValueType::Double, 2) => Opcode::store_dvar_2,
        (ValueType::Double, 3) => Opcode::store_dvar_3,
        (ValueType::Str, 0) => Opcode::store_svar_0,
        (ValueType::Str, 1) => Opcode::store_svar_1,
        (ValueType::Str, 2) => Opcode::store_svar_2,
        (ValueType::Str, 3) => Opcode::store_svar_3,
        _ => unreachable!("the caller checked the type and the slot"),
    }
}

fn type_name(value_type: ValueType) -> &'static str {
    match value_type {
        ValueType::Void => "void",
        ValueType::Int => "int",
        ValueType::Double => "double",
        ValueType::Str => "string",
    }
}

fn operator_text(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Or => "||",
        BinaryOp::And => "&&",
        BinaryOp::BitOr => "|",
        BinaryOp::BitXor => "^",
        BinaryOp::BitAnd => "&",
        BinaryOp::Mod => "%",
        _ => "?",
    }
}
