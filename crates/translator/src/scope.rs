// Copyright (c) 2023 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions,
// more details in file LICENSE and CONTRIBUTING.

// the lexical scope tree.
//
// scopes are kept in an arena indexed by their 16-bit id, the upward
// links are parent ids rather than pointers. every function body and
// every nested block gets a scope; slot indices are drawn from the
// enclosing function body's allocator, so the (scope_id, slot) pair
// that names a variable always carries the id of the owning
// *function's* scope and the interpreter can resolve it against the
// call-frame stack.

use std::collections::HashMap;

use mathvm_types::{CompileError, ValueType};
use tracing::trace;

const ID_MAX: usize = 0xffff;

/// the resolved storage site of a variable
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct VarLocation {
    /// the id of the owning function's body scope
    pub scope_id: u16,
    pub slot: u16,
    pub value_type: ValueType,
}

struct ScopeRecord {
    parent: Option<u16>,

    /// the id of the nearest enclosing function-body scope,
    /// the scope's own id when it is a function body itself
    function_scope_id: u16,

    variables: HashMap<String, VarLocation>,
    functions: HashMap<String, u16>,

    /// the slot allocator, used on function-body scopes only
    next_slot: usize,
}

pub struct ScopeArena {
    scopes: Vec<ScopeRecord>,
}

impl ScopeArena {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self { scopes: Vec::new() }
    }

    /// create a scope and return its id. the root scope (the entry
    /// function's body) has id 0 and no parent.
    pub fn create_scope(
        &mut self,
        parent: Option<u16>,
        is_function_body: bool,
        position: u32,
    ) -> Result<u16, CompileError> {
        if self.scopes.len() >= ID_MAX {
            return Err(CompileError::new("too many scopes", position));
        }

        let id = self.scopes.len() as u16;
        let function_scope_id = if is_function_body {
            id
        } else {
            let parent = parent.expect("a block scope always has a parent");
            self.scopes[parent as usize].function_scope_id
        };

        trace!(id, ?parent, is_function_body, "created scope");

        self.scopes.push(ScopeRecord {
            parent,
            function_scope_id,
            variables: HashMap::new(),
            functions: HashMap::new(),
            next_slot: 0,
        });
        Ok(id)
    }

    /// declare a variable, allocating the next slot of the enclosing
    /// function
    pub fn declare_variable(
        &mut self,
        scope_id: u16,
        name: &str,
        value_type: ValueType,
        position: u32,
    ) -> Result<VarLocation, CompileError> {
        if self.scopes[scope_id as usize].variables.contains_key(name) {
            return Err(CompileError::new(
                &format!("the variable '{}' is already declared in this scope", name),
                position,
            ));
        }

        let function_scope_id = self.scopes[scope_id as usize].function_scope_id;
        let function_scope = &mut self.scopes[function_scope_id as usize];
        if function_scope.next_slot >= ID_MAX {
            return Err(CompileError::new("too many variables in one scope", position));
        }
        let slot = function_scope.next_slot as u16;
        function_scope.next_slot += 1;

        let location = VarLocation {
            scope_id: function_scope_id,
            slot,
            value_type,
        };

        trace!(name, scope_id, slot, "declared variable");

        self.scopes[scope_id as usize]
            .variables
            .insert(name.to_owned(), location);
        Ok(location)
    }

    /// innermost-first variable lookup along the parent chain
    pub fn resolve_variable(&self, scope_id: u16, name: &str) -> Option<VarLocation> {
        let mut current = Some(scope_id);
        while let Some(id) = current {
            let scope = &self.scopes[id as usize];
            if let Some(&location) = scope.variables.get(name) {
                return Some(location);
            }
            current = scope.parent;
        }
        None
    }

    pub fn declare_function(
        &mut self,
        scope_id: u16,
        name: &str,
        function_id: u16,
        position: u32,
    ) -> Result<(), CompileError> {
        let scope = &mut self.scopes[scope_id as usize];
        if scope.functions.contains_key(name) {
            return Err(CompileError::new(
                &format!("the function '{}' is already declared in this scope", name),
                position,
            ));
        }
        scope.functions.insert(name.to_owned(), function_id);
        Ok(())
    }

    /// innermost-first function lookup along the parent chain
    pub fn resolve_function(&self, scope_id: u16, name: &str) -> Option<u16> {
        let mut current = Some(scope_id);
        while let Some(id) = current {
            let scope = &self.scopes[id as usize];
            if let Some(&function_id) = scope.functions.get(name) {
                return Some(function_id);
            }
            current = scope.parent;
        }
        None
    }

    /// the number of slots a frame of this function needs,
    /// the parameters included
    pub fn slot_count(&self, function_scope_id: u16) -> u16 {
        self.scopes[function_scope_id as usize].next_slot as u16
    }
}
