use std::collections::HashMap;

use super::symbol_table::SymbolTable;

/// Lexical scopes as a stack of name to symbol-row-index maps, outermost
/// first. Lookup scans from the innermost scope outward and the first hit
/// wins; declarations only ever write to the innermost scope.
///
/// One empty outer scope exists from construction so that top-level
/// declarations are legal without an explicit scope open.
#[derive(Debug)]
pub struct ScopeStack {
    scopes: Vec<HashMap<String, usize>>,
}

impl ScopeStack {
    pub fn new() -> Self {
        ScopeStack {
            scopes: vec![HashMap::new()],
        }
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    /// Open a new innermost scope.
    pub fn push_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    /// Close the innermost scope, tombstoning every symbol table row whose
    /// index appears in it. The outer scope cannot be popped.
    /// @return: false if only the outer scope remains.
    pub fn pop_scope(&mut self, symbol_table: &mut SymbolTable) -> bool {
        if self.scopes.len() <= 1 {
            return false;
        }
        let scope = self.scopes.pop().unwrap();
        for row_index in scope.values() {
            symbol_table.remove_row(*row_index);
        }
        true
    }

    /// Record a name in the innermost scope.
    /// @return: false if the name is already declared in that scope.
    pub fn declare(&mut self, name: &str, row_index: usize) -> bool {
        let scope = self.scopes.last_mut().unwrap();
        if scope.contains_key(name) {
            return false;
        }
        scope.insert(String::from(name), row_index);
        true
    }

    /// Innermost-outward lookup.
    pub fn resolve(&self, name: &str) -> Option<usize> {
        for scope in self.scopes.iter().rev() {
            if let Some(row_index) = scope.get(name) {
                return Some(*row_index);
            }
        }
        None
    }

    /// Whether the name is declared in the innermost scope only.
    pub fn declared_in_current_scope(&self, name: &str) -> bool {
        self.scopes.last().unwrap().contains_key(name)
    }
}
