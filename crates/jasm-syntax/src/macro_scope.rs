//! Macros defined so far in the current parse.
//!
//! The scope maps a macro name to its parameter count. It exists only to
//! improve diagnostics (arity warnings on calls to macros defined earlier in
//! the same file); calls to unknown names are always accepted.

use std::collections::BTreeMap;

/// Name → arity table, created and discarded per parse call.
#[derive(Debug, Clone, Default)]
pub struct MacroScope {
    macros: BTreeMap<String, usize>,
}

impl MacroScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a macro. A redefinition replaces the earlier entry and
    /// returns its arity.
    pub fn define(&mut self, name: &str, param_count: usize) -> Option<usize> {
        self.macros.insert(name.to_string(), param_count)
    }

    /// Arity of a macro defined earlier, if any.
    pub fn lookup(&self, name: &str) -> Option<usize> {
        self.macros.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.macros.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.macros.len()
    }

    pub fn is_empty(&self) -> bool {
        self.macros.is_empty()
    }

    /// Hand the table back to the caller, ordered by name.
    pub fn into_table(self) -> BTreeMap<String, usize> {
        self.macros
    }
}
