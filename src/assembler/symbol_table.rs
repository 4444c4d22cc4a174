/*
Copyright 2025 Connor Nolan

Licensed under the Apache License, Version 2.0 (the "License");
you may not use this file except in compliance with the License.
You may obtain a copy of the License at

    http://www.apache.org/licenses/LICENSE-2.0

Unless required by applicable law or agreed to in writing, software
distributed under the License is distributed on an "AS IS" BASIS,
WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
See the License for the specific language governing permissions and
limitations under the License.
*/

use super::SourceLoc;
use crate::ast::Expr;
use std::collections::HashMap;

/// An EQU expression that could not be evaluated when it was read. It is
/// retried lazily on lookup and once more at the end of assembly.
#[derive(Debug, Clone)]
pub struct PendingExpr {
    pub expr: Expr,
    pub text: String,
    /// scope depth the definition was captured at
    pub level: usize,
    /// `$` value at the defining line
    pub baseaddr: i32,
    pub loc: SourceLoc,
    pub done: bool,
}

#[derive(Debug, Clone)]
pub struct LabelDef {
    pub value: i32,
    pub valid: bool,
    /// guards reentrant evaluation of mutually recursive EQUs
    pub busy: bool,
    pub pending: Option<PendingExpr>,
}

impl LabelDef {
    pub fn at_address(value: i32) -> Self {
        Self {
            value,
            valid: true,
            busy: false,
            pending: None,
        }
    }
}

/// Global labels plus one map of `.`-labels per source frame. Lookups walk
/// the scope stack inward-out, then the globals. The global insertion order
/// is kept for the label file.
#[derive(Default)]
pub struct SymbolTable {
    globals: HashMap<String, LabelDef>,
    order: Vec<String>,
    scopes: Vec<HashMap<String, LabelDef>>,
}

impl SymbolTable {
    pub fn push_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    pub fn pop_scope(&mut self) -> HashMap<String, LabelDef> {
        self.scopes.pop().unwrap_or_default()
    }

    pub fn find(&mut self, name: &str, level: usize) -> Option<&mut LabelDef> {
        if !self.scopes.is_empty() {
            let top = level.min(self.scopes.len() - 1);
            for s in (0..=top).rev() {
                if self.scopes[s].contains_key(name) {
                    return self.scopes[s].get_mut(name);
                }
            }
        }
        self.globals.get_mut(name)
    }

    pub fn exists(&self, name: &str, level: usize) -> bool {
        if !self.scopes.is_empty() {
            let top = level.min(self.scopes.len() - 1);
            for s in (0..=top).rev() {
                if self.scopes[s].contains_key(name) {
                    return true;
                }
            }
        }
        self.globals.contains_key(name)
    }

    /// Insert a definition: `.`-names land in the innermost scope, others in
    /// the global table. The caller has already rejected duplicates.
    pub fn define(&mut self, name: &str, def: LabelDef) {
        if name.starts_with('.') {
            if let Some(scope) = self.scopes.last_mut() {
                scope.insert(name.to_string(), def);
            }
        } else if self.globals.insert(name.to_string(), def).is_none() {
            self.order.push(name.to_string());
        }
    }

    /// Fetch the definition a label statement just created, for EQU/MACRO.
    pub fn slot_mut(&mut self, scoped: bool, name: &str) -> Option<&mut LabelDef> {
        if scoped {
            self.scopes.last_mut()?.get_mut(name)
        } else {
            self.globals.get_mut(name)
        }
    }

    pub fn remove(&mut self, scoped: bool, name: &str) -> Option<LabelDef> {
        if scoped {
            self.scopes.last_mut()?.remove(name)
        } else {
            let removed = self.globals.remove(name);
            if removed.is_some() {
                self.order.retain(|n| n != name);
            }
            removed
        }
    }

    pub fn global_names(&self) -> &[String] {
        &self.order
    }

    pub fn scope_label_names(&self) -> Vec<String> {
        self.scopes
            .last()
            .map(|s| s.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn global(&self, name: &str) -> Option<&LabelDef> {
        self.globals.get(name)
    }

    /// Begin the final computation of a deferred global EQU: marks it busy
    /// and hands out a copy of its expression.
    pub fn take_pending_if_undone(&mut self, name: &str) -> Option<PendingExpr> {
        let def = self.globals.get_mut(name)?;
        match &def.pending {
            Some(p) if !p.done => {
                def.busy = true;
                Some(p.clone())
            }
            _ => None,
        }
    }

    pub fn store_computed(&mut self, name: &str, value: i32, valid: bool) {
        if let Some(def) = self.globals.get_mut(name) {
            def.busy = false;
            if valid {
                def.value = value;
                def.valid = true;
                if let Some(p) = def.pending.as_mut() {
                    p.done = true;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_shadowing() {
        let mut table = SymbolTable::default();
        table.push_scope();
        table.define("global", LabelDef::at_address(1));
        table.define(".local", LabelDef::at_address(2));
        table.push_scope();
        table.define(".local", LabelDef::at_address(3));

        // the inner scope wins at level 1
        assert_eq!(table.find(".local", 1).unwrap().value, 3);
        // at level 0 only the outer scope is visible
        assert_eq!(table.find(".local", 0).unwrap().value, 2);
        // globals resolve from anywhere
        assert_eq!(table.find("global", 1).unwrap().value, 1);

        let popped = table.pop_scope();
        assert!(popped.contains_key(".local"));
        assert_eq!(table.find(".local", 1).unwrap().value, 2);
    }

    #[test]
    fn test_global_order_preserved() {
        let mut table = SymbolTable::default();
        table.push_scope();
        table.define("zz", LabelDef::at_address(1));
        table.define("aa", LabelDef::at_address(2));
        table.define(".dot", LabelDef::at_address(3));
        assert_eq!(table.global_names(), &["zz".to_string(), "aa".to_string()]);

        table.remove(false, "zz");
        assert_eq!(table.global_names(), &["aa".to_string()]);
    }
}
