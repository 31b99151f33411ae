//! Scope resolution
//!
//! Variables are looked up by `(name, scope)` first, then by
//! `(name, "global")`. The run-wide list is append-only and shared between
//! concurrently evaluated commands, so it sits behind a lock.

use crate::config::{Variable, GLOBAL_SCOPE};
use crate::error::{ScopeError, ScopeResult};
use std::sync::{PoisonError, RwLock};

/// Empty scope means global
pub fn normalize_scope(scope: &str) -> &str {
    if scope.is_empty() {
        GLOBAL_SCOPE
    } else {
        scope
    }
}

/// Resolve a variable in a slice, in insertion order
///
/// Double quotes in `name` are ignored, so `"&name"` tokens resolve too.
pub fn resolve<'a>(variables: &'a [Variable], name: &str, scope: &str) -> ScopeResult<&'a Variable> {
    let name = name.replace('"', "");
    let scope = normalize_scope(scope);

    variables
        .iter()
        .find(|v| v.name == name && v.scope == scope)
        .or_else(|| {
            variables
                .iter()
                .find(|v| v.name == name && v.scope == GLOBAL_SCOPE)
        })
        .ok_or(ScopeError::VariableNotFound(name))
}

/// Run-wide, append-only variable list
#[derive(Debug, Default)]
pub struct VariableStore {
    variables: RwLock<Vec<Variable>>,
}

impl VariableStore {
    pub fn new(variables: Vec<Variable>) -> Self {
        VariableStore {
            variables: RwLock::new(variables),
        }
    }

    /// Resolve `(name, scope)`, falling back to the global scope
    pub fn resolve(&self, name: &str, scope: &str) -> ScopeResult<Variable> {
        let variables = self.variables.read().unwrap_or_else(PoisonError::into_inner);
        resolve(&variables, name, scope).cloned()
    }

    /// Append variables; existing records are never replaced
    pub fn extend(&self, new_variables: impl IntoIterator<Item = Variable>) {
        let mut variables = self.variables.write().unwrap_or_else(PoisonError::into_inner);
        variables.extend(new_variables);
    }

    pub fn len(&self) -> usize {
        self.variables
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Variables visible to one evaluation
///
/// Prerequisite outputs land in a local overlay, consulted before the
/// shared store and merged into it once the evaluation is done.
#[derive(Debug)]
pub struct Bindings<'a> {
    store: &'a VariableStore,
    scope: String,
    local: Vec<Variable>,
}

impl<'a> Bindings<'a> {
    pub fn new(store: &'a VariableStore, scope: &str) -> Self {
        Bindings {
            store,
            scope: normalize_scope(scope).to_string(),
            local: Vec::new(),
        }
    }

    /// Add a variable scoped to this evaluation
    pub fn bind(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let variable = Variable::new(name, value, self.scope.clone());
        self.local.push(variable);
    }

    /// Resolve a name in this evaluation's scope
    pub fn resolve(&self, name: &str) -> ScopeResult<Variable> {
        match resolve(&self.local, name, &self.scope) {
            Ok(variable) if variable.scope == self.scope => Ok(variable.clone()),
            _ => self.store.resolve(name, &self.scope),
        }
    }

    /// Merge the overlay into the shared store
    pub fn commit(self) {
        if !self.local.is_empty() {
            log::trace!("merging {} variables from '{}'", self.local.len(), self.scope);
            self.store.extend(self.local);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_missing() {
        let result = resolve(&[], "x", "build");
        assert_eq!(result, Err(ScopeError::VariableNotFound("x".to_string())));
    }

    #[test]
    fn test_resolve_exact_scope() {
        let vars = vec![Variable::global("x", "global"), Variable::new("x", "local", "build")];
        assert_eq!(resolve(&vars, "x", "build").unwrap().value, "local");
    }

    #[test]
    fn test_resolve_falls_back_to_global() {
        let vars = vec![Variable::new("x", "local", "build"), Variable::global("x", "global")];
        assert_eq!(resolve(&vars, "x", "test").unwrap().value, "global");
    }

    #[test]
    fn test_resolve_other_scope_without_global() {
        let vars = vec![Variable::new("x", "local", "build")];
        assert!(resolve(&vars, "x", "test").is_err());
    }

    #[test]
    fn test_empty_scope_is_global() {
        let vars = vec![Variable::global("x", "1")];
        assert_eq!(resolve(&vars, "x", "").unwrap().value, "1");
    }

    #[test]
    fn test_first_match_wins() {
        let vars = vec![Variable::global("x", "first"), Variable::global("x", "second")];
        assert_eq!(resolve(&vars, "x", "global").unwrap().value, "first");
    }

    #[test]
    fn test_quotes_are_ignored() {
        let vars = vec![Variable::global("name", "value")];
        assert_eq!(resolve(&vars, "name\"", "global").unwrap().value, "value");
    }

    #[test]
    fn test_store_insert_then_resolve() {
        let store = VariableStore::default();
        assert!(store.resolve("x", "build").is_err());

        store.extend(vec![Variable::new("x", "v", "build")]);
        assert_eq!(store.resolve("x", "build").unwrap().value, "v");
        assert!(store.resolve("x", "test").is_err());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_bindings_overlay_shadows_store() {
        let store = VariableStore::new(vec![
            Variable::new("b.0", "stale", "a"),
            Variable::global("g", "global"),
        ]);
        let mut bindings = Bindings::new(&store, "a");
        bindings.bind("b.0", "fresh");

        assert_eq!(bindings.resolve("b.0").unwrap().value, "fresh");
        assert_eq!(bindings.resolve("g").unwrap().value, "global");

        bindings.commit();
        assert_eq!(store.len(), 3);
    }
}
