//! Type Registry - short-name and interface indexes kept beside the graph
//!
//! Both indexes are derived from the node set and rebuilt wholesale with the graph. They hold
//! fully-qualified names only; node payloads stay in the graph arena.

use crate::domain::descriptor::strip_generic;
use std::collections::{BTreeMap, BTreeSet};

/// Outcome of resolving a symbolic type reference.
///
/// `Miss` is the normal result for external/framework types and is not an error; callers
/// decide whether to log it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// One or more fully-qualified names sharing the short name, sorted.
    Candidates(Vec<String>),
    Miss,
}

impl Resolution {
    fn from_set(set: Option<&BTreeSet<String>>) -> Self {
        match set {
            Some(names) if !names.is_empty() => Resolution::Candidates(names.iter().cloned().collect()),
            _ => Resolution::Miss,
        }
    }

    pub fn candidates(&self) -> &[String] {
        match self {
            Resolution::Candidates(names) => names,
            Resolution::Miss => &[],
        }
    }

    pub fn into_candidates(self) -> Vec<String> {
        match self {
            Resolution::Candidates(names) => names,
            Resolution::Miss => Vec::new(),
        }
    }

    pub fn is_miss(&self) -> bool {
        matches!(self, Resolution::Miss)
    }

    pub fn is_ambiguous(&self) -> bool {
        self.candidates().len() > 1
    }

    /// Narrows the candidates to those under `hint`'s namespace. When nothing matches the
    /// hint the candidate set is returned unchanged.
    pub fn scoped(self, hint: &ScopeHint) -> Self {
        match self {
            Resolution::Candidates(names) => {
                let preferred: Vec<String> = names
                    .iter()
                    .filter(|name| hint.admits(name))
                    .cloned()
                    .collect();
                if preferred.is_empty() {
                    Resolution::Candidates(names)
                } else {
                    Resolution::Candidates(preferred)
                }
            }
            Resolution::Miss => Resolution::Miss,
        }
    }
}

/// Caller-supplied context that prefers candidates from one namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeHint {
    pub namespace: String,
}

impl ScopeHint {
    pub fn namespace(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }

    fn admits(&self, full_name: &str) -> bool {
        full_name
            .strip_prefix(self.namespace.as_str())
            .is_some_and(|rest| rest.starts_with('.'))
    }
}

/// Short-name index and interface → implementation map.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TypeRegistry {
    short_names: BTreeMap<String, BTreeSet<String>>,
    implementations: BTreeMap<String, BTreeSet<String>>,
}

impl TypeRegistry {
    /// Create a new empty type registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a class under its short name. Registering the same pair twice is a no-op.
    pub fn register(&mut self, short_name: &str, full_name: &str) {
        self.short_names
            .entry(short_name.to_string())
            .or_default()
            .insert(full_name.to_string());
    }

    /// Record that `implementation` implements the interface `interface` (both fully qualified).
    pub fn register_implementation(&mut self, interface: &str, implementation: &str) {
        self.implementations
            .entry(interface.to_string())
            .or_default()
            .insert(implementation.to_string());
    }

    /// Every fully-qualified name sharing the generic-stripped short name.
    pub fn resolve(&self, name: &str) -> Resolution {
        Resolution::from_set(self.short_names.get(strip_generic(name)))
    }

    /// Fully-qualified names of the classes implementing any interface resolved from `name`.
    pub fn implementations_of(&self, name: &str) -> Vec<String> {
        let mut result = BTreeSet::new();
        for interface in self.resolve(name).candidates() {
            if let Some(impls) = self.implementations.get(interface) {
                result.extend(impls.iter().cloned());
            }
        }
        result.into_iter().collect()
    }

    pub fn short_name_index(&self) -> &BTreeMap<String, BTreeSet<String>> {
        &self.short_names
    }

    pub fn interface_map(&self) -> &BTreeMap<String, BTreeSet<String>> {
        &self.implementations
    }

    /// Get count of registered short names
    pub fn len(&self) -> usize {
        self.short_names.len()
    }

    /// Check if registry is empty
    pub fn is_empty(&self) -> bool {
        self.short_names.is_empty()
    }
}
