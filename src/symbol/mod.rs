//! Symbol Resolution
//!
//! Raw return addresses collected from the heap profile are resolved to
//! function names by POSTing them to the profiler's `/symbol` endpoint in
//! fixed-size batches.

mod response;
mod symbolizer;

pub use response::{parse_symbol_response, SymbolResponse};
pub use symbolizer::{SymbolizeStats, Symbolizer, DEFAULT_BATCH_SIZE};

use std::collections::HashMap;

/// Address to symbol-name mapping
///
/// Addresses keep the order in which they were first inserted so that
/// batching is deterministic. An address whose name was never resolved is
/// displayed as the address itself.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    order: Vec<String>,
    names: HashMap<String, String>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an unresolved address. Returns false if it was already present.
    pub fn insert(&mut self, address: &str) -> bool {
        if self.names.contains_key(address) {
            return false;
        }
        self.order.push(address.to_string());
        self.names.insert(address.to_string(), String::new());
        true
    }

    /// Record the resolved name of a known address.
    ///
    /// Returns false, leaving the table untouched, for addresses that were
    /// never inserted.
    pub fn resolve(&mut self, address: &str, name: impl Into<String>) -> bool {
        match self.names.get_mut(address) {
            Some(slot) => {
                *slot = name.into();
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, address: &str) -> bool {
        self.names.contains_key(address)
    }

    /// Resolved name, `None` if unknown or still unresolved
    pub fn name(&self, address: &str) -> Option<&str> {
        self.names
            .get(address)
            .map(String::as_str)
            .filter(|name| !name.is_empty())
    }

    /// Name to show for an address: the symbol if resolved, else the address
    pub fn display_name<'a>(&'a self, address: &'a str) -> &'a str {
        self.name(address).unwrap_or(address)
    }

    /// Addresses in first-seen order
    pub fn addresses(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Number of addresses that have a non-empty name
    pub fn resolved_count(&self) -> usize {
        self.names.values().filter(|name| !name.is_empty()).count()
    }
}

#[cfg(test)]
mod tests;
