//! Per-session schema registry
//!
//! Holds at most one [`Prototype`] per table name. Prototypes are created
//! on first reference and shared afterwards.

use std::collections::HashMap;
use std::sync::Arc;

use sqlrule_plan::Prototype;
use tracing::{debug, trace};

#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    namespace: String,
    prototypes: HashMap<String, Arc<Prototype>>,
}

impl SchemaRegistry {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            prototypes: HashMap::new(),
        }
    }

    /// Prototype for `table`, creating it on first use
    pub fn get_or_create(&mut self, table: &str) -> Arc<Prototype> {
        if let Some(prototype) = self.prototypes.get(table) {
            trace!(table, "reusing prototype");
            return Arc::clone(prototype);
        }

        debug!(table, namespace = %self.namespace, "creating prototype");
        let prototype = Arc::new(Prototype::new(table, self.namespace.clone()));
        self.prototypes.insert(table.to_string(), Arc::clone(&prototype));
        prototype
    }

    pub fn get(&self, table: &str) -> Option<&Arc<Prototype>> {
        self.prototypes.get(table)
    }

    pub fn contains(&self, table: &str) -> bool {
        self.prototypes.contains_key(table)
    }

    /// Package the prototypes are declared in
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn len(&self) -> usize {
        self.prototypes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prototypes.is_empty()
    }

    pub fn clear(&mut self) {
        self.prototypes.clear();
    }
}
