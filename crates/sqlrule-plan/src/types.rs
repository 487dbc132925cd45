//! Variables and schema descriptors referenced by query plans

use serde::{Deserialize, Serialize};
use std::fmt;

/// Index of a variable inside its query's [`Variables`] arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VarId(pub usize);

impl fmt::Display for VarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum VariableKind {
    /// Bound to a fact of the given prototype by a pattern
    Fact { prototype: String },
    /// Bound to the key of a group
    GroupKey,
    /// Bound to an accumulator result
    Accumulate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    #[serde(flatten)]
    pub kind: VariableKind,
}

/// Arena owning every variable declared by one query
///
/// Patterns, constraints and aggregations refer to variables by [`VarId`],
/// so a variable is declared once and shared by every consumer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Variables(Vec<Variable>);

impl Variables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare(&mut self, name: impl Into<String>, kind: VariableKind) -> VarId {
        let id = VarId(self.0.len());
        self.0.push(Variable {
            name: name.into(),
            kind,
        });
        id
    }

    /// Declare a variable named `base`, or `base_<n>` with the smallest
    /// free `n` when `base` is already taken
    pub fn declare_unique(&mut self, base: &str, kind: VariableKind) -> VarId {
        let name = self.unique_name(base);
        self.declare(name, kind)
    }

    pub fn unique_name(&self, base: &str) -> String {
        if !self.contains_name(base) {
            return base.to_string();
        }
        (1..)
            .map(|n| format!("{}_{}", base, n))
            .find(|candidate| !self.contains_name(candidate))
            .unwrap_or_else(|| base.to_string())
    }

    pub fn contains_name(&self, name: &str) -> bool {
        self.0.iter().any(|v| v.name == name)
    }

    pub fn get(&self, id: VarId) -> Option<&Variable> {
        self.0.get(id.0)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (VarId, &Variable)> {
        self.0.iter().enumerate().map(|(i, v)| (VarId(i), v))
    }
}

/// Schema descriptor for one table
///
/// Facts carry no static type; a prototype names the table the fact
/// belongs to and the package it is declared in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prototype {
    pub name: String,
    pub namespace: String,
}

impl Prototype {
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
        }
    }

    /// Fully qualified name, e.g. `sqlrule.materialized.orders`
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.namespace, self.name)
    }
}
