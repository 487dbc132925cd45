//! sqlrule query plans
//!
//! A [`QueryDescriptor`] is the engine-agnostic output of translating a SQL
//! query: an ordered body of fact patterns, joined by equality constraints,
//! optionally wrapped by a COUNT aggregation. It can be consumed directly
//! as typed values (or their JSON form), or rendered to rule source text
//! with [`rule_source::render`]. Both forms come from the same value.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use thiserror::Error;

pub mod rule_source;
mod types;
pub use types::*;

#[derive(Debug, Error)]
pub enum PlanError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unknown variable: {0}")]
    UnknownVariable(VarId),

    #[error("Invalid query body: {0}")]
    InvalidShape(String),

    #[error("Failed to render rule source: {0}")]
    Fmt(#[from] std::fmt::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConstraintOp {
    Equal,
}

impl ConstraintOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            ConstraintOp::Equal => "==",
        }
    }
}

/// Equality between a field of the constrained pattern and a field of a
/// variable bound by an earlier pattern
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinConstraint {
    pub field: String,
    pub operator: ConstraintOp,
    pub other_variable: VarId,
    pub other_field: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Constraint {
    /// `table == "<name>"`
    Table { table: String },
    Join(JoinConstraint),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pattern {
    pub variable: VarId,
    pub table: String,
    pub constraints: Vec<Constraint>,
}

impl Pattern {
    /// New pattern carrying its table constraint
    pub fn new(variable: VarId, table: impl Into<String>) -> Self {
        let table = table.into();
        Self {
            variable,
            constraints: vec![Constraint::Table {
                table: table.clone(),
            }],
            table,
        }
    }

    pub fn add_constraint(&mut self, constraint: Constraint) {
        self.constraints.push(constraint);
    }

    pub fn join_constraints(&self) -> impl Iterator<Item = &JoinConstraint> {
        self.constraints.iter().filter_map(|c| match c {
            Constraint::Join(join) => Some(join),
            Constraint::Table { .. } => None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Accumulator {
    Count,
}

impl Accumulator {
    pub fn function_name(&self) -> &'static str {
        match self {
            Accumulator::Count => "count",
        }
    }
}

/// Grouping + accumulation layered over the matches of one pattern
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Aggregation {
    pub source: Pattern,
    pub group_key_field: String,
    pub group_key_variable: VarId,
    pub accumulator: Accumulator,
    pub result_variable: VarId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "item")]
pub enum BodyItem {
    Pattern(Pattern),
    Aggregation(Aggregation),
}

/// Translated query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryDescriptor {
    pub name: String,
    pub namespace: String,
    pub variables: Variables,
    pub body: Vec<BodyItem>,
}

impl QueryDescriptor {
    /// Calculate fingerprint (SHA-256) for deterministic caching
    pub fn fingerprint(&self) -> Result<String, PlanError> {
        let json = serde_json::to_string(self)?;
        let mut hasher = Sha256::new();
        hasher.update(json.as_bytes());
        Ok(format!("{:x}", hasher.finalize()))
    }

    pub fn to_json(&self) -> Result<String, PlanError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Decode a descriptor and check its body shape
    pub fn from_json(json: &str) -> Result<Self, PlanError> {
        let descriptor: QueryDescriptor = serde_json::from_str(json)?;
        descriptor.validate()?;
        Ok(descriptor)
    }

    pub fn variable(&self, id: VarId) -> Result<&Variable, PlanError> {
        self.variables.get(id).ok_or(PlanError::UnknownVariable(id))
    }

    /// Top-level patterns, in evaluation order
    pub fn patterns(&self) -> impl Iterator<Item = &Pattern> {
        self.body.iter().filter_map(|item| match item {
            BodyItem::Pattern(pattern) => Some(pattern),
            BodyItem::Aggregation(_) => None,
        })
    }

    pub fn aggregation(&self) -> Option<&Aggregation> {
        self.body.iter().find_map(|item| match item {
            BodyItem::Aggregation(agg) => Some(agg),
            BodyItem::Pattern(_) => None,
        })
    }

    /// Check that variable names are distinct and that the body is one of
    /// the three supported shapes:
    /// a single pattern, two patterns where the second joins the first,
    /// or a single aggregation over one pattern.
    pub fn validate(&self) -> Result<(), PlanError> {
        let mut names = HashSet::new();
        for (_, variable) in self.variables.iter() {
            if !names.insert(variable.name.as_str()) {
                return Err(PlanError::InvalidShape(format!(
                    "variable name {} is bound more than once",
                    variable.name
                )));
            }
        }

        for item in &self.body {
            match item {
                BodyItem::Pattern(pattern) => self.check_pattern(pattern)?,
                BodyItem::Aggregation(agg) => {
                    self.check_pattern(&agg.source)?;
                    self.variable(agg.group_key_variable)?;
                    self.variable(agg.result_variable)?;
                    if agg.group_key_variable == agg.result_variable {
                        return Err(PlanError::InvalidShape(
                            "group key and result share a variable".to_string(),
                        ));
                    }
                }
            }
        }

        match self.body.as_slice() {
            [BodyItem::Pattern(single)] => {
                if single.join_constraints().next().is_some() {
                    return Err(PlanError::InvalidShape(
                        "single pattern carries a join constraint".to_string(),
                    ));
                }
            }
            [BodyItem::Pattern(first), BodyItem::Pattern(second)] => {
                if first.join_constraints().next().is_some() {
                    return Err(PlanError::InvalidShape(
                        "first pattern of a join must be unconstrained".to_string(),
                    ));
                }
                let joins: Vec<_> = second.join_constraints().collect();
                if joins.len() != 1 || joins[0].other_variable != first.variable {
                    return Err(PlanError::InvalidShape(
                        "second pattern must carry exactly one join constraint on the first"
                            .to_string(),
                    ));
                }
            }
            [BodyItem::Aggregation(agg)] => {
                if agg.source.join_constraints().next().is_some() {
                    return Err(PlanError::InvalidShape(
                        "aggregated pattern carries a join constraint".to_string(),
                    ));
                }
            }
            _ => {
                return Err(PlanError::InvalidShape(format!(
                    "unsupported body of {} item(s)",
                    self.body.len()
                )))
            }
        }

        Ok(())
    }

    fn check_pattern(&self, pattern: &Pattern) -> Result<(), PlanError> {
        self.variable(pattern.variable)?;
        match pattern.constraints.first() {
            Some(Constraint::Table { table }) if *table == pattern.table => {}
            _ => {
                return Err(PlanError::InvalidShape(format!(
                    "pattern on {} must start with its table constraint",
                    pattern.table
                )))
            }
        }
        for join in pattern.join_constraints() {
            self.variable(join.other_variable)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn join_descriptor() -> QueryDescriptor {
        let mut variables = Variables::new();
        let o = variables.declare("o", VariableKind::Fact { prototype: "orders".to_string() });
        let c = variables.declare("c", VariableKind::Fact { prototype: "customers".to_string() });

        let first = Pattern::new(o, "orders");
        let mut second = Pattern::new(c, "customers");
        second.add_constraint(Constraint::Join(JoinConstraint {
            field: "id".to_string(),
            operator: ConstraintOp::Equal,
            other_variable: o,
            other_field: "custid".to_string(),
        }));

        QueryDescriptor {
            name: "Q0".to_string(),
            namespace: "sqlrule.materialized".to_string(),
            variables,
            body: vec![BodyItem::Pattern(first), BodyItem::Pattern(second)],
        }
    }

    #[test]
    fn test_pattern_starts_with_table_constraint() {
        let pattern = Pattern::new(VarId(0), "orders");
        assert_eq!(
            pattern.constraints,
            vec![Constraint::Table { table: "orders".to_string() }]
        );
        assert_eq!(pattern.join_constraints().count(), 0);
    }

    #[test]
    fn test_fingerprint_deterministic() {
        let descriptor1 = join_descriptor();
        let descriptor2 = join_descriptor();

        assert_eq!(descriptor1.fingerprint().unwrap(), descriptor2.fingerprint().unwrap());
    }

    #[test]
    fn test_json_round_trip() {
        let descriptor = join_descriptor();

        let json = descriptor.to_json().unwrap();
        let parsed = QueryDescriptor::from_json(&json).unwrap();

        assert_eq!(descriptor, parsed);
        assert_eq!(descriptor.fingerprint().unwrap(), parsed.fingerprint().unwrap());
    }

    #[test]
    fn test_validate_rejects_unanchored_join() {
        let mut descriptor = join_descriptor();
        descriptor.body.reverse();
        assert!(matches!(descriptor.validate(), Err(PlanError::InvalidShape(_))));
    }

    #[test]
    fn test_validate_rejects_dangling_variable() {
        let mut descriptor = join_descriptor();
        descriptor.body.truncate(1);
        if let Some(BodyItem::Pattern(pattern)) = descriptor.body.first_mut() {
            pattern.variable = VarId(7);
        }
        assert!(matches!(
            descriptor.validate(),
            Err(PlanError::UnknownVariable(VarId(7)))
        ));
    }

    #[test]
    fn test_validate_rejects_duplicate_variable_names() {
        let mut variables = Variables::new();
        let o = variables.declare("o", VariableKind::Fact { prototype: "orders".to_string() });
        let key = variables.declare("o", VariableKind::GroupKey);
        let count = variables.declare("count", VariableKind::Accumulate);

        let descriptor = QueryDescriptor {
            name: "Q0".to_string(),
            namespace: "sqlrule.materialized".to_string(),
            variables,
            body: vec![BodyItem::Aggregation(Aggregation {
                source: Pattern::new(o, "orders"),
                group_key_field: "o".to_string(),
                group_key_variable: key,
                accumulator: Accumulator::Count,
                result_variable: count,
            })],
        };

        assert!(matches!(descriptor.validate(), Err(PlanError::InvalidShape(_))));
        assert!(QueryDescriptor::from_json(&descriptor.to_json().unwrap()).is_err());
    }

    #[test]
    fn test_aggregation_accessors() {
        let mut variables = Variables::new();
        let o = variables.declare("o", VariableKind::Fact { prototype: "orders".to_string() });
        let key = variables.declare("status", VariableKind::GroupKey);
        let count = variables.declare("count", VariableKind::Accumulate);

        let descriptor = QueryDescriptor {
            name: "Q0".to_string(),
            namespace: "sqlrule.materialized".to_string(),
            variables,
            body: vec![BodyItem::Aggregation(Aggregation {
                source: Pattern::new(o, "orders"),
                group_key_field: "status".to_string(),
                group_key_variable: key,
                accumulator: Accumulator::Count,
                result_variable: count,
            })],
        };

        descriptor.validate().unwrap();
        assert_eq!(descriptor.patterns().count(), 0);
        let agg = descriptor.aggregation().unwrap();
        assert_eq!(agg.accumulator.function_name(), "count");
        assert_eq!(descriptor.variable(agg.result_variable).unwrap().name, "count");
    }
}
