//! Translation errors

use sqlrule_ast::ParseError;
use sqlrule_plan::PlanError;
use thiserror::Error;

/// Every failure aborts the whole translation; no partial plan is returned.
#[derive(Debug, Error)]
pub enum TranslateError {
    #[error("Malformed operand: {0:?} (expected alias.field)")]
    MalformedOperand(String),

    #[error("Duplicate alias {alias:?}: already bound to {existing:?}, cannot bind to {table:?}")]
    DuplicateAlias {
        alias: String,
        existing: String,
        table: String,
    },

    #[error("Unsupported join condition: {0}")]
    UnsupportedJoinCondition(String),

    #[error("Unresolved join operand: alias {0:?} is not bound by either joined relation")]
    UnresolvedJoinOperand(String),

    #[error("Unsupported GROUP BY: {0}")]
    UnsupportedGroupBy(String),

    #[error("Unsupported query shape: {0}")]
    UnsupportedQueryShape(String),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("Plan error: {0}")]
    Plan(#[from] PlanError),
}
