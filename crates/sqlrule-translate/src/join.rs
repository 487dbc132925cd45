//! Two-relation equi-join -> ordered pair of patterns

use sqlrule_ast::{BinOp, Expr, FromItem, Join, JoinKind};
use sqlrule_plan::{Constraint, ConstraintOp, JoinConstraint, Pattern, VarId};
use tracing::debug;

use crate::error::TranslateError;
use crate::operand::{self, Operand};
use crate::session::TranslationSession;

impl TranslationSession {
    /// Translate `left JOIN right ON x = y` into `[first, second]`.
    ///
    /// The left relation is matched first. The second pattern carries the
    /// single join constraint, comparing its own field with the first
    /// pattern's field, so the rule engine binds the first variable before
    /// evaluating the constraint. Each operand of the condition is assigned
    /// to a side by its alias; writing the condition the other way round
    /// yields the same plan.
    pub(crate) fn translate_join(&mut self, join: &Join) -> Result<[Pattern; 2], TranslateError> {
        if join.kind != JoinKind::Inner {
            return Err(TranslateError::UnsupportedQueryShape(format!(
                "{:?} joins are not supported",
                join.kind
            )));
        }

        let (left, right) = match (&join.left, &join.right) {
            (FromItem::Relation(left), FromItem::Relation(right)) => (left, right),
            (l, r) => {
                return Err(TranslateError::UnsupportedQueryShape(format!(
                    "only a join of two relations is supported, got {} JOIN {}",
                    l.shape(),
                    r.shape()
                )))
            }
        };

        let first = self.translate_relation(left)?;
        let mut second = self.translate_relation(right)?;

        let (lhs, rhs) = equality_operands(join.condition.as_ref())?;
        let lhs = operand::resolve(&lhs.to_string())?;
        let rhs = operand::resolve(&rhs.to_string())?;

        let sides = (
            self.side_of(&lhs, &first, &second)?,
            self.side_of(&rhs, &first, &second)?,
        );
        let (first_operand, second_operand) = match sides {
            (Side::First, Side::Second) => (lhs, rhs),
            (Side::Second, Side::First) => {
                debug!(alias = %lhs.alias, "condition operands written right to left");
                (rhs, lhs)
            }
            _ => {
                return Err(TranslateError::UnsupportedJoinCondition(format!(
                    "both operands reference {}",
                    lhs.alias
                )))
            }
        };

        debug!(
            first = %first_operand.alias,
            second = %second_operand.alias,
            field = %second_operand.field,
            other_field = %first_operand.field,
            "join constraint attached"
        );
        second.add_constraint(Constraint::Join(JoinConstraint {
            field: second_operand.field,
            operator: ConstraintOp::Equal,
            other_variable: first.variable,
            other_field: first_operand.field,
        }));

        Ok([first, second])
    }

    fn side_of(
        &self,
        operand: &Operand,
        first: &Pattern,
        second: &Pattern,
    ) -> Result<Side, TranslateError> {
        let variable: Option<VarId> = self.aliases.get(&operand.alias).map(|b| b.variable);
        match variable {
            Some(v) if v == first.variable => Ok(Side::First),
            Some(v) if v == second.variable => Ok(Side::Second),
            _ => Err(TranslateError::UnresolvedJoinOperand(operand.alias.clone())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    First,
    Second,
}

/// Operands of `a.x = b.y`
fn equality_operands(condition: Option<&Expr>) -> Result<(&Expr, &Expr), TranslateError> {
    match condition {
        Some(Expr::BinaryOp { op: BinOp::Eq, left, right })
            if matches!(**left, Expr::Column(_)) && matches!(**right, Expr::Column(_)) =>
        {
            Ok((&**left, &**right))
        }
        Some(other) => Err(TranslateError::UnsupportedJoinCondition(other.to_string())),
        None => Err(TranslateError::UnsupportedJoinCondition(
            "join without ON condition".to_string(),
        )),
    }
}
