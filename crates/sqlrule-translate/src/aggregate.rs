//! GROUP BY -> COUNT aggregation over a single pattern

use sqlrule_ast::Expr;
use sqlrule_plan::{Accumulator, Aggregation, BodyItem, Pattern, VariableKind};
use tracing::debug;

use crate::error::TranslateError;
use crate::operand;
use crate::session::TranslationSession;

/// Name of the variable holding the count of each group, unless that name
/// is already bound in the query
pub const COUNT_VARIABLE: &str = "count";

impl TranslationSession {
    /// Wrap `pattern` in a COUNT aggregation keyed on the single GROUP BY
    /// column, or return it unchanged when there is no GROUP BY.
    pub(crate) fn translate_group_by(
        &mut self,
        pattern: Pattern,
        group_by: Option<&[Expr]>,
    ) -> Result<BodyItem, TranslateError> {
        let keys = match group_by {
            None => return Ok(BodyItem::Pattern(pattern)),
            Some(keys) => keys,
        };

        let key = match keys {
            [key] => key,
            [] => {
                return Err(TranslateError::UnsupportedGroupBy(
                    "empty group by list".to_string(),
                ))
            }
            _ => {
                return Err(TranslateError::UnsupportedGroupBy(
                    "group by on more than one field".to_string(),
                ))
            }
        };

        // Key and result names must not shadow the pattern's alias
        let group_key_field = self.group_key_field(key, &pattern)?;
        let group_key_variable = self
            .variables
            .declare_unique(&group_key_field, VariableKind::GroupKey);
        let result_variable = self
            .variables
            .declare_unique(COUNT_VARIABLE, VariableKind::Accumulate);

        debug!(key = %group_key_field, table = %pattern.table, "aggregation created");
        Ok(BodyItem::Aggregation(Aggregation {
            source: pattern,
            group_key_field,
            group_key_variable,
            accumulator: Accumulator::Count,
            result_variable,
        }))
    }

    /// Lower-cased field named by a GROUP BY key. A qualified key must
    /// refer to the grouped pattern.
    fn group_key_field(&self, key: &Expr, pattern: &Pattern) -> Result<String, TranslateError> {
        let column = match key {
            Expr::Column(column) => column,
            other => {
                return Err(TranslateError::UnsupportedGroupBy(format!(
                    "{} is not a column",
                    other
                )))
            }
        };

        if column.qualifier.is_none() {
            return Ok(column.name.to_lowercase());
        }

        let operand = operand::resolve(&column.to_string())?;
        match self.aliases.get(&operand.alias) {
            Some(binding) if binding.variable == pattern.variable => Ok(operand.field),
            _ => Err(TranslateError::UnsupportedGroupBy(format!(
                "{} does not belong to the grouped relation",
                column
            ))),
        }
    }
}
