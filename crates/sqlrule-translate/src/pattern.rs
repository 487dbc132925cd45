//! Relation reference -> pattern

use sqlrule_ast::TableRef;
use sqlrule_plan::{Pattern, VariableKind};
use tracing::debug;

use crate::error::TranslateError;
use crate::session::{AliasBinding, TranslationSession};

impl TranslationSession {
    /// Bind a fresh variable to the relation's alias and build its pattern.
    ///
    /// A relation without an alias is bound under its table name. An alias
    /// may be bound only once per query.
    pub(crate) fn translate_relation(
        &mut self,
        table: &TableRef,
    ) -> Result<Pattern, TranslateError> {
        let table_name = table.name.to_lowercase();
        let alias = table
            .alias
            .as_deref()
            .unwrap_or(&table.name)
            .to_lowercase();

        if let Some(existing) = self.aliases.get(&alias) {
            return Err(TranslateError::DuplicateAlias {
                alias,
                existing: existing.table.clone(),
                table: table_name,
            });
        }

        let prototype = self.registry_mut().get_or_create(&table_name);
        let variable = self.variables.declare(
            alias.clone(),
            VariableKind::Fact {
                prototype: prototype.name.clone(),
            },
        );
        self.aliases.insert(
            alias.clone(),
            AliasBinding {
                table: table_name.clone(),
                variable,
            },
        );

        debug!(%alias, table = %table_name, %variable, "pattern created");
        Ok(Pattern::new(variable, table_name))
    }
}
