//! Translation session and query plan assembly
//!
//! A [`TranslationSession`] owns the state one translation needs: the alias
//! table binding each relation alias to its variable, the variable arena of
//! the query being built, and the schema registry. The alias table and the
//! arena are cleared at the start of every translation; the schema registry
//! lives until [`TranslationSession::reset`] or the end of the session.

use std::collections::HashMap;

use sqlrule_ast::{FromItem, Select};
use sqlrule_plan::{rule_source, BodyItem, QueryDescriptor, VarId, Variables};
use tracing::{debug, info_span};

use crate::config::TranslatorConfig;
use crate::error::TranslateError;
use crate::registry::SchemaRegistry;

/// Variable bound to an alias, with the table it ranges over
#[derive(Debug, Clone)]
pub(crate) struct AliasBinding {
    pub table: String,
    pub variable: VarId,
}

#[derive(Debug)]
pub struct TranslationSession {
    config: TranslatorConfig,
    registry: SchemaRegistry,
    pub(crate) aliases: HashMap<String, AliasBinding>,
    pub(crate) variables: Variables,
}

impl TranslationSession {
    pub fn new(config: TranslatorConfig) -> Self {
        let registry = SchemaRegistry::new(config.query.namespace.clone());
        Self {
            config,
            registry,
            aliases: HashMap::new(),
            variables: Variables::new(),
        }
    }

    pub fn config(&self) -> &TranslatorConfig {
        &self.config
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    pub(crate) fn registry_mut(&mut self) -> &mut SchemaRegistry {
        &mut self.registry
    }

    /// Drop every alias and prototype known to this session
    pub fn reset(&mut self) {
        self.aliases.clear();
        self.variables = Variables::new();
        self.registry.clear();
    }

    /// Parse `sql` and translate it
    pub fn translate_sql(&mut self, sql: &str) -> Result<QueryDescriptor, TranslateError> {
        let select = sqlrule_ast::parse(sql)?;
        self.translate(&select)
    }

    /// Translate a parsed SELECT into a query descriptor
    ///
    /// A failed translation leaves the schema registry as it was before
    /// the call.
    pub fn translate(&mut self, select: &Select) -> Result<QueryDescriptor, TranslateError> {
        let span = info_span!(
            "translate",
            query = %self.config.query.name,
            from = select.from.shape()
        );
        let _enter = span.enter();

        let checkpoint = self.registry.clone();
        let result = self.assemble(select);
        if let Err(err) = &result {
            debug!(error = %err, "translation failed, restoring schema registry");
            self.registry = checkpoint;
        }
        result
    }

    fn assemble(&mut self, select: &Select) -> Result<QueryDescriptor, TranslateError> {
        self.aliases.clear();
        self.variables = Variables::new();

        if select.selection.is_some() {
            return Err(TranslateError::UnsupportedQueryShape(
                "WHERE clauses are not supported".to_string(),
            ));
        }
        if !select.order_by.is_empty() {
            return Err(TranslateError::UnsupportedQueryShape(
                "ORDER BY is not supported".to_string(),
            ));
        }

        let body = match &select.from {
            FromItem::Join(join) => {
                if select.group_by.is_some() {
                    return Err(TranslateError::UnsupportedQueryShape(
                        "GROUP BY over a join is not supported".to_string(),
                    ));
                }
                let [first, second] = self.translate_join(join)?;
                vec![BodyItem::Pattern(first), BodyItem::Pattern(second)]
            }
            FromItem::Relation(table) => {
                let pattern = self.translate_relation(table)?;
                vec![self.translate_group_by(pattern, select.group_by.as_deref())?]
            }
            FromItem::Subquery { alias, .. } => {
                return Err(TranslateError::UnsupportedQueryShape(format!(
                    "subquery {} in FROM is not supported",
                    alias
                )));
            }
        };

        let descriptor = QueryDescriptor {
            name: self.config.query.name.clone(),
            namespace: self.registry.namespace().to_string(),
            variables: std::mem::take(&mut self.variables),
            body,
        };
        descriptor.validate()?;

        debug!(
            patterns = descriptor.patterns().count(),
            aggregated = descriptor.aggregation().is_some(),
            variables = descriptor.variables.len(),
            "query assembled"
        );
        Ok(descriptor)
    }

    /// Render a descriptor as rule source using the configured fact type
    pub fn render(&self, descriptor: &QueryDescriptor) -> Result<String, TranslateError> {
        Ok(rule_source::render(descriptor, &self.config.query.fact_type)?)
    }
}

impl Default for TranslationSession {
    fn default() -> Self {
        Self::new(TranslatorConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_uses_configured_name_and_namespace() {
        let mut config = TranslatorConfig::default();
        config.query.name = "Orders".to_string();
        config.query.namespace = "shop.facts".to_string();

        let mut session = TranslationSession::new(config);
        let descriptor = session.translate_sql("SELECT * FROM orders o").unwrap();

        assert_eq!(descriptor.name, "Orders");
        assert_eq!(descriptor.namespace, "shop.facts");
    }

    #[test]
    fn test_rejects_where_and_order_by() {
        let mut session = TranslationSession::default();
        assert!(matches!(
            session.translate_sql("SELECT * FROM orders o WHERE o.total > 10"),
            Err(TranslateError::UnsupportedQueryShape(_))
        ));
        assert!(matches!(
            session.translate_sql("SELECT * FROM orders o ORDER BY o.id"),
            Err(TranslateError::UnsupportedQueryShape(_))
        ));
    }

    #[test]
    fn test_rejects_subquery() {
        let mut session = TranslationSession::default();
        assert!(matches!(
            session.translate_sql("SELECT * FROM (SELECT * FROM orders o) sub"),
            Err(TranslateError::UnsupportedQueryShape(_))
        ));
    }

    #[test]
    fn test_aliases_do_not_leak_between_translations() {
        let mut session = TranslationSession::default();
        session.translate_sql("SELECT * FROM orders o").unwrap();

        // `o` is bound again, to another table, in a fresh query
        let descriptor = session.translate_sql("SELECT * FROM customers o").unwrap();
        assert_eq!(descriptor.variables.len(), 1);
        assert_eq!(session.registry().len(), 2);
    }

    #[test]
    fn test_reset_clears_registry() {
        let mut session = TranslationSession::default();
        session.translate_sql("SELECT * FROM orders o").unwrap();
        assert!(session.registry().contains("orders"));

        session.reset();
        assert!(session.registry().is_empty());
    }

    #[test]
    fn test_failed_translation_restores_registry() {
        let mut session = TranslationSession::default();
        session.translate_sql("SELECT * FROM orders o").unwrap();

        for sql in [
            "SELECT * FROM a x JOIN b x ON x.k = x.k",
            "SELECT * FROM a x JOIN b y ON x.k = z.k",
            "SELECT * FROM a x GROUP BY g1, g2",
        ] {
            assert!(session.translate_sql(sql).is_err(), "{} should fail", sql);
            assert_eq!(session.registry().len(), 1, "{} leaked a prototype", sql);
            assert!(session.registry().contains("orders"));
        }
    }

    #[test]
    fn test_render_uses_configured_fact_type() {
        let mut config = TranslatorConfig::default();
        config.query.fact_type = "Row".to_string();

        let mut session = TranslationSession::new(config);
        let descriptor = session.translate_sql("SELECT * FROM orders o").unwrap();
        let source = session.render(&descriptor).unwrap();

        assert!(source.contains("o : Row( table == \"orders\" )"));
    }

    #[test]
    fn test_parse_error_is_surfaced() {
        let mut session = TranslationSession::default();
        assert!(matches!(
            session.translate_sql("SELECT FROM"),
            Err(TranslateError::Parse(_))
        ));
    }
}
