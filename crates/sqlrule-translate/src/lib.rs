//! sqlrule - SQL to rule-engine query translation
//!
//! Translates a narrow SQL subset (a single relation with an optional
//! one-column `GROUP BY`, or an inner equi-join of two relations) into a
//! [`QueryDescriptor`]: fact patterns joined by equality constraints,
//! optionally wrapped in a COUNT aggregation, ready for a pattern-matching
//! rule engine.
//!
//! ```
//! let descriptor = sqlrule_translate::translate(
//!     "SELECT * FROM orders o JOIN customers c ON o.custid = c.id",
//! )
//! .unwrap();
//! assert_eq!(descriptor.patterns().count(), 2);
//! ```

mod aggregate;
pub mod config;
pub mod error;
mod join;
pub mod logging;
pub mod operand;
mod pattern;
pub mod registry;
pub mod session;

pub use aggregate::COUNT_VARIABLE;
pub use config::TranslatorConfig;
pub use error::TranslateError;
pub use registry::SchemaRegistry;
pub use session::TranslationSession;
pub use sqlrule_plan::QueryDescriptor;

/// Translate `sql` with a fresh session and default configuration
pub fn translate(sql: &str) -> Result<QueryDescriptor, TranslateError> {
    TranslationSession::default().translate_sql(sql)
}
