//! Field access resolution
//!
//! Splits a dotted field access such as `O.CustId` into the alias of the
//! pattern it reads from and the name of the field, both lower-cased.

use crate::error::TranslateError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operand {
    pub alias: String,
    pub field: String,
}

/// Resolve `alias.field` at the first `.`
pub fn resolve(text: &str) -> Result<Operand, TranslateError> {
    let lowered = text.to_lowercase();
    let (alias, field) = lowered
        .split_once('.')
        .ok_or_else(|| TranslateError::MalformedOperand(text.to_string()))?;

    let alias = alias.trim();
    let field = field.trim();
    if alias.is_empty() || field.is_empty() {
        return Err(TranslateError::MalformedOperand(text.to_string()));
    }

    Ok(Operand {
        alias: alias.to_string(),
        field: field.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_lowercases_both_parts() {
        let operand = resolve("O.CustId").unwrap();
        assert_eq!(operand.alias, "o");
        assert_eq!(operand.field, "custid");
    }

    #[test]
    fn test_resolve_splits_at_first_dot() {
        let operand = resolve("a.b.c").unwrap();
        assert_eq!(operand.alias, "a");
        assert_eq!(operand.field, "b.c");
    }

    #[test]
    fn test_resolve_trims_whitespace() {
        let operand = resolve("c . id ").unwrap();
        assert_eq!(operand.alias, "c");
        assert_eq!(operand.field, "id");
    }

    #[test]
    fn test_resolve_without_separator() {
        assert!(matches!(
            resolve("custid"),
            Err(TranslateError::MalformedOperand(text)) if text == "custid"
        ));
        assert!(matches!(resolve("o."), Err(TranslateError::MalformedOperand(_))));
    }
}
