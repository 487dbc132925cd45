//! Pest-based parser for the sqlrule SQL subset

use pest::Parser;
use pest_derive::Parser;
use thiserror::Error;

use crate::ast::*;

#[derive(Parser)]
#[grammar = "sql.pest"]
pub struct SqlParser;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Syntax error: {0}")]
    Syntax(String),

    #[error("Pest error: {0}")]
    Pest(#[from] pest::error::Error<Rule>),
}

type Pair<'a> = pest::iterators::Pair<'a, Rule>;

/// Parse SQL source text into a SELECT statement
pub fn parse(source: &str) -> Result<Select, ParseError> {
    let mut pairs = SqlParser::parse(Rule::query, source)?;
    let query = pairs
        .next()
        .ok_or_else(|| ParseError::Syntax("Empty input".to_string()))?;

    let stmt = query
        .into_inner()
        .find(|pair| pair.as_rule() == Rule::select_stmt)
        .ok_or_else(|| ParseError::Syntax("Missing SELECT statement".to_string()))?;

    parse_select(stmt)
}

fn is_keyword(rule: Rule) -> bool {
    matches!(
        rule,
        Rule::kw_select
            | Rule::kw_from
            | Rule::kw_where
            | Rule::kw_group
            | Rule::kw_order
            | Rule::kw_by
            | Rule::kw_inner
            | Rule::kw_left
            | Rule::kw_right
            | Rule::kw_full
            | Rule::kw_outer
            | Rule::kw_cross
            | Rule::kw_join
            | Rule::kw_on
            | Rule::kw_and
            | Rule::kw_or
            | Rule::kw_as
    )
}

/// Inner pairs of `pair`, minus keyword tokens
fn significant<'a>(pair: Pair<'a>) -> impl Iterator<Item = Pair<'a>> {
    pair.into_inner().filter(|p| !is_keyword(p.as_rule()))
}

fn expect_next<'a, I>(pairs: &mut I, what: &str) -> Result<Pair<'a>, ParseError>
where
    I: Iterator<Item = Pair<'a>>,
{
    pairs
        .next()
        .ok_or_else(|| ParseError::Syntax(format!("Missing {}", what)))
}

fn parse_select(pair: Pair<'_>) -> Result<Select, ParseError> {
    let mut projection = None;
    let mut from = None;
    let mut selection = None;
    let mut group_by = None;
    let mut order_by = Vec::new();

    for part in significant(pair) {
        match part.as_rule() {
            Rule::select_list => projection = Some(parse_select_list(part)?),
            Rule::from_clause => from = Some(parse_from_clause(part)?),
            Rule::where_clause => {
                let expr = expect_next(&mut significant(part), "WHERE condition")?;
                selection = Some(parse_expr(expr)?);
            }
            Rule::group_by_clause => {
                let list = expect_next(&mut significant(part), "GROUP BY list")?;
                group_by = Some(parse_expr_list(list)?);
            }
            Rule::order_by_clause => {
                order_by = significant(part)
                    .map(parse_order_item)
                    .collect::<Result<Vec<_>, _>>()?;
            }
            _ => {}
        }
    }

    Ok(Select {
        projection: projection
            .ok_or_else(|| ParseError::Syntax("Missing select list".to_string()))?,
        from: from.ok_or_else(|| ParseError::Syntax("Missing FROM clause".to_string()))?,
        selection,
        group_by,
        order_by,
    })
}

fn parse_select_list(pair: Pair<'_>) -> Result<Vec<SelectItem>, ParseError> {
    significant(pair)
        .map(|item| match item.as_rule() {
            Rule::wildcard => Ok(SelectItem::Wildcard),
            Rule::select_item => parse_select_item(item),
            other => Err(ParseError::Syntax(format!("Invalid select item: {:?}", other))),
        })
        .collect()
}

fn parse_select_item(pair: Pair<'_>) -> Result<SelectItem, ParseError> {
    let mut inner = significant(pair);
    let expr = parse_expr(expect_next(&mut inner, "select expression")?)?;

    // Check if there's an alias following
    match inner.next() {
        Some(alias) => Ok(SelectItem::Aliased {
            expr,
            alias: alias.as_str().to_string(),
        }),
        None => Ok(SelectItem::Expr(expr)),
    }
}

fn parse_from_clause(pair: Pair<'_>) -> Result<FromItem, ParseError> {
    let mut inner = significant(pair);
    let mut item = parse_relation(expect_next(&mut inner, "relation")?)?;

    // Join chains fold to the left: a JOIN b JOIN c => (a JOIN b) JOIN c
    for tail in inner {
        let mut parts = significant(tail);
        let kind = parse_join_op(expect_next(&mut parts, "join operator")?)?;
        let right = parse_relation(expect_next(&mut parts, "joined relation")?)?;
        let condition = parts.next().map(parse_expr).transpose()?;

        item = FromItem::Join(Box::new(Join {
            kind,
            left: item,
            right,
            condition,
        }));
    }

    Ok(item)
}

fn parse_join_op(pair: Pair<'_>) -> Result<JoinKind, ParseError> {
    let op = expect_next(&mut pair.into_inner(), "join kind")?;
    match op.as_rule() {
        Rule::inner_join => Ok(JoinKind::Inner),
        Rule::left_join => Ok(JoinKind::Left),
        Rule::right_join => Ok(JoinKind::Right),
        Rule::full_join => Ok(JoinKind::Full),
        Rule::cross_join => Ok(JoinKind::Cross),
        Rule::comma_join => Ok(JoinKind::Comma),
        other => Err(ParseError::Syntax(format!("Unknown join operator: {:?}", other))),
    }
}

fn parse_relation(pair: Pair<'_>) -> Result<FromItem, ParseError> {
    let body = expect_next(&mut pair.into_inner(), "relation body")?;
    match body.as_rule() {
        Rule::table_ref => {
            let mut inner = significant(body);
            let name = expect_next(&mut inner, "table name")?.as_str().to_string();
            let alias = inner.next().map(|p| p.as_str().to_string());
            Ok(FromItem::Relation(TableRef { name, alias }))
        }
        Rule::subquery => {
            let mut inner = significant(body);
            let select = parse_select(expect_next(&mut inner, "subquery")?)?;
            let alias = expect_next(&mut inner, "subquery alias")?.as_str().to_string();
            Ok(FromItem::Subquery {
                select: Box::new(select),
                alias,
            })
        }
        other => Err(ParseError::Syntax(format!("Invalid relation: {:?}", other))),
    }
}

fn parse_order_item(pair: Pair<'_>) -> Result<OrderByItem, ParseError> {
    let mut inner = significant(pair);
    let expr = parse_expr(expect_next(&mut inner, "ORDER BY expression")?)?;
    let desc = inner.any(|p| p.as_rule() == Rule::kw_desc);
    Ok(OrderByItem { expr, desc })
}

fn parse_expr_list(pair: Pair<'_>) -> Result<Vec<Expr>, ParseError> {
    significant(pair).map(parse_expr).collect()
}

fn parse_expr(pair: Pair<'_>) -> Result<Expr, ParseError> {
    match pair.as_rule() {
        Rule::expr => parse_expr(expect_next(&mut significant(pair), "expression")?),
        Rule::or_expr | Rule::and_expr => {
            let op = if pair.as_rule() == Rule::or_expr { BinOp::Or } else { BinOp::And };
            let mut operands = significant(pair);
            let mut left = parse_expr(expect_next(&mut operands, "operand")?)?;
            for next in operands {
                left = Expr::BinaryOp {
                    op,
                    left: Box::new(left),
                    right: Box::new(parse_expr(next)?),
                };
            }
            Ok(left)
        }
        Rule::cmp_expr => {
            let mut inner = significant(pair);
            let left = parse_expr(expect_next(&mut inner, "operand")?)?;
            match inner.next() {
                Some(op_pair) => {
                    let op = parse_cmp_op(op_pair.as_str())?;
                    let right = parse_expr(expect_next(&mut inner, "right operand")?)?;
                    Ok(Expr::BinaryOp {
                        op,
                        left: Box::new(left),
                        right: Box::new(right),
                    })
                }
                None => Ok(left),
            }
        }
        Rule::func_call => parse_func_call(pair),
        Rule::col_ref => parse_col_ref(pair),
        Rule::literal => parse_literal(pair),
        Rule::star => Ok(Expr::Wildcard),
        other => Err(ParseError::Syntax(format!("Cannot parse expr: {:?}", other))),
    }
}

fn parse_cmp_op(symbol: &str) -> Result<BinOp, ParseError> {
    match symbol {
        "=" => Ok(BinOp::Eq),
        "<>" | "!=" => Ok(BinOp::Ne),
        "<" => Ok(BinOp::Lt),
        "<=" => Ok(BinOp::Le),
        ">" => Ok(BinOp::Gt),
        ">=" => Ok(BinOp::Ge),
        _ => Err(ParseError::Syntax(format!("Unknown operator: {}", symbol))),
    }
}

fn parse_func_call(pair: Pair<'_>) -> Result<Expr, ParseError> {
    let mut inner = significant(pair);
    let name = expect_next(&mut inner, "function name")?.as_str().to_string();
    let args = inner.map(parse_expr).collect::<Result<Vec<_>, _>>()?;
    Ok(Expr::FuncCall(FuncCall { name, args }))
}

fn parse_col_ref(pair: Pair<'_>) -> Result<Expr, ParseError> {
    let parts: Vec<_> = significant(pair).map(|p| p.as_str().to_string()).collect();

    let col = match parts.as_slice() {
        [qualifier, name] => ColumnRef {
            qualifier: Some(qualifier.clone()),
            name: name.clone(),
        },
        [name] => ColumnRef {
            qualifier: None,
            name: name.clone(),
        },
        _ => return Err(ParseError::Syntax("Invalid column reference".to_string())),
    };

    Ok(Expr::Column(col))
}

fn parse_literal(pair: Pair<'_>) -> Result<Expr, ParseError> {
    let inner = expect_next(&mut pair.into_inner(), "literal")?;
    let value = match inner.as_rule() {
        Rule::integer => Value::Int(
            inner.as_str().parse().map_err(|e| {
                ParseError::Syntax(format!("Invalid integer {}: {}", inner.as_str(), e))
            })?,
        ),
        Rule::string => {
            let s = inner.as_str();
            Value::String(s[1..s.len() - 1].replace("''", "'"))
        }
        _ => return Err(ParseError::Syntax("Invalid literal".to_string())),
    };
    Ok(Expr::Literal(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(qualifier: &str, name: &str) -> Expr {
        Expr::Column(ColumnRef {
            qualifier: Some(qualifier.to_string()),
            name: name.to_string(),
        })
    }

    #[test]
    fn test_parse_single_relation() {
        let select = parse("SELECT * FROM orders o").unwrap();
        assert_eq!(select.projection, vec![SelectItem::Wildcard]);
        assert_eq!(
            select.from,
            FromItem::Relation(TableRef {
                name: "orders".to_string(),
                alias: Some("o".to_string()),
            })
        );
        assert!(select.group_by.is_none());
        assert!(select.selection.is_none());
    }

    #[test]
    fn test_parse_relation_without_alias() {
        let select = parse("select * from orders;").unwrap();
        assert_eq!(
            select.from,
            FromItem::Relation(TableRef {
                name: "orders".to_string(),
                alias: None,
            })
        );
    }

    #[test]
    fn test_parse_inner_join() {
        let select =
            parse("SELECT * FROM orders o JOIN customers AS c ON o.custid = c.id").unwrap();
        let FromItem::Join(join) = select.from else {
            panic!("expected a join");
        };
        assert_eq!(join.kind, JoinKind::Inner);
        assert_eq!(join.left.shape(), "relation");
        assert_eq!(
            join.right,
            FromItem::Relation(TableRef {
                name: "customers".to_string(),
                alias: Some("c".to_string()),
            })
        );
        assert_eq!(
            join.condition,
            Some(Expr::BinaryOp {
                op: BinOp::Eq,
                left: Box::new(column("o", "custid")),
                right: Box::new(column("c", "id")),
            })
        );
    }

    #[test]
    fn test_parse_join_chain_folds_left() {
        let select =
            parse("SELECT * FROM a x INNER JOIN b y ON x.k = y.k JOIN c z ON y.k = z.k").unwrap();
        let FromItem::Join(outer) = select.from else {
            panic!("expected a join");
        };
        assert_eq!(outer.left.shape(), "join");
        assert_eq!(outer.right.shape(), "relation");
    }

    #[test]
    fn test_parse_outer_and_comma_joins() {
        let select = parse("SELECT * FROM a x LEFT OUTER JOIN b y ON x.k = y.k").unwrap();
        let FromItem::Join(join) = select.from else {
            panic!("expected a join");
        };
        assert_eq!(join.kind, JoinKind::Left);

        let select = parse("SELECT * FROM a x, b y").unwrap();
        let FromItem::Join(join) = select.from else {
            panic!("expected a join");
        };
        assert_eq!(join.kind, JoinKind::Comma);
        assert!(join.condition.is_none());
    }

    #[test]
    fn test_parse_group_by() {
        let select = parse("SELECT status, COUNT(*) FROM orders o GROUP BY status").unwrap();
        assert_eq!(select.projection.len(), 2);
        assert_eq!(
            select.projection[1],
            SelectItem::Expr(Expr::FuncCall(FuncCall {
                name: "COUNT".to_string(),
                args: vec![Expr::Wildcard],
            }))
        );
        let keys = select.group_by.unwrap();
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0].to_string(), "status");
    }

    #[test]
    fn test_parse_where_and_order_by() {
        let select = parse(concat!(
            "SELECT o.id AS ident FROM orders o ",
            "WHERE o.total > 10 AND o.status = 'new' ORDER BY o.id DESC"
        ))
        .unwrap();
        assert!(matches!(select.projection[0], SelectItem::Aliased { .. }));
        assert_eq!(
            select.selection.unwrap().to_string(),
            "o.total > 10 AND o.status = 'new'"
        );
        assert_eq!(select.order_by.len(), 1);
        assert!(select.order_by[0].desc);
    }

    #[test]
    fn test_identifier_prefixed_by_keyword() {
        let select = parse("SELECT * FROM orders ord GROUP BY ordinal").unwrap();
        assert_eq!(
            select.from,
            FromItem::Relation(TableRef {
                name: "orders".to_string(),
                alias: Some("ord".to_string()),
            })
        );
        assert_eq!(select.group_by.unwrap()[0].to_string(), "ordinal");
    }

    #[test]
    fn test_parse_subquery() {
        let select = parse("SELECT * FROM (SELECT * FROM orders o) sub").unwrap();
        assert!(matches!(select.from, FromItem::Subquery { ref alias, .. } if alias == "sub"));
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(parse(""), Err(ParseError::Pest(_))));
        assert!(matches!(parse("SELECT * FROM"), Err(ParseError::Pest(_))));
        assert!(matches!(parse("SELECT * FROM t a HAVING x"), Err(ParseError::Pest(_))));
    }
}
