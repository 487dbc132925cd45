//! Rule source rendering
//!
//! Renders a [`QueryDescriptor`] as the textual rule language consumed by
//! rule compilers:
//!
//! ```text
//! package sqlrule.materialized;
//!
//! query "Q0"
//!     o : Fact( table == "orders" )
//!     c : Fact( table == "customers", get("id") == o.get("custid") )
//! end
//! ```

use std::fmt::Write as _;

use crate::{BodyItem, Constraint, PlanError, Pattern, QueryDescriptor};

const INDENT: &str = "    ";

/// Render `descriptor` as rule source, typing every pattern as `fact_type`
pub fn render(descriptor: &QueryDescriptor, fact_type: &str) -> Result<String, PlanError> {
    let mut out = String::new();

    writeln!(out, "package {};", descriptor.namespace)?;
    out.push('\n');
    writeln!(out, "query \"{}\"", descriptor.name)?;

    for item in &descriptor.body {
        out.push_str(INDENT);
        match item {
            BodyItem::Pattern(pattern) => {
                out.push_str(&render_pattern(descriptor, pattern, fact_type)?);
            }
            BodyItem::Aggregation(agg) => {
                let source = descriptor.variable(agg.source.variable)?;
                let key = descriptor.variable(agg.group_key_variable)?;
                let result = descriptor.variable(agg.result_variable)?;
                write!(
                    out,
                    "groupby( {}; {} : {}.get(\"{}\"); {} : {}() )",
                    render_pattern(descriptor, &agg.source, fact_type)?,
                    key.name,
                    source.name,
                    agg.group_key_field,
                    result.name,
                    agg.accumulator.function_name(),
                )?;
            }
        }
        out.push('\n');
    }

    out.push_str("end\n");
    Ok(out)
}

fn render_pattern(
    descriptor: &QueryDescriptor,
    pattern: &Pattern,
    fact_type: &str,
) -> Result<String, PlanError> {
    let binding = descriptor.variable(pattern.variable)?;
    let constraints = pattern
        .constraints
        .iter()
        .map(|constraint| render_constraint(descriptor, constraint))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(format!(
        "{} : {}( {} )",
        binding.name,
        fact_type,
        constraints.join(", ")
    ))
}

fn render_constraint(
    descriptor: &QueryDescriptor,
    constraint: &Constraint,
) -> Result<String, PlanError> {
    match constraint {
        Constraint::Table { table } => Ok(format!("table == \"{}\"", table)),
        Constraint::Join(join) => {
            let other = descriptor.variable(join.other_variable)?;
            Ok(format!(
                "get(\"{}\") {} {}.get(\"{}\")",
                join.field,
                join.operator.symbol(),
                other.name,
                join.other_field
            ))
        }
    }
}
