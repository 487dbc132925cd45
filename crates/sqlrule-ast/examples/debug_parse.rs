use pest::Parser;
use sqlrule_ast::parser::{Rule, SqlParser};

fn main() {
    let input = std::env::args().nth(1).unwrap_or_else(|| {
        "SELECT * FROM orders o JOIN customers c ON o.custid = c.id".to_string()
    });
    match SqlParser::parse(Rule::query, &input) {
        Ok(pairs) => {
            for pair in pairs {
                print_pair(&pair, 0);
            }
        }
        Err(e) => println!("Error: {}", e),
    }
}

fn print_pair(pair: &pest::iterators::Pair<Rule>, indent: usize) {
    let indent_str = "  ".repeat(indent);
    println!("{}Rule::{:?} = {:?}", indent_str, pair.as_rule(), pair.as_str());
    for inner in pair.clone().into_inner() {
        print_pair(&inner, indent + 1);
    }
}
