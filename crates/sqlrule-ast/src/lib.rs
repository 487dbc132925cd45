//! sqlrule AST - parser and syntax tree for the supported SQL subset

pub mod ast;
pub mod parser;

pub use ast::*;
pub use parser::{parse, ParseError};
