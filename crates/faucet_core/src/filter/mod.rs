//! Filter DSL: tokenize → parse → compile into a parameterized SQL
//! fragment (§4.5). The only public entry point is [`compile`]; the AST and
//! its stages are exposed for the order/field compilers and tests.

mod ast;
mod compiler;
mod lexer;
mod parser;

pub use ast::{CompareOp, Expr, Literal};

use crate::error::Result;
use crate::sql_dialect::SqlDialect;
use crate::types::CompiledFilter;

/// Parse and compile a filter expression string against `dialect`,
/// numbering its placeholders starting at `base_index` (1-based).
///
/// An empty or all-whitespace `input` compiles to an empty fragment with no
/// params, so callers can omit the `WHERE` clause entirely rather than
/// special-case "no filter" above this call.
pub fn compile(input: &str, dialect: &dyn SqlDialect, base_index: usize) -> Result<CompiledFilter> {
    if input.trim().is_empty() {
        return Ok(CompiledFilter::default());
    }
    let expr = parser::Parser::parse(input)?;
    compiler::compile_expr(&expr, dialect, base_index)
}
