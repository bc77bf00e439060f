//! Walks a filter AST into a parameterized SQL fragment (§4.5 invariants
//! 2-6). Placeholder numbering starts at the caller-supplied `base_index`
//! so the outer statement builder can continue numbering after it.

use super::ast::{CompareOp, Expr, Literal};
use crate::error::Result;
use crate::sql_dialect::SqlDialect;
use crate::types::CompiledFilter;
use crate::value::Value;

struct Compiler<'a> {
    dialect: &'a dyn SqlDialect,
    index: usize,
    params: Vec<Value>,
}

impl<'a> Compiler<'a> {
    fn new(dialect: &'a dyn SqlDialect, base_index: usize) -> Self {
        Self {
            dialect,
            index: base_index,
            params: Vec::new(),
        }
    }

    fn bind(&mut self, value: Value) -> String {
        let placeholder = self.dialect.parameter_placeholder(self.index);
        self.index += 1;
        self.params.push(value);
        placeholder
    }

    fn column(&self, ident: &str) -> String {
        self.dialect.quote_identifier(ident)
    }

    /// Render `expr`, wrapping it in parens only when its own precedence is
    /// lower than `min_prec` requires — e.g. a top-level `a AND b` needs no
    /// parens, but an `OR` nested inside an `AND` does.
    fn compile(&mut self, expr: &Expr, min_prec: u8) -> Result<String> {
        let own_prec = precedence(expr);
        let body = match expr {
            Expr::And(lhs, rhs) => {
                let l = self.compile(lhs, own_prec)?;
                let r = self.compile(rhs, own_prec)?;
                format!("{l} AND {r}")
            }
            Expr::Or(lhs, rhs) => {
                let l = self.compile(lhs, own_prec)?;
                let r = self.compile(rhs, own_prec)?;
                format!("{l} OR {r}")
            }
            Expr::Not(inner) => {
                let i = self.compile(inner, own_prec)?;
                format!("NOT {i}")
            }
            _ => self.compile_leaf(expr)?,
        };

        if own_prec < min_prec {
            Ok(format!("({body})"))
        } else {
            Ok(body)
        }
    }

    fn compile_leaf(&mut self, expr: &Expr) -> Result<String> {
        match expr {
            Expr::Compare { ident, op, value } => {
                let column = self.column(ident);
                let placeholder = self.bind(value.clone().into_value());
                Ok(format!("{column} {} {placeholder}", op_sql(op)))
            }
            Expr::In { ident, values } => {
                let column = self.column(ident);
                let mut placeholders = Vec::with_capacity(values.len());
                for v in values {
                    placeholders.push(self.bind(v.clone().into_value()));
                }
                Ok(format!("{column} IN ({})", placeholders.join(", ")))
            }
            Expr::IsNull { ident, negated } => {
                let column = self.column(ident);
                if *negated {
                    Ok(format!("{column} IS NOT NULL"))
                } else {
                    Ok(format!("{column} IS NULL"))
                }
            }
            Expr::Between { ident, low, high } => {
                let column = self.column(ident);
                let low = self.bind(low.clone().into_value());
                let high = self.bind(high.clone().into_value());
                Ok(format!("{column} BETWEEN {low} AND {high}"))
            }
            Expr::Like {
                ident,
                pattern,
                negated,
            } => {
                let column = self.column(ident);
                let placeholder = self.bind(Value::Text(pattern.clone()));
                if *negated {
                    Ok(format!("{column} NOT LIKE {placeholder}"))
                } else {
                    Ok(format!("{column} LIKE {placeholder}"))
                }
            }
            Expr::Contains { ident, substring } => {
                let column = self.column(ident);
                let wrapped = format!("%{substring}%");
                let placeholder = self.bind(Value::Text(wrapped));
                Ok(format!("{column} LIKE {placeholder}"))
            }
        }
    }
}

/// SQL binding precedence, lowest first. Determines when a subexpression
/// needs parens around it at a given call site.
fn precedence(expr: &Expr) -> u8 {
    match expr {
        Expr::Or(_, _) => 0,
        Expr::And(_, _) => 1,
        Expr::Not(_) => 2,
        _ => 3,
    }
}

fn op_sql(op: &CompareOp) -> &'static str {
    match op {
        CompareOp::Eq => "=",
        CompareOp::NotEq => "<>",
        CompareOp::Lt => "<",
        CompareOp::Lte => "<=",
        CompareOp::Gt => ">",
        CompareOp::Gte => ">=",
    }
}

/// Compile an `Expr` into a `CompiledFilter`, numbering placeholders from
/// `base_index` (1-based) per the caller's dialect.
pub fn compile_expr(
    expr: &Expr,
    dialect: &dyn SqlDialect,
    base_index: usize,
) -> Result<CompiledFilter> {
    let mut compiler = Compiler::new(dialect, base_index);
    let fragment = compiler.compile(expr, 0)?;
    Ok(CompiledFilter {
        fragment,
        params: compiler.params,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql_dialect::PlaceholderStyle;
    use crate::sql_dialect::PaginationClause;

    struct Postgres;

    impl SqlDialect for Postgres {
        fn driver_name(&self) -> &'static str {
            "postgres"
        }
        fn quote_identifier(&self, name: &str) -> String {
            format!("\"{}\"", name.replace('"', "\"\""))
        }
        fn qualified_table(&self, schema: Option<&str>, table: &str) -> String {
            match schema {
                Some(s) => format!("{}.{}", self.quote_identifier(s), self.quote_identifier(table)),
                None => self.quote_identifier(table),
            }
        }
        fn placeholder_style(&self) -> PlaceholderStyle {
            PlaceholderStyle::DollarNumber
        }
        fn paginate(
            &self,
            _next_index: usize,
            _limit: Option<u64>,
            _offset: Option<u64>,
            _has_order: bool,
        ) -> Option<PaginationClause> {
            None
        }
    }

    fn parse(input: &str) -> Expr {
        super::super::parser::Parser::parse(input).unwrap()
    }

    #[test]
    fn compiles_simple_comparison_with_base_index() {
        let expr = parse("age > 21");
        let compiled = compile_expr(&expr, &Postgres, 1).unwrap();
        assert_eq!(compiled.fragment, "\"age\" > $1");
        assert_eq!(compiled.params, vec![Value::Float64(21.0)]);
    }

    #[test]
    fn base_index_continues_numbering() {
        let expr = parse("a = 1 AND b = 2");
        let compiled = compile_expr(&expr, &Postgres, 3).unwrap();
        assert_eq!(compiled.fragment, "\"a\" = $3 AND \"b\" = $4");
    }

    #[test]
    fn top_level_and_or_need_no_parens() {
        let expr = parse("a = 1 OR b = 2 AND c = 3");
        let compiled = compile_expr(&expr, &Postgres, 1).unwrap();
        assert_eq!(compiled.fragment, "\"a\" = $1 OR \"b\" = $2 AND \"c\" = $3");
    }

    #[test]
    fn explicit_parens_survive_when_precedence_requires_them() {
        let expr = parse("a = 1 AND (b = 2 OR c = 3)");
        let compiled = compile_expr(&expr, &Postgres, 1).unwrap();
        assert_eq!(
            compiled.fragment,
            "\"a\" = $1 AND (\"b\" = $2 OR \"c\" = $3)"
        );
    }

    #[test]
    fn not_over_compare_needs_no_parens() {
        let expr = parse("NOT a = 1 AND b = 2");
        let compiled = compile_expr(&expr, &Postgres, 1).unwrap();
        assert_eq!(compiled.fragment, "NOT \"a\" = $1 AND \"b\" = $2");
    }

    #[test]
    fn contains_rewrites_to_like_with_wrapped_param() {
        let expr = parse("name CONTAINS 'abc'");
        let compiled = compile_expr(&expr, &Postgres, 1).unwrap();
        assert_eq!(compiled.fragment, "\"name\" LIKE $1");
        assert_eq!(compiled.params, vec![Value::Text("%abc%".into())]);
    }

    #[test]
    fn in_list_allocates_one_placeholder_per_value() {
        let expr = parse("status IN ('a', 'b', 'c')");
        let compiled = compile_expr(&expr, &Postgres, 1).unwrap();
        assert_eq!(compiled.fragment, "\"status\" IN ($1, $2, $3)");
        assert_eq!(compiled.params.len(), 3);
    }

    #[test]
    fn is_null_has_no_params() {
        let expr = parse("deleted_at IS NULL");
        let compiled = compile_expr(&expr, &Postgres, 1).unwrap();
        assert_eq!(compiled.fragment, "\"deleted_at\" IS NULL");
        assert!(compiled.params.is_empty());
    }
}
