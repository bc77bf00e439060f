//! Order-by and field-projection compilers (§4.6). Both take a
//! comma-separated identifier list from the caller and produce a validated,
//! dialect-quoted SQL fragment — never raw user text.

use crate::error::Result;
use crate::sql_dialect::SqlDialect;
use crate::identifier::validate_identifier;

/// Compile an `ORDER BY` expression: `ident [ASC|DESC]` terms separated by
/// commas. Direction defaults to `ASC` when omitted. Returns an empty
/// string for empty input, so callers can splice it in unconditionally.
pub fn compile_order(input: &str, dialect: &dyn SqlDialect) -> Result<String> {
    if input.trim().is_empty() {
        return Ok(String::new());
    }

    let mut terms = Vec::new();
    for raw_term in input.split(',') {
        let term = raw_term.trim();
        if term.is_empty() {
            return Err(crate::error::FaucetError::invalid_argument(
                "order expression contains an empty term",
            ));
        }

        let mut words = term.split_whitespace();
        let ident = words
            .next()
            .ok_or_else(|| crate::error::FaucetError::invalid_argument("missing identifier in order term"))?;
        validate_identifier(ident)?;

        let direction = match words.next() {
            None => "ASC",
            Some(d) if d.eq_ignore_ascii_case("asc") => "ASC",
            Some(d) if d.eq_ignore_ascii_case("desc") => "DESC",
            Some(other) => {
                return Err(crate::error::FaucetError::invalid_argument(format!(
                    "invalid sort direction '{other}', expected ASC or DESC"
                )));
            }
        };

        if words.next().is_some() {
            return Err(crate::error::FaucetError::invalid_argument(format!(
                "unexpected trailing token in order term '{term}'"
            )));
        }

        terms.push(format!("{} {direction}", dialect.quote_identifier(ident)));
    }

    Ok(terms.join(", "))
}

/// Compile a field-projection list: a comma-separated identifier list,
/// deduplicated while preserving first-seen order. Empty input means
/// "all columns" and compiles to `*`.
pub fn compile_fields(input: &str, dialect: &dyn SqlDialect) -> Result<String> {
    if input.trim().is_empty() {
        return Ok("*".to_string());
    }

    let mut seen = std::collections::HashSet::new();
    let mut quoted = Vec::new();
    for raw in input.split(',') {
        let ident = raw.trim();
        if ident.is_empty() {
            return Err(crate::error::FaucetError::invalid_argument(
                "field list contains an empty entry",
            ));
        }
        validate_identifier(ident)?;
        if seen.insert(ident.to_string()) {
            quoted.push(dialect.quote_identifier(ident));
        }
    }

    Ok(quoted.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql_dialect::{PaginationClause, PlaceholderStyle};

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

    #[test]
    fn order_defaults_to_ascending() {
        assert_eq!(compile_order("name", &Postgres).unwrap(), "\"name\" ASC");
    }

    #[test]
    fn order_honors_explicit_direction_case_insensitive() {
        assert_eq!(
            compile_order("name desc, age ASC", &Postgres).unwrap(),
            "\"name\" DESC, \"age\" ASC"
        );
    }

    #[test]
    fn order_rejects_bad_direction() {
        assert!(compile_order("name sideways", &Postgres).is_err());
    }

    #[test]
    fn order_rejects_bad_identifier() {
        assert!(compile_order("name; DROP TABLE x", &Postgres).is_err());
    }

    #[test]
    fn empty_order_is_empty_string() {
        assert_eq!(compile_order("", &Postgres).unwrap(), "");
    }

    #[test]
    fn empty_fields_means_star() {
        assert_eq!(compile_fields("", &Postgres).unwrap(), "*");
    }

    #[test]
    fn fields_dedupe_preserving_order() {
        assert_eq!(
            compile_fields("id, name, id", &Postgres).unwrap(),
            "\"id\", \"name\""
        );
    }

    #[test]
    fn fields_reject_invalid_identifier() {
        assert!(compile_fields("id, 1bad", &Postgres).is_err());
    }
}
