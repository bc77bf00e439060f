//! Per-dialect SQL syntax: quoting, placeholders, pagination idioms (§4.1
//! table). Each driver crate provides exactly one `SqlDialect` impl; the
//! generic `faucet_core::sql_builder` module assembles SELECT/INSERT/
//! UPDATE/DELETE/COUNT statements against whichever dialect it is given.

use crate::value::Value;

/// Placeholder style for parameterized queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderStyle {
    /// `?` (MySQL, Snowflake, SQLite).
    QuestionMark,
    /// `$1`, `$2`, ... (PostgreSQL).
    DollarNumber,
    /// `@p1`, `@p2`, ... (SQL Server).
    AtPNumber,
}

/// Result of building a pagination clause: the SQL fragment to append and
/// the params it consumes, in order, starting at the builder's `next_index`.
pub struct PaginationClause {
    pub sql: String,
    pub params: Vec<Value>,
}

/// Database-specific SQL syntax. Implementations carry no connection state
/// and no I/O — every method here is a pure function of its inputs, so the
/// SQL builder that composes them stays pure per §4.1/§4.3.
pub trait SqlDialect: Send + Sync {
    fn driver_name(&self) -> &'static str;

    /// Quote an identifier (table/column name), escaping the dialect's
    /// quote character by doubling it.
    fn quote_identifier(&self, name: &str) -> String;

    /// Build a qualified table reference. SQLite never schema-qualifies
    /// (§4.1): its impl ignores `schema` entirely.
    fn qualified_table(&self, schema: Option<&str>, table: &str) -> String;

    /// Placeholder style for this dialect.
    fn placeholder_style(&self) -> PlaceholderStyle;

    /// Render the Nth (1-based) placeholder.
    fn parameter_placeholder(&self, index: usize) -> String {
        match self.placeholder_style() {
            PlaceholderStyle::QuestionMark => "?".to_string(),
            PlaceholderStyle::DollarNumber => format!("${index}"),
            PlaceholderStyle::AtPNumber => format!("@p{index}"),
        }
    }

    /// Whether INSERT/UPDATE/DELETE can append a RETURNING-equivalent
    /// clause (Postgres `RETURNING *`, SQLite 3.35+ `RETURNING *`).
    /// SQL Server uses `OUTPUT INSERTED.*` instead — see `output_clause`.
    fn supports_returning(&self) -> bool {
        false
    }

    /// SQL Server's `OUTPUT INSERTED.*`, positioned differently per
    /// statement kind; other dialects return `None` and rely on
    /// `supports_returning`.
    fn output_clause(&self) -> Option<&'static str> {
        None
    }

    fn supports_upsert(&self) -> bool {
        false
    }

    /// Default (unqualified) schema name used when `ConnectionConfig.schema_name`
    /// is absent. Borrowed from `&self` rather than `'static` so a connector
    /// can hand back a schema captured from its `ConnectionConfig` at connect
    /// time, not just a dialect-wide constant.
    fn default_schema_name(&self) -> Option<&str> {
        None
    }

    /// Build the pagination clause (LIMIT/OFFSET or OFFSET/FETCH), starting
    /// parameter numbering at `next_index`. `has_order` tells SQL Server
    /// whether it must synthesize `ORDER BY (SELECT NULL)`.
    fn paginate(
        &self,
        next_index: usize,
        limit: Option<u64>,
        offset: Option<u64>,
        has_order: bool,
    ) -> Option<PaginationClause>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Ansi;

    impl SqlDialect for Ansi {
        fn driver_name(&self) -> &'static str {
            "ansi"
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
            next_index: usize,
            limit: Option<u64>,
            offset: Option<u64>,
            _has_order: bool,
        ) -> Option<PaginationClause> {
            if limit.is_none() && offset.is_none() {
                return None;
            }
            let mut sql = String::new();
            let mut params = Vec::new();
            let mut idx = next_index;
            if let Some(l) = limit {
                sql.push_str(&format!(" LIMIT {}", self.parameter_placeholder(idx)));
                params.push(Value::Int64(l as i64));
                idx += 1;
            }
            if let Some(o) = offset {
                sql.push_str(&format!(" OFFSET {}", self.parameter_placeholder(idx)));
                params.push(Value::Int64(o as i64));
            }
            Some(PaginationClause { sql, params })
        }
    }

    #[test]
    fn quote_identifier_escapes_quote_char() {
        let d = Ansi;
        assert_eq!(d.quote_identifier("a\"b"), "\"a\"\"b\"");
    }

    #[test]
    fn placeholder_numbering() {
        let d = Ansi;
        assert_eq!(d.parameter_placeholder(1), "$1");
        assert_eq!(d.parameter_placeholder(3), "$3");
    }
}
