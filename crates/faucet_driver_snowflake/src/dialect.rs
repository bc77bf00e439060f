use faucet_core::{PaginationClause, PlaceholderStyle, SqlDialect, Value};

/// Snowflake SQL syntax: double-quoted identifiers, `?` bind placeholders,
/// `database.schema.table` qualification, no `RETURNING` clause, ordinary
/// `LIMIT`/`OFFSET` pagination.
pub struct SnowflakeDialect {
    database: Option<String>,
    schema: Option<String>,
}

impl SnowflakeDialect {
    pub fn new(database: Option<String>, schema: Option<String>) -> Self {
        Self { database, schema }
    }

    pub fn database(&self) -> Option<&str> {
        self.database.as_deref()
    }
}

impl SqlDialect for SnowflakeDialect {
    fn driver_name(&self) -> &'static str {
        "snowflake"
    }

    fn quote_identifier(&self, name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }

    fn qualified_table(&self, schema: Option<&str>, table: &str) -> String {
        let mut parts = Vec::with_capacity(3);
        if let Some(db) = &self.database {
            parts.push(self.quote_identifier(db));
        }
        if let Some(s) = schema {
            parts.push(self.quote_identifier(s));
        }
        parts.push(self.quote_identifier(table));
        parts.join(".")
    }

    fn placeholder_style(&self) -> PlaceholderStyle {
        PlaceholderStyle::QuestionMark
    }

    fn default_schema_name(&self) -> Option<&str> {
        self.schema.as_deref()
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qualifies_with_database_and_schema() {
        let d = SnowflakeDialect::new(Some("analytics".into()), Some("public".into()));
        assert_eq!(
            d.qualified_table(Some("public"), "orders"),
            "\"analytics\".\"public\".\"orders\""
        );
    }

    #[test]
    fn omits_database_when_absent() {
        let d = SnowflakeDialect::new(None, Some("public".into()));
        assert_eq!(d.qualified_table(Some("public"), "orders"), "\"public\".\"orders\"");
    }

    #[test]
    fn quote_identifier_doubles_quote_char() {
        let d = SnowflakeDialect::new(None, None);
        assert_eq!(d.quote_identifier("a\"b"), "\"a\"\"b\"");
    }
}
