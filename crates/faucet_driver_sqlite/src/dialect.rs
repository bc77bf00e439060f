use faucet_core::{PaginationClause, PlaceholderStyle, SqlDialect, Value};

/// SQLite SQL syntax: double-quoted identifiers, `?` placeholders, never
/// schema-qualified, `RETURNING *` on SQLite 3.35+.
pub struct SqliteDialect;

impl SqlDialect for SqliteDialect {
    fn driver_name(&self) -> &'static str {
        "sqlite"
    }

    fn quote_identifier(&self, name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }

    fn qualified_table(&self, _schema: Option<&str>, table: &str) -> String {
        self.quote_identifier(table)
    }

    fn placeholder_style(&self) -> PlaceholderStyle {
        PlaceholderStyle::QuestionMark
    }

    fn supports_returning(&self) -> bool {
        true
    }

    fn supports_upsert(&self) -> bool {
        true
    }

    fn default_schema_name(&self) -> Option<&str> {
        None
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
    fn never_schema_qualifies() {
        let d = SqliteDialect;
        assert_eq!(d.qualified_table(Some("main"), "users"), "\"users\"");
    }
}
