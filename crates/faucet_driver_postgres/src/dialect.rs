use faucet_core::{PaginationClause, PlaceholderStyle, SqlDialect, Value};

/// PostgreSQL SQL syntax: double-quoted identifiers, `$N` placeholders,
/// `RETURNING *`, `LIMIT`/`OFFSET` pagination.
pub struct PostgresDialect {
    schema: Option<String>,
}

impl PostgresDialect {
    pub fn new(schema: Option<String>) -> Self {
        Self { schema }
    }
}

impl SqlDialect for PostgresDialect {
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

    fn supports_returning(&self) -> bool {
        true
    }

    fn supports_upsert(&self) -> bool {
        true
    }

    fn default_schema_name(&self) -> Option<&str> {
        Some(self.schema.as_deref().unwrap_or("public"))
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
