use faucet_core::{PaginationClause, PlaceholderStyle, SqlDialect, Value};

/// T-SQL dialect: bracket-quoted identifiers, `@pN` placeholders,
/// `OUTPUT INSERTED.*` instead of `RETURNING`, `OFFSET ... FETCH` pagination
/// that requires an `ORDER BY` (synthesized when the caller supplied none).
pub struct MssqlDialect {
    schema: Option<String>,
}

impl MssqlDialect {
    pub fn new(schema: Option<String>) -> Self {
        Self { schema }
    }
}

impl SqlDialect for MssqlDialect {
    fn driver_name(&self) -> &'static str {
        "mssql"
    }

    fn quote_identifier(&self, name: &str) -> String {
        format!("[{}]", name.replace(']', "]]"))
    }

    fn qualified_table(&self, schema: Option<&str>, table: &str) -> String {
        match schema {
            Some(s) => format!("{}.{}", self.quote_identifier(s), self.quote_identifier(table)),
            None => self.quote_identifier(table),
        }
    }

    fn placeholder_style(&self) -> PlaceholderStyle {
        PlaceholderStyle::AtPNumber
    }

    fn output_clause(&self) -> Option<&'static str> {
        Some("OUTPUT INSERTED.*")
    }

    fn supports_upsert(&self) -> bool {
        true
    }

    fn default_schema_name(&self) -> Option<&str> {
        Some(self.schema.as_deref().unwrap_or("dbo"))
    }

    fn paginate(
        &self,
        next_index: usize,
        limit: Option<u64>,
        offset: Option<u64>,
        has_order: bool,
    ) -> Option<PaginationClause> {
        if limit.is_none() && offset.is_none() {
            return None;
        }

        let mut sql = String::new();
        if !has_order {
            sql.push_str(" ORDER BY (SELECT NULL)");
        }

        let mut params = Vec::new();
        let mut idx = next_index;
        let offset_placeholder = self.parameter_placeholder(idx);
        idx += 1;
        params.push(Value::Int64(offset.unwrap_or(0) as i64));
        sql.push_str(&format!(" OFFSET {offset_placeholder} ROWS"));

        if let Some(l) = limit {
            sql.push_str(&format!(" FETCH NEXT {} ROWS ONLY", self.parameter_placeholder(idx)));
            params.push(Value::Int64(l as i64));
        }

        Some(PaginationClause { sql, params })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_dbo_schema() {
        let d = MssqlDialect::new(None);
        assert_eq!(d.default_schema_name(), Some("dbo"));
    }

    #[test]
    fn respects_configured_schema() {
        let d = MssqlDialect::new(Some("sales".into()));
        assert_eq!(d.default_schema_name(), Some("sales"));
    }

    #[test]
    fn paginate_without_order_synthesizes_order_by() {
        let d = MssqlDialect::new(None);
        let clause = d.paginate(1, Some(10), Some(20), false).unwrap();
        assert_eq!(
            clause.sql,
            " ORDER BY (SELECT NULL) OFFSET @p1 ROWS FETCH NEXT @p2 ROWS ONLY"
        );
        assert_eq!(clause.params, vec![Value::Int64(20), Value::Int64(10)]);
    }
}
