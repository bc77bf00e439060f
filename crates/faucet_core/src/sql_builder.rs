//! Dialect-generic SELECT/INSERT/UPDATE/DELETE/COUNT assembly (§4.3). Every
//! method here is pure: no I/O, no driver handle, every user value becomes
//! a bound parameter via the dialect's placeholder style.

use crate::connector::apply_filter;
use crate::error::{FaucetError, Result};
use crate::identifier::validate_identifier;
use crate::sql_dialect::SqlDialect;
use crate::types::{CountRequest, DeleteRequest, InsertRequest, SelectRequest, UpdateRequest};
use crate::value::Value;

pub struct SqlBuilder<'a> {
    dialect: &'a dyn SqlDialect,
}

impl<'a> SqlBuilder<'a> {
    pub fn new(dialect: &'a dyn SqlDialect) -> Self {
        Self { dialect }
    }

    fn table_ref(&self, table: &str) -> Result<String> {
        if table.is_empty() {
            return Err(FaucetError::invalid_argument("table name must not be empty"));
        }
        Ok(self
            .dialect
            .qualified_table(self.dialect.default_schema_name(), table))
    }

    pub fn build_select(&self, req: &SelectRequest) -> Result<(String, Vec<Value>)> {
        let table = self.table_ref(&req.table)?;

        let fields_sql = if req.fields.is_empty() {
            "*".to_string()
        } else {
            let mut quoted = Vec::with_capacity(req.fields.len());
            for field in &req.fields {
                validate_identifier(field)?;
                quoted.push(self.dialect.quote_identifier(field));
            }
            quoted.join(", ")
        };

        let mut sql = format!("SELECT {fields_sql} FROM {table}");
        let mut params = Vec::new();

        let (filter_fragment, filter_params) = apply_filter(&req.filter);
        if let Some(fragment) = filter_fragment {
            sql.push_str(" WHERE ");
            sql.push_str(fragment);
            params.extend(filter_params);
        }

        let has_order = !req.order.trim().is_empty();
        if has_order {
            sql.push_str(" ORDER BY ");
            sql.push_str(&req.order);
        }

        if let Some(pagination) =
            self.dialect
                .paginate(params.len() + 1, req.limit, req.offset, has_order)
        {
            sql.push_str(&pagination.sql);
            params.extend(pagination.params);
        }

        Ok((sql, params))
    }

    pub fn build_insert(&self, req: &InsertRequest) -> Result<(String, Vec<Value>)> {
        if req.records.is_empty() {
            return Err(FaucetError::invalid_argument(
                "insert requires at least one record",
            ));
        }

        let table = self.table_ref(&req.table)?;

        let mut columns: Vec<String> = req.records[0].iter().map(|(k, _)| k.clone()).collect();
        if columns.is_empty() {
            return Err(FaucetError::invalid_argument(
                "insert record must have at least one field",
            ));
        }
        columns.sort();

        for field in &columns {
            validate_identifier(field)?;
        }

        let expected: std::collections::BTreeSet<&str> =
            columns.iter().map(String::as_str).collect();
        for record in &req.records {
            let actual: std::collections::BTreeSet<&str> =
                record.iter().map(|(k, _)| k.as_str()).collect();
            if actual != expected {
                return Err(FaucetError::invalid_argument(
                    "all records in an insert must share the first record's column set",
                ));
            }
        }

        let column_list = columns
            .iter()
            .map(|c| self.dialect.quote_identifier(c))
            .collect::<Vec<_>>()
            .join(", ");

        let mut params = Vec::new();
        let mut index = 1;
        let mut row_groups = Vec::with_capacity(req.records.len());
        for record in &req.records {
            let by_name: std::collections::BTreeMap<&str, &Value> =
                record.iter().map(|(k, v)| (k.as_str(), v)).collect();
            let mut placeholders = Vec::with_capacity(columns.len());
            for col in &columns {
                let value = by_name
                    .get(col.as_str())
                    .expect("column presence already verified above");
                placeholders.push(self.dialect.parameter_placeholder(index));
                params.push((*value).clone());
                index += 1;
            }
            row_groups.push(format!("({})", placeholders.join(", ")));
        }

        let output_clause = if req.with_returning {
            self.dialect.output_clause()
        } else {
            None
        };

        let mut sql = format!("INSERT INTO {table} ({column_list})");
        if let Some(output) = output_clause {
            sql.push(' ');
            sql.push_str(output);
        }
        sql.push_str(" VALUES ");
        sql.push_str(&row_groups.join(", "));

        if req.with_returning && self.dialect.supports_returning() {
            sql.push_str(" RETURNING *");
        }

        Ok((sql, params))
    }

    pub fn build_update(&self, req: &UpdateRequest) -> Result<(String, Vec<Value>)> {
        if req.record.is_empty() {
            return Err(FaucetError::invalid_argument(
                "update requires at least one field to set",
            ));
        }
        if req.filter.is_none() && req.ids.is_empty() {
            return Err(FaucetError::invalid_argument(
                "update requires a filter or explicit ids; refusing an unbounded update",
            ));
        }

        let table = self.table_ref(&req.table)?;

        let mut set_fields = req.record.clone();
        set_fields.sort_by(|a, b| a.0.cmp(&b.0));

        let mut params = Vec::new();
        let mut index = 1;
        let mut assignments = Vec::with_capacity(set_fields.len());
        for (col, value) in &set_fields {
            validate_identifier(col)?;
            let placeholder = self.dialect.parameter_placeholder(index);
            index += 1;
            assignments.push(format!("{} = {placeholder}", self.dialect.quote_identifier(col)));
            params.push(value.clone());
        }

        let output_clause = if req.with_returning {
            self.dialect.output_clause()
        } else {
            None
        };

        let mut sql = format!("UPDATE {table} SET {}", assignments.join(", "));
        if let Some(output) = output_clause {
            sql.push(' ');
            sql.push_str(output);
        }
        sql.push_str(" WHERE ");
        sql.push_str(&self.build_predicate(&req.filter, &req.ids, &mut index, &mut params)?);

        if req.with_returning && self.dialect.supports_returning() {
            sql.push_str(" RETURNING *");
        }

        Ok((sql, params))
    }

    pub fn build_delete(&self, req: &DeleteRequest) -> Result<(String, Vec<Value>)> {
        if req.filter.is_none() && req.ids.is_empty() {
            return Err(FaucetError::invalid_argument(
                "delete requires a filter or explicit ids; refusing an unbounded delete",
            ));
        }

        let table = self.table_ref(&req.table)?;
        let mut params = Vec::new();
        let mut index = 1;
        let predicate = self.build_predicate(&req.filter, &req.ids, &mut index, &mut params)?;

        let mut sql = format!("DELETE FROM {table} WHERE {predicate}");

        if req.with_returning && self.dialect.supports_returning() {
            sql.push_str(" RETURNING *");
        }

        Ok((sql, params))
    }

    pub fn build_count(&self, req: &CountRequest) -> Result<(String, Vec<Value>)> {
        let table = self.table_ref(&req.table)?;
        let mut sql = format!("SELECT COUNT(*) FROM {table}");
        let (filter_fragment, filter_params) = apply_filter(&req.filter);
        if let Some(fragment) = filter_fragment {
            sql.push_str(" WHERE ");
            sql.push_str(fragment);
        }
        Ok((sql, filter_params))
    }

    /// Combine a pre-compiled filter with an optional `id IN (...)` clause.
    /// The filter (if present) was compiled by the caller starting at
    /// placeholder 1; its params are prepended so `index`/`params` continue
    /// from where the filter left off.
    fn build_predicate(
        &self,
        filter: &Option<crate::types::CompiledFilter>,
        ids: &[Value],
        index: &mut usize,
        params: &mut Vec<Value>,
    ) -> Result<String> {
        let mut parts = Vec::new();

        let (filter_fragment, filter_params) = apply_filter(filter);
        if let Some(fragment) = filter_fragment {
            parts.push(fragment.to_string());
            *index += filter_params.len();
            params.extend(filter_params);
        }

        if !ids.is_empty() {
            let mut placeholders = Vec::with_capacity(ids.len());
            for id in ids {
                placeholders.push(self.dialect.parameter_placeholder(*index));
                *index += 1;
                params.push(id.clone());
            }
            parts.push(format!(
                "{} IN ({})",
                self.dialect.quote_identifier("id"),
                placeholders.join(", ")
            ));
        }

        Ok(parts.join(" AND "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql_dialect::{PaginationClause, PlaceholderStyle};
    use crate::types::CompiledFilter;

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
        fn supports_returning(&self) -> bool {
            true
        }
        fn default_schema_name(&self) -> Option<&str> {
            Some("public")
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

    struct MsSql;

    impl SqlDialect for MsSql {
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
        fn default_schema_name(&self) -> Option<&str> {
            Some("dbo")
        }
        fn output_clause(&self) -> Option<&'static str> {
            Some("OUTPUT INSERTED.*")
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
                sql.push_str(&format!(
                    " FETCH NEXT {} ROWS ONLY",
                    self.parameter_placeholder(idx)
                ));
                params.push(Value::Int64(l as i64));
                let _ = idx;
            }
            Some(PaginationClause { sql, params })
        }
    }

    struct MySql;

    impl SqlDialect for MySql {
        fn driver_name(&self) -> &'static str {
            "mysql"
        }
        fn quote_identifier(&self, name: &str) -> String {
            format!("`{}`", name.replace('`', "``"))
        }
        fn qualified_table(&self, schema: Option<&str>, table: &str) -> String {
            match schema {
                Some(s) => format!("{}.{}", self.quote_identifier(s), self.quote_identifier(table)),
                None => self.quote_identifier(table),
            }
        }
        fn placeholder_style(&self) -> PlaceholderStyle {
            PlaceholderStyle::QuestionMark
        }
        fn default_schema_name(&self) -> Option<&str> {
            Some("testdb")
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

    struct Snowflake;

    impl SqlDialect for Snowflake {
        fn driver_name(&self) -> &'static str {
            "snowflake"
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
            PlaceholderStyle::QuestionMark
        }
        fn default_schema_name(&self) -> Option<&str> {
            Some("PUBLIC")
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

    struct Sqlite;

    impl SqlDialect for Sqlite {
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

    // S1
    #[test]
    fn postgres_select_matches_scenario() {
        let builder = SqlBuilder::new(&Postgres);
        let req = SelectRequest {
            table: "users".into(),
            fields: vec!["id".into(), "name".into()],
            filter: Some(CompiledFilter {
                fragment: "\"age\" > $1 AND \"status\" = $2".into(),
                params: vec![Value::Int64(21), Value::Text("active".into())],
            }),
            order: "\"created_at\" DESC".into(),
            limit: Some(10),
            offset: Some(20),
        };

        let (sql, params) = builder.build_select(&req).unwrap();
        assert_eq!(
            sql,
            "SELECT \"id\", \"name\" FROM \"public\".\"users\" WHERE \"age\" > $1 AND \"status\" = $2 ORDER BY \"created_at\" DESC LIMIT $3 OFFSET $4"
        );
        assert_eq!(
            params,
            vec![
                Value::Int64(21),
                Value::Text("active".into()),
                Value::Int64(10),
                Value::Int64(20),
            ]
        );
    }

    // S2
    #[test]
    fn mysql_insert_matches_scenario() {
        let builder = SqlBuilder::new(&MySql);
        let req = InsertRequest {
            table: "tags".into(),
            records: vec![
                vec![("name".to_string(), Value::Text("go".into()))],
                vec![("name".to_string(), Value::Text("db".into()))],
            ],
            with_returning: false,
        };

        let (sql, params) = builder.build_insert(&req).unwrap();
        assert_eq!(
            sql,
            "INSERT INTO `testdb`.`tags` (`name`) VALUES (?), (?)"
        );
        assert_eq!(
            params,
            vec![Value::Text("go".into()), Value::Text("db".into())]
        );
    }

    // S3
    #[test]
    fn mssql_select_injects_dummy_order_by() {
        let builder = SqlBuilder::new(&MsSql);
        let req = SelectRequest {
            table: "users".into(),
            fields: vec![],
            filter: None,
            order: String::new(),
            limit: Some(10),
            offset: Some(0),
        };

        let (sql, params) = builder.build_select(&req).unwrap();
        assert_eq!(
            sql,
            "SELECT * FROM [dbo].[users] ORDER BY (SELECT NULL) OFFSET @p1 ROWS FETCH NEXT @p2 ROWS ONLY"
        );
        assert_eq!(params, vec![Value::Int64(0), Value::Int64(10)]);
    }

    // S4
    #[test]
    fn snowflake_insert_sorts_columns_lexicographically() {
        let builder = SqlBuilder::new(&Snowflake);
        let req = InsertRequest {
            table: "users".into(),
            records: vec![vec![
                ("zebra".to_string(), Value::Text("z".into())),
                ("apple".to_string(), Value::Text("a".into())),
                ("mango".to_string(), Value::Text("m".into())),
            ]],
            with_returning: false,
        };

        let (sql, params) = builder.build_insert(&req).unwrap();
        assert_eq!(
            sql,
            "INSERT INTO \"PUBLIC\".\"users\" (\"apple\", \"mango\", \"zebra\") VALUES (?, ?, ?)"
        );
        assert_eq!(
            params,
            vec![
                Value::Text("a".into()),
                Value::Text("m".into()),
                Value::Text("z".into()),
            ]
        );
    }

    // S5
    #[test]
    fn sqlite_update_appends_returning() {
        let builder = SqlBuilder::new(&Sqlite);
        let req = UpdateRequest {
            table: "users".into(),
            record: vec![("name".to_string(), Value::Text("x".into()))],
            filter: Some(CompiledFilter {
                fragment: "\"id\" = $1".into(),
                params: vec![Value::Int64(1)],
            }),
            ids: vec![],
            with_returning: true,
        };

        let (sql, _params) = builder.build_update(&req).unwrap();
        assert!(sql.ends_with("RETURNING *"));
    }

    #[test]
    fn update_without_filter_or_ids_is_rejected() {
        let builder = SqlBuilder::new(&Sqlite);
        let req = UpdateRequest {
            table: "users".into(),
            record: vec![("name".to_string(), Value::Text("x".into()))],
            filter: None,
            ids: vec![],
            with_returning: false,
        };

        assert!(builder.build_update(&req).is_err());
    }

    #[test]
    fn delete_without_filter_or_ids_is_rejected() {
        let builder = SqlBuilder::new(&Sqlite);
        let req = DeleteRequest {
            table: "users".into(),
            filter: None,
            ids: vec![],
            with_returning: false,
        };

        assert!(builder.build_delete(&req).is_err());
    }

    #[test]
    fn select_requires_nonempty_table() {
        let builder = SqlBuilder::new(&Postgres);
        let req = SelectRequest {
            table: String::new(),
            ..Default::default()
        };
        assert!(builder.build_select(&req).is_err());
    }

    #[test]
    fn insert_rejects_mismatched_record_columns() {
        let builder = SqlBuilder::new(&Postgres);
        let req = InsertRequest {
            table: "t".into(),
            records: vec![
                vec![("a".to_string(), Value::Int64(1))],
                vec![("b".to_string(), Value::Int64(2))],
            ],
            with_returning: false,
        };
        assert!(builder.build_insert(&req).is_err());
    }

    #[test]
    fn delete_with_ids_continues_numbering_after_filter() {
        let builder = SqlBuilder::new(&Postgres);
        let req = DeleteRequest {
            table: "users".into(),
            filter: Some(CompiledFilter {
                fragment: "\"active\" = $1".into(),
                params: vec![Value::Bool(false)],
            }),
            ids: vec![Value::Int64(7), Value::Int64(8)],
            with_returning: false,
        };

        let (sql, params) = builder.build_delete(&req).unwrap();
        assert_eq!(
            sql,
            "DELETE FROM \"public\".\"users\" WHERE \"active\" = $1 AND \"id\" IN ($2, $3)"
        );
        assert_eq!(
            params,
            vec![Value::Bool(false), Value::Int64(7), Value::Int64(8)]
        );
    }

    #[test]
    fn count_carries_filter_params_only() {
        let builder = SqlBuilder::new(&Postgres);
        let req = CountRequest {
            table: "users".into(),
            filter: Some(CompiledFilter {
                fragment: "\"age\" > $1".into(),
                params: vec![Value::Int64(18)],
            }),
        };
        let (sql, params) = builder.build_count(&req).unwrap();
        assert_eq!(
            sql,
            "SELECT COUNT(*) FROM \"public\".\"users\" WHERE \"age\" > $1"
        );
        assert_eq!(params, vec![Value::Int64(18)]);
    }
}
