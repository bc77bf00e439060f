use std::collections::HashMap;

use faucet_core::types::{
    Column, ColumnChange, ConnectionConfig, CountRequest, DeleteRequest, ForeignKey, IndexSchema,
    InsertRequest, Row, Schema, SelectRequest, StoredProcedure, TableKind, TableSchema,
    UpdateRequest,
};
use faucet_core::{Connector, FaucetError, PaginationClause, PlaceholderStyle, Result, SqlBuilder, SqlDialect, Value};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::dialect::SqliteDialect;
use crate::values::{as_param_refs, params_to_sql, row_to_columns};

fn go_type_for(sql_type: &str) -> &'static str {
    let upper = sql_type.to_uppercase();
    if upper.contains("INT") {
        "int64"
    } else if upper.contains("REAL") || upper.contains("FLOA") || upper.contains("DOUB") {
        "float64"
    } else if upper.contains("BLOB") {
        "bytes"
    } else if upper.contains("BOOL") {
        "bool"
    } else if upper.contains("DATE") || upper.contains("TIME") {
        "time"
    } else {
        "string"
    }
}

pub struct SqliteConnector {
    pool: Option<Pool<SqliteConnectionManager>>,
}

impl SqliteConnector {
    pub fn new() -> Self {
        Self { pool: None }
    }

    fn pool(&self) -> Result<&Pool<SqliteConnectionManager>> {
        self.pool
            .as_ref()
            .ok_or_else(|| FaucetError::connect_failure("not connected"))
    }

    fn run(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        let conn = self
            .pool()?
            .get()
            .map_err(|e| FaucetError::driver_execution(e.to_string()))?;

        let mut stmt = conn
            .prepare(sql)
            .map_err(|e| FaucetError::driver_execution(e.to_string()))?;

        let column_names: Vec<String> = stmt.column_names().iter().map(|s| s.to_string()).collect();
        let boxed = params_to_sql(params);
        let refs = as_param_refs(&boxed);

        let rows = stmt
            .query_map(refs.as_slice(), |row| Ok(Row::new(row_to_columns(row, &column_names))))
            .map_err(|e| FaucetError::driver_execution(e.to_string()))?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row.map_err(|e| FaucetError::driver_execution(e.to_string()))?);
        }
        Ok(out)
    }

    fn exec(&self, sql: &str, params: &[Value]) -> Result<u64> {
        let conn = self
            .pool()?
            .get()
            .map_err(|e| FaucetError::driver_execution(e.to_string()))?;

        let boxed = params_to_sql(params);
        let refs = as_param_refs(&boxed);

        conn.execute(sql, refs.as_slice())
            .map(|n| n as u64)
            .map_err(|e| FaucetError::driver_execution(e.to_string()))
    }
}

impl Default for SqliteConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl SqlDialect for SqliteConnector {
    fn driver_name(&self) -> &'static str {
        SqliteDialect.driver_name()
    }

    fn quote_identifier(&self, name: &str) -> String {
        SqliteDialect.quote_identifier(name)
    }

    fn qualified_table(&self, schema: Option<&str>, table: &str) -> String {
        SqliteDialect.qualified_table(schema, table)
    }

    fn placeholder_style(&self) -> PlaceholderStyle {
        SqliteDialect.placeholder_style()
    }

    fn supports_returning(&self) -> bool {
        SqliteDialect.supports_returning()
    }

    fn default_schema_name(&self) -> Option<&str> {
        None
    }

    fn paginate(
        &self,
        next_index: usize,
        limit: Option<u64>,
        offset: Option<u64>,
        has_order: bool,
    ) -> Option<PaginationClause> {
        SqliteDialect.paginate(next_index, limit, offset, has_order)
    }
}

impl Connector for SqliteConnector {
    fn connect(&mut self, cfg: &ConnectionConfig) -> Result<()> {
        let path = cfg.dsn.strip_prefix("file:").unwrap_or(&cfg.dsn);
        let manager = if path == ":memory:" {
            SqliteConnectionManager::memory()
        } else {
            SqliteConnectionManager::file(path)
        };

        let pool = Pool::builder()
            .max_size(cfg.pool.max_open)
            .build(manager)
            .map_err(|e| FaucetError::connect_failure(e.to_string()))?;

        self.pool = Some(pool);
        Ok(())
    }

    fn disconnect(&mut self) -> Result<()> {
        self.pool = None;
        Ok(())
    }

    fn ping(&self) -> Result<()> {
        self.run("SELECT 1", &[]).map(|_| ())
    }

    fn introspect_schema(&self) -> Result<Schema> {
        let table_names = self.get_table_names()?;
        let mut tables = Vec::with_capacity(table_names.len());
        for name in &table_names {
            tables.push(self.introspect_table(name)?);
        }

        let view_rows = self.run(
            "SELECT name FROM sqlite_master WHERE type = 'view' ORDER BY name",
            &[],
        )?;
        let mut views = Vec::with_capacity(view_rows.len());
        for row in &view_rows {
            if let Some(Value::Text(name)) = row.get("name") {
                views.push(self.introspect_table(name)?);
            }
        }

        Ok(Schema::new(tables, views, Vec::new(), Vec::new()))
    }

    fn introspect_table(&self, name: &str) -> Result<TableSchema> {
        let exists = self.run(
            "SELECT type FROM sqlite_master WHERE name = ? AND type IN ('table', 'view')",
            &[Value::Text(name.to_string())],
        )?;
        let kind = match exists.first().and_then(|r| r.get("type")) {
            Some(Value::Text(t)) if t == "view" => TableKind::View,
            Some(_) => TableKind::Table,
            None => {
                let candidates = self.get_table_names().unwrap_or_default();
                return Err(FaucetError::not_found(format!("table {name} not found"), candidates));
            }
        };

        let pragma_table_info = format!("PRAGMA table_info({})", self.quote_identifier(name));
        let col_rows = self.run(&pragma_table_info, &[])?;

        let mut columns = Vec::with_capacity(col_rows.len());
        let mut primary_key = Vec::new();
        for row in &col_rows {
            let col_name = match row.get("name") {
                Some(Value::Text(s)) => s.clone(),
                _ => continue,
            };
            let sql_type = match row.get("type") {
                Some(Value::Text(s)) => s.clone(),
                _ => String::new(),
            };
            let notnull = matches!(row.get("notnull"), Some(Value::Int64(1)));
            let default = match row.get("dflt_value") {
                Some(Value::Text(s)) => Some(s.clone()),
                _ => None,
            };
            let position = match row.get("cid") {
                Some(Value::Int64(n)) => *n as u32 + 1,
                _ => 0,
            };
            let is_pk = matches!(row.get("pk"), Some(Value::Int64(n)) if *n > 0);
            if is_pk {
                primary_key.push(col_name.clone());
            }

            let go_type = go_type_for(&sql_type);
            let is_integer_type = sql_type.to_uppercase().contains("INTEGER");
            columns.push(Column {
                name: col_name,
                position,
                sql_type,
                go_type: go_type.to_string(),
                json_type: faucet_core::types::json_type_for(go_type).to_string(),
                nullable: !notnull,
                default,
                max_length: None,
                is_primary_key: is_pk,
                is_auto_increment: is_pk && is_integer_type,
                comment: None,
            });
        }
        if primary_key.len() > 1 {
            for col in columns.iter_mut().filter(|c| c.is_primary_key) {
                col.is_auto_increment = false;
            }
        }

        let pragma_fk_list = format!("PRAGMA foreign_key_list({})", self.quote_identifier(name));
        let fk_rows = self.run(&pragma_fk_list, &[])?;

        let mut fk_map: HashMap<i64, ForeignKey> = HashMap::new();
        for row in &fk_rows {
            let id = match row.get("id") {
                Some(Value::Int64(n)) => *n,
                _ => continue,
            };
            let referenced_table = match row.get("table") {
                Some(Value::Text(s)) => s.clone(),
                _ => continue,
            };
            let column_name = match row.get("from") {
                Some(Value::Text(s)) => s.clone(),
                _ => continue,
            };
            let referenced_column = match row.get("to") {
                Some(Value::Text(s)) => s.clone(),
                _ => continue,
            };
            let on_update = match row.get("on_update") {
                Some(Value::Text(s)) if s != "NO ACTION" => Some(s.clone()),
                _ => None,
            };
            let on_delete = match row.get("on_delete") {
                Some(Value::Text(s)) if s != "NO ACTION" => Some(s.clone()),
                _ => None,
            };
            fk_map.entry(id).or_insert(ForeignKey {
                name: ForeignKey::synthetic_name(name, &column_name),
                column_name,
                referenced_table,
                referenced_column,
                on_delete,
                on_update,
            });
        }
        let foreign_keys = fk_map.into_values().collect();

        let pragma_index_list = format!("PRAGMA index_list({})", self.quote_identifier(name));
        let idx_rows = self.run(&pragma_index_list, &[])?;

        let mut indexes = Vec::new();
        for row in &idx_rows {
            let idx_name = match row.get("name") {
                Some(Value::Text(s)) => s.clone(),
                _ => continue,
            };
            let is_unique = matches!(row.get("unique"), Some(Value::Int64(1)));
            let pragma_index_info = format!("PRAGMA index_info({})", self.quote_identifier(&idx_name));
            let info_rows = self.run(&pragma_index_info, &[])?;
            let columns: Vec<String> = info_rows
                .iter()
                .filter_map(|r| match r.get("name") {
                    Some(Value::Text(s)) => Some(s.clone()),
                    _ => None,
                })
                .collect();

            indexes.push(IndexSchema {
                name: idx_name,
                columns,
                is_unique,
                is_primary: false,
            });
        }

        let row_count = self
            .run(
                &format!("SELECT COUNT(*) AS n FROM {}", self.quote_identifier(name)),
                &[],
            )
            .ok()
            .and_then(|rows| rows.first().and_then(|r| r.get("n").cloned()))
            .and_then(|v| match v {
                Value::Int64(n) => Some(n as u64),
                _ => None,
            });

        Ok(TableSchema {
            name: name.to_string(),
            kind,
            columns,
            primary_key,
            foreign_keys,
            indexes,
            row_count,
        })
    }

    fn get_table_names(&self) -> Result<Vec<String>> {
        let rows = self.run(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
            &[],
        )?;

        Ok(rows
            .iter()
            .filter_map(|r| match r.get("name") {
                Some(Value::Text(s)) => Some(s.clone()),
                _ => None,
            })
            .collect())
    }

    fn get_stored_procedures(&self) -> Result<Vec<StoredProcedure>> {
        Ok(Vec::new())
    }

    fn build_select(&self, req: &SelectRequest) -> Result<(String, Vec<Value>)> {
        SqlBuilder::new(self).build_select(req)
    }

    fn build_insert(&self, req: &InsertRequest) -> Result<(String, Vec<Value>)> {
        SqlBuilder::new(self).build_insert(req)
    }

    fn build_update(&self, req: &UpdateRequest) -> Result<(String, Vec<Value>)> {
        SqlBuilder::new(self).build_update(req)
    }

    fn build_delete(&self, req: &DeleteRequest) -> Result<(String, Vec<Value>)> {
        SqlBuilder::new(self).build_delete(req)
    }

    fn build_count(&self, req: &CountRequest) -> Result<(String, Vec<Value>)> {
        SqlBuilder::new(self).build_count(req)
    }

    fn create_table(&self, schema: &TableSchema) -> Result<()> {
        let mut cols = Vec::with_capacity(schema.columns.len());
        for col in &schema.columns {
            let mut def = format!("{} {}", self.quote_identifier(&col.name), col.sql_type);
            if !col.nullable {
                def.push_str(" NOT NULL");
            }
            cols.push(def);
        }
        if !schema.primary_key.is_empty() {
            let pk_cols = schema
                .primary_key
                .iter()
                .map(|c| self.quote_identifier(c))
                .collect::<Vec<_>>()
                .join(", ");
            cols.push(format!("PRIMARY KEY ({pk_cols})"));
        }

        let sql = format!("CREATE TABLE {} ({})", self.quote_identifier(&schema.name), cols.join(", "));
        self.exec(&sql, &[]).map(|_| ())
    }

    fn alter_table(&self, table: &str, changes: &[ColumnChange]) -> Result<()> {
        let quoted = self.quote_identifier(table);
        for change in changes {
            match change {
                ColumnChange::AddColumn(col) => {
                    let sql = format!(
                        "ALTER TABLE {quoted} ADD COLUMN {} {}{}",
                        self.quote_identifier(&col.name),
                        col.sql_type,
                        if col.nullable { "" } else { " NOT NULL" }
                    );
                    self.exec(&sql, &[])?;
                }
                ColumnChange::DropColumn(name) => {
                    let sql = format!("ALTER TABLE {quoted} DROP COLUMN {}", self.quote_identifier(name));
                    self.exec(&sql, &[])?;
                }
                ColumnChange::RenameColumn { from, to } => {
                    let sql = format!(
                        "ALTER TABLE {quoted} RENAME COLUMN {} TO {}",
                        self.quote_identifier(from),
                        self.quote_identifier(to)
                    );
                    self.exec(&sql, &[])?;
                }
                ColumnChange::AlterType { .. } | ColumnChange::SetNullable { .. } => {
                    return Err(FaucetError::unsupported(
                        "sqlite cannot alter a column's type or nullability in place",
                    ));
                }
            }
        }
        Ok(())
    }

    fn drop_table(&self, table: &str) -> Result<()> {
        let sql = format!("DROP TABLE {}", self.quote_identifier(table));
        self.exec(&sql, &[]).map(|_| ())
    }

    fn call_procedure(&self, _name: &str, _params: &[Value]) -> Result<Vec<Row>> {
        Err(FaucetError::unsupported("sqlite has no stored procedures"))
    }

    fn execute(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        self.run(sql, params)
    }
}
