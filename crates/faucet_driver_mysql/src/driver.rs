use std::collections::HashMap;

use faucet_core::types::{
    Column, ColumnChange, ConnectionConfig, CountRequest, DeleteRequest, ForeignKey, IndexSchema,
    InsertRequest, Row, Schema, SelectRequest, StoredProcedure, TableKind, TableSchema,
    UpdateRequest,
};
use faucet_core::{Connector, FaucetError, PaginationClause, PlaceholderStyle, Result, SqlBuilder, SqlDialect, Value};
use mysql::prelude::Queryable;
use r2d2::Pool;
use r2d2_mysql::MySqlConnectionManager;

use crate::dialect::MysqlDialect;
use crate::values::{from_mysql_value, params_to_mysql};

fn go_type_for(column_type: &str) -> &'static str {
    let base = column_type.split('(').next().unwrap_or(column_type);
    match base {
        "tinyint" | "smallint" | "mediumint" | "int" | "year" => "int32",
        "bigint" => "int64",
        "float" => "float32",
        "double" | "decimal" => "float64",
        "tinyint(1)" | "bool" | "boolean" => "bool",
        "blob" | "tinyblob" | "mediumblob" | "longblob" | "binary" | "varbinary" => "bytes",
        "date" | "datetime" | "timestamp" | "time" => "time",
        _ => "string",
    }
}

pub struct MysqlConnector {
    dialect: MysqlDialect,
    pool: Option<Pool<MySqlConnectionManager>>,
}

impl MysqlConnector {
    pub fn new() -> Self {
        Self {
            dialect: MysqlDialect::new(None),
            pool: None,
        }
    }

    fn pool(&self) -> Result<&Pool<MySqlConnectionManager>> {
        self.pool
            .as_ref()
            .ok_or_else(|| FaucetError::connect_failure("not connected"))
    }

    fn schema(&self) -> Result<&str> {
        self.dialect
            .default_schema_name()
            .ok_or_else(|| FaucetError::invalid_argument("no database selected"))
    }

    fn run(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        let mut conn = self
            .pool()?
            .get()
            .map_err(|e| FaucetError::driver_execution(e.to_string()))?;

        let rows: Vec<mysql::Row> = conn
            .exec(sql, params_to_mysql(params))
            .map_err(|e| FaucetError::driver_execution(e.to_string()))?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let columns: Vec<(String, Value)> = row
                    .columns_ref()
                    .iter()
                    .enumerate()
                    .map(|(i, c)| {
                        let name = c.name_str().to_string();
                        let value = row.as_ref(i).map(from_mysql_value).unwrap_or(Value::Null);
                        (name, value)
                    })
                    .collect();
                Row::new(columns)
            })
            .collect())
    }

    fn exec(&self, sql: &str, params: &[Value]) -> Result<u64> {
        let mut conn = self
            .pool()?
            .get()
            .map_err(|e| FaucetError::driver_execution(e.to_string()))?;

        conn.exec_drop(sql, params_to_mysql(params))
            .map_err(|e| FaucetError::driver_execution(e.to_string()))?;
        Ok(conn.affected_rows())
    }
}

impl Default for MysqlConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl SqlDialect for MysqlConnector {
    fn driver_name(&self) -> &'static str {
        self.dialect.driver_name()
    }

    fn quote_identifier(&self, name: &str) -> String {
        self.dialect.quote_identifier(name)
    }

    fn qualified_table(&self, schema: Option<&str>, table: &str) -> String {
        self.dialect.qualified_table(schema, table)
    }

    fn placeholder_style(&self) -> PlaceholderStyle {
        self.dialect.placeholder_style()
    }

    fn default_schema_name(&self) -> Option<&str> {
        self.dialect.default_schema_name()
    }

    fn paginate(
        &self,
        next_index: usize,
        limit: Option<u64>,
        offset: Option<u64>,
        has_order: bool,
    ) -> Option<PaginationClause> {
        self.dialect.paginate(next_index, limit, offset, has_order)
    }
}

impl Connector for MysqlConnector {
    fn connect(&mut self, cfg: &ConnectionConfig) -> Result<()> {
        let opts = mysql::Opts::from_url(&cfg.dsn)
            .map_err(|e| FaucetError::connect_failure(e.to_string()))?;
        let schema = cfg
            .schema_name
            .clone()
            .or_else(|| opts.get_db_name().map(|s| s.to_string()));

        let manager = MySqlConnectionManager::new(mysql::OptsBuilder::from_opts(opts));
        let pool = Pool::builder()
            .max_size(cfg.pool.max_open)
            .build(manager)
            .map_err(|e| FaucetError::connect_failure(e.to_string()))?;

        self.dialect = MysqlDialect::new(schema);
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

        let schema = self.schema()?.to_string();
        let view_rows = self.run(
            "SELECT table_name FROM information_schema.tables \
             WHERE table_schema = ? AND table_type = 'VIEW' ORDER BY table_name",
            &[Value::Text(schema)],
        )?;
        let mut views = Vec::with_capacity(view_rows.len());
        for row in &view_rows {
            if let Some(Value::Text(name)) = row.get("table_name") {
                views.push(self.introspect_table(name)?);
            }
        }

        let procedures = self.get_stored_procedures()?;

        Ok(Schema::new(tables, views, procedures, Vec::new()))
    }

    fn introspect_table(&self, name: &str) -> Result<TableSchema> {
        let schema = self.schema()?.to_string();

        let exists = self.run(
            "SELECT table_type FROM information_schema.tables WHERE table_schema = ? AND table_name = ?",
            &[Value::Text(schema.clone()), Value::Text(name.to_string())],
        )?;
        let kind = match exists.first().and_then(|r| r.get("table_type")) {
            Some(Value::Text(t)) if t == "VIEW" => TableKind::View,
            Some(_) => TableKind::Table,
            None => {
                let candidates = self.get_table_names().unwrap_or_default();
                return Err(FaucetError::not_found(
                    format!("table {name} not found in schema {schema}"),
                    candidates,
                ));
            }
        };

        let col_rows = self.run(
            r#"
            SELECT
                column_name,
                column_type,
                is_nullable = 'YES' as nullable,
                column_default,
                column_key = 'PRI' as is_pk,
                extra LIKE '%auto_increment%' as is_auto,
                character_maximum_length,
                ordinal_position
            FROM information_schema.columns
            WHERE table_schema = ? AND table_name = ?
            ORDER BY ordinal_position
            "#,
            &[Value::Text(schema.clone()), Value::Text(name.to_string())],
        )?;

        let mut columns = Vec::with_capacity(col_rows.len());
        let mut primary_key = Vec::new();
        for row in &col_rows {
            let col_name = match row.get("column_name") {
                Some(Value::Text(s)) => s.clone(),
                _ => continue,
            };
            let sql_type = match row.get("column_type") {
                Some(Value::Text(s)) => s.clone(),
                _ => String::new(),
            };
            let nullable = matches!(row.get("nullable"), Some(Value::Int64(1)) | Some(Value::Bool(true)));
            let default = match row.get("column_default") {
                Some(Value::Text(s)) => Some(s.clone()),
                _ => None,
            };
            let max_length = match row.get("character_maximum_length") {
                Some(Value::Int64(n)) => Some(*n as u32),
                _ => None,
            };
            let position = match row.get("ordinal_position") {
                Some(Value::Int64(n)) => *n as u32,
                _ => 0,
            };
            let is_pk = matches!(row.get("is_pk"), Some(Value::Int64(1)) | Some(Value::Bool(true)));
            let is_auto = matches!(row.get("is_auto"), Some(Value::Int64(1)) | Some(Value::Bool(true)));
            if is_pk {
                primary_key.push(col_name.clone());
            }

            let go_type = go_type_for(&sql_type);
            columns.push(Column {
                name: col_name,
                position,
                sql_type,
                go_type: go_type.to_string(),
                json_type: faucet_core::types::json_type_for(go_type).to_string(),
                nullable,
                default,
                max_length,
                is_primary_key: is_pk,
                is_auto_increment: is_auto,
                comment: None,
            });
        }

        let fk_rows = self.run(
            r#"
            SELECT
                kcu.column_name,
                kcu.referenced_table_name,
                kcu.referenced_column_name,
                rc.delete_rule,
                rc.update_rule
            FROM information_schema.key_column_usage kcu
            JOIN information_schema.referential_constraints rc
              ON kcu.constraint_name = rc.constraint_name AND kcu.table_schema = rc.constraint_schema
            WHERE kcu.table_schema = ? AND kcu.table_name = ? AND kcu.referenced_table_name IS NOT NULL
            ORDER BY kcu.constraint_name, kcu.ordinal_position
            "#,
            &[Value::Text(schema.clone()), Value::Text(name.to_string())],
        )?;

        let foreign_keys = fk_rows
            .iter()
            .filter_map(|row| {
                let column_name = match row.get("column_name") {
                    Some(Value::Text(s)) => s.clone(),
                    _ => return None,
                };
                let referenced_table = match row.get("referenced_table_name") {
                    Some(Value::Text(s)) => s.clone(),
                    _ => return None,
                };
                let referenced_column = match row.get("referenced_column_name") {
                    Some(Value::Text(s)) => s.clone(),
                    _ => return None,
                };
                let on_delete = match row.get("delete_rule") {
                    Some(Value::Text(s)) => Some(s.clone()),
                    _ => None,
                };
                let on_update = match row.get("update_rule") {
                    Some(Value::Text(s)) => Some(s.clone()),
                    _ => None,
                };
                Some(ForeignKey {
                    name: ForeignKey::synthetic_name(name, &column_name),
                    column_name,
                    referenced_table,
                    referenced_column,
                    on_delete,
                    on_update,
                })
            })
            .collect();

        let show_index_sql = format!("SHOW INDEX FROM {}", self.qualified_table(Some(&schema), name));
        let idx_rows = self.run(&show_index_sql, &[])?;

        let mut indexes_map: HashMap<String, IndexSchema> = HashMap::new();
        for row in &idx_rows {
            let idx_name = match row.get("Key_name") {
                Some(Value::Text(s)) => s.clone(),
                _ => continue,
            };
            let col_name = match row.get("Column_name") {
                Some(Value::Text(s)) => s.clone(),
                _ => continue,
            };
            let non_unique = matches!(row.get("Non_unique"), Some(Value::Int64(n)) if *n != 0);
            indexes_map
                .entry(idx_name.clone())
                .or_insert_with(|| IndexSchema {
                    name: idx_name.clone(),
                    columns: Vec::new(),
                    is_unique: !non_unique,
                    is_primary: idx_name == "PRIMARY",
                })
                .columns
                .push(col_name);
        }
        let mut indexes: Vec<IndexSchema> = indexes_map.into_values().collect();
        indexes.sort_by(|a, b| a.name.cmp(&b.name));

        let row_count = self
            .run(
                &format!("SELECT COUNT(*) AS n FROM {}", self.qualified_table(Some(&schema), name)),
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
        let schema = self.schema()?.to_string();
        let rows = self.run(
            "SELECT table_name FROM information_schema.tables \
             WHERE table_schema = ? AND table_type = 'BASE TABLE' ORDER BY table_name",
            &[Value::Text(schema)],
        )?;

        Ok(rows
            .iter()
            .filter_map(|r| match r.get("table_name") {
                Some(Value::Text(s)) => Some(s.clone()),
                _ => None,
            })
            .collect())
    }

    fn get_stored_procedures(&self) -> Result<Vec<StoredProcedure>> {
        let schema = self.schema()?.to_string();
        let rows = self.run(
            "SELECT routine_name FROM information_schema.routines \
             WHERE routine_schema = ? AND routine_type = 'PROCEDURE' ORDER BY routine_name",
            &[Value::Text(schema)],
        )?;

        Ok(rows
            .iter()
            .filter_map(|r| match r.get("routine_name") {
                Some(Value::Text(s)) => Some(StoredProcedure {
                    name: s.clone(),
                    parameters: Vec::new(),
                    returns: None,
                }),
                _ => None,
            })
            .collect())
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
            if col.is_auto_increment {
                def.push_str(" AUTO_INCREMENT");
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

        let sql = format!(
            "CREATE TABLE {} ({})",
            self.qualified_table(Some(self.schema()?), &schema.name),
            cols.join(", ")
        );
        self.exec(&sql, &[]).map(|_| ())
    }

    fn alter_table(&self, table: &str, changes: &[ColumnChange]) -> Result<()> {
        let qualified = self.qualified_table(Some(self.schema()?), table);
        for change in changes {
            let clause = match change {
                ColumnChange::AddColumn(col) => format!(
                    "ADD COLUMN {} {}{}",
                    self.quote_identifier(&col.name),
                    col.sql_type,
                    if col.nullable { "" } else { " NOT NULL" }
                ),
                ColumnChange::DropColumn(name) => {
                    format!("DROP COLUMN {}", self.quote_identifier(name))
                }
                ColumnChange::RenameColumn { from, to } => {
                    format!(
                        "RENAME COLUMN {} TO {}",
                        self.quote_identifier(from),
                        self.quote_identifier(to)
                    )
                }
                ColumnChange::AlterType { column, new_sql_type } => format!(
                    "MODIFY COLUMN {} {}",
                    self.quote_identifier(column),
                    new_sql_type
                ),
                ColumnChange::SetNullable { column, nullable } => format!(
                    "MODIFY COLUMN {} {}",
                    self.quote_identifier(column),
                    if *nullable { "NULL" } else { "NOT NULL" }
                ),
            };
            let sql = format!("ALTER TABLE {qualified} {clause}");
            self.exec(&sql, &[])?;
        }
        Ok(())
    }

    fn drop_table(&self, table: &str) -> Result<()> {
        let sql = format!("DROP TABLE {}", self.qualified_table(Some(self.schema()?), table));
        self.exec(&sql, &[]).map(|_| ())
    }

    fn call_procedure(&self, name: &str, params: &[Value]) -> Result<Vec<Row>> {
        let placeholders: Vec<String> = (1..=params.len()).map(|_| "?".to_string()).collect();
        let sql = format!("CALL {}({})", self.quote_identifier(name), placeholders.join(", "));
        self.run(&sql, params)
    }

    fn execute(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        self.run(sql, params)
    }
}
