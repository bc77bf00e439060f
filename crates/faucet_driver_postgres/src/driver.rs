use std::collections::HashMap;

use faucet_core::types::{
    Column, ColumnChange, ConnectionConfig, CountRequest, DeleteRequest, ForeignKey, IndexSchema,
    InsertRequest, ProcedureParameter, Row, Schema, SelectRequest, StoredProcedure, TableKind,
    TableSchema, UpdateRequest,
};
use faucet_core::{Connector, FaucetError, PaginationClause, PlaceholderStyle, Result, SqlBuilder, SqlDialect, Value};
use postgres::NoTls;
use r2d2::Pool;
use r2d2_postgres::PostgresConnectionManager;

use crate::dialect::PostgresDialect;
use crate::values::{as_param_refs, params_to_sql, row_to_columns};

/// Maps Postgres's `information_schema.columns.data_type` strings to the
/// neutral `go_type` vocabulary (§3).
fn go_type_for(pg_type: &str) -> &'static str {
    match pg_type {
        "smallint" | "integer" => "int32",
        "bigint" => "int64",
        "real" => "float32",
        "double precision" | "numeric" => "float64",
        "boolean" => "bool",
        "bytea" => "bytes",
        "timestamp with time zone" | "timestamp without time zone" | "date" | "time"
        | "time with time zone" => "time",
        _ => "string",
    }
}

pub struct PostgresConnector {
    dialect: PostgresDialect,
    pool: Option<Pool<PostgresConnectionManager<NoTls>>>,
}

impl PostgresConnector {
    pub fn new() -> Self {
        Self {
            dialect: PostgresDialect::new(None),
            pool: None,
        }
    }

    fn pool(&self) -> Result<&Pool<PostgresConnectionManager<NoTls>>> {
        self.pool
            .as_ref()
            .ok_or_else(|| FaucetError::connect_failure("not connected"))
    }

    fn schema(&self) -> &str {
        self.dialect.default_schema_name().unwrap_or("public")
    }

    fn run(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        let mut client = self
            .pool()?
            .get()
            .map_err(|e| FaucetError::driver_execution(e.to_string()))?;

        let boxed = params_to_sql(params);
        let refs = as_param_refs(&boxed);

        let rows = client
            .query(sql, &refs)
            .map_err(|e| FaucetError::driver_execution(e.to_string()))?;

        Ok(rows.iter().map(|r| Row::new(row_to_columns(r))).collect())
    }

    fn exec(&self, sql: &str, params: &[Value]) -> Result<u64> {
        let mut client = self
            .pool()?
            .get()
            .map_err(|e| FaucetError::driver_execution(e.to_string()))?;

        let boxed = params_to_sql(params);
        let refs = as_param_refs(&boxed);

        client
            .execute(sql, &refs)
            .map_err(|e| FaucetError::driver_execution(e.to_string()))
    }
}

impl Default for PostgresConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl SqlDialect for PostgresConnector {
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

    fn supports_returning(&self) -> bool {
        self.dialect.supports_returning()
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

impl Connector for PostgresConnector {
    fn connect(&mut self, cfg: &ConnectionConfig) -> Result<()> {
        let pg_config: postgres::Config = cfg
            .dsn
            .parse()
            .map_err(|e: postgres::Error| FaucetError::connect_failure(e.to_string()))?;

        let manager = PostgresConnectionManager::new(pg_config, NoTls);
        let pool = Pool::builder()
            .max_size(cfg.pool.max_open)
            .build(manager)
            .map_err(|e| FaucetError::connect_failure(e.to_string()))?;

        self.dialect = PostgresDialect::new(cfg.schema_name.clone());
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
        let schema = self.schema();
        let table_names = self.get_table_names()?;
        let mut tables = Vec::with_capacity(table_names.len());
        for name in &table_names {
            tables.push(self.introspect_table(name)?);
        }

        let view_rows = self.run(
            "SELECT table_name FROM information_schema.views WHERE table_schema = $1 ORDER BY table_name",
            &[Value::Text(schema.to_string())],
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
        let schema = self.schema();

        let exists = self.run(
            "SELECT table_name, table_type FROM information_schema.tables \
             WHERE table_schema = $1 AND table_name = $2",
            &[Value::Text(schema.to_string()), Value::Text(name.to_string())],
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
                c.column_name,
                c.data_type,
                c.is_nullable = 'YES' as nullable,
                c.column_default,
                c.character_maximum_length,
                c.ordinal_position,
                COALESCE(
                    (SELECT true FROM information_schema.table_constraints tc
                     JOIN information_schema.key_column_usage kcu
                       ON tc.constraint_name = kcu.constraint_name
                      AND tc.table_schema = kcu.table_schema
                     WHERE tc.constraint_type = 'PRIMARY KEY'
                       AND tc.table_schema = c.table_schema
                       AND tc.table_name = c.table_name
                       AND kcu.column_name = c.column_name),
                    false
                ) as is_pk
            FROM information_schema.columns c
            WHERE c.table_schema = $1 AND c.table_name = $2
            ORDER BY c.ordinal_position
            "#,
            &[Value::Text(schema.to_string()), Value::Text(name.to_string())],
        )?;

        let mut columns = Vec::with_capacity(col_rows.len());
        let mut primary_key = Vec::new();
        for row in &col_rows {
            let col_name = match row.get("column_name") {
                Some(Value::Text(s)) => s.clone(),
                _ => continue,
            };
            let sql_type = match row.get("data_type") {
                Some(Value::Text(s)) => s.clone(),
                _ => String::new(),
            };
            let nullable = matches!(row.get("nullable"), Some(Value::Bool(true)));
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
            let is_pk = matches!(row.get("is_pk"), Some(Value::Bool(true)));
            if is_pk {
                primary_key.push(col_name.clone());
            }
            let is_auto_increment = default.as_deref().is_some_and(|d| d.contains("nextval"));

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
                is_auto_increment,
                comment: None,
            });
        }

        let fk_rows = self.run(
            r#"
            SELECT
                kcu.column_name,
                ccu.table_name AS referenced_table,
                ccu.column_name AS referenced_column,
                rc.delete_rule,
                rc.update_rule
            FROM information_schema.table_constraints tc
            JOIN information_schema.key_column_usage kcu
              ON tc.constraint_name = kcu.constraint_name AND tc.table_schema = kcu.table_schema
            JOIN information_schema.constraint_column_usage ccu
              ON tc.constraint_name = ccu.constraint_name AND tc.table_schema = ccu.table_schema
            JOIN information_schema.referential_constraints rc
              ON tc.constraint_name = rc.constraint_name AND tc.constraint_schema = rc.constraint_schema
            WHERE tc.constraint_type = 'FOREIGN KEY'
              AND tc.table_schema = $1 AND tc.table_name = $2
            "#,
            &[Value::Text(schema.to_string()), Value::Text(name.to_string())],
        )?;

        let foreign_keys = fk_rows
            .iter()
            .filter_map(|row| {
                let column_name = match row.get("column_name") {
                    Some(Value::Text(s)) => s.clone(),
                    _ => return None,
                };
                let referenced_table = match row.get("referenced_table") {
                    Some(Value::Text(s)) => s.clone(),
                    _ => return None,
                };
                let referenced_column = match row.get("referenced_column") {
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

        let idx_rows = self.run(
            r#"
            SELECT
                i.relname AS index_name,
                a.attname AS column_name,
                ix.indisunique,
                ix.indisprimary
            FROM pg_index ix
            JOIN pg_class t ON t.oid = ix.indrelid
            JOIN pg_class i ON i.oid = ix.indexrelid
            JOIN pg_namespace n ON n.oid = t.relnamespace
            JOIN pg_attribute a ON a.attrelid = t.oid AND a.attnum = ANY(ix.indkey)
            WHERE n.nspname = $1 AND t.relname = $2
            ORDER BY i.relname, a.attnum
            "#,
            &[Value::Text(schema.to_string()), Value::Text(name.to_string())],
        )?;

        let mut indexes_map: HashMap<String, IndexSchema> = HashMap::new();
        for row in &idx_rows {
            let idx_name = match row.get("index_name") {
                Some(Value::Text(s)) => s.clone(),
                _ => continue,
            };
            let col_name = match row.get("column_name") {
                Some(Value::Text(s)) => s.clone(),
                _ => continue,
            };
            let is_unique = matches!(row.get("indisunique"), Some(Value::Bool(true)));
            let is_primary = matches!(row.get("indisprimary"), Some(Value::Bool(true)));
            indexes_map
                .entry(idx_name.clone())
                .or_insert_with(|| IndexSchema {
                    name: idx_name,
                    columns: Vec::new(),
                    is_unique,
                    is_primary,
                })
                .columns
                .push(col_name);
        }
        let mut indexes: Vec<IndexSchema> = indexes_map.into_values().collect();
        indexes.sort_by(|a, b| a.name.cmp(&b.name));

        let row_count = self
            .run(
                &format!(
                    "SELECT COUNT(*) AS n FROM {}",
                    self.qualified_table(Some(schema), name)
                ),
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
        let schema = self.schema();
        let rows = self.run(
            "SELECT table_name FROM information_schema.tables \
             WHERE table_type = 'BASE TABLE' AND table_schema = $1 ORDER BY table_name",
            &[Value::Text(schema.to_string())],
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
        let schema = self.schema();
        let rows = self.run(
            r#"
            SELECT routine_name, data_type
            FROM information_schema.routines
            WHERE routine_schema = $1
            ORDER BY routine_name
            "#,
            &[Value::Text(schema.to_string())],
        )?;

        let mut procedures = Vec::with_capacity(rows.len());
        for row in &rows {
            let name = match row.get("routine_name") {
                Some(Value::Text(s)) => s.clone(),
                _ => continue,
            };
            let returns = match row.get("data_type") {
                Some(Value::Text(s)) if s != "void" => Some(s.clone()),
                _ => None,
            };

            let param_rows = self.run(
                r#"
                SELECT parameter_name, data_type, parameter_mode
                FROM information_schema.parameters
                WHERE specific_schema = $1 AND specific_name = (
                    SELECT specific_name FROM information_schema.routines
                    WHERE routine_schema = $1 AND routine_name = $2
                    LIMIT 1
                )
                ORDER BY ordinal_position
                "#,
                &[Value::Text(schema.to_string()), Value::Text(name.clone())],
            )?;

            let parameters = param_rows
                .iter()
                .filter_map(|p| {
                    let pname = match p.get("parameter_name") {
                        Some(Value::Text(s)) => s.clone(),
                        _ => return None,
                    };
                    let sql_type = match p.get("data_type") {
                        Some(Value::Text(s)) => s.clone(),
                        _ => String::new(),
                    };
                    let mode = match p.get("parameter_mode") {
                        Some(Value::Text(s)) if s == "OUT" => {
                            faucet_core::types::ParameterMode::Out
                        }
                        Some(Value::Text(s)) if s == "INOUT" => {
                            faucet_core::types::ParameterMode::InOut
                        }
                        _ => faucet_core::types::ParameterMode::In,
                    };
                    Some(ProcedureParameter {
                        name: pname,
                        sql_type,
                        mode,
                    })
                })
                .collect();

            procedures.push(StoredProcedure {
                name,
                parameters,
                returns,
            });
        }

        Ok(procedures)
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
            let mut def = format!(
                "{} {}",
                self.quote_identifier(&col.name),
                col.sql_type
            );
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

        let sql = format!(
            "CREATE TABLE {} ({})",
            self.qualified_table(Some(self.schema()), &schema.name),
            cols.join(", ")
        );
        self.exec(&sql, &[]).map(|_| ())
    }

    fn alter_table(&self, table: &str, changes: &[ColumnChange]) -> Result<()> {
        let qualified = self.qualified_table(Some(self.schema()), table);
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
                    let sql = format!(
                        "ALTER TABLE {} RENAME COLUMN {} TO {}",
                        qualified,
                        self.quote_identifier(from),
                        self.quote_identifier(to)
                    );
                    self.exec(&sql, &[])?;
                    continue;
                }
                ColumnChange::AlterType {
                    column,
                    new_sql_type,
                } => format!(
                    "ALTER COLUMN {} TYPE {}",
                    self.quote_identifier(column),
                    new_sql_type
                ),
                ColumnChange::SetNullable { column, nullable } => format!(
                    "ALTER COLUMN {} {}",
                    self.quote_identifier(column),
                    if *nullable { "DROP NOT NULL" } else { "SET NOT NULL" }
                ),
            };
            let sql = format!("ALTER TABLE {qualified} {clause}");
            self.exec(&sql, &[])?;
        }
        Ok(())
    }

    fn drop_table(&self, table: &str) -> Result<()> {
        let sql = format!(
            "DROP TABLE {}",
            self.qualified_table(Some(self.schema()), table)
        );
        self.exec(&sql, &[]).map(|_| ())
    }

    fn call_procedure(&self, name: &str, params: &[Value]) -> Result<Vec<Row>> {
        let placeholders: Vec<String> = (1..=params.len())
            .map(|i| self.parameter_placeholder(i))
            .collect();
        let sql = format!(
            "SELECT * FROM {}({})",
            self.quote_identifier(name),
            placeholders.join(", ")
        );
        self.run(&sql, params)
    }

    fn execute(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        self.run(sql, params)
    }
}
