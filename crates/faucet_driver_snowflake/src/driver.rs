use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use faucet_core::types::{
    Column, ColumnChange, ConnectionConfig, CountRequest, DeleteRequest, ForeignKey, IndexSchema,
    InsertRequest, ParameterMode, ProcedureParameter, Row, Schema, SelectRequest, StoredProcedure,
    TableKind, TableSchema, UpdateRequest,
};
use faucet_core::{Connector, FaucetError, PaginationClause, PlaceholderStyle, Result, SqlBuilder, SqlDialect, Value};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

use crate::auth::mint_jwt;
use crate::dialect::SnowflakeDialect;
use crate::values::{build_bindings, parse_snowflake_value, Binding};

/// Maps Snowflake's `information_schema.columns.data_type` strings to the
/// neutral `go_type` vocabulary (§3).
fn go_type_for(sf_type: &str) -> &'static str {
    match sf_type {
        "NUMBER" | "DECIMAL" | "NUMERIC" => "float64",
        "INT" | "INTEGER" | "BIGINT" | "SMALLINT" | "TINYINT" | "BYTEINT" => "int64",
        "FLOAT" | "FLOAT4" | "FLOAT8" | "DOUBLE" | "DOUBLE PRECISION" | "REAL" => "float64",
        "BOOLEAN" => "bool",
        "BINARY" | "VARBINARY" => "bytes",
        "DATE" | "TIME" | "TIMESTAMP_NTZ" | "TIMESTAMP_LTZ" | "TIMESTAMP_TZ" | "TIMESTAMP" => "time",
        _ => "string",
    }
}

struct ParsedDsn {
    user: String,
    account: String,
    database: String,
    schema: String,
    warehouse: Option<String>,
    role: Option<String>,
}

impl ParsedDsn {
    fn parse(dsn: &str) -> Result<Self> {
        let (credentials, rest) = dsn
            .split_once('@')
            .ok_or_else(|| FaucetError::connect_failure("snowflake dsn missing '@'"))?;
        let user = credentials.split_once(':').map(|(u, _)| u).unwrap_or(credentials).to_string();

        let (path, query) = rest.split_once('?').unwrap_or((rest, ""));
        let mut segments = path.splitn(3, '/');
        let account = segments
            .next()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| FaucetError::connect_failure("snowflake dsn missing account"))?
            .to_string();
        let database = segments.next().unwrap_or("").to_string();
        let schema = segments.next().unwrap_or("").to_string();

        let mut warehouse = None;
        let mut role = None;
        for pair in query.split('&').filter(|p| !p.is_empty()) {
            if let Some((k, v)) = pair.split_once('=') {
                match k {
                    "warehouse" => warehouse = Some(v.to_string()),
                    "role" => role = Some(v.to_string()),
                    _ => {}
                }
            }
        }

        Ok(Self {
            user,
            account,
            database,
            schema,
            warehouse,
            role,
        })
    }
}

#[derive(Serialize)]
struct SqlApiRequestBody<'a> {
    statement: &'a str,
    timeout: Option<u32>,
    database: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    schema: Option<&'a str>,
    warehouse: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    bindings: BTreeMap<String, Binding>,
}

#[derive(Debug, Deserialize, Clone)]
struct PartitionInfo {
    #[serde(rename = "rowCount")]
    row_count: u64,
}

#[derive(Debug, Deserialize, Clone)]
struct ColumnInfo {
    name: String,
    #[serde(rename = "type")]
    row_type: String,
}

#[derive(Debug, Deserialize, Clone)]
struct ResultSetMetaData {
    #[serde(rename = "rowType")]
    columns: Vec<ColumnInfo>,
    #[serde(rename = "partitionInfo", default)]
    partition_info: Vec<PartitionInfo>,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    data: Vec<Vec<Option<String>>>,
    #[serde(rename = "resultSetMetaData")]
    result_set_meta_data: ResultSetMetaData,
}

pub struct SnowflakeConnector {
    dialect: SnowflakeDialect,
    client: Option<Client>,
    account: String,
    user: String,
    database: String,
    schema: String,
    warehouse: String,
    role: Option<String>,
    private_key_pem: Option<String>,
    token_cache: Mutex<Option<(String, Instant)>>,
}

impl SnowflakeConnector {
    pub fn new() -> Self {
        Self {
            dialect: SnowflakeDialect::new(None, None),
            client: None,
            account: String::new(),
            user: String::new(),
            database: String::new(),
            schema: String::new(),
            warehouse: String::new(),
            role: None,
            private_key_pem: None,
            token_cache: Mutex::new(None),
        }
    }

    fn client(&self) -> Result<&Client> {
        self.client.as_ref().ok_or_else(|| FaucetError::connect_failure("not connected"))
    }

    fn account_host(&self) -> String {
        self.account.to_ascii_lowercase().replace('_', "-")
    }

    fn statements_url(&self) -> String {
        format!("https://{}.snowflakecomputing.com/api/v2/statements", self.account_host())
    }

    /// Reuses a cached JWT until it's within a minute of the expiry this
    /// connector itself assigned it in `mint_jwt`.
    fn jwt(&self) -> Result<String> {
        let mut cache = self.token_cache.lock().expect("token cache mutex poisoned");
        if let Some((token, expires_at)) = cache.as_ref() {
            if *expires_at > Instant::now() {
                return Ok(token.clone());
            }
        }

        let pem = self
            .private_key_pem
            .as_deref()
            .ok_or_else(|| FaucetError::connect_failure("not connected"))?;
        let token = mint_jwt(&self.account, &self.user, pem)?;
        *cache = Some((token.clone(), Instant::now() + Duration::from_secs(3300)));
        Ok(token)
    }

    fn run(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        let body = SqlApiRequestBody {
            statement: sql,
            timeout: None,
            database: &self.database,
            schema: if self.schema.is_empty() { None } else { Some(&self.schema) },
            warehouse: &self.warehouse,
            role: self.role.as_deref(),
            bindings: build_bindings(params),
        };

        let jwt = self.jwt()?;
        let response = self
            .client()?
            .post(self.statements_url())
            .query(&[("requestId", uuid::Uuid::new_v4().to_string())])
            .bearer_auth(jwt)
            .header("X-Snowflake-Authorization-Token-Type", "KEYPAIR_JWT")
            .header("Accept", "application/json")
            .json(&body)
            .send()
            .map_err(|e| FaucetError::driver_execution(e.to_string()))?;

        if response.status().as_u16() == 202 {
            return Err(FaucetError::driver_execution(
                "snowflake query exceeded the synchronous execution window (202 Accepted)",
            ));
        }
        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().unwrap_or_default();
            return Err(FaucetError::driver_execution(format!("snowflake api error {status}: {text}")));
        }

        let parsed: QueryResponse = response.json().map_err(|e| FaucetError::driver_execution(e.to_string()))?;

        let partitions = parsed.result_set_meta_data.partition_info.len();
        if partitions > 1 {
            log::warn!(
                "snowflake response spans {partitions} partitions; only the first partition's inline rows were fetched"
            );
        }

        let columns = &parsed.result_set_meta_data.columns;
        let rows = parsed
            .data
            .into_iter()
            .map(|cells| {
                let pairs = cells
                    .into_iter()
                    .zip(columns.iter())
                    .map(|(cell, col)| {
                        (col.name.clone(), parse_snowflake_value(cell.as_deref(), &col.row_type))
                    })
                    .collect();
                Row::new(pairs)
            })
            .collect();

        Ok(rows)
    }

    fn exec(&self, sql: &str, params: &[Value]) -> Result<u64> {
        let rows = self.run(sql, params)?;
        Ok(rows
            .first()
            .and_then(|r| r.0.first())
            .and_then(|(_, v)| match v {
                Value::Int64(n) => Some(*n as u64),
                _ => None,
            })
            .unwrap_or(rows.len() as u64))
    }
}

impl Default for SnowflakeConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl SqlDialect for SnowflakeConnector {
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

impl Connector for SnowflakeConnector {
    fn connect(&mut self, cfg: &ConnectionConfig) -> Result<()> {
        let parsed = ParsedDsn::parse(&cfg.dsn)?;
        let key_path = cfg
            .private_key_path
            .as_ref()
            .ok_or_else(|| FaucetError::connect_failure("snowflake requires private_key_path for key-pair auth"))?;
        let private_key_pem = std::fs::read_to_string(key_path)
            .map_err(|e| FaucetError::connect_failure(format!("reading snowflake private key: {e}")))?;

        let client = Client::builder()
            .build()
            .map_err(|e| FaucetError::connect_failure(e.to_string()))?;

        let schema = cfg.schema_name.clone().unwrap_or_else(|| {
            if parsed.schema.is_empty() {
                "PUBLIC".to_string()
            } else {
                parsed.schema
            }
        });
        self.dialect = SnowflakeDialect::new(Some(parsed.database.clone()), Some(schema.clone()));
        self.client = Some(client);
        self.account = parsed.account;
        self.user = parsed.user;
        self.database = parsed.database;
        self.schema = schema;
        self.warehouse = parsed
            .warehouse
            .ok_or_else(|| FaucetError::connect_failure("snowflake dsn missing warehouse parameter"))?;
        self.role = parsed.role;
        self.private_key_pem = Some(private_key_pem);
        *self.token_cache.lock().expect("token cache mutex poisoned") = None;
        Ok(())
    }

    fn disconnect(&mut self) -> Result<()> {
        self.client = None;
        *self.token_cache.lock().expect("token cache mutex poisoned") = None;
        Ok(())
    }

    fn ping(&self) -> Result<()> {
        self.run("SELECT 1", &[]).map(|_| ())
    }

    fn introspect_schema(&self) -> Result<Schema> {
        let schema = self.schema.as_str();
        let table_names = self.get_table_names()?;
        let mut tables = Vec::with_capacity(table_names.len());
        for name in &table_names {
            tables.push(self.introspect_table(name)?);
        }

        let view_rows = self.run(
            "SELECT table_name FROM information_schema.views WHERE table_schema = ? ORDER BY table_name",
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
        let schema = self.schema.as_str();

        let exists = self.run(
            "SELECT table_name, table_type FROM information_schema.tables \
             WHERE table_schema = ? AND table_name = ?",
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
                c.is_identity = 'YES' as is_identity,
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
            WHERE c.table_schema = ? AND c.table_name = ?
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
            let is_identity = matches!(row.get("is_identity"), Some(Value::Bool(true)));
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
                is_auto_increment: is_identity,
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
              AND tc.table_schema = ? AND tc.table_name = ?
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

        // Snowflake has no general-purpose secondary index structure (its
        // micro-partition pruning relies on clustering keys instead), so
        // there is nothing here to populate.
        let indexes: Vec<IndexSchema> = Vec::new();

        let row_count = self
            .run(
                &format!("SELECT COUNT(*) AS n FROM {}", self.qualified_table(Some(schema), name)),
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
        let schema = self.schema.as_str();
        let rows = self.run(
            "SELECT table_name FROM information_schema.tables \
             WHERE table_type = 'BASE TABLE' AND table_schema = ? ORDER BY table_name",
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
        let schema = self.schema.as_str();
        let rows = self.run(
            r#"
            SELECT procedure_name, argument_signature, data_type
            FROM information_schema.procedures
            WHERE procedure_schema = ?
            ORDER BY procedure_name
            "#,
            &[Value::Text(schema.to_string())],
        )?;

        let mut procedures = Vec::with_capacity(rows.len());
        for row in &rows {
            let name = match row.get("procedure_name") {
                Some(Value::Text(s)) => s.clone(),
                _ => continue,
            };
            let returns = match row.get("data_type") {
                Some(Value::Text(s)) if !s.is_empty() => Some(s.clone()),
                _ => None,
            };
            let signature = match row.get("argument_signature") {
                Some(Value::Text(s)) => s.clone(),
                _ => String::new(),
            };

            procedures.push(StoredProcedure {
                name,
                parameters: parse_argument_signature(&signature),
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

        let sql = format!(
            "CREATE TABLE {} ({})",
            self.qualified_table(Some(&self.schema), &schema.name),
            cols.join(", ")
        );
        self.exec(&sql, &[]).map(|_| ())
    }

    fn alter_table(&self, table: &str, changes: &[ColumnChange]) -> Result<()> {
        let qualified = self.qualified_table(Some(&self.schema), table);
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
                ColumnChange::RenameColumn { from, to } => format!(
                    "RENAME COLUMN {} TO {}",
                    self.quote_identifier(from),
                    self.quote_identifier(to)
                ),
                ColumnChange::AlterType { column, new_sql_type } => format!(
                    "ALTER COLUMN {} SET DATA TYPE {}",
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
        let sql = format!("DROP TABLE {}", self.qualified_table(Some(&self.schema), table));
        self.exec(&sql, &[]).map(|_| ())
    }

    fn call_procedure(&self, name: &str, params: &[Value]) -> Result<Vec<Row>> {
        let placeholders: Vec<String> = (1..=params.len()).map(|i| self.parameter_placeholder(i)).collect();
        let sql = format!("CALL {}({})", self.quote_identifier(name), placeholders.join(", "));
        self.run(&sql, params)
    }

    fn execute(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        self.run(sql, params)
    }
}

/// Best-effort parse of `information_schema.procedures.argument_signature`,
/// e.g. `(ID NUMBER, NAME VARCHAR)`. Mode is always `In`: Snowflake exposes
/// no OUT/INOUT parameters in this view.
fn parse_argument_signature(signature: &str) -> Vec<ProcedureParameter> {
    let inner = signature.trim().trim_start_matches('(').trim_end_matches(')');
    if inner.is_empty() {
        return Vec::new();
    }

    inner
        .split(',')
        .filter_map(|arg| {
            let arg = arg.trim();
            let (name, sql_type) = arg.split_once(' ')?;
            Some(ProcedureParameter {
                name: name.trim().to_string(),
                sql_type: sql_type.trim().to_string(),
                mode: ParameterMode::In,
            })
        })
        .collect()
}
