//! Dialect-neutral data model (§3): schemas, tables, columns, requests, and
//! the connection configuration shared by every driver crate.

use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Full schema dump produced by `Connector::introspect_schema`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Schema {
    #[serde(default)]
    pub tables: Vec<TableSchema>,
    #[serde(default)]
    pub views: Vec<TableSchema>,
    #[serde(default)]
    pub procedures: Vec<StoredProcedure>,
    #[serde(default)]
    pub functions: Vec<StoredProcedure>,
}

impl Schema {
    /// Nil-like empty inputs are already normalized by `Vec`'s own
    /// default-empty representation; this constructor exists so callers
    /// don't need to know that.
    pub fn new(
        tables: Vec<TableSchema>,
        views: Vec<TableSchema>,
        procedures: Vec<StoredProcedure>,
        functions: Vec<StoredProcedure>,
    ) -> Self {
        Self {
            tables,
            views,
            procedures,
            functions,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableKind {
    Table,
    View,
}

/// A single table or view, as introspected from the live database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableSchema {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: TableKind,
    pub columns: Vec<Column>,
    /// Primary key column names, order-significant for composite keys.
    #[serde(default)]
    pub primary_key: Vec<String>,
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKey>,
    #[serde(default)]
    pub indexes: Vec<IndexSchema>,
    pub row_count: Option<u64>,
}

impl TableSchema {
    /// Validate invariants 1-3 of §3: positions distinct & >= 1, PK/FK
    /// column names resolve to real columns.
    pub fn validate(&self) -> Result<(), String> {
        let mut seen_positions = std::collections::HashSet::new();
        for col in &self.columns {
            if col.position < 1 {
                return Err(format!(
                    "column {} has position {} (must be >= 1)",
                    col.name, col.position
                ));
            }
            if !seen_positions.insert(col.position) {
                return Err(format!("duplicate column position {}", col.position));
            }
        }

        let column_names: std::collections::HashSet<&str> =
            self.columns.iter().map(|c| c.name.as_str()).collect();

        for pk in &self.primary_key {
            if !column_names.contains(pk.as_str()) {
                return Err(format!("primary key column {pk} not present in columns"));
            }
        }

        for fk in &self.foreign_keys {
            if !column_names.contains(fk.column_name.as_str()) {
                return Err(format!(
                    "foreign key column {} not present in columns",
                    fk.column_name
                ));
            }
        }

        Ok(())
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }
}

/// A single column, with both the raw dialect type and the derived neutral
/// type (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    /// 1-based, stable w.r.t. introspection order.
    pub position: u32,
    /// Raw dialect type string (e.g. `"varchar(255)"`, `"NUMBER(38,0)"`).
    pub sql_type: String,
    /// Neutral type name: one of int32|int64|float32|float64|string|bool|time|bytes|any.
    pub go_type: String,
    /// JSON-Schema-ish type name derived from `go_type`, for OpenAPI generation.
    pub json_type: String,
    pub nullable: bool,
    pub default: Option<String>,
    pub max_length: Option<u32>,
    pub is_primary_key: bool,
    pub is_auto_increment: bool,
    #[serde(default)]
    pub comment: Option<String>,
}

/// Maps a neutral `go_type` to the JSON Schema type the (external) OpenAPI
/// generator would emit.
pub fn json_type_for(go_type: &str) -> &'static str {
    match go_type {
        "int32" | "int64" | "float32" | "float64" => "number",
        "bool" => "boolean",
        "bytes" => "string",
        "time" => "string",
        "string" => "string",
        _ => "object",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForeignKey {
    pub name: String,
    pub column_name: String,
    pub referenced_table: String,
    pub referenced_column: String,
    pub on_delete: Option<String>,
    pub on_update: Option<String>,
}

impl ForeignKey {
    /// `Name = fk_<table>_<column>` per §3.
    pub fn synthetic_name(table: &str, column: &str) -> String {
        format!("fk_{table}_{column}")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexSchema {
    pub name: String,
    pub columns: Vec<String>,
    pub is_unique: bool,
    pub is_primary: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredProcedure {
    pub name: String,
    #[serde(default)]
    pub parameters: Vec<ProcedureParameter>,
    pub returns: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcedureParameter {
    pub name: String,
    pub sql_type: String,
    pub mode: ParameterMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterMode {
    In,
    Out,
    InOut,
}

/// An ordered row returned from query execution or procedure calls.
/// Preserves column order as returned by the driver.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Row(pub Vec<(String, Value)>);

impl Row {
    pub fn new(columns: Vec<(String, Value)>) -> Self {
        Self(columns)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    pub fn as_map(&self) -> BTreeMap<String, Value> {
        self.0.iter().cloned().collect()
    }
}

// --- Request structs (§4.3) -------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct SelectRequest {
    pub table: String,
    /// Column names to project; empty means `*`.
    pub fields: Vec<String>,
    /// Pre-compiled filter from `faucet_core::filter::compile`.
    pub filter: Option<CompiledFilter>,
    /// Pre-validated `ORDER BY` fragment from `faucet_core::order`.
    pub order: String,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

#[derive(Debug, Clone, Default)]
pub struct InsertRequest {
    pub table: String,
    /// Each record must share the first record's column set; mismatches
    /// are a caller error per §4.3, not handled by the builder.
    pub records: Vec<Vec<(String, Value)>>,
    pub with_returning: bool,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateRequest {
    pub table: String,
    pub record: Vec<(String, Value)>,
    pub filter: Option<CompiledFilter>,
    /// Shorthand: match rows whose literal `id` column is in this list.
    pub ids: Vec<Value>,
    pub with_returning: bool,
}

#[derive(Debug, Clone, Default)]
pub struct DeleteRequest {
    pub table: String,
    pub filter: Option<CompiledFilter>,
    pub ids: Vec<Value>,
    pub with_returning: bool,
}

#[derive(Debug, Clone, Default)]
pub struct CountRequest {
    pub table: String,
    pub filter: Option<CompiledFilter>,
}

/// A filter already compiled to a parameterized SQL fragment and its bound
/// values, produced by `faucet_core::filter::compile`. Builders splice the
/// fragment in verbatim and prepend `params` to their own parameter list.
#[derive(Debug, Clone, Default)]
pub struct CompiledFilter {
    pub fragment: String,
    pub params: Vec<Value>,
}

/// Column-level change for `Connector::alter_table`. Spec.md names
/// `AlterTable` but leaves its change vocabulary unspecified; this follows
/// the teacher's typed-request convention (`AddForeignKeyRequest` etc.).
#[derive(Debug, Clone)]
pub enum ColumnChange {
    AddColumn(Column),
    DropColumn(String),
    RenameColumn { from: String, to: String },
    AlterType { column: String, new_sql_type: String },
    SetNullable { column: String, nullable: bool },
}

/// Pool configuration knobs (§3), shared across dialects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    pub max_open: u32,
    pub max_idle: u32,
    pub max_lifetime_secs: Option<u64>,
    pub max_idle_time_secs: Option<u64>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_open: 10,
            max_idle: 2,
            max_lifetime_secs: None,
            max_idle_time_secs: None,
        }
    }
}

/// Connection parameters handed to `Connector::connect`. Snapshotted at
/// connect time (§5) — later mutation must go through
/// `Registry::connect(service, new_cfg)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    pub driver: String,
    pub dsn: String,
    pub schema_name: Option<String>,
    #[serde(default)]
    pub pool: PoolConfig,
    /// Snowflake JWT key-pair auth.
    pub private_key_path: Option<String>,
}
