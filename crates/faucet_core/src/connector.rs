//! The per-dialect connector contract (§4.1). One implementation per
//! dialect; the `Registry` holds them as trait objects.

use crate::error::Result;
use crate::sql_dialect::SqlDialect;
use crate::types::{
    ColumnChange, CompiledFilter, ConnectionConfig, CountRequest, DeleteRequest, InsertRequest,
    Row, Schema, SelectRequest, StoredProcedure, TableSchema, UpdateRequest,
};
use crate::value::Value;

/// A polymorphic capability set implemented per dialect. Builder methods
/// (`build_*`) are pure: no I/O, no driver handle access, values always
/// become bound parameters. I/O methods suspend on their caller's
/// cancellation/deadline handle per §5 — represented here simply as
/// `Result` returns, with cancellation mapped to `FaucetError::Canceled`/
/// `DeadlineExceeded` by the connector's own pool plumbing.
pub trait Connector: SqlDialect {
    /// Open the pool, apply pool knobs, store the effective schema name.
    /// Reachability is NOT verified here; call `ping` for that.
    fn connect(&mut self, cfg: &ConnectionConfig) -> Result<()>;

    /// Close the pool. Safe to call when not connected, and safe to call
    /// twice (invariant 4, §3).
    fn disconnect(&mut self) -> Result<()>;

    /// Round-trip the driver to verify the connection is alive.
    fn ping(&self) -> Result<()>;

    fn introspect_schema(&self) -> Result<Schema>;

    /// Single-table variant; returns `FaucetError::NotFound` when the table
    /// is absent, with the candidate table names attached.
    fn introspect_table(&self, name: &str) -> Result<TableSchema>;

    /// Ordered by name ascending.
    fn get_table_names(&self) -> Result<Vec<String>>;

    fn get_stored_procedures(&self) -> Result<Vec<StoredProcedure>>;

    fn build_select(&self, req: &SelectRequest) -> Result<(String, Vec<Value>)>;
    fn build_insert(&self, req: &InsertRequest) -> Result<(String, Vec<Value>)>;
    fn build_update(&self, req: &UpdateRequest) -> Result<(String, Vec<Value>)>;
    fn build_delete(&self, req: &DeleteRequest) -> Result<(String, Vec<Value>)>;
    fn build_count(&self, req: &CountRequest) -> Result<(String, Vec<Value>)>;

    fn create_table(&self, schema: &TableSchema) -> Result<()>;
    fn alter_table(&self, table: &str, changes: &[ColumnChange]) -> Result<()>;
    fn drop_table(&self, table: &str) -> Result<()>;

    fn call_procedure(&self, name: &str, params: &[Value]) -> Result<Vec<Row>>;

    /// Execute a builder-produced statement and return its rows. Used by
    /// the (external) REST/MCP hosts after calling `build_select` etc.
    fn execute(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>>;
}

/// Factory for creating fresh, not-yet-connected connectors, registered in
/// `Registry` by driver name.
pub trait ConnectorFactory: Send + Sync {
    fn driver_name(&self) -> &'static str;
    fn create(&self) -> Box<dyn Connector>;
}

/// Helper used by `build_select`/`build_count` to splice a pre-compiled
/// filter's SQL fragment and prepend its params, per §4.5 invariant 3:
/// filter placeholders are numbered from `base_index`.
pub fn apply_filter(filter: &Option<CompiledFilter>) -> (Option<&str>, Vec<Value>) {
    match filter {
        Some(f) => (Some(f.fragment.as_str()), f.params.clone()),
        None => (None, Vec::new()),
    }
}
