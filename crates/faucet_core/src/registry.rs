//! In-process connector registry (§4.2, §5). Readers (`get`, `list_services`)
//! never block each other; `connect`/`disconnect`/`close_all` take exclusive
//! access. No process-wide singleton — callers own an explicit `Registry`.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::connector::{Connector, ConnectorFactory};
use crate::error::{FaucetError, Result};
use crate::types::ConnectionConfig;

pub struct Registry {
    factories: RwLock<HashMap<String, Box<dyn ConnectorFactory>>>,
    services: RwLock<HashMap<String, Box<dyn Connector>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            factories: RwLock::new(HashMap::new()),
            services: RwLock::new(HashMap::new()),
        }
    }

    /// Idempotent: registering the same driver name twice replaces the
    /// factory silently.
    pub fn register_driver(&self, factory: Box<dyn ConnectorFactory>) {
        let name = factory.driver_name().to_string();
        self.factories.write().expect("factories lock poisoned").insert(name, factory);
    }

    /// Connect `service` using the factory registered under `cfg.driver`.
    /// On success, any prior connector for `service` is disconnected first,
    /// then replaced — `get` never observes a half-replaced entry because
    /// both steps happen under the same write lock. On failure the registry
    /// is left unchanged.
    pub fn connect(&self, service: &str, cfg: &ConnectionConfig) -> Result<()> {
        let mut connector = {
            let factories = self.factories.read().expect("factories lock poisoned");
            let factory = factories.get(&cfg.driver).ok_or_else(|| {
                let available: Vec<String> = factories.keys().cloned().collect();
                FaucetError::not_found(
                    format!("driver '{}' is not registered", cfg.driver),
                    available,
                )
            })?;
            factory.create()
        };

        connector.connect(cfg).map_err(|e| {
            FaucetError::connect_failure(format!("connecting service '{service}': {e}"))
        })?;

        let mut services = self.services.write().expect("services lock poisoned");
        if let Some(mut prior) = services.remove(service) {
            let _ = prior.disconnect();
        }
        services.insert(service.to_string(), connector);
        Ok(())
    }

    /// Run `f` against the connector registered for `service` while holding
    /// the registry's read lock, so `Get`/`ListServices` callers never race
    /// a concurrent `Connect`/`Disconnect`.
    pub fn with_connector<R>(&self, service: &str, f: impl FnOnce(&dyn Connector) -> R) -> Result<R> {
        let guard = self.services.read().expect("services lock poisoned");
        match guard.get(service) {
            Some(connector) => Ok(f(connector.as_ref())),
            None => {
                let available: Vec<String> = guard.keys().cloned().collect();
                Err(FaucetError::not_found(
                    format!("service '{service}' is not connected"),
                    available,
                ))
            }
        }
    }

    pub fn contains(&self, service: &str) -> bool {
        self.services
            .read()
            .expect("services lock poisoned")
            .contains_key(service)
    }

    pub fn list_services(&self) -> Vec<String> {
        let guard = self.services.read().expect("services lock poisoned");
        let mut names: Vec<String> = guard.keys().cloned().collect();
        names.sort();
        names
    }

    /// Remove and disconnect `service`. The entry is always removed, even
    /// when the underlying driver's `disconnect` returns an error, so a
    /// caller can retry cleanup without the registry getting stuck.
    pub fn disconnect(&self, service: &str) -> Result<()> {
        let mut services = self.services.write().expect("services lock poisoned");
        match services.remove(service) {
            Some(mut connector) => connector.disconnect(),
            None => Ok(()),
        }
    }

    pub fn close_all(&self) {
        let mut services = self.services.write().expect("services lock poisoned");
        for (_, mut connector) in services.drain() {
            let _ = connector.disconnect();
        }
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql_dialect::{PaginationClause, PlaceholderStyle, SqlDialect};
    use crate::types::{
        ColumnChange, CountRequest, DeleteRequest, InsertRequest, Row, Schema, SelectRequest,
        StoredProcedure, TableSchema, UpdateRequest,
    };
    use crate::value::Value;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct FakeConnector {
        connected: bool,
        disconnect_count: Arc<AtomicUsize>,
    }

    impl SqlDialect for FakeConnector {
        fn driver_name(&self) -> &'static str {
            "fake"
        }
        fn quote_identifier(&self, name: &str) -> String {
            format!("\"{name}\"")
        }
        fn qualified_table(&self, _schema: Option<&str>, table: &str) -> String {
            self.quote_identifier(table)
        }
        fn placeholder_style(&self) -> PlaceholderStyle {
            PlaceholderStyle::QuestionMark
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

    impl Connector for FakeConnector {
        fn connect(&mut self, _cfg: &ConnectionConfig) -> Result<()> {
            self.connected = true;
            Ok(())
        }
        fn disconnect(&mut self) -> Result<()> {
            self.connected = false;
            self.disconnect_count.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        fn ping(&self) -> Result<()> {
            Ok(())
        }
        fn introspect_schema(&self) -> Result<Schema> {
            Ok(Schema::default())
        }
        fn introspect_table(&self, name: &str) -> Result<TableSchema> {
            Err(FaucetError::not_found(format!("table '{name}'"), vec![]))
        }
        fn get_table_names(&self) -> Result<Vec<String>> {
            Ok(vec![])
        }
        fn get_stored_procedures(&self) -> Result<Vec<StoredProcedure>> {
            Ok(vec![])
        }
        fn build_select(&self, _req: &SelectRequest) -> Result<(String, Vec<Value>)> {
            Ok((String::new(), vec![]))
        }
        fn build_insert(&self, _req: &InsertRequest) -> Result<(String, Vec<Value>)> {
            Ok((String::new(), vec![]))
        }
        fn build_update(&self, _req: &UpdateRequest) -> Result<(String, Vec<Value>)> {
            Ok((String::new(), vec![]))
        }
        fn build_delete(&self, _req: &DeleteRequest) -> Result<(String, Vec<Value>)> {
            Ok((String::new(), vec![]))
        }
        fn build_count(&self, _req: &CountRequest) -> Result<(String, Vec<Value>)> {
            Ok((String::new(), vec![]))
        }
        fn create_table(&self, _schema: &TableSchema) -> Result<()> {
            Ok(())
        }
        fn alter_table(&self, _table: &str, _changes: &[ColumnChange]) -> Result<()> {
            Ok(())
        }
        fn drop_table(&self, _table: &str) -> Result<()> {
            Ok(())
        }
        fn call_procedure(&self, _name: &str, _params: &[Value]) -> Result<Vec<Row>> {
            Ok(vec![])
        }
        fn execute(&self, _sql: &str, _params: &[Value]) -> Result<Vec<Row>> {
            Ok(vec![])
        }
    }

    struct FakeFactory {
        disconnect_count: Arc<AtomicUsize>,
    }

    impl ConnectorFactory for FakeFactory {
        fn driver_name(&self) -> &'static str {
            "fake"
        }
        fn create(&self) -> Box<dyn Connector> {
            Box::new(FakeConnector {
                connected: false,
                disconnect_count: self.disconnect_count.clone(),
            })
        }
    }

    fn sample_cfg() -> ConnectionConfig {
        ConnectionConfig {
            driver: "fake".into(),
            dsn: "fake://".into(),
            schema_name: None,
            pool: Default::default(),
            private_key_path: None,
        }
    }

    #[test]
    fn connect_then_get_succeeds() {
        let registry = Registry::new();
        let disconnects = Arc::new(AtomicUsize::new(0));
        registry.register_driver(Box::new(FakeFactory {
            disconnect_count: disconnects.clone(),
        }));

        registry.connect("svc", &sample_cfg()).unwrap();
        assert!(registry.contains("svc"));
    }

    #[test]
    fn connect_with_unregistered_driver_lists_candidates() {
        let registry = Registry::new();
        let mut cfg = sample_cfg();
        cfg.driver = "missing".into();
        let err = registry.connect("svc", &cfg).unwrap_err();
        assert!(matches!(err, FaucetError::NotFound { .. }));
    }

    #[test]
    fn get_unknown_service_lists_candidates() {
        let registry = Registry::new();
        let disconnects = Arc::new(AtomicUsize::new(0));
        registry.register_driver(Box::new(FakeFactory {
            disconnect_count: disconnects.clone(),
        }));
        registry.connect("svc", &sample_cfg()).unwrap();

        let err = registry.with_connector("other", |_| ()).unwrap_err();
        match err {
            FaucetError::NotFound { detail, .. } => {
                assert_eq!(detail.candidates, vec!["svc".to_string()]);
            }
            _ => panic!("expected NotFound"),
        }
    }

    // Testable property 7
    #[test]
    fn replacing_a_connection_disconnects_the_prior_one_exactly_once() {
        let registry = Registry::new();
        let disconnects = Arc::new(AtomicUsize::new(0));
        registry.register_driver(Box::new(FakeFactory {
            disconnect_count: disconnects.clone(),
        }));

        registry.connect("svc", &sample_cfg()).unwrap();
        registry.connect("svc", &sample_cfg()).unwrap();

        assert_eq!(disconnects.load(Ordering::SeqCst), 1);
        assert!(registry.contains("svc"));
    }

    #[test]
    fn disconnect_is_safe_when_not_connected() {
        let registry = Registry::new();
        assert!(registry.disconnect("svc").is_ok());
    }

    #[test]
    fn close_all_removes_every_entry() {
        let registry = Registry::new();
        let disconnects = Arc::new(AtomicUsize::new(0));
        registry.register_driver(Box::new(FakeFactory {
            disconnect_count: disconnects.clone(),
        }));
        registry.connect("a", &sample_cfg()).unwrap();
        registry.connect("b", &sample_cfg()).unwrap();

        registry.close_all();

        assert!(registry.list_services().is_empty());
        assert_eq!(disconnects.load(Ordering::SeqCst), 2);
    }
}
