use faucet_core::types::{ConnectionConfig, CountRequest, DeleteRequest, InsertRequest, SelectRequest, UpdateRequest};
use faucet_core::{Connector, Value};
use faucet_driver_postgres::PostgresConnector;
use faucet_test_support::containers;
use std::time::Duration;

fn connect_postgres(uri: String) -> faucet_core::Result<PostgresConnector> {
    faucet_test_support::init_test_logging();
    let cfg = ConnectionConfig {
        driver: "postgres".into(),
        dsn: uri,
        schema_name: Some("public".into()),
        pool: Default::default(),
        private_key_path: None,
    };

    containers::retry_db_operation(Duration::from_secs(30), || {
        let mut connector = PostgresConnector::new();
        connector.connect(&cfg)?;
        connector.ping()?;
        Ok(connector)
    })
}

#[test]
#[ignore = "requires Docker daemon"]
fn postgres_live_connect_and_ping() -> faucet_core::Result<()> {
    containers::with_postgres_url(|uri| {
        let connector = connect_postgres(uri)?;
        let rows = connector.execute("SELECT 1 AS one", &[])?;
        assert_eq!(rows.len(), 1);
        Ok(())
    })
}

#[test]
#[ignore = "requires Docker daemon"]
fn postgres_schema_introspection() -> faucet_core::Result<()> {
    containers::with_postgres_url(|uri| {
        let connector = connect_postgres(uri)?;

        connector.execute(
            "CREATE TABLE test_users (
                id SERIAL PRIMARY KEY,
                name TEXT NOT NULL,
                email TEXT UNIQUE,
                age INT DEFAULT 0
            )",
            &[],
        )?;
        connector.execute(
            "CREATE TABLE test_orders (
                id SERIAL PRIMARY KEY,
                user_id INT NOT NULL REFERENCES test_users(id) ON DELETE CASCADE,
                amount NUMERIC(10, 2) NOT NULL
            )",
            &[],
        )?;
        connector.execute("CREATE INDEX idx_orders_user_id ON test_orders(user_id)", &[])?;
        connector.execute("CREATE VIEW test_user_view AS SELECT id, name FROM test_users", &[])?;

        let names = connector.get_table_names()?;
        assert!(names.contains(&"test_users".to_string()));

        let table = connector.introspect_table("test_users")?;
        let id_col = table.columns.iter().find(|c| c.name == "id").expect("id column");
        assert!(id_col.is_primary_key);

        let orders = connector.introspect_table("test_orders")?;
        assert!(!orders.foreign_keys.is_empty());
        assert_eq!(orders.foreign_keys[0].referenced_table, "test_users");
        assert!(!orders.indexes.is_empty());

        let view = connector.introspect_table("test_user_view")?;
        assert_eq!(view.kind, faucet_core::types::TableKind::View);

        Ok(())
    })
}

#[test]
#[ignore = "requires Docker daemon"]
fn postgres_crud_operations() -> faucet_core::Result<()> {
    containers::with_postgres_url(|uri| {
        let connector = connect_postgres(uri)?;

        connector.execute(
            "CREATE TABLE crud_test (
                id SERIAL PRIMARY KEY,
                name TEXT NOT NULL,
                value INT DEFAULT 0
            )",
            &[],
        )?;

        let (sql, params) = connector.build_insert(&InsertRequest {
            table: "crud_test".into(),
            records: vec![vec![
                ("name".into(), Value::Text("alice".into())),
                ("value".into(), Value::Int64(42)),
            ]],
            with_returning: true,
        })?;
        let inserted = connector.execute(&sql, &params)?;
        assert_eq!(inserted.len(), 1);
        let id = inserted[0].get("id").cloned().unwrap();

        let (sql, params) = connector.build_select(&SelectRequest {
            table: "crud_test".into(),
            fields: vec![],
            filter: None,
            order: String::new(),
            limit: None,
            offset: None,
        })?;
        let rows = connector.execute(&sql, &params)?;
        assert_eq!(rows.len(), 1);

        let (sql, params) = connector.build_update(&UpdateRequest {
            table: "crud_test".into(),
            record: vec![("value".into(), Value::Int64(99))],
            filter: None,
            ids: vec![id.clone()],
            with_returning: false,
        })?;
        connector.execute(&sql, &params)?;

        let (sql, params) = connector.build_select(&SelectRequest {
            table: "crud_test".into(),
            fields: vec!["value".into()],
            filter: None,
            order: String::new(),
            limit: None,
            offset: None,
        })?;
        let rows = connector.execute(&sql, &params)?;
        assert_eq!(rows[0].get("value"), Some(&Value::Int64(99)));

        let (sql, params) = connector.build_delete(&DeleteRequest {
            table: "crud_test".into(),
            filter: None,
            ids: vec![id],
            with_returning: false,
        })?;
        connector.execute(&sql, &params)?;

        let (sql, params) = connector.build_count(&CountRequest {
            table: "crud_test".into(),
            filter: None,
        })?;
        let count_rows = connector.execute(&sql, &params)?;
        assert_eq!(count_rows[0].as_map().values().next(), Some(&Value::Int64(0)));

        Ok(())
    })
}

#[test]
#[ignore = "requires Docker daemon"]
fn postgres_pagination() -> faucet_core::Result<()> {
    containers::with_postgres_url(|uri| {
        let connector = connect_postgres(uri)?;

        connector.execute(
            "CREATE TABLE browse_test (id SERIAL PRIMARY KEY, name TEXT NOT NULL)",
            &[],
        )?;
        for i in 1..=25 {
            connector.execute(
                &format!("INSERT INTO browse_test (name) VALUES ('item_{i}')"),
                &[],
            )?;
        }

        let (sql, params) = connector.build_select(&SelectRequest {
            table: "browse_test".into(),
            fields: vec![],
            filter: None,
            order: "\"id\" ASC".into(),
            limit: Some(10),
            offset: Some(10),
        })?;
        let page2 = connector.execute(&sql, &params)?;
        assert_eq!(page2.len(), 10);
        assert_eq!(page2[0].get("name"), Some(&Value::Text("item_11".into())));

        Ok(())
    })
}
