use faucet_core::types::{ConnectionConfig, DeleteRequest, InsertRequest, SelectRequest, UpdateRequest};
use faucet_core::{Connector, Value};
use faucet_driver_mysql::MysqlConnector;
use faucet_test_support::containers;
use std::time::Duration;

fn connect_mysql(uri: String) -> faucet_core::Result<MysqlConnector> {
    faucet_test_support::init_test_logging();
    let cfg = ConnectionConfig {
        driver: "mysql".into(),
        dsn: uri,
        schema_name: Some("testdb".into()),
        pool: Default::default(),
        private_key_path: None,
    };

    containers::retry_db_operation(Duration::from_secs(30), || {
        let mut connector = MysqlConnector::new();
        connector.connect(&cfg)?;
        connector.ping()?;
        Ok(connector)
    })
}

#[test]
#[ignore = "requires Docker daemon"]
fn mysql_live_connect_and_ping() -> faucet_core::Result<()> {
    containers::with_mysql_url(|uri| {
        let connector = connect_mysql(uri)?;
        let rows = connector.execute("SELECT 1 AS one", &[])?;
        assert_eq!(rows.len(), 1);
        Ok(())
    })
}

#[test]
#[ignore = "requires Docker daemon"]
fn mysql_schema_introspection() -> faucet_core::Result<()> {
    containers::with_mysql_url(|uri| {
        let connector = connect_mysql(uri)?;

        connector.execute(
            "CREATE TABLE test_users (
                id INT AUTO_INCREMENT PRIMARY KEY,
                name VARCHAR(100) NOT NULL,
                email VARCHAR(255) UNIQUE,
                age INT DEFAULT 0
            )",
            &[],
        )?;
        connector.execute(
            "CREATE TABLE test_orders (
                id INT AUTO_INCREMENT PRIMARY KEY,
                user_id INT NOT NULL,
                amount DECIMAL(10, 2) NOT NULL,
                FOREIGN KEY (user_id) REFERENCES test_users(id) ON DELETE CASCADE
            )",
            &[],
        )?;
        connector.execute("CREATE VIEW test_user_view AS SELECT id, name FROM test_users", &[])?;

        let names = connector.get_table_names()?;
        assert!(names.contains(&"test_users".to_string()));

        let table = connector.introspect_table("test_users")?;
        let id_col = table.columns.iter().find(|c| c.name == "id").expect("id column");
        assert!(id_col.is_primary_key);
        assert!(id_col.is_auto_increment);

        let orders = connector.introspect_table("test_orders")?;
        assert!(!orders.foreign_keys.is_empty());
        assert_eq!(orders.foreign_keys[0].referenced_table, "test_users");

        Ok(())
    })
}

#[test]
#[ignore = "requires Docker daemon"]
fn mysql_crud_operations() -> faucet_core::Result<()> {
    containers::with_mysql_url(|uri| {
        let connector = connect_mysql(uri)?;

        connector.execute(
            "CREATE TABLE crud_test (
                id INT AUTO_INCREMENT PRIMARY KEY,
                name VARCHAR(100) NOT NULL,
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
            with_returning: false,
        })?;
        connector.execute(&sql, &params)?;

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
            ids: vec![rows[0].get("id").cloned().unwrap()],
            with_returning: false,
        })?;
        connector.execute(&sql, &params)?;

        let (sql, params) = connector.build_delete(&DeleteRequest {
            table: "crud_test".into(),
            filter: None,
            ids: vec![rows[0].get("id").cloned().unwrap()],
            with_returning: false,
        })?;
        connector.execute(&sql, &params)?;

        let (sql, params) = connector.build_count(&faucet_core::types::CountRequest {
            table: "crud_test".into(),
            filter: None,
        })?;
        let count_rows = connector.execute(&sql, &params)?;
        assert_eq!(count_rows[0].as_map().values().next(), Some(&Value::Int64(0)));

        Ok(())
    })
}
