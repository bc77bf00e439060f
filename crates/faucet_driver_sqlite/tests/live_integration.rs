use faucet_core::types::{
    ConnectionConfig, CountRequest, DeleteRequest, InsertRequest, SelectRequest, UpdateRequest,
};
use faucet_core::{Connector, Value};
use faucet_driver_sqlite::SqliteConnector;

fn connect_sqlite() -> faucet_core::Result<SqliteConnector> {
    faucet_test_support::init_test_logging();
    let cfg = ConnectionConfig {
        driver: "sqlite".into(),
        dsn: ":memory:".into(),
        schema_name: None,
        pool: Default::default(),
        private_key_path: None,
    };

    let mut connector = SqliteConnector::new();
    connector.connect(&cfg)?;
    connector.ping()?;
    Ok(connector)
}

#[test]
fn sqlite_connect_ping_query() -> faucet_core::Result<()> {
    let connector = connect_sqlite()?;

    connector.execute(
        "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT NOT NULL)",
        &[],
    )?;
    connector.execute("INSERT INTO users (name) VALUES ('alice')", &[])?;

    let rows = connector.execute("SELECT id, name FROM users", &[])?;
    assert_eq!(rows.len(), 1);

    Ok(())
}

#[test]
fn sqlite_schema_introspection() -> faucet_core::Result<()> {
    let connector = connect_sqlite()?;

    connector.execute(
        "CREATE TABLE test_users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            email TEXT UNIQUE,
            age INTEGER DEFAULT 0
        )",
        &[],
    )?;
    connector.execute(
        "CREATE TABLE test_orders (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL REFERENCES test_users(id),
            amount REAL NOT NULL
        )",
        &[],
    )?;
    connector.execute("CREATE INDEX idx_orders_user_id ON test_orders(user_id)", &[])?;
    connector.execute("CREATE VIEW test_user_view AS SELECT id, name FROM test_users", &[])?;

    let table = connector.introspect_table("test_users")?;
    assert_eq!(table.name, "test_users");
    assert!(table.columns.len() >= 4);

    let id_col = table.columns.iter().find(|c| c.name == "id").expect("id column");
    assert!(id_col.is_primary_key);
    assert!(id_col.is_auto_increment);

    let name_col = table.columns.iter().find(|c| c.name == "name").expect("name column");
    assert!(!name_col.nullable);

    let orders = connector.introspect_table("test_orders")?;
    assert!(!orders.foreign_keys.is_empty());
    assert_eq!(orders.foreign_keys[0].referenced_table, "test_users");
    assert!(!orders.indexes.is_empty());

    let view = connector.introspect_table("test_user_view")?;
    assert_eq!(view.kind, faucet_core::types::TableKind::View);

    Ok(())
}

#[test]
fn sqlite_crud_operations() -> faucet_core::Result<()> {
    let connector = connect_sqlite()?;

    connector.execute(
        "CREATE TABLE crud_test (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            value INTEGER DEFAULT 0
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
}

#[test]
fn sqlite_pagination() -> faucet_core::Result<()> {
    let connector = connect_sqlite()?;

    connector.execute(
        "CREATE TABLE browse_test (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT NOT NULL)",
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
}
