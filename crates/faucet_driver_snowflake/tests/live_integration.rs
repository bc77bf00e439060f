//! Unlike the other drivers, Snowflake has no Docker image to spin up
//! locally: these tests are gated on environment variables pointing at a
//! real (presumably trial/sandbox) account instead of `testcontainers`.
//! They no-op when those variables are unset, rather than failing CI.

use faucet_core::types::{ConnectionConfig, CountRequest, InsertRequest, SelectRequest};
use faucet_core::{Connector, Value};
use faucet_driver_snowflake::SnowflakeConnector;

struct LiveConfig {
    dsn: String,
    private_key_path: String,
}

fn live_config() -> Option<LiveConfig> {
    let dsn = std::env::var("FAUCET_SNOWFLAKE_TEST_DSN").ok()?;
    let private_key_path = std::env::var("FAUCET_SNOWFLAKE_TEST_KEY_PATH").ok()?;
    Some(LiveConfig { dsn, private_key_path })
}

fn connect_snowflake(live: &LiveConfig) -> faucet_core::Result<SnowflakeConnector> {
    faucet_test_support::init_test_logging();
    let cfg = ConnectionConfig {
        driver: "snowflake".into(),
        dsn: live.dsn.clone(),
        schema_name: None,
        pool: Default::default(),
        private_key_path: Some(live.private_key_path.clone()),
    };

    let mut connector = SnowflakeConnector::new();
    connector.connect(&cfg)?;
    connector.ping()?;
    Ok(connector)
}

#[test]
#[ignore = "requires a live Snowflake account; set FAUCET_SNOWFLAKE_TEST_DSN and FAUCET_SNOWFLAKE_TEST_KEY_PATH"]
fn snowflake_live_connect_and_ping() -> faucet_core::Result<()> {
    let Some(live) = live_config() else {
        return Ok(());
    };
    let connector = connect_snowflake(&live)?;
    let rows = connector.execute("SELECT 1 AS one", &[])?;
    assert_eq!(rows.len(), 1);
    Ok(())
}

#[test]
#[ignore = "requires a live Snowflake account; set FAUCET_SNOWFLAKE_TEST_DSN and FAUCET_SNOWFLAKE_TEST_KEY_PATH"]
fn snowflake_crud_and_introspection() -> faucet_core::Result<()> {
    let Some(live) = live_config() else {
        return Ok(());
    };
    let connector = connect_snowflake(&live)?;

    connector.execute(
        "CREATE TABLE IF NOT EXISTS faucet_crud_test (id NUMBER AUTOINCREMENT, name VARCHAR, value NUMBER DEFAULT 0)",
        &[],
    )?;

    let (sql, params) = connector.build_insert(&InsertRequest {
        table: "faucet_crud_test".into(),
        records: vec![vec![
            ("name".into(), Value::Text("alice".into())),
            ("value".into(), Value::Int64(42)),
        ]],
        with_returning: false,
    })?;
    connector.execute(&sql, &params)?;

    let (sql, params) = connector.build_select(&SelectRequest {
        table: "faucet_crud_test".into(),
        fields: vec!["name".into(), "value".into()],
        filter: None,
        order: String::new(),
        limit: None,
        offset: None,
    })?;
    let rows = connector.execute(&sql, &params)?;
    assert!(rows.iter().any(|r| r.get("name") == Some(&Value::Text("alice".into()))));

    let (sql, params) = connector.build_count(&CountRequest {
        table: "faucet_crud_test".into(),
        filter: None,
    })?;
    let count_rows = connector.execute(&sql, &params)?;
    assert!(count_rows[0].as_map().values().next().is_some());

    let table = connector.introspect_table("faucet_crud_test")?;
    assert!(table.columns.iter().any(|c| c.name.eq_ignore_ascii_case("name")));
    assert!(table.indexes.is_empty());

    connector.execute("DROP TABLE faucet_crud_test", &[])?;
    Ok(())
}
