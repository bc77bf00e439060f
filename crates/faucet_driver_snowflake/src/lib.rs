//! Snowflake dialect and connector for Faucet, talking to the Snowflake SQL
//! API v2 over HTTPS rather than a native wire protocol.

mod auth;
mod dialect;
mod driver;
mod values;

pub use dialect::SnowflakeDialect;
pub use driver::SnowflakeConnector;

use faucet_core::{Connector, ConnectorFactory};

pub struct SnowflakeFactory;

impl ConnectorFactory for SnowflakeFactory {
    fn driver_name(&self) -> &'static str {
        "snowflake"
    }

    fn create(&self) -> Box<dyn Connector> {
        Box::new(SnowflakeConnector::new())
    }
}
