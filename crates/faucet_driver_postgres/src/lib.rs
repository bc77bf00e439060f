//! PostgreSQL dialect and connector for Faucet.

mod dialect;
mod driver;
mod values;

pub use dialect::PostgresDialect;
pub use driver::PostgresConnector;

use faucet_core::{Connector, ConnectorFactory};

pub struct PostgresFactory;

impl ConnectorFactory for PostgresFactory {
    fn driver_name(&self) -> &'static str {
        "postgres"
    }

    fn create(&self) -> Box<dyn Connector> {
        Box::new(PostgresConnector::new())
    }
}
