//! SQLite dialect and connector for Faucet.

mod dialect;
mod driver;
mod values;

pub use dialect::SqliteDialect;
pub use driver::SqliteConnector;

use faucet_core::{Connector, ConnectorFactory};

pub struct SqliteFactory;

impl ConnectorFactory for SqliteFactory {
    fn driver_name(&self) -> &'static str {
        "sqlite"
    }

    fn create(&self) -> Box<dyn Connector> {
        Box::new(SqliteConnector::new())
    }
}
