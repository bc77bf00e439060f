//! T-SQL dialect and connector for Faucet.

mod dialect;
mod driver;
mod values;

pub use dialect::MssqlDialect;
pub use driver::MssqlConnector;

use faucet_core::{Connector, ConnectorFactory};

pub struct MssqlFactory;

impl ConnectorFactory for MssqlFactory {
    fn driver_name(&self) -> &'static str {
        "mssql"
    }

    fn create(&self) -> Box<dyn Connector> {
        Box::new(MssqlConnector::new())
    }
}
