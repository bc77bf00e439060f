//! MySQL dialect and connector for Faucet.

mod dialect;
mod driver;
mod values;

pub use dialect::MysqlDialect;
pub use driver::MysqlConnector;

use faucet_core::{Connector, ConnectorFactory};

pub struct MysqlFactory;

impl ConnectorFactory for MysqlFactory {
    fn driver_name(&self) -> &'static str {
        "mysql"
    }

    fn create(&self) -> Box<dyn Connector> {
        Box::new(MysqlConnector::new())
    }
}
