#![allow(clippy::result_large_err)]

//! The dialect-neutral core of Faucet: connector contract, registry, SQL
//! builder, filter/order/field DSL, introspection types, and the
//! schema-contract drift detector. Driver crates (`faucet_driver_*`)
//! implement [`connector::Connector`] against this crate's types; everything
//! outside the core (REST/MCP hosts, auth, config loading) is a consumer.

pub mod connector;
pub mod contract;
pub mod dsn;
pub mod error;
pub mod filter;
pub mod identifier;
pub mod order_field;
pub mod registry;
pub mod sql_builder;
pub mod sql_dialect;
pub mod types;
pub mod value;

pub use connector::{Connector, ConnectorFactory};
pub use contract::{DriftCategory, DriftItem, DriftReport, DriftType, LockMode, ServiceDriftReport};
pub use error::{FaucetError, Result};
pub use registry::Registry;
pub use sql_builder::SqlBuilder;
pub use sql_dialect::{PaginationClause, PlaceholderStyle, SqlDialect};
pub use value::Value;
