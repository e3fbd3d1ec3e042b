//! Store-facing collaborators: the transport connection and the database registry.

mod connection;
mod registry;

pub use connection::{Connection, Transport};
pub use registry::{DbConfig, DbRegistry, DbRegistryConfig};
