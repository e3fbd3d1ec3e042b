pub mod config;
pub mod error;
pub mod resp;
pub mod select;
pub mod store;
pub mod subscriber;
pub mod utils;

#[cfg(test)]
mod mock_store;
pub mod prelude;
