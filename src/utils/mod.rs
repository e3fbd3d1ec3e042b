pub use ready_flag::*;
pub use stop_token::*;

pub mod config_io;
pub mod logger;
mod ready_flag;
mod stop_token;
