//! CLI command implementations.

mod chat;
mod config;
mod tools;

pub use chat::run_chat;
pub use config::run_config;
pub use tools::run_tools;
