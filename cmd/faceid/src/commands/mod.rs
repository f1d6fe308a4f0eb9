//! CLI commands module.

mod cli_config;
mod config;
mod identity;
mod recognize;
mod register;
mod util;

pub use config::ConfigCommand;
pub use identity::{ListCommand, RemoveCommand, ShowCommand};
pub use recognize::RecognizeCommand;
pub use register::RegisterCommand;

// Re-export utils for use in commands
pub(crate) use util::*;
