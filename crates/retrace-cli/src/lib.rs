// Retrace CLI Library

pub mod commands;
pub mod config;
pub mod error;
pub mod logging;
pub mod output;
pub mod router;

pub use config::{FileConfig, WatchSettings};
pub use error::{CliError, CliResult};
pub use logging::init_logging;
pub use router::{Cli, CommandRouter, Commands};
