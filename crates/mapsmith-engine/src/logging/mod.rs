//! Logging setup.
//!
//! Everything in the workspace logs through the `log` facade; this module
//! only decides how the binary installs `env_logger` behind it.

mod init;

pub use init::{init_logging, LoggingConfig, DEFAULT_FILTER};
