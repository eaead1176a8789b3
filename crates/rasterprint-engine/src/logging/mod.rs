//! Logging utilities.
//!
//! Centralizes logger initialization. Library code only uses the `log`
//! facade; binaries and tests opt into `env_logger` through `init_logging`.

mod init;

pub use init::{DEFAULT_FILTER, LoggingConfig, init_logging};
