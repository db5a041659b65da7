//! Chainprobe domain layer: the data model shared by the prober core and the
//! CLI. No I/O lives here.
pub mod config;
pub mod errors;
pub mod report;

pub use config::{CliOverrides, Config, ConfigError, LoggingConfig, ProbeConfig};
pub use errors::ProbeError;
pub use report::{ChainReport, ValidationState, ZoneReport};
