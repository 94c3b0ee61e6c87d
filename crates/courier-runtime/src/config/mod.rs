//! Configuration module for the Courier runtime.
//!
//! Layered loading (defaults, files, `COURIER_*` environment variables) and
//! validation of server and logging settings.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile, load_config, load_config_from_file};
pub use schema::{
    CodecKind, CourierConfig, LogFormat, LogLevel, LogOutput, LogRotation, LoggingConfig,
    ServerConfig, SpanEventConfig,
};
pub use validation::validate_config;
