//! Layered configuration for the AIMO engine: built-in defaults, an
//! optional `.aimo/config.toml`, environment variables, and CLI flags.

pub mod config;

pub use config::{CliArgs, Config, ConfigSource, LlmConfig, PathsConfig, PersistenceConfig, ThresholdsConfig, Versions};

/// The Standard version assumed before any override is applied. The
/// Standard Resolver's own pinned-triple constant (`aimo_standard::pin`) is
/// the authoritative pin; this is only the configuration layer's starting
/// value, carried from the original implementation's
/// `AIMO_STANDARD_VERSION_DEFAULT`.
pub const DEFAULT_STANDARD_VERSION: &str = "0.1.7";
