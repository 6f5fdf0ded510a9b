//! Layered configuration: built-in defaults < TOML config file < environment
//! < CLI flags, discovered by searching upward for `.aimo/config.toml`, in
//! the teacher's config-module shape (`discovery`/`builder`/`model`/
//! `validation` submodules).

pub mod discovery;
pub mod env;
pub mod model;
pub mod validation;

use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use std::collections::HashMap;
use std::path::Path;

pub use model::{ConfigSource, LlmConfig, PathsConfig, PersistenceConfig, ThresholdsConfig, Versions};

/// CLI-supplied overrides, populated by the `aimo` binary's `clap` parser.
#[derive(Debug, Clone, Default)]
pub struct CliArgs {
    pub config_path: Option<Utf8PathBuf>,
    pub vendor: Option<String>,
    pub db_path: Option<Utf8PathBuf>,
    pub output_dir: Option<Utf8PathBuf>,
    pub standard_version: Option<String>,
    pub skip_pin_check: bool,
    pub verbose: bool,
    pub dry_run: bool,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub versions: Versions,
    pub thresholds: ThresholdsConfig,
    pub llm: LlmConfig,
    pub paths: PathsConfig,
    pub persistence: PersistenceConfig,
    pub vendor: String,
    pub standard_version: String,
    pub skip_pin_check_requested: bool,
    pub verbose: bool,
    pub dry_run: bool,
    pub source_attribution: HashMap<String, ConfigSource>,
}

impl Config {
    /// Discover and load configuration, using the current working directory
    /// for config-file discovery when no explicit path is given.
    pub fn discover(cli_args: &CliArgs) -> Result<Self> {
        let start_dir = std::env::current_dir().context("failed to get current directory")?;
        Self::discover_from(&start_dir, cli_args)
    }

    /// Path-driven variant used by tests to avoid relying on the process's
    /// current directory.
    pub fn discover_from(start_dir: &Path, cli_args: &CliArgs) -> Result<Self> {
        let mut attribution = HashMap::new();

        let mut versions = Versions::default();
        let mut thresholds = ThresholdsConfig::default();
        let mut llm = LlmConfig::default();
        let mut paths = PathsConfig::default();
        let mut persistence = PersistenceConfig::default();

        attribution.insert("versions".to_string(), ConfigSource::Defaults);
        attribution.insert("thresholds".to_string(), ConfigSource::Defaults);
        attribution.insert("llm".to_string(), ConfigSource::Defaults);
        attribution.insert("paths".to_string(), ConfigSource::Defaults);
        attribution.insert("persistence".to_string(), ConfigSource::Defaults);

        let config_path = cli_args
            .config_path
            .clone()
            .map(Utf8PathBuf::into_std_path_buf)
            .or_else(|| discovery::discover_config_file_from(start_dir));

        if let Some(path) = &config_path {
            let file_config = discovery::load_config_file(path)?;
            let source = ConfigSource::ConfigFile(
                Utf8PathBuf::from_path_buf(path.clone()).unwrap_or_else(|_| Utf8PathBuf::from(path.to_string_lossy())),
            );

            if let Some(v) = file_config.versions {
                versions = v;
                attribution.insert("versions".to_string(), source.clone());
            }
            if let Some(t) = file_config.thresholds {
                thresholds = t;
                attribution.insert("thresholds".to_string(), source.clone());
            }
            if let Some(l) = file_config.llm {
                llm = l;
                attribution.insert("llm".to_string(), source.clone());
            }
            if let Some(p) = file_config.paths {
                paths = p;
                attribution.insert("paths".to_string(), source.clone());
            }
            if let Some(p) = file_config.persistence {
                persistence = p;
                attribution.insert("persistence".to_string(), source.clone());
            }
        }

        let mut vendor = "paloalto".to_string();
        let mut standard_version = crate::DEFAULT_STANDARD_VERSION.to_string();

        if let Some(v) = env::standard_version_override() {
            standard_version = v;
            attribution.insert("standard_version".to_string(), ConfigSource::Env);
        }

        if let Some(v) = &cli_args.vendor {
            vendor = v.clone();
            attribution.insert("vendor".to_string(), ConfigSource::Cli);
        }
        if let Some(v) = &cli_args.standard_version {
            standard_version = v.clone();
            attribution.insert("standard_version".to_string(), ConfigSource::Cli);
        }
        if let Some(v) = &cli_args.db_path {
            paths.db_path = Some(v.clone());
            attribution.insert("paths.db_path".to_string(), ConfigSource::Cli);
        }
        if let Some(v) = &cli_args.output_dir {
            paths.output_dir = Some(v.clone());
            attribution.insert("paths.output_dir".to_string(), ConfigSource::Cli);
        }

        let skip_pin_check_requested = cli_args.skip_pin_check;

        validation::validate_thresholds(&thresholds).context("invalid [thresholds] configuration")?;
        validation::validate_llm(&llm).context("invalid [llm] configuration")?;

        Ok(Config {
            versions,
            thresholds,
            llm,
            paths,
            persistence,
            vendor,
            standard_version,
            skip_pin_check_requested,
            verbose: cli_args.verbose,
            dry_run: cli_args.dry_run,
            source_attribution: attribution,
        })
    }
}
