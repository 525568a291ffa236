//! Runtime configuration
//!
//! Settings are merged from three layers, later layers winning:
//!
//! 1. built-in defaults
//! 2. the config file (`-c FILE`, or `fbstream.ini` / `fbstream.yaml` in the
//!    search path)
//! 3. the command line
//!
//! The merged [`Config`] is validated once and then read by every component.

mod cli;
mod file;

pub use cli::CliArgs;
pub use file::{
    CONFIG_FILE_NAMES, ConfigFormat, FileConfig, GeneralSection, INI_FILE_NAME, StreamSection,
    YAML_FILE_NAME, default_search_dirs, locate_config_file,
};

use clap::Parser;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};
use tracing_subscriber::filter::LevelFilter;

use crate::geometry::{Dimension, GeometryRequest};
use crate::server::DEFAULT_PORT;
use crate::{Result, StreamError};

/// Framebuffer used when none is configured
pub const DEFAULT_DEVICE: &str = "fb1";

/// Where the config file layer came from
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConfigFileStatus {
    /// Parsed from this file
    Loaded(PathBuf),

    /// Nothing found in the search path
    #[default]
    NotFound,

    /// Named on the command line but absent
    Missing(PathBuf),
}

/// Validated process configuration
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub log_level: LevelFilter,
    pub device: String,
    pub width: Dimension,
    pub height: Dimension,
    pub depth: Dimension,
    pub min_threads: usize,
    pub max_threads: usize,
    pub port: u16,
    pub config_file: ConfigFileStatus,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: LevelFilter::INFO,
            device: DEFAULT_DEVICE.to_string(),
            width: Dimension::Auto,
            height: Dimension::Auto,
            depth: Dimension::Auto,
            min_threads: 1,
            max_threads: 4,
            port: DEFAULT_PORT,
            config_file: ConfigFileStatus::NotFound,
        }
    }
}

impl Config {
    /// Parse the process arguments and merge every layer
    ///
    /// Runs before logging is initialised; call [`Config::log_summary`] once
    /// a subscriber is installed.
    pub fn load() -> Result<Self> {
        Self::from_args(CliArgs::parse(), &default_search_dirs())
    }

    /// Merge defaults, the config file and `cli`, searching `search_dirs`
    /// for the file when the command line does not name one
    pub fn from_args(cli: CliArgs, search_dirs: &[PathBuf]) -> Result<Self> {
        let (file, status) = match &cli.config_file {
            Some(path) if path.is_file() => (FileConfig::read(path)?, loaded(path)),
            Some(path) => (FileConfig::default(), ConfigFileStatus::Missing(path.clone())),
            None => match locate_config_file(search_dirs) {
                Some(path) => (FileConfig::read(&path)?, ConfigFileStatus::Loaded(path)),
                None => (FileConfig::default(), ConfigFileStatus::NotFound),
            },
        };

        let mut config = Config { config_file: status, ..Config::default() };
        config.apply_file(file)?;
        config.apply_cli(cli);
        config.validate()?;
        Ok(config)
    }

    fn apply_file(&mut self, file: FileConfig) -> Result<()> {
        if let Some(level) = file.general.and_then(|general| general.log_level) {
            self.log_level = level.parse().map_err(|e| {
                StreamError::config_error_with_source(
                    format!("invalid log_level '{}'", level),
                    Box::new(e),
                )
            })?;
        }

        let Some(stream) = file.stream else {
            return Ok(());
        };
        if let Some(device) = stream.device {
            self.device = device;
        }
        self.width = stream.width.unwrap_or(self.width);
        self.height = stream.height.unwrap_or(self.height);
        self.depth = stream.depth.unwrap_or(self.depth);
        self.min_threads = stream.minthreads.unwrap_or(self.min_threads);
        self.max_threads = stream.maxthreads.unwrap_or(self.max_threads);
        self.port = stream.port.unwrap_or(self.port);
        Ok(())
    }

    fn apply_cli(&mut self, cli: CliArgs) {
        if let Some(level) = cli.log_level {
            self.log_level = level;
        }
        if cli.debug {
            self.log_level = LevelFilter::DEBUG;
        }
        if let Some(device) = cli.device {
            self.device = device;
        }
        self.width = cli.width.unwrap_or(self.width);
        self.height = cli.height.unwrap_or(self.height);
        self.depth = cli.depth.unwrap_or(self.depth);
        self.min_threads = cli.min_threads.unwrap_or(self.min_threads);
        self.max_threads = cli.max_threads.unwrap_or(self.max_threads);
        self.port = cli.port.unwrap_or(self.port);
    }

    /// Reject settings the server cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.device.trim().is_empty() {
            return Err(StreamError::config_error("no framebuffer device specified"));
        }
        if self.min_threads == 0 {
            return Err(StreamError::config_error("minthreads must be at least 1"));
        }
        if self.max_threads == 0 {
            return Err(StreamError::config_error("maxthreads must be at least 1"));
        }
        if self.min_threads > self.max_threads {
            return Err(StreamError::config_error(format!(
                "minthreads ({}) exceeds maxthreads ({})",
                self.min_threads, self.max_threads
            )));
        }
        Ok(())
    }

    /// Device and dimensions to hand to the geometry resolver
    pub fn geometry_request(&self) -> GeometryRequest {
        GeometryRequest {
            device: self.device.clone(),
            width: self.width,
            height: self.height,
            depth: self.depth,
        }
    }

    /// Log where the configuration came from and what it resolved to
    pub fn log_summary(&self) {
        match &self.config_file {
            ConfigFileStatus::Loaded(path) => info!(path = %path.display(), "Found config file"),
            ConfigFileStatus::NotFound => info!("No config file found"),
            ConfigFileStatus::Missing(path) => {
                error!(path = %path.display(), "Config file does not exist")
            }
        }
        debug!(
            device = %self.device,
            width = %self.width,
            height = %self.height,
            depth = %self.depth,
            min_threads = self.min_threads,
            max_threads = self.max_threads,
            port = self.port,
            log_level = %self.log_level,
            "Effective configuration"
        );
    }
}

fn loaded(path: &Path) -> ConfigFileStatus {
    ConfigFileStatus::Loaded(path.to_path_buf())
}
