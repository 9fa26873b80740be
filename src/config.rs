use crate::cli::Cli;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Config file read at startup when no `--config` is given, if it exists.
pub const DEFAULT_CONFIG_FILE: &str = "config.json";

/// Main configuration combining server and storage settings.
///
/// Loaded from a JSON file and overridden by CLI args:
/// CLI > File > Defaults
///
/// ```json
/// {"number_of_shard":32,"max_memory_usage":4026,"max_number_of_connexion":1024}
/// ```
///
/// Numeric fields missing from the file are zero. Malformed JSON, wrong
/// types and out-of-range numbers fail the load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,

    /// Shard count for the storage engine (0 = default)
    #[serde(alias = "numberOfShard")]
    pub number_of_shard: u8,

    /// Memory budget; accepted but not enforced (no eviction)
    #[serde(alias = "maxMemoryUsage")]
    pub max_memory_usage: u16,

    /// Maximum concurrent connections (0 = unlimited)
    #[serde(alias = "maxNumberOfConnexion")]
    pub max_number_of_connexion: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Deadline for a client to send its request
    #[serde(default = "default_read_timeout_secs")]
    pub read_timeout_secs: u64,
}

fn default_host() -> String {
    crate::DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    crate::DEFAULT_PORT
}

fn default_read_timeout_secs() -> u64 {
    30
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            read_timeout_secs: default_read_timeout_secs(),
        }
    }
}

impl ServerConfig {
    /// Returns the bind address as a string
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }
}

impl Config {
    /// Parse a JSON configuration from any reader.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(std::io::BufReader::new(file))
    }

    /// Create config with CLI args taking precedence over the file.
    ///
    /// An explicit `--config` must exist; the default `config.json` is only
    /// read if present.
    pub fn from_sources(cli: &Cli) -> Result<Self, ConfigError> {
        let file = cli.config.clone().or_else(|| {
            let default = PathBuf::from(DEFAULT_CONFIG_FILE);
            default.is_file().then_some(default)
        });

        let mut config = match file {
            Some(path) => Self::load_from_file(path)?,
            None => Self::default(),
        };

        if let Some(host) = &cli.host {
            config.server.host = host.clone();
        }
        if let Some(port) = cli.port {
            config.server.port = port;
        }
        if let Some(shards) = cli.shards {
            config.number_of_shard = shards;
        }

        config.validate()?;
        Ok(config)
    }

    /// Checks values that parse fine but cannot be used.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.host.is_empty() {
            return Err(ConfigError::Validation("host must not be empty".to_string()));
        }
        if self.server.read_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "read_timeout_secs must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}
