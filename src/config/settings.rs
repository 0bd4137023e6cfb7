use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::util::paths::{default_data_dir, discover_config_path};

/// Example configuration file contents (bundled with the binary)
pub const EXAMPLE_CONFIG: &str = include_str!("config.toml.example");

/// Default request body limit (5 MiB)
pub const DEFAULT_BODY_LIMIT: usize = 5 * 1024 * 1024;

/// Error loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid value for {var}: {value:?}")]
    InvalidEnv { var: &'static str, value: String },
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Host address to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Allow requests from any origin
    pub cors_permissive: bool,
    /// Largest accepted request body in bytes
    pub body_limit_bytes: usize,
    /// Directory holding the record files
    pub data_dir: PathBuf,
    /// Shared secret for /save and /files (None = endpoints disabled)
    pub api_key: Option<String>,
    /// Log file path (None = stdout)
    pub log_file: Option<PathBuf>,
    /// Fallback tracing filter when RUST_LOG is unset
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            cors_permissive: true,
            body_limit_bytes: DEFAULT_BODY_LIMIT,
            data_dir: default_data_dir(),
            api_key: None,
            log_file: None,
            log_filter: "info".to_string(),
        }
    }
}

/// TOML representation of the [server] section
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TomlServerConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub cors_permissive: Option<bool>,
    pub body_limit_bytes: Option<usize>,
}

/// TOML representation of the [storage] section
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TomlStorageConfig {
    pub data_dir: Option<PathBuf>,
}

/// TOML representation of the [auth] section
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TomlAuthConfig {
    pub api_key: Option<String>,
}

/// TOML representation of the [logging] section
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TomlLoggingConfig {
    pub filter: Option<String>,
    pub file: Option<PathBuf>,
}

/// TOML representation of the config file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TomlConfig {
    pub server: Option<TomlServerConfig>,
    pub storage: Option<TomlStorageConfig>,
    pub auth: Option<TomlAuthConfig>,
    pub logging: Option<TomlLoggingConfig>,
}

impl Config {
    /// Load configuration: defaults, then the config file, then environment.
    ///
    /// An explicit path must exist. Without one, ./dotlog.toml and the
    /// per-user config file are tried and silently skipped when absent.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = Config::default();

        let path = explicit.map(Path::to_path_buf).or_else(discover_config_path);
        if let Some(path) = path {
            let contents = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
                path: path.clone(),
                source,
            })?;
            config.apply_toml_str(&contents, &path)?;
        }

        config.apply_env(|var| std::env::var(var).ok())?;
        Ok(config)
    }

    /// Merge a TOML document on top of the current values
    pub fn apply_toml_str(&mut self, contents: &str, path: &Path) -> Result<(), ConfigError> {
        let toml_config =
            toml::from_str::<TomlConfig>(contents).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        if let Some(server) = toml_config.server {
            if let Some(host) = server.host {
                self.host = host;
            }
            if let Some(port) = server.port {
                self.port = port;
            }
            if let Some(cors_permissive) = server.cors_permissive {
                self.cors_permissive = cors_permissive;
            }
            if let Some(limit) = server.body_limit_bytes {
                self.body_limit_bytes = limit;
            }
        }

        if let Some(storage) = toml_config.storage {
            if let Some(data_dir) = storage.data_dir {
                self.data_dir = data_dir;
            }
        }

        if let Some(auth) = toml_config.auth {
            if auth.api_key.is_some() {
                self.api_key = auth.api_key;
            }
        }

        if let Some(logging) = toml_config.logging {
            if let Some(filter) = logging.filter {
                self.log_filter = filter;
            }
            if logging.file.is_some() {
                self.log_file = logging.file;
            }
        }

        Ok(())
    }

    /// Apply HOST, PORT, DATA_DIR, API_KEY and DOTLOG_LOG overrides
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("HOST") {
            self.host = host;
        }
        if let Some(port) = lookup("PORT") {
            self.port = port
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidEnv {
                    var: "PORT",
                    value: port.clone(),
                })?;
        }
        if let Some(data_dir) = lookup("DATA_DIR") {
            self.data_dir = PathBuf::from(data_dir);
        }
        if let Some(api_key) = lookup("API_KEY") {
            self.api_key = Some(api_key);
        }
        if let Some(filter) = lookup("DOTLOG_LOG") {
            self.log_filter = filter;
        }
        Ok(())
    }

    /// The configured shared secret, treating an empty string as unset
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|key| !key.is_empty())
    }

    pub fn with_data_dir(mut self, dir: PathBuf) -> Self {
        self.data_dir = dir;
        self
    }

    pub fn with_host(mut self, host: String) -> Self {
        self.host = host;
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }
}
