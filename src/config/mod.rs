mod settings;

pub use settings::{Config, ConfigError, TomlConfig, DEFAULT_BODY_LIMIT, EXAMPLE_CONFIG};
