//! Utility modules

pub mod paths;

pub use paths::{default_data_dir, discover_config_path, user_config_path};
