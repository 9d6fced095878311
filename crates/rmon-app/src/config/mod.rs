//! Configuration file parsing for Result Monitor
//!
//! Supports:
//! - `config.toml` - Global settings, by default under the platform config dir

pub mod settings;
pub mod types;

pub use settings::{default_config_path, load_settings, CONFIG_FILENAME};
pub use types::*;
