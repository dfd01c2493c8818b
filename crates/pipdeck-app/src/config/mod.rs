//! Configuration file parsing for pipdeck
//!
//! Supports:
//! - `.pipdeck/config.toml` - Global settings

pub mod settings;
pub mod types;

pub use settings::{init_config_dir, load_settings};
pub use types::*;
