//! Settings parser for .pipdeck/config.toml

use std::path::Path;

use super::types::Settings;
use pipdeck_core::prelude::*;

const CONFIG_FILENAME: &str = "config.toml";
const PIPDECK_DIR: &str = ".pipdeck";

const DEFAULT_CONFIG: &str = r#"# pipdeck configuration

[pip]
executable = "pip3"
elevate = []                  # e.g. ["gksudo", "--"] for system-wide installs
capture_timeout_secs = 120    # search, list and show

[streaming]
poll_interval_ms = 50
read_strategy = "multiplexed" # or "per_stream"
drain_timeout_ms = 2000
max_log_lines = 10000

[wheel_index]
path = "pythonlibs.json"      # relative to the project directory
python_tag = "cp311"
"#;

/// Load settings from `.pipdeck/config.toml`.
///
/// A missing, unreadable or invalid file falls back to defaults.
pub fn load_settings(project_path: &Path) -> Settings {
    let config_path = project_path.join(PIPDECK_DIR).join(CONFIG_FILENAME);

    if !config_path.exists() {
        debug!("No config file at {:?}, using defaults", config_path);
        return Settings::default();
    }

    let settings: Settings = match std::fs::read_to_string(&config_path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(settings) => {
                debug!("Loaded settings from {:?}", config_path);
                settings
            }
            Err(e) => {
                warn!("Failed to parse {:?}: {}", config_path, e);
                return Settings::default();
            }
        },
        Err(e) => {
            warn!("Failed to read {:?}: {}", config_path, e);
            return Settings::default();
        }
    };

    match settings.validate() {
        Ok(()) => settings,
        Err(e) => {
            warn!("Ignoring {:?}: {}", config_path, e);
            Settings::default()
        }
    }
}

/// Create `.pipdeck/config.toml` with commented defaults.
///
/// An existing file is left untouched. Returns the config file path.
pub fn init_config_dir(project_path: &Path) -> Result<std::path::PathBuf> {
    let pipdeck_dir = project_path.join(PIPDECK_DIR);

    if !pipdeck_dir.exists() {
        std::fs::create_dir_all(&pipdeck_dir)
            .map_err(|e| Error::config(format!("Failed to create .pipdeck dir: {}", e)))?;
    }

    let config_path = pipdeck_dir.join(CONFIG_FILENAME);
    if config_path.exists() {
        debug!("Config already exists at {:?}", config_path);
    } else {
        std::fs::write(&config_path, DEFAULT_CONFIG)
            .map_err(|e| Error::config(format!("Failed to write config.toml: {}", e)))?;
        info!("Created default config at {:?}", config_path);
    }

    Ok(config_path)
}
