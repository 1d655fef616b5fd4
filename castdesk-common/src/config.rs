//! Configuration loading and root folder resolution

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV: &str = "CASTDESK_ROOT_FOLDER";

/// Database file name inside the root folder
pub const DATABASE_FILE: &str = "castdesk.db";

/// Optional settings read from `config.toml`
///
/// Every key is optional; anything missing falls back to compiled defaults.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct TomlConfig {
    pub root_folder: Option<PathBuf>,
    pub bind_address: Option<String>,
    pub port: Option<u16>,
    pub default_namespace: Option<String>,
}

/// Parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Invalid config file {}: {}", path.display(), e)))
}

/// Load the platform config file, if one exists
///
/// A missing file yields defaults silently. A malformed file is logged and
/// also yields defaults: configuration problems never prevent startup.
pub fn load_default_toml_config() -> TomlConfig {
    let Some(path) = find_config_file() else {
        return TomlConfig::default();
    };

    match load_toml_config(&path) {
        Ok(config) => config,
        Err(e) => {
            warn!("Ignoring config file, using defaults: {}", e);
            TomlConfig::default()
        }
    }
}

/// Root folder resolution priority order:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable
/// 3. TOML config file
/// 4. OS-dependent compiled default (fallback)
pub fn resolve_root_folder(cli_arg: Option<&str>, toml_config: &TomlConfig) -> PathBuf {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return PathBuf::from(path);
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }

    // Priority 3: TOML config file
    if let Some(root_folder) = &toml_config.root_folder {
        return root_folder.clone();
    }

    // Priority 4: OS-dependent compiled default
    default_root_folder()
}

/// Path of the database file inside `root_folder`
pub fn database_path(root_folder: &Path) -> PathBuf {
    root_folder.join(DATABASE_FILE)
}

/// Locate the config file for the platform
fn find_config_file() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("castdesk").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/castdesk/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// Get OS-dependent default root folder path
pub fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/castdesk (or /var/lib/castdesk for system-wide)
        dirs::data_local_dir()
            .map(|d| d.join("castdesk"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/castdesk"))
    } else if cfg!(target_os = "macos") {
        // ~/Library/Application Support/castdesk
        dirs::data_dir()
            .map(|d| d.join("castdesk"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/castdesk"))
    } else if cfg!(target_os = "windows") {
        // %LOCALAPPDATA%\castdesk
        dirs::data_local_dir()
            .map(|d| d.join("castdesk"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\castdesk"))
    } else {
        PathBuf::from("./castdesk_data")
    }
}
