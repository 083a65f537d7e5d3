//! Default paths for laundry tracker components
//!
//! Paths are user-writable by default (no root required):
//! - Config: `$XDG_CONFIG_HOME/laundry/config.toml` or `~/.config/laundry/config.toml`
//! - Data (identity file): `$XDG_DATA_HOME/laundry` or `~/.local/share/laundry`
//! - Shared store: `<data dir>/laundry.db` unless `$LAUNDRY_STORE` points elsewhere

use std::path::PathBuf;

/// Environment variable for overriding the shared store path
pub const LAUNDRY_STORE_ENV: &str = "LAUNDRY_STORE";

/// Environment variable for overriding the data directory
pub const LAUNDRY_DATA_DIR_ENV: &str = "LAUNDRY_DATA_DIR";

/// Application subdirectory name
const APP_DIR: &str = "laundry";

/// Store filename within the data directory
const STORE_FILENAME: &str = "laundry.db";

/// Get the default config file path.
///
/// Order of precedence:
/// 1. `$XDG_CONFIG_HOME/laundry/config.toml` (if XDG_CONFIG_HOME is set)
/// 2. `~/.config/laundry/config.toml` (fallback)
pub fn default_config_path() -> PathBuf {
    if let Ok(config_home) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(config_home).join(APP_DIR).join("config.toml");
    }

    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home)
            .join(".config")
            .join(APP_DIR)
            .join("config.toml");
    }

    PathBuf::from("/etc").join(APP_DIR).join("config.toml")
}

/// Get the default data directory.
///
/// Order of precedence:
/// 1. `$LAUNDRY_DATA_DIR` environment variable (if set)
/// 2. `$XDG_DATA_HOME/laundry` (if XDG_DATA_HOME is set)
/// 3. `~/.local/share/laundry` (fallback)
pub fn default_data_dir() -> PathBuf {
    if let Ok(path) = std::env::var(LAUNDRY_DATA_DIR_ENV) {
        return PathBuf::from(path);
    }

    data_dir_without_env()
}

/// Get the data directory without checking LAUNDRY_DATA_DIR env var.
/// Used for default values in configs where the env var is checked separately.
pub fn data_dir_without_env() -> PathBuf {
    if let Ok(data_home) = std::env::var("XDG_DATA_HOME") {
        return PathBuf::from(data_home).join(APP_DIR);
    }

    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home)
            .join(".local")
            .join("share")
            .join(APP_DIR);
    }

    // Last resort
    PathBuf::from("/tmp").join(APP_DIR).join("data")
}

/// Get the default shared store path.
///
/// Order of precedence:
/// 1. `$LAUNDRY_STORE` environment variable (if set)
/// 2. `<default data dir>/laundry.db`
pub fn default_store_path() -> PathBuf {
    if let Ok(path) = std::env::var(LAUNDRY_STORE_ENV) {
        return PathBuf::from(path);
    }

    default_data_dir().join(STORE_FILENAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_path_is_toml_under_app_dir() {
        let path = default_config_path();
        assert!(path.to_string_lossy().contains("laundry"));
        assert_eq!(path.extension().unwrap(), "toml");
    }

    #[test]
    fn data_dir_contains_app_dir() {
        let path = data_dir_without_env();
        assert!(path.to_string_lossy().contains("laundry"));
    }

    #[test]
    fn store_path_is_a_database_file() {
        let path = default_store_path();
        assert!(path.to_string_lossy().ends_with(".db"));
    }
}
