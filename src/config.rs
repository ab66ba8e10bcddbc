use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const BACKEND_URL_ENV: &str = "SITE_QA_BACKEND_URL";

fn default_base_url() -> String {
    "http://localhost:8006".to_string()
}

fn default_database() -> String {
    "storage.sqlite".to_string()
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub window: WindowConfig,
    #[serde(default)]
    pub history: HistoryConfig,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct BackendConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Per-request timeout. Unset means the transport default.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct WindowConfig {
    pub width: u32,
    pub height: u32,
    pub min_width: u32,
    pub min_height: u32,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct HistoryConfig {
    /// File name of the storage database, relative to the config directory.
    #[serde(default = "default_database")]
    pub database: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        BackendConfig {
            base_url: default_base_url(),
            timeout_secs: None,
        }
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        WindowConfig {
            width: 720,
            height: 780,
            min_width: 420,
            min_height: 480,
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        HistoryConfig {
            database: default_database(),
        }
    }
}

impl Config {
    pub fn load() -> Self {
        let mut config = Self::load_from(&Self::get_config_path());
        if let Ok(url) = std::env::var(BACKEND_URL_ENV) {
            if !url.trim().is_empty() {
                info!(%url, "backend url overridden from environment");
                config.backend.base_url = url;
            }
        }
        config
    }

    pub fn load_from(config_path: &Path) -> Self {
        if config_path.exists() {
            match fs::read_to_string(config_path) {
                Ok(contents) => match toml::from_str(&contents) {
                    Ok(config) => return config,
                    Err(e) => warn!(error = %e, path = %config_path.display(), "error parsing config, using defaults"),
                },
                Err(e) => warn!(error = %e, path = %config_path.display(), "error reading config, using defaults"),
            }
        } else if let Some(parent) = config_path.parent() {
            let _ = fs::create_dir_all(parent);
        }

        Config::default()
    }

    pub fn get_config_path() -> PathBuf {
        Self::get_config_dir().join("config.toml")
    }

    pub fn get_config_dir() -> PathBuf {
        if let Some(home) = std::env::var_os("HOME") {
            PathBuf::from(home).join(".config/site-qa")
        } else {
            PathBuf::from(".")
        }
    }

    pub fn database_path(&self) -> PathBuf {
        Self::get_config_dir().join(&self.history.database)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[backend]\nbase_url = \"http://qa.internal:9000\"\n").unwrap();

        let config = Config::load_from(&path);
        assert_eq!(config.backend.base_url, "http://qa.internal:9000");
        assert_eq!(config.backend.timeout_secs, None);
        assert_eq!(config.window.width, 720);
        assert_eq!(config.history.database, "storage.sqlite");
    }

    #[test]
    fn test_broken_config_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "backend = [[[").unwrap();

        let config = Config::load_from(&path);
        assert_eq!(config.backend.base_url, "http://localhost:8006");
    }

    #[test]
    fn test_missing_config_creates_parent_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/config.toml");

        let config = Config::load_from(&path);
        assert!(dir.path().join("nested").is_dir());
        assert_eq!(config.window.min_height, 480);
    }
}
