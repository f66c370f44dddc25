use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

fn default_endpoint() -> String {
    "http://fanyi.youdao.com/openapi.do".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_max_entries() -> usize {
    50
}

fn default_preview_width() -> usize {
    40
}

fn default_cache_capacity() -> usize {
    200
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub window: WindowConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackendConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default)]
    pub key_from: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HistoryConfig {
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
    #[serde(default = "default_preview_width")]
    pub preview_width: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_capacity")]
    pub capacity: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WindowConfig {
    pub width: u32,
    pub height: u32,
    pub min_width: u32,
    pub min_height: u32,
}

impl Default for BackendConfig {
    fn default() -> Self {
        BackendConfig {
            endpoint: default_endpoint(),
            key_from: String::new(),
            api_key: String::new(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        HistoryConfig {
            max_entries: default_max_entries(),
            preview_width: default_preview_width(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            capacity: default_cache_capacity(),
        }
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        WindowConfig {
            width: 400,
            height: 450,
            min_width: 400,
            min_height: 450,
        }
    }
}

impl Config {
    pub fn load() -> Self {
        let config_path = Self::get_config_path();

        if config_path.exists() {
            match fs::read_to_string(&config_path) {
                Ok(contents) => match Self::parse(&contents) {
                    Ok(config) => return config,
                    Err(e) => tracing::warn!(
                        "Error parsing {}: {}. Using defaults.",
                        config_path.display(),
                        e
                    ),
                },
                Err(e) => tracing::warn!(
                    "Error reading {}: {}. Using defaults.",
                    config_path.display(),
                    e
                ),
            }
        } else if let Some(parent) = config_path.parent() {
            // Create config directory if it doesn't exist
            let _ = fs::create_dir_all(parent);
        }

        Config::default()
    }

    pub fn parse(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    pub fn get_config_path() -> PathBuf {
        if let Some(home) = std::env::var_os("HOME") {
            PathBuf::from(home).join(".config/lookup-bar/config.toml")
        } else {
            PathBuf::from("config.toml")
        }
    }

    pub fn get_config_dir() -> PathBuf {
        if let Some(home) = std::env::var_os("HOME") {
            PathBuf::from(home).join(".config/lookup-bar")
        } else {
            PathBuf::from(".")
        }
    }
}
