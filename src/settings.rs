use std::env;
use std::time::Duration;

use serde::Deserialize;

#[derive(Clone, Deserialize, Debug)]
pub struct Config {
    #[serde(default = "default_env")]
    pub env: String, // file / server
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub prefix: Option<String>,

    /// Root directory for card assets referenced by a leading `/`
    #[serde(default = "default_asset_dir")]
    pub asset_dir: String,
    /// JSON file mapping guild ids to stored card defaults
    pub settings_file: Option<String>,
    #[serde(default = "default_fetch_timeout_ms")]
    pub fetch_timeout_ms: u64,
    #[serde(default = "default_settings_timeout_ms")]
    pub settings_timeout_ms: u64,
    #[serde(default = "default_max_image_bytes")]
    pub max_image_bytes: usize,
    pub fonts_dir: Option<String>,
    pub watermark: Option<String>,

    #[serde(default = "default_log_dir")]
    pub log_dir: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_env() -> String {
    "file".to_string()
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_asset_dir() -> String {
    "./public".to_string()
}

fn default_fetch_timeout_ms() -> u64 {
    4000
}

fn default_settings_timeout_ms() -> u64 {
    1500
}

fn default_max_image_bytes() -> usize {
    8 * 1024 * 1024
}

fn default_log_dir() -> String {
    "./logs".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            env: default_env(),
            host: default_host(),
            port: default_port(),
            prefix: None,
            asset_dir: default_asset_dir(),
            settings_file: None,
            fetch_timeout_ms: default_fetch_timeout_ms(),
            settings_timeout_ms: default_settings_timeout_ms(),
            max_image_bytes: default_max_image_bytes(),
            fonts_dir: None,
            watermark: None,
            log_dir: default_log_dir(),
            log_level: default_log_level(),
        }
    }
}

impl Config {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    pub fn settings_timeout(&self) -> Duration {
        Duration::from_millis(self.settings_timeout_ms)
    }

    /// Where the variables were read from, for the startup log.
    pub fn env_source(&self) -> &'static str {
        if self.env == "file" {
            ".env file"
        } else {
            "server environment"
        }
    }
}

/// Read the configuration, loading `.env` first unless `env` says otherwise.
/// Runs before logging is set up, so it does not log.
pub fn get_config() -> Result<Config, envy::Error> {
    let env_var = env::var("env").unwrap_or("file".to_string());
    if env_var == "file" {
        let _ = dotenvy::dotenv();
    }
    envy::from_env::<Config>()
}
