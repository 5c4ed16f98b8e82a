//! Application configuration
//!
//! Configuration is loaded from:
//! 1. Default values
//! 2. Config file (~/.config/notelink/config.toml)
//! 3. Environment variables (NOTELINK_* prefix)
//!
//! Environment variables take precedence over config file values.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::models::InsertPosition;
use crate::scanner::DEFAULT_SCHEME;

/// Environment variable prefix
const ENV_PREFIX: &str = "NOTELINK";

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory for data storage (note library, sync registry)
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// URI scheme of note links
    #[serde(default = "default_link_scheme")]
    pub link_scheme: String,

    /// Directory, relative to the export destination, receiving embedded resources
    #[serde(default = "default_attachments_dir")]
    pub attachments_dir: String,

    /// Template naming exported Markdown files
    #[serde(default = "default_filename_template")]
    pub filename_template: String,

    /// Template rendering inserted link lines
    #[serde(default = "default_link_template")]
    pub link_template: String,

    /// Where inserted links go inside the chosen section
    #[serde(default)]
    pub insert_link_position: InsertPosition,

    /// Poll interval while waiting for an external renderer
    #[serde(default = "default_render_poll_interval_ms")]
    pub render_poll_interval_ms: u64,

    /// Poll attempts before a render is reported as timed out
    #[serde(default = "default_render_max_attempts")]
    pub render_max_attempts: u32,

    /// Log level used when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            link_scheme: default_link_scheme(),
            attachments_dir: default_attachments_dir(),
            filename_template: default_filename_template(),
            link_template: default_link_template(),
            insert_link_position: InsertPosition::default(),
            render_poll_interval_ms: default_render_poll_interval_ms(),
            render_max_attempts: default_render_max_attempts(),
            log_level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration from default location and environment
    ///
    /// Order of precedence (highest to lowest):
    /// 1. Environment variables (NOTELINK_DATA_DIR, NOTELINK_LINK_SCHEME, ...)
    /// 2. Config file (~/.config/notelink/config.toml or NOTELINK_CONFIG)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_file_path())
    }

    /// Load configuration from a specific path
    ///
    /// Environment variables are still applied as overrides.
    /// If the file doesn't exist, defaults are used.
    pub fn load_from_path(path: &PathBuf) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        config.ensure_data_dir()?;
        Ok(config)
    }

    /// Load configuration from a TOML string (useful for testing)
    pub fn load_from_str(toml_content: &str) -> Result<Self> {
        let mut config: Config =
            toml::from_str(toml_content).context("Failed to parse config TOML")?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        let var = |name: &str| std::env::var(format!("{}_{}", ENV_PREFIX, name)).ok();

        if let Some(val) = var("DATA_DIR") {
            self.data_dir = PathBuf::from(val);
        }
        if let Some(val) = var("LINK_SCHEME").filter(|v| !v.is_empty()) {
            self.link_scheme = val;
        }
        if let Some(val) = var("ATTACHMENTS_DIR").filter(|v| !v.is_empty()) {
            self.attachments_dir = val;
        }
        if let Some(val) = var("FILENAME_TEMPLATE").filter(|v| !v.is_empty()) {
            self.filename_template = val;
        }
        if let Some(val) = var("LINK_TEMPLATE").filter(|v| !v.is_empty()) {
            self.link_template = val;
        }
        if let Some(val) = var("INSERT_LINK_POSITION") {
            // Parsing is infallible
            self.insert_link_position = val.parse().unwrap_or_default();
        }
        if let Some(val) = var("RENDER_POLL_INTERVAL_MS").and_then(|v| v.parse().ok()) {
            self.render_poll_interval_ms = val;
        }
        if let Some(val) = var("RENDER_MAX_ATTEMPTS").and_then(|v| v.parse().ok()) {
            self.render_max_attempts = val;
        }
        if let Some(val) = var("LOG_LEVEL").filter(|v| !v.is_empty()) {
            self.log_level = val;
        }
    }

    /// Ensure data directory exists
    fn ensure_data_dir(&self) -> Result<()> {
        if !self.data_dir.exists() {
            std::fs::create_dir_all(&self.data_dir)
                .with_context(|| format!("Failed to create data directory: {:?}", self.data_dir))?;
        }
        Ok(())
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_file_path();

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;
        Ok(())
    }

    /// Set a configuration value by key name
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "data_dir" => self.data_dir = PathBuf::from(value),
            "link_scheme" => {
                if value.is_empty() {
                    bail!("link_scheme cannot be empty");
                }
                self.link_scheme = value.to_string();
            }
            "attachments_dir" => self.attachments_dir = value.to_string(),
            "filename_template" => self.filename_template = value.to_string(),
            "link_template" => self.link_template = value.to_string(),
            "insert_link_position" => match value {
                "start" | "end" => self.insert_link_position = value.parse().unwrap_or_default(),
                _ => bail!("insert_link_position must be 'start' or 'end'"),
            },
            "render_poll_interval_ms" => {
                self.render_poll_interval_ms = value
                    .parse()
                    .with_context(|| format!("Invalid interval: {}", value))?;
            }
            "render_max_attempts" => {
                self.render_max_attempts = value
                    .parse()
                    .with_context(|| format!("Invalid attempt count: {}", value))?;
            }
            "log_level" => self.log_level = value.to_string(),
            _ => bail!(
                "Unknown config key: {}. Valid keys: {}",
                key,
                Self::KEYS.join(", ")
            ),
        }
        Ok(())
    }

    /// Keys accepted by [`Config::set`]
    pub const KEYS: &'static [&'static str] = &[
        "data_dir",
        "link_scheme",
        "attachments_dir",
        "filename_template",
        "link_template",
        "insert_link_position",
        "render_poll_interval_ms",
        "render_max_attempts",
        "log_level",
    ];

    /// Get the config file path
    ///
    /// Can be overridden with NOTELINK_CONFIG environment variable
    pub fn config_file_path() -> PathBuf {
        if let Ok(path) = std::env::var(format!("{}_CONFIG", ENV_PREFIX)) {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("notelink")
            .join("config.toml")
    }

    /// Get the path to the note library file
    pub fn library_path(&self) -> PathBuf {
        self.data_dir.join("library.json")
    }

    /// Get the path to the sync registry file
    pub fn sync_registry_path(&self) -> PathBuf {
        self.data_dir.join("sync_registry.json")
    }

    pub fn render_poll_interval(&self) -> Duration {
        Duration::from_millis(self.render_poll_interval_ms)
    }
}

/// Get the default data directory
fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("notelink")
}

fn default_link_scheme() -> String {
    DEFAULT_SCHEME.to_string()
}

fn default_attachments_dir() -> String {
    "attachments".to_string()
}

fn default_filename_template() -> String {
    "[ExportMDFileName]".to_string()
}

fn default_link_template() -> String {
    "[QuickInsertV2]".to_string()
}

fn default_render_poll_interval_ms() -> u64 {
    10
}

fn default_render_max_attempts() -> u32 {
    500
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    // Mutex to serialize tests that touch environment variables
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    /// Guard that locks env access and saves/restores env vars
    struct EnvGuard<'a> {
        _lock: std::sync::MutexGuard<'a, ()>,
        saved: Vec<(String, Option<String>)>,
    }

    impl<'a> EnvGuard<'a> {
        fn new(vars: &[&str]) -> Self {
            let lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
            let saved = vars
                .iter()
                .map(|&name| (name.to_string(), env::var(name).ok()))
                .collect();
            for name in vars {
                env::remove_var(name);
            }
            Self { _lock: lock, saved }
        }
    }

    impl Drop for EnvGuard<'_> {
        fn drop(&mut self) {
            for (name, value) in &self.saved {
                match value {
                    Some(v) => env::set_var(name, v),
                    None => env::remove_var(name),
                }
            }
        }
    }

    const ENV_VARS: &[&str] = &[
        "NOTELINK_DATA_DIR",
        "NOTELINK_LINK_SCHEME",
        "NOTELINK_ATTACHMENTS_DIR",
        "NOTELINK_FILENAME_TEMPLATE",
        "NOTELINK_LINK_TEMPLATE",
        "NOTELINK_INSERT_LINK_POSITION",
        "NOTELINK_RENDER_POLL_INTERVAL_MS",
        "NOTELINK_RENDER_MAX_ATTEMPTS",
        "NOTELINK_LOG_LEVEL",
    ];

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.link_scheme, "zotero");
        assert_eq!(config.attachments_dir, "attachments");
        assert_eq!(config.insert_link_position, InsertPosition::End);
        assert_eq!(config.render_poll_interval(), Duration::from_millis(10));
        assert_eq!(config.render_max_attempts, 500);
        assert!(config.data_dir.ends_with("notelink"));
    }

    #[test]
    fn test_file_paths() {
        let config = Config::default();
        assert!(config.library_path().ends_with("library.json"));
        assert!(config.sync_registry_path().ends_with("sync_registry.json"));
    }

    #[test]
    fn test_env_override_data_dir() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();

        env::set_var("NOTELINK_DATA_DIR", "/tmp/notelink-test");
        config.apply_env_overrides();

        assert_eq!(config.data_dir, PathBuf::from("/tmp/notelink-test"));
    }

    #[test]
    fn test_env_override_render_limits() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();
        env::set_var("NOTELINK_RENDER_POLL_INTERVAL_MS", "25");
        env::set_var("NOTELINK_RENDER_MAX_ATTEMPTS", "not-a-number");
        config.apply_env_overrides();

        assert_eq!(config.render_poll_interval_ms, 25);
        // Unparseable values leave the previous value alone
        assert_eq!(config.render_max_attempts, 500);
    }

    #[test]
    fn test_env_override_position_and_scheme() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();
        env::set_var("NOTELINK_INSERT_LINK_POSITION", "start");
        env::set_var("NOTELINK_LINK_SCHEME", "");
        config.apply_env_overrides();

        assert_eq!(config.insert_link_position, InsertPosition::Start);
        // Empty string keeps the default
        assert_eq!(config.link_scheme, "zotero");
    }

    #[test]
    fn test_set_values() {
        let mut config = Config::default();

        config.set("insert_link_position", "start").unwrap();
        assert_eq!(config.insert_link_position, InsertPosition::Start);

        config.set("render_max_attempts", "3").unwrap();
        assert_eq!(config.render_max_attempts, 3);

        assert!(config.set("insert_link_position", "middle").is_err());
        assert!(config.set("render_max_attempts", "many").is_err());
        assert!(config.set("link_scheme", "").is_err());
        assert!(config.set("unknown", "x").is_err());
    }

    #[test]
    fn test_serialization() {
        let _guard = EnvGuard::new(ENV_VARS);

        let config = Config {
            data_dir: PathBuf::from("/data/notelink"),
            link_scheme: "notes".to_string(),
            ..Config::default()
        };

        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("data_dir"));
        assert!(toml_str.contains("insert_link_position = \"end\""));

        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.data_dir, config.data_dir);
        assert_eq!(parsed.link_scheme, "notes");
    }

    #[test]
    fn test_load_from_str() {
        let _guard = EnvGuard::new(ENV_VARS);

        let toml = r#"
            data_dir = "/custom/data"
            attachments_dir = "media"
            insert_link_position = "start"
        "#;

        let config = Config::load_from_str(toml).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/custom/data"));
        assert_eq!(config.attachments_dir, "media");
        assert_eq!(config.insert_link_position, InsertPosition::Start);
        assert_eq!(config.filename_template, "[ExportMDFileName]");
    }

    #[test]
    fn test_load_from_path_missing_file() {
        let _guard = EnvGuard::new(ENV_VARS);
        let temp_dir = tempfile::TempDir::new().unwrap();
        env::set_var("NOTELINK_DATA_DIR", temp_dir.path().join("data"));

        let path = PathBuf::from("/nonexistent/config.toml");
        let config = Config::load_from_path(&path).unwrap();
        assert_eq!(config.link_scheme, "zotero");
        assert!(config.data_dir.exists());
    }
}
