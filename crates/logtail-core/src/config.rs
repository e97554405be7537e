//! Configuration for the log tailing client.
//!
//! Root configuration struct and nested sections with full defaults, TOML
//! file loading, environment variable overrides, validation, and tilde path
//! expansion.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::buffer::DEFAULT_CAPACITY;
use crate::scroll::ScrollConfig;

pub const ENV_CONFIG_PATH: &str = "LOGTAIL_CONFIG";
pub const ENV_URL: &str = "LOGTAIL_URL";
pub const ENV_CAPACITY: &str = "LOGTAIL_CAPACITY";
pub const ENV_LOG_LEVEL: &str = "LOGTAIL_LOG_LEVEL";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid environment override {name}={value:?}: {reason}")]
    Env {
        name: &'static str,
        value: String,
        reason: String,
    },
    #[error("{0}")]
    Invalid(String),
}

// ---------------------------------------------------------------------------
// Root config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub server: ServerConfig,
    pub buffer: BufferConfig,
    pub scroll: ScrollSettings,
    pub ui: UiConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Load from an explicit file, or the first file found on the search
    /// path, or defaults. Environment overrides are applied last.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => find_config_file(),
        };
        let mut config = match path {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        config.apply_env(|name| std::env::var(name).ok())?;
        config.expand_paths();
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Apply `LOGTAIL_*` overrides through `lookup` (injected for tests).
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_URL).filter(|v| !v.trim().is_empty()) {
            self.server.base_url = url.trim().to_owned();
        }
        if let Some(value) = lookup(ENV_CAPACITY) {
            self.buffer.capacity = value.trim().parse().map_err(|err| ConfigError::Env {
                name: ENV_CAPACITY,
                value: value.clone(),
                reason: format!("{err}"),
            })?;
        }
        if let Some(level) = lookup(ENV_LOG_LEVEL).filter(|v| !v.trim().is_empty()) {
            self.logging.level = level.trim().to_owned();
        }
        Ok(())
    }

    pub fn expand_paths(&mut self) {
        self.logging.file = expand_tilde(&self.logging.file);
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| Err(ConfigError::Invalid(msg.to_owned()));

        let base = self.server.base_url.trim();
        if base.is_empty() {
            return invalid("server.base_url is required");
        }
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return invalid("server.base_url must start with http:// or https://");
        }
        for (name, path) in [
            ("server.tail_path", &self.server.tail_path),
            ("server.truncate_path", &self.server.truncate_path),
            ("server.download_path", &self.server.download_path),
        ] {
            if !path.starts_with('/') {
                return Err(ConfigError::Invalid(format!("{name} must start with '/'")));
            }
        }
        if self.server.connect_timeout_ms == 0 {
            return invalid("server.connect_timeout_ms must be greater than 0");
        }
        if self.server.request_timeout_ms == 0 {
            return invalid("server.request_timeout_ms must be greater than 0");
        }

        if self.buffer.capacity == 0 {
            return invalid("buffer.capacity must be at least 1");
        }

        if self.scroll.scroll_debounce_ms == 0 {
            return invalid("scroll.scroll_debounce_ms must be greater than 0");
        }
        if self.scroll.manual_scroll_guard_ms < self.scroll.auto_scroll_guard_ms {
            return invalid("scroll.manual_scroll_guard_ms must be >= scroll.auto_scroll_guard_ms");
        }

        if self.ui.wheel_step == 0 {
            return invalid("ui.wheel_step must be at least 1");
        }

        match self.logging.level.to_lowercase().trim() {
            "trace" | "debug" | "info" | "warn" | "error" | "off" => {}
            _ => return invalid("logging.level must be one of trace, debug, info, warn, error, off"),
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub base_url: String,
    pub tail_path: String,
    pub truncate_path: String,
    pub download_path: String,
    pub connect_timeout_ms: u64,
    /// Applies to commands only; the stream stays open indefinitely.
    pub request_timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080".to_owned(),
            tail_path: "/api/logs/tail".to_owned(),
            truncate_path: "/api/logs/truncate".to_owned(),
            download_path: "/api/logs/download".to_owned(),
            connect_timeout_ms: 2_000,
            request_timeout_ms: 10_000,
        }
    }
}

impl ServerConfig {
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BufferConfig {
    pub capacity: usize,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
        }
    }
}

/// Scroll tuning as written in the config file. `threshold` is in rows.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScrollSettings {
    pub threshold: usize,
    pub auto_scroll_guard_ms: u64,
    pub scroll_debounce_ms: u64,
    pub manual_scroll_guard_ms: u64,
}

impl Default for ScrollSettings {
    fn default() -> Self {
        let base = ScrollConfig::default();
        Self {
            threshold: 2,
            auto_scroll_guard_ms: duration_ms(base.auto_scroll_guard),
            scroll_debounce_ms: duration_ms(base.scroll_debounce),
            manual_scroll_guard_ms: duration_ms(base.manual_scroll_guard),
        }
    }
}

impl ScrollSettings {
    #[must_use]
    pub fn to_scroll_config(&self) -> ScrollConfig {
        ScrollConfig {
            threshold: self.threshold,
            auto_scroll_guard: Duration::from_millis(self.auto_scroll_guard_ms),
            scroll_debounce: Duration::from_millis(self.scroll_debounce_ms),
            manual_scroll_guard: Duration::from_millis(self.manual_scroll_guard_ms),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UiConfig {
    pub notification_ms: u64,
    pub wheel_step: usize,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            notification_ms: 3_000,
            wheel_step: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    pub level: String,
    pub file: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            file: "~/.local/state/logtail/logtail.log".to_owned(),
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

pub fn expand_tilde(path: &str) -> String {
    if path == "~" {
        return home_dir().display().to_string();
    }
    match path.strip_prefix("~/") {
        Some(rest) => home_dir().join(rest).display().to_string(),
        None => path.to_owned(),
    }
}

/// First existing file among `$LOGTAIL_CONFIG`, `./logtail.toml`, and
/// `~/.config/logtail/config.toml`.
pub fn find_config_file() -> Option<PathBuf> {
    config_search_paths().into_iter().find(|p| p.is_file())
}

fn config_search_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Ok(explicit) = std::env::var(ENV_CONFIG_PATH) {
        if !explicit.trim().is_empty() {
            paths.push(PathBuf::from(expand_tilde(explicit.trim())));
        }
    }
    paths.push(PathBuf::from("logtail.toml"));
    paths.push(home_dir().join(".config/logtail/config.toml"));
    paths
}

fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
}
