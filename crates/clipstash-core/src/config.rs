use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Global clipstash configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// History store configuration
    pub history: HistoryConfig,

    /// Clipboard polling configuration
    pub poller: PollerConfig,

    /// Daemon configuration
    pub daemon: DaemonConfig,

    /// Output formatting
    pub display: DisplayConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Maximum number of entries kept
    pub max_size: usize,

    /// History file location (default: $XDG_DATA_HOME/clipstash/history.json)
    pub storage_path: Option<PathBuf>,

    /// Clipboard values larger than this (bytes) are not recorded
    pub max_entry_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollerConfig {
    /// Polling period (milliseconds)
    pub interval_ms: u64,

    /// Pause after a failed clipboard read (milliseconds)
    pub error_backoff_ms: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    /// Socket path (default: $XDG_RUNTIME_DIR/clipstash/clipstash.sock or ~/.clipstash/clipstash.sock)
    pub socket_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Preview width in characters
    pub preview_width: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_size: 50,
            storage_path: None,
            max_entry_bytes: 1024 * 1024, // 1MB
        }
    }
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval_ms: 1000,
            error_backoff_ms: 5000,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self { preview_width: 80 }
    }
}

impl PollerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn error_backoff(&self) -> Duration {
        Duration::from_millis(self.error_backoff_ms)
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("clipstash")
}

fn default_socket_path() -> PathBuf {
    if let Some(runtime_dir) = dirs::runtime_dir() {
        runtime_dir.join("clipstash").join("clipstash.sock")
    } else if let Some(home) = dirs::home_dir() {
        home.join(".clipstash").join("clipstash.sock")
    } else {
        PathBuf::from("/tmp/clipstash/clipstash.sock")
    }
}

impl Config {
    /// Load config from the default location:
    /// 1. $XDG_CONFIG_HOME/clipstash/config.toml
    /// 2. Built-in defaults
    ///
    /// A missing file means defaults; a file that exists but does not parse is an error.
    pub fn load() -> Result<Self, ConfigError> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load config from a specific file
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("clipstash").join("config.toml"))
    }

    /// Get the history file path, using default if not specified
    pub fn storage_path(&self) -> PathBuf {
        self.history
            .storage_path
            .clone()
            .unwrap_or_else(|| default_data_dir().join("history.json"))
    }

    /// Get the socket path, using default if not specified
    pub fn socket_path(&self) -> PathBuf {
        self.daemon.socket_path.clone().unwrap_or_else(default_socket_path)
    }

    /// Reject values no component can run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.history.max_size == 0 {
            return Err(ConfigError::Invalid("history.max_size must be at least 1".into()));
        }
        if self.poller.interval_ms == 0 {
            return Err(ConfigError::Invalid("poller.interval_ms must be at least 1".into()));
        }
        if self.display.preview_width < 4 {
            return Err(ConfigError::Invalid("display.preview_width must be at least 4".into()));
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "[history]\nmax_size = 7\n\n[poller]\ninterval_ms = 250\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.history.max_size, 7);
        assert_eq!(config.poller.interval_ms, 250);
        assert_eq!(config.poller.error_backoff_ms, 5000);
        assert_eq!(config.display.preview_width, 80);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unparseable_file_is_an_error() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "[history\nmax_size = ").unwrap();

        assert!(matches!(Config::load_from(&path), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_validate_rejects_zero_bounds() {
        let mut config = Config::default();
        config.history.max_size = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.poller.interval_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_storage_path_override() {
        let mut config = Config::default();
        config.history.storage_path = Some(PathBuf::from("/tmp/custom.json"));
        assert_eq!(config.storage_path(), PathBuf::from("/tmp/custom.json"));
        assert!(Config::default().storage_path().ends_with("clipstash/history.json"));
    }
}
