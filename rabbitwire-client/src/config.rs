//! Client transport configuration.
//!
//! Configuration is loaded in the following order (later overrides earlier):
//! 1. Default values
//! 2. YAML config file (if specified via RABBITWIRE_CONFIG)
//! 3. Environment variables

use rabbitwire_protocol::DEFAULT_MAX_FRAME_SIZE;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default buffer size for the frame reader and writer (8 KiB).
pub const DEFAULT_BUFFER_SIZE: usize = 8 * 1024;

/// Minimum buffer size (1 KiB).
pub const MIN_BUFFER_SIZE: usize = 1024;

/// Maximum buffer size (1 MiB).
pub const MAX_BUFFER_SIZE: usize = 1024 * 1024;

/// Transport settings shared by every connection a client opens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Bound on establishing the TCP connection, in milliseconds.
    pub connect_timeout_ms: u64,
    /// Per-frame read timeout, in milliseconds.
    pub read_timeout_ms: u64,
    /// Writable-state timeout for each write batch, in milliseconds.
    pub write_timeout_ms: u64,
    /// Try IPv6 before IPv4 when the host supports it.
    pub prefer_ipv6: bool,
    /// Largest accepted frame payload (0 = unlimited).
    pub max_frame_size: u32,
    /// Buffered reader capacity.
    pub read_buffer_size: usize,
    /// Buffered writer capacity.
    pub write_buffer_size: usize,
    /// Disable Nagle's algorithm on TCP sockets.
    pub nodelay: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 30_000,
            read_timeout_ms: 30_000,
            write_timeout_ms: 30_000,
            prefer_ipv6: true,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            read_buffer_size: DEFAULT_BUFFER_SIZE,
            write_buffer_size: DEFAULT_BUFFER_SIZE,
            nodelay: true,
        }
    }
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from file, then applies environment variable overrides.
    pub fn load() -> Result<Self, ConfigError> {
        match std::env::var("RABBITWIRE_CONFIG") {
            Ok(path) => Self::load_from(path),
            Err(_) => Self::finish(Self::default()),
        }
    }

    /// Loads configuration from an explicit file, then applies environment
    /// variable overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::finish(Self::from_file(path)?)
    }

    fn finish(mut config: Self) -> Result<Self, ConfigError> {
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(path.to_path_buf(), e))?;
        let config: ClientConfig = serde_yaml::from_str(&content)
            .map_err(|e| ConfigError::ParseError(path.to_path_buf(), e.to_string()))?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Some(ms) = env_parse("RABBITWIRE_CONNECT_TIMEOUT_MS") {
            self.connect_timeout_ms = ms;
        }
        if let Some(ms) = env_parse("RABBITWIRE_READ_TIMEOUT_MS") {
            self.read_timeout_ms = ms;
        }
        if let Some(ms) = env_parse("RABBITWIRE_WRITE_TIMEOUT_MS") {
            self.write_timeout_ms = ms;
        }
        if let Ok(v) = std::env::var("RABBITWIRE_PREFER_IPV6") {
            self.prefer_ipv6 = v == "1" || v.to_lowercase() == "true";
        }
        if let Some(max) = env_parse("RABBITWIRE_MAX_FRAME_SIZE") {
            self.max_frame_size = max;
        }
    }

    /// Rejects settings that would make every operation fail immediately.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let timeouts = [
            ("connect_timeout_ms", self.connect_timeout_ms),
            ("read_timeout_ms", self.read_timeout_ms),
            ("write_timeout_ms", self.write_timeout_ms),
        ];
        for (name, value) in timeouts {
            if value == 0 {
                return Err(ConfigError::ValidationError(format!(
                    "{} must be greater than zero",
                    name
                )));
            }
        }
        Ok(())
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout_ms = duration_millis(timeout);
        self
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout_ms = duration_millis(timeout);
        self
    }

    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout_ms = duration_millis(timeout);
        self
    }

    pub fn with_prefer_ipv6(mut self, prefer: bool) -> Self {
        self.prefer_ipv6 = prefer;
        self
    }

    pub fn with_max_frame_size(mut self, max: u32) -> Self {
        self.max_frame_size = max;
        self
    }

    pub fn with_read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = size.clamp(MIN_BUFFER_SIZE, MAX_BUFFER_SIZE);
        self
    }

    pub fn with_write_buffer_size(mut self, size: usize) -> Self {
        self.write_buffer_size = size.clamp(MIN_BUFFER_SIZE, MAX_BUFFER_SIZE);
        self
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }
}

/// Whole milliseconds in `d`, saturating at `u64::MAX`.
pub(crate) fn duration_millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok()?.parse().ok()
}

/// Configuration error.
#[derive(Debug)]
pub enum ConfigError {
    IoError(PathBuf, std::io::Error),
    ParseError(PathBuf, String),
    ValidationError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(path, e) => {
                write!(f, "failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::ParseError(path, e) => {
                write!(f, "failed to parse config file '{}': {}", path.display(), e)
            }
            ConfigError::ValidationError(msg) => {
                write!(f, "configuration validation failed: {}", msg)
            }
        }
    }
}

impl std::error::Error for ConfigError {}
