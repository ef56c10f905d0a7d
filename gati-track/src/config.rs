//! Configuration for the GatiTrack daemon
//!
//! Loaded from a TOML file. Every key has a default so a partial (or empty)
//! file is valid; the tracking worker receives its section by value at
//! construction and never reads configuration from ambient state.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Format value selecting checksum-framed records
pub const FORMAT_FRAMED: &str = "USR";

/// Top-level application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub tracking: TrackingConfig,
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub modem: ModemConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Tracking worker configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TrackingConfig {
    /// Record format. `"USR"` builds framed records; anything else passes
    /// the primary fix through untouched.
    #[serde(default = "default_format")]
    pub format: String,

    /// Leading field of framed records
    #[serde(default = "default_header")]
    pub header: String,

    /// Client identifier written after the header.
    ///
    /// `None` means the device identity (IMEI) is used.
    #[serde(default, alias = "clientID", skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,

    /// Minimum speed for periodic samples to be sent unconditionally
    #[serde(default, alias = "minSpeed")]
    pub min_speed: i32,

    /// Read speed from the alternate (diagnostic) source
    #[serde(default, alias = "speedDebug")]
    pub speed_debug: bool,

    /// Promote frame and token tracing from debug to info
    #[serde(default, alias = "generalDebug")]
    pub general_debug: bool,

    /// Pause between the end of a session and the close/restart decision
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
}

/// Handoff queue configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QueueConfig {
    /// Number of ring buffer slots
    #[serde(default = "default_capacity")]
    pub capacity: usize,

    /// Bounded wait for the coordination lock before the push is abandoned
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
}

/// Modem AT channel configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ModemConfig {
    /// Path of the AT command channel (e.g. `/dev/ttyS0`).
    ///
    /// Empty discards modem writes.
    #[serde(default)]
    pub port: String,

    /// Device identity (IMEI) reported by the modem
    #[serde(default = "default_imei")]
    pub imei: String,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_level")]
    pub level: String,
}

fn default_format() -> String {
    FORMAT_FRAMED.to_string()
}

fn default_header() -> String {
    "$".to_string()
}

fn default_settle_delay_ms() -> u64 {
    1000
}

fn default_capacity() -> usize {
    100
}

fn default_lock_timeout_ms() -> u64 {
    5000
}

fn default_imei() -> String {
    "000000000000000".to_string()
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            format: default_format(),
            header: default_header(),
            client_id: None,
            min_speed: 0,
            speed_debug: false,
            general_debug: false,
            settle_delay_ms: default_settle_delay_ms(),
        }
    }
}

impl TrackingConfig {
    /// Whether records are checksum-framed (`format = "USR"`)
    pub fn is_framed(&self) -> bool {
        self.format == FORMAT_FRAMED
    }

    /// Configured client id, falling back to the device identity
    pub fn client_id_or<'a>(&'a self, identity: &'a str) -> &'a str {
        self.client_id.as_deref().unwrap_or(identity)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            lock_timeout_ms: default_lock_timeout_ms(),
        }
    }
}

impl QueueConfig {
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }
}

impl Default for ModemConfig {
    fn default() -> Self {
        Self {
            port: String::new(),
            imei: default_imei(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

impl AppConfig {
    /// Load configuration from TOML file
    ///
    /// # Example
    /// ```no_run
    /// use gati_track::config::AppConfig;
    ///
    /// let config = AppConfig::from_file("gati-track.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Reject values the worker cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.queue.capacity == 0 {
            return Err(Error::InvalidParameter(
                "queue.capacity must be at least 1".to_string(),
            ));
        }
        if self.queue.lock_timeout_ms == 0 {
            return Err(Error::InvalidParameter(
                "queue.lock_timeout_ms must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.tracking.format, "USR");
        assert_eq!(config.tracking.header, "$");
        assert_eq!(config.tracking.client_id, None);
        assert_eq!(config.tracking.min_speed, 0);
        assert_eq!(config.tracking.settle_delay_ms, 1000);
        assert_eq!(config.queue.capacity, 100);
        assert_eq!(config.queue.lock_timeout_ms, 5000);
        assert!(config.modem.port.is_empty());
        assert!(config.tracking.is_framed());
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = AppConfig::from_toml("").unwrap();
        assert_eq!(config.tracking.header, "$");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_legacy_key_aliases() {
        let toml_content = r#"
[tracking]
format = "NMEA"
clientID = "TRUCK-7"
minSpeed = 5
speedDebug = true
"#;

        let config = AppConfig::from_toml(toml_content).unwrap();
        assert!(!config.tracking.is_framed());
        assert_eq!(config.tracking.client_id.as_deref(), Some("TRUCK-7"));
        assert_eq!(config.tracking.min_speed, 5);
        assert!(config.tracking.speed_debug);
    }

    #[test]
    fn test_shipped_config_parses() {
        let config = AppConfig::from_toml(include_str!("../gati-track.toml")).unwrap();
        assert!(config.tracking.is_framed());
        assert_eq!(config.tracking.min_speed, 5);
        assert_eq!(config.queue.capacity, 100);
    }

    #[test]
    fn test_client_id_falls_back_to_identity() {
        let mut tracking = TrackingConfig::default();
        assert_eq!(tracking.client_id_or("354000000000001"), "354000000000001");

        tracking.client_id = Some("FLEET".to_string());
        assert_eq!(tracking.client_id_or("354000000000001"), "FLEET");
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let err = AppConfig::from_toml("[queue]\ncapacity = 0\n").unwrap_err();
        assert!(matches!(err, Error::InvalidParameter(_)));
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gati-track.toml");

        let mut config = AppConfig::default();
        config.tracking.header = "#".to_string();
        config.queue.capacity = 8;
        config.to_file(&path).unwrap();

        let toml_string = std::fs::read_to_string(&path).unwrap();
        assert!(toml_string.contains("[tracking]"));
        assert!(toml_string.contains("[queue]"));
        assert!(toml_string.contains("capacity = 8"));

        let loaded = AppConfig::from_file(&path).unwrap();
        assert_eq!(loaded.tracking.header, "#");
        assert_eq!(loaded.queue.capacity, 8);
    }
}
