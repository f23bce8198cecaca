//! Monitor configuration.

use crate::collector::procfs::DEFAULT_DISK_PREFIXES;
use crate::history::DEFAULT_HISTORY_LEN;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default time between sampling cycles.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);

/// Error type for invalid configuration values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    ZeroInterval,
    ZeroHistoryLen,
    NoDiskPrefixes,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ZeroInterval => write!(f, "sampling interval must be greater than zero"),
            ConfigError::ZeroHistoryLen => write!(f, "history length must be at least 1"),
            ConfigError::NoDiskPrefixes => write!(f, "disk prefixes must be a non-empty list of non-empty names"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Settings of one monitor instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Time between the start of consecutive cycles.
    pub interval: Duration,
    /// Samples kept per history series.
    pub history_len: usize,
    /// Root of the proc filesystem.
    pub proc_path: PathBuf,
    /// Block device name prefixes counted as physical disks.
    pub disk_prefixes: Vec<String>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            history_len: DEFAULT_HISTORY_LEN,
            proc_path: PathBuf::from("/proc"),
            disk_prefixes: DEFAULT_DISK_PREFIXES.iter().map(|p| p.to_string()).collect(),
        }
    }
}

impl MonitorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interval.is_zero() {
            return Err(ConfigError::ZeroInterval);
        }
        if self.history_len == 0 {
            return Err(ConfigError::ZeroHistoryLen);
        }
        if self.disk_prefixes.is_empty() || self.disk_prefixes.iter().any(|p| p.is_empty()) {
            return Err(ConfigError::NoDiskPrefixes);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = MonitorConfig::default();
        assert_eq!(config.interval, Duration::from_secs(1));
        assert_eq!(config.history_len, 60);
        assert_eq!(config.proc_path, PathBuf::from("/proc"));
        assert!(config.disk_prefixes.contains(&"nvme".to_string()));
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn test_validate_rejects_zero_values() {
        let config = MonitorConfig {
            interval: Duration::ZERO,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroInterval));

        let config = MonitorConfig {
            history_len: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroHistoryLen));

        let config = MonitorConfig {
            disk_prefixes: vec![String::new()],
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::NoDiskPrefixes));
    }

    #[test]
    fn test_config_json_roundtrip() {
        let config = MonitorConfig {
            interval: Duration::from_millis(2500),
            ..Default::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        let back: MonitorConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
