//! Bridge configuration, loadable from TOML with CLI overrides on top.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::consts::{DEFAULT_RATE_HZ, DEFAULT_SHM_KEY, MAX_RATE_HZ};

/// Configuration errors raised while loading or validating a [`BridgeConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid loop rate {0} Hz: must be finite, positive and at most {MAX_RATE_HZ} Hz")]
    InvalidRate(f64),
    #[error("invalid segment key {0}: must be positive")]
    InvalidKey(i32),
}

/// Runtime configuration of the bridge process.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BridgeConfig {
    /// System V key of the shared segment.
    pub key: i32,
    /// Target control-loop rate [Hz].
    pub rate_hz: f64,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            key: DEFAULT_SHM_KEY,
            rate_hz: DEFAULT_RATE_HZ,
        }
    }
}

impl BridgeConfig {
    /// Load from a TOML file. Missing fields fall back to defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config: Self = toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject rates and keys the loop cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.rate_hz.is_finite() || self.rate_hz <= 0.0 || self.rate_hz > MAX_RATE_HZ {
            return Err(ConfigError::InvalidRate(self.rate_hz));
        }
        if self.key <= 0 {
            return Err(ConfigError::InvalidKey(self.key));
        }
        Ok(())
    }

    /// Period of one control cycle.
    pub fn loop_period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.rate_hz)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    #[test]
    fn defaults() {
        let c = BridgeConfig::default();
        assert_eq!(c.key, DEFAULT_SHM_KEY);
        assert_eq!(c.rate_hz, DEFAULT_RATE_HZ);
        assert_eq!(c.loop_period(), Duration::from_millis(1));
        c.validate().unwrap();
    }

    #[test]
    fn load_partial_file_fills_defaults() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "rate_hz = 500.0").unwrap();
        let c = BridgeConfig::from_file(f.path()).unwrap();
        assert_eq!(c.rate_hz, 500.0);
        assert_eq!(c.key, DEFAULT_SHM_KEY);
        assert_eq!(c.loop_period(), Duration::from_millis(2));
    }

    #[test]
    fn unknown_field_is_rejected() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "rate = 500.0").unwrap();
        assert!(matches!(
            BridgeConfig::from_file(f.path()),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn invalid_values_are_rejected() {
        let mut c = BridgeConfig::default();
        c.rate_hz = 0.0;
        assert!(matches!(c.validate(), Err(ConfigError::InvalidRate(_))));
        c.rate_hz = f64::NAN;
        assert!(matches!(c.validate(), Err(ConfigError::InvalidRate(_))));
        c.rate_hz = 20_000.0;
        assert!(matches!(c.validate(), Err(ConfigError::InvalidRate(_))));

        c = BridgeConfig::default();
        c.key = 0;
        assert!(matches!(c.validate(), Err(ConfigError::InvalidKey(0))));
        c.key = -5;
        assert!(matches!(c.validate(), Err(ConfigError::InvalidKey(-5))));
    }

    #[test]
    fn missing_file_is_io_error() {
        assert!(matches!(
            BridgeConfig::from_file("/nonexistent/omni_bridge.toml"),
            Err(ConfigError::Io { .. })
        ));
    }
}
