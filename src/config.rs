//! Runtime configuration.
//!
//! A small YAML file controls the bind address, the staged takeoff
//! altitude, and the attack-engine timing knobs. Every field has a
//! default; an absent file means "all defaults".

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Top-level runtime configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Address the HTTP control surface binds to.
    pub bind_addr: String,
    /// Relative altitude in meters for the staged takeoff sequence.
    pub takeoff_altitude_m: f64,
    /// Bound on arm/climb waits inside the takeoff sequence, milliseconds.
    pub takeoff_timeout_ms: u64,
    /// Attack-engine knobs.
    pub attack: AttackConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:5000".to_string(),
            takeoff_altitude_m: 15.0,
            takeoff_timeout_ms: 60_000,
            attack: AttackConfig::default(),
        }
    }
}

/// Attack-engine timing and threshold knobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AttackConfig {
    /// Sleep between drift increments (Strategy A), milliseconds.
    pub drift_step_interval_ms: u64,
    /// Sleep between hijack monitor iterations (Strategy B), milliseconds.
    pub monitor_interval_ms: u64,
    /// Bound on joining the attack task during `stop`, milliseconds.
    pub stop_timeout_ms: u64,
    /// Value written to the EKF failsafe threshold before a hijack jump.
    pub ekf_failsafe_threshold: f64,
    /// Hijack counts as successful when the vehicle ends up within this
    /// many meters of the absolute target (haversine).
    pub success_radius_m: f64,
}

impl Default for AttackConfig {
    fn default() -> Self {
        Self {
            drift_step_interval_ms: 100,
            monitor_interval_ms: 1000,
            stop_timeout_ms: 5000,
            ekf_failsafe_threshold: 1.0e12,
            success_radius_m: 10.0,
        }
    }
}

impl AttackConfig {
    /// Drift increment interval as a [`Duration`].
    #[must_use]
    pub const fn drift_step_interval(&self) -> Duration {
        Duration::from_millis(self.drift_step_interval_ms)
    }

    /// Monitor loop interval as a [`Duration`].
    #[must_use]
    pub const fn monitor_interval(&self) -> Duration {
        Duration::from_millis(self.monitor_interval_ms)
    }

    /// Stop join bound as a [`Duration`].
    #[must_use]
    pub const fn stop_timeout(&self) -> Duration {
        Duration::from_millis(self.stop_timeout_ms)
    }
}

impl Config {
    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingFile`] when the path does not exist
    /// and [`ConfigError::ParseError`] on malformed YAML or unknown keys.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|_| ConfigError::MissingFile {
            path: path.to_path_buf(),
        })?;
        let config: Self = serde_yaml::from_str(&raw).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Validates field values beyond what the schema enforces.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for zero intervals, a zero
    /// stop bound, or a non-positive takeoff altitude.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.takeoff_altitude_m <= 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "takeoff_altitude_m".to_string(),
                value: self.takeoff_altitude_m.to_string(),
                expected: "a positive altitude in meters".to_string(),
            });
        }
        for (field, value) in [
            ("attack.drift_step_interval_ms", self.attack.drift_step_interval_ms),
            ("attack.monitor_interval_ms", self.attack.monitor_interval_ms),
            ("attack.stop_timeout_ms", self.attack.stop_timeout_ms),
        ] {
            if value == 0 {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    value: value.to_string(),
                    expected: "a non-zero duration in milliseconds".to_string(),
                });
            }
        }
        if self.attack.success_radius_m <= 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "attack.success_radius_m".to_string(),
                value: self.attack.success_radius_m.to_string(),
                expected: "a positive radius in meters".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        config.validate().expect("defaults must validate");
        assert_eq!(config.bind_addr, "127.0.0.1:5000");
        assert_eq!(config.attack.drift_step_interval_ms, 100);
        assert_eq!(config.attack.monitor_interval_ms, 1000);
    }

    #[test]
    fn load_missing_file_is_explicit() {
        let err = Config::load(Path::new("/nonexistent/driftjack.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::MissingFile { .. }));
    }

    #[test]
    fn load_partial_yaml_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "bind_addr: \"0.0.0.0:8080\"").unwrap();
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:8080");
        assert_eq!(config.attack.stop_timeout_ms, 5000);
    }

    #[test]
    fn load_rejects_unknown_keys() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "bind_adr: \"typo\"").unwrap();
        let err = Config::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn zero_interval_rejected() {
        let mut config = Config::default();
        config.attack.drift_step_interval_ms = 0;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn zero_stop_timeout_rejected() {
        let mut config = Config::default();
        config.attack.stop_timeout_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn negative_takeoff_altitude_rejected() {
        let config = Config {
            takeoff_altitude_m: -1.0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn durations_convert() {
        let attack = AttackConfig::default();
        assert_eq!(attack.drift_step_interval(), Duration::from_millis(100));
        assert_eq!(attack.monitor_interval(), Duration::from_secs(1));
        assert_eq!(attack.stop_timeout(), Duration::from_secs(5));
    }
}
