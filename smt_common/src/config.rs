//! Configuration loading traits and types.
//!
//! This module provides a standardized way to load TOML configuration files
//! across the workspace, plus the suite configuration shared by the core and
//! the bench binary.
//!
//! # Usage
//!
//! ```rust,no_run
//! use smt_common::config::{ConfigLoader, SuiteConfig, ConfigError};
//! use std::path::Path;
//!
//! fn main() -> Result<(), ConfigError> {
//!     let config = SuiteConfig::load(Path::new("bench.toml"))?;
//!     config.validate()?;
//!     println!("Axis: {}", config.axis.name);
//!     Ok(())
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::attribute::Coordinates;
use crate::consts;
use crate::status::FirmwareVariant;

/// Error type for configuration loading operations.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// Configuration file not found at specified path.
    #[error("Configuration file not found")]
    FileNotFound,

    /// TOML parsing failed.
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Semantic validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

/// Log level for application logging.
///
/// Uses lowercase serde values for TOML compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

/// Common configuration fields shared by every binary in the workspace.
///
/// # TOML Example
///
/// ```toml
/// [shared]
/// log_level = "debug"
/// service_name = "smt-bench-01"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedConfig {
    /// Logging verbosity level.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Application instance identifier.
    pub service_name: String,
}

impl SharedConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if `service_name` is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service_name.is_empty() {
            return Err(ConfigError::ValidationError(
                "service_name cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Trait for loading configuration from TOML files.
///
/// # Contract
///
/// - Returns `ConfigError::FileNotFound` if the file does not exist
/// - Returns `ConfigError::ParseError` if TOML syntax is invalid
pub trait ConfigLoader: Sized + serde::de::DeserializeOwned {
    /// Load configuration from a TOML file.
    fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::FileNotFound
            } else {
                ConfigError::ParseError(e.to_string())
            }
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

impl<T: serde::de::DeserializeOwned> ConfigLoader for T {}

// ─── Suite configuration ────────────────────────────────────────────

/// Axis under test.
///
/// ```toml
/// [axis]
/// name = "IOC:m1"
/// readback = "user"
/// firmware = "slip_stall"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AxisSection {
    /// Channel prefix of the axis record.
    pub name: String,

    /// Coordinate system used for readback, limits and targets.
    #[serde(default)]
    pub readback: Coordinates,

    /// Meaning of status bit 7.
    #[serde(default)]
    pub firmware: FirmwareVariant,
}

/// Poll cadence and wait budgets. All values in seconds unless noted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingConfig {
    #[serde(default = "default_poll_interval")]
    pub poll_interval_s: f64,
    #[serde(default = "default_start_budget")]
    pub start_budget_s: f64,
    #[serde(default = "default_stop_slack")]
    pub stop_slack_s: f64,
    #[serde(default = "default_move_base_budget")]
    pub move_base_budget_s: f64,
    #[serde(default = "default_jog_ceiling")]
    pub jog_ceiling_s: f64,
    #[serde(default = "default_jog_slack")]
    pub jog_slack_s: f64,
    #[serde(default = "default_home_ceiling")]
    pub home_ceiling_s: f64,
    #[serde(default = "default_error_reset_budget")]
    pub error_reset_budget_s: f64,
    /// Pause count, not seconds.
    #[serde(default = "default_error_clear_attempts")]
    pub error_clear_attempts: u32,
    /// Dimensionless.
    #[serde(default = "default_soft_range_factor")]
    pub soft_range_factor: f64,
    #[serde(default = "default_tweak_start_budget")]
    pub tweak_start_budget_s: f64,
    #[serde(default = "default_tweak_stop_budget")]
    pub tweak_stop_budget_s: f64,
}

fn default_poll_interval() -> f64 {
    consts::POLL_INTERVAL_S
}
fn default_start_budget() -> f64 {
    consts::START_BUDGET_S
}
fn default_stop_slack() -> f64 {
    consts::STOP_SLACK_S
}
fn default_move_base_budget() -> f64 {
    consts::MOVE_BASE_BUDGET_S
}
fn default_jog_ceiling() -> f64 {
    consts::JOG_CEILING_S
}
fn default_jog_slack() -> f64 {
    consts::JOG_SLACK_S
}
fn default_home_ceiling() -> f64 {
    consts::HOME_CEILING_S
}
fn default_error_reset_budget() -> f64 {
    consts::ERROR_RESET_BUDGET_S
}
fn default_error_clear_attempts() -> u32 {
    consts::ERROR_CLEAR_ATTEMPTS
}
fn default_soft_range_factor() -> f64 {
    consts::SOFT_RANGE_FACTOR
}
fn default_tweak_start_budget() -> f64 {
    consts::TWEAK_START_BUDGET_S
}
fn default_tweak_stop_budget() -> f64 {
    consts::TWEAK_STOP_BUDGET_S
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            poll_interval_s: default_poll_interval(),
            start_budget_s: default_start_budget(),
            stop_slack_s: default_stop_slack(),
            move_base_budget_s: default_move_base_budget(),
            jog_ceiling_s: default_jog_ceiling(),
            jog_slack_s: default_jog_slack(),
            home_ceiling_s: default_home_ceiling(),
            error_reset_budget_s: default_error_reset_budget(),
            error_clear_attempts: default_error_clear_attempts(),
            soft_range_factor: default_soft_range_factor(),
            tweak_start_budget_s: default_tweak_start_budget(),
            tweak_stop_budget_s: default_tweak_stop_budget(),
        }
    }
}

impl TimingConfig {
    /// Validate the timing table.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if:
    /// - `poll_interval_s` is not strictly positive and finite
    /// - any budget is negative or not finite
    /// - `soft_range_factor` is not strictly positive
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.poll_interval_s.is_finite() && self.poll_interval_s > 0.0) {
            return Err(ConfigError::ValidationError(format!(
                "poll_interval_s must be > 0 (got {})",
                self.poll_interval_s
            )));
        }
        let budgets = [
            ("start_budget_s", self.start_budget_s),
            ("stop_slack_s", self.stop_slack_s),
            ("move_base_budget_s", self.move_base_budget_s),
            ("jog_ceiling_s", self.jog_ceiling_s),
            ("jog_slack_s", self.jog_slack_s),
            ("home_ceiling_s", self.home_ceiling_s),
            ("error_reset_budget_s", self.error_reset_budget_s),
            ("tweak_start_budget_s", self.tweak_start_budget_s),
            ("tweak_stop_budget_s", self.tweak_stop_budget_s),
        ];
        for (name, value) in budgets {
            if !(value.is_finite() && value >= 0.0) {
                return Err(ConfigError::ValidationError(format!(
                    "{name} must be >= 0 (got {value})"
                )));
            }
        }
        if !(self.soft_range_factor.is_finite() && self.soft_range_factor > 0.0) {
            return Err(ConfigError::ValidationError(format!(
                "soft_range_factor must be > 0 (got {})",
                self.soft_range_factor
            )));
        }
        Ok(())
    }

    /// Poll interval as a [`Duration`].
    ///
    /// A zero, negative or non-finite value falls back to
    /// [`consts::POLL_INTERVAL_S`].
    #[inline]
    pub fn poll_interval(&self) -> Duration {
        match Duration::try_from_secs_f64(self.poll_interval_s) {
            Ok(interval) if !interval.is_zero() => interval,
            _ => Duration::from_secs_f64(consts::POLL_INTERVAL_S),
        }
    }
}

/// Complete suite configuration.
///
/// # TOML Example
///
/// ```toml
/// [shared]
/// service_name = "smt-bench"
///
/// [axis]
/// name = "IOC:m1"
///
/// [timing]
/// poll_interval_s = 0.1
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteConfig {
    pub shared: SharedConfig,
    pub axis: AxisSection,
    #[serde(default)]
    pub timing: TimingConfig,
}

impl SuiteConfig {
    /// Validate every section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;
        if self.axis.name.is_empty() {
            return Err(ConfigError::ValidationError(
                "axis.name cannot be empty".to_string(),
            ));
        }
        self.timing.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_log_level_deserialization() {
        #[derive(Debug, Deserialize)]
        struct TestWrapper {
            level: LogLevel,
        }

        assert_eq!(
            toml::from_str::<TestWrapper>("level = \"trace\"").unwrap().level,
            LogLevel::Trace
        );
        assert_eq!(
            toml::from_str::<TestWrapper>("level = \"warn\"").unwrap().level,
            LogLevel::Warn
        );
        assert_eq!(LogLevel::default(), LogLevel::Info);
    }

    #[test]
    fn test_shared_config_validation_empty_service_name() {
        let config = SharedConfig {
            log_level: LogLevel::Info,
            service_name: "".to_string(),
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_config_loader_file_not_found() {
        let result = SuiteConfig::load(Path::new("/nonexistent/path/bench.toml"));
        assert!(matches!(result, Err(ConfigError::FileNotFound)));
    }

    #[test]
    fn test_config_loader_parse_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "invalid toml {{{{").unwrap();

        let result = SuiteConfig::load(file.path());
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_suite_config_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[shared]
service_name = "bench"

[axis]
name = "IOC:m1"
"#
        )
        .unwrap();
        file.flush().unwrap();

        let config = SuiteConfig::load(file.path()).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.axis.readback, Coordinates::User);
        assert_eq!(config.axis.firmware, FirmwareVariant::SlipStall);
        assert_eq!(config.timing, TimingConfig::default());
        assert_eq!(config.timing.poll_interval(), Duration::from_millis(200));
    }

    #[test]
    fn test_suite_config_overrides() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[shared]
log_level = "debug"
service_name = "bench"

[axis]
name = "IOC:m2"
readback = "dial"
firmware = "following_error"

[timing]
poll_interval_s = 0.05
home_ceiling_s = 60.0
"#
        )
        .unwrap();
        file.flush().unwrap();

        let config = SuiteConfig::load(file.path()).unwrap();
        assert_eq!(config.shared.log_level, LogLevel::Debug);
        assert_eq!(config.axis.readback, Coordinates::Dial);
        assert_eq!(config.axis.firmware, FirmwareVariant::FollowingError);
        assert_eq!(config.timing.poll_interval_s, 0.05);
        assert_eq!(config.timing.home_ceiling_s, 60.0);
        assert_eq!(config.timing.jog_ceiling_s, consts::JOG_CEILING_S);
    }

    #[test]
    fn test_timing_validation() {
        let mut timing = TimingConfig::default();
        assert!(timing.validate().is_ok());

        timing.poll_interval_s = 0.0;
        assert!(timing.validate().is_err());

        let mut timing = TimingConfig::default();
        timing.stop_slack_s = -1.0;
        let err = timing.validate().unwrap_err();
        assert!(err.to_string().contains("stop_slack_s"));

        let mut timing = TimingConfig::default();
        timing.soft_range_factor = 0.0;
        assert!(timing.validate().is_err());
    }

    #[test]
    fn test_suite_config_rejects_empty_axis() {
        let config = SuiteConfig {
            shared: SharedConfig {
                log_level: LogLevel::Info,
                service_name: "bench".to_string(),
            },
            axis: AxisSection {
                name: String::new(),
                readback: Coordinates::User,
                firmware: FirmwareVariant::SlipStall,
            },
            timing: TimingConfig::default(),
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_poll_interval_falls_back_on_invalid_value() {
        let fallback = Duration::from_secs_f64(consts::POLL_INTERVAL_S);
        for value in [-0.5, 0.0, f64::NAN, f64::INFINITY] {
            let timing = TimingConfig {
                poll_interval_s: value,
                ..TimingConfig::default()
            };
            assert_eq!(timing.poll_interval(), fallback, "{value}");
        }

        let timing = TimingConfig {
            poll_interval_s: 0.05,
            ..TimingConfig::default()
        };
        assert_eq!(timing.poll_interval(), Duration::from_millis(50));
    }
}
