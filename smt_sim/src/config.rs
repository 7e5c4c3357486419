//! Bench configuration: the suite sections plus the simulated axis.
//!
//! # TOML Example
//!
//! ```toml
//! [shared]
//! service_name = "smt-bench"
//!
//! [axis]
//! name = "SIM:m1"
//!
//! [sim]
//! clock = "virtual"
//! hard_low = -110.0
//! hard_high = 110.0
//! velocity = 10.0
//! ```

use serde::{Deserialize, Serialize};
use smt_common::config::{AxisSection, ConfigError, SharedConfig, SuiteConfig, TimingConfig};

use crate::clock::ClockMode;

fn default_hard_low() -> f64 {
    -110.0
}

fn default_hard_high() -> f64 {
    110.0
}

fn default_home_switch() -> f64 {
    5.0
}

fn default_home_switch_width() -> f64 {
    0.5
}

fn default_soft_low() -> f64 {
    -100.0
}

fn default_soft_high() -> f64 {
    100.0
}

fn default_velocity() -> f64 {
    10.0
}

fn default_acceleration() -> f64 {
    0.2
}

fn default_jog_velocity() -> f64 {
    5.0
}

fn default_homing_velocity() -> f64 {
    5.0
}

fn default_tweak_increment() -> f64 {
    1.0
}

fn default_closed_loop() -> bool {
    true
}

fn default_homing_procedure() -> u8 {
    3
}

/// Simulated axis parameters. Positions are dial values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimAxisConfig {
    #[serde(default)]
    pub clock: ClockMode,

    /// Hard limit switch positions.
    #[serde(default = "default_hard_low")]
    pub hard_low: f64,
    #[serde(default = "default_hard_high")]
    pub hard_high: f64,

    /// Home switch centre and active width.
    #[serde(default = "default_home_switch")]
    pub home_switch: f64,
    #[serde(default = "default_home_switch_width")]
    pub home_switch_width: f64,

    /// Initial soft limits. Equal values disable them.
    #[serde(default = "default_soft_low")]
    pub soft_low: f64,
    #[serde(default = "default_soft_high")]
    pub soft_high: f64,

    /// User = dial + offset.
    #[serde(default)]
    pub offset: f64,

    #[serde(default = "default_velocity")]
    pub velocity: f64,
    #[serde(default = "default_acceleration")]
    pub acceleration: f64,
    #[serde(default = "default_jog_velocity")]
    pub jog_velocity: f64,
    #[serde(default = "default_homing_velocity")]
    pub homing_velocity: f64,
    #[serde(default = "default_tweak_increment")]
    pub tweak_increment: f64,

    #[serde(default)]
    pub start_position: f64,

    /// Delay between a motion command and the moving bit [s].
    #[serde(default)]
    pub start_latency_s: f64,

    #[serde(default = "default_closed_loop")]
    pub closed_loop: bool,

    /// Initial homing procedure selector (1-6).
    #[serde(default = "default_homing_procedure")]
    pub homing_procedure: u8,

    #[serde(default)]
    pub initially_homed: bool,

    /// Freeze the next homing run until stopped.
    #[serde(default)]
    pub stall_homing: bool,

    /// Jump applied on the first motion update; 0 disables.
    #[serde(default)]
    pub runaway_jump: f64,
}

impl Default for SimAxisConfig {
    fn default() -> Self {
        Self {
            clock: ClockMode::default(),
            hard_low: default_hard_low(),
            hard_high: default_hard_high(),
            home_switch: default_home_switch(),
            home_switch_width: default_home_switch_width(),
            soft_low: default_soft_low(),
            soft_high: default_soft_high(),
            offset: 0.0,
            velocity: default_velocity(),
            acceleration: default_acceleration(),
            jog_velocity: default_jog_velocity(),
            homing_velocity: default_homing_velocity(),
            tweak_increment: default_tweak_increment(),
            start_position: 0.0,
            start_latency_s: 0.0,
            closed_loop: default_closed_loop(),
            homing_procedure: default_homing_procedure(),
            initially_homed: false,
            stall_homing: false,
            runaway_jump: 0.0,
        }
    }
}

impl SimAxisConfig {
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` for an empty hard range, a
    /// start position outside it, non-positive speeds or a negative latency.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.hard_low >= self.hard_high {
            return Err(ConfigError::ValidationError(format!(
                "sim.hard_low ({}) must be below sim.hard_high ({})",
                self.hard_low, self.hard_high
            )));
        }
        if !(self.hard_low..=self.hard_high).contains(&self.start_position) {
            return Err(ConfigError::ValidationError(format!(
                "sim.start_position ({}) outside hard limits",
                self.start_position
            )));
        }
        for (name, value) in [
            ("velocity", self.velocity),
            ("jog_velocity", self.jog_velocity),
            ("homing_velocity", self.homing_velocity),
        ] {
            if value <= 0.0 {
                return Err(ConfigError::ValidationError(format!(
                    "sim.{name} must be positive, got {value}"
                )));
            }
        }
        if self.start_latency_s < 0.0 {
            return Err(ConfigError::ValidationError(
                "sim.start_latency_s cannot be negative".to_string(),
            ));
        }
        Ok(())
    }
}

/// Root of `bench.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchConfig {
    pub shared: SharedConfig,
    pub axis: AxisSection,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub sim: SimAxisConfig,
}

impl BenchConfig {
    /// Suite sections as consumed by the sequencer.
    pub fn suite(&self) -> SuiteConfig {
        SuiteConfig {
            shared: self.shared.clone(),
            axis: self.axis.clone(),
            timing: self.timing.clone(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.suite().validate()?;
        self.sim.validate()
    }
}
