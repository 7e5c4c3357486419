//! Workspace-wide defaults for poll cadence and wait budgets.
//!
//! Single source of truth for every timing literal. Configuration values in
//! [`crate::config::TimingConfig`] default to these.

/// Pause between two consecutive axis samples [s].
pub const POLL_INTERVAL_S: f64 = 0.2;

/// Budget for the start phase of a combined start/stop wait [s].
///
/// The controller may need a few cycles to leave the done state after a
/// command is accepted.
pub const START_BUDGET_S: f64 = 2.0;

/// Slack added to every normalized stop budget [s].
///
/// Absorbs rounding in caller-computed distance/velocity estimates.
pub const STOP_SLACK_S: f64 = 1.0;

/// Base budget of an absolute move, covering controller-side overhead [s].
pub const MOVE_BASE_BUDGET_S: f64 = 30.0;

/// Fixed ceiling of a jog before the distance term is added [s].
pub const JOG_CEILING_S: f64 = 30.0;

/// Extra slack added to every jog budget [s].
pub const JOG_SLACK_S: f64 = 3.0;

/// Homing ceiling. Homing velocity is not reliable enough to estimate [s].
pub const HOME_CEILING_S: f64 = 180.0;

/// Budget for the error flag to drop after an error reset [s].
pub const ERROR_RESET_BUDGET_S: f64 = 1.5;

/// Number of pauses allowed while waiting for moving/error/error-id to clear.
pub const ERROR_CLEAR_ATTEMPTS: u32 = 7;

/// Soft limit range is assumed to be the hard range divided by this factor.
pub const SOFT_RANGE_FACTOR: f64 = 1.5;

/// Start budget of a tweak [s].
pub const TWEAK_START_BUDGET_S: f64 = 0.2;

/// Stop budget of a tweak, before normalization [s].
pub const TWEAK_STOP_BUDGET_S: f64 = 10.0;

/// A sampled displacement beyond this many tweak increments is runaway.
pub const RUNAWAY_STEP_FACTOR: f64 = 2.0;

/// Default TOML configuration path for the bench binary.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/smt/bench.toml";
