//! Homing with optional pre-approach.
//!
//! ## Procedure
//!
//! 1. Capture travel limits.
//! 2. Pre-approach: none, move to mid-range, or jog into a limit with both
//!    limits zeroed.
//! 3. Select the homing procedure (restored afterwards, waiting for completion).
//! 4. Home reverse when the plus limit is active, else home forward.
//! 5. Wait up to the home ceiling; assert done, no drive fault, homed.

use serde::{Deserialize, Serialize};
use smt_common::attribute::AxisAttribute;
use smt_common::channel::{AxisChannel, WriteMode};
use smt_common::status::StatusWord;
use tracing::info;

use super::MotionSequencer;
use crate::error::SequenceError;
use crate::pacer::Pacer;
use crate::safety::TravelDirection;

// ─── Procedure selector ─────────────────────────────────────────────

/// Controller homing procedure (value of the selector attribute).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HomingProcedure {
    /// 1: reference on the low limit switch.
    LowLimit,
    /// 2: reference on the high limit switch.
    HighLimit,
    /// 3: home switch, searched from the low limit switch.
    SwitchViaLowLimit,
    /// 4: home switch, searched from the high limit switch.
    SwitchViaHighLimit,
    /// 5: home switch middle, searched from the low side.
    SwitchMiddleFromLow,
    /// 6: home switch middle, searched from the high side.
    SwitchMiddleFromHigh,
}

impl HomingProcedure {
    pub const ALL: [Self; 6] = [
        Self::LowLimit,
        Self::HighLimit,
        Self::SwitchViaLowLimit,
        Self::SwitchViaHighLimit,
        Self::SwitchMiddleFromLow,
        Self::SwitchMiddleFromHigh,
    ];

    pub const fn selector(&self) -> u8 {
        match self {
            Self::LowLimit => 1,
            Self::HighLimit => 2,
            Self::SwitchViaLowLimit => 3,
            Self::SwitchViaHighLimit => 4,
            Self::SwitchMiddleFromLow => 5,
            Self::SwitchMiddleFromHigh => 6,
        }
    }

    pub const fn from_selector(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::LowLimit),
            2 => Some(Self::HighLimit),
            3 => Some(Self::SwitchViaLowLimit),
            4 => Some(Self::SwitchViaHighLimit),
            5 => Some(Self::SwitchMiddleFromLow),
            6 => Some(Self::SwitchMiddleFromHigh),
            _ => None,
        }
    }
}

// ─── Request ────────────────────────────────────────────────────────

/// Positioning before the homing command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HomeApproach {
    /// Home from wherever the axis is.
    #[default]
    Direct,
    /// Move to the midpoint of the travel limits first.
    FromMidRange,
    /// Jog into the limit switch in the given direction first.
    FromLimit(TravelDirection),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HomeRequest {
    /// Procedure to select; `None` keeps the controller's current one.
    pub procedure: Option<HomingProcedure>,
    pub approach: HomeApproach,
}

impl HomeRequest {
    pub const fn new(procedure: Option<HomingProcedure>, approach: HomeApproach) -> Self {
        Self {
            procedure,
            approach,
        }
    }
}

// ─── Sequencer ──────────────────────────────────────────────────────

impl<A: AxisChannel, P: Pacer> MotionSequencer<A, P> {
    /// Home the axis. Returns the final status word.
    ///
    /// # Errors
    ///
    /// - `SequenceError::Channel` on transport failure
    /// - `SequenceError::Assertion` if the axis is not done within the home
    ///   ceiling, reports a drive fault, or is not homed
    ///
    /// Limits and the procedure selector are restored in every case.
    pub fn home(&mut self, request: HomeRequest) -> Result<StatusWord, SequenceError> {
        info!(axis = self.axis.name(), ?request, "homing");
        let coordinates = self.settings.coordinates;
        let high = self.axis.read(coordinates.high_limit())?;
        let low = self.axis.read(coordinates.low_limit())?;

        match request.approach {
            HomeApproach::Direct => {}
            HomeApproach::FromMidRange => {
                let velocity = self.axis.read(AxisAttribute::Velocity)?;
                let acceleration = self.axis.read(AxisAttribute::Acceleration)?;
                self.move_absolute((high + low) / 2.0, velocity, acceleration)?;
            }
            HomeApproach::FromLimit(direction) => {
                let jog_velocity = self.axis.read(AxisAttribute::JogVelocity)?;
                let acceleration = self.axis.read(AxisAttribute::Acceleration)?;
                // Soft range is assumed to be the hard range / factor.
                let extra = if jog_velocity > 0.0 {
                    self.timing.soft_range_factor * (high - low) / jog_velocity
                        + 2.0 * acceleration
                } else {
                    0.0
                };
                self.with_limits_zeroed(|seq| seq.jog_with_budget(direction, extra))?;
            }
        }

        match request.procedure {
            Some(procedure) => {
                let selector = [(
                    AxisAttribute::HomingProcedure,
                    f64::from(procedure.selector()),
                )];
                self.with_overrides(&selector, WriteMode::WaitForCompletion, Self::run_home)
            }
            None => self.run_home(),
        }
    }

    fn run_home(&mut self) -> Result<StatusWord, SequenceError> {
        let ceiling = self.timing.home_ceiling_s;
        let command = if self.read_status()?.plus_limit() {
            AxisAttribute::HomeReverse
        } else {
            AxisAttribute::HomeForward
        };
        info!(%command, ceiling_s = ceiling, "home command");
        self.axis.command(command, true)?;
        let report = self.start_then_stop(ceiling)?;

        let status = self.read_status()?;
        let firmware = self.settings.firmware;
        info!(
            status = %status.display(firmware),
            raw = status.raw(),
            homed = status.is_homed(),
            "homing finished"
        );

        if !report.stopped {
            return Err(SequenceError::assertion(
                "home",
                format!("axis not done within {ceiling} s"),
            ));
        }
        if status.drive_fault(firmware) {
            return Err(SequenceError::assertion(
                "home",
                format!("drive fault set (status {:#06x})", status.raw()),
            ));
        }
        if !status.is_homed() {
            return Err(SequenceError::assertion(
                "home",
                format!("homed bit not set (status {:#06x})", status.raw()),
            ));
        }
        Ok(status)
    }
}
