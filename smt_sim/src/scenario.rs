//! Bench scenarios.
//!
//! Each scenario drives the sequencer through one motion procedure and
//! turns the outcome into a [`ScenarioReport`]. Assertion failures fail the
//! scenario; transport failures abort the run.
//!
//! | Scenario         | Procedure                                             |
//! |------------------|-------------------------------------------------------|
//! | `move`           | 10 %, 90 % of the range, then the midpoint            |
//! | `home`           | home switch via low limit, approached from mid-range  |
//! | `jog-limit`      | jog forward into the high soft limit                  |
//! | `jog-hard-limit` | jog forward into the plus limit switch, limits zeroed |
//! | `tweak`          | one tweak increment with the safety monitor armed     |
//! | `amp-off`        | jog with the loop open, expect and clear the error    |

use std::fmt;

use clap::ValueEnum;
use serde::Serialize;
use smt_common::attribute::AxisAttribute;
use smt_common::channel::{AxisChannel, ChannelError};
use smt_core::check::within_tolerance;
use smt_core::context::SuiteContext;
use smt_core::pacer::Pacer;
use smt_core::safety::TravelDirection;
use smt_core::sequence::{HomeApproach, HomeRequest, HomingProcedure, MotionSequencer};
use smt_core::SequenceError;
use tracing::{info, warn};

use crate::clock::SimClock;

/// Position tolerance for moves and jogs.
pub const POSITION_TOLERANCE: f64 = 0.1;

/// Start and stop budget while provoking the amplifier-off error [s].
pub const AMP_OFF_WAIT_S: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Scenario {
    Move,
    Home,
    JogLimit,
    JogHardLimit,
    Tweak,
    AmpOff,
}

impl Scenario {
    /// Full suite in run order.
    pub const ALL: [Self; 6] = [
        Self::Move,
        Self::Home,
        Self::JogLimit,
        Self::JogHardLimit,
        Self::Tweak,
        Self::AmpOff,
    ];

    pub const fn name(&self) -> &'static str {
        match self {
            Self::Move => "move",
            Self::Home => "home",
            Self::JogLimit => "jog-limit",
            Self::JogHardLimit => "jog-hard-limit",
            Self::Tweak => "tweak",
            Self::AmpOff => "amp-off",
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioReport {
    pub scenario: Scenario,
    pub passed: bool,
    pub detail: String,
    /// Simulated time spent [s].
    pub elapsed_s: f64,
}

impl fmt::Display for ScenarioReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {:<14} {:>8.2} s  {}",
            if self.passed { "PASS" } else { "FAIL" },
            self.scenario,
            self.elapsed_s,
            self.detail
        )
    }
}

/// Run one scenario.
///
/// The axis is brought to a closed loop with no latched error first.
///
/// # Errors
///
/// Channel failures; assertion failures are reported as a failed scenario.
pub fn run_scenario<A: AxisChannel, P: Pacer>(
    ctx: &mut SuiteContext<A, P>,
    scenario: Scenario,
    clock: &SimClock,
) -> Result<ScenarioReport, ChannelError> {
    info!(%scenario, "scenario start");
    let started = clock.now();
    prepare(ctx.sequencer_mut())?;

    let result = match scenario {
        Scenario::Move => check_move(ctx),
        Scenario::Home => check_home(ctx),
        Scenario::JogLimit => check_jog_limit(ctx),
        Scenario::JogHardLimit => check_jog_hard_limit(ctx),
        Scenario::Tweak => check_tweak(ctx),
        Scenario::AmpOff => check_amp_off(ctx.sequencer_mut()),
    };
    let elapsed_s = clock.now().saturating_sub(started).as_secs_f64();

    let (passed, detail) = match result {
        Ok(detail) => (true, detail),
        Err(e @ SequenceError::Assertion { .. }) => (false, e.to_string()),
        Err(SequenceError::Channel(e)) => return Err(e),
    };
    if passed {
        info!(%scenario, elapsed_s, %detail, "scenario passed");
    } else {
        warn!(%scenario, elapsed_s, %detail, "scenario failed");
    }
    Ok(ScenarioReport {
        scenario,
        passed,
        detail,
        elapsed_s,
    })
}

fn prepare<A: AxisChannel, P: Pacer>(seq: &mut MotionSequencer<A, P>) -> Result<(), ChannelError> {
    if seq.read_fault()?.active {
        seq.reset_errors()?;
    }
    seq.set_closed_loop(true)
}

// ── Scenarios ───────────────────────────────────────────────────────

fn check_move<A: AxisChannel, P: Pacer>(
    ctx: &mut SuiteContext<A, P>,
) -> Result<String, SequenceError> {
    let fixture = *ctx.fixture();
    let seq = ctx.sequencer_mut();
    let destinations = [
        fixture.position_at_fraction(0.1),
        fixture.position_at_fraction(0.9),
        fixture.midpoint(),
    ];
    for destination in destinations {
        let report = seq.move_absolute(destination, fixture.velocity, fixture.acceleration)?;
        if !report.stopped {
            return Err(SequenceError::assertion(
                "move",
                format!("axis not done within {} s", report.budget_s),
            ));
        }
        let position = seq.readback()?;
        if !within_tolerance(destination, position, POSITION_TOLERANCE) {
            return Err(SequenceError::assertion(
                "move",
                format!("position {position} not within {POSITION_TOLERANCE} of {destination}"),
            ));
        }
    }
    Ok(format!("reached {destinations:?}"))
}

fn check_home<A: AxisChannel, P: Pacer>(
    ctx: &mut SuiteContext<A, P>,
) -> Result<String, SequenceError> {
    let seq = ctx.sequencer_mut();
    let status = seq.home(HomeRequest::new(
        Some(HomingProcedure::SwitchViaLowLimit),
        HomeApproach::FromMidRange,
    ))?;
    let position = seq.readback()?;
    Ok(format!(
        "homed at {position}, status {}",
        status.display(seq.firmware())
    ))
}

fn check_jog_limit<A: AxisChannel, P: Pacer>(
    ctx: &mut SuiteContext<A, P>,
) -> Result<String, SequenceError> {
    let fixture = *ctx.fixture();
    if !fixture.limits_enabled() {
        return Err(SequenceError::assertion("jog-limit", "soft limits disabled"));
    }
    let seq = ctx.sequencer_mut();
    let report = seq.jog(
        TravelDirection::Forward,
        fixture.jog_velocity,
        fixture.acceleration,
    )?;
    if !report.stopped {
        return Err(SequenceError::assertion(
            "jog-limit",
            format!("axis not done within {} s", report.budget_s),
        ));
    }
    let position = seq.readback()?;
    if !within_tolerance(fixture.high_limit, position, POSITION_TOLERANCE) {
        return Err(SequenceError::assertion(
            "jog-limit",
            format!(
                "stopped at {position}, high limit is {}",
                fixture.high_limit
            ),
        ));
    }
    if !seq.axis_mut().read_flag(AxisAttribute::LimitViolation)? {
        return Err(SequenceError::assertion(
            "jog-limit",
            "limit violation not reported",
        ));
    }
    let status = seq.read_status()?;
    if status.problem() {
        return Err(SequenceError::assertion("jog-limit", "problem bit set"));
    }
    if status.plus_limit() || status.minus_limit() {
        return Err(SequenceError::assertion(
            "jog-limit",
            format!("limit switch active (status {:#06x})", status.raw()),
        ));
    }
    Ok(format!("stopped at {position}"))
}

/// Jog forward with both soft limits zeroed until the plus limit switch
/// stops the axis.
fn check_jog_hard_limit<A: AxisChannel, P: Pacer>(
    ctx: &mut SuiteContext<A, P>,
) -> Result<String, SequenceError> {
    let fixture = *ctx.fixture();
    let seq = ctx.sequencer_mut();
    let extra = if fixture.jog_velocity > 0.0 {
        seq.timing().soft_range_factor * fixture.range().abs() / fixture.jog_velocity
            + 2.0 * fixture.acceleration
    } else {
        0.0
    };
    let report =
        seq.with_limits_zeroed(|seq| seq.jog_with_budget(TravelDirection::Forward, extra))?;
    if !report.stopped {
        return Err(SequenceError::assertion(
            "jog-hard-limit",
            format!("axis not done within {} s", report.budget_s),
        ));
    }

    let status = seq.read_status()?;
    let position = seq.readback()?;
    if !status.plus_limit() {
        return Err(SequenceError::assertion(
            "jog-hard-limit",
            format!("plus limit switch not active at {position}"),
        ));
    }
    if status.minus_limit() {
        return Err(SequenceError::assertion(
            "jog-hard-limit",
            "minus limit switch active",
        ));
    }
    if status.problem() {
        return Err(SequenceError::assertion("jog-hard-limit", "problem bit set"));
    }
    Ok(format!("plus limit switch at {position}"))
}

fn check_tweak<A: AxisChannel, P: Pacer>(
    ctx: &mut SuiteContext<A, P>,
) -> Result<String, SequenceError> {
    let report = ctx.sequencer_mut().tweak()?;
    if !report.passed() {
        return Err(SequenceError::assertion(
            "tweak",
            format!(
                "{:?}: at {}, expected {}",
                report.outcome, report.position, report.destination
            ),
        ));
    }
    Ok(format!(
        "{} to {} (expected {})",
        report.direction, report.position, report.destination
    ))
}

/// Jog with the loop open, expect the controller error, then clear it.
/// The jog command and the loop are put back in every case.
fn check_amp_off<A: AxisChannel, P: Pacer>(
    seq: &mut MotionSequencer<A, P>,
) -> Result<String, SequenceError> {
    seq.set_closed_loop(false)?;
    let result = seq
        .axis_mut()
        .command(AxisAttribute::JogForward, true)
        .map_err(SequenceError::from)
        .and_then(|()| expect_amp_off_error(seq));

    let restored = seq
        .axis_mut()
        .command(AxisAttribute::JogForward, false)
        .and_then(|()| seq.set_closed_loop(true));
    match (result, restored) {
        (Ok(detail), Ok(())) => Ok(detail),
        (Ok(_), Err(e)) => Err(e.into()),
        (Err(e), _) => Err(e),
    }
}

fn expect_amp_off_error<A: AxisChannel, P: Pacer>(
    seq: &mut MotionSequencer<A, P>,
) -> Result<String, SequenceError> {
    let started = seq.wait_for_start(AMP_OFF_WAIT_S)?;
    if !seq.wait_for_stop(AMP_OFF_WAIT_S)? {
        return Err(SequenceError::assertion("amp-off", "axis did not settle"));
    }
    let status = seq.read_status()?;
    let fault = seq.read_fault()?;
    info!(
        started,
        status = %status.display(seq.firmware()),
        error = fault.active,
        error_id = fault.id,
        "amplifier off"
    );
    if !status.problem() {
        return Err(SequenceError::assertion("amp-off", "problem bit not set"));
    }
    if status.drive_fault(seq.firmware()) {
        return Err(SequenceError::assertion("amp-off", "drive fault set"));
    }
    if status.moving() {
        return Err(SequenceError::assertion("amp-off", "axis moving"));
    }
    if !fault.active || fault.id == 0 {
        return Err(SequenceError::assertion(
            "amp-off",
            format!("no controller error (flag {}, id {})", fault.active, fault.id),
        ));
    }

    if !seq.reset_errors()? {
        return Err(SequenceError::assertion("amp-off", "error flag not reset"));
    }
    let state = seq.wait_for_fault_clear()?;
    if !state.is_clear() {
        return Err(SequenceError::assertion(
            "amp-off",
            format!(
                "not clear after reset (moving {}, error {}, id {})",
                state.status.moving(),
                state.fault.active,
                state.fault.id
            ),
        ));
    }
    Ok(format!("error {} raised and cleared", fault.id))
}
