//! Motion procedures composed from writes and waits.
//!
//! Every procedure follows modify → act → restore. Restoration is
//! best-effort: failures are logged, and escalated only when the primary
//! action itself succeeded.
//!
//! - [`motion`] - move to absolute position, jog, tweak
//! - [`homing`] - home with optional pre-approach
//! - [`scoped`] - temporary attribute overrides and limit zeroing

pub mod homing;
pub mod motion;
pub mod scoped;

pub use homing::{HomeApproach, HomeRequest, HomingProcedure};
pub use motion::{MotionReport, MotionTarget, TweakReport};

use smt_common::attribute::{AxisAttribute, Coordinates};
use smt_common::channel::{AxisChannel, ChannelError};
use smt_common::config::{SuiteConfig, TimingConfig};
use smt_common::status::{FirmwareVariant, StatusWord};

use crate::pacer::Pacer;
use crate::recovery::{self, AxisFault, FaultState};
use crate::safety::TravelDirection;
use crate::snapshot::AxisSnapshot;
use crate::waiter::{MotionWaiter, WaitOutcome, WaitSettings};

/// Drives one axis through motion procedures.
///
/// Owns the channel and the pacer for the duration of a run. One sequencer
/// per axis; waits block the calling thread.
pub struct MotionSequencer<A, P> {
    axis: A,
    pacer: P,
    timing: TimingConfig,
    settings: WaitSettings,
}

impl<A: AxisChannel, P: Pacer> MotionSequencer<A, P> {
    pub fn new(axis: A, pacer: P, config: &SuiteConfig) -> Self {
        Self {
            axis,
            pacer,
            timing: config.timing.clone(),
            settings: WaitSettings::from_config(config),
        }
    }

    /// Build from explicit timing and wait settings.
    pub fn with_settings(axis: A, pacer: P, timing: TimingConfig, settings: WaitSettings) -> Self {
        Self {
            axis,
            pacer,
            timing,
            settings,
        }
    }

    #[inline]
    pub fn axis(&self) -> &A {
        &self.axis
    }

    #[inline]
    pub fn axis_mut(&mut self) -> &mut A {
        &mut self.axis
    }

    #[inline]
    pub fn pacer(&self) -> &P {
        &self.pacer
    }

    #[inline]
    pub fn pacer_mut(&mut self) -> &mut P {
        &mut self.pacer
    }

    pub fn into_parts(self) -> (A, P) {
        (self.axis, self.pacer)
    }

    #[inline]
    pub fn timing(&self) -> &TimingConfig {
        &self.timing
    }

    #[inline]
    pub fn settings(&self) -> &WaitSettings {
        &self.settings
    }

    #[inline]
    pub fn coordinates(&self) -> Coordinates {
        self.settings.coordinates
    }

    #[inline]
    pub fn firmware(&self) -> FirmwareVariant {
        self.settings.firmware
    }

    /// Fresh waiter for one logical wait.
    pub fn waiter(&self) -> MotionWaiter {
        MotionWaiter::new(self.settings)
    }

    // ─── Sampling ───────────────────────────────────────────────────

    pub fn snapshot(&mut self) -> Result<AxisSnapshot, ChannelError> {
        AxisSnapshot::sample(&mut self.axis, self.settings.coordinates)
    }

    pub fn read_status(&mut self) -> Result<StatusWord, ChannelError> {
        Ok(StatusWord::from_value(self.axis.read(AxisAttribute::Status)?))
    }

    /// Readback in the configured coordinates.
    pub fn readback(&mut self) -> Result<f64, ChannelError> {
        self.axis.read(self.settings.coordinates.readback())
    }

    pub fn read_fault(&mut self) -> Result<AxisFault, ChannelError> {
        recovery::read_fault(&mut self.axis)
    }

    // ─── Simple commands ────────────────────────────────────────────

    pub fn stop(&mut self) -> Result<(), ChannelError> {
        self.axis.command(AxisAttribute::Stop, true)
    }

    pub fn set_closed_loop(&mut self, enabled: bool) -> Result<(), ChannelError> {
        self.axis.command(AxisAttribute::ClosedLoop, enabled)
    }

    /// Error reset with the configured budget.
    pub fn reset_errors(&mut self) -> Result<bool, ChannelError> {
        recovery::reset_errors(
            &mut self.axis,
            &mut self.pacer,
            self.settings.poll_interval,
            self.timing.error_reset_budget_s,
        )
    }

    /// Fault-clear wait with the configured number of attempts.
    pub fn wait_for_fault_clear(&mut self) -> Result<FaultState, ChannelError> {
        recovery::wait_for_fault_clear(
            &mut self.axis,
            &mut self.pacer,
            self.settings.poll_interval,
            self.timing.error_clear_attempts,
        )
    }

    // ─── Waits ──────────────────────────────────────────────────────

    pub fn wait_for_start(&mut self, budget_s: f64) -> Result<bool, ChannelError> {
        self.waiter()
            .wait_for_start(&mut self.axis, &mut self.pacer, budget_s)
    }

    pub fn wait_for_stop(&mut self, budget_s: f64) -> Result<bool, ChannelError> {
        self.waiter()
            .wait_for_stop(&mut self.axis, &mut self.pacer, budget_s)
    }

    pub fn wait_for_stop_with_safety(
        &mut self,
        budget_s: f64,
        direction: TravelDirection,
    ) -> Result<WaitOutcome, ChannelError> {
        self.waiter().wait_for_stop_with_safety(
            &mut self.axis,
            &mut self.pacer,
            budget_s,
            direction,
        )
    }

    pub fn wait_for_start_and_stop(&mut self, stop_budget_s: f64) -> Result<bool, ChannelError> {
        self.waiter()
            .wait_for_start_and_stop(&mut self.axis, &mut self.pacer, stop_budget_s)
    }

    /// Start wait with the fixed start budget, then stop wait with
    /// `stop_budget_s`. Both results are reported.
    fn start_then_stop(&mut self, stop_budget_s: f64) -> Result<MotionReport, ChannelError> {
        let mut waiter = self.waiter();
        let started =
            waiter.wait_for_start(&mut self.axis, &mut self.pacer, self.settings.start_budget_s)?;
        let stopped = waiter.wait_for_stop(&mut self.axis, &mut self.pacer, stop_budget_s)?;
        Ok(MotionReport {
            budget_s: stop_budget_s,
            started,
            stopped,
        })
    }
}
