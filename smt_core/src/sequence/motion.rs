//! Positioning, jog and tweak procedures.

use smt_common::attribute::AxisAttribute;
use smt_common::channel::{AxisChannel, WriteMode};
use tracing::{info, warn};

use super::MotionSequencer;
use super::scoped::settle;
use crate::check::within_tolerance;
use crate::error::SequenceError;
use crate::pacer::Pacer;
use crate::safety::TravelDirection;
use crate::waiter::WaitOutcome;

/// Commanded motion, used only to derive a timeout budget.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionTarget {
    pub destination: f64,
    pub expected_velocity: f64,
    pub expected_acceleration: f64,
}

impl MotionTarget {
    pub const fn new(destination: f64, expected_velocity: f64, expected_acceleration: f64) -> Self {
        Self {
            destination,
            expected_velocity,
            expected_acceleration,
        }
    }

    /// `base + |destination - readback| / velocity + 2 × acceleration`.
    ///
    /// The travel term is only added for a positive velocity.
    pub fn timeout_budget(&self, readback: f64, base_s: f64) -> f64 {
        if self.expected_velocity > 0.0 {
            let distance = (self.destination - readback).abs();
            base_s + distance / self.expected_velocity + 2.0 * self.expected_acceleration
        } else {
            base_s
        }
    }
}

/// Result of a move or jog.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionReport {
    /// Stop budget before slack [s].
    pub budget_s: f64,
    /// Start observed within the start budget.
    pub started: bool,
    /// Stop observed within the stop budget.
    pub stopped: bool,
}

/// Result of a tweak.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TweakReport {
    pub direction: TravelDirection,
    /// Readback before the tweak plus or minus one increment.
    pub destination: f64,
    /// Readback after limits were restored.
    pub position: f64,
    pub started: bool,
    pub outcome: WaitOutcome,
    /// `|destination - position| < increment / 2`.
    pub in_tolerance: bool,
}

impl TweakReport {
    #[inline]
    pub fn passed(&self) -> bool {
        self.outcome.is_success() && self.in_tolerance
    }
}

#[inline]
const fn jog_command(direction: TravelDirection) -> AxisAttribute {
    match direction {
        TravelDirection::Forward => AxisAttribute::JogForward,
        TravelDirection::Reverse => AxisAttribute::JogReverse,
    }
}

impl<A: AxisChannel, P: Pacer> MotionSequencer<A, P> {
    /// Write the target position and wait for start, then stop.
    pub fn move_absolute(
        &mut self,
        destination: f64,
        velocity: f64,
        acceleration: f64,
    ) -> Result<MotionReport, SequenceError> {
        let readback = self.readback()?;
        let target = MotionTarget::new(destination, velocity, acceleration);
        let budget = target.timeout_budget(readback, self.timing.move_base_budget_s);
        info!(
            axis = self.axis.name(),
            readback, destination, velocity, acceleration, budget_s = budget,
            "move absolute"
        );

        let attribute = self.settings.coordinates.target();
        self.axis
            .write(attribute, destination, WriteMode::FireAndForget)?;
        let report = self.start_then_stop(budget)?;
        info!(started = report.started, stopped = report.stopped, "move finished");
        Ok(report)
    }

    /// Jog towards the dial limit in `direction`.
    ///
    /// Budget is the jog ceiling, plus the travel time to the dial limit when
    /// the axis has distinct dial limits and `velocity > 0`. The jog command
    /// is written back to 0 whatever the outcome.
    pub fn jog(
        &mut self,
        direction: TravelDirection,
        velocity: f64,
        acceleration: f64,
    ) -> Result<MotionReport, SequenceError> {
        let high = self.axis.read(AxisAttribute::DialHighLimit)?;
        let low = self.axis.read(AxisAttribute::DialLowLimit)?;
        let mut budget = self.timing.jog_ceiling_s;
        if velocity > 0.0 && high != low {
            let destination = if direction.is_forward() { high } else { low };
            let readback = self.axis.read(AxisAttribute::DialReadback)?;
            budget = MotionTarget::new(destination, velocity, acceleration)
                .timeout_budget(readback, budget);
        }
        self.run_jog(direction, budget)
    }

    /// Jog with budget `ceiling + extra_s + slack`.
    pub fn jog_with_budget(
        &mut self,
        direction: TravelDirection,
        extra_s: f64,
    ) -> Result<MotionReport, SequenceError> {
        let budget = self.timing.jog_ceiling_s + extra_s + self.timing.jog_slack_s;
        self.run_jog(direction, budget)
    }

    fn run_jog(
        &mut self,
        direction: TravelDirection,
        budget_s: f64,
    ) -> Result<MotionReport, SequenceError> {
        let command = jog_command(direction);
        info!(axis = self.axis.name(), %direction, budget_s, "jog");
        self.axis.command(command, true)?;
        let waited = self.start_then_stop(budget_s).map_err(SequenceError::from);
        let cleared = self.axis.command(command, false);
        if let Err(e) = &cleared {
            warn!(%command, error = %e, "failed to clear jog command");
        }
        settle(waited, cleared)
    }

    /// Tweak one increment with limits zeroed and the safety monitor armed.
    ///
    /// Tweaks reverse when the plus limit is active, forward otherwise. The
    /// axis is stopped and its loop opened before limits are restored.
    pub fn tweak(&mut self) -> Result<TweakReport, SequenceError> {
        if !self.reset_errors()? {
            warn!(axis = self.axis.name(), "error flag still set before tweak");
        }
        self.set_closed_loop(true)?;
        let start_position = self.readback()?;
        let increment = self.axis.read(AxisAttribute::TweakIncrement)?;

        let (direction, destination, started, outcome) = self.with_limits_zeroed(|seq| {
            let status = seq.read_status()?;
            let (direction, command) = if status.plus_limit() {
                (TravelDirection::Reverse, AxisAttribute::TweakReverse)
            } else {
                (TravelDirection::Forward, AxisAttribute::TweakForward)
            };
            let destination = start_position + direction.sign() * increment;
            info!(%direction, start_position, destination, increment, "tweak");

            seq.axis.command(command, true)?;
            let started = seq.wait_for_start(seq.timing.tweak_start_budget_s)?;
            let outcome =
                seq.wait_for_stop_with_safety(seq.timing.tweak_stop_budget_s, direction)?;
            seq.stop()?;
            seq.set_closed_loop(false)?;
            Ok((direction, destination, started, outcome))
        })?;

        let position = self.readback()?;
        let in_tolerance = within_tolerance(destination, position, increment / 2.0);
        info!(?outcome, destination, position, in_tolerance, "tweak finished");
        Ok(TweakReport {
            direction,
            destination,
            position,
            started,
            outcome,
            in_tolerance,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{CountingPacer, Frame, ScriptedAxis};
    use crate::waiter::WaitSettings;
    use smt_common::channel::ChannelError;
    use smt_common::config::TimingConfig;
    use smt_common::status::StatusWord;

    fn sequencer(frames: Vec<Frame>) -> MotionSequencer<ScriptedAxis, CountingPacer> {
        MotionSequencer::with_settings(
            ScriptedAxis::new(frames),
            CountingPacer::default(),
            TimingConfig::default(),
            WaitSettings::default(),
        )
    }

    #[test]
    fn move_budget_example() {
        let target = MotionTarget::new(50.0, 10.0, 2.0);
        assert_eq!(target.timeout_budget(0.0, 30.0), 39.0);
        assert_eq!(MotionTarget::new(50.0, 0.0, 2.0).timeout_budget(0.0, 30.0), 30.0);
    }

    #[test]
    fn move_writes_target_then_waits_start_then_stop() {
        let mut seq = sequencer(vec![
            Frame::stopped(0.0),
            Frame::moving(20.0),
            Frame::moving(40.0),
            Frame::stopped(50.0),
        ]);
        // The readback read before the write does not advance the script;
        // the first sample of the start wait sees frame 0.
        let report = seq.move_absolute(50.0, 10.0, 2.0).unwrap();
        assert_eq!(report.budget_s, 39.0);
        assert!(report.started);
        assert!(report.stopped);
        assert_eq!(seq.axis().written(), vec![(AxisAttribute::Target, 50.0)]);
        // start: frame 0 (pause) frame 1 -> started; stop: frame 2 (pause) frame 3
        assert_eq!(seq.pacer().pauses(), 2);
        assert_eq!(seq.axis().samples(), 4);
    }

    #[test]
    fn move_stop_budget_includes_slack() {
        let mut seq = sequencer(vec![Frame::moving(0.0)]);
        let report = seq.move_absolute(50.0, 10.0, 2.0).unwrap();
        assert!(report.started);
        assert!(!report.stopped);
        // (39 + 1) / 0.2
        assert_eq!(seq.pacer().pauses(), 200);
    }

    #[test]
    fn jog_clears_command_after_timeout() {
        let mut seq = sequencer(vec![Frame::moving(0.0)]);
        let report = seq.jog(TravelDirection::Forward, 0.0, 0.0).unwrap();
        assert!(!report.stopped);
        assert_eq!(report.budget_s, 30.0);
        assert_eq!(seq.axis().written_to(AxisAttribute::JogForward), vec![1.0, 0.0]);
    }

    #[test]
    fn jog_budget_uses_dial_limits() {
        let mut seq = sequencer(vec![Frame::moving(0.0), Frame::stopped(100.0)]);
        seq.axis_mut().set(AxisAttribute::DialHighLimit, 100.0);
        seq.axis_mut().set(AxisAttribute::DialLowLimit, -100.0);
        seq.axis_mut().set(AxisAttribute::DialReadback, 0.0);
        let report = seq.jog(TravelDirection::Reverse, 10.0, 0.5).unwrap();
        assert_eq!(report.budget_s, 30.0 + 10.0 + 1.0);
        assert!(report.stopped);
        assert_eq!(seq.axis().written_to(AxisAttribute::JogReverse), vec![1.0, 0.0]);
    }

    #[test]
    fn jog_command_failure_propagates() {
        let mut seq = sequencer(vec![Frame::moving(0.0)]);
        seq.axis_mut().fail_writes_to(AxisAttribute::JogForward);
        let err = seq.jog(TravelDirection::Forward, 0.0, 0.0).unwrap_err();
        assert!(matches!(err, SequenceError::Channel(ChannelError::Unavailable { .. })));
    }

    #[test]
    fn jog_with_budget_adds_ceiling_and_slack() {
        let mut seq = sequencer(vec![Frame::moving(0.0), Frame::stopped(0.0)]);
        let report = seq.jog_with_budget(TravelDirection::Forward, 12.0).unwrap();
        assert_eq!(report.budget_s, 45.0);
    }

    #[test]
    fn tweak_forward_zeroes_limits_and_restores() {
        let mut seq = sequencer(vec![
            Frame::stopped(5.0),
            Frame::moving(5.5),
            Frame::stopped(6.0),
        ]);
        let axis = seq.axis_mut();
        axis.set(AxisAttribute::HighLimit, 100.0);
        axis.set(AxisAttribute::LowLimit, -100.0);
        axis.set(AxisAttribute::TweakIncrement, 1.0);

        let report = seq.tweak().unwrap();
        assert_eq!(report.direction, TravelDirection::Forward);
        assert_eq!(report.destination, 6.0);
        assert_eq!(report.outcome, WaitOutcome::Succeeded);
        assert!(report.passed());

        let writes = seq.axis().written();
        let attrs: Vec<AxisAttribute> = writes.iter().map(|(a, _)| *a).collect();
        assert_eq!(
            attrs,
            vec![
                AxisAttribute::ErrorReset,
                AxisAttribute::ClosedLoop,
                // readback > 0: low limit first
                AxisAttribute::LowLimit,
                AxisAttribute::HighLimit,
                AxisAttribute::TweakForward,
                AxisAttribute::Stop,
                AxisAttribute::ClosedLoop,
                AxisAttribute::HighLimit,
                AxisAttribute::LowLimit,
            ]
        );
        assert_eq!(seq.axis().get(AxisAttribute::HighLimit), Some(100.0));
        assert_eq!(seq.axis().get(AxisAttribute::LowLimit), Some(-100.0));
    }

    #[test]
    fn tweak_reverses_on_plus_limit() {
        let at_plus = Frame::stopped(-2.0).with_status(StatusWord::PLUS_LS);
        let mut seq = sequencer(vec![at_plus, Frame::moving(-2.5), Frame::stopped(-3.0)]);
        seq.axis_mut().set(AxisAttribute::TweakIncrement, 1.0);

        let report = seq.tweak().unwrap();
        assert_eq!(report.direction, TravelDirection::Reverse);
        assert_eq!(report.destination, -3.0);
        assert!(report.passed());
        assert_eq!(seq.axis().written_to(AxisAttribute::TweakReverse), vec![1.0]);
        // readback <= 0: high limit zeroed first
        let zeroing: Vec<AxisAttribute> = seq
            .axis()
            .written()
            .into_iter()
            .filter(|(a, v)| {
                (*a == AxisAttribute::HighLimit || *a == AxisAttribute::LowLimit) && *v == 0.0
            })
            .map(|(a, _)| a)
            .collect();
        assert_eq!(zeroing[0], AxisAttribute::HighLimit);
    }
}
