//! Polling waits over consecutive axis snapshots.
//!
//! ## Lifecycle
//!
//! ```text
//! Idle ─▶ WaitingForStart ─▶ WaitingForStop ─▶ Succeeded | TimedOut | Aborted
//! ```
//!
//! A stop wait may also be entered directly from `Idle`.
//!
//! ## Budget accounting
//!
//! A budget of `b` seconds at interval `i` allows `ceil(b / i)` pauses. Each
//! iteration checks the predicate first, then pauses and consumes one cycle.
//! A zero or negative budget therefore performs exactly one check.
//!
//! Sampling is isolated behind [`SnapshotFeed`]; [`PollingFeed`] is the
//! fixed-cadence implementation.

use std::time::Duration;

use smt_common::attribute::Coordinates;
use smt_common::channel::{AxisChannel, ChannelError};
use smt_common::config::SuiteConfig;
use smt_common::consts;
use smt_common::status::FirmwareVariant;
use tracing::{debug, warn};

use crate::pacer::Pacer;
use crate::safety::{SafetyMonitor, SafetyVerdict, TravelDirection, TripReason, emergency_stop};
use crate::snapshot::AxisSnapshot;

/// Guards against `0.6 / 0.2 = 3.0000000000000004` style rounding.
const CYCLE_EPSILON: f64 = 1e-9;

// ─── Budget ─────────────────────────────────────────────────────────

/// Remaining pauses of one wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollBudget {
    remaining: u64,
}

impl PollBudget {
    /// Convert a budget in seconds into whole poll cycles.
    pub fn from_seconds(budget_s: f64, interval: Duration) -> Self {
        let interval_s = interval.as_secs_f64();
        let remaining = if !(budget_s > 0.0) {
            0
        } else if interval_s <= 0.0 {
            u64::MAX
        } else {
            ((budget_s / interval_s) - CYCLE_EPSILON).ceil().max(0.0) as u64
        };
        Self { remaining }
    }

    pub const fn cycles(remaining: u64) -> Self {
        Self { remaining }
    }

    #[inline]
    pub const fn remaining(&self) -> u64 {
        self.remaining
    }

    #[inline]
    pub const fn is_exhausted(&self) -> bool {
        self.remaining == 0
    }

    /// Consume one cycle. Returns `false` when none was left.
    #[inline]
    pub fn consume(&mut self) -> bool {
        if self.remaining == 0 {
            return false;
        }
        self.remaining -= 1;
        true
    }
}

// ─── Feed ───────────────────────────────────────────────────────────

/// Source of snapshots for one wait.
///
/// `next_snapshot` returns `Ok(None)` once the budget is spent. Corrective
/// writes still go through [`SnapshotFeed::channel`].
pub trait SnapshotFeed {
    type Channel: AxisChannel + ?Sized;

    fn next_snapshot(&mut self) -> Result<Option<AxisSnapshot>, ChannelError>;

    fn channel(&mut self) -> &mut Self::Channel;
}

/// Fixed-interval polling feed.
///
/// The first call samples immediately. Every later call pauses one interval,
/// consumes one cycle, then samples.
pub struct PollingFeed<'a, A: AxisChannel + ?Sized, P: Pacer + ?Sized> {
    axis: &'a mut A,
    pacer: &'a mut P,
    interval: Duration,
    budget: PollBudget,
    coordinates: Coordinates,
    primed: bool,
}

impl<'a, A: AxisChannel + ?Sized, P: Pacer + ?Sized> PollingFeed<'a, A, P> {
    pub fn new(
        axis: &'a mut A,
        pacer: &'a mut P,
        interval: Duration,
        budget: PollBudget,
        coordinates: Coordinates,
    ) -> Self {
        Self {
            axis,
            pacer,
            interval,
            budget,
            coordinates,
            primed: false,
        }
    }

    #[inline]
    pub const fn budget(&self) -> PollBudget {
        self.budget
    }
}

impl<A: AxisChannel + ?Sized, P: Pacer + ?Sized> SnapshotFeed for PollingFeed<'_, A, P> {
    type Channel = A;

    fn next_snapshot(&mut self) -> Result<Option<AxisSnapshot>, ChannelError> {
        if self.primed {
            if self.budget.is_exhausted() {
                return Ok(None);
            }
            self.pacer.pause(self.interval);
            self.budget.consume();
        }
        self.primed = true;
        AxisSnapshot::sample(&mut *self.axis, self.coordinates).map(Some)
    }

    fn channel(&mut self) -> &mut A {
        self.axis
    }
}

// ─── Outcome ────────────────────────────────────────────────────────

/// Phase of a [`MotionWaiter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitPhase {
    Idle,
    WaitingForStart,
    WaitingForStop,
    Succeeded,
    TimedOut,
    Aborted,
}

impl WaitPhase {
    #[inline]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::TimedOut | Self::Aborted)
    }
}

/// Terminal result of a wait. A timeout is an outcome, never an error.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WaitOutcome {
    Succeeded,
    TimedOut,
    /// Stop and loop-disable have already been written.
    AbortedForSafety(TripReason),
}

impl WaitOutcome {
    #[inline]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }

    #[inline]
    pub const fn trip_reason(&self) -> Option<TripReason> {
        match self {
            Self::AbortedForSafety(reason) => Some(*reason),
            _ => None,
        }
    }

    const fn phase(&self) -> WaitPhase {
        match self {
            Self::Succeeded => WaitPhase::Succeeded,
            Self::TimedOut => WaitPhase::TimedOut,
            Self::AbortedForSafety(_) => WaitPhase::Aborted,
        }
    }
}

// ─── Settings ───────────────────────────────────────────────────────

/// Cadence and budget rules shared by every wait of a run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaitSettings {
    pub poll_interval: Duration,
    /// Added to the absolute value of every stop budget.
    pub stop_slack_s: f64,
    /// Start phase budget of [`MotionWaiter::wait_for_start_and_stop`].
    pub start_budget_s: f64,
    pub coordinates: Coordinates,
    pub firmware: FirmwareVariant,
    pub monitor: SafetyMonitor,
}

impl Default for WaitSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs_f64(consts::POLL_INTERVAL_S),
            stop_slack_s: consts::STOP_SLACK_S,
            start_budget_s: consts::START_BUDGET_S,
            coordinates: Coordinates::User,
            firmware: FirmwareVariant::SlipStall,
            monitor: SafetyMonitor::default(),
        }
    }
}

impl WaitSettings {
    pub fn from_config(config: &SuiteConfig) -> Self {
        Self {
            poll_interval: config.timing.poll_interval(),
            stop_slack_s: config.timing.stop_slack_s,
            start_budget_s: config.timing.start_budget_s,
            coordinates: config.axis.readback,
            firmware: config.axis.firmware,
            monitor: SafetyMonitor::default(),
        }
    }

    /// Effective stop budget: `|budget_s| + stop_slack_s`.
    #[inline]
    pub fn stop_budget(&self, budget_s: f64) -> f64 {
        budget_s.abs() + self.stop_slack_s
    }

    #[inline]
    pub fn budget(&self, budget_s: f64) -> PollBudget {
        PollBudget::from_seconds(budget_s, self.poll_interval)
    }
}

// ─── Waiter ─────────────────────────────────────────────────────────

/// Polling state machine for one logical wait.
#[derive(Debug, Clone)]
pub struct MotionWaiter {
    settings: WaitSettings,
    phase: WaitPhase,
    samples: u64,
}

impl MotionWaiter {
    pub fn new(settings: WaitSettings) -> Self {
        Self {
            settings,
            phase: WaitPhase::Idle,
            samples: 0,
        }
    }

    #[inline]
    pub const fn phase(&self) -> WaitPhase {
        self.phase
    }

    /// Snapshots evaluated so far, across all phases.
    #[inline]
    pub const fn samples(&self) -> u64 {
        self.samples
    }

    #[inline]
    pub const fn settings(&self) -> &WaitSettings {
        &self.settings
    }

    // ── Feed-level waits ──

    /// Poll until `moving ∧ ¬done`.
    pub fn await_start<F: SnapshotFeed + ?Sized>(
        &mut self,
        feed: &mut F,
    ) -> Result<WaitOutcome, ChannelError> {
        self.phase = WaitPhase::WaitingForStart;
        while let Some(snapshot) = feed.next_snapshot()? {
            self.trace(&snapshot);
            if snapshot.is_started() {
                return Ok(self.finish(WaitOutcome::Succeeded));
            }
        }
        Ok(self.finish(WaitOutcome::TimedOut))
    }

    /// Poll until `done ∧ ¬moving`.
    pub fn await_stop<F: SnapshotFeed + ?Sized>(
        &mut self,
        feed: &mut F,
    ) -> Result<WaitOutcome, ChannelError> {
        self.phase = WaitPhase::WaitingForStop;
        while let Some(snapshot) = feed.next_snapshot()? {
            self.trace(&snapshot);
            if snapshot.is_stopped() {
                return Ok(self.finish(WaitOutcome::Succeeded));
            }
        }
        Ok(self.finish(WaitOutcome::TimedOut))
    }

    /// Poll until `done ∧ ¬moving`, checking safety first on every sample.
    ///
    /// The first sample is the reference for every later displacement check,
    /// and its tweak increment sets the runaway bound. On a trip, stop=1 then
    /// closed-loop enable=0 are written before the outcome is returned.
    pub fn await_stop_with_safety<F: SnapshotFeed + ?Sized>(
        &mut self,
        feed: &mut F,
        direction: TravelDirection,
    ) -> Result<WaitOutcome, ChannelError> {
        self.phase = WaitPhase::WaitingForStop;
        let mut anchor: Option<AxisSnapshot> = None;
        while let Some(snapshot) = feed.next_snapshot()? {
            self.trace(&snapshot);
            let reference = *anchor.get_or_insert(snapshot);
            let verdict = self.settings.monitor.evaluate(
                &reference,
                &snapshot,
                reference.tweak_increment,
                direction,
            );
            if let SafetyVerdict::Trip(reason) = verdict {
                warn!(
                    %reason,
                    %direction,
                    reference = reference.readback,
                    readback = snapshot.readback,
                    "safety trip during stop wait"
                );
                emergency_stop(feed.channel())?;
                return Ok(self.finish(WaitOutcome::AbortedForSafety(reason)));
            }
            if snapshot.is_stopped() {
                return Ok(self.finish(WaitOutcome::Succeeded));
            }
        }
        Ok(self.finish(WaitOutcome::TimedOut))
    }

    // ── Axis-level waits ──

    /// `true` iff a sample within `budget_s` shows `moving ∧ ¬done`.
    pub fn wait_for_start<A, P>(
        &mut self,
        axis: &mut A,
        pacer: &mut P,
        budget_s: f64,
    ) -> Result<bool, ChannelError>
    where
        A: AxisChannel + ?Sized,
        P: Pacer + ?Sized,
    {
        let mut feed = self.feed(axis, pacer, budget_s);
        Ok(self.await_start(&mut feed)?.is_success())
    }

    /// `true` iff a sample within `|budget_s| + slack` shows `done ∧ ¬moving`.
    pub fn wait_for_stop<A, P>(
        &mut self,
        axis: &mut A,
        pacer: &mut P,
        budget_s: f64,
    ) -> Result<bool, ChannelError>
    where
        A: AxisChannel + ?Sized,
        P: Pacer + ?Sized,
    {
        let effective = self.settings.stop_budget(budget_s);
        let mut feed = self.feed(axis, pacer, effective);
        Ok(self.await_stop(&mut feed)?.is_success())
    }

    /// Stop wait with safety abort. Budget normalized as in
    /// [`wait_for_stop`](Self::wait_for_stop).
    pub fn wait_for_stop_with_safety<A, P>(
        &mut self,
        axis: &mut A,
        pacer: &mut P,
        budget_s: f64,
        direction: TravelDirection,
    ) -> Result<WaitOutcome, ChannelError>
    where
        A: AxisChannel + ?Sized,
        P: Pacer + ?Sized,
    {
        let effective = self.settings.stop_budget(budget_s);
        let mut feed = self.feed(axis, pacer, effective);
        self.await_stop_with_safety(&mut feed, direction)
    }

    /// Wait for start with the fixed start budget, then for stop.
    ///
    /// A missed start does not fail the call: short moves may complete
    /// between two samples. Only the stop result is returned.
    pub fn wait_for_start_and_stop<A, P>(
        &mut self,
        axis: &mut A,
        pacer: &mut P,
        stop_budget_s: f64,
    ) -> Result<bool, ChannelError>
    where
        A: AxisChannel + ?Sized,
        P: Pacer + ?Sized,
    {
        let start_budget = self.settings.start_budget_s;
        if !self.wait_for_start(axis, pacer, start_budget)? {
            debug!(budget_s = start_budget, "start not observed, waiting for stop anyway");
        }
        self.wait_for_stop(axis, pacer, stop_budget_s)
    }

    // ── Helpers ──

    fn feed<'a, A, P>(
        &self,
        axis: &'a mut A,
        pacer: &'a mut P,
        budget_s: f64,
    ) -> PollingFeed<'a, A, P>
    where
        A: AxisChannel + ?Sized,
        P: Pacer + ?Sized,
    {
        PollingFeed::new(
            axis,
            pacer,
            self.settings.poll_interval,
            self.settings.budget(budget_s),
            self.settings.coordinates,
        )
    }

    fn trace(&mut self, snapshot: &AxisSnapshot) {
        self.samples += 1;
        debug!(
            phase = ?self.phase,
            sample = self.samples,
            done = snapshot.done,
            moving = snapshot.moving,
            readback = snapshot.readback,
            status = %snapshot.status.display(self.settings.firmware),
            "poll"
        );
    }

    fn finish(&mut self, outcome: WaitOutcome) -> WaitOutcome {
        self.phase = outcome.phase();
        debug!(?outcome, samples = self.samples, "wait finished");
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{CountingPacer, Frame, ScriptedAxis};
    use smt_common::attribute::AxisAttribute;
    use smt_common::status::StatusWord;

    fn waiter() -> MotionWaiter {
        MotionWaiter::new(WaitSettings::default())
    }

    #[test]
    fn budget_rounds_up_to_whole_cycles() {
        let interval = Duration::from_millis(200);
        assert_eq!(PollBudget::from_seconds(2.0, interval).remaining(), 10);
        assert_eq!(PollBudget::from_seconds(0.3, interval).remaining(), 2);
        assert_eq!(PollBudget::from_seconds(0.6, interval).remaining(), 3);
        assert_eq!(PollBudget::from_seconds(6.0, interval).remaining(), 30);
        assert_eq!(PollBudget::from_seconds(0.0, interval).remaining(), 0);
        assert_eq!(PollBudget::from_seconds(-1.0, interval).remaining(), 0);
        assert_eq!(PollBudget::from_seconds(f64::NAN, interval).remaining(), 0);
    }

    #[test]
    fn budget_consume_stops_at_zero() {
        let mut budget = PollBudget::cycles(1);
        assert!(budget.consume());
        assert!(!budget.consume());
        assert!(budget.is_exhausted());
    }

    #[test]
    fn zero_budget_samples_exactly_once() {
        let mut axis = ScriptedAxis::new(vec![Frame::stopped(0.0)]);
        let mut pacer = CountingPacer::default();
        let mut waiter = waiter();

        let started = waiter.wait_for_start(&mut axis, &mut pacer, 0.0).unwrap();
        assert!(!started);
        assert_eq!(axis.samples(), 1);
        assert_eq!(pacer.pauses(), 0);
        assert_eq!(waiter.phase(), WaitPhase::TimedOut);
    }

    #[test]
    fn start_detected_on_later_sample() {
        let mut axis = ScriptedAxis::new(vec![
            Frame::stopped(0.0),
            Frame::stopped(0.0),
            Frame::moving(0.1),
        ]);
        let mut pacer = CountingPacer::default();
        let mut waiter = waiter();

        assert!(waiter.wait_for_start(&mut axis, &mut pacer, 2.0).unwrap());
        assert_eq!(axis.samples(), 3);
        assert_eq!(pacer.pauses(), 2);
        assert_eq!(waiter.phase(), WaitPhase::Succeeded);
    }

    #[test]
    fn start_times_out_after_budget() {
        let mut axis = ScriptedAxis::new(vec![Frame::stopped(0.0)]);
        let mut pacer = CountingPacer::default();
        let mut waiter = waiter();

        assert!(!waiter.wait_for_start(&mut axis, &mut pacer, 2.0).unwrap());
        assert_eq!(pacer.pauses(), 10);
        assert_eq!(axis.samples(), 11);
        assert_eq!(pacer.elapsed(), Duration::from_secs(2));
    }

    #[test]
    fn negative_stop_budget_is_normalized() {
        let mut axis = ScriptedAxis::new(vec![Frame::moving(0.0)]);
        let mut pacer = CountingPacer::default();
        let mut waiter = waiter();

        assert!(!waiter.wait_for_stop(&mut axis, &mut pacer, -5.0).unwrap());
        // |-5| + 1 = 6 s at 0.2 s
        assert_eq!(pacer.pauses(), 30);
        assert_eq!(waiter.settings().stop_budget(-5.0), 6.0);
    }

    #[test]
    fn stop_requires_done_and_not_moving() {
        let inconsistent = Frame {
            done: true,
            moving: true,
            readback: 1.0,
            status: StatusWord::DONE | StatusWord::MOVING,
        };
        let mut axis = ScriptedAxis::new(vec![inconsistent, Frame::stopped(1.0)]);
        let mut pacer = CountingPacer::default();
        let mut waiter = waiter();

        assert!(waiter.wait_for_stop(&mut axis, &mut pacer, 1.0).unwrap());
        assert_eq!(axis.samples(), 2);
    }

    #[test]
    fn combined_wait_ignores_missed_start() {
        // Move completes before the first sample.
        let mut axis = ScriptedAxis::new(vec![Frame::stopped(5.0)]);
        let mut pacer = CountingPacer::default();
        let mut waiter = waiter();

        assert!(waiter.wait_for_start_and_stop(&mut axis, &mut pacer, 3.0).unwrap());
        // Full start budget spent, stop found on first stop sample.
        assert_eq!(pacer.pauses(), 10);
        assert_eq!(waiter.phase(), WaitPhase::Succeeded);
    }

    #[test]
    fn safety_trip_writes_stop_then_disable() {
        let mut axis = ScriptedAxis::new(vec![
            Frame::moving(10.0),
            Frame::moving(10.4),
            Frame::moving(11.5),
            Frame::stopped(11.5),
        ]);
        axis.set(AxisAttribute::TweakIncrement, 0.5);
        let mut pacer = CountingPacer::default();
        let mut waiter = waiter();

        let outcome = waiter
            .wait_for_stop_with_safety(&mut axis, &mut pacer, 10.0, TravelDirection::Forward)
            .unwrap();
        assert!(matches!(
            outcome,
            WaitOutcome::AbortedForSafety(TripReason::OvershootForward { .. })
        ));
        assert_eq!(waiter.phase(), WaitPhase::Aborted);
        assert_eq!(
            axis.written(),
            vec![(AxisAttribute::Stop, 1.0), (AxisAttribute::ClosedLoop, 0.0)]
        );
    }

    #[test]
    fn safety_checked_before_stop_predicate() {
        // Axis reports done while sitting on the plus limit.
        let frame = Frame::stopped(3.0).with_status(StatusWord::PLUS_LS);
        let mut axis = ScriptedAxis::new(vec![frame]);
        axis.set(AxisAttribute::TweakIncrement, 1.0);
        let mut pacer = CountingPacer::default();
        let mut waiter = waiter();

        let outcome = waiter
            .wait_for_stop_with_safety(&mut axis, &mut pacer, 1.0, TravelDirection::Forward)
            .unwrap();
        assert_eq!(outcome, WaitOutcome::AbortedForSafety(TripReason::PlusLimit));
    }

    #[test]
    fn safety_wait_succeeds_within_bound() {
        let mut axis = ScriptedAxis::new(vec![
            Frame::moving(10.0),
            Frame::moving(10.5),
            Frame::stopped(11.0),
        ]);
        axis.set(AxisAttribute::TweakIncrement, 1.0);
        let mut pacer = CountingPacer::default();
        let mut waiter = waiter();

        let outcome = waiter
            .wait_for_stop_with_safety(&mut axis, &mut pacer, 10.0, TravelDirection::Forward)
            .unwrap();
        assert_eq!(outcome, WaitOutcome::Succeeded);
        assert!(axis.written().is_empty());
    }

    #[test]
    fn channel_failure_propagates() {
        let mut axis = ScriptedAxis::new(vec![Frame::moving(0.0)]);
        axis.set_offline(true);
        let mut pacer = CountingPacer::default();
        let mut waiter = waiter();

        let err = waiter.wait_for_stop(&mut axis, &mut pacer, 1.0).unwrap_err();
        assert!(matches!(err, ChannelError::Unavailable { .. }));
        assert_eq!(pacer.pauses(), 0);
    }
}
