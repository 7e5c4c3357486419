//! Runaway and limit-switch detection during a stop wait.
//!
//! The monitor only classifies. The waiter owns the corrective action and
//! calls [`emergency_stop`] when a verdict trips.
//!
//! Rules, first match wins:
//!
//! | Rule | Condition                                              | Reason             |
//! |------|--------------------------------------------------------|--------------------|
//! | 1a   | `current - previous > factor × twv`                    | `OvershootForward` |
//! | 1b   | `previous - current > factor × twv`                    | `OvershootReverse` |
//! | 2a   | plus limit active and direction forward                | `PlusLimit`        |
//! | 2b   | minus limit active and direction reverse or stationary | `MinusLimit`       |
//!
//! Overshoot trips regardless of the commanded direction.

use std::fmt;

use serde::{Deserialize, Serialize};
use smt_common::attribute::AxisAttribute;
use smt_common::channel::{AxisChannel, ChannelError};
use smt_common::consts::RUNAWAY_STEP_FACTOR;
use tracing::warn;

use crate::snapshot::AxisSnapshot;

// ─── Direction ──────────────────────────────────────────────────────

/// Commanded direction of travel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TravelDirection {
    Forward,
    /// Reverse, also used for a stationary command.
    Reverse,
}

impl TravelDirection {
    /// Positive is forward; zero and negative are reverse.
    #[inline]
    pub fn from_sign(value: f64) -> Self {
        if value > 0.0 { Self::Forward } else { Self::Reverse }
    }

    #[inline]
    pub const fn sign(&self) -> f64 {
        match self {
            Self::Forward => 1.0,
            Self::Reverse => -1.0,
        }
    }

    #[inline]
    pub const fn is_forward(&self) -> bool {
        matches!(self, Self::Forward)
    }
}

impl fmt::Display for TravelDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Forward => f.write_str("forward"),
            Self::Reverse => f.write_str("reverse"),
        }
    }
}

// ─── Verdict ────────────────────────────────────────────────────────

/// Why a safety check tripped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TripReason {
    /// Readback advanced further than the bound.
    OvershootForward { delta: f64, bound: f64 },
    /// Readback retreated further than the bound.
    OvershootReverse { delta: f64, bound: f64 },
    /// Plus limit switch reached while travelling forward.
    PlusLimit,
    /// Minus limit switch reached while travelling reverse.
    MinusLimit,
}

impl TripReason {
    #[inline]
    pub const fn is_overshoot(&self) -> bool {
        matches!(
            self,
            Self::OvershootForward { .. } | Self::OvershootReverse { .. }
        )
    }
}

impl fmt::Display for TripReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OvershootForward { delta, bound } => {
                write!(f, "overshoot forward ({delta} > {bound})")
            }
            Self::OvershootReverse { delta, bound } => {
                write!(f, "overshoot reverse ({delta} > {bound})")
            }
            Self::PlusLimit => f.write_str("plus limit switch in direction of travel"),
            Self::MinusLimit => f.write_str("minus limit switch in direction of travel"),
        }
    }
}

/// Result of one safety evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SafetyVerdict {
    Ok,
    Trip(TripReason),
}

impl SafetyVerdict {
    #[inline]
    pub const fn is_trip(&self) -> bool {
        matches!(self, Self::Trip(_))
    }
}

// ─── Monitor ────────────────────────────────────────────────────────

/// Stateless classifier over two snapshots.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SafetyMonitor {
    /// Allowed displacement in tweak increments.
    step_factor: f64,
}

impl Default for SafetyMonitor {
    fn default() -> Self {
        Self {
            step_factor: RUNAWAY_STEP_FACTOR,
        }
    }
}

impl SafetyMonitor {
    pub const fn new(step_factor: f64) -> Self {
        Self { step_factor }
    }

    #[inline]
    pub const fn step_factor(&self) -> f64 {
        self.step_factor
    }

    /// Classify `current` against `previous`.
    pub fn evaluate(
        &self,
        previous: &AxisSnapshot,
        current: &AxisSnapshot,
        twv: f64,
        direction: TravelDirection,
    ) -> SafetyVerdict {
        let bound = self.step_factor * twv;
        let advanced = current.readback - previous.readback;
        if advanced > bound {
            return SafetyVerdict::Trip(TripReason::OvershootForward {
                delta: advanced,
                bound,
            });
        }
        if -advanced > bound {
            return SafetyVerdict::Trip(TripReason::OvershootReverse {
                delta: -advanced,
                bound,
            });
        }

        if current.status.plus_limit() && direction.is_forward() {
            return SafetyVerdict::Trip(TripReason::PlusLimit);
        }
        if current.status.minus_limit() && !direction.is_forward() {
            return SafetyVerdict::Trip(TripReason::MinusLimit);
        }
        SafetyVerdict::Ok
    }
}

/// Stop the axis and open the loop: stop=1, then closed-loop enable=0.
///
/// # Errors
///
/// Both writes are attempted whatever the first one returns; the first
/// `ChannelError` is returned.
pub fn emergency_stop<A: AxisChannel + ?Sized>(axis: &mut A) -> Result<(), ChannelError> {
    warn!(axis = axis.name(), "emergency stop: STOP=1 CNEN=0");
    let mut first_error = None;
    for (attribute, on) in [(AxisAttribute::Stop, true), (AxisAttribute::ClosedLoop, false)] {
        if let Err(e) = axis.command(attribute, on) {
            warn!(%attribute, error = %e, "emergency stop write failed");
            first_error.get_or_insert(e);
        }
    }
    first_error.map_or(Ok(()), Err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{Frame, ScriptedAxis};
    use smt_common::status::StatusWord;

    fn snap(readback: f64, status: StatusWord) -> AxisSnapshot {
        AxisSnapshot {
            done: false,
            moving: true,
            readback,
            status,
            tweak_increment: 0.0,
        }
    }

    #[test]
    fn overshoot_forward_trips() {
        let monitor = SafetyMonitor::default();
        let verdict = monitor.evaluate(
            &snap(10.0, StatusWord::MOVING),
            &snap(11.5, StatusWord::MOVING),
            0.5,
            TravelDirection::Forward,
        );
        assert_eq!(
            verdict,
            SafetyVerdict::Trip(TripReason::OvershootForward {
                delta: 1.5,
                bound: 1.0
            })
        );
    }

    #[test]
    fn displacement_within_bound_is_ok() {
        let monitor = SafetyMonitor::default();
        let verdict = monitor.evaluate(
            &snap(10.0, StatusWord::MOVING),
            &snap(11.5, StatusWord::MOVING),
            1.0,
            TravelDirection::Forward,
        );
        assert_eq!(verdict, SafetyVerdict::Ok);
    }

    #[test]
    fn overshoot_ignores_commanded_direction() {
        let monitor = SafetyMonitor::default();
        let verdict = monitor.evaluate(
            &snap(10.0, StatusWord::MOVING),
            &snap(7.0, StatusWord::MOVING),
            1.0,
            TravelDirection::Forward,
        );
        assert!(matches!(
            verdict,
            SafetyVerdict::Trip(TripReason::OvershootReverse { .. })
        ));
    }

    #[test]
    fn limit_only_in_direction_of_travel() {
        let monitor = SafetyMonitor::default();
        let at_plus = snap(0.0, StatusWord::PLUS_LS);
        let at_minus = snap(0.0, StatusWord::MINUS_LS);

        assert_eq!(
            monitor.evaluate(&at_plus, &at_plus, 1.0, TravelDirection::Forward),
            SafetyVerdict::Trip(TripReason::PlusLimit)
        );
        assert_eq!(
            monitor.evaluate(&at_plus, &at_plus, 1.0, TravelDirection::Reverse),
            SafetyVerdict::Ok
        );
        assert_eq!(
            monitor.evaluate(&at_minus, &at_minus, 1.0, TravelDirection::Reverse),
            SafetyVerdict::Trip(TripReason::MinusLimit)
        );
        assert_eq!(
            monitor.evaluate(&at_minus, &at_minus, 1.0, TravelDirection::Forward),
            SafetyVerdict::Ok
        );
    }

    #[test]
    fn overshoot_wins_over_limit() {
        let monitor = SafetyMonitor::default();
        let verdict = monitor.evaluate(
            &snap(0.0, StatusWord::empty()),
            &snap(5.0, StatusWord::PLUS_LS),
            1.0,
            TravelDirection::Forward,
        );
        assert!(verdict.is_trip());
        assert!(matches!(verdict, SafetyVerdict::Trip(r) if r.is_overshoot()));
    }

    #[test]
    fn emergency_stop_disables_loop_when_stop_write_fails() {
        let mut axis = ScriptedAxis::new(vec![Frame::moving(0.0)]);
        axis.fail_writes_to(AxisAttribute::Stop);

        let err = emergency_stop(&mut axis).unwrap_err();
        assert!(matches!(
            err,
            ChannelError::Unavailable {
                attribute: AxisAttribute::Stop,
                ..
            }
        ));
        assert_eq!(axis.written(), vec![(AxisAttribute::ClosedLoop, 0.0)]);
    }

    #[test]
    fn emergency_stop_writes_stop_then_disable() {
        let mut axis = ScriptedAxis::new(vec![Frame::moving(0.0)]);
        emergency_stop(&mut axis).unwrap();
        assert_eq!(
            axis.written(),
            vec![(AxisAttribute::Stop, 1.0), (AxisAttribute::ClosedLoop, 0.0)]
        );
    }

    #[test]
    fn stationary_counts_as_reverse() {
        assert_eq!(TravelDirection::from_sign(0.0), TravelDirection::Reverse);
        assert_eq!(TravelDirection::from_sign(-2.0), TravelDirection::Reverse);
        assert_eq!(TravelDirection::from_sign(0.1), TravelDirection::Forward);
    }
}
