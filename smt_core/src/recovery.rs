//! Controller error reset and fault-clear polling.
//!
//! After an error reset the controller clears the moving bit, the error flag
//! and the error id independently; the waits here poll until all have
//! dropped or the allowance is spent.

use std::time::Duration;

use smt_common::attribute::AxisAttribute;
use smt_common::channel::{AxisChannel, ChannelError};
use smt_common::status::StatusWord;
use tracing::{debug, info};

use crate::pacer::Pacer;
use crate::waiter::PollBudget;

/// Error id reported when a motion command meets a disabled amplifier.
pub const AMP_OFF_ERROR_ID: u32 = 16992;

/// Controller error flag and id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AxisFault {
    pub active: bool,
    pub id: u32,
}

impl AxisFault {
    #[inline]
    pub const fn is_clear(&self) -> bool {
        !self.active && self.id == 0
    }
}

/// Status word and fault sampled together after a reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FaultState {
    pub status: StatusWord,
    pub fault: AxisFault,
}

impl FaultState {
    /// Moving bit, error flag and error id all clear.
    #[inline]
    pub const fn is_clear(&self) -> bool {
        !self.status.moving() && self.fault.is_clear()
    }
}

/// Read error flag and error id.
pub fn read_fault<A: AxisChannel + ?Sized>(axis: &mut A) -> Result<AxisFault, ChannelError> {
    let active = axis.read_flag(AxisAttribute::ErrorFlag)?;
    let id = axis.read(AxisAttribute::ErrorId)?;
    Ok(AxisFault {
        active,
        id: if id > 0.0 { id as u32 } else { 0 },
    })
}

fn read_state<A: AxisChannel + ?Sized>(axis: &mut A) -> Result<FaultState, ChannelError> {
    let status = StatusWord::from_value(axis.read(AxisAttribute::Status)?);
    let fault = read_fault(axis)?;
    Ok(FaultState { status, fault })
}

/// Write error-reset=1, then poll the error flag until it drops.
///
/// Returns `true` if the flag was seen clear within `budget_s`.
pub fn reset_errors<A, P>(
    axis: &mut A,
    pacer: &mut P,
    interval: Duration,
    budget_s: f64,
) -> Result<bool, ChannelError>
where
    A: AxisChannel + ?Sized,
    P: Pacer + ?Sized,
{
    info!(axis = axis.name(), "error reset");
    axis.command(AxisAttribute::ErrorReset, true)?;

    let mut budget = PollBudget::from_seconds(budget_s, interval);
    loop {
        let active = axis.read_flag(AxisAttribute::ErrorFlag)?;
        debug!(remaining = budget.remaining(), active, "waiting for error flag");
        if !active {
            return Ok(true);
        }
        if budget.is_exhausted() {
            return Ok(false);
        }
        pacer.pause(interval);
        budget.consume();
    }
}

/// Poll moving bit, error flag and error id until all are clear, pausing at
/// most `attempts` times.
///
/// Returns the last sampled state; check [`FaultState::is_clear`].
pub fn wait_for_fault_clear<A, P>(
    axis: &mut A,
    pacer: &mut P,
    interval: Duration,
    attempts: u32,
) -> Result<FaultState, ChannelError>
where
    A: AxisChannel + ?Sized,
    P: Pacer + ?Sized,
{
    let mut state = read_state(axis)?;
    let mut remaining = attempts;
    while !state.is_clear() && remaining > 0 {
        pacer.pause(interval);
        state = read_state(axis)?;
        remaining -= 1;
        debug!(
            remaining,
            moving = state.status.moving(),
            error = state.fault.active,
            error_id = state.fault.id,
            "waiting for fault clear"
        );
    }
    Ok(state)
}
