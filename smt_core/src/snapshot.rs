//! Point-in-time view of the axis attributes a wait decides on.

use smt_common::attribute::{AxisAttribute, Coordinates};
use smt_common::channel::{AxisChannel, ChannelError};
use smt_common::status::StatusWord;

/// One sample of the axis.
///
/// Built from independent reads; no atomicity across fields is implied.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisSnapshot {
    /// Done-moving flag.
    pub done: bool,
    /// Moving flag.
    pub moving: bool,
    /// Readback position in the configured coordinates.
    pub readback: f64,
    /// Packed status word.
    pub status: StatusWord,
    /// Tweak increment.
    pub tweak_increment: f64,
}

impl AxisSnapshot {
    /// Sample the axis, reading readback in `coordinates`.
    ///
    /// # Errors
    ///
    /// Propagates the first `ChannelError`; no retry.
    pub fn sample<A: AxisChannel + ?Sized>(
        axis: &mut A,
        coordinates: Coordinates,
    ) -> Result<Self, ChannelError> {
        let done = axis.read_flag(AxisAttribute::Done)?;
        let moving = axis.read_flag(AxisAttribute::Moving)?;
        let readback = axis.read(coordinates.readback())?;
        let status = StatusWord::from_value(axis.read(AxisAttribute::Status)?);
        let tweak_increment = axis.read(AxisAttribute::TweakIncrement)?;
        Ok(Self {
            done,
            moving,
            readback,
            status,
            tweak_increment,
        })
    }

    /// Motion has begun: moving and not done.
    #[inline]
    pub const fn is_started(&self) -> bool {
        self.moving && !self.done
    }

    /// Motion has ended: done and not moving.
    #[inline]
    pub const fn is_stopped(&self) -> bool {
        self.done && !self.moving
    }
}
