//! Per-run fixture captured once from the axis.
//!
//! Procedures derive their targets (fractions of the travel range, midpoint)
//! from the fixture instead of re-reading configuration mid-run. Teardown puts
//! back the captured limits and closed-loop state.

use smt_common::attribute::{AxisAttribute, Coordinates};
use smt_common::channel::{AxisChannel, ChannelError, WriteMode};
use smt_common::status::StatusWord;
use tracing::{info, warn};

use crate::error::SequenceError;
use crate::pacer::Pacer;
use crate::sequence::MotionSequencer;

/// Axis parameters captured at setup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisFixture {
    pub coordinates: Coordinates,
    pub high_limit: f64,
    pub low_limit: f64,
    pub velocity: f64,
    pub jog_velocity: f64,
    pub homing_velocity: f64,
    pub acceleration: f64,
    pub tweak_increment: f64,
    pub status: StatusWord,
    pub closed_loop: bool,
}

impl AxisFixture {
    pub fn capture<A: AxisChannel + ?Sized>(
        axis: &mut A,
        coordinates: Coordinates,
    ) -> Result<Self, ChannelError> {
        Ok(Self {
            coordinates,
            high_limit: axis.read(coordinates.high_limit())?,
            low_limit: axis.read(coordinates.low_limit())?,
            velocity: axis.read(AxisAttribute::Velocity)?,
            jog_velocity: axis.read(AxisAttribute::JogVelocity)?,
            homing_velocity: axis.read(AxisAttribute::HomingVelocity)?,
            acceleration: axis.read(AxisAttribute::Acceleration)?,
            tweak_increment: axis.read(AxisAttribute::TweakIncrement)?,
            status: StatusWord::from_value(axis.read(AxisAttribute::Status)?),
            closed_loop: axis.read_flag(AxisAttribute::ClosedLoop)?,
        })
    }

    #[inline]
    pub fn range(&self) -> f64 {
        self.high_limit - self.low_limit
    }

    /// `low + fraction × range`; 0.1 is 10 % above the low limit.
    #[inline]
    pub fn position_at_fraction(&self, fraction: f64) -> f64 {
        self.low_limit + fraction * self.range()
    }

    #[inline]
    pub fn midpoint(&self) -> f64 {
        (self.high_limit + self.low_limit) / 2.0
    }

    /// Limits are disabled when both are equal.
    #[inline]
    pub fn limits_enabled(&self) -> bool {
        self.high_limit != self.low_limit
    }
}

/// Sequencer plus the fixture captured from its axis.
pub struct SuiteContext<A, P> {
    sequencer: MotionSequencer<A, P>,
    fixture: AxisFixture,
}

impl<A: AxisChannel, P: Pacer> SuiteContext<A, P> {
    /// Capture the fixture from the sequencer's axis.
    pub fn setup(mut sequencer: MotionSequencer<A, P>) -> Result<Self, SequenceError> {
        let coordinates = sequencer.coordinates();
        let fixture = AxisFixture::capture(sequencer.axis_mut(), coordinates)?;
        info!(
            axis = sequencer.axis().name(),
            high = fixture.high_limit,
            low = fixture.low_limit,
            velocity = fixture.velocity,
            tweak = fixture.tweak_increment,
            status = %fixture.status.display(sequencer.firmware()),
            "suite setup"
        );
        Ok(Self { sequencer, fixture })
    }

    #[inline]
    pub fn fixture(&self) -> &AxisFixture {
        &self.fixture
    }

    #[inline]
    pub fn sequencer(&self) -> &MotionSequencer<A, P> {
        &self.sequencer
    }

    #[inline]
    pub fn sequencer_mut(&mut self) -> &mut MotionSequencer<A, P> {
        &mut self.sequencer
    }

    pub fn into_sequencer(self) -> MotionSequencer<A, P> {
        self.sequencer
    }

    /// Stop the axis and write back captured limits and closed-loop state.
    ///
    /// Every write is attempted; the first failure is returned.
    pub fn teardown(&mut self) -> Result<(), SequenceError> {
        let fixture = self.fixture;
        let writes = [
            (AxisAttribute::Stop, 1.0),
            (fixture.coordinates.low_limit(), fixture.low_limit),
            (fixture.coordinates.high_limit(), fixture.high_limit),
            (
                AxisAttribute::ClosedLoop,
                if fixture.closed_loop { 1.0 } else { 0.0 },
            ),
        ];
        let axis = self.sequencer.axis_mut();
        let mut first_error = None;
        for (attribute, value) in writes {
            if let Err(e) = axis.write(attribute, value, WriteMode::FireAndForget) {
                warn!(%attribute, value, error = %e, "teardown write failed");
                first_error.get_or_insert(e);
            }
        }
        info!("suite teardown");
        first_error.map_or(Ok(()), |e| Err(e.into()))
    }
}
