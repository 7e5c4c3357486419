//! # SMT Core Library
//!
//! Motion monitoring and synchronization core for single-axis integration
//! procedures. Observes asynchronous actuator state through the
//! [`AxisChannel`](smt_common::channel::AxisChannel) trait and derives
//! higher-level events (motion started, motion stopped, error raised, homing
//! completed) from status bits and readback values sampled at a fixed cadence.
//!
//! ## Layers
//!
//! 1. **Snapshot** - one sample of done/moving/readback/status/tweak increment
//! 2. **Waiter** - polling state machine over consecutive snapshots
//! 3. **Safety** - runaway and limit-switch classification during stop waits
//! 4. **Sequencer** - move, jog, tweak and home procedures (modify, act, restore)
//!
//! The core never simulates the axis; see `smt_sim` for a channel-level
//! simulation used by integration tests and the bench binary.

pub mod check;
pub mod context;
pub mod error;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod pacer;
pub mod recovery;
pub mod safety;
pub mod sequence;
pub mod snapshot;
pub mod waiter;

pub use error::SequenceError;
pub use sequence::MotionSequencer;
pub use snapshot::AxisSnapshot;
pub use waiter::{MotionWaiter, WaitOutcome};
