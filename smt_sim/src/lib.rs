//! # SMT Simulation
//!
//! Constant-velocity simulated axis implementing
//! [`AxisChannel`](smt_common::channel::AxisChannel), a shared clock that
//! advances virtually or with wall time, and the bench scenarios run by the
//! `smt_bench` binary.
//!
//! The core sees the simulation only through the channel trait.

pub mod axis;
pub mod bench;
pub mod clock;
pub mod config;
pub mod scenario;

pub use axis::SimAxis;
pub use bench::{BenchError, BenchReport, run_bench};
pub use clock::{ClockMode, SimClock};
pub use config::{BenchConfig, SimAxisConfig};
pub use scenario::{Scenario, ScenarioReport};
