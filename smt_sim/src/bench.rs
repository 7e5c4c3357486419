//! Bench run: build the simulated axis, run scenarios, tear down.

use std::fmt;

use serde::Serialize;
use smt_common::channel::ChannelError;
use smt_common::config::ConfigError;
use smt_core::SequenceError;
use smt_core::context::SuiteContext;
use smt_core::sequence::MotionSequencer;
use thiserror::Error;
use tracing::{info, warn};

use crate::axis::SimAxis;
use crate::clock::{ClockMode, SimClock};
use crate::config::BenchConfig;
use crate::scenario::{Scenario, ScenarioReport, run_scenario};

#[derive(Debug, Error)]
pub enum BenchError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Channel(#[from] ChannelError),

    #[error(transparent)]
    Sequence(#[from] SequenceError),

    #[error("Failed to encode report: {0}")]
    Report(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize)]
pub struct BenchReport {
    pub axis: String,
    pub clock: ClockMode,
    pub scenarios: Vec<ScenarioReport>,
}

impl BenchReport {
    pub fn passed(&self) -> bool {
        self.scenarios.iter().all(|s| s.passed)
    }

    pub fn failures(&self) -> usize {
        self.scenarios.iter().filter(|s| !s.passed).count()
    }
}

impl fmt::Display for BenchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "axis {} ({:?} clock)", self.axis, self.clock)?;
        for scenario in &self.scenarios {
            writeln!(f, "  {scenario}")?;
        }
        write!(
            f,
            "{} of {} passed",
            self.scenarios.len() - self.failures(),
            self.scenarios.len()
        )
    }
}

/// Run `scenarios` (all when empty) against a fresh simulated axis.
///
/// Teardown is attempted even when a scenario aborts on a channel error.
pub fn run_bench(config: &BenchConfig, scenarios: &[Scenario]) -> Result<BenchReport, BenchError> {
    config.validate()?;
    let clock = SimClock::new(config.sim.clock);
    let axis = SimAxis::new(config.axis.name.clone(), config.sim.clone(), clock.clone());
    let sequencer = MotionSequencer::new(axis, clock.clone(), &config.suite());
    let mut ctx = SuiteContext::setup(sequencer)?;

    let selected = if scenarios.is_empty() {
        &Scenario::ALL[..]
    } else {
        scenarios
    };
    info!(axis = %config.axis.name, count = selected.len(), "bench start");

    let mut reports = Vec::with_capacity(selected.len());
    let mut aborted = None;
    for &scenario in selected {
        match run_scenario(&mut ctx, scenario, &clock) {
            Ok(report) => reports.push(report),
            Err(e) => {
                warn!(%scenario, error = %e, "bench aborted");
                aborted = Some(e);
                break;
            }
        }
    }

    let teardown = ctx.teardown();
    if let Some(e) = aborted {
        return Err(e.into());
    }
    teardown?;

    Ok(BenchReport {
        axis: config.axis.name.clone(),
        clock: config.sim.clock,
        scenarios: reports,
    })
}
