//! Integration test: motion sequencer against the simulated axis.
//!
//! Validates the core end to end over a channel with real kinematics:
//! 1. Full scenario suite passes on the virtual clock
//! 2. Runaway during a tweak trips the safety monitor and opens the loop
//! 3. Homing stall times out with limits and selector restored
//! 4. Limit pre-approach reaches the hard limit before homing
//! 5. Jogs into the soft limit and into the limit switch report the
//!    expected flags
//! 6. Transport loss surfaces as a channel error

use smt_common::attribute::AxisAttribute;
use smt_common::channel::{AxisChannel, ChannelError};
use smt_common::config::{AxisSection, SharedConfig, TimingConfig};
use smt_common::status::StatusWord;
use smt_core::SequenceError;
use smt_core::context::SuiteContext;
use smt_core::recovery::AMP_OFF_ERROR_ID;
use smt_core::safety::{TravelDirection, TripReason};
use smt_core::sequence::{HomeApproach, HomeRequest, HomingProcedure, MotionSequencer};
use smt_core::waiter::WaitOutcome;
use smt_sim::scenario::run_scenario;
use smt_sim::{BenchConfig, Scenario, SimAxis, SimAxisConfig, SimClock, run_bench};

// ── Helpers ─────────────────────────────────────────────────────────

fn bench_config(sim: SimAxisConfig) -> BenchConfig {
    BenchConfig {
        shared: SharedConfig {
            log_level: Default::default(),
            service_name: "bench-test".to_string(),
        },
        axis: AxisSection {
            name: "SIM:m1".to_string(),
            readback: Default::default(),
            firmware: Default::default(),
        },
        timing: TimingConfig::default(),
        sim,
    }
}

fn sequencer(sim: SimAxisConfig) -> MotionSequencer<SimAxis, SimClock> {
    let config = bench_config(sim);
    let clock = SimClock::virtual_clock();
    let axis = SimAxis::new("SIM:m1", config.sim.clone(), clock.clone());
    MotionSequencer::new(axis, clock, &config.suite())
}

fn read(seq: &mut MotionSequencer<SimAxis, SimClock>, attribute: AxisAttribute) -> f64 {
    seq.axis_mut().read(attribute).unwrap()
}

// ── Tests ───────────────────────────────────────────────────────────

#[test]
fn full_suite_passes() {
    let report = run_bench(&bench_config(SimAxisConfig::default()), &[]).unwrap();
    assert_eq!(report.scenarios.len(), Scenario::ALL.len());
    for scenario in &report.scenarios {
        assert!(scenario.passed, "{scenario}");
    }
    assert!(report.passed());
    assert_eq!(report.failures(), 0);
}

#[test]
fn move_tolerates_start_latency() {
    let sim = SimAxisConfig {
        start_latency_s: 0.5,
        ..SimAxisConfig::default()
    };
    let report = run_bench(&bench_config(sim), &[Scenario::Move]).unwrap();
    assert!(report.passed(), "{report}");
}

#[test]
fn jog_limit_fails_without_soft_limits() {
    let sim = SimAxisConfig {
        soft_low: 0.0,
        soft_high: 0.0,
        ..SimAxisConfig::default()
    };
    let report = run_bench(&bench_config(sim), &[Scenario::JogLimit]).unwrap();
    assert!(!report.passed());
    assert_eq!(report.failures(), 1);
    assert!(report.scenarios[0].detail.contains("soft limits disabled"));
}

#[test]
fn jog_limit_reports_limit_violation() {
    let clock = SimClock::virtual_clock();
    let config = bench_config(SimAxisConfig::default());
    let axis = SimAxis::new("SIM:m1", config.sim.clone(), clock.clone());
    let seq = MotionSequencer::new(axis, clock.clone(), &config.suite());
    let mut ctx = SuiteContext::setup(seq).unwrap();

    let report = run_scenario(&mut ctx, Scenario::JogLimit, &clock).unwrap();
    assert!(report.passed, "{report}");

    let seq = ctx.sequencer_mut();
    assert_eq!(read(seq, AxisAttribute::LimitViolation), 1.0);
    let status = seq.read_status().unwrap();
    assert!(!status.problem());
    assert!(!status.plus_limit());
    assert!(!status.minus_limit());
}

#[test]
fn jog_hard_limit_stops_on_plus_switch() {
    let clock = SimClock::virtual_clock();
    let config = bench_config(SimAxisConfig::default());
    let axis = SimAxis::new("SIM:m1", config.sim.clone(), clock.clone());
    let seq = MotionSequencer::new(axis, clock.clone(), &config.suite());
    let mut ctx = SuiteContext::setup(seq).unwrap();

    let report = run_scenario(&mut ctx, Scenario::JogHardLimit, &clock).unwrap();
    assert!(report.passed, "{report}");

    let seq = ctx.sequencer_mut();
    let status = seq.read_status().unwrap();
    assert!(status.plus_limit());
    assert!(!status.minus_limit());
    assert!(!status.problem());
    assert_eq!(read(seq, AxisAttribute::Readback), 110.0);
    assert_eq!(read(seq, AxisAttribute::HighLimit), 100.0);
    assert_eq!(read(seq, AxisAttribute::LowLimit), -100.0);
    assert_eq!(read(seq, AxisAttribute::JogForward), 0.0);
}

#[test]
fn jog_hard_limit_fails_when_switch_out_of_reach() {
    // Hard limit far beyond the jog budget at 5 units/s.
    let sim = SimAxisConfig {
        hard_high: 5000.0,
        ..SimAxisConfig::default()
    };
    let report = run_bench(&bench_config(sim), &[Scenario::JogHardLimit]).unwrap();
    assert!(!report.passed());
    assert!(report.scenarios[0].detail.contains("not done"));
}

#[test]
fn json_report_names_scenarios() {
    let report = run_bench(&bench_config(SimAxisConfig::default()), &[Scenario::AmpOff]).unwrap();
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["scenarios"][0]["scenario"], "amp-off");
    assert_eq!(json["scenarios"][0]["passed"], true);
    assert_eq!(json["clock"], "virtual");
}

#[test]
fn tweak_runaway_trips_safety() {
    let mut seq = sequencer(SimAxisConfig::default());
    seq.axis_mut().inject_runaway(5.0);

    let report = seq.tweak().unwrap();
    assert!(matches!(
        report.outcome,
        WaitOutcome::AbortedForSafety(TripReason::OvershootForward { .. })
    ));
    assert!(!report.passed());
    assert!(!report.in_tolerance);
    assert_eq!(report.direction, TravelDirection::Forward);

    assert_eq!(read(&mut seq, AxisAttribute::ClosedLoop), 0.0);
    assert_eq!(read(&mut seq, AxisAttribute::Done), 1.0);
    assert_eq!(read(&mut seq, AxisAttribute::HighLimit), 100.0);
    assert_eq!(read(&mut seq, AxisAttribute::LowLimit), -100.0);
}

#[test]
fn tweak_moves_one_increment() {
    let mut seq = sequencer(SimAxisConfig::default());
    let report = seq.tweak().unwrap();
    assert!(report.passed());
    assert!(report.started);
    assert_eq!(report.destination, 1.0);
    assert_eq!(report.position, 1.0);
}

#[test]
fn homing_stall_restores_selector() {
    let mut seq = sequencer(SimAxisConfig::default());
    seq.axis_mut().inject_homing_stall();

    let err = seq
        .home(HomeRequest::new(
            Some(HomingProcedure::LowLimit),
            HomeApproach::Direct,
        ))
        .unwrap_err();
    assert!(err.is_assertion());
    assert!(err.to_string().contains("not done"));
    assert_eq!(read(&mut seq, AxisAttribute::HomingProcedure), 3.0);

    let status = seq.read_status().unwrap();
    assert!(status.contains(StatusWord::SLIP_STALL));
    seq.stop().unwrap();
    assert!(seq.read_status().unwrap().contains(StatusWord::DONE));
}

#[test]
fn home_from_low_limit() {
    let mut seq = sequencer(SimAxisConfig::default());
    let status = seq
        .home(HomeRequest::new(
            Some(HomingProcedure::LowLimit),
            HomeApproach::FromLimit(TravelDirection::Reverse),
        ))
        .unwrap();
    assert!(status.is_homed());
    assert!(status.minus_limit());
    assert_eq!(read(&mut seq, AxisAttribute::Readback), -110.0);
    assert_eq!(read(&mut seq, AxisAttribute::HighLimit), 100.0);
    assert_eq!(read(&mut seq, AxisAttribute::LowLimit), -100.0);
    assert_eq!(read(&mut seq, AxisAttribute::JogReverse), 0.0);
}

#[test]
fn amp_off_scenario_clears_error() {
    let clock = SimClock::virtual_clock();
    let config = bench_config(SimAxisConfig::default());
    let axis = SimAxis::new("SIM:m1", config.sim.clone(), clock.clone());
    let seq = MotionSequencer::new(axis, clock.clone(), &config.suite());
    let mut ctx = SuiteContext::setup(seq).unwrap();

    let report = run_scenario(&mut ctx, Scenario::AmpOff, &clock).unwrap();
    assert!(report.passed, "{report}");
    assert!(report.detail.contains(&AMP_OFF_ERROR_ID.to_string()));
    assert!(report.elapsed_s > 0.0);

    let seq = ctx.sequencer_mut();
    assert!(seq.read_fault().unwrap().is_clear());
    assert_eq!(read(seq, AxisAttribute::ClosedLoop), 1.0);
}

#[test]
fn offline_axis_fails_move() {
    let mut seq = sequencer(SimAxisConfig::default());
    seq.axis_mut().set_offline(true);
    let err = seq.move_absolute(10.0, 10.0, 0.2).unwrap_err();
    assert!(matches!(
        err,
        SequenceError::Channel(ChannelError::Unavailable { .. })
    ));
}
