//! Simulated motor axis.
//!
//! Constant-velocity kinematics evaluated lazily: every channel access first
//! advances the axis to the shared clock's current time. Positions are kept
//! in dial units; user values are `dial + offset`.
//!
//! ## Behaviour
//!
//! - Soft limits are disabled when high == low. A target outside enabled
//!   limits sets the limit-violation flag and does not move.
//! - Hard limits clip motion and stop the axis; the limit switch bits report
//!   the axis sitting on them.
//! - Jogs run to the enabled soft limit, otherwise to the hard limit. A jog
//!   ending on a soft limit sets the limit-violation flag.
//! - Homing runs at the homing velocity to the reference chosen by the
//!   procedure selector and sets the homed bit on arrival.
//! - A motion command with the loop open, or opening the loop while moving,
//!   latches the amplifier-off error until an error reset.

use std::time::Duration;

use smt_common::attribute::AxisAttribute;
use smt_common::channel::{AxisChannel, ChannelError, WriteMode};
use smt_common::status::StatusWord;
use smt_core::recovery::AMP_OFF_ERROR_ID;
use smt_core::sequence::HomingProcedure;
use tracing::{debug, trace, warn};

use crate::clock::SimClock;
use crate::config::SimAxisConfig;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Motion {
    Idle,
    Positioning { target: f64, velocity: f64 },
    /// `soft` when `end` is an enabled soft limit.
    Jogging { forward: bool, end: f64, velocity: f64, soft: bool },
    Homing { reference: f64, velocity: f64 },
    /// Commanded but frozen until stopped.
    Stalled,
}

/// Simulated axis behind [`AxisChannel`].
pub struct SimAxis {
    name: String,
    config: SimAxisConfig,
    clock: SimClock,
    last_update: Duration,
    /// Motion does not progress before this time.
    starts_at: Duration,
    motion: Motion,

    /// Dial position.
    position: f64,
    /// Last commanded dial target.
    target: f64,
    soft_high: f64,
    soft_low: f64,

    velocity: f64,
    acceleration: f64,
    jog_velocity: f64,
    jog_acceleration: f64,
    homing_velocity: f64,
    tweak_increment: f64,
    procedure: f64,

    closed_loop: bool,
    homed: bool,
    positive: bool,
    limit_violation: bool,
    jog_forward: bool,
    jog_reverse: bool,
    fault_id: u32,

    stall_homing: bool,
    runaway_jump: f64,
    offline: bool,
}

impl SimAxis {
    pub fn new(name: impl Into<String>, config: SimAxisConfig, clock: SimClock) -> Self {
        let now = clock.now();
        Self {
            name: name.into(),
            last_update: now,
            starts_at: now,
            motion: Motion::Idle,
            position: config.start_position,
            target: config.start_position,
            soft_high: config.soft_high,
            soft_low: config.soft_low,
            velocity: config.velocity,
            acceleration: config.acceleration,
            jog_velocity: config.jog_velocity,
            jog_acceleration: config.acceleration,
            homing_velocity: config.homing_velocity,
            tweak_increment: config.tweak_increment,
            procedure: f64::from(config.homing_procedure),
            closed_loop: config.closed_loop,
            homed: config.initially_homed,
            positive: true,
            limit_violation: false,
            jog_forward: false,
            jog_reverse: false,
            fault_id: 0,
            stall_homing: config.stall_homing,
            runaway_jump: config.runaway_jump,
            offline: false,
            clock,
            config,
        }
    }

    #[inline]
    pub fn clock(&self) -> &SimClock {
        &self.clock
    }

    /// Dial position at the last update.
    #[inline]
    pub fn position(&self) -> f64 {
        self.position
    }

    /// Freeze the next homing run until stopped.
    pub fn inject_homing_stall(&mut self) {
        self.stall_homing = true;
    }

    /// Add `jump` in the direction of travel on the next motion update.
    pub fn inject_runaway(&mut self, jump: f64) {
        self.runaway_jump = jump;
    }

    /// While offline every access fails as unavailable.
    pub fn set_offline(&mut self, offline: bool) {
        self.offline = offline;
    }

    /// Current status word.
    pub fn status(&self) -> StatusWord {
        let mut status = StatusWord::PRESENT | StatusWord::GAIN_SUPPORT;
        let idle = self.motion == Motion::Idle;
        status.set(StatusWord::DIRECTION, self.positive);
        status.set(StatusWord::DONE, idle);
        status.set(
            StatusWord::MOVING,
            !idle && self.clock.now() >= self.starts_at,
        );
        status.set(StatusWord::PLUS_LS, self.position >= self.config.hard_high);
        status.set(StatusWord::MINUS_LS, self.position <= self.config.hard_low);
        let on_switch =
            (self.position - self.config.home_switch).abs() <= self.config.home_switch_width / 2.0;
        status.set(StatusWord::HOME | StatusWord::HOMELS, on_switch);
        status.set(StatusWord::AMPON, self.closed_loop);
        status.set(StatusWord::SLIP_STALL, self.motion == Motion::Stalled);
        status.set(StatusWord::PROBLEM, self.fault_id != 0);
        status.set(StatusWord::HOMED, self.homed);
        status
    }

    // ─── Kinematics ─────────────────────────────────────────────────

    #[inline]
    fn soft_limits_enabled(&self) -> bool {
        self.soft_high != self.soft_low
    }

    fn advance(&mut self) {
        let now = self.clock.now();
        let from = self.last_update.max(self.starts_at);
        self.last_update = now;
        if now <= from {
            return;
        }
        let dt = (now - from).as_secs_f64();
        match self.motion {
            Motion::Idle | Motion::Stalled => {}
            Motion::Positioning { target, velocity } => {
                self.travel(target, velocity, dt);
            }
            Motion::Jogging {
                end, velocity, soft, ..
            } => {
                if self.travel(end, velocity, dt) && soft {
                    debug!(axis = %self.name, position = self.position, "jog at soft limit");
                    self.limit_violation = true;
                }
            }
            Motion::Homing {
                reference,
                velocity,
            } => {
                if self.travel(reference, velocity, dt) {
                    debug!(axis = %self.name, position = self.position, "homed");
                    self.homed = true;
                }
            }
        }
        trace!(axis = %self.name, position = self.position, motion = ?self.motion, "advance");
    }

    /// Move towards `destination` for `dt` seconds. Returns `true` on arrival.
    fn travel(&mut self, destination: f64, velocity: f64, dt: f64) -> bool {
        let delta = destination - self.position;
        let step = velocity * dt;
        let runaway = std::mem::take(&mut self.runaway_jump);
        let (next, arrived) = if runaway != 0.0 {
            (self.position + delta.signum() * (step + runaway), false)
        } else if step >= delta.abs() {
            (destination, true)
        } else {
            (self.position + delta.signum() * step, false)
        };

        let clipped = next.clamp(self.config.hard_low, self.config.hard_high);
        self.position = clipped;
        if clipped != next {
            debug!(axis = %self.name, position = clipped, "hard limit");
            self.motion = Motion::Idle;
            return false;
        }
        if arrived {
            self.motion = Motion::Idle;
        }
        arrived
    }

    fn begin(&mut self, motion: Motion, destination: f64) {
        self.limit_violation = false;
        self.positive = destination >= self.position;
        self.motion = motion;
        self.starts_at =
            self.clock.now() + Duration::from_secs_f64(self.config.start_latency_s.max(0.0));
    }

    fn halt(&mut self) {
        if self.motion != Motion::Idle {
            debug!(axis = %self.name, position = self.position, "halt");
        }
        self.motion = Motion::Idle;
    }

    /// Refuse motion with the loop open.
    fn amplifier_ready(&mut self, command: AxisAttribute) -> bool {
        if !self.closed_loop {
            warn!(axis = %self.name, %command, "motion command with amplifier off");
            self.fault_id = AMP_OFF_ERROR_ID;
            self.halt();
        }
        self.closed_loop
    }

    #[inline]
    fn speed(value: f64, fallback: f64) -> f64 {
        if value > 0.0 { value } else { fallback }
    }

    fn move_to(&mut self, command: AxisAttribute, target: f64) {
        self.target = target;
        if !self.amplifier_ready(command) {
            return;
        }
        if self.soft_limits_enabled() && !(self.soft_low..=self.soft_high).contains(&target) {
            debug!(axis = %self.name, target, "target outside soft limits");
            self.limit_violation = true;
            return;
        }
        let velocity = Self::speed(self.velocity, self.config.velocity);
        self.begin(Motion::Positioning { target, velocity }, target);
    }

    fn jog(&mut self, command: AxisAttribute, forward: bool) {
        if !self.amplifier_ready(command) {
            return;
        }
        let soft = self.soft_limits_enabled();
        let end = match (forward, soft) {
            (true, true) => self.soft_high,
            (false, true) => self.soft_low,
            (true, false) => self.config.hard_high,
            (false, false) => self.config.hard_low,
        };
        let velocity = Self::speed(self.jog_velocity, self.config.jog_velocity);
        self.begin(
            Motion::Jogging {
                forward,
                end,
                velocity,
                soft,
            },
            end,
        );
    }

    fn home(&mut self, command: AxisAttribute) {
        if !self.amplifier_ready(command) {
            return;
        }
        if std::mem::take(&mut self.stall_homing) {
            warn!(axis = %self.name, "homing stalled");
            self.begin(Motion::Stalled, self.position);
            return;
        }
        let selector = self.procedure.round().clamp(0.0, f64::from(u8::MAX)) as u8;
        let reference = match HomingProcedure::from_selector(selector) {
            Some(HomingProcedure::LowLimit) => self.config.hard_low,
            Some(HomingProcedure::HighLimit) => self.config.hard_high,
            _ => self.config.home_switch,
        };
        let velocity = Self::speed(self.homing_velocity, self.config.homing_velocity);
        debug!(axis = %self.name, selector, reference, "homing");
        self.begin(
            Motion::Homing {
                reference,
                velocity,
            },
            reference,
        );
    }

    fn stop_jog(&mut self, forward: bool) {
        if matches!(self.motion, Motion::Jogging { forward: f, .. } if f == forward) {
            self.halt();
        }
    }
}

impl AxisChannel for SimAxis {
    fn name(&self) -> &str {
        &self.name
    }

    fn read(&mut self, attribute: AxisAttribute) -> Result<f64, ChannelError> {
        if self.offline {
            return Err(ChannelError::unavailable(attribute, "simulated link down"));
        }
        self.advance();
        let flag = |on: bool| if on { 1.0 } else { 0.0 };
        let offset = self.config.offset;
        let value = match attribute {
            AxisAttribute::Done => flag(self.motion == Motion::Idle),
            AxisAttribute::Moving => flag(self.status().moving()),
            AxisAttribute::Readback => self.position + offset,
            AxisAttribute::DialReadback => self.position,
            AxisAttribute::Status => f64::from(self.status().bits()),
            AxisAttribute::TweakIncrement => self.tweak_increment,
            AxisAttribute::HighLimit => self.soft_high + offset,
            AxisAttribute::LowLimit => self.soft_low + offset,
            AxisAttribute::DialHighLimit => self.soft_high,
            AxisAttribute::DialLowLimit => self.soft_low,
            AxisAttribute::Velocity => self.velocity,
            AxisAttribute::Acceleration => self.acceleration,
            AxisAttribute::JogVelocity => self.jog_velocity,
            AxisAttribute::JogAcceleration => self.jog_acceleration,
            AxisAttribute::HomingVelocity => self.homing_velocity,
            AxisAttribute::Target => self.target + offset,
            AxisAttribute::DialTarget => self.target,
            AxisAttribute::JogForward => flag(self.jog_forward),
            AxisAttribute::JogReverse => flag(self.jog_reverse),
            AxisAttribute::ClosedLoop => flag(self.closed_loop),
            AxisAttribute::LimitViolation => flag(self.limit_violation),
            AxisAttribute::ErrorFlag => flag(self.fault_id != 0),
            AxisAttribute::ErrorId => f64::from(self.fault_id),
            AxisAttribute::HomingProcedure => self.procedure,
            AxisAttribute::TweakForward
            | AxisAttribute::TweakReverse
            | AxisAttribute::Stop
            | AxisAttribute::HomeForward
            | AxisAttribute::HomeReverse
            | AxisAttribute::ErrorReset => 0.0,
        };
        Ok(value)
    }

    fn write(
        &mut self,
        attribute: AxisAttribute,
        value: f64,
        _mode: WriteMode,
    ) -> Result<(), ChannelError> {
        if self.offline {
            return Err(ChannelError::unavailable(attribute, "simulated link down"));
        }
        self.advance();
        debug!(axis = %self.name, %attribute, value, "write");
        let on = value != 0.0;
        let offset = self.config.offset;
        match attribute {
            AxisAttribute::Target => self.move_to(attribute, value - offset),
            AxisAttribute::DialTarget => self.move_to(attribute, value),
            AxisAttribute::TweakForward | AxisAttribute::TweakReverse if on => {
                let sign = if attribute == AxisAttribute::TweakForward { 1.0 } else { -1.0 };
                let target = self.position + sign * self.tweak_increment;
                self.move_to(attribute, target);
            }
            AxisAttribute::TweakForward | AxisAttribute::TweakReverse => {}
            AxisAttribute::JogForward => {
                self.jog_forward = on;
                if on {
                    self.jog(attribute, true);
                } else {
                    self.stop_jog(true);
                }
            }
            AxisAttribute::JogReverse => {
                self.jog_reverse = on;
                if on {
                    self.jog(attribute, false);
                } else {
                    self.stop_jog(false);
                }
            }
            AxisAttribute::HomeForward | AxisAttribute::HomeReverse => {
                if on {
                    self.home(attribute);
                }
            }
            AxisAttribute::Stop => {
                if on {
                    self.halt();
                }
            }
            AxisAttribute::ClosedLoop => {
                if !on && self.motion != Motion::Idle {
                    warn!(axis = %self.name, "loop opened while moving");
                    self.fault_id = AMP_OFF_ERROR_ID;
                    self.halt();
                }
                self.closed_loop = on;
            }
            AxisAttribute::ErrorReset => {
                if on {
                    debug!(axis = %self.name, fault_id = self.fault_id, "error reset");
                    self.fault_id = 0;
                }
            }
            AxisAttribute::HighLimit => self.soft_high = value - offset,
            AxisAttribute::LowLimit => self.soft_low = value - offset,
            AxisAttribute::DialHighLimit => self.soft_high = value,
            AxisAttribute::DialLowLimit => self.soft_low = value,
            AxisAttribute::Velocity => self.velocity = value,
            AxisAttribute::Acceleration => self.acceleration = value,
            AxisAttribute::JogVelocity => self.jog_velocity = value,
            AxisAttribute::JogAcceleration => self.jog_acceleration = value,
            AxisAttribute::HomingVelocity => self.homing_velocity = value,
            AxisAttribute::TweakIncrement => self.tweak_increment = value,
            AxisAttribute::HomingProcedure => self.procedure = value,
            AxisAttribute::Done
            | AxisAttribute::Moving
            | AxisAttribute::Readback
            | AxisAttribute::DialReadback
            | AxisAttribute::Status
            | AxisAttribute::LimitViolation
            | AxisAttribute::ErrorFlag
            | AxisAttribute::ErrorId => return Err(ChannelError::Unsupported(attribute)),
        }
        Ok(())
    }
}
