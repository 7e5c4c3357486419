//! Scripted axis and counting pacer for unit tests and downstream crates.
//!
//! [`ScriptedAxis`] replays a list of [`Frame`]s. Every read of the done flag
//! starts a new sample: the first read uses frame 0, each later one advances
//! by one frame, and the last frame repeats forever. Attributes outside the
//! frame live in a plain register map that writes update.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use smt_common::attribute::AxisAttribute;
use smt_common::channel::{AxisChannel, ChannelError, WriteMode};
use smt_common::status::StatusWord;

use crate::pacer::Pacer;

/// Per-sample motion state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    pub done: bool,
    pub moving: bool,
    pub readback: f64,
    pub status: StatusWord,
}

impl Frame {
    pub fn moving(readback: f64) -> Self {
        Self {
            done: false,
            moving: true,
            readback,
            status: StatusWord::MOVING,
        }
    }

    pub fn stopped(readback: f64) -> Self {
        Self {
            done: true,
            moving: false,
            readback,
            status: StatusWord::DONE,
        }
    }

    /// Add status bits on top of the motion bits.
    pub fn with_status(mut self, extra: StatusWord) -> Self {
        self.status |= extra;
        self
    }
}

/// Axis double replaying scripted frames.
#[derive(Debug, Clone)]
pub struct ScriptedAxis {
    name: String,
    frames: Vec<Frame>,
    cursor: usize,
    samples: usize,
    registers: HashMap<AxisAttribute, f64>,
    writes: Vec<(AxisAttribute, f64, WriteMode)>,
    failing_writes: HashSet<AxisAttribute>,
    offline: bool,
}

impl ScriptedAxis {
    /// `frames` must not be empty; an empty script behaves as one stopped
    /// frame at zero.
    pub fn new(frames: Vec<Frame>) -> Self {
        let frames = if frames.is_empty() {
            vec![Frame::stopped(0.0)]
        } else {
            frames
        };
        Self {
            name: "scripted".to_string(),
            frames,
            cursor: 0,
            samples: 0,
            registers: HashMap::new(),
            writes: Vec::new(),
            failing_writes: HashSet::new(),
            offline: false,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set a register value without recording a write.
    pub fn set(&mut self, attribute: AxisAttribute, value: f64) {
        self.registers.insert(attribute, value);
    }

    pub fn get(&self, attribute: AxisAttribute) -> Option<f64> {
        self.registers.get(&attribute).copied()
    }

    /// Replace the remaining script from the current frame on.
    pub fn push_frames(&mut self, frames: impl IntoIterator<Item = Frame>) {
        self.frames.truncate(self.cursor + 1);
        self.frames.extend(frames);
    }

    pub fn set_offline(&mut self, offline: bool) {
        self.offline = offline;
    }

    /// Make every write to `attribute` fail with `Unavailable`.
    pub fn fail_writes_to(&mut self, attribute: AxisAttribute) {
        self.failing_writes.insert(attribute);
    }

    /// Number of samples taken (reads of the done flag).
    pub fn samples(&self) -> usize {
        self.samples
    }

    /// Successful writes with their modes.
    pub fn writes(&self) -> &[(AxisAttribute, f64, WriteMode)] {
        &self.writes
    }

    /// Successful writes without modes.
    pub fn written(&self) -> Vec<(AxisAttribute, f64)> {
        self.writes.iter().map(|(a, v, _)| (*a, *v)).collect()
    }

    /// Values written to `attribute`, in order.
    pub fn written_to(&self, attribute: AxisAttribute) -> Vec<f64> {
        self.writes
            .iter()
            .filter(|(a, _, _)| *a == attribute)
            .map(|(_, v, _)| *v)
            .collect()
    }

    fn frame(&self) -> Frame {
        self.frames[self.cursor.min(self.frames.len() - 1)]
    }

    fn check_online(&self, attribute: AxisAttribute) -> Result<(), ChannelError> {
        if self.offline {
            return Err(ChannelError::unavailable(attribute, "axis offline"));
        }
        Ok(())
    }
}

fn flag(value: bool) -> f64 {
    if value { 1.0 } else { 0.0 }
}

impl AxisChannel for ScriptedAxis {
    fn name(&self) -> &str {
        &self.name
    }

    fn read(&mut self, attribute: AxisAttribute) -> Result<f64, ChannelError> {
        self.check_online(attribute)?;
        match attribute {
            AxisAttribute::Done => {
                if self.samples > 0 && self.cursor + 1 < self.frames.len() {
                    self.cursor += 1;
                }
                self.samples += 1;
                Ok(flag(self.frame().done))
            }
            AxisAttribute::Moving => Ok(flag(self.frame().moving)),
            AxisAttribute::Readback => Ok(self.frame().readback),
            AxisAttribute::Status => Ok(f64::from(self.frame().status.bits())),
            other => Ok(self.registers.get(&other).copied().unwrap_or(0.0)),
        }
    }

    fn write(
        &mut self,
        attribute: AxisAttribute,
        value: f64,
        mode: WriteMode,
    ) -> Result<(), ChannelError> {
        self.check_online(attribute)?;
        if self.failing_writes.contains(&attribute) {
            return Err(ChannelError::unavailable(attribute, "write rejected"));
        }
        self.writes.push((attribute, value, mode));
        self.registers.insert(attribute, value);
        Ok(())
    }
}

/// Pacer that never blocks and records what it was asked to do.
#[derive(Debug, Clone, Copy, Default)]
pub struct CountingPacer {
    pauses: u64,
    elapsed: Duration,
}

impl CountingPacer {
    pub fn pauses(&self) -> u64 {
        self.pauses
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }
}

impl Pacer for CountingPacer {
    fn pause(&mut self, interval: Duration) {
        self.pauses += 1;
        self.elapsed += interval;
    }
}
