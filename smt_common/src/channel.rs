//! Axis channel trait and error types.
//!
//! This module defines:
//! - `AxisChannel` trait - the only way the test core touches an axis
//! - `ChannelError` enum - transport faults
//! - `WriteMode` enum - fire-and-forget vs wait-for-completion writes
//!
//! Values travel as `f64` regardless of the attribute; boolean commands are
//! written as `1.0` / `0.0` and flags read back as non-zero / zero.

use thiserror::Error;

use crate::attribute::AxisAttribute;

/// Error types for channel operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ChannelError {
    /// The transport cannot reach the axis.
    #[error("Channel unavailable for {attribute}: {reason}")]
    Unavailable {
        /// Attribute being accessed when the fault occurred.
        attribute: AxisAttribute,
        /// Transport-specific reason.
        reason: String,
    },

    /// The axis does not provide this attribute (or refuses writes to it).
    #[error("Attribute {0} not supported by this axis")]
    Unsupported(AxisAttribute),
}

impl ChannelError {
    /// Shorthand for [`ChannelError::Unavailable`].
    pub fn unavailable(attribute: AxisAttribute, reason: impl Into<String>) -> Self {
        Self::Unavailable {
            attribute,
            reason: reason.into(),
        }
    }
}

/// How a write is completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WriteMode {
    /// Return as soon as the write is queued.
    #[default]
    FireAndForget,
    /// Return once the axis has processed the write.
    WaitForCompletion,
}

/// Trait defining access to one motion axis.
///
/// Implemented by transports (channel access, simulation, scripted doubles).
/// Individual reads and writes are assumed atomic; nothing is assumed about
/// ordering across separate reads.
///
/// # Errors
///
/// Every method fails with `ChannelError::Unavailable` when the transport
/// cannot reach the axis. The core never retries.
pub trait AxisChannel {
    /// Axis identifier used in log lines.
    fn name(&self) -> &str;

    /// Read the current value of `attribute`.
    fn read(&mut self, attribute: AxisAttribute) -> Result<f64, ChannelError>;

    /// Request a change of `attribute`.
    fn write(
        &mut self,
        attribute: AxisAttribute,
        value: f64,
        mode: WriteMode,
    ) -> Result<(), ChannelError>;

    /// Read a flag attribute. Non-zero is `true`.
    fn read_flag(&mut self, attribute: AxisAttribute) -> Result<bool, ChannelError> {
        Ok(self.read(attribute)? != 0.0)
    }

    /// Read several attributes one after another.
    ///
    /// Default implementation performs independent reads; transports with a
    /// native batch read may override it. No atomicity is implied.
    fn read_many(&mut self, attributes: &[AxisAttribute]) -> Result<Vec<f64>, ChannelError> {
        attributes.iter().map(|a| self.read(*a)).collect()
    }

    /// Fire-and-forget write of a command attribute (`1.0` or `0.0`).
    fn command(&mut self, attribute: AxisAttribute, on: bool) -> Result<(), ChannelError> {
        self.write(attribute, if on { 1.0 } else { 0.0 }, WriteMode::FireAndForget)
    }
}

impl<T: AxisChannel + ?Sized> AxisChannel for &mut T {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn read(&mut self, attribute: AxisAttribute) -> Result<f64, ChannelError> {
        (**self).read(attribute)
    }

    fn write(
        &mut self,
        attribute: AxisAttribute,
        value: f64,
        mode: WriteMode,
    ) -> Result<(), ChannelError> {
        (**self).write(attribute, value, mode)
    }

    fn read_many(&mut self, attributes: &[AxisAttribute]) -> Result<Vec<f64>, ChannelError> {
        (**self).read_many(attributes)
    }
}

impl<T: AxisChannel + ?Sized> AxisChannel for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn read(&mut self, attribute: AxisAttribute) -> Result<f64, ChannelError> {
        (**self).read(attribute)
    }

    fn write(
        &mut self,
        attribute: AxisAttribute,
        value: f64,
        mode: WriteMode,
    ) -> Result<(), ChannelError> {
        (**self).write(attribute, value, mode)
    }

    fn read_many(&mut self, attributes: &[AxisAttribute]) -> Result<Vec<f64>, ChannelError> {
        (**self).read_many(attributes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[derive(Default)]
    struct Registers {
        values: HashMap<AxisAttribute, f64>,
        writes: Vec<(AxisAttribute, f64)>,
    }

    impl AxisChannel for Registers {
        fn name(&self) -> &str {
            "test"
        }

        fn read(&mut self, attribute: AxisAttribute) -> Result<f64, ChannelError> {
            self.values
                .get(&attribute)
                .copied()
                .ok_or(ChannelError::Unsupported(attribute))
        }

        fn write(
            &mut self,
            attribute: AxisAttribute,
            value: f64,
            _mode: WriteMode,
        ) -> Result<(), ChannelError> {
            self.writes.push((attribute, value));
            self.values.insert(attribute, value);
            Ok(())
        }
    }

    #[test]
    fn test_channel_error_display() {
        let err = ChannelError::unavailable(AxisAttribute::Done, "timeout");
        assert!(err.to_string().contains("DMOV"));
        assert!(err.to_string().contains("timeout"));
        let err = ChannelError::Unsupported(AxisAttribute::HomingProcedure);
        assert!(err.to_string().contains("ProcHom"));
    }

    #[test]
    fn test_read_flag_and_command() {
        let mut regs = Registers::default();
        regs.command(AxisAttribute::JogForward, true).unwrap();
        assert!(regs.read_flag(AxisAttribute::JogForward).unwrap());
        regs.command(AxisAttribute::JogForward, false).unwrap();
        assert!(!regs.read_flag(AxisAttribute::JogForward).unwrap());
        assert_eq!(
            regs.writes,
            vec![(AxisAttribute::JogForward, 1.0), (AxisAttribute::JogForward, 0.0)]
        );
    }

    #[test]
    fn test_read_many_stops_at_first_failure() {
        let mut regs = Registers::default();
        regs.values.insert(AxisAttribute::Done, 1.0);
        let ok = regs.read_many(&[AxisAttribute::Done]).unwrap();
        assert_eq!(ok, vec![1.0]);
        let err = regs
            .read_many(&[AxisAttribute::Done, AxisAttribute::Moving])
            .unwrap_err();
        assert_eq!(err, ChannelError::Unsupported(AxisAttribute::Moving));
    }

    #[test]
    fn test_mut_ref_forwards() {
        let mut regs = Registers::default();
        {
            let mut by_ref = &mut regs;
            by_ref.command(AxisAttribute::Stop, true).unwrap();
            assert_eq!(by_ref.name(), "test");
        }
        assert_eq!(regs.writes.len(), 1);
    }
}
