//! Temporary attribute overrides with guaranteed restore.

use smt_common::attribute::AxisAttribute;
use smt_common::channel::{AxisChannel, ChannelError, WriteMode};
use tracing::{debug, warn};

use super::MotionSequencer;
use crate::error::SequenceError;
use crate::pacer::Pacer;

/// Combine the primary result with the restore result.
///
/// A restore failure only surfaces when the primary action succeeded.
pub(crate) fn settle<T>(
    primary: Result<T, SequenceError>,
    restored: Result<(), ChannelError>,
) -> Result<T, SequenceError> {
    match (primary, restored) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(e)) => Err(e.into()),
        (Err(e), _) => Err(e),
    }
}

impl<A: AxisChannel, P: Pacer> MotionSequencer<A, P> {
    /// Apply `overrides` in order, run `body`, then write the captured values
    /// back in reverse order with `restore_mode`.
    ///
    /// Every attribute is read before any is written, so a failed capture
    /// changes nothing. A failed apply restores what was already applied and
    /// skips `body`.
    pub fn with_overrides<T>(
        &mut self,
        overrides: &[(AxisAttribute, f64)],
        restore_mode: WriteMode,
        body: impl FnOnce(&mut Self) -> Result<T, SequenceError>,
    ) -> Result<T, SequenceError> {
        let saved = overrides
            .iter()
            .map(|(attribute, _)| self.axis.read(*attribute).map(|v| (*attribute, v)))
            .collect::<Result<Vec<_>, _>>()?;

        let mut applied = 0;
        let mut primary = Ok(());
        for (attribute, value) in overrides {
            debug!(%attribute, value, "override");
            match self.axis.write(*attribute, *value, WriteMode::FireAndForget) {
                Ok(()) => applied += 1,
                Err(e) => {
                    primary = Err(SequenceError::from(e));
                    break;
                }
            }
        }

        let result = primary.and_then(|()| body(self));
        let restored = self.restore(&saved[..applied], restore_mode);
        settle(result, restored)
    }

    /// Zero both travel limits around `body`.
    ///
    /// The limit on the readback's side of zero is written last so the axis
    /// stays inside the limits while they collapse.
    pub fn with_limits_zeroed<T>(
        &mut self,
        body: impl FnOnce(&mut Self) -> Result<T, SequenceError>,
    ) -> Result<T, SequenceError> {
        let coordinates = self.settings.coordinates;
        let high = coordinates.high_limit();
        let low = coordinates.low_limit();
        let readback = self.readback()?;
        let order = if readback > 0.0 {
            [(low, 0.0), (high, 0.0)]
        } else {
            [(high, 0.0), (low, 0.0)]
        };
        self.with_overrides(&order, WriteMode::FireAndForget, body)
    }

    /// Write saved values back, last first. Every write is attempted; the
    /// first failure is returned.
    fn restore(
        &mut self,
        saved: &[(AxisAttribute, f64)],
        mode: WriteMode,
    ) -> Result<(), ChannelError> {
        let mut first_error = None;
        for (attribute, value) in saved.iter().rev() {
            if let Err(e) = self.axis.write(*attribute, *value, mode) {
                warn!(%attribute, value, error = %e, "restore failed");
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}
