//! Sequencer error type.

use smt_common::channel::ChannelError;
use thiserror::Error;

/// Failure of a motion procedure.
///
/// Timeouts are not errors: waits report them as outcomes. A procedure turns
/// an outcome into [`SequenceError::Assertion`] only when the outcome violates
/// one of its post-conditions.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SequenceError {
    /// Transport failure, propagated immediately.
    #[error(transparent)]
    Channel(#[from] ChannelError),

    /// A post-condition of the procedure does not hold.
    #[error("{procedure}: {message}")]
    Assertion {
        /// Procedure that checked the condition.
        procedure: &'static str,
        /// Human-readable description of the failed condition.
        message: String,
    },
}

impl SequenceError {
    pub fn assertion(procedure: &'static str, message: impl Into<String>) -> Self {
        Self::Assertion {
            procedure,
            message: message.into(),
        }
    }

    /// Whether this is a failed post-condition rather than a transport fault.
    #[inline]
    pub const fn is_assertion(&self) -> bool {
        matches!(self, Self::Assertion { .. })
    }
}
