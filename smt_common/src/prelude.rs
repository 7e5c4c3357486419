//! Prelude module for common re-exports.
//!
//! ```rust
//! use smt_common::prelude::*;
//! ```

// ─── Logging ────────────────────────────────────────────────────────
pub use crate::config::LogLevel;

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{
    AxisSection, ConfigError, ConfigLoader, SharedConfig, SuiteConfig, TimingConfig,
};

// ─── Axis access ────────────────────────────────────────────────────
pub use crate::attribute::{AxisAttribute, Coordinates};
pub use crate::channel::{AxisChannel, ChannelError, WriteMode};

// ─── Status word ────────────────────────────────────────────────────
pub use crate::status::{DecodedStatus, FirmwareVariant, StatusFlag, StatusWord};
