//! Catalog of axis attributes consumed by the test core.
//!
//! Every attribute maps to a fixed field of the axis record. Record fields are
//! appended with a `.` separator (`IOC:m1.DMOV`), controller extension records
//! with a `-` separator (`IOC:m1-ErrRst`).

use std::fmt;

use serde::{Deserialize, Serialize};

/// Named attribute of a motion axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AxisAttribute {
    /// Done moving flag (`DMOV`).
    Done,
    /// Moving flag (`MOVN`).
    Moving,
    /// Readback position in user coordinates (`RBV`).
    Readback,
    /// Readback position in dial coordinates (`DRBV`).
    DialReadback,
    /// Packed status word (`MSTA`).
    Status,
    /// Tweak increment (`TWV`).
    TweakIncrement,
    /// User high travel limit (`HLM`).
    HighLimit,
    /// User low travel limit (`LLM`).
    LowLimit,
    /// Dial high travel limit (`DHLM`).
    DialHighLimit,
    /// Dial low travel limit (`DLLM`).
    DialLowLimit,
    /// Move velocity (`VELO`).
    Velocity,
    /// Acceleration time (`ACCL`).
    Acceleration,
    /// Jog velocity (`JVEL`).
    JogVelocity,
    /// Jog acceleration (`JAR`).
    JogAcceleration,
    /// Homing velocity (`HVEL`).
    HomingVelocity,
    /// Target position in user coordinates (`VAL`).
    Target,
    /// Target position in dial coordinates (`DVAL`).
    DialTarget,
    /// Jog forward command (`JOGF`).
    JogForward,
    /// Jog reverse command (`JOGR`).
    JogReverse,
    /// Tweak forward command (`TWF`).
    TweakForward,
    /// Tweak reverse command (`TWR`).
    TweakReverse,
    /// Stop command (`STOP`).
    Stop,
    /// Closed-loop enable (`CNEN`).
    ClosedLoop,
    /// Home forward command (`HOMF`).
    HomeForward,
    /// Home reverse command (`HOMR`).
    HomeReverse,
    /// Limit violation flag (`LVIO`).
    LimitViolation,
    /// Controller error flag (`-Err`).
    ErrorFlag,
    /// Controller error identifier (`-ErrId`).
    ErrorId,
    /// Controller error reset command (`-ErrRst`).
    ErrorReset,
    /// Homing procedure selector (`-ProcHom`).
    HomingProcedure,
}

impl AxisAttribute {
    /// Field name without separator.
    pub const fn field(&self) -> &'static str {
        match self {
            Self::Done => "DMOV",
            Self::Moving => "MOVN",
            Self::Readback => "RBV",
            Self::DialReadback => "DRBV",
            Self::Status => "MSTA",
            Self::TweakIncrement => "TWV",
            Self::HighLimit => "HLM",
            Self::LowLimit => "LLM",
            Self::DialHighLimit => "DHLM",
            Self::DialLowLimit => "DLLM",
            Self::Velocity => "VELO",
            Self::Acceleration => "ACCL",
            Self::JogVelocity => "JVEL",
            Self::JogAcceleration => "JAR",
            Self::HomingVelocity => "HVEL",
            Self::Target => "VAL",
            Self::DialTarget => "DVAL",
            Self::JogForward => "JOGF",
            Self::JogReverse => "JOGR",
            Self::TweakForward => "TWF",
            Self::TweakReverse => "TWR",
            Self::Stop => "STOP",
            Self::ClosedLoop => "CNEN",
            Self::HomeForward => "HOMF",
            Self::HomeReverse => "HOMR",
            Self::LimitViolation => "LVIO",
            Self::ErrorFlag => "Err",
            Self::ErrorId => "ErrId",
            Self::ErrorReset => "ErrRst",
            Self::HomingProcedure => "ProcHom",
        }
    }

    /// Whether the attribute lives in a controller extension record.
    #[inline]
    pub const fn is_extension(&self) -> bool {
        matches!(
            self,
            Self::ErrorFlag | Self::ErrorId | Self::ErrorReset | Self::HomingProcedure
        )
    }

    /// Full channel address for the axis named `axis`.
    pub fn address(&self, axis: &str) -> String {
        let separator = if self.is_extension() { '-' } else { '.' };
        format!("{axis}{separator}{}", self.field())
    }
}

impl fmt::Display for AxisAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.field())
    }
}

/// Coordinate system of a readback or limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Coordinates {
    /// User coordinates (offset and direction applied).
    #[default]
    User,
    /// Raw dial coordinates.
    Dial,
}

impl Coordinates {
    #[inline]
    pub const fn readback(&self) -> AxisAttribute {
        match self {
            Self::User => AxisAttribute::Readback,
            Self::Dial => AxisAttribute::DialReadback,
        }
    }

    #[inline]
    pub const fn high_limit(&self) -> AxisAttribute {
        match self {
            Self::User => AxisAttribute::HighLimit,
            Self::Dial => AxisAttribute::DialHighLimit,
        }
    }

    #[inline]
    pub const fn low_limit(&self) -> AxisAttribute {
        match self {
            Self::User => AxisAttribute::LowLimit,
            Self::Dial => AxisAttribute::DialLowLimit,
        }
    }

    #[inline]
    pub const fn target(&self) -> AxisAttribute {
        match self {
            Self::User => AxisAttribute::Target,
            Self::Dial => AxisAttribute::DialTarget,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_fields_use_dot() {
        assert_eq!(AxisAttribute::Done.address("IOC:m1"), "IOC:m1.DMOV");
        assert_eq!(AxisAttribute::Status.address("IOC:m1"), "IOC:m1.MSTA");
    }

    #[test]
    fn extension_records_use_dash() {
        assert_eq!(AxisAttribute::ErrorReset.address("IOC:m1"), "IOC:m1-ErrRst");
        assert_eq!(AxisAttribute::HomingProcedure.address("IOC:m1"), "IOC:m1-ProcHom");
    }

    #[test]
    fn coordinates_select_fields() {
        assert_eq!(Coordinates::User.readback(), AxisAttribute::Readback);
        assert_eq!(Coordinates::Dial.readback(), AxisAttribute::DialReadback);
        assert_eq!(Coordinates::Dial.high_limit().field(), "DHLM");
        assert_eq!(Coordinates::User.target().field(), "VAL");
    }
}
