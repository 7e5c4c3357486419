//! Axis status word (motor record `MSTA`).
//!
//! The status word is a packed register whose bit positions are fixed by the
//! controller firmware contract. Documentation numbers bits from 1; the mask of
//! bit `N` is `1 << (N - 1)`.
//!
//! | Bit | Mask   | Flag          |
//! |-----|--------|---------------|
//! | 15  | 0x4000 | HOMED         |
//! | 14  | 0x2000 | MINUS_LS      |
//! | 13  | 0x1000 | COMM_ERR      |
//! | 12  | 0x0800 | GAIN_SUPPORT  |
//! | 11  | 0x0400 | MOVING        |
//! | 10  | 0x0200 | PROBLEM       |
//! |  9  | 0x0100 | PRESENT       |
//! |  8  | 0x0080 | HOME          |
//! |  7  | 0x0040 | SLIP_STALL / FOLLOW_ERR |
//! |  6  | 0x0020 | AMPON         |
//! |  4  | 0x0008 | HOMELS        |
//! |  3  | 0x0004 | PLUS_LS       |
//! |  2  | 0x0002 | DONE          |
//! |  1  | 0x0001 | DIRECTION     |
//!
//! Bit 7 is reported as slip/stall by one firmware family and as following
//! error by another. Both readings are kept as named views; the active one is
//! chosen by [`FirmwareVariant`].

use std::fmt;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Raw status word as sampled from the axis.
    ///
    /// Unknown bits are retained but never reported by [`StatusWord::decode`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct StatusWord: u32 {
        /// Last move direction was positive.
        const DIRECTION    = 1 << (1 - 1);
        /// Motion is complete.
        const DONE         = 1 << (2 - 1);
        /// Plus (high) limit switch active.
        const PLUS_LS      = 1 << (3 - 1);
        /// Home limit switch active.
        const HOMELS       = 1 << (4 - 1);
        /// Amplifier on / closed loop enabled.
        const AMPON        = 1 << (6 - 1);
        /// Slip or stall detected (slip/stall firmware).
        const SLIP_STALL   = 1 << (7 - 1);
        /// Following error (following-error firmware). Same bit as `SLIP_STALL`.
        const FOLLOW_ERR   = 1 << (7 - 1);
        /// Home switch active.
        const HOME         = 1 << (8 - 1);
        /// Encoder present.
        const PRESENT      = 1 << (9 - 1);
        /// Driver problem (error latched).
        const PROBLEM      = 1 << (10 - 1);
        /// Axis is moving.
        const MOVING       = 1 << (11 - 1);
        /// Closed loop gain supported.
        const GAIN_SUPPORT = 1 << (12 - 1);
        /// Communication error.
        const COMM_ERR     = 1 << (13 - 1);
        /// Minus (low) limit switch active.
        const MINUS_LS     = 1 << (14 - 1);
        /// Axis has been homed.
        const HOMED        = 1 << (15 - 1);
    }
}

impl Default for StatusWord {
    fn default() -> Self {
        Self::empty()
    }
}

/// Controller firmware family, selects the meaning of bit 7.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FirmwareVariant {
    /// Bit 7 reports slip/stall.
    #[default]
    SlipStall,
    /// Bit 7 reports following error.
    FollowingError,
}

/// Named flag of the status word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StatusFlag {
    Homed,
    MinusLimit,
    CommError,
    GainSupport,
    Moving,
    Problem,
    EncoderPresent,
    HomeSwitch,
    SlipStall,
    FollowingError,
    AmpOn,
    HomeLimit,
    PlusLimit,
    Done,
    Direction,
}

impl StatusFlag {
    /// All named flags, highest bit first.
    pub const ALL: [Self; 15] = [
        Self::Homed,
        Self::MinusLimit,
        Self::CommError,
        Self::GainSupport,
        Self::Moving,
        Self::Problem,
        Self::EncoderPresent,
        Self::HomeSwitch,
        Self::SlipStall,
        Self::FollowingError,
        Self::AmpOn,
        Self::HomeLimit,
        Self::PlusLimit,
        Self::Done,
        Self::Direction,
    ];

    /// 1-indexed bit position as documented by the firmware.
    pub const fn bit(&self) -> u32 {
        match self {
            Self::Homed => 15,
            Self::MinusLimit => 14,
            Self::CommError => 13,
            Self::GainSupport => 12,
            Self::Moving => 11,
            Self::Problem => 10,
            Self::EncoderPresent => 9,
            Self::HomeSwitch => 8,
            Self::SlipStall | Self::FollowingError => 7,
            Self::AmpOn => 6,
            Self::HomeLimit => 4,
            Self::PlusLimit => 3,
            Self::Done => 2,
            Self::Direction => 1,
        }
    }

    /// Mask of this flag in the raw word.
    #[inline]
    pub const fn mask(&self) -> StatusWord {
        StatusWord::from_bits_retain(1 << (self.bit() - 1))
    }

    /// Whether this flag is a meaningful view under `variant`.
    #[inline]
    pub const fn applies_to(&self, variant: FirmwareVariant) -> bool {
        match self {
            Self::SlipStall => matches!(variant, FirmwareVariant::SlipStall),
            Self::FollowingError => matches!(variant, FirmwareVariant::FollowingError),
            _ => true,
        }
    }
}

/// Status word decoded into named booleans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DecodedStatus {
    pub homed: bool,
    pub minus_limit: bool,
    pub comm_error: bool,
    pub gain_support: bool,
    pub moving: bool,
    pub problem: bool,
    pub encoder_present: bool,
    pub home_switch: bool,
    /// Bit 7 under slip/stall firmware, otherwise `false`.
    pub slip_stall: bool,
    /// Bit 7 under following-error firmware, otherwise `false`.
    pub following_error: bool,
    pub amp_on: bool,
    pub home_limit: bool,
    pub plus_limit: bool,
    pub done: bool,
    pub direction: bool,
}

impl DecodedStatus {
    /// Value of a single named flag.
    pub const fn get(&self, flag: StatusFlag) -> bool {
        match flag {
            StatusFlag::Homed => self.homed,
            StatusFlag::MinusLimit => self.minus_limit,
            StatusFlag::CommError => self.comm_error,
            StatusFlag::GainSupport => self.gain_support,
            StatusFlag::Moving => self.moving,
            StatusFlag::Problem => self.problem,
            StatusFlag::EncoderPresent => self.encoder_present,
            StatusFlag::HomeSwitch => self.home_switch,
            StatusFlag::SlipStall => self.slip_stall,
            StatusFlag::FollowingError => self.following_error,
            StatusFlag::AmpOn => self.amp_on,
            StatusFlag::HomeLimit => self.home_limit,
            StatusFlag::PlusLimit => self.plus_limit,
            StatusFlag::Done => self.done,
            StatusFlag::Direction => self.direction,
        }
    }

    /// Iterate `(flag, value)` pairs in bit order, highest first.
    pub fn iter(&self) -> impl Iterator<Item = (StatusFlag, bool)> + '_ {
        StatusFlag::ALL.iter().map(move |f| (*f, self.get(*f)))
    }
}

impl StatusWord {
    /// Build a status word from a channel value.
    ///
    /// Channel values are transported as floating point; negative and NaN
    /// values map to an empty word.
    #[inline]
    pub fn from_value(value: f64) -> Self {
        Self::from_bits_retain(value as u32)
    }

    /// Raw value including unknown bits.
    #[inline]
    pub const fn raw(&self) -> u32 {
        self.bits()
    }

    /// Value of one named flag under `variant`.
    #[inline]
    pub const fn flag(&self, flag: StatusFlag, variant: FirmwareVariant) -> bool {
        flag.applies_to(variant) && self.bits() & flag.mask().bits() != 0
    }

    /// Decode every named flag. Pure and total: each flag depends only on its
    /// own bit, unknown bits are ignored.
    pub const fn decode(&self, variant: FirmwareVariant) -> DecodedStatus {
        DecodedStatus {
            homed: self.flag(StatusFlag::Homed, variant),
            minus_limit: self.flag(StatusFlag::MinusLimit, variant),
            comm_error: self.flag(StatusFlag::CommError, variant),
            gain_support: self.flag(StatusFlag::GainSupport, variant),
            moving: self.flag(StatusFlag::Moving, variant),
            problem: self.flag(StatusFlag::Problem, variant),
            encoder_present: self.flag(StatusFlag::EncoderPresent, variant),
            home_switch: self.flag(StatusFlag::HomeSwitch, variant),
            slip_stall: self.flag(StatusFlag::SlipStall, variant),
            following_error: self.flag(StatusFlag::FollowingError, variant),
            amp_on: self.flag(StatusFlag::AmpOn, variant),
            home_limit: self.flag(StatusFlag::HomeLimit, variant),
            plus_limit: self.flag(StatusFlag::PlusLimit, variant),
            done: self.flag(StatusFlag::Done, variant),
            direction: self.flag(StatusFlag::Direction, variant),
        }
    }

    /// Bit 7 fault under `variant` (slip/stall or following error).
    #[inline]
    pub const fn drive_fault(&self, variant: FirmwareVariant) -> bool {
        match variant {
            FirmwareVariant::SlipStall => self.flag(StatusFlag::SlipStall, variant),
            FirmwareVariant::FollowingError => self.flag(StatusFlag::FollowingError, variant),
        }
    }

    #[inline]
    pub const fn is_homed(&self) -> bool {
        self.contains(Self::HOMED)
    }

    #[inline]
    pub const fn plus_limit(&self) -> bool {
        self.contains(Self::PLUS_LS)
    }

    #[inline]
    pub const fn minus_limit(&self) -> bool {
        self.contains(Self::MINUS_LS)
    }

    #[inline]
    pub const fn problem(&self) -> bool {
        self.contains(Self::PROBLEM)
    }

    #[inline]
    pub const fn moving(&self) -> bool {
        self.contains(Self::MOVING)
    }

    /// Render a fixed-width summary for side-by-side log lines.
    pub fn render(&self, variant: FirmwareVariant) -> String {
        self.display(variant).to_string()
    }

    /// Lazy [`fmt::Display`] adapter, avoids allocating in `tracing` fields.
    pub const fn display(&self, variant: FirmwareVariant) -> StatusText {
        StatusText {
            word: *self,
            variant,
        }
    }
}

/// Display adapter returned by [`StatusWord::display`].
#[derive(Debug, Clone, Copy)]
pub struct StatusText {
    word: StatusWord,
    variant: FirmwareVariant,
}

impl fmt::Display for StatusText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fault_label = match self.variant {
            FirmwareVariant::SlipStall => "Slip",
            FirmwareVariant::FollowingError => "Foll",
        };
        let slots: [(bool, &str); 11] = [
            (self.word.contains(StatusWord::HOMED), "Hd"),
            (self.word.contains(StatusWord::MINUS_LS), "LLS"),
            (self.word.contains(StatusWord::MOVING), "Mov"),
            (self.word.contains(StatusWord::PROBLEM), "P"),
            (self.word.contains(StatusWord::PRESENT), "Enc"),
            (self.word.contains(StatusWord::HOME), "Ho"),
            (self.word.drive_fault(self.variant), fault_label),
            (self.word.contains(StatusWord::AMPON), "Amp"),
            (self.word.contains(StatusWord::HOMELS), "Hsw"),
            (self.word.contains(StatusWord::PLUS_LS), "HLS"),
            (self.word.contains(StatusWord::DONE), "Don"),
        ];
        for (set, label) in slots {
            if set {
                f.write_str(label)?;
            } else {
                for _ in 0..label.len() {
                    f.write_str(".")?;
                }
            }
        }
        Ok(())
    }
}
