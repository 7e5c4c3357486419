//! Property tests for status word decoding.
//!
//! Every named flag must depend on its own bit only, for every 16-bit word
//! and both firmware variants.

use proptest::prelude::*;
use smt_common::status::{FirmwareVariant, StatusFlag, StatusWord};

fn variant() -> impl Strategy<Value = FirmwareVariant> {
    prop_oneof![
        Just(FirmwareVariant::SlipStall),
        Just(FirmwareVariant::FollowingError),
    ]
}

proptest! {
    #[test]
    fn flag_matches_own_bit(raw in any::<u16>(), variant in variant()) {
        let decoded = StatusWord::from_bits_retain(u32::from(raw)).decode(variant);
        for flag in StatusFlag::ALL {
            let bit_set = u32::from(raw) & (1 << (flag.bit() - 1)) != 0;
            prop_assert_eq!(decoded.get(flag), bit_set && flag.applies_to(variant));
        }
    }

    #[test]
    fn toggling_one_bit_changes_only_its_flags(raw in any::<u16>(), bit in 0u32..16, variant in variant()) {
        let before = StatusWord::from_bits_retain(u32::from(raw)).decode(variant);
        let after = StatusWord::from_bits_retain(u32::from(raw) ^ (1 << bit)).decode(variant);
        for flag in StatusFlag::ALL {
            if flag.bit() - 1 != bit {
                prop_assert_eq!(before.get(flag), after.get(flag));
            }
        }
    }

    #[test]
    fn render_width_is_constant(raw in any::<u16>(), variant in variant()) {
        let text = StatusWord::from_bits_retain(u32::from(raw)).render(variant);
        prop_assert_eq!(text.len(), 30);
    }
}
