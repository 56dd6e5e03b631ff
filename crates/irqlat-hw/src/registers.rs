//! Register map and control word encoding of the IRQ generator.

use core::fmt;

/// Offset of the generator's register block inside its BAR.
pub const REGISTER_BASE: usize = 0x80;

/// Value of the magic register on a genuine generator.
pub const DEVICE_MAGIC: u32 = 0xBADC_AFEE;

/// Interrupt source bit the generator raises.
pub const GENERATOR_IRQ_BIT: u32 = 1 << 1;

/// Bits of the control register holding the frequency divider.
pub const DIVIDER_MASK: u32 = 0x00FF_FFFF;

/// Control register bit that starts generation.
pub const START_BIT: u32 = 1 << 31;

/// Generator registers, addressed relative to [`REGISTER_BASE`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Register {
    /// Start/stop bit and frequency divider.
    Control,
    /// Debug toggle counter.
    Toggle,
    /// Identity constant.
    Magic,
    /// Counter frequency in Hz.
    ClockFrequency,
    /// Counter value latched when the last IRQ was generated.
    StartTime,
    /// Live counter value.
    NowTime,
    /// Number of IRQs generated since start.
    Count,
}

impl Register {
    /// All registers in offset order.
    pub const ALL: [Register; 7] = [
        Register::Control,
        Register::Toggle,
        Register::Magic,
        Register::ClockFrequency,
        Register::StartTime,
        Register::NowTime,
        Register::Count,
    ];

    /// Offset relative to [`REGISTER_BASE`].
    #[must_use]
    pub const fn offset(self) -> usize {
        match self {
            Register::Control => 0x00,
            Register::Toggle => 0x08,
            Register::Magic => 0x0c,
            Register::ClockFrequency => 0x10,
            Register::StartTime => 0x14,
            Register::NowTime => 0x18,
            Register::Count => 0x1c,
        }
    }

    /// Offset from the start of the BAR.
    #[must_use]
    pub const fn bar_offset(self) -> usize {
        REGISTER_BASE + self.offset()
    }

    /// Only the control register accepts writes.
    #[must_use]
    pub const fn is_writable(self) -> bool {
        matches!(self, Register::Control)
    }

    /// Get the register name as a string slice.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Register::Control => "control",
            Register::Toggle => "toggle",
            Register::Magic => "magic",
            Register::ClockFrequency => "clock_frequency",
            Register::StartTime => "start_time",
            Register::NowTime => "now_time",
            Register::Count => "count",
        }
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decoded control register.
///
/// Bit 31 starts (1) or stops (0) generation; bits 23:0 hold the divider of
/// the counter clock that yields the IRQ period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ControlWord {
    /// Generation enabled.
    pub running: bool,
    /// Clock divider, at most [`DIVIDER_MASK`].
    pub divider: u32,
}

impl ControlWord {
    /// The stop value: generation off, divider cleared.
    pub const STOP: ControlWord = ControlWord {
        running: false,
        divider: 0,
    };

    /// Start generation with `divider`.
    ///
    /// Returns `None` if the divider is zero or does not fit the 24-bit field.
    #[must_use]
    pub const fn start(divider: u32) -> Option<Self> {
        if divider == 0 || divider > DIVIDER_MASK {
            return None;
        }
        Some(Self {
            running: true,
            divider,
        })
    }

    /// Pack into the raw register value.
    #[must_use]
    pub const fn encode(self) -> u32 {
        let start = if self.running { START_BIT } else { 0 };
        start | (self.divider & DIVIDER_MASK)
    }

    /// Unpack a raw register value. Reserved bits 30:24 are ignored.
    #[must_use]
    pub const fn decode(raw: u32) -> Self {
        Self {
            running: raw & START_BIT != 0,
            divider: raw & DIVIDER_MASK,
        }
    }
}

impl fmt::Display for ControlWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (divider {})",
            if self.running { "start" } else { "stop" },
            self.divider
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_offsets_match_register_map() {
        assert_eq!(Register::Control.bar_offset(), 0x80);
        assert_eq!(Register::Magic.bar_offset(), 0x8c);
        assert_eq!(Register::ClockFrequency.bar_offset(), 0x90);
        assert_eq!(Register::StartTime.bar_offset(), 0x94);
        assert_eq!(Register::NowTime.bar_offset(), 0x98);
        assert_eq!(Register::Count.bar_offset(), 0x9c);
    }

    #[test]
    fn test_only_control_is_writable() {
        for reg in Register::ALL {
            assert_eq!(reg.is_writable(), reg == Register::Control, "{reg}");
        }
    }

    #[test]
    fn test_start_word_layout() {
        let word = ControlWord::start(100_000);
        assert_eq!(word.map(ControlWord::encode), Some(0x8001_86A0));
    }

    #[test]
    fn test_stop_word_is_zero() {
        assert_eq!(ControlWord::STOP.encode(), 0);
    }

    #[test]
    fn test_start_rejects_unrepresentable_dividers() {
        assert_eq!(ControlWord::start(0), None);
        assert_eq!(ControlWord::start(DIVIDER_MASK + 1), None);
        assert!(ControlWord::start(DIVIDER_MASK).is_some());
    }

    #[test]
    fn test_decode_ignores_reserved_bits() {
        let word = ControlWord::decode(0xFF00_0010);
        assert!(word.running);
        assert_eq!(word.divider, 0x10);
    }

    proptest! {
        #[test]
        fn prop_start_word_decodes_to_itself(divider in 1u32..=DIVIDER_MASK) {
            let word = ControlWord::start(divider);
            prop_assert_eq!(word.map(|w| ControlWord::decode(w.encode())), word);
        }

        #[test]
        fn prop_encode_never_sets_reserved_bits(raw in any::<u32>()) {
            let encoded = ControlWord::decode(raw).encode();
            prop_assert_eq!(encoded & 0x7F00_0000, 0);
        }
    }
}
