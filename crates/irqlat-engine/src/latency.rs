//! Wraparound-safe latency arithmetic.
//!
//! Both timestamps are samples of the generator's free-running 32-bit counter.
//! The counter may wrap between the latch and the service read, so the raw
//! tick delta is taken modulo [`COUNTER_MODULUS`]. Conversion to microseconds
//! is done in 64 bits and truncates.

use std::num::NonZeroU32;

/// Width of the histogram in microseconds. Samples at or above this are
/// missed deadlines.
pub const LAT_MAX_US: usize = 1_000_000;

/// Modulus of the hardware counter.
pub const COUNTER_MODULUS: u64 = 1 << 32;

const MICROS_PER_SEC: u64 = 1_000_000;

/// Ticks elapsed from `start` to `now`, correcting for one counter wrap.
///
/// ```rust
/// use irqlat_engine::raw_delta;
///
/// assert_eq!(raw_delta(100, 250), 150);
/// assert_eq!(raw_delta(u32::MAX - 10, 5), 16);
/// ```
#[must_use]
pub fn raw_delta(start: u32, now: u32) -> u64 {
    let (start, now) = (u64::from(start), u64::from(now));
    if now < start {
        COUNTER_MODULUS - start + now
    } else {
        now - start
    }
}

/// Convert a tick count at `fclk` Hz to whole microseconds.
#[must_use]
pub fn ticks_to_us(ticks: u64, fclk: NonZeroU32) -> u64 {
    // ticks < 2^32, so the product stays below 2^52.
    ticks.saturating_mul(MICROS_PER_SEC) / u64::from(fclk.get())
}

/// Latency in microseconds between a latched `start` and a serviced `now`.
#[must_use]
pub fn latency_us(start: u32, now: u32, fclk: NonZeroU32) -> u64 {
    ticks_to_us(raw_delta(start, now), fclk)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn hz(v: u32) -> NonZeroU32 {
        NonZeroU32::new(v).unwrap_or(NonZeroU32::MIN)
    }

    #[test]
    fn test_latency_at_100_mhz() {
        assert_eq!(latency_us(0, 50_000, hz(100_000_000)), 500);
    }

    #[test]
    fn test_wraparound_delta() {
        assert_eq!(raw_delta(u32::MAX - 10, 5), 16);
        assert_eq!(raw_delta(u32::MAX, 0), 1);
        assert_eq!(raw_delta(5, 5), 0);
    }

    #[test]
    fn test_conversion_truncates() {
        // 149 ticks at 100 MHz is 1.49 us.
        assert_eq!(latency_us(0, 149, hz(100_000_000)), 1);
        assert_eq!(latency_us(0, 99, hz(100_000_000)), 0);
    }

    #[test]
    fn test_full_range_does_not_overflow() {
        assert_eq!(
            latency_us(1, 0, hz(1)),
            (COUNTER_MODULUS - 1) * MICROS_PER_SEC
        );
    }

    proptest! {
        #[test]
        fn prop_delta_is_modular_difference(start: u32, now: u32) {
            prop_assert_eq!(raw_delta(start, now), u64::from(now.wrapping_sub(start)));
        }

        #[test]
        fn prop_delta_below_modulus(start: u32, now: u32) {
            prop_assert!(raw_delta(start, now) < COUNTER_MODULUS);
        }

        #[test]
        fn prop_conversion_is_monotonic(
            a in 0u64..COUNTER_MODULUS,
            b in 0u64..COUNTER_MODULUS,
            f in 1u32..,
        ) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(ticks_to_us(lo, hz(f)) <= ticks_to_us(hi, hz(f)));
        }
    }
}
