//! Numeric argument parsers accepting decimal or `0x` hexadecimal.

/// Parse an unsigned integer written in decimal or with a `0x` prefix.
pub fn parse_u64(s: &str) -> Result<u64, String> {
    let (digits, radix) = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => (hex, 16),
        None => (s, 10),
    };
    u64::from_str_radix(digits, radix).map_err(|e| format!("`{s}` is not a number: {e}"))
}

/// Parse a positive frequency in Hz.
pub fn parse_frequency(s: &str) -> Result<u32, String> {
    match u32::try_from(parse_u64(s)?) {
        Ok(0) => Err("frequency must be greater than zero".to_owned()),
        Ok(hz) => Ok(hz),
        Err(e) => Err(format!("`{s}` is out of range: {e}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_decimal_and_hex() {
        assert_eq!(parse_u64("1000"), Ok(1000));
        assert_eq!(parse_u64("0x3e8"), Ok(1000));
        assert_eq!(parse_u64("0X3E8"), Ok(1000));
        assert_eq!(parse_u64("0"), Ok(0));
    }

    #[test]
    fn rejects_malformed_numbers() {
        assert!(parse_u64("").is_err());
        assert!(parse_u64("0x").is_err());
        assert!(parse_u64("12abc").is_err());
        assert!(parse_u64("-1").is_err());
        assert!(parse_u64("0xfg").is_err());
    }

    #[test]
    fn frequency_must_be_positive_and_fit() {
        assert_eq!(parse_frequency("0x10"), Ok(16));
        assert!(parse_frequency("0").is_err());
        assert!(parse_frequency("0x100000000").is_err());
    }
}
