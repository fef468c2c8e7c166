//! Hex address parsing and formatting utilities.

use anyhow::Result;

/// Parse a hex address string (with or without 0x prefix, `_` separators allowed).
pub fn parse_hex_address(s: &str) -> Result<u64> {
    let s = s.trim_start_matches("0x").trim_start_matches("0X").replace('_', "");
    u64::from_str_radix(&s, 16).map_err(|e| anyhow::anyhow!("Invalid hex address: {}", e))
}

/// Parse a 32-bit console address such as `8033B21A`.
pub fn parse_console_address(s: &str) -> Result<u32> {
    let address = parse_hex_address(s)?;
    u32::try_from(address).map_err(|_| anyhow::anyhow!("Console address {} exceeds 32 bits", s))
}

pub fn format_console_address(address: u32) -> String {
    if address == 0 {
        "unset".to_string()
    } else {
        format!("0x{:08X}", address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_address_with_prefix() {
        assert_eq!(parse_hex_address("0x1000").unwrap(), 0x1000);
        assert_eq!(parse_hex_address("0X1000").unwrap(), 0x1000);
        assert_eq!(parse_hex_address("0x7f3a_2000_1000").unwrap(), 0x7f3a_2000_1000);
    }

    #[test]
    fn test_parse_hex_address_without_prefix() {
        assert_eq!(parse_hex_address("1000").unwrap(), 0x1000);
        assert_eq!(parse_hex_address("DEADBEEF").unwrap(), 0xDEADBEEF);
    }

    #[test]
    fn test_parse_hex_address_invalid() {
        assert!(parse_hex_address("GHIJK").is_err());
        assert!(parse_hex_address("0xZZZ").is_err());
    }

    #[test]
    fn test_parse_console_address() {
        assert_eq!(parse_console_address("8033B21A").unwrap(), 0x8033_B21A);
        assert!(parse_console_address("0x1_0000_0000").is_err());
    }

    #[test]
    fn test_format_console_address() {
        assert_eq!(format_console_address(0x8033_B21A), "0x8033B21A");
        assert_eq!(format_console_address(0), "unset");
    }
}
