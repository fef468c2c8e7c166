//! Byte signatures with `??` wildcards, as used in configuration and on the
//! command line.

use crate::error::{Error, Result};

/// Parse `"3C 1A ?? 00"` into bytes, `None` for wildcard positions.
pub fn parse_pattern(pattern: &str) -> Result<Vec<Option<u8>>> {
    let mut bytes = Vec::new();
    for token in pattern.split_whitespace() {
        if token == "??" || token == "?" {
            bytes.push(None);
            continue;
        }

        let value = u8::from_str_radix(token, 16).map_err(|e| {
            Error::InvalidPattern(format!("Invalid signature token '{}': {}", token, e))
        })?;
        bytes.push(Some(value));
    }

    if bytes.is_empty() {
        return Err(Error::InvalidPattern("Signature pattern is empty".to_string()));
    }

    Ok(bytes)
}

pub fn format_pattern(bytes: &[Option<u8>]) -> String {
    bytes
        .iter()
        .map(|b| match b {
            Some(value) => format!("{:02X}", value),
            None => "??".to_string(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Exact-byte form of a signature, if it has no wildcards.
pub fn exact_bytes(signature: &[Option<u8>]) -> Option<Vec<u8>> {
    signature.iter().copied().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pattern_with_wildcards() {
        let bytes = parse_pattern("3C 1A ?? 00").unwrap();
        assert_eq!(bytes, vec![Some(0x3C), Some(0x1A), None, Some(0x00)]);
    }

    #[test]
    fn test_parse_pattern_rejects_garbage() {
        assert!(matches!(
            parse_pattern("3C ZZ"),
            Err(Error::InvalidPattern(_))
        ));
        assert!(matches!(parse_pattern("   "), Err(Error::InvalidPattern(_))));
    }

    #[test]
    fn test_format_pattern() {
        assert_eq!(
            format_pattern(&[Some(0x3C), None, Some(0xFF)]),
            "3C ?? FF"
        );
    }

    #[test]
    fn test_exact_bytes() {
        assert_eq!(exact_bytes(&[Some(1), Some(2)]), Some(vec![1, 2]));
        assert_eq!(exact_bytes(&[Some(1), None]), None);
    }
}
