//! Ethereum address validation and normalization.
//!
//! The canonical form is `0x` followed by 40 hex characters, lowercased.
//! Every entry point that accepts an address (forms, API paths, explorer
//! payloads) goes through [`normalize`] so lookups are case-insensitive.

use crate::error::AppError;

/// Validate and canonicalize an Ethereum address.
///
/// Accepts any casing, returns the lowercase form, or a `Validation` error
/// when the input is not `0x` + 40 hex characters.
pub fn normalize(input: &str) -> Result<String, AppError> {
    let trimmed = input.trim();
    let hex = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .ok_or_else(invalid)?;

    if hex.len() != 40 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(invalid());
    }

    Ok(format!("0x{}", hex.to_ascii_lowercase()))
}

/// Shortened display form: the `0x` prefix plus the first 8 hex characters.
pub fn short(address: &str) -> String {
    if address.len() > 10 {
        format!("{}...", &address[..10])
    } else {
        address.to_string()
    }
}

fn invalid() -> AppError {
    AppError::Validation("Invalid Ethereum address format".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lowercase_passthrough() {
        let addr = "0xde0b295669a9fd93d5f28d9ec85e40f4cb697bae";
        assert_eq!(normalize(addr).unwrap(), addr);
    }

    #[test]
    fn test_uppercase_normalized() {
        let upper = "0xDE0B295669A9FD93D5F28D9EC85E40F4CB697BAE";
        let mixed = "0xDe0B295669a9fd93D5f28D9Ec85E40f4cb697BaE";
        let expected = "0xde0b295669a9fd93d5f28d9ec85e40f4cb697bae";
        assert_eq!(normalize(upper).unwrap(), expected);
        assert_eq!(normalize(mixed).unwrap(), expected);
    }

    #[test]
    fn test_surrounding_whitespace_trimmed() {
        let addr = "  0xde0b295669a9fd93d5f28d9ec85e40f4cb697bae\n";
        assert_eq!(
            normalize(addr).unwrap(),
            "0xde0b295669a9fd93d5f28d9ec85e40f4cb697bae"
        );
    }

    #[test]
    fn test_missing_prefix_rejected() {
        assert!(normalize("de0b295669a9fd93d5f28d9ec85e40f4cb697bae").is_err());
    }

    #[test]
    fn test_wrong_length_rejected() {
        assert!(normalize("0xde0b").is_err());
        assert!(normalize("0xde0b295669a9fd93d5f28d9ec85e40f4cb697bae00").is_err());
    }

    #[test]
    fn test_non_hex_rejected() {
        assert!(normalize("0xzz0b295669a9fd93d5f28d9ec85e40f4cb697bae").is_err());
        assert!(normalize("not an address").is_err());
        assert!(normalize("").is_err());
    }

    #[test]
    fn test_short_form() {
        assert_eq!(
            short("0xde0b295669a9fd93d5f28d9ec85e40f4cb697bae"),
            "0xde0b2956..."
        );
        assert_eq!(short("0xde0b"), "0xde0b");
    }
}
