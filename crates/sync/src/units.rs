//! Minor-unit (wei) to major-unit (ETH) conversion.

use rust_decimal::Decimal;

use ethwatch_common::error::AppError;

/// Number of decimal places in the native token: 1 ETH = 10^18 wei.
pub const ETH_SCALE: u32 = 18;

/// Convert an integer wei string (as returned by the explorer) into a
/// fixed-point ETH amount. Values beyond Decimal's 96-bit mantissa are a
/// provider error, not a panic.
pub fn wei_to_eth(wei: &str) -> Result<Decimal, AppError> {
    let raw: i128 = wei
        .trim()
        .parse()
        .map_err(|_| AppError::Provider(format!("Invalid wei amount from provider: {:?}", wei)))?;

    Decimal::try_from_i128_with_scale(raw, ETH_SCALE)
        .map_err(|_| AppError::Provider(format!("Wei amount out of range: {:?}", wei)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_one_eth() {
        assert_eq!(wei_to_eth("1000000000000000000").unwrap(), dec!(1));
    }

    #[test]
    fn test_fractional_eth() {
        assert_eq!(wei_to_eth("1500000000000000000").unwrap(), dec!(1.5));
        assert_eq!(wei_to_eth("1000000000000000").unwrap(), dec!(0.001));
    }

    #[test]
    fn test_zero() {
        assert_eq!(wei_to_eth("0").unwrap(), dec!(0));
    }

    #[test]
    fn test_full_precision_retained() {
        // Every one of the 18 fractional digits survives the conversion.
        assert_eq!(
            wei_to_eth("1000000000000000001").unwrap().to_string(),
            "1.000000000000000001"
        );
    }

    #[test]
    fn test_large_balance() {
        assert_eq!(
            wei_to_eth("40891626854930000000000").unwrap(),
            dec!(40891.62685493)
        );
    }

    #[test]
    fn test_oversized_wei_is_error() {
        // Parses as i128 but exceeds Decimal's 96-bit mantissa.
        assert!(wei_to_eth("100000000000000000000000000000").is_err());
        assert!(wei_to_eth(&i128::MAX.to_string()).is_err());
        assert!(wei_to_eth(&i128::MIN.to_string()).is_err());
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(wei_to_eth("").is_err());
        assert!(wei_to_eth("12.5").is_err());
        assert!(wei_to_eth("0x10").is_err());
        assert!(wei_to_eth("not-a-number").is_err());
    }
}
