//! HTTP request handlers, one module per resource.

pub mod health;
pub mod images;
pub mod sync;

use crate::errors::{AppError, AppResult};
use crate::models::{is_valid_address, normalize_address};

/// Parses a positive decimal chain id from a path segment.
pub fn parse_chain_id(raw: &str) -> AppResult<u64> {
    match raw.trim().parse::<u64>() {
        Ok(chain_id) if chain_id > 0 => Ok(chain_id),
        _ => Err(AppError::validation(format!("Invalid chain id: {raw}"))),
    }
}

/// Validates a `0x`-prefixed 20-byte hex address and lowercases it.
pub fn parse_address(raw: &str) -> AppResult<String> {
    if is_valid_address(raw) {
        Ok(normalize_address(raw))
    } else {
        Err(AppError::validation(format!("Invalid token address: {raw}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("1", Some(1))]
    #[case("42161", Some(42161))]
    #[case("0", None)]
    #[case("-5", None)]
    #[case("eth", None)]
    #[case("", None)]
    fn test_parse_chain_id(#[case] raw: &str, #[case] expected: Option<u64>) {
        assert_eq!(parse_chain_id(raw).ok(), expected);
    }

    #[test]
    fn test_parse_address_lowercases() {
        assert_eq!(
            parse_address("0xA0B86991C6218B36C1D19D4A2E9EB0CE3606EB48").unwrap(),
            "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48"
        );
        assert!(parse_address("0x1234").is_err());
    }
}
