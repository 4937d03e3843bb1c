use serde::{Deserialize, Serialize};
use std::fmt;

/// An on-chain asset identified by chain id and contract address.
///
/// The address is always stored lowercased so that differently cased inputs
/// map to the same identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Token {
    pub chain_id: u64,
    pub address: String,
}

impl Token {
    pub fn new(chain_id: u64, address: impl AsRef<str>) -> Self {
        Self {
            chain_id,
            address: normalize_address(address.as_ref()),
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.chain_id, self.address)
    }
}

pub fn normalize_address(address: &str) -> String {
    address.trim().to_ascii_lowercase()
}

/// `0x` followed by exactly 40 hex digits, in any case.
pub fn is_valid_address(address: &str) -> bool {
    let Some(hex_part) = address
        .strip_prefix("0x")
        .or_else(|| address.strip_prefix("0X"))
    else {
        return false;
    };
    hex_part.len() == 40 && hex_part.chars().all(|c| c.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_token_identity_ignores_case() {
        let upper = Token::new(1, "0xA0B86991C6218B36C1D19D4A2E9EB0CE3606EB48");
        let lower = Token::new(1, "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48");
        assert_eq!(upper, lower);
        assert_eq!(upper.to_string(), "1:0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48");
    }

    #[rstest]
    #[case("0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48", true)]
    #[case("0xA0b86991c6218b36c1d19d4a2e9eb0ce3606eB48", true)]
    #[case("a0b86991c6218b36c1d19d4a2e9eb0ce3606eb48", false)]
    #[case("0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb4", false)]
    #[case("0xzzb86991c6218b36c1d19d4a2e9eb0ce3606eb48", false)]
    #[case("", false)]
    fn test_address_validation(#[case] address: &str, #[case] expected: bool) {
        assert_eq!(is_valid_address(address), expected);
    }
}
