//! Minimal JSON-RPC `eth_call` client for reading address-valued getters.

use std::collections::BTreeMap;

use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use sha3::{Digest, Keccak256};

use crate::config::chain_entry;
use crate::errors::{ProviderError, ProviderResult};

#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: Option<String>,
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

/// Four-byte selector of a Solidity function signature such as `"SY()"`.
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = Keccak256::digest(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// Decodes an ABI-encoded `address` return value.
pub fn decode_address(raw: &str) -> Option<String> {
    let bytes = hex::decode(raw.trim().trim_start_matches("0x")).ok()?;
    if bytes.len() < 32 || bytes[..12].iter().any(|b| *b != 0) {
        return None;
    }
    let address = &bytes[12..32];
    if address.iter().all(|b| *b == 0) {
        return None;
    }
    Some(format!("0x{}", hex::encode(address)))
}

#[derive(Debug, Clone)]
pub struct RpcClient {
    http: Client,
    urls: BTreeMap<String, String>,
}

impl RpcClient {
    pub fn new(http: Client, urls: BTreeMap<String, String>) -> Self {
        Self { http, urls }
    }

    pub fn supports_chain(&self, chain_id: u64) -> bool {
        chain_entry(&self.urls, chain_id).is_some()
    }

    /// Calls a zero-argument getter returning an address. `Ok(None)` when the
    /// chain has no endpoint or the call returns the zero address.
    pub async fn call_address(
        &self,
        chain_id: u64,
        contract: &str,
        signature: &str,
    ) -> ProviderResult<Option<String>> {
        let Some(url) = chain_entry(&self.urls, chain_id) else {
            return Ok(None);
        };

        let request = json!({
            "jsonrpc": "2.0",
            "method": "eth_call",
            "params": [
                { "to": contract, "data": format!("0x{}", hex::encode(selector(signature))) },
                "latest"
            ],
            "id": 1
        });

        let response = self.http.post(url).json(&request).send().await?;
        if !response.status().is_success() {
            return Err(ProviderError::rpc(
                chain_id,
                format!("{signature} on {contract}: HTTP {}", response.status()),
            ));
        }

        let body: RpcResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::rpc(chain_id, format!("malformed response: {e}")))?;

        if let Some(error) = body.error {
            return Err(ProviderError::rpc(
                chain_id,
                format!("{signature} on {contract}: {} ({})", error.message, error.code),
            ));
        }

        let raw = body
            .result
            .ok_or_else(|| ProviderError::rpc(chain_id, "response has no result"))?;
        Ok(decode_address(&raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_matches_known_erc20_signatures() {
        assert_eq!(hex::encode(selector("decimals()")), "313ce567");
        assert_eq!(hex::encode(selector("symbol()")), "95d89b41");
        assert_eq!(hex::encode(selector("name()")), "06fdde03");
    }

    #[test]
    fn test_decode_address() {
        let word = "0x000000000000000000000000c02aaa39b223fe8d0a0e5c4f27ead9083c756cc2";
        assert_eq!(
            decode_address(word).as_deref(),
            Some("0xc02aaa39b223fe8d0a0e5c4f27ead9083c756cc2")
        );
        assert_eq!(decode_address(&format!("0x{}", "0".repeat(64))), None);
        assert_eq!(decode_address("0x"), None);
        assert_eq!(decode_address(&format!("0x{}", "f".repeat(64))), None);
    }
}
