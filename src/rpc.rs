//! Read-only contract calls over JSON-RPC.
//!
//! Thin `eth_call` wrapper exposing the pool and NFT contract reads the
//! aggregators need. Function selectors are computed at runtime from the
//! method signature; return data is decoded word-by-word. No transactions
//! are ever signed or sent from here.

use crate::error::Error;
use alloy_primitives::{hex, keccak256, Address, U256};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Read-only JSON-RPC client for one chain.
#[derive(Clone)]
pub struct RpcClient {
    http: reqwest::Client,
    url: String,
}

#[derive(Deserialize)]
struct RpcResponse {
    result: Option<String>,
    error: Option<RpcErrorBody>,
}

#[derive(Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

impl RpcClient {
    pub fn new(url: &str) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| Error::Config(format!("http client build failed: {e}")))?;
        Ok(Self {
            http,
            url: url.to_string(),
        })
    }

    async fn request(&self, method: &str, params: serde_json::Value) -> Result<String, Error> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });
        let response = self
            .http
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Rpc(format!("{method} request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Rpc(format!("{method} HTTP {status}")));
        }

        let resp: RpcResponse = response
            .json()
            .await
            .map_err(|e| Error::Rpc(format!("{method} parse error: {e}")))?;

        if let Some(err) = resp.error {
            return Err(Error::Rpc(format!(
                "{method} error {}: {}",
                err.code, err.message
            )));
        }
        resp.result
            .ok_or_else(|| Error::Rpc(format!("{method} returned no result")))
    }

    async fn call(&self, to: Address, data: String) -> Result<Vec<u8>, Error> {
        let result = self
            .request(
                "eth_call",
                json!([{ "to": lower_hex(to), "data": data }, "latest"]),
            )
            .await?;
        decode_hex(&result)
    }

    /// Native-asset balance of an address.
    pub async fn balance(&self, address: Address) -> Result<U256, Error> {
        let result = self
            .request("eth_getBalance", json!([lower_hex(address), "latest"]))
            .await?;
        parse_quantity(&result)
    }

    // --- Pool contract reads ---

    pub async fn total_borrowed(&self, pool: Address) -> Result<U256, Error> {
        let out = self.call(pool, encode_call("totalBorrowed()", &[])).await?;
        decode_u256(&out, 0).ok_or_else(|| short_data("totalBorrowed"))
    }

    /// Today's borrow usage and the daily cap, in base units.
    pub async fn daily_borrows(&self, pool: Address) -> Result<(U256, U256), Error> {
        let out = self.call(pool, encode_call("getDailyBorrows()", &[])).await?;
        match (decode_u256(&out, 0), decode_u256(&out, 1)) {
            (Some(used), Some(cap)) => Ok((used, cap)),
            _ => Err(short_data("getDailyBorrows")),
        }
    }

    pub async fn max_nft_price(&self, pool: Address) -> Result<U256, Error> {
        let out = self.call(pool, encode_call("maxPrice()", &[])).await?;
        decode_u256(&out, 0).ok_or_else(|| short_data("maxPrice"))
    }

    pub async fn max_loan_length(&self, pool: Address) -> Result<u64, Error> {
        let out = self.call(pool, encode_call("maxLoanLength()", &[])).await?;
        let length = decode_u256(&out, 0).ok_or_else(|| short_data("maxLoanLength"))?;
        Ok(u64::try_from(length).unwrap_or(u64::MAX))
    }

    /// Minimum raw rate and the variable component on top of it.
    pub async fn interest_range(&self, pool: Address) -> Result<(U256, U256), Error> {
        let out = self.call(pool, encode_call("interestRange()", &[])).await?;
        match (decode_u256(&out, 0), decode_u256(&out, 1)) {
            (Some(min), Some(variable)) => Ok((min, variable)),
            _ => Err(short_data("interestRange")),
        }
    }

    /// Raw per-second rate the pool would charge at `total_received` borrowed.
    pub async fn interest_rate(&self, pool: Address, total_received: U256) -> Result<U256, Error> {
        let out = self
            .call(pool, encode_call("interestRate(uint256)", &[total_received]))
            .await?;
        decode_u256(&out, 0).ok_or_else(|| short_data("interestRate"))
    }

    pub async fn oracle(&self, pool: Address) -> Result<Address, Error> {
        let out = self.call(pool, encode_call("oracle()", &[])).await?;
        decode_address(&out, 0).ok_or_else(|| short_data("oracle"))
    }

    // --- NFT contract reads ---

    /// Collection display name (ERC-721 `name()`).
    pub async fn nft_name(&self, collection: Address) -> Result<String, Error> {
        let out = self.call(collection, encode_call("name()", &[])).await?;
        decode_string(&out)
    }
}

/// Lowercase hex form used in JSON-RPC params and indexer filters.
pub(crate) fn lower_hex(address: Address) -> String {
    format!("0x{}", hex::encode(address))
}

fn short_data(method: &str) -> Error {
    Error::Rpc(format!("{method}: short return data"))
}

// --- ABI helpers ---

/// Calldata for a method: 4-byte selector plus 32-byte-padded uint args.
fn encode_call(signature: &str, args: &[U256]) -> String {
    let selector = keccak256(signature.as_bytes());
    let mut data = format!("0x{}", hex::encode(&selector[..4]));
    for arg in args {
        data.push_str(&hex::encode(arg.to_be_bytes::<32>()));
    }
    data
}

fn decode_hex(s: &str) -> Result<Vec<u8>, Error> {
    let stripped = s.strip_prefix("0x").unwrap_or(s);
    hex::decode(stripped).map_err(|e| Error::Rpc(format!("invalid hex in result: {e}")))
}

fn parse_quantity(s: &str) -> Result<U256, Error> {
    let stripped = s.strip_prefix("0x").unwrap_or(s);
    U256::from_str_radix(stripped, 16)
        .map_err(|e| Error::Rpc(format!("invalid quantity {s:?}: {e}")))
}

fn word(out: &[u8], index: usize) -> Option<&[u8]> {
    out.get(index * 32..index * 32 + 32)
}

fn decode_u256(out: &[u8], index: usize) -> Option<U256> {
    word(out, index).map(U256::from_be_slice)
}

fn decode_address(out: &[u8], index: usize) -> Option<Address> {
    word(out, index).map(|w| Address::from_slice(&w[12..]))
}

/// Decode a single ABI-encoded dynamic string return value.
fn decode_string(out: &[u8]) -> Result<String, Error> {
    let bad = || Error::Rpc("malformed string return data".into());
    let offset = decode_u256(out, 0)
        .and_then(|v| u64::try_from(v).ok())
        .ok_or_else(bad)? as usize;
    let data_start = offset.checked_add(32).ok_or_else(bad)?;
    let length = out
        .get(offset..data_start)
        .map(U256::from_be_slice)
        .and_then(|v| u64::try_from(v).ok())
        .ok_or_else(bad)? as usize;
    let data_end = data_start.checked_add(length).ok_or_else(bad)?;
    let bytes = out.get(data_start..data_end).ok_or_else(bad)?;
    String::from_utf8(bytes.to_vec()).map_err(|_| bad())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_matches_known_erc721_name() {
        // keccak("name()")[..4] is the well-known 0x06fdde03.
        assert_eq!(encode_call("name()", &[]), "0x06fdde03");
    }

    #[test]
    fn test_encode_call_pads_uint_args() {
        let data = encode_call("interestRate(uint256)", &[U256::from(1u64)]);
        assert_eq!(data.len(), 2 + 8 + 64);
        assert!(data.ends_with(
            "0000000000000000000000000000000000000000000000000000000000000001"
        ));
    }

    #[test]
    fn test_decode_u256_words() {
        let mut out = vec![0u8; 64];
        out[31] = 7;
        out[63] = 9;
        assert_eq!(decode_u256(&out, 0), Some(U256::from(7u64)));
        assert_eq!(decode_u256(&out, 1), Some(U256::from(9u64)));
        assert_eq!(decode_u256(&out, 2), None);
    }

    #[test]
    fn test_decode_address_word() {
        let mut out = vec![0u8; 32];
        out[12..].copy_from_slice(&[0x11u8; 20]);
        let address = decode_address(&out, 0).unwrap();
        assert_eq!(address, Address::from_slice(&[0x11u8; 20]));
    }

    #[test]
    fn test_decode_string_round() {
        // offset word (0x20), length word (3), "abc" padded to a word.
        let mut out = vec![0u8; 96];
        out[31] = 0x20;
        out[63] = 3;
        out[64..67].copy_from_slice(b"abc");
        assert_eq!(decode_string(&out).unwrap(), "abc");
    }

    #[test]
    fn test_decode_string_truncated() {
        let mut out = vec![0u8; 64];
        out[31] = 0x20;
        out[63] = 10;
        assert!(decode_string(&out).is_err());
    }

    #[test]
    fn test_parse_quantity() {
        assert_eq!(parse_quantity("0x0").unwrap(), U256::ZERO);
        assert_eq!(parse_quantity("0xff").unwrap(), U256::from(255u64));
        assert!(parse_quantity("0xzz").is_err());
    }

    #[test]
    fn test_lower_hex() {
        let address = Address::from_slice(&[0xABu8; 20]);
        assert_eq!(lower_hex(address), format!("0x{}", "ab".repeat(20)));
    }
}
