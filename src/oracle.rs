//! Oracle price fetcher.
//!
//! Reads a collection's reference price from the price API. The price is a
//! point-in-time figure in base units; callers that do not need it skip
//! this client entirely rather than tolerating a zero.

use crate::error::Error;
use crate::rpc::lower_hex;
use alloy_primitives::{Address, U256};
use serde::Deserialize;
use std::time::Duration;
use tracing::warn;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const MAX_RETRIES: u32 = 2;
const RETRY_BASE_MS: u64 = 200;

/// Price API client for one chain.
#[derive(Clone)]
pub struct OracleClient {
    http: reqwest::Client,
    api_url: String,
    is_testnet: bool,
}

#[derive(Deserialize)]
struct PriceResponse {
    /// Base-unit price as a decimal string.
    price: String,
}

fn is_retryable(status: reqwest::StatusCode) -> bool {
    matches!(status.as_u16(), 408 | 429 | 500 | 502 | 503 | 504)
}

impl OracleClient {
    pub fn new(api_url: &str, is_testnet: bool) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| Error::Config(format!("http client build failed: {e}")))?;
        Ok(Self {
            http,
            api_url: api_url.to_string(),
            is_testnet,
        })
    }

    /// Reference price for one NFT of `collection`, in base units.
    pub async fn collection_price(&self, collection: Address) -> Result<U256, Error> {
        let network = if self.is_testnet { "testnet" } else { "mainnet" };
        let url = format!(
            "{}/{}/price/{}",
            self.api_url,
            network,
            lower_hex(collection)
        );

        let mut last_err = None;
        for attempt in 0..=MAX_RETRIES {
            if attempt > 0 {
                let delay = Duration::from_millis(RETRY_BASE_MS * 2u64.pow(attempt - 1));
                tokio::time::sleep(delay).await;
            }

            let response = match self.http.get(&url).send().await {
                Ok(r) => r,
                Err(e) => {
                    warn!(attempt, error = %e, "oracle request failed (retrying)");
                    last_err = Some(Error::Oracle(format!("request failed: {e}")));
                    continue;
                }
            };

            let status = response.status();
            if !status.is_success() {
                if is_retryable(status) && attempt < MAX_RETRIES {
                    warn!(attempt, status = %status, "oracle transient error (retrying)");
                    last_err = Some(Error::Oracle(format!("HTTP {status}")));
                    continue;
                }
                return Err(Error::Oracle(format!("HTTP {status}")));
            }

            let resp: PriceResponse = response
                .json()
                .await
                .map_err(|e| Error::Oracle(format!("response parse error: {e}")))?;

            return U256::from_str_radix(&resp.price, 10)
                .map_err(|e| Error::Oracle(format!("invalid price {:?}: {e}", resp.price)));
        }
        Err(last_err.unwrap_or_else(|| Error::Oracle("price fetch failed after retries".into())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_price_response_parses() {
        let resp: PriceResponse =
            serde_json::from_str(r#"{ "price": "2500000000000000000" }"#).unwrap();
        let price = U256::from_str_radix(&resp.price, 10).unwrap();
        assert_eq!(price, U256::from(2_500_000_000_000_000_000u64));
    }

    #[test]
    fn test_retryable_statuses() {
        assert!(is_retryable(reqwest::StatusCode::SERVICE_UNAVAILABLE));
        assert!(is_retryable(reqwest::StatusCode::TOO_MANY_REQUESTS));
        assert!(!is_retryable(reqwest::StatusCode::NOT_FOUND));
    }
}
