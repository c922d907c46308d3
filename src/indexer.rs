//! GraphQL indexer client and typed query records.
//!
//! Each operation uses exactly one query shape; responses deserialize into
//! explicit records per shape, so a missing required field fails the call
//! instead of leaking a default downstream. Address variables are
//! lowercased before querying — the indexer matches case-insensitively and
//! stores lowercase ids.

use crate::error::Error;
use crate::rpc::lower_hex;
use alloy_primitives::{Address, U256};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::json;
use std::time::Duration;
use tracing::warn;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const MAX_RETRIES: u32 = 2;
const RETRY_BASE_MS: u64 = 200;

/// GraphQL client for one chain's indexer endpoint.
#[derive(Clone)]
pub struct IndexerClient {
    http: reqwest::Client,
    url: String,
}

#[derive(Serialize)]
struct GraphqlRequest<'a> {
    query: &'a str,
    variables: serde_json::Value,
}

#[derive(Deserialize)]
struct GraphqlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphqlError>,
}

#[derive(Deserialize)]
struct GraphqlError {
    message: String,
}

fn is_retryable(status: reqwest::StatusCode) -> bool {
    matches!(status.as_u16(), 408 | 429 | 500 | 502 | 503 | 504)
}

impl IndexerClient {
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

    async fn query<T: DeserializeOwned>(
        &self,
        query: &'static str,
        variables: serde_json::Value,
    ) -> Result<T, Error> {
        let mut last_err = None;
        for attempt in 0..=MAX_RETRIES {
            if attempt > 0 {
                let delay = Duration::from_millis(RETRY_BASE_MS * 2u64.pow(attempt - 1));
                tokio::time::sleep(delay).await;
            }

            let request = GraphqlRequest {
                query,
                variables: variables.clone(),
            };
            let response = match self.http.post(&self.url).json(&request).send().await {
                Ok(r) => r,
                Err(e) => {
                    warn!(attempt, error = %e, "indexer request failed (retrying)");
                    last_err = Some(Error::Indexer(format!("request failed: {e}")));
                    continue;
                }
            };

            let status = response.status();
            if !status.is_success() {
                if is_retryable(status) && attempt < MAX_RETRIES {
                    warn!(attempt, status = %status, "indexer transient error (retrying)");
                    last_err = Some(Error::Indexer(format!("HTTP {status}")));
                    continue;
                }
                return Err(Error::Indexer(format!("HTTP {status}")));
            }

            let resp: GraphqlResponse<T> = response
                .json()
                .await
                .map_err(|e| Error::Indexer(format!("response parse error: {e}")))?;

            if let Some(err) = resp.errors.first() {
                return Err(Error::Indexer(format!("query error: {}", err.message)));
            }
            return resp
                .data
                .ok_or_else(|| Error::Indexer("response missing data".into()));
        }
        Err(last_err.unwrap_or_else(|| Error::Indexer("query failed after retries".into())))
    }

    // --- Pools ---

    pub async fn pools(&self) -> Result<Vec<IndexedPool>, Error> {
        let data: PoolsData = self.query(QUERY_POOLS, json!({})).await?;
        Ok(data.pools)
    }

    pub async fn pools_by_owner(&self, owner: Address) -> Result<Vec<IndexedPool>, Error> {
        let data: PoolsData = self
            .query(QUERY_POOLS_BY_OWNER, json!({ "owner": lower_hex(owner) }))
            .await?;
        Ok(data.pools)
    }

    pub async fn pools_by_collection(
        &self,
        collection: Address,
    ) -> Result<Vec<IndexedPool>, Error> {
        let data: PoolsData = self
            .query(
                QUERY_POOLS_BY_COLLECTION,
                json!({ "collection": lower_hex(collection) }),
            )
            .await?;
        Ok(data.pools)
    }

    // --- Loans ---

    pub async fn loans_by_pool(&self, pool: Address) -> Result<Vec<IndexedLoan>, Error> {
        let data: LoansData = self
            .query(QUERY_LOANS_BY_POOL, json!({ "pool": lower_hex(pool) }))
            .await?;
        Ok(data.loans)
    }

    /// Loans still held by their original borrower. A loan transferred away
    /// stops matching its borrower here; that narrowing is intended.
    pub async fn loans_by_user(&self, user: Address) -> Result<Vec<IndexedLoan>, Error> {
        let data: LoansData = self
            .query(QUERY_LOANS_BY_USER, json!({ "user": lower_hex(user) }))
            .await?;
        Ok(data.loans)
    }

    // --- Liquidators ---

    /// Addresses authorized to liquidate a pool's expired loans.
    pub async fn pool_liquidators(&self, pool: Address) -> Result<Vec<Address>, Error> {
        let data: LiquidatorsData = self
            .query(QUERY_POOL_LIQUIDATORS, json!({ "pool": lower_hex(pool) }))
            .await?;
        Ok(data
            .liquidators
            .into_iter()
            .map(|record| record.address)
            .collect())
    }

    /// Pools a liquidator address is authorized for.
    pub async fn pools_by_liquidator(&self, liquidator: Address) -> Result<Vec<Address>, Error> {
        let data: LiquidatorPoolsData = self
            .query(
                QUERY_POOLS_BY_LIQUIDATOR,
                json!({ "address": lower_hex(liquidator) }),
            )
            .await?;
        Ok(data
            .liquidators
            .into_iter()
            .map(|record| record.pool.id)
            .collect())
    }
}

// --- Queries ---

const QUERY_POOLS: &str = "query Pools { \
    pools { id name symbol owner nftCollection ltv maxLoanLength } }";

const QUERY_POOLS_BY_OWNER: &str = "query PoolsByOwner($owner: String!) { \
    pools(where: { owner: $owner }) { id name symbol owner nftCollection ltv maxLoanLength } }";

const QUERY_POOLS_BY_COLLECTION: &str = "query PoolsByCollection($collection: String!) { \
    pools(where: { nftCollection: $collection }) { id name symbol owner nftCollection ltv maxLoanLength } }";

const QUERY_LOANS_BY_POOL: &str = "query LoansByPool($pool: String!) { \
    loans(where: { pool: $pool }) { \
    id nftId borrowed interestRate startTime deadline tokenUri owner \
    pool { id name owner } } }";

const QUERY_LOANS_BY_USER: &str = "query LoansByUser($user: String!) { \
    loans(where: { originalOwner: $user, owner: $user }) { \
    id nftId borrowed interestRate startTime deadline tokenUri owner \
    pool { id name owner } } }";

const QUERY_POOL_LIQUIDATORS: &str = "query PoolLiquidators($pool: String!) { \
    liquidators(where: { pool: $pool }) { address } }";

const QUERY_POOLS_BY_LIQUIDATOR: &str = "query PoolsByLiquidator($address: String!) { \
    liquidators(where: { address: $address }) { pool { id } } }";

// --- Records ---

/// Pool record as stored by the indexer.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexedPool {
    /// Pool contract address (the indexer's entity id).
    pub id: Address,
    pub name: String,
    pub symbol: String,
    pub owner: Address,
    pub nft_collection: Address,
    /// Loan-to-value ratio, percent.
    pub ltv: u64,
    /// Maximum loan duration, seconds.
    #[serde(deserialize_with = "bigint_u64")]
    pub max_loan_length: u64,
}

/// Loan record as stored by the indexer. Amounts and the raw rate arrive
/// as decimal strings (indexer BigInt).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexedLoan {
    pub id: String,
    #[serde(deserialize_with = "bigint")]
    pub nft_id: U256,
    #[serde(deserialize_with = "bigint")]
    pub borrowed: U256,
    #[serde(deserialize_with = "bigint")]
    pub interest_rate: U256,
    /// Seconds since epoch.
    #[serde(deserialize_with = "bigint_u64")]
    pub start_time: u64,
    /// Seconds since epoch.
    #[serde(deserialize_with = "bigint_u64")]
    pub deadline: u64,
    pub token_uri: String,
    pub owner: Address,
    pub pool: IndexedLoanPool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexedLoanPool {
    pub id: Address,
    pub name: String,
    pub owner: Address,
}

#[derive(Deserialize)]
struct PoolsData {
    pools: Vec<IndexedPool>,
}

#[derive(Deserialize)]
struct LoansData {
    loans: Vec<IndexedLoan>,
}

#[derive(Deserialize)]
struct LiquidatorsData {
    liquidators: Vec<LiquidatorRecord>,
}

#[derive(Deserialize)]
struct LiquidatorRecord {
    address: Address,
}

#[derive(Deserialize)]
struct LiquidatorPoolsData {
    liquidators: Vec<LiquidatorPoolRecord>,
}

#[derive(Deserialize)]
struct LiquidatorPoolRecord {
    pool: PoolRef,
}

#[derive(Deserialize)]
struct PoolRef {
    id: Address,
}

fn bigint<'de, D>(deserializer: D) -> Result<U256, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    U256::from_str_radix(&s, 10).map_err(serde::de::Error::custom)
}

fn bigint_u64<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    s.parse().map_err(serde::de::Error::custom)
}
