//! Pool aggregation.
//!
//! Fetches the pool list from the indexer, enriches every pool with live
//! on-chain state and admin configuration concurrently, merges, and ranks
//! by instant borrow capacity. One enrichment failure aborts the whole
//! batch; partial results are never returned.

use crate::config::ChainConfig;
use crate::error::Error;
use crate::indexer::{IndexedPool, IndexerClient};
use crate::math;
use crate::models::{AdminInfo, Pool};
use crate::oracle::OracleClient;
use crate::rpc::RpcClient;
use alloy_primitives::{Address, U256};
use tokio::task::JoinSet;
use tracing::{info, warn};

/// Filter for [`list_pools`]. `owner` wins over `collection` when both are
/// set; exactly one indexer query shape is used per call.
#[derive(Debug, Clone, Default)]
pub struct PoolFilter {
    pub collection: Option<Address>,
    pub owner: Option<Address>,
    /// Skip the oracle price fetch; price-derived fields stay absent.
    pub skip_oracle: bool,
}

/// Live on-chain state for one pool.
#[derive(Debug, Clone, Default)]
pub struct LiveState {
    pub collection_name: String,
    pub pool_balance: U256,
    pub total_borrowed: U256,
    pub max_instant_borrow: U256,
    /// Annualized, percent.
    pub interest_rate: f64,
    pub oracle: Address,
    pub oracle_price: Option<U256>,
}

/// List lending pools for a chain, enriched and ranked.
///
/// Returns an empty list without touching the network when `chain_id` is
/// absent. Sorted descending by `max_nfts_to_borrow` (unknown capacity
/// last), ties broken by pool address for a stable order.
pub async fn list_pools(chain_id: Option<u64>, filter: &PoolFilter) -> Result<Vec<Pool>, Error> {
    let Some(chain_id) = chain_id else {
        return Ok(Vec::new());
    };
    let config = ChainConfig::resolve(chain_id)?;
    let indexer = IndexerClient::new(&config.indexer_url)?;
    let rpc = RpcClient::new(&config.rpc_url)?;
    let oracle = OracleClient::new(&config.oracle_api_url, config.is_testnet)?;

    let indexed = if let Some(owner) = filter.owner {
        indexer.pools_by_owner(owner).await?
    } else if let Some(collection) = filter.collection {
        indexer.pools_by_collection(collection).await?
    } else {
        indexer.pools().await?
    };
    info!(chain = chain_id, pools = indexed.len(), "pool list fetched");

    let mut set: JoinSet<Result<(usize, LiveState, AdminInfo), Error>> = JoinSet::new();
    for (index, pool) in indexed.iter().enumerate() {
        let pool = pool.clone();
        let rpc = rpc.clone();
        let indexer = indexer.clone();
        let oracle = oracle.clone();
        let skip_oracle = filter.skip_oracle;
        set.spawn(async move {
            let (live, admin) = tokio::try_join!(
                fetch_live_state(&rpc, &oracle, &pool, skip_oracle),
                fetch_admin_info(&rpc, &indexer, pool.id),
            )?;
            Ok((index, live, admin))
        });
    }

    let mut live_states: Vec<Option<LiveState>> = vec![None; indexed.len()];
    let mut admin_infos: Vec<Option<AdminInfo>> = vec![None; indexed.len()];
    while let Some(joined) = set.join_next().await {
        let (index, live, admin) = joined
            .map_err(|e| Error::Rpc(format!("pool enrichment task failed: {e}")))?
            .map_err(|e| {
                warn!(chain = chain_id, error = %e, "pool enrichment failed");
                e
            })?;
        live_states[index] = Some(live);
        admin_infos[index] = Some(admin);
    }

    let mut pools: Vec<Pool> = indexed
        .into_iter()
        .enumerate()
        .map(|(index, record)| {
            merge_pool(record, live_states[index].take(), admin_infos[index].take())
        })
        .collect();
    sort_pools(&mut pools);

    info!(chain = chain_id, pools = pools.len(), "pool aggregation complete");
    Ok(pools)
}

/// The live half of a pool's enrichment: collection name, balances, the
/// instant-borrow headroom left under the daily cap, and the rate the pool
/// would charge for one more NFT's worth of borrowing.
async fn fetch_live_state(
    rpc: &RpcClient,
    oracle: &OracleClient,
    pool: &IndexedPool,
    skip_oracle: bool,
) -> Result<LiveState, Error> {
    let oracle_price = if skip_oracle {
        None
    } else {
        Some(oracle.collection_price(pool.nft_collection).await?)
    };

    let (collection_name, pool_balance, total_borrowed, (daily_borrows, max_daily_borrows), oracle_address) =
        tokio::try_join!(
            rpc.nft_name(pool.nft_collection),
            rpc.balance(pool.id),
            rpc.total_borrowed(pool.id),
            rpc.daily_borrows(pool.id),
            rpc.oracle(pool.id),
        )?;

    let max_instant_borrow = max_daily_borrows.saturating_sub(daily_borrows);
    let price_per_nft = math::price_per_nft(oracle_price, pool.ltv);
    let raw_rate = rpc
        .interest_rate(pool.id, math::total_received_arg(total_borrowed, price_per_nft))
        .await?;

    Ok(LiveState {
        collection_name,
        pool_balance,
        total_borrowed,
        max_instant_borrow,
        interest_rate: math::annualized_rate(raw_rate),
        oracle: oracle_address,
        oracle_price,
    })
}

/// The admin half: configuration caps, the interest range, and the set of
/// authorized liquidators.
async fn fetch_admin_info(
    rpc: &RpcClient,
    indexer: &IndexerClient,
    pool: Address,
) -> Result<AdminInfo, Error> {
    let (max_nft_price, (daily_borrows, max_daily_borrows), max_loan_length, (min_rate, variable_rate), oracle, liquidators) =
        tokio::try_join!(
            rpc.max_nft_price(pool),
            rpc.daily_borrows(pool),
            rpc.max_loan_length(pool),
            rpc.interest_range(pool),
            rpc.oracle(pool),
            indexer.pool_liquidators(pool),
        )?;

    let min_interest = math::annualized_rate(min_rate);
    Ok(AdminInfo {
        max_nft_price,
        max_instant_borrow: max_daily_borrows.saturating_sub(daily_borrows),
        daily_borrows,
        max_daily_borrows,
        max_loan_length,
        oracle,
        min_interest,
        max_interest: min_interest + math::annualized_rate(variable_rate),
        liquidators,
    })
}

/// Merge the indexer record with its two enrichments. Absent enrichments
/// default to zero balances and an empty admin record, never to a panic.
pub fn merge_pool(record: IndexedPool, live: Option<LiveState>, admin: Option<AdminInfo>) -> Pool {
    let live = live.unwrap_or_default();
    let admin = admin.unwrap_or_default();
    let price_per_nft = math::price_per_nft(live.oracle_price, record.ltv);
    let max_nfts_to_borrow = math::max_nfts_to_borrow(live.max_instant_borrow, price_per_nft);

    Pool {
        address: record.id,
        name: record.name,
        symbol: record.symbol,
        owner: record.owner,
        nft_collection: record.nft_collection,
        collection_name: live.collection_name,
        ltv: record.ltv,
        max_loan_length: record.max_loan_length,
        pool_balance: live.pool_balance,
        total_borrowed: live.total_borrowed,
        total_deposited: live.pool_balance.saturating_add(live.total_borrowed),
        interest_rate: live.interest_rate,
        oracle: live.oracle,
        oracle_price: live.oracle_price,
        price_per_nft,
        max_nfts_to_borrow,
        max_instant_borrow: live.max_instant_borrow,
        admin,
    }
}

/// Descending borrow capacity, unknown capacity last, address as the
/// deterministic tie-break.
pub fn sort_pools(pools: &mut [Pool]) {
    pools.sort_by(|a, b| {
        b.max_nfts_to_borrow
            .cmp(&a.max_nfts_to_borrow)
            .then_with(|| a.address.cmp(&b.address))
    });
}
