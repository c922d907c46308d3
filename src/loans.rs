//! Loan aggregation.
//!
//! Fetches loan records by pool or by borrower, computes each loan's
//! current repayment amount from elapsed time, and orders by nearest
//! deadline. The liquidatable variant scans every pool a liquidator is
//! authorized for and keeps only loans already past deadline.

use crate::config::ChainConfig;
use crate::error::Error;
use crate::indexer::{IndexedLoan, IndexerClient};
use crate::models::Loan;
use alloy_primitives::Address;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::task::JoinSet;
use tracing::info;

/// Filter for [`list_loans`]. `pool` wins when both are set; with neither
/// the call is degenerate and returns an empty list.
#[derive(Debug, Clone, Default)]
pub struct LoanFilter {
    pub user: Option<Address>,
    pub pool: Option<Address>,
}

/// List loans for a chain, repayment amounts computed at call time.
///
/// The by-user shape matches only loans still held by their original
/// borrower. Sorted soonest deadline first, ties broken by loan id.
pub async fn list_loans(chain_id: Option<u64>, filter: &LoanFilter) -> Result<Vec<Loan>, Error> {
    let Some(chain_id) = chain_id else {
        return Ok(Vec::new());
    };
    if filter.pool.is_none() && filter.user.is_none() {
        return Ok(Vec::new());
    }
    let config = ChainConfig::resolve(chain_id)?;
    let indexer = IndexerClient::new(&config.indexer_url)?;

    let indexed = match (filter.pool, filter.user) {
        (Some(pool), _) => indexer.loans_by_pool(pool).await?,
        (None, Some(user)) => indexer.loans_by_user(user).await?,
        (None, None) => Vec::new(),
    };

    let now = now_secs();
    let mut loans: Vec<Loan> = indexed
        .into_iter()
        .map(|record| Loan::from_indexed(record, config.is_testnet, now))
        .collect();
    sort_loans(&mut loans);

    info!(chain = chain_id, loans = loans.len(), "loan aggregation complete");
    Ok(loans)
}

/// Loans a liquidator can act on right now: every loan past deadline in
/// every pool the address is authorized for.
pub async fn list_liquidatable_loans(
    chain_id: Option<u64>,
    liquidator: Option<Address>,
) -> Result<Vec<Loan>, Error> {
    let Some(chain_id) = chain_id else {
        return Ok(Vec::new());
    };
    let Some(liquidator) = liquidator else {
        return Ok(Vec::new());
    };
    let config = ChainConfig::resolve(chain_id)?;
    let indexer = IndexerClient::new(&config.indexer_url)?;

    let pools = indexer.pools_by_liquidator(liquidator).await?;
    info!(
        chain = chain_id,
        liquidator = %liquidator,
        pools = pools.len(),
        "liquidator pool scan"
    );

    let mut set: JoinSet<Result<Vec<IndexedLoan>, Error>> = JoinSet::new();
    for pool in pools {
        let indexer = indexer.clone();
        set.spawn(async move { indexer.loans_by_pool(pool).await });
    }

    let now = now_secs();
    let mut loans = Vec::new();
    while let Some(joined) = set.join_next().await {
        let records =
            joined.map_err(|e| Error::Indexer(format!("loan scan task failed: {e}")))??;
        loans.extend(
            records
                .into_iter()
                .map(|record| Loan::from_indexed(record, config.is_testnet, now)),
        );
    }

    retain_liquidatable(&mut loans, now.saturating_mul(1000));
    sort_loans(&mut loans);
    Ok(loans)
}

/// Soonest deadline first; id breaks ties deterministically.
pub fn sort_loans(loans: &mut [Loan]) {
    loans.sort_by(|a, b| a.deadline.cmp(&b.deadline).then_with(|| a.id.cmp(&b.id)));
}

/// Keep loans whose deadline has passed. A deadline exactly at `now_ms` is
/// already liquidatable; strictly-future deadlines are not.
fn retain_liquidatable(loans: &mut Vec<Loan>, now_ms: u64) {
    loans.retain(|loan| loan.deadline <= now_ms);
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indexer::IndexedLoanPool;
    use alloy_primitives::U256;

    fn make_loan(id: &str, deadline_ms: u64) -> Loan {
        let record = IndexedLoan {
            id: id.into(),
            nft_id: U256::from(1u64),
            borrowed: U256::from(100u64),
            interest_rate: U256::ZERO,
            start_time: 0,
            deadline: deadline_ms / 1000,
            token_uri: String::new(),
            owner: Address::from_slice(&[0x55u8; 20]),
            pool: IndexedLoanPool {
                id: Address::from_slice(&[0x44u8; 20]),
                name: "p".into(),
                owner: Address::from_slice(&[0x22u8; 20]),
            },
        };
        Loan::from_indexed(record, false, 0)
    }

    #[test]
    fn test_sort_soonest_deadline_first() {
        let t = 1_700_000_000_000u64;
        let mut loans = vec![
            make_loan("a", t + 10_000),
            make_loan("b", t + 5_000),
            make_loan("c", t + 20_000),
        ];
        sort_loans(&mut loans);
        let order: Vec<&str> = loans.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(order, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_sort_ties_break_by_id() {
        let t = 1_700_000_000_000u64;
        let mut loans = vec![make_loan("z", t), make_loan("a", t)];
        sort_loans(&mut loans);
        assert_eq!(loans[0].id, "a");
    }

    #[test]
    fn test_retain_excludes_future_deadlines() {
        let now_ms = 1_700_000_000_000u64;
        let mut loans = vec![
            make_loan("past", now_ms - 1_000),
            make_loan("exact", now_ms),
            make_loan("future", now_ms + 1_000),
        ];
        retain_liquidatable(&mut loans, now_ms);
        let kept: Vec<&str> = loans.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(kept, vec!["past", "exact"]);
    }

    #[tokio::test]
    async fn test_missing_chain_id_returns_empty() {
        let loans = list_loans(None, &LoanFilter::default()).await.unwrap();
        assert!(loans.is_empty());
    }

    #[tokio::test]
    async fn test_empty_filter_is_degenerate_not_an_error() {
        let loans = list_loans(Some(1), &LoanFilter::default()).await.unwrap();
        assert!(loans.is_empty());
    }

    #[tokio::test]
    async fn test_missing_liquidator_returns_empty() {
        let loans = list_liquidatable_loans(Some(1), None).await.unwrap();
        assert!(loans.is_empty());
    }
}
