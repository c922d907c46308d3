//! Integration tests against the public API surface. Nothing here touches
//! the network: degenerate inputs short-circuit before any client exists.

use alloy_primitives::{Address, U256};
use nftlend_lens::{
    list_liquidatable_loans, list_loans, list_pools, ChainConfig, Error, LoanFilter, PoolFilter,
};

#[tokio::test]
async fn pools_without_chain_id_are_empty() {
    let pools = list_pools(None, &PoolFilter::default()).await.unwrap();
    assert!(pools.is_empty());
}

#[tokio::test]
async fn loans_without_any_filter_are_empty() {
    assert!(list_loans(None, &LoanFilter::default()).await.unwrap().is_empty());
    assert!(list_loans(Some(1), &LoanFilter::default()).await.unwrap().is_empty());
}

#[tokio::test]
async fn liquidatable_scan_without_liquidator_is_empty() {
    let loans = list_liquidatable_loans(Some(1), None).await.unwrap();
    assert!(loans.is_empty());
}

#[tokio::test]
async fn unsupported_chain_surfaces_config_error() {
    let err = list_pools(Some(424242), &PoolFilter::default())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Config(_)));
    assert!(err.to_string().contains("424242"));

    let filter = LoanFilter {
        user: Some(Address::ZERO),
        pool: None,
    };
    let err = list_loans(Some(424242), &filter).await.unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}

#[test]
fn chain_config_resolves_builtin_chains() {
    for chain_id in [1u64, 137, 11_155_111] {
        let config = ChainConfig::resolve(chain_id).unwrap();
        assert_eq!(config.chain_id, chain_id);
        assert!(!config.indexer_url.is_empty());
        assert!(!config.rpc_url.is_empty());
        assert!(!config.oracle_api_url.is_empty());
    }
}

#[test]
fn amount_helper_is_reachable_and_exact() {
    let wei = nftlend_lens::math::amount_to_wei("2.5").unwrap();
    assert_eq!(wei, U256::from(2_500_000_000_000_000_000u64));
}
