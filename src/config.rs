//! Chain configuration resolution.
//!
//! Maps a chain id to the endpoints the aggregators read from: the GraphQL
//! indexer, a read-only JSON-RPC node, and the oracle price API. Built-in
//! defaults can be overridden per chain through environment variables
//! (`LENS_INDEXER_URL_<id>`, `LENS_RPC_URL_<id>`, `LENS_ORACLE_URL_<id>`).

use crate::error::Error;

pub const MAINNET: u64 = 1;
pub const POLYGON: u64 = 137;
pub const SEPOLIA: u64 = 11_155_111;

/// Per-chain endpoints and flags.
#[derive(Debug, Clone)]
pub struct ChainConfig {
    pub chain_id: u64,
    pub indexer_url: String,
    pub rpc_url: String,
    pub oracle_api_url: String,
    pub is_testnet: bool,
}

impl ChainConfig {
    /// Resolve the configuration for a chain.
    ///
    /// Unknown chain ids and chains whose endpoints resolve empty are
    /// configuration errors, surfaced immediately and never retried.
    pub fn resolve(chain_id: u64) -> Result<Self, Error> {
        let (indexer, rpc, oracle, is_testnet) = match chain_id {
            MAINNET => (
                "https://api.thegraph.com/subgraphs/name/nftlend/nftlend-mainnet",
                "https://eth.llamarpc.com",
                "https://oracle.nftlend.xyz/api",
                false,
            ),
            POLYGON => (
                "https://api.thegraph.com/subgraphs/name/nftlend/nftlend-polygon",
                "https://polygon-rpc.com",
                "https://oracle.nftlend.xyz/api",
                false,
            ),
            SEPOLIA => (
                "https://api.thegraph.com/subgraphs/name/nftlend/nftlend-sepolia",
                "https://rpc.sepolia.org",
                "https://oracle.nftlend.xyz/api",
                true,
            ),
            other => {
                return Err(Error::Config(format!("unsupported chain id: {other}")));
            }
        };

        let config = Self {
            chain_id,
            indexer_url: defaults::url("INDEXER", chain_id, indexer),
            rpc_url: defaults::url("RPC", chain_id, rpc),
            oracle_api_url: defaults::url("ORACLE", chain_id, oracle),
            is_testnet,
        };

        for (name, value) in [
            ("indexer", &config.indexer_url),
            ("rpc", &config.rpc_url),
            ("oracle", &config.oracle_api_url),
        ] {
            if value.trim().is_empty() {
                return Err(Error::Config(format!(
                    "missing {name} endpoint for chain {chain_id}"
                )));
            }
        }

        Ok(config)
    }
}

mod defaults {
    /// Env override wins even when set empty — an explicitly blanked
    /// endpoint must fail resolution, not silently fall back.
    pub fn url(kind: &str, chain_id: u64, default: &str) -> String {
        let key = format!("LENS_{kind}_URL_{chain_id}");
        std::env::var(&key).unwrap_or_else(|_| default.into())
    }
}
