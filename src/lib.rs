//! # NFTLend Lens
//!
//! Read-path aggregation for NFT-collateralized lending pools. Composes a
//! GraphQL indexer, read-only contract calls, and an oracle price API into
//! flat, sorted view models for UI data hooks.
//!
//! Entry points:
//! - [`list_pools`] — lending pools enriched with live chain state and
//!   admin configuration, ranked by instant borrow capacity.
//! - [`list_loans`] / [`list_liquidatable_loans`] — loan positions with
//!   their current repayment amount, nearest deadline first.
//!
//! Every call is an independent snapshot: no caching, no signing, no
//! transaction submission. Callers own retry and refetch policy.

pub mod config;
mod error;
pub mod indexer;
mod loans;
pub mod math;
pub mod models;
pub mod oracle;
mod pools;
pub mod rpc;

pub use config::ChainConfig;
pub use error::Error;
pub use loans::{list_liquidatable_loans, list_loans, LoanFilter};
pub use models::{AdminInfo, Loan, Pool, PoolSummary};
pub use pools::{list_pools, PoolFilter};
