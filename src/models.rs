//! View models returned to callers.
//!
//! Every record is a value snapshot built fresh per aggregation call and
//! never mutated afterwards. Amounts serialize as decimal strings and
//! addresses as EIP-55 checksummed strings, ready for display.

use crate::indexer::IndexedLoan;
use crate::math;
use alloy_primitives::{hex, keccak256, Address, U256};
use serde::Serialize;

/// A lending pool with its live state and admin configuration merged in.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pool {
    #[serde(serialize_with = "checksum")]
    pub address: Address,
    pub name: String,
    pub symbol: String,
    #[serde(serialize_with = "checksum")]
    pub owner: Address,
    #[serde(serialize_with = "checksum")]
    pub nft_collection: Address,
    pub collection_name: String,
    /// Loan-to-value ratio, percent.
    pub ltv: u64,
    /// Maximum loan duration, seconds.
    pub max_loan_length: u64,
    #[serde(serialize_with = "amount")]
    pub pool_balance: U256,
    #[serde(serialize_with = "amount")]
    pub total_borrowed: U256,
    /// Always `pool_balance + total_borrowed`; computed, never stored.
    #[serde(serialize_with = "amount")]
    pub total_deposited: U256,
    /// Current annualized rate, percent.
    pub interest_rate: f64,
    #[serde(serialize_with = "checksum")]
    pub oracle: Address,
    /// Absent when the caller skipped the oracle fetch.
    #[serde(serialize_with = "opt_amount", skip_serializing_if = "Option::is_none")]
    pub oracle_price: Option<U256>,
    /// Absent while the oracle price is unknown.
    #[serde(serialize_with = "opt_amount", skip_serializing_if = "Option::is_none")]
    pub price_per_nft: Option<U256>,
    /// Absent while the oracle price is unknown.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_nfts_to_borrow: Option<u64>,
    #[serde(serialize_with = "amount")]
    pub max_instant_borrow: U256,
    pub admin: AdminInfo,
}

/// Per-pool configuration snapshot. `Default` is the all-zero record merged
/// in when admin enrichment is unavailable.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminInfo {
    #[serde(serialize_with = "amount")]
    pub max_nft_price: U256,
    #[serde(serialize_with = "amount")]
    pub max_instant_borrow: U256,
    #[serde(serialize_with = "amount")]
    pub daily_borrows: U256,
    #[serde(serialize_with = "amount")]
    pub max_daily_borrows: U256,
    /// Seconds.
    pub max_loan_length: u64,
    #[serde(serialize_with = "checksum")]
    pub oracle: Address,
    /// Annualized, percent.
    pub min_interest: f64,
    /// Annualized, percent: minimum plus the variable component.
    pub max_interest: f64,
    #[serde(serialize_with = "checksum_vec")]
    pub liquidators: Vec<Address>,
}

impl AdminInfo {
    /// Content fingerprint for cheap change detection. Equal fingerprints
    /// imply field-for-field equality; the hash covers every field through
    /// the canonical serialized form.
    pub fn fingerprint(&self) -> String {
        let encoded = serde_json::to_vec(self).unwrap_or_default();
        hex::encode(keccak256(&encoded))
    }
}

/// A loan position with its repayment amount computed at aggregation time.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Loan {
    pub id: String,
    #[serde(serialize_with = "amount")]
    pub nft_id: U256,
    #[serde(serialize_with = "amount")]
    pub borrowed: U256,
    /// Raw per-second-per-unit rate, 1e18-scaled.
    #[serde(serialize_with = "amount")]
    pub interest_rate: U256,
    /// Seconds since epoch.
    pub start_time: u64,
    /// Milliseconds since epoch.
    pub deadline: u64,
    /// Principal + accrued interest + late fees at aggregation time.
    #[serde(serialize_with = "amount")]
    pub to_pay: U256,
    /// Empty on test networks.
    pub token_uri: String,
    #[serde(serialize_with = "checksum")]
    pub owner: Address,
    pub pool: PoolSummary,
}

/// The parent pool, as much of it as the loan view needs.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolSummary {
    pub name: String,
    #[serde(serialize_with = "checksum")]
    pub owner: Address,
    #[serde(serialize_with = "checksum")]
    pub address: Address,
}

impl Loan {
    /// Build the view model from an indexer record at time `now` (seconds).
    pub fn from_indexed(record: IndexedLoan, is_testnet: bool, now: u64) -> Self {
        let to_pay = math::repayment(
            record.borrowed,
            record.interest_rate,
            record.start_time,
            record.deadline,
            now,
        );
        Self {
            id: record.id,
            nft_id: record.nft_id,
            borrowed: record.borrowed,
            interest_rate: record.interest_rate,
            start_time: record.start_time,
            deadline: record.deadline.saturating_mul(1000),
            to_pay,
            token_uri: if is_testnet {
                String::new()
            } else {
                record.token_uri
            },
            owner: record.owner,
            pool: PoolSummary {
                name: record.pool.name,
                owner: record.pool.owner,
                address: record.pool.id,
            },
        }
    }
}

// --- Serialization helpers ---

fn amount<S: serde::Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&value.to_string())
}

fn opt_amount<S: serde::Serializer>(
    value: &Option<U256>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match value {
        Some(v) => amount(v, serializer),
        None => serializer.serialize_none(),
    }
}

fn checksum<S: serde::Serializer>(address: &Address, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&address.to_checksum(None))
}

fn checksum_vec<S: serde::Serializer>(
    addresses: &[Address],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(addresses.iter().map(|a| a.to_checksum(None)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indexer::IndexedLoanPool;

    fn make_indexed_loan() -> IndexedLoan {
        IndexedLoan {
            id: "0x4444-7".into(),
            nft_id: U256::from(7u64),
            borrowed: U256::from(1_000_000_000_000_000_000u64),
            interest_rate: U256::ZERO,
            start_time: 1_700_000_000,
            deadline: 1_700_086_400,
            token_uri: "ipfs://QmX/7.json".into(),
            owner: Address::from_slice(&[0x55u8; 20]),
            pool: IndexedLoanPool {
                id: Address::from_slice(&[0x44u8; 20]),
                name: "Cool Cats Pool".into(),
                owner: Address::from_slice(&[0x22u8; 20]),
            },
        }
    }

    fn make_admin() -> AdminInfo {
        AdminInfo {
            max_nft_price: U256::from(5u64),
            max_instant_borrow: U256::from(10u64),
            daily_borrows: U256::from(1u64),
            max_daily_borrows: U256::from(11u64),
            max_loan_length: 2_592_000,
            oracle: Address::from_slice(&[0x66u8; 20]),
            min_interest: 2.0,
            max_interest: 10.0,
            liquidators: vec![Address::from_slice(&[0x77u8; 20])],
        }
    }

    #[test]
    fn test_loan_deadline_surfaced_in_millis() {
        let loan = Loan::from_indexed(make_indexed_loan(), false, 1_700_000_000);
        assert_eq!(loan.deadline, 1_700_086_400_000);
    }

    #[test]
    fn test_loan_token_uri_suppressed_on_testnet() {
        let loan = Loan::from_indexed(make_indexed_loan(), true, 1_700_000_000);
        assert_eq!(loan.token_uri, "");
        let loan = Loan::from_indexed(make_indexed_loan(), false, 1_700_000_000);
        assert_eq!(loan.token_uri, "ipfs://QmX/7.json");
    }

    #[test]
    fn test_loan_to_pay_adds_late_fees_past_deadline() {
        let record = make_indexed_loan();
        let one_day_late = record.deadline + math::SECONDS_PER_DAY;
        let loan = Loan::from_indexed(record.clone(), false, one_day_late);
        assert_eq!(loan.to_pay, record.borrowed + record.borrowed);
    }

    #[test]
    fn test_fingerprint_tracks_field_changes() {
        let admin = make_admin();
        assert_eq!(admin.fingerprint(), make_admin().fingerprint());

        let mut changed = make_admin();
        changed.max_daily_borrows = U256::from(12u64);
        assert_ne!(admin.fingerprint(), changed.fingerprint());

        let mut extended = make_admin();
        extended.liquidators.push(Address::from_slice(&[0x78u8; 20]));
        assert_ne!(admin.fingerprint(), extended.fingerprint());
    }

    #[test]
    fn test_amounts_serialize_as_decimal_strings() {
        let admin = make_admin();
        let json = serde_json::to_value(&admin).unwrap();
        assert_eq!(json["maxNftPrice"], "5");
        assert_eq!(json["maxDailyBorrows"], "11");
    }

    #[test]
    fn test_addresses_serialize_checksummed() {
        // EIP-55 reference vector.
        let address: Address = "0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed"
            .parse()
            .unwrap();
        let summary = PoolSummary {
            name: "p".into(),
            owner: address,
            address,
        };
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["owner"], "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed");
    }
}
