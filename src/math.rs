//! Financial computation helpers.
//!
//! All amounts are raw integers in the asset's smallest unit (18 decimals).
//! Interest rates on the wire are per-second-per-unit values scaled by 1e18;
//! the UI-facing figures produced here are annualized percentages.

use crate::error::Error;
use alloy_primitives::U256;

/// 1e18 fixed-point scale shared by amounts and raw rates.
pub const WAD: u64 = 1_000_000_000_000_000_000;
/// Divisor turning a raw per-second rate into a percentage-like figure.
pub const RATE_SCALE: f64 = 1e16;
pub const SECONDS_PER_YEAR: u64 = 31_536_000;
pub const SECONDS_PER_DAY: u64 = 86_400;

/// Annualized percentage figure for a raw per-second-per-unit rate.
pub fn annualized_rate(raw: U256) -> f64 {
    u256_to_f64(raw) / RATE_SCALE * SECONDS_PER_YEAR as f64
}

/// Amount borrowable against a single NFT: oracle price scaled by the
/// pool's loan-to-value ratio. An unknown oracle price stays unknown.
pub fn price_per_nft(oracle_price: Option<U256>, ltv_pct: u64) -> Option<U256> {
    oracle_price?
        .checked_mul(U256::from(ltv_pct))
        .map(|value| value / U256::from(100u64))
}

/// Whole NFTs the pool could lend against right now. `None` while the
/// per-NFT price is unknown; a zero price means zero NFTs, not a fault.
pub fn max_nfts_to_borrow(max_instant_borrow: U256, price_per_nft: Option<U256>) -> Option<u64> {
    let price = price_per_nft?;
    if price.is_zero() {
        return Some(0);
    }
    Some(u64::try_from(max_instant_borrow / price).unwrap_or(u64::MAX))
}

/// Argument for the live interest-rate read: total received by the pool if
/// one more NFT's worth were borrowed. Without a known per-NFT price the
/// current borrowed total is used as-is.
pub fn total_received_arg(total_borrowed: U256, price_per_nft: Option<U256>) -> U256 {
    match price_per_nft {
        Some(price) => total_borrowed.saturating_add(price),
        None => total_borrowed,
    }
}

/// Interest accrued since loan start: `(now - start) * rate * borrowed / 1e18`.
pub fn accrued_interest(borrowed: U256, rate: U256, start_time: u64, now: u64) -> U256 {
    let elapsed = now.saturating_sub(start_time);
    U256::from(elapsed)
        .saturating_mul(rate)
        .saturating_mul(borrowed)
        / U256::from(WAD)
}

/// Late fee: one borrowed-amount unit per full day past the deadline,
/// prorated per second. Zero until the deadline passes.
pub fn late_fees(borrowed: U256, deadline: u64, now: u64) -> U256 {
    if now <= deadline {
        return U256::ZERO;
    }
    U256::from(now - deadline).saturating_mul(borrowed) / U256::from(SECONDS_PER_DAY)
}

/// Current repayment amount: principal + accrued interest + late fees.
pub fn repayment(borrowed: U256, rate: U256, start_time: u64, deadline: u64, now: u64) -> U256 {
    borrowed
        .saturating_add(accrued_interest(borrowed, rate, start_time, now))
        .saturating_add(late_fees(borrowed, deadline, now))
}

/// Parse a human-entered decimal amount ("1.5") into 18-decimal base units.
pub fn amount_to_wei(amount: &str) -> Result<U256, Error> {
    let amount = amount.trim();
    let (whole, frac) = match amount.split_once('.') {
        Some((whole, frac)) => (whole, frac),
        None => (amount, ""),
    };

    if whole.is_empty() && frac.is_empty() {
        return Err(Error::Input("empty amount".into()));
    }
    if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit()) {
        return Err(Error::Input(format!("malformed amount: {amount:?}")));
    }
    if frac.len() > 18 {
        return Err(Error::Input(format!(
            "amount has more than 18 decimal places: {amount:?}"
        )));
    }

    let whole_units = if whole.is_empty() {
        U256::ZERO
    } else {
        U256::from_str_radix(whole, 10)
            .map_err(|e| Error::Input(format!("malformed amount {amount:?}: {e}")))?
    };
    let frac_units = if frac.is_empty() {
        U256::ZERO
    } else {
        let padded = format!("{frac:0<18}");
        U256::from_str_radix(&padded, 10)
            .map_err(|e| Error::Input(format!("malformed amount {amount:?}: {e}")))?
    };

    whole_units
        .checked_mul(U256::from(WAD))
        .and_then(|units| units.checked_add(frac_units))
        .ok_or_else(|| Error::Input(format!("amount out of range: {amount:?}")))
}

/// Lossy conversion for display-scale figures only.
fn u256_to_f64(value: U256) -> f64 {
    value.to_string().parse().unwrap_or(f64::INFINITY)
}
