// 2.0 rate.rs: cross rates and minimum-received math. this is the only module
// allowed to convert between raw base units and normalized decimal amounts;
// the 18<->6<->18 rescaling cases here are the classic source of off-by-factor
// bugs and are unit-tested independently of any live price.

use rust_decimal::prelude::*;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::ledger::{Ledger, LedgerError};
use crate::oracle::{OracleError, OracleRegistry};
use crate::types::{Address, Bps, MAX_BIPS};

/// Cross rates are fixed-point with 8 decimal places, truncated.
pub const RATE_DECIMALS: u32 = 8;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RateError {
    #[error(transparent)]
    Oracle(#[from] OracleError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("slippage above {MAX_BIPS} bips")]
    InvalidSlippage,

    #[error("amount out of range for rate math")]
    AmountOverflow,
}

/// `priceUSD(token_in) / priceUSD(token_out)`, both read fresh.
pub fn exchange_rate(
    oracles: &OracleRegistry,
    token_in: Address,
    token_out: Address,
) -> Result<Decimal, RateError> {
    let price_in = oracles.usd_price(token_in)?;
    let price_out = oracles.usd_price(token_out)?;
    Ok((price_in / price_out).round_dp_with_strategy(RATE_DECIMALS, RoundingStrategy::ToZero))
}

/// Base units -> whole-token decimal amount.
pub fn normalize(ledger: &Ledger, token: Address, amount: u128) -> Result<Decimal, RateError> {
    let decimals = ledger.decimals(token)?;
    let raw = i128::try_from(amount).map_err(|_| RateError::AmountOverflow)?;
    Decimal::try_from_i128_with_scale(raw, decimals).map_err(|_| RateError::AmountOverflow)
}

/// Whole-token decimal amount -> base units, truncated.
pub fn denormalize(ledger: &Ledger, token: Address, amount: Decimal) -> Result<u128, RateError> {
    let decimals = ledger.decimals(token)?;
    let scale = Decimal::from_i128_with_scale(10i128.pow(decimals), 0);
    let units = amount.checked_mul(scale).ok_or(RateError::AmountOverflow)?;
    units.floor().to_u128().ok_or(RateError::AmountOverflow)
}

/// Oracle-implied fair output for `amount_in`, less `slippage` bips, in
/// `token_out` base units. Handles all three decimal cases (in>out, in<out,
/// in==out) exactly.
pub fn min_amount_received(
    oracles: &OracleRegistry,
    ledger: &Ledger,
    amount_in: u128,
    token_in: Address,
    token_out: Address,
    slippage: Bps,
) -> Result<u128, RateError> {
    if !slippage.is_valid() {
        return Err(RateError::InvalidSlippage);
    }
    let rate = exchange_rate(oracles, token_in, token_out)?;
    let fair = normalize(ledger, token_in, amount_in)?
        .checked_mul(rate)
        .ok_or(RateError::AmountOverflow)?;
    let fair_units = denormalize(ledger, token_out, fair)?;

    // slippage applied in integer math so zero-slippage is exact
    let kept = (MAX_BIPS - slippage.value()) as u128;
    fair_units
        .checked_mul(kept)
        .map(|v| v / MAX_BIPS as u128)
        .ok_or(RateError::AmountOverflow)
}

/// USD value of a raw token amount, for minimum-order-size checks.
pub fn usd_value(
    oracles: &OracleRegistry,
    ledger: &Ledger,
    token: Address,
    amount: u128,
) -> Result<Decimal, RateError> {
    let price = oracles.usd_price(token)?;
    let normalized = normalize(ledger, token, amount)?;
    normalized.checked_mul(price).ok_or(RateError::AmountOverflow)
}
