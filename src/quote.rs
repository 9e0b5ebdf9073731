//! Swap quote engine
//!
//! Constant-product pricing with the fee deducted from the input before the
//! curve is applied. Mirrors the ledger's settlement arithmetic so a local
//! quote and the actual fill agree to the unit.

use crate::pool::LiquidityPool;
use crate::tokens::same_coin_type;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Basis-point denominator for the swap fee
pub const FEE_SCALE: u64 = 10_000;

/// Result of pricing one swap against a pool snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwapQuote {
    pub token_in: String,
    pub token_out: String,
    pub amount_in: u64,
    pub amount_out: u64,
    /// Portion of `amount_in` kept by the pool
    pub fee_amount: u64,
    /// Output at the pre-trade spot price, without fee or slippage
    pub ideal_output: f64,
    pub price_impact_pct: f64,
    pub fee_bps: u64,
    pub reserve_in: u64,
    pub reserve_out: u64,
}

impl SwapQuote {
    /// Minimum acceptable output at `slippage_bps` tolerance
    pub fn min_amount_out(&self, slippage_bps: u64) -> u64 {
        min_amount_out(self.amount_out, slippage_bps)
    }
}

/// Pure quoting over pool snapshots
pub struct SwapQuoteEngine;

impl SwapQuoteEngine {
    /// Price `amount_in` of `token_in` for `token_out`.
    ///
    /// Input checks run before any arithmetic, in order: positive amount,
    /// distinct tokens, unpaused pool, pair membership.
    pub fn quote(
        token_in: &str,
        token_out: &str,
        amount_in: u64,
        pool: &LiquidityPool,
    ) -> Result<SwapQuote> {
        if amount_in == 0 {
            return Err(Error::validation("amount_in", "must be greater than zero"));
        }
        if same_coin_type(token_in, token_out) {
            return Err(Error::validation("token_out", "must differ from token_in"));
        }
        if pool.paused {
            return Err(Error::Paused(format!("pool {}", pool.pool_ref)));
        }
        let (reserve_in, reserve_out) = pool.reserves_for(token_in, token_out).ok_or_else(|| {
            Error::validation(
                "token_in",
                format!(
                    "{} -> {} is not the pool pair {} / {}",
                    token_in, token_out, pool.asset_x, pool.asset_y
                ),
            )
        })?;

        let amount_out = swap_output(amount_in, reserve_in, reserve_out, pool.fee_bps)?;
        let fee_amount = fee_amount(amount_in, pool.fee_bps)?;

        let ideal_output = amount_in as f64 * reserve_out as f64 / reserve_in as f64;
        let price_impact_pct = (ideal_output - amount_out as f64).abs() / ideal_output * 100.0;

        Ok(SwapQuote {
            token_in: token_in.to_string(),
            token_out: token_out.to_string(),
            amount_in,
            amount_out,
            fee_amount,
            ideal_output,
            price_impact_pct,
            fee_bps: pool.fee_bps,
            reserve_in,
            reserve_out,
        })
    }
}

/// Integer swap output, floored once at the end.
///
/// `out = in*(S-f)*R_out / (R_in*S + in*(S-f))` with `S = 10000`.
pub fn swap_output(amount_in: u64, reserve_in: u64, reserve_out: u64, fee_bps: u64) -> Result<u64> {
    if reserve_in == 0 || reserve_out == 0 {
        return Err(Error::NoLiquidity);
    }
    if fee_bps >= FEE_SCALE {
        return Err(Error::validation("fee_bps", "must be below 10000"));
    }

    let scaled_in = (amount_in as u128)
        .checked_mul((FEE_SCALE - fee_bps) as u128)
        .ok_or(Error::MathOverflow)?;
    let numerator = scaled_in
        .checked_mul(reserve_out as u128)
        .ok_or(Error::MathOverflow)?;
    let denominator = (reserve_in as u128)
        .checked_mul(FEE_SCALE as u128)
        .and_then(|d| d.checked_add(scaled_in))
        .ok_or(Error::MathOverflow)?;

    let out = numerator.checked_div(denominator).ok_or(Error::MathOverflow)?;
    u64::try_from(out).map_err(|_| Error::MathOverflow)
}

/// `amount_in` minus the fee-adjusted input, floored
pub fn fee_amount(amount_in: u64, fee_bps: u64) -> Result<u64> {
    let kept = (amount_in as u128)
        .checked_mul(FEE_SCALE.saturating_sub(fee_bps) as u128)
        .ok_or(Error::MathOverflow)?
        / FEE_SCALE as u128;
    Ok(amount_in - kept as u64)
}

/// `amount_out` reduced by `slippage_bps`
pub fn min_amount_out(amount_out: u64, slippage_bps: u64) -> u64 {
    let slippage = (amount_out as u128 * slippage_bps.min(FEE_SCALE) as u128) / FEE_SCALE as u128;
    amount_out - slippage as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    const USDC: &str = "0x1::usdc::USDC";
    const BTC: &str = "0x1::btc::BTC";

    fn pool(reserve_usdc: u64, reserve_btc: u64, fee_bps: u64) -> LiquidityPool {
        LiquidityPool {
            pool_ref: "0xp".to_string(),
            version: 1,
            asset_x: USDC.to_string(),
            asset_y: BTC.to_string(),
            reserve_x: reserve_usdc,
            reserve_y: reserve_btc,
            lp_supply: 1,
            fee_bps,
            paused: false,
        }
    }

    #[test]
    fn test_small_reserve_example_is_exact() {
        let quote = SwapQuoteEngine::quote(USDC, BTC, 10_000, &pool(1_000_000, 15, 30)).unwrap();
        assert_eq!(quote.amount_out, 0);
        assert_eq!(quote.fee_amount, 30);
        assert!((quote.ideal_output - 0.15).abs() < 1e-12);
        assert!((quote.price_impact_pct - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_realistic_long() {
        // 10,000 USDC into 1,000,000 USDC / 15 BTC
        let quote = SwapQuoteEngine::quote(
            USDC,
            BTC,
            10_000_000_000,
            &pool(1_000_000_000_000, 1_500_000_000, 30),
        )
        .unwrap();
        assert_eq!(quote.amount_out, 14_807_370);
        assert_eq!(quote.fee_amount, 30_000_000);
        assert_eq!(quote.reserve_in, 1_000_000_000_000);
        assert!((quote.price_impact_pct - 1.2842).abs() < 1e-6);
    }

    #[test]
    fn test_realistic_short() {
        let quote = SwapQuoteEngine::quote(
            BTC,
            USDC,
            15_000_000,
            &pool(1_000_000_000_000, 1_500_000_000, 30),
        )
        .unwrap();
        assert_eq!(quote.amount_out, 9_871_580_343);
        assert_eq!(quote.fee_amount, 45_000);
    }

    #[test]
    fn test_zero_amount_rejected_before_reserves() {
        let err = SwapQuoteEngine::quote(USDC, BTC, 0, &pool(0, 0, 30)).unwrap_err();
        assert!(matches!(err, Error::Validation { field: "amount_in", .. }));
    }

    #[test]
    fn test_same_token_rejected_before_reserves() {
        let err = SwapQuoteEngine::quote(USDC, USDC, 5, &pool(0, 0, 30)).unwrap_err();
        assert!(matches!(err, Error::Validation { field: "token_out", .. }));
    }

    #[test]
    fn test_paused_pool_never_quotes() {
        let mut p = pool(1_000_000, 1_000_000, 30);
        p.paused = true;
        assert!(matches!(
            SwapQuoteEngine::quote(USDC, BTC, 100, &p),
            Err(Error::Paused(_))
        ));
    }

    #[test]
    fn test_foreign_pair_rejected() {
        let err = SwapQuoteEngine::quote(USDC, "0x1::eth::ETH", 100, &pool(10, 10, 30)).unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));
    }

    #[test]
    fn test_empty_reserves() {
        assert!(matches!(
            SwapQuoteEngine::quote(USDC, BTC, 100, &pool(0, 10, 30)),
            Err(Error::NoLiquidity)
        ));
    }

    #[test]
    fn test_monotonic_and_bounded_by_ideal() {
        for fee_bps in [1, 30, 100, 9_999] {
            let p = pool(2_500_000_000, 4_000_000, fee_bps);
            let mut previous = 0;
            for amount_in in (1..2_000_000u64).step_by(9_973) {
                let quote = SwapQuoteEngine::quote(USDC, BTC, amount_in, &p).unwrap();
                assert!(quote.amount_out >= previous, "output decreased at {}", amount_in);
                assert!((quote.amount_out as f64) < quote.ideal_output);
                assert!(quote.price_impact_pct >= 0.0);
                previous = quote.amount_out;
            }
        }
    }

    #[test]
    fn test_zero_fee_still_below_ideal() {
        let quote = SwapQuoteEngine::quote(USDC, BTC, 1_000, &pool(1_000, 1_000, 0)).unwrap();
        assert_eq!(quote.amount_out, 500);
        assert_eq!(quote.fee_amount, 0);
        assert!((quote.price_impact_pct - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_overflow_is_reported() {
        let p = pool(u64::MAX, u64::MAX, 0);
        assert!(matches!(
            SwapQuoteEngine::quote(USDC, BTC, u64::MAX, &p),
            Err(Error::MathOverflow)
        ));
    }

    #[test]
    fn test_min_amount_out() {
        assert_eq!(min_amount_out(10_000, 50), 9_950);
        assert_eq!(min_amount_out(10_000, 0), 10_000);
        assert_eq!(min_amount_out(10_000, 20_000), 0);
    }
}
