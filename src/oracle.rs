//! Reference price sources
//!
//! Price-feed sourcing is external; [`PriceOracle`] is the seam. Two
//! built-in sources cover offline use: a caller-fixed price and the pool's
//! own mid price.

use crate::pool::PoolStateReader;
use crate::tokens::BTC_DECIMALS;
use crate::vault::ReferencePrice;
use crate::{Error, Result};
use async_trait::async_trait;

#[async_trait]
pub trait PriceOracle: Send + Sync {
    /// Current USDC-per-BTC price
    async fn reference_price(&self) -> Result<ReferencePrice>;
}

/// Always returns the configured price
pub struct FixedPriceOracle {
    price: ReferencePrice,
}

impl FixedPriceOracle {
    pub fn new(price: ReferencePrice) -> Self {
        Self { price }
    }
}

#[async_trait]
impl PriceOracle for FixedPriceOracle {
    async fn reference_price(&self) -> Result<ReferencePrice> {
        Ok(self.price)
    }
}

/// Mid price implied by the pool reserves
pub struct PoolPriceOracle {
    pools: PoolStateReader,
    usdc_type: String,
    btc_type: String,
}

impl PoolPriceOracle {
    pub fn new(pools: PoolStateReader, usdc_type: impl Into<String>, btc_type: impl Into<String>) -> Self {
        Self {
            pools,
            usdc_type: usdc_type.into(),
            btc_type: btc_type.into(),
        }
    }
}

/// `reserve_usdc * 10^8 / reserve_btc`, floored
pub fn mid_price(reserve_usdc: u64, reserve_btc: u64) -> Result<ReferencePrice> {
    if reserve_usdc == 0 || reserve_btc == 0 {
        return Err(Error::NoLiquidity);
    }
    let price = (reserve_usdc as u128)
        .checked_mul(10u128.pow(BTC_DECIMALS as u32))
        .ok_or(Error::MathOverflow)?
        / reserve_btc as u128;
    let price = u64::try_from(price).map_err(|_| Error::MathOverflow)?;
    Ok(ReferencePrice::from_micro_usdc(price))
}

#[async_trait]
impl PriceOracle for PoolPriceOracle {
    async fn reference_price(&self) -> Result<ReferencePrice> {
        let pool = self.pools.get_default_pool().await?;
        let (reserve_usdc, reserve_btc) = pool
            .reserves_for(&self.usdc_type, &self.btc_type)
            .ok_or_else(|| {
                Error::Config(format!(
                    "pool {} does not hold {} and {}",
                    pool.pool_ref, self.usdc_type, self.btc_type
                ))
            })?;
        if pool.paused {
            tracing::warn!(pool = %pool.pool_ref, "Pricing from a paused pool");
        }
        mid_price(reserve_usdc, reserve_btc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mid_price() {
        // 1,000,000 USDC / 15 BTC
        let price = mid_price(1_000_000_000_000, 1_500_000_000).unwrap();
        assert_eq!(price.micro_usdc(), 66_666_666_666);
        assert!(matches!(mid_price(0, 1), Err(Error::NoLiquidity)));
    }

    #[tokio::test]
    async fn test_fixed_oracle() {
        let oracle = FixedPriceOracle::new(ReferencePrice::from_micro_usdc(42));
        assert_eq!(oracle.reference_price().await.unwrap().micro_usdc(), 42);
    }
}
