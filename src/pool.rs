//! Pool state reader
//!
//! Decodes the constant-product pool object into an immutable
//! [`LiquidityPool`] snapshot. A halted pool is returned with
//! `paused = true`; callers decide whether that is fatal.

use crate::config::ArenaObjects;
use crate::ledger::fields::{field, first_of, required_u64, struct_fields};
use crate::ledger::{Ledger, LedgerObject};
use crate::quote::FEE_SCALE;
use crate::tokens::same_coin_type;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Snapshot of a liquidity pool at one object version
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidityPool {
    pub pool_ref: String,
    pub version: u64,
    /// Coin type of the first reserve
    pub asset_x: String,
    /// Coin type of the second reserve
    pub asset_y: String,
    /// Reserve of `asset_x` in smallest units
    pub reserve_x: u64,
    /// Reserve of `asset_y` in smallest units
    pub reserve_y: u64,
    pub lp_supply: u64,
    /// Swap fee in basis points, always below 10000
    pub fee_bps: u64,
    pub paused: bool,
}

impl LiquidityPool {
    pub fn contains(&self, coin_type: &str) -> bool {
        same_coin_type(&self.asset_x, coin_type) || same_coin_type(&self.asset_y, coin_type)
    }

    /// `(reserve_in, reserve_out)` for a swap direction, or `None` if the
    /// pair is not exactly this pool's two assets.
    pub fn reserves_for(&self, token_in: &str, token_out: &str) -> Option<(u64, u64)> {
        if same_coin_type(&self.asset_x, token_in) && same_coin_type(&self.asset_y, token_out) {
            Some((self.reserve_x, self.reserve_y))
        } else if same_coin_type(&self.asset_y, token_in) && same_coin_type(&self.asset_x, token_out) {
            Some((self.reserve_y, self.reserve_x))
        } else {
            None
        }
    }

    /// Decode a pool object.
    ///
    /// The pool may be stored directly or as a dynamic field value; the fee
    /// is read from `fee_bps`, or from `fee_percent` in tenths of a percent.
    pub fn decode(object: &LedgerObject, default_x: &str, default_y: &str) -> Result<Self> {
        let context = format!("pool {}", object.object_id);
        let content = struct_fields(&object.content);
        let body = match field(content, "value") {
            Some(inner) if field(inner, "coin_x").is_some() => inner,
            _ => content,
        };

        let reserve_x = required_u64(body, "coin_x", &context)?;
        let reserve_y = required_u64(body, "coin_y", &context)?;
        let lp_supply = required_u64(body, "lp_supply", &context)?;

        let fee_bps = match field(body, "fee_bps") {
            Some(_) => required_u64(body, "fee_bps", &context)?,
            None => required_u64(body, "fee_percent", &context)?
                .checked_mul(10)
                .ok_or(Error::MathOverflow)?,
        };
        if fee_bps >= FEE_SCALE {
            return Err(Error::decode(
                &context,
                format!("fee of {} bps is not below {}", fee_bps, FEE_SCALE),
            ));
        }

        let paused = first_of(body, &["has_paused", "paused"])
            .ok_or_else(|| Error::decode(&context, "missing field `has_paused`"))?
            .as_bool()
            .ok_or_else(|| Error::decode(&context, "`has_paused` is not a bool"))?;

        let (asset_x, asset_y) = object
            .object_type
            .as_deref()
            .and_then(pool_type_arguments)
            .unwrap_or_else(|| (default_x.to_string(), default_y.to_string()));

        Ok(Self {
            pool_ref: object.object_id.clone(),
            version: object.version,
            asset_x,
            asset_y,
            reserve_x,
            reserve_y,
            lp_supply,
            fee_bps,
            paused,
        })
    }
}

/// Extract `(X, Y)` from a type string containing `Pool<X, Y>`.
fn pool_type_arguments(object_type: &str) -> Option<(String, String)> {
    let start = object_type.find("Pool<")? + "Pool<".len();
    let mut depth = 0usize;
    let mut split = None;
    let mut end = None;
    for (i, c) in object_type[start..].char_indices() {
        match c {
            '<' => depth += 1,
            '>' if depth == 0 => {
                end = Some(start + i);
                break;
            }
            '>' => depth -= 1,
            ',' if depth == 0 => split = Some(start + i),
            _ => {}
        }
    }
    let (split, end) = (split?, end?);
    let x = object_type[start..split].trim();
    let y = object_type[split + 1..end].trim();
    if x.is_empty() || y.is_empty() {
        return None;
    }
    Some((x.to_string(), y.to_string()))
}

/// Reads pool snapshots from the ledger
#[derive(Clone)]
pub struct PoolStateReader {
    ledger: Arc<dyn Ledger>,
    default_pool: String,
    asset_x: String,
    asset_y: String,
}

impl PoolStateReader {
    pub fn new(ledger: Arc<dyn Ledger>, objects: &ArenaObjects) -> Self {
        Self {
            ledger,
            default_pool: objects.pool_id.clone(),
            asset_x: objects.usdc_type.clone(),
            asset_y: objects.btc_type.clone(),
        }
    }

    /// Fresh snapshot of `pool_ref`
    pub async fn get_pool_state(&self, pool_ref: &str) -> Result<LiquidityPool> {
        let object = self
            .ledger
            .get_object(pool_ref)
            .await?
            .ok_or_else(|| Error::NotFound(format!("pool {}", pool_ref)))?;
        let pool = LiquidityPool::decode(&object, &self.asset_x, &self.asset_y)?;

        tracing::debug!(
            pool = %pool.pool_ref,
            version = pool.version,
            reserve_x = pool.reserve_x,
            reserve_y = pool.reserve_y,
            fee_bps = pool.fee_bps,
            paused = pool.paused,
            "Read pool state"
        );
        if pool.paused {
            tracing::warn!(pool = %pool.pool_ref, "Pool is paused");
        }
        Ok(pool)
    }

    /// Snapshot of the configured pool
    pub async fn get_default_pool(&self) -> Result<LiquidityPool> {
        self.get_pool_state(&self.default_pool).await
    }

    pub fn default_pool_ref(&self) -> &str {
        &self.default_pool
    }
}
