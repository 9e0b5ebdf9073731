//! Arena asset registry
//!
//! Decimals and symbols for the two tradable assets, plus fixed-point
//! conversions between whole-unit decimal strings and smallest units.
//! Conversions are integer only; no floating point touches balances.

use crate::config::ArenaObjects;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Decimals of the stable asset
pub const USDC_DECIMALS: u8 = 6;
/// Decimals of the volatile asset
pub const BTC_DECIMALS: u8 = 8;

/// Which side of the pair an asset is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Asset {
    Usdc,
    Btc,
}

impl Asset {
    pub fn symbol(&self) -> &'static str {
        match self {
            Asset::Usdc => "USDC",
            Asset::Btc => "BTC",
        }
    }

    pub fn decimals(&self) -> u8 {
        match self {
            Asset::Usdc => USDC_DECIMALS,
            Asset::Btc => BTC_DECIMALS,
        }
    }

    pub fn other(&self) -> Asset {
        match self {
            Asset::Usdc => Asset::Btc,
            Asset::Btc => Asset::Usdc,
        }
    }
}

/// Token metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenInfo {
    pub asset: Asset,
    /// Fully qualified Move coin type
    pub coin_type: String,
}

impl TokenInfo {
    pub fn symbol(&self) -> &'static str {
        self.asset.symbol()
    }

    pub fn decimals(&self) -> u8 {
        self.asset.decimals()
    }
}

/// Maps symbols and coin types to the arena's two assets
#[derive(Debug, Clone)]
pub struct TokenRegistry {
    usdc: TokenInfo,
    btc: TokenInfo,
}

impl TokenRegistry {
    pub fn new(objects: &ArenaObjects) -> Self {
        Self {
            usdc: TokenInfo {
                asset: Asset::Usdc,
                coin_type: objects.usdc_type.clone(),
            },
            btc: TokenInfo {
                asset: Asset::Btc,
                coin_type: objects.btc_type.clone(),
            },
        }
    }

    pub fn get(&self, asset: Asset) -> &TokenInfo {
        match asset {
            Asset::Usdc => &self.usdc,
            Asset::Btc => &self.btc,
        }
    }

    /// Resolve a symbol (`USDC`, `btc`) or a full coin type
    pub fn resolve(&self, token: &str) -> Option<&TokenInfo> {
        let token = token.trim();
        [&self.usdc, &self.btc].into_iter().find(|info| {
            info.symbol().eq_ignore_ascii_case(token) || same_coin_type(&info.coin_type, token)
        })
    }

    pub fn resolve_or_err(&self, token: &str, field: &'static str) -> Result<&TokenInfo> {
        self.resolve(token)
            .ok_or_else(|| Error::validation(field, format!("unknown token {}", token)))
    }
}

/// Coin types compare equal regardless of address zero-padding and case
pub fn same_coin_type(a: &str, b: &str) -> bool {
    normalize_coin_type(a) == normalize_coin_type(b)
}

fn normalize_coin_type(coin_type: &str) -> String {
    let mut parts = coin_type.trim().splitn(2, "::");
    let address = parts.next().unwrap_or_default();
    let rest = parts.next().unwrap_or_default();
    let digits = address.strip_prefix("0x").unwrap_or(address).trim_start_matches('0');
    format!("0x{}::{}", digits.to_ascii_lowercase(), rest)
}

/// Parse a whole-unit decimal string (`"1.5"`) into smallest units.
///
/// Fractional digits beyond `decimals` are rejected rather than rounded.
pub fn parse_units(amount: &str, decimals: u8) -> Result<u64> {
    let amount = amount.trim();
    let (whole, frac) = amount.split_once('.').unwrap_or((amount, ""));
    if whole.is_empty() && frac.is_empty() {
        return Err(Error::validation("amount", "empty amount"));
    }
    if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit()) {
        return Err(Error::validation("amount", format!("not a decimal number: {}", amount)));
    }
    if frac.len() > decimals as usize {
        return Err(Error::validation(
            "amount",
            format!("more than {} fractional digits: {}", decimals, amount),
        ));
    }

    let scale = 10u128.pow(decimals as u32);
    let whole: u128 = if whole.is_empty() {
        0
    } else {
        whole
            .parse()
            .map_err(|_| Error::validation("amount", format!("out of range: {}", amount)))?
    };
    let frac_padded = format!("{:0<width$}", frac, width = decimals as usize);
    let frac: u128 = if frac_padded.is_empty() {
        0
    } else {
        frac_padded
            .parse()
            .map_err(|_| Error::validation("amount", format!("out of range: {}", amount)))?
    };

    let total = whole
        .checked_mul(scale)
        .and_then(|w| w.checked_add(frac))
        .ok_or(Error::MathOverflow)?;
    u64::try_from(total).map_err(|_| Error::MathOverflow)
}

/// Render smallest units as a whole-unit decimal string, trailing zeros trimmed.
pub fn format_units(amount: u128, decimals: u8) -> String {
    let scale = 10u128.pow(decimals as u32);
    let whole = amount / scale;
    let frac = amount % scale;
    if frac == 0 {
        return whole.to_string();
    }
    let frac = format!("{:0>width$}", frac, width = decimals as usize);
    format!("{}.{}", whole, frac.trim_end_matches('0'))
}
