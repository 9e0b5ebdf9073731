//! Vault accountant
//!
//! Values a vault's raw balances at a reference price. The volatile balance
//! is multiplied by the price before decimal normalization and everything
//! stays in integer USDC smallest units, so identical inputs always produce
//! identical positions.

use crate::season::{AgentVault, SeasonReader, VaultRef};
use crate::tokens::{format_units, parse_units, BTC_DECIMALS, USDC_DECIMALS};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// USDC smallest units per one whole BTC
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReferencePrice(u64);

impl ReferencePrice {
    pub const fn from_micro_usdc(micro_usdc_per_btc: u64) -> Self {
        Self(micro_usdc_per_btc)
    }

    /// Parse a whole-dollar price such as `"64250.25"` without floating point
    pub fn from_decimal_str(price: &str) -> Result<Self> {
        let micro = parse_units(price, USDC_DECIMALS).map_err(|e| match e {
            Error::Validation { reason, .. } => Error::validation("reference_price", reason),
            other => other,
        })?;
        if micro == 0 {
            return Err(Error::validation("reference_price", "must be greater than zero"));
        }
        Ok(Self(micro))
    }

    pub fn micro_usdc(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ReferencePrice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_units(self.0 as u128, USDC_DECIMALS))
    }
}

/// Derived valuation of one vault; recomputed on every read
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VaultPosition {
    pub vault: VaultRef,
    pub usdc_balance: u64,
    pub btc_balance: u64,
    /// BTC balance valued in USDC smallest units
    pub btc_value: u64,
    /// `usdc_balance + btc_value`
    pub current_value: u64,
    /// Baseline PnL is measured against: the vault's own `initial_deposit`,
    /// else the configured arena-wide starting deposit
    pub initial_deposit: Option<u64>,
    /// `None` when no baseline is known
    pub pnl: Option<i64>,
    /// `None` when the baseline is absent or zero
    pub pnl_pct: Option<f64>,
    pub reference_price: ReferencePrice,
}

/// Value raw balances at `price`. `default_initial_deposit` is the baseline
/// for vaults that do not record their own.
pub fn value_position(
    vault_ref: VaultRef,
    vault: &AgentVault,
    price: ReferencePrice,
    default_initial_deposit: Option<u64>,
) -> Result<VaultPosition> {
    let btc_scale = 10u128.pow(BTC_DECIMALS as u32);
    let btc_value = (vault.btc_balance as u128)
        .checked_mul(price.micro_usdc() as u128)
        .ok_or(Error::MathOverflow)?
        / btc_scale;
    let current_value = (vault.usdc_balance as u128)
        .checked_add(btc_value)
        .ok_or(Error::MathOverflow)?;

    let btc_value = u64::try_from(btc_value).map_err(|_| Error::MathOverflow)?;
    let current_value = u64::try_from(current_value).map_err(|_| Error::MathOverflow)?;

    let initial_deposit = vault.initial_deposit.or(default_initial_deposit);
    let pnl = initial_deposit
        .map(|initial| current_value as i128 - initial as i128)
        .map(|pnl| i64::try_from(pnl).map_err(|_| Error::MathOverflow))
        .transpose()?;
    let pnl_pct = match (pnl, initial_deposit) {
        (Some(pnl), Some(initial)) if initial > 0 => Some(pnl as f64 / initial as f64 * 100.0),
        _ => None,
    };

    Ok(VaultPosition {
        vault: vault_ref,
        usdc_balance: vault.usdc_balance,
        btc_balance: vault.btc_balance,
        btc_value,
        current_value,
        initial_deposit,
        pnl,
        pnl_pct,
        reference_price: price,
    })
}

/// Reads vault balances and values them
#[derive(Clone)]
pub struct VaultAccountant {
    seasons: SeasonReader,
    default_initial_deposit: Option<u64>,
}

impl VaultAccountant {
    pub fn new(seasons: SeasonReader) -> Self {
        Self {
            seasons,
            default_initial_deposit: None,
        }
    }

    /// Baseline for vaults whose ledger object carries no `initial_deposit`
    pub fn with_default_initial_deposit(mut self, initial_deposit: Option<u64>) -> Self {
        self.default_initial_deposit = initial_deposit;
        self
    }

    pub async fn get_position(
        &self,
        vault_ref: &VaultRef,
        reference_price: ReferencePrice,
    ) -> Result<VaultPosition> {
        let vault = self.seasons.get_vault(vault_ref).await?;
        let position = value_position(
            vault_ref.clone(),
            &vault,
            reference_price,
            self.default_initial_deposit,
        )?;
        tracing::debug!(
            vault = %vault_ref,
            current_value = position.current_value,
            pnl = ?position.pnl,
            price = %reference_price,
            "Valued vault"
        );
        Ok(position)
    }

    /// Every vault of a season from one snapshot, ordered by current value
    pub async fn get_positions(
        &self,
        season_number: u64,
        reference_price: ReferencePrice,
    ) -> Result<Vec<VaultPosition>> {
        let season = self.seasons.get_season(season_number).await?;
        let mut positions = season
            .vaults
            .iter()
            .map(|vault| {
                value_position(
                    VaultRef::new(season_number, vault.agent_id.clone()),
                    vault,
                    reference_price,
                    self.default_initial_deposit,
                )
            })
            .collect::<Result<Vec<_>>>()?;
        positions.sort_by(|a, b| b.current_value.cmp(&a.current_value));
        Ok(positions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::test_support::StaticLedger;
    use crate::season::fixtures::season_registry;
    use std::sync::Arc;

    fn vault(usdc: u64, btc: u64, initial: Option<u64>) -> AgentVault {
        AgentVault {
            agent_id: "gpt".to_string(),
            trading_paused: false,
            usdc_balance: usdc,
            btc_balance: btc,
            initial_deposit: initial,
            lp_supply: None,
            authorized_wallet: None,
            trade_history: Vec::new(),
        }
    }

    #[test]
    fn test_reference_price_parse() {
        let price = ReferencePrice::from_decimal_str("64250.25").unwrap();
        assert_eq!(price.micro_usdc(), 64_250_250_000);
        assert_eq!(price.to_string(), "64250.25");
        assert!(ReferencePrice::from_decimal_str("0").is_err());
        assert!(matches!(
            ReferencePrice::from_decimal_str("abc"),
            Err(Error::Validation { field: "reference_price", .. })
        ));
    }

    #[test]
    fn test_value_mixed_balances() {
        // 9,000 USDC + 0.015 BTC at 66,000 = 9,990 USDC against 10,000 deposited
        let price = ReferencePrice::from_decimal_str("66000").unwrap();
        let position = value_position(
            VaultRef::new(1, "gpt"),
            &vault(9_000_000_000, 1_500_000, Some(10_000_000_000)),
            price,
            None,
        )
        .unwrap();
        assert_eq!(position.btc_value, 990_000_000);
        assert_eq!(position.current_value, 9_990_000_000);
        assert_eq!(position.pnl, Some(-10_000_000));
        assert!((position.pnl_pct.unwrap() + 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_sub_unit_btc_is_not_lost() {
        // 1 satoshi at 64,250.25 = 642.5025 micro-USDC, floored once
        let price = ReferencePrice::from_decimal_str("64250.25").unwrap();
        let position = value_position(VaultRef::new(1, "gpt"), &vault(0, 1, Some(0)), price, None).unwrap();
        assert_eq!(position.btc_value, 642);
        assert_eq!(position.pnl, Some(642));
        assert_eq!(position.pnl_pct, None);
    }

    #[test]
    fn test_no_baseline_is_unset_not_zero() {
        let price = ReferencePrice::from_micro_usdc(1);
        let position = value_position(VaultRef::new(1, "gpt"), &vault(5, 0, None), price, None).unwrap();
        assert_eq!(position.pnl, None);
        assert_eq!(position.pnl_pct, None);
    }

    #[test]
    fn test_configured_baseline_applies_without_vault_field() {
        // 3,300 USDC + 0 BTC against the arena-wide 3,000 USDC start
        let price = ReferencePrice::from_decimal_str("66000").unwrap();
        let position = value_position(
            VaultRef::new(1, "gpt"),
            &vault(3_300_000_000, 0, None),
            price,
            Some(3_000_000_000),
        )
        .unwrap();
        assert_eq!(position.initial_deposit, Some(3_000_000_000));
        assert_eq!(position.pnl, Some(300_000_000));
        assert!((position.pnl_pct.unwrap() - 10.0).abs() < 1e-12);

        // A recorded deposit wins over the configured one
        let position = value_position(
            VaultRef::new(1, "gpt"),
            &vault(3_300_000_000, 0, Some(3_300_000_000)),
            price,
            Some(3_000_000_000),
        )
        .unwrap();
        assert_eq!(position.pnl, Some(0));
    }

    #[test]
    fn test_identical_inputs_identical_outputs() {
        let price = ReferencePrice::from_decimal_str("70123.456789").unwrap();
        let v = vault(1_234_567_890, 98_765_432, Some(5_000_000_000));
        let a = value_position(VaultRef::new(3, "gpt"), &v, price, None).unwrap();
        let b = value_position(VaultRef::new(3, "gpt"), &v, price, None).unwrap();
        assert_eq!(a.current_value, b.current_value);
        assert_eq!(a.pnl, b.pnl);
        assert_eq!(
            a.pnl_pct.map(f64::to_bits),
            b.pnl_pct.map(f64::to_bits)
        );
    }

    #[tokio::test]
    async fn test_accountant_reads_ledger_vault() {
        let ledger = StaticLedger::default().with_object(season_registry("0x323a"));
        let accountant = VaultAccountant::new(SeasonReader::new(Arc::new(ledger), "0x323a"));
        let price = ReferencePrice::from_decimal_str("66000").unwrap();

        let position = accountant
            .get_position(&VaultRef::new(2, "deepseek"), price)
            .await
            .unwrap();
        assert_eq!(position.current_value, 9_990_000_000);

        let first = accountant.get_position(&VaultRef::new(2, "deepseek"), price).await.unwrap();
        assert_eq!(first, position);

        let positions = accountant.get_positions(2, price).await.unwrap();
        assert_eq!(positions.len(), 2);
        assert_eq!(positions[0].vault.agent_id, "claude");
        assert_eq!(positions[0].pnl, None);
    }

    #[tokio::test]
    async fn test_accountant_default_baseline() {
        let ledger = StaticLedger::default().with_object(season_registry("0x323a"));
        let accountant = VaultAccountant::new(SeasonReader::new(Arc::new(ledger), "0x323a"))
            .with_default_initial_deposit(Some(3_000_000_000));
        let price = ReferencePrice::from_decimal_str("66000").unwrap();

        // claude's vault object carries no initial_deposit
        let claude = accountant
            .get_position(&VaultRef::new(2, "claude"), price)
            .await
            .unwrap();
        assert_eq!(claude.initial_deposit, Some(3_000_000_000));
        assert_eq!(claude.pnl, Some(7_000_000_000));

        // deepseek's own 10,000 USDC deposit still applies
        let deepseek = accountant
            .get_position(&VaultRef::new(2, "deepseek"), price)
            .await
            .unwrap();
        assert_eq!(deepseek.pnl, Some(-10_000_000));
    }
}
