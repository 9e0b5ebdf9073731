//! Season and vault reader
//!
//! The season global object holds a `VecMap<u64, Season>`; each season holds
//! a `VecMap<String, Vault>` keyed by agent id. Lifecycle is owned by the
//! ledger and only read here. The current season is the last entry.

use crate::ledger::fields::{
    as_u64, field, key_string, optional_u64, required, required_bool, required_u64,
    struct_fields, vec_map_entries,
};
use crate::ledger::{Ledger, LedgerObject};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Season lifecycle, stored on the ledger as `0 | 1 | 2`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SeasonStatus {
    Pre,
    Active,
    Ended,
}

impl SeasonStatus {
    pub fn from_code(code: u64) -> Result<Self> {
        match code {
            0 => Ok(SeasonStatus::Pre),
            1 => Ok(SeasonStatus::Active),
            2 => Ok(SeasonStatus::Ended),
            other => Err(Error::decode("season status", format!("unknown code {}", other))),
        }
    }

    pub fn code(&self) -> u64 {
        match self {
            SeasonStatus::Pre => 0,
            SeasonStatus::Active => 1,
            SeasonStatus::Ended => 2,
        }
    }
}

/// Addresses one agent's vault within one season
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VaultRef {
    pub season_number: u64,
    pub agent_id: String,
}

impl VaultRef {
    pub fn new(season_number: u64, agent_id: impl Into<String>) -> Self {
        Self {
            season_number,
            agent_id: agent_id.into(),
        }
    }
}

impl fmt::Display for VaultRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "season {} / {}", self.season_number, self.agent_id)
    }
}

/// Raw vault balances as stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentVault {
    pub agent_id: String,
    pub trading_paused: bool,
    /// USDC, 6 decimals
    pub usdc_balance: u64,
    /// BTC, 8 decimals
    pub btc_balance: u64,
    /// USDC deposited at season start; `None` when the vault records no baseline
    pub initial_deposit: Option<u64>,
    pub lp_supply: Option<u64>,
    pub authorized_wallet: Option<String>,
    /// Undecoded trade records, in stored order
    pub trade_history: Vec<Value>,
}

impl AgentVault {
    fn decode(agent_id: &str, value: &Value) -> Result<Self> {
        let context = format!("vault {}", agent_id);
        let history = match field(value, "trade_history") {
            Some(Value::Array(items)) => items.clone(),
            Some(_) => return Err(Error::decode(&context, "`trade_history` is not an array")),
            None => return Err(Error::decode(&context, "missing field `trade_history`")),
        };
        Ok(Self {
            agent_id: agent_id.to_string(),
            trading_paused: required_bool(value, "trading_paused", &context)?,
            usdc_balance: required_u64(value, "usdc_balance", &context)?,
            btc_balance: required_u64(value, "btc_balance", &context)?,
            initial_deposit: optional_u64(value, "initial_deposit", &context)?,
            lp_supply: optional_u64(value, "lp_supply", &context)?,
            authorized_wallet: field(value, "authorized_wallet")
                .and_then(Value::as_str)
                .map(str::to_string),
            trade_history: history,
        })
    }
}

/// One season and its agent vaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Season {
    pub season_number: u64,
    pub status: SeasonStatus,
    pub vaults: Vec<AgentVault>,
}

impl Season {
    pub fn vault(&self, agent_id: &str) -> Option<&AgentVault> {
        self.vaults.iter().find(|v| v.agent_id == agent_id)
    }

    pub fn agents(&self) -> impl Iterator<Item = &str> {
        self.vaults.iter().map(|v| v.agent_id.as_str())
    }

    pub fn is_active(&self) -> bool {
        self.status == SeasonStatus::Active
    }

    fn decode(season_number: u64, value: &Value) -> Result<Self> {
        let context = format!("season {}", season_number);
        let status = SeasonStatus::from_code(required_u64(value, "status", &context)?)?;
        let vaults = vec_map_entries(required(value, "ai_vaults", &context)?, &context)?
            .into_iter()
            .map(|(key, vault)| AgentVault::decode(&key_string(key), vault))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            season_number,
            status,
            vaults,
        })
    }
}

/// Decode every season in the global season object, in stored order
pub fn decode_seasons(object: &LedgerObject) -> Result<Vec<Season>> {
    let content = struct_fields(&object.content);
    let seasons = required(content, "seasons", "season registry")?;
    vec_map_entries(seasons, "season registry")?
        .into_iter()
        .map(|(key, value)| {
            let number = as_u64(key, "season key")?;
            Season::decode(number, value)
        })
        .collect()
}

/// Reads seasons and vaults from the ledger
#[derive(Clone)]
pub struct SeasonReader {
    ledger: Arc<dyn Ledger>,
    season_ref: String,
}

impl SeasonReader {
    pub fn new(ledger: Arc<dyn Ledger>, season_ref: impl Into<String>) -> Self {
        Self {
            ledger,
            season_ref: season_ref.into(),
        }
    }

    pub async fn list_seasons(&self) -> Result<Vec<Season>> {
        let object = self
            .ledger
            .get_object(&self.season_ref)
            .await?
            .ok_or_else(|| Error::NotFound(format!("season registry {}", self.season_ref)))?;
        decode_seasons(&object)
    }

    pub async fn get_season(&self, season_number: u64) -> Result<Season> {
        self.list_seasons()
            .await?
            .into_iter()
            .find(|s| s.season_number == season_number)
            .ok_or_else(|| Error::NotFound(format!("season {}", season_number)))
    }

    /// The most recently created season
    pub async fn current_season(&self) -> Result<Season> {
        let season = self
            .list_seasons()
            .await?
            .pop()
            .ok_or_else(|| Error::NotFound("no seasons created".to_string()))?;
        tracing::debug!(
            season = season.season_number,
            status = ?season.status,
            vaults = season.vaults.len(),
            "Resolved current season"
        );
        Ok(season)
    }

    pub async fn get_vault(&self, vault: &VaultRef) -> Result<AgentVault> {
        let season = self.get_season(vault.season_number).await?;
        season
            .vaults
            .into_iter()
            .find(|v| v.agent_id == vault.agent_id)
            .ok_or_else(|| Error::NotFound(format!("vault {}", vault)))
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::test_support::StaticLedger;
    use serde_json::json;

    fn reader() -> SeasonReader {
        let ledger = StaticLedger::default().with_object(fixtures::season_registry("0x323a"));
        SeasonReader::new(Arc::new(ledger), "0x323a")
    }

    #[tokio::test]
    async fn test_current_season_is_last() {
        let season = reader().current_season().await.unwrap();
        assert_eq!(season.season_number, 2);
        assert_eq!(season.status, SeasonStatus::Active);
        assert_eq!(season.agents().collect::<Vec<_>>(), vec!["deepseek", "claude"]);
    }

    #[tokio::test]
    async fn test_vault_fields() {
        let vault = reader()
            .get_vault(&VaultRef::new(2, "deepseek"))
            .await
            .unwrap();
        assert_eq!(vault.usdc_balance, 9_000_000_000);
        assert_eq!(vault.btc_balance, 1_500_000);
        assert_eq!(vault.initial_deposit, Some(10_000_000_000));
        assert_eq!(vault.lp_supply, Some(100));
        assert_eq!(vault.trade_history.len(), 1);

        let claude = reader().get_vault(&VaultRef::new(2, "claude")).await.unwrap();
        assert!(claude.trading_paused);
        assert_eq!(claude.initial_deposit, None);
    }

    #[tokio::test]
    async fn test_missing_objects() {
        assert!(matches!(
            reader().get_season(9).await,
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            reader().get_vault(&VaultRef::new(2, "gpt")).await,
            Err(Error::NotFound(_))
        ));
        let empty = SeasonReader::new(Arc::new(StaticLedger::default()), "0x1");
        assert!(matches!(empty.current_season().await, Err(Error::NotFound(_))));
    }

    #[test]
    fn test_unknown_status_code() {
        assert!(SeasonStatus::from_code(3).is_err());
        assert_eq!(SeasonStatus::from_code(0).unwrap(), SeasonStatus::Pre);
    }

    #[test]
    fn test_vault_missing_balance_fails() {
        let err = AgentVault::decode(
            "x",
            &json!({ "trading_paused": false, "btc_balance": "0", "trade_history": [] }),
        )
        .unwrap_err();
        assert!(err.to_string().contains("usdc_balance"));
    }
}
