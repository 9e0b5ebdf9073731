//! Paper trading module
//!
//! Runs the arena without a node:
//! - One constant-product USDC/BTC pool and one active season
//! - A funded vault per configured agent
//! - Trades apply atomically against in-memory state
//! - State persists across restarts when a state file is configured
//!
//! Paper trading never signs or submits actual transactions.

mod arena;

pub use arena::{PaperArena, PaperPool, PaperSeason, PaperTradeRecord, PaperVault};

use crate::config::ArenaObjects;
use crate::ledger::{Ledger, LedgerObject, SubmissionReceipt, TradeCall};
use crate::season::{decode_seasons, AgentVault, SeasonStatus};
use crate::{Error, Result};
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Paper trading configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PaperModeConfig {
    /// Run against the simulated arena instead of a node
    pub enabled: bool,
    /// Path to persist state (optional)
    pub state_file: Option<String>,
    /// USDC deposited into each vault (6 decimals)
    pub initial_deposit: u64,
    /// Starting USDC reserve of the pool (6 decimals)
    pub pool_usdc_reserve: u64,
    /// Starting BTC reserve of the pool (8 decimals)
    pub pool_btc_reserve: u64,
    pub fee_bps: u64,
    pub agents: Vec<String>,
    pub season_number: u64,
}

impl Default for PaperModeConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            state_file: None,
            initial_deposit: 10_000_000_000,
            pool_usdc_reserve: 1_000_000_000_000,
            pool_btc_reserve: 1_500_000_000,
            fee_bps: 30,
            agents: ["deepseek", "claude", "gemini", "gpt"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            season_number: 1,
        }
    }
}

/// Thread-safe simulated ledger
#[derive(Clone)]
pub struct PaperLedger {
    arena: Arc<RwLock<PaperArena>>,
    state_file: Option<String>,
}

impl PaperLedger {
    pub fn new(config: &PaperModeConfig, objects: &ArenaObjects) -> Self {
        Self {
            arena: Arc::new(RwLock::new(PaperArena::new(config, objects))),
            state_file: config.state_file.clone(),
        }
    }

    /// Load state from a file, or create new if file doesn't exist
    pub async fn load_or_create(config: &PaperModeConfig, objects: &ArenaObjects) -> Result<Self> {
        if let Some(ref path) = config.state_file {
            if Path::new(path).exists() {
                let content = tokio::fs::read_to_string(path).await?;
                let arena: PaperArena = serde_json::from_str(&content)?;
                if arena.objects != *objects {
                    tracing::warn!(path = %path, "Paper state was created for different arena objects");
                }
                tracing::info!(path = %path, transactions = arena.transactions, "Loaded paper arena state");
                return Ok(Self {
                    arena: Arc::new(RwLock::new(arena)),
                    state_file: config.state_file.clone(),
                });
            }
        }
        Ok(Self::new(config, objects))
    }

    /// Save state to the configured file
    pub async fn save(&self) -> Result<()> {
        if let Some(ref path) = self.state_file {
            let arena = self.arena.read().await;
            save_to_file(&arena, path).await
        } else {
            Ok(())
        }
    }

    /// Copy of the whole simulated state
    pub async fn snapshot(&self) -> PaperArena {
        self.arena.read().await.clone()
    }

    /// Vault as the season reader would decode it
    pub async fn vault_snapshot(&self, season_number: u64, agent_id: &str) -> Option<AgentVault> {
        let object = self.arena.read().await.season_object();
        decode_seasons(&object)
            .ok()?
            .into_iter()
            .find(|s| s.season_number == season_number)?
            .vaults
            .into_iter()
            .find(|v| v.agent_id == agent_id)
    }

    pub async fn set_pool_paused(&self, paused: bool) {
        self.arena.write().await.set_pool_paused(paused);
    }

    pub async fn set_season_status(&self, season_number: u64, status: SeasonStatus) -> Result<()> {
        self.arena.write().await.set_season_status(season_number, status)
    }

    pub async fn set_vault_paused(&self, season_number: u64, agent_id: &str, paused: bool) -> Result<()> {
        self.arena
            .write()
            .await
            .set_vault_paused(season_number, agent_id, paused)
    }
}

async fn save_to_file(arena: &PaperArena, path: &str) -> Result<()> {
    let content = serde_json::to_string_pretty(arena)?;
    tokio::fs::write(path, content).await?;
    Ok(())
}

#[async_trait]
impl Ledger for PaperLedger {
    fn name(&self) -> &str {
        "paper"
    }

    async fn get_object(&self, object_id: &str) -> Result<Option<LedgerObject>> {
        let arena = self.arena.read().await;
        if object_id == arena.objects.pool_id {
            Ok(Some(arena.pool_object()))
        } else if object_id == arena.objects.season_global_id {
            Ok(Some(arena.season_object()))
        } else {
            Ok(None)
        }
    }

    async fn submit_trade(&self, call: &TradeCall) -> Result<SubmissionReceipt> {
        let mut arena = self.arena.write().await;
        let now_ms = u64::try_from(Utc::now().timestamp_millis())
            .map_err(|_| Error::Config("system clock is before the epoch".to_string()))?;
        let receipt = arena.execute(call, now_ms)?;

        tracing::info!(
            digest = %receipt.digest,
            agent = %call.agent_id,
            direction = ?call.direction,
            amount_in = call.amount_in,
            amount_out = ?receipt.amount_out,
            "Paper trade applied"
        );

        // Auto-save if state file is configured
        if let Some(ref path) = self.state_file {
            if let Err(e) = save_to_file(&arena, path).await {
                tracing::warn!("Failed to auto-save paper arena state: {}", e);
            }
        }
        Ok(receipt)
    }
}
