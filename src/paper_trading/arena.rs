//! In-memory arena state
//!
//! Mirrors the on-chain season manager closely enough that the readers in
//! this crate cannot tell the difference: objects are rendered in the same
//! JSON shape the node returns, and a trade either applies completely
//! (balances, pool reserves, history record) or not at all.

use crate::audit::AuditPointer;
use crate::config::ArenaObjects;
use crate::history::fill_price;
use crate::ledger::{LedgerObject, SubmissionReceipt, TradeCall, TradeDirection};
use crate::quote::swap_output;
use crate::season::SeasonStatus;
use crate::trade::TradeAction;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::PaperModeConfig;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperPool {
    pub reserve_usdc: u64,
    pub reserve_btc: u64,
    pub lp_supply: u64,
    pub fee_bps: u64,
    pub paused: bool,
    pub version: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperTradeRecord {
    pub timestamp: u64,
    pub action: TradeAction,
    pub usdc_amount: u64,
    pub btc_amount: u64,
    pub entry_price: u64,
    pub reasoning: String,
    pub confidence: u8,
    pub audit_pointer: AuditPointer,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperVault {
    pub agent_id: String,
    pub usdc_balance: u64,
    pub btc_balance: u64,
    pub initial_deposit: u64,
    pub trading_paused: bool,
    pub trades: Vec<PaperTradeRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperSeason {
    pub season_number: u64,
    pub status: SeasonStatus,
    pub vaults: Vec<PaperVault>,
}

/// Whole simulated deployment: one pool and the season registry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperArena {
    pub objects: ArenaObjects,
    pub pool: PaperPool,
    pub seasons: Vec<PaperSeason>,
    pub season_version: u64,
    /// Last ledger timestamp handed out
    pub clock_ms: u64,
    pub transactions: u64,
}

impl PaperArena {
    /// Fresh arena with one active season and a funded vault per agent
    pub fn new(config: &PaperModeConfig, objects: &ArenaObjects) -> Self {
        let lp_supply = ((config.pool_usdc_reserve as f64) * (config.pool_btc_reserve as f64)).sqrt() as u64;
        let vaults = config
            .agents
            .iter()
            .map(|agent| PaperVault {
                agent_id: agent.clone(),
                usdc_balance: config.initial_deposit,
                btc_balance: 0,
                initial_deposit: config.initial_deposit,
                trading_paused: false,
                trades: Vec::new(),
            })
            .collect();

        Self {
            objects: objects.clone(),
            pool: PaperPool {
                reserve_usdc: config.pool_usdc_reserve,
                reserve_btc: config.pool_btc_reserve,
                lp_supply,
                fee_bps: config.fee_bps,
                paused: false,
                version: 1,
            },
            seasons: vec![PaperSeason {
                season_number: config.season_number,
                status: SeasonStatus::Active,
                vaults,
            }],
            season_version: 1,
            clock_ms: 0,
            transactions: 0,
        }
    }

    pub fn set_pool_paused(&mut self, paused: bool) {
        self.pool.paused = paused;
        self.pool.version += 1;
    }

    pub fn set_season_status(&mut self, season_number: u64, status: SeasonStatus) -> Result<()> {
        let season = self
            .seasons
            .iter_mut()
            .find(|s| s.season_number == season_number)
            .ok_or_else(|| Error::NotFound(format!("season {}", season_number)))?;
        season.status = status;
        self.season_version += 1;
        Ok(())
    }

    pub fn set_vault_paused(&mut self, season_number: u64, agent_id: &str, paused: bool) -> Result<()> {
        let vault = self
            .seasons
            .iter_mut()
            .find(|s| s.season_number == season_number)
            .and_then(|s| s.vaults.iter_mut().find(|v| v.agent_id == agent_id))
            .ok_or_else(|| Error::NotFound(format!("vault season {} / {}", season_number, agent_id)))?;
        vault.trading_paused = paused;
        self.season_version += 1;
        Ok(())
    }

    /// Apply one trade. Every check runs before the first mutation.
    pub fn execute(&mut self, call: &TradeCall, now_ms: u64) -> Result<SubmissionReceipt> {
        if call.season_ref != self.objects.season_global_id {
            return Err(Error::rejection(format!("object {} does not exist", call.season_ref)));
        }
        if call.amount_in == 0 {
            return Err(Error::rejection("amount must be greater than zero"));
        }

        let season_index = self
            .seasons
            .iter()
            .position(|s| s.season_number == call.season_number)
            .ok_or_else(|| Error::rejection(format!("season {} does not exist", call.season_number)))?;
        let season = &self.seasons[season_index];
        if season.status != SeasonStatus::Active {
            return Err(Error::rejection(format!(
                "season {} is not active",
                call.season_number
            )));
        }
        let vault_index = season
            .vaults
            .iter()
            .position(|v| v.agent_id == call.agent_id)
            .ok_or_else(|| Error::rejection(format!("no vault for agent {}", call.agent_id)))?;
        let vault = &season.vaults[vault_index];
        if vault.trading_paused {
            return Err(Error::rejection(format!("trading is paused for {}", call.agent_id)));
        }
        if vault.trades.iter().any(|t| t.audit_pointer == call.audit_pointer) {
            return Err(Error::rejection(format!(
                "audit pointer {} already recorded",
                call.audit_pointer
            )));
        }
        if self.pool.paused {
            return Err(Error::rejection("pool is paused"));
        }

        let (balance, reserve_in, reserve_out, symbol) = match call.direction {
            TradeDirection::Long => (vault.usdc_balance, self.pool.reserve_usdc, self.pool.reserve_btc, "USDC"),
            TradeDirection::Short => (vault.btc_balance, self.pool.reserve_btc, self.pool.reserve_usdc, "BTC"),
        };
        if balance < call.amount_in {
            return Err(Error::rejection(format!(
                "insufficient {} balance: have {}, need {}",
                symbol, balance, call.amount_in
            )));
        }
        let amount_out = swap_output(call.amount_in, reserve_in, reserve_out, self.pool.fee_bps)
            .map_err(|e| Error::rejection(e.to_string()))?;
        if amount_out == 0 {
            return Err(Error::rejection("output amount is zero"));
        }
        let new_reserve_in = reserve_in
            .checked_add(call.amount_in)
            .ok_or_else(|| Error::rejection("pool reserve overflow"))?;

        let (usdc_amount, btc_amount) = match call.direction {
            TradeDirection::Long => (call.amount_in, amount_out),
            TradeDirection::Short => (amount_out, call.amount_in),
        };
        let entry_price = fill_price(usdc_amount, btc_amount)?;

        let vault = &self.seasons[season_index].vaults[vault_index];
        let (usdc_balance, btc_balance) = match call.direction {
            TradeDirection::Long => (
                vault.usdc_balance - call.amount_in,
                vault.btc_balance.checked_add(amount_out).ok_or(Error::MathOverflow)?,
            ),
            TradeDirection::Short => (
                vault.usdc_balance.checked_add(amount_out).ok_or(Error::MathOverflow)?,
                vault.btc_balance - call.amount_in,
            ),
        };

        // Checks done; apply everything
        let timestamp = now_ms.max(self.clock_ms);
        self.transactions += 1;
        let digest = blake3::hash(
            format!(
                "{}:{}:{}:{}",
                self.transactions, call.audit_pointer, call.agent_id, timestamp
            )
            .as_bytes(),
        )
        .to_hex()
        .to_string();

        self.clock_ms = timestamp;
        let vault = &mut self.seasons[season_index].vaults[vault_index];
        vault.usdc_balance = usdc_balance;
        vault.btc_balance = btc_balance;
        match call.direction {
            TradeDirection::Long => {
                self.pool.reserve_usdc = new_reserve_in;
                self.pool.reserve_btc -= amount_out;
            }
            TradeDirection::Short => {
                self.pool.reserve_btc = new_reserve_in;
                self.pool.reserve_usdc -= amount_out;
            }
        }
        vault.trades.push(PaperTradeRecord {
            timestamp,
            action: call.direction.action(),
            usdc_amount,
            btc_amount,
            entry_price,
            reasoning: call.reasoning.clone(),
            confidence: call.confidence,
            audit_pointer: call.audit_pointer,
        });
        self.pool.version += 1;
        self.season_version += 1;

        Ok(SubmissionReceipt {
            digest,
            timestamp_ms: Some(timestamp),
            amount_out: Some(amount_out),
        })
    }

    /// Pool rendered as the node renders the dynamic field holding it
    pub fn pool_object(&self) -> LedgerObject {
        let pool_id = &self.objects.pool_id;
        LedgerObject {
            object_id: pool_id.clone(),
            version: self.pool.version,
            object_type: Some(format!(
                "0x2::dynamic_field::Field<0x1::string::String, {}::dex::Pool<{}, {}>>",
                self.objects.package_id, self.objects.usdc_type, self.objects.btc_type
            )),
            content: json!({
                "dataType": "moveObject",
                "fields": {
                    "id": { "id": pool_id },
                    "name": "USDC-BTC",
                    "value": {
                        "type": format!("{}::dex::Pool", self.objects.package_id),
                        "fields": {
                            "coin_x": self.pool.reserve_usdc.to_string(),
                            "coin_y": self.pool.reserve_btc.to_string(),
                            "lp_supply": { "fields": { "value": self.pool.lp_supply.to_string() } },
                            "fee_bps": self.pool.fee_bps.to_string(),
                            "has_paused": self.pool.paused
                        }
                    }
                }
            }),
        }
    }

    /// Season registry rendered with `VecMap` contents
    pub fn season_object(&self) -> LedgerObject {
        let seasons: Vec<Value> = self
            .seasons
            .iter()
            .map(|season| {
                let vaults: Vec<Value> = season
                    .vaults
                    .iter()
                    .map(|vault| json!({ "key": vault.agent_id, "value": { "fields": render_vault(vault) } }))
                    .collect();
                json!({
                    "key": season.season_number.to_string(),
                    "value": { "fields": {
                        "status": season.status.code().to_string(),
                        "ai_vaults": { "fields": { "contents": vaults } }
                    } }
                })
            })
            .collect();

        LedgerObject {
            object_id: self.objects.season_global_id.clone(),
            version: self.season_version,
            object_type: Some(format!("{}::season_manager::SeasonGlobal", self.objects.package_id)),
            content: json!({
                "dataType": "moveObject",
                "fields": {
                    "id": { "id": self.objects.season_global_id },
                    "seasons": { "fields": { "contents": seasons } }
                }
            }),
        }
    }
}

fn render_vault(vault: &PaperVault) -> Value {
    let history: Vec<Value> = vault
        .trades
        .iter()
        .map(|trade| {
            json!({ "fields": {
                "timestamp": trade.timestamp.to_string(),
                "ai_model": vault.agent_id,
                "action": trade.action.to_string(),
                "pair": "USDC/BTC",
                "usdc_amount": trade.usdc_amount.to_string(),
                "btc_amount": trade.btc_amount.to_string(),
                "entry_price": trade.entry_price.to_string(),
                "exit_price": { "vec": [] },
                "pnl": { "vec": [] },
                "reasoning": trade.reasoning,
                "confidence": trade.confidence.to_string(),
                "walrus_blob_id": trade.audit_pointer.as_bytes().to_vec()
            } })
        })
        .collect();
    json!({
        "usdc_balance": vault.usdc_balance.to_string(),
        "btc_balance": vault.btc_balance.to_string(),
        "initial_deposit": vault.initial_deposit.to_string(),
        "trading_paused": vault.trading_paused,
        "trade_history": history
    })
}
