//! Trade arena tool
//!
//! One tool, many actions, dispatched on the `action` tag:
//! - pool, quote, season, position and history reads
//! - `execute_long` / `execute_short` trade submission
//!
//! Amounts are integers in smallest units (USDC 6 decimals, BTC 8).
//! Responses echo formatted amounts next to the raw ones.

use super::{AgentTool, AnyJson, TOOL_ARENA};
use crate::audit::TradeRationale;
use crate::history::{sort_by_recency, summarize};
use crate::ledger::TradeDirection;
use crate::quote::SwapQuoteEngine;
use crate::runtime::ArenaRuntime;
use crate::season::VaultRef;
use crate::tokens::{format_units, Asset};
use crate::trade::{truncate_reasoning, TradeOutcome, TradeRequest};
use crate::vault::ReferencePrice;
use crate::{Error, Result};
use async_trait::async_trait;
use chrono::Utc;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ArenaToolInput {
    /// Reserves, fee and pause flag of the arena pool
    GetPoolInfo {
        /// Pool object id; the configured pool when omitted
        #[serde(default)]
        pool_ref: Option<String>,
    },
    /// Expected output of a swap against the current pool state
    GetSwapQuote {
        /// `USDC`, `BTC`, or a full coin type
        token_in: String,
        token_out: String,
        /// Smallest units of `token_in`
        amount_in: u64,
    },
    /// Season status and participating agents
    GetSeasonInfo {
        /// Current season when omitted
        #[serde(default)]
        season_number: Option<u64>,
    },
    /// Vault value and PnL
    GetVaultPosition {
        #[serde(default)]
        season_number: Option<u64>,
        /// The configured agent when omitted
        #[serde(default)]
        agent_id: Option<String>,
        /// USDC per BTC as a decimal string; pool mid price when omitted
        #[serde(default)]
        reference_price: Option<String>,
    },
    /// Decoded trades, newest first
    GetTradeHistory {
        #[serde(default)]
        season_number: Option<u64>,
        #[serde(default)]
        agent_id: Option<String>,
        #[serde(default)]
        limit: Option<usize>,
    },
    /// Spend USDC for BTC
    ExecuteLong(TradeArgs),
    /// Spend BTC for USDC
    ExecuteShort(TradeArgs),
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TradeArgs {
    /// Smallest units of the asset spent
    pub amount: u64,
    /// Full rationale; stored off-ledger, truncated on-ledger
    pub reasoning: String,
    /// 0 to 100
    pub confidence: u32,
    /// Hex pointer to an already stored rationale
    #[serde(default)]
    pub audit_pointer: Option<String>,
    #[serde(default)]
    pub season_number: Option<u64>,
    #[serde(default)]
    pub agent_id: Option<String>,
    /// Market snapshot stored with the rationale
    #[serde(default)]
    pub market_context: Option<Value>,
}

/// Agent-facing arena tool
pub struct ArenaTool {
    runtime: Arc<ArenaRuntime>,
}

impl ArenaTool {
    pub fn new(runtime: Arc<ArenaRuntime>) -> Self {
        Self { runtime }
    }

    async fn season_or_current(&self, season_number: Option<u64>) -> Result<u64> {
        match season_number {
            Some(n) => Ok(n),
            None => Ok(self.runtime.seasons().current_season().await?.season_number),
        }
    }

    fn agent_or_configured(&self, agent_id: Option<String>) -> Result<String> {
        match agent_id {
            Some(agent) => Ok(agent),
            None => Ok(self.runtime.config().require_agent()?.to_string()),
        }
    }

    async fn get_pool_info(&self, pool_ref: Option<String>) -> Result<Value> {
        let pools = self.runtime.pools();
        let pool_ref = pool_ref.unwrap_or_else(|| pools.default_pool_ref().to_string());
        let pool = pools.get_pool_state(&pool_ref).await?;
        let tokens = self.runtime.tokens();
        let decimals = |coin_type: &str| tokens.resolve(coin_type).map(|t| t.decimals()).unwrap_or(0);

        Ok(json!({
            "action": "get_pool_info",
            "pool": pool,
            "reserve_x_formatted": format_units(pool.reserve_x as u128, decimals(&pool.asset_x)),
            "reserve_y_formatted": format_units(pool.reserve_y as u128, decimals(&pool.asset_y)),
            "fee_percent": pool.fee_bps as f64 / 100.0,
        }))
    }

    async fn get_swap_quote(&self, token_in: &str, token_out: &str, amount_in: u64) -> Result<Value> {
        let tokens = self.runtime.tokens();
        let input = tokens.resolve_or_err(token_in, "token_in")?;
        let output = tokens.resolve_or_err(token_out, "token_out")?;
        let pool = self.runtime.pools().get_default_pool().await?;
        let quote = SwapQuoteEngine::quote(&input.coin_type, &output.coin_type, amount_in, &pool)?;
        let slippage_bps = self.runtime.config().risk.slippage_bps;

        Ok(json!({
            "action": "get_swap_quote",
            "quote": quote,
            "amount_in_formatted": format!("{} {}", format_units(amount_in as u128, input.decimals()), input.symbol()),
            "amount_out_formatted": format!("{} {}", format_units(quote.amount_out as u128, output.decimals()), output.symbol()),
            "min_amount_out": quote.min_amount_out(slippage_bps),
            "slippage_bps": slippage_bps,
        }))
    }

    async fn get_season_info(&self, season_number: Option<u64>) -> Result<Value> {
        let seasons = self.runtime.seasons();
        let season = match season_number {
            Some(n) => seasons.get_season(n).await?,
            None => seasons.current_season().await?,
        };
        let agents: Vec<Value> = season
            .vaults
            .iter()
            .map(|v| {
                json!({
                    "agent_id": v.agent_id,
                    "trading_paused": v.trading_paused,
                    "trades": v.trade_history.len(),
                })
            })
            .collect();

        Ok(json!({
            "action": "get_season_info",
            "season_number": season.season_number,
            "status": season.status,
            "agents": agents,
        }))
    }

    async fn get_vault_position(
        &self,
        season_number: Option<u64>,
        agent_id: Option<String>,
        reference_price: Option<String>,
    ) -> Result<Value> {
        let agent_id = self.agent_or_configured(agent_id)?;
        let season_number = self.season_or_current(season_number).await?;
        let price = match reference_price {
            Some(text) => ReferencePrice::from_decimal_str(&text)?,
            None => self.runtime.oracle().reference_price().await?,
        };
        let position = self
            .runtime
            .accountant()
            .get_position(&VaultRef::new(season_number, agent_id), price)
            .await?;

        Ok(json!({
            "action": "get_vault_position",
            "position": position,
            "current_value_formatted": format_units(position.current_value as u128, Asset::Usdc.decimals()),
        }))
    }

    async fn get_trade_history(
        &self,
        season_number: Option<u64>,
        agent_id: Option<String>,
        limit: Option<usize>,
    ) -> Result<Value> {
        let agent_id = self.agent_or_configured(agent_id)?;
        let season_number = self.season_or_current(season_number).await?;
        let mut history = self
            .runtime
            .history()
            .vault_history(&VaultRef::new(season_number, agent_id))
            .await?;
        let summary = summarize(&history.records);
        sort_by_recency(&mut history.records);
        if let Some(limit) = limit {
            history.records.truncate(limit);
        }

        Ok(json!({
            "action": "get_trade_history",
            "vault": history.vault,
            "trades": history.records,
            "summary": summary,
            "malformed": history.errors,
        }))
    }

    async fn execute_trade(&self, direction: TradeDirection, args: TradeArgs) -> Result<Value> {
        let agent_id = self.agent_or_configured(args.agent_id)?;
        let season_number = self.season_or_current(args.season_number).await?;
        let confidence = u8::try_from(args.confidence)
            .ok()
            .filter(|c| *c <= 100)
            .ok_or_else(|| {
                Error::validation("confidence", format!("{} is outside 0..=100", args.confidence))
            })?;

        let audit_pointer = match args.audit_pointer {
            Some(pointer) => pointer,
            None => {
                let rationale = TradeRationale {
                    agent_id: agent_id.clone(),
                    action: direction.action(),
                    season_number,
                    reasoning: args.reasoning.clone(),
                    confidence,
                    market_context: args.market_context.unwrap_or(Value::Null),
                    created_at: Utc::now(),
                };
                self.runtime.record_rationale(&rationale).await?.to_hex()
            }
        };

        let request = TradeRequest {
            season_number,
            agent_id,
            action: direction.action(),
            amount: args.amount,
            reasoning: truncate_reasoning(&args.reasoning),
            confidence: args.confidence,
            audit_pointer,
        };
        let outcome = self.runtime.executor().execute(request).await?;

        let status = match &outcome {
            TradeOutcome::Confirmed(_) => "confirmed",
            TradeOutcome::AlreadyRecorded { .. } => "already_recorded",
        };
        let action = match direction {
            TradeDirection::Long => "execute_long",
            TradeDirection::Short => "execute_short",
        };
        Ok(json!({
            "action": action,
            "status": status,
            "ledger": self.runtime.ledger().name(),
            "outcome": outcome,
        }))
    }
}

#[async_trait]
impl AgentTool for ArenaTool {
    const NAME: &'static str = TOOL_ARENA;
    type Input = ArenaToolInput;
    type Output = AnyJson;

    fn description(&self) -> &'static str {
        "Trade arena tool. Read the USDC/BTC pool, quote swaps, inspect seasons, \
         value vaults and read decoded trade history. execute_long and execute_short \
         submit a trade together with its audit pointer in one atomic ledger call."
    }

    async fn execute(&self, input: Self::Input) -> Result<Self::Output> {
        let result = match input {
            ArenaToolInput::GetPoolInfo { pool_ref } => self.get_pool_info(pool_ref).await?,
            ArenaToolInput::GetSwapQuote {
                token_in,
                token_out,
                amount_in,
            } => self.get_swap_quote(&token_in, &token_out, amount_in).await?,
            ArenaToolInput::GetSeasonInfo { season_number } => {
                self.get_season_info(season_number).await?
            }
            ArenaToolInput::GetVaultPosition {
                season_number,
                agent_id,
                reference_price,
            } => {
                self.get_vault_position(season_number, agent_id, reference_price)
                    .await?
            }
            ArenaToolInput::GetTradeHistory {
                season_number,
                agent_id,
                limit,
            } => self.get_trade_history(season_number, agent_id, limit).await?,
            ArenaToolInput::ExecuteLong(args) => {
                self.execute_trade(TradeDirection::Long, args).await?
            }
            ArenaToolInput::ExecuteShort(args) => {
                self.execute_trade(TradeDirection::Short, args).await?
            }
        };

        Ok(AnyJson::new(result))
    }
}
