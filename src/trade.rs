//! Trade requests, drafts and the trade executor
//!
//! A trade moves through `Drafting -> Submitted -> {Confirmed, Failed}`.
//! Everything that can be checked locally is checked while the draft is
//! still Drafting; abandoning a draft at that point records nothing.
//!
//! # Submission
//!
//! The conversion and its audit entry (confidence, reasoning, audit pointer,
//! ledger timestamp) go to the ledger as one call, so a trade is either fully
//! recorded or not recorded at all. Rejections come back as
//! [`Error::LedgerRejection`] and are never retried here. Re-submitting an
//! audit pointer the vault already holds is detected and reported as
//! [`TradeOutcome::AlreadyRecorded`] without a second ledger write.

use crate::audit::AuditPointer;
use crate::config::ArenaObjects;
use crate::history::contains_audit_pointer;
use crate::interceptors::{InterceptorDecision, TradeContext, TradeInterceptor};
use crate::ledger::{Ledger, SubmissionReceipt, TradeCall, TradeDirection};
use crate::pool::PoolStateReader;
use crate::quote::{SwapQuote, SwapQuoteEngine};
use crate::season::{SeasonReader, VaultRef};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

/// Longest reasoning the ledger stores alongside a trade
pub const MAX_REASONING_CHARS: usize = 100;

/// Trade action as stored in history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeAction {
    Long,
    Short,
    Close,
}

impl TradeAction {
    pub fn code(&self) -> u64 {
        match self {
            TradeAction::Long => 0,
            TradeAction::Short => 1,
            TradeAction::Close => 2,
        }
    }

    pub fn from_code(code: u64) -> Option<Self> {
        match code {
            0 => Some(TradeAction::Long),
            1 => Some(TradeAction::Short),
            2 => Some(TradeAction::Close),
            _ => None,
        }
    }

    pub fn parse(text: &str) -> Option<Self> {
        match text.trim().to_ascii_uppercase().as_str() {
            "LONG" => Some(TradeAction::Long),
            "SHORT" => Some(TradeAction::Short),
            "CLOSE" => Some(TradeAction::Close),
            _ => None,
        }
    }
}

impl fmt::Display for TradeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TradeAction::Long => "LONG",
            TradeAction::Short => "SHORT",
            TradeAction::Close => "CLOSE",
        };
        f.write_str(label)
    }
}

/// Cut reasoning to the stored limit, marking the cut with `...`
pub fn truncate_reasoning(reasoning: &str) -> String {
    if reasoning.chars().count() <= MAX_REASONING_CHARS {
        return reasoning.to_string();
    }
    let kept: String = reasoning.chars().take(MAX_REASONING_CHARS - 3).collect();
    format!("{}...", kept)
}

/// Trade as requested by an agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TradeRequest {
    /// Season to trade in (1-based)
    pub season_number: u64,
    /// Vault key of the trading agent
    pub agent_id: String,
    /// LONG spends USDC for BTC, SHORT spends BTC for USDC
    pub action: TradeAction,
    /// Input amount in smallest units: USDC (6 decimals) for LONG, BTC (8 decimals) for SHORT
    pub amount: u64,
    /// Short rationale stored with the trade (at most 100 characters)
    pub reasoning: String,
    /// Confidence from 0 to 100
    pub confidence: u32,
    /// Hex pointer to the full stored rationale (32 bytes)
    pub audit_pointer: String,
}

/// A request that passed every local check
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedTrade {
    pub vault: VaultRef,
    pub direction: TradeDirection,
    pub amount_in: u64,
    pub reasoning: String,
    pub confidence: u8,
    pub audit_pointer: AuditPointer,
}

impl TradeRequest {
    /// Check every field locally; errors name the offending field.
    pub fn validate(&self) -> Result<ValidatedTrade> {
        if self.season_number == 0 {
            return Err(Error::validation("season_number", "must be at least 1"));
        }
        if self.agent_id.trim().is_empty() {
            return Err(Error::validation("agent_id", "must not be empty"));
        }
        let direction = TradeDirection::from_action(self.action).ok_or_else(|| {
            Error::validation("action", format!("{} cannot be submitted, use LONG or SHORT", self.action))
        })?;
        if self.amount == 0 {
            return Err(Error::validation("amount", "must be greater than zero"));
        }
        let confidence = u8::try_from(self.confidence)
            .ok()
            .filter(|c| *c <= 100)
            .ok_or_else(|| {
                Error::validation("confidence", format!("{} is outside 0..=100", self.confidence))
            })?;
        let reasoning_len = self.reasoning.chars().count();
        if reasoning_len > MAX_REASONING_CHARS {
            return Err(Error::validation(
                "reasoning",
                format!("{} characters exceeds {}", reasoning_len, MAX_REASONING_CHARS),
            ));
        }
        let audit_pointer = AuditPointer::from_hex(&self.audit_pointer).map_err(|e| match e {
            Error::Decode { reason, .. } => Error::validation("audit_pointer", reason),
            other => other,
        })?;

        Ok(ValidatedTrade {
            vault: VaultRef::new(self.season_number, self.agent_id.clone()),
            direction,
            amount_in: self.amount,
            reasoning: self.reasoning.clone(),
            confidence,
            audit_pointer,
        })
    }
}

/// Lifecycle of one trade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeState {
    Drafting,
    Submitted,
    Confirmed,
    Failed,
}

impl TradeState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TradeState::Confirmed | TradeState::Failed)
    }

    fn can_transition_to(&self, next: TradeState) -> bool {
        matches!(
            (self, next),
            (TradeState::Drafting, TradeState::Submitted)
                | (TradeState::Drafting, TradeState::Confirmed)
                | (TradeState::Submitted, TradeState::Confirmed)
                | (TradeState::Submitted, TradeState::Failed)
        )
    }
}

/// A trade being prepared or submitted
#[derive(Debug, Clone, Serialize)]
pub struct TradeDraft {
    id: Uuid,
    request: TradeRequest,
    state: TradeState,
    created_at: DateTime<Utc>,
}

impl TradeDraft {
    pub fn new(request: TradeRequest) -> Self {
        Self {
            id: Uuid::new_v4(),
            request,
            state: TradeState::Drafting,
            created_at: Utc::now(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> TradeState {
        self.state
    }

    pub fn request(&self) -> &TradeRequest {
        &self.request
    }

    /// Edit the request; only possible before submission
    pub fn request_mut(&mut self) -> Result<&mut TradeRequest> {
        if self.state != TradeState::Drafting {
            return Err(Error::validation("state", format!("draft is {:?}", self.state)));
        }
        Ok(&mut self.request)
    }

    /// Drop a draft that never reached the ledger
    pub fn abandon(self) -> Result<TradeRequest> {
        if self.state != TradeState::Drafting {
            return Err(Error::validation(
                "state",
                format!("draft {} is {:?} and can no longer be abandoned", self.id, self.state),
            ));
        }
        tracing::debug!(draft = %self.id, "Abandoned trade draft");
        Ok(self.request)
    }

    fn transition(&mut self, next: TradeState) {
        debug_assert!(self.state.can_transition_to(next), "{:?} -> {:?}", self.state, next);
        tracing::debug!(draft = %self.id, from = ?self.state, to = ?next, "Trade state change");
        self.state = next;
    }
}

/// Accepted submission details
#[derive(Debug, Clone, Serialize)]
pub struct TradeConfirmation {
    pub draft_id: Uuid,
    pub vault: VaultRef,
    pub direction: TradeDirection,
    pub amount_in: u64,
    /// Local quote at submission time
    pub quote: SwapQuote,
    /// Quote output less the configured slippage tolerance
    pub min_amount_out: u64,
    pub audit_pointer: AuditPointer,
    pub receipt: SubmissionReceipt,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TradeOutcome {
    Confirmed(TradeConfirmation),
    /// The vault already holds a trade with this audit pointer
    AlreadyRecorded { audit_pointer: AuditPointer },
}

/// Validates and submits trades
pub struct TradeExecutor {
    ledger: Arc<dyn Ledger>,
    objects: ArenaObjects,
    pools: PoolStateReader,
    seasons: SeasonReader,
    interceptors: Vec<Arc<dyn TradeInterceptor>>,
    slippage_bps: u64,
}

impl TradeExecutor {
    pub fn new(ledger: Arc<dyn Ledger>, objects: ArenaObjects) -> Self {
        let pools = PoolStateReader::new(ledger.clone(), &objects);
        let seasons = SeasonReader::new(ledger.clone(), objects.season_global_id.clone());
        Self {
            ledger,
            objects,
            pools,
            seasons,
            interceptors: Vec::new(),
            slippage_bps: 0,
        }
    }

    pub fn with_interceptor(mut self, interceptor: Arc<dyn TradeInterceptor>) -> Self {
        self.interceptors.push(interceptor);
        self
    }

    pub fn with_slippage_bps(mut self, slippage_bps: u64) -> Self {
        self.slippage_bps = slippage_bps;
        self
    }

    /// Draft, validate and submit in one step
    pub async fn execute(&self, request: TradeRequest) -> Result<TradeOutcome> {
        let mut draft = TradeDraft::new(request);
        self.submit(&mut draft).await
    }

    /// Submit a Drafting trade.
    ///
    /// Validation, idempotency, pause and interceptor failures leave the
    /// draft in Drafting. Once the ledger call is made the draft ends
    /// Confirmed or Failed.
    pub async fn submit(&self, draft: &mut TradeDraft) -> Result<TradeOutcome> {
        if draft.state != TradeState::Drafting {
            return Err(Error::validation(
                "state",
                format!("draft {} is already {:?}", draft.id, draft.state),
            ));
        }
        let trade = draft.request.validate()?;

        let season = self.seasons.get_season(trade.vault.season_number).await?;
        if !season.is_active() {
            return Err(Error::validation(
                "season_number",
                format!("season {} is {:?}, not active", season.season_number, season.status),
            ));
        }
        let vault = season
            .vault(&trade.vault.agent_id)
            .ok_or_else(|| Error::NotFound(format!("vault {}", trade.vault)))?;

        if contains_audit_pointer(&vault.trade_history, &trade.audit_pointer) {
            tracing::info!(
                draft = %draft.id,
                vault = %trade.vault,
                audit_pointer = %trade.audit_pointer,
                "Trade already recorded, skipping submission"
            );
            draft.transition(TradeState::Confirmed);
            return Ok(TradeOutcome::AlreadyRecorded {
                audit_pointer: trade.audit_pointer,
            });
        }
        if vault.trading_paused {
            return Err(Error::Paused(format!("vault {}", trade.vault)));
        }

        let pool = self.pools.get_default_pool().await?;
        if pool.paused {
            return Err(Error::Paused(format!("pool {}", pool.pool_ref)));
        }
        let (token_in, token_out) = match trade.direction {
            TradeDirection::Long => (&self.objects.usdc_type, &self.objects.btc_type),
            TradeDirection::Short => (&self.objects.btc_type, &self.objects.usdc_type),
        };
        let quote = SwapQuoteEngine::quote(token_in, token_out, trade.amount_in, &pool)?;

        let context = TradeContext {
            draft_id: draft.id,
            vault: trade.vault.clone(),
            direction: trade.direction,
            amount_in: trade.amount_in,
            confidence: trade.confidence,
            audit_pointer: trade.audit_pointer,
            quote: quote.clone(),
        };
        self.run_interceptors(&context).await?;

        let call = TradeCall::for_objects(
            &self.objects,
            trade.vault.season_number,
            &trade.vault.agent_id,
            trade.direction,
            trade.amount_in,
            &trade.reasoning,
            trade.confidence,
            trade.audit_pointer,
        );

        draft.transition(TradeState::Submitted);
        tracing::info!(
            draft = %draft.id,
            ledger = self.ledger.name(),
            vault = %trade.vault,
            direction = ?trade.direction,
            amount_in = trade.amount_in,
            expected_out = quote.amount_out,
            price_impact = quote.price_impact_pct,
            "Submitting trade"
        );

        let started = Instant::now();
        let result = self.ledger.submit_trade(&call).await;
        let duration_ms = started.elapsed().as_millis() as u64;
        for interceptor in &self.interceptors {
            interceptor.on_trade_complete(&context, &result, duration_ms).await;
        }

        match result {
            Ok(receipt) => {
                draft.transition(TradeState::Confirmed);
                tracing::info!(draft = %draft.id, digest = %receipt.digest, "Trade confirmed");
                Ok(TradeOutcome::Confirmed(TradeConfirmation {
                    draft_id: draft.id,
                    vault: trade.vault,
                    direction: trade.direction,
                    amount_in: trade.amount_in,
                    min_amount_out: quote.min_amount_out(self.slippage_bps),
                    quote,
                    audit_pointer: trade.audit_pointer,
                    receipt,
                }))
            }
            Err(e) => {
                draft.transition(TradeState::Failed);
                tracing::warn!(draft = %draft.id, error = %e, "Trade failed");
                Err(e)
            }
        }
    }

    async fn run_interceptors(&self, context: &TradeContext) -> Result<()> {
        for interceptor in &self.interceptors {
            if let InterceptorDecision::Block(reason) = interceptor.intercept_trade(context).await? {
                tracing::warn!(draft = %context.draft_id, reason = %reason, "Trade blocked by interceptor");
                let blocked = Err(Error::Blocked(reason.clone()));
                for observer in &self.interceptors {
                    observer.on_trade_complete(context, &blocked, 0).await;
                }
                return Err(Error::Blocked(reason));
            }
        }
        Ok(())
    }
}
