//! Risk management and audit interceptors
//!
//! These interceptors form a governance pipeline that every trade submission
//! passes through after validation and quoting, and before the ledger call.
//! They can block risky trades and journal every attempt.

mod audit_log;
mod cooldown;
mod slippage_guard;

pub use audit_log::AuditLogInterceptor;
pub use cooldown::CooldownInterceptor;
pub use slippage_guard::SlippageGuardInterceptor;

use crate::audit::AuditPointer;
use crate::ledger::{SubmissionReceipt, TradeDirection};
use crate::quote::SwapQuote;
use crate::season::VaultRef;
use crate::Result;
use async_trait::async_trait;
use serde::Serialize;
use uuid::Uuid;

/// Outcome of an interceptor check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InterceptorDecision {
    Allow,
    Block(String),
}

/// What an interceptor sees about a pending trade
#[derive(Debug, Clone, Serialize)]
pub struct TradeContext {
    pub draft_id: Uuid,
    pub vault: VaultRef,
    pub direction: TradeDirection,
    pub amount_in: u64,
    pub confidence: u8,
    pub audit_pointer: AuditPointer,
    pub quote: SwapQuote,
}

#[async_trait]
pub trait TradeInterceptor: Send + Sync {
    /// Decide whether the trade may be submitted
    async fn intercept_trade(&self, context: &TradeContext) -> Result<InterceptorDecision>;

    /// Called once the submission finished, or was blocked
    async fn on_trade_complete(
        &self,
        context: &TradeContext,
        result: &Result<SubmissionReceipt>,
        duration_ms: u64,
    );
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    pub fn context(agent: &str, price_impact_pct: f64) -> TradeContext {
        TradeContext {
            draft_id: Uuid::new_v4(),
            vault: VaultRef::new(1, agent),
            direction: TradeDirection::Long,
            amount_in: 1_000_000,
            confidence: 60,
            audit_pointer: AuditPointer::new([5; 32]),
            quote: SwapQuote {
                token_in: "USDC".to_string(),
                token_out: "BTC".to_string(),
                amount_in: 1_000_000,
                amount_out: 1_480,
                fee_amount: 3_000,
                ideal_output: 1_500.0,
                price_impact_pct,
                fee_bps: 30,
                reserve_in: 1_000_000_000_000,
                reserve_out: 1_500_000_000,
            },
        }
    }

    pub fn receipt() -> SubmissionReceipt {
        SubmissionReceipt {
            digest: "digest".to_string(),
            timestamp_ms: Some(1),
            amount_out: Some(1_480),
        }
    }
}
