//! Slippage guard interceptor
//!
//! Blocks trades whose quoted price impact exceeds the configured maximum.

use super::{InterceptorDecision, TradeContext, TradeInterceptor};
use crate::ledger::SubmissionReceipt;
use crate::Result;
use async_trait::async_trait;

/// Interceptor that blocks trades with excessive price impact
pub struct SlippageGuardInterceptor {
    /// Maximum allowed price impact (e.g., 1.0 for 1%)
    max_price_impact_percent: f64,
}

impl SlippageGuardInterceptor {
    /// Create a new slippage guard
    ///
    /// # Arguments
    /// * `max_price_impact_percent` - Maximum allowed price impact (e.g., 1.0 for 1%)
    pub fn new(max_price_impact_percent: f64) -> Self {
        Self {
            max_price_impact_percent,
        }
    }
}

#[async_trait]
impl TradeInterceptor for SlippageGuardInterceptor {
    async fn intercept_trade(&self, context: &TradeContext) -> Result<InterceptorDecision> {
        let impact = context.quote.price_impact_pct;
        if impact > self.max_price_impact_percent {
            return Ok(InterceptorDecision::Block(format!(
                "Quoted price impact {:.2}% exceeds maximum allowed {:.2}%",
                impact, self.max_price_impact_percent
            )));
        }

        tracing::debug!(
            price_impact = impact,
            max_price_impact = self.max_price_impact_percent,
            "Slippage check passed"
        );

        Ok(InterceptorDecision::Allow)
    }

    async fn on_trade_complete(
        &self,
        _context: &TradeContext,
        _result: &Result<SubmissionReceipt>,
        _duration_ms: u64,
    ) {
    }
}
