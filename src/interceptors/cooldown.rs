//! Cooldown interceptor
//!
//! Enforces a minimum time between accepted trades of the same agent.

use super::{InterceptorDecision, TradeContext, TradeInterceptor};
use crate::ledger::SubmissionReceipt;
use crate::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Interceptor that enforces cooldown between trades
pub struct CooldownInterceptor {
    /// Minimum time between trades
    cooldown_duration: Duration,
    /// Last accepted trade per agent
    last_trade: Arc<RwLock<HashMap<String, Instant>>>,
}

impl CooldownInterceptor {
    /// Create a new cooldown interceptor
    ///
    /// # Arguments
    /// * `cooldown_seconds` - Minimum seconds between trades
    pub fn new(cooldown_seconds: u64) -> Self {
        Self {
            cooldown_duration: Duration::from_secs(cooldown_seconds),
            last_trade: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

#[async_trait]
impl TradeInterceptor for CooldownInterceptor {
    async fn intercept_trade(&self, context: &TradeContext) -> Result<InterceptorDecision> {
        let last_trade = self.last_trade.read().await;
        if let Some(last) = last_trade.get(&context.vault.agent_id) {
            let elapsed = last.elapsed();
            if elapsed < self.cooldown_duration {
                let remaining = self.cooldown_duration - elapsed;
                return Ok(InterceptorDecision::Block(format!(
                    "Trading cooldown active for {}. Please wait {} more seconds.",
                    context.vault.agent_id,
                    remaining.as_secs()
                )));
            }
        }

        tracing::debug!(
            agent = %context.vault.agent_id,
            cooldown_seconds = self.cooldown_duration.as_secs(),
            "Cooldown check passed"
        );

        Ok(InterceptorDecision::Allow)
    }

    async fn on_trade_complete(
        &self,
        context: &TradeContext,
        result: &Result<SubmissionReceipt>,
        _duration_ms: u64,
    ) {
        if result.is_ok() {
            let mut last_trade = self.last_trade.write().await;
            last_trade.insert(context.vault.agent_id.clone(), Instant::now());
            tracing::info!(agent = %context.vault.agent_id, "Updated last trade timestamp for cooldown tracking");
        }
    }
}
