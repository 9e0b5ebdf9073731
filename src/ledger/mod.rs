//! Ledger access
//!
//! The ledger owns pool, season and vault state. Components read point-in-time
//! object snapshots and submit trades through the [`Ledger`] trait:
//! - [`SuiRpcLedger`] talks to a Sui full node over JSON-RPC
//! - [`crate::paper_trading::PaperLedger`] simulates the arena in memory
//!
//! Nothing here caches objects across calls.

pub mod fields;
mod sui_rpc;

pub use sui_rpc::{KeytoolSigner, SuiRpcLedger, TransactionSigner};

use crate::audit::AuditPointer;
use crate::config::ArenaObjects;
use crate::trade::TradeAction;
use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Shared clock object passed to time-dependent Move calls
pub const SUI_CLOCK_OBJECT_ID: &str = "0x6";

/// Move module exposing the agent trade entry points
pub const SEASON_MODULE: &str = "season_manager";

/// Point-in-time snapshot of a ledger object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerObject {
    pub object_id: String,
    pub version: u64,
    pub object_type: Option<String>,
    /// Move struct content as rendered by the node
    pub content: Value,
}

/// Direction of a trade submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeDirection {
    /// Spend USDC, receive BTC
    Long,
    /// Spend BTC, receive USDC
    Short,
}

impl TradeDirection {
    pub fn from_action(action: TradeAction) -> Option<Self> {
        match action {
            TradeAction::Long => Some(TradeDirection::Long),
            TradeAction::Short => Some(TradeDirection::Short),
            TradeAction::Close => None,
        }
    }

    pub fn action(&self) -> TradeAction {
        match self {
            TradeDirection::Long => TradeAction::Long,
            TradeDirection::Short => TradeAction::Short,
        }
    }

    /// Entry function name in the season module
    pub fn function_name(&self) -> &'static str {
        match self {
            TradeDirection::Long => "ai_execute_long",
            TradeDirection::Short => "ai_execute_short",
        }
    }
}

/// One atomic trade submission: the conversion and its audit entry travel
/// together in a single ledger call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeCall {
    pub package_id: String,
    pub season_ref: String,
    pub season_number: u64,
    pub agent_id: String,
    pub pool_ref: String,
    pub direction: TradeDirection,
    /// USDC in for longs, BTC in for shorts (smallest units)
    pub amount_in: u64,
    pub reasoning: String,
    pub confidence: u8,
    pub audit_pointer: AuditPointer,
    /// Stable asset type first, volatile asset second
    pub type_arguments: Vec<String>,
}

impl TradeCall {
    /// Build a call against the configured deployment
    #[allow(clippy::too_many_arguments)]
    pub fn for_objects(
        objects: &ArenaObjects,
        season_number: u64,
        agent_id: &str,
        direction: TradeDirection,
        amount_in: u64,
        reasoning: &str,
        confidence: u8,
        audit_pointer: AuditPointer,
    ) -> Self {
        Self {
            package_id: objects.package_id.clone(),
            season_ref: objects.season_global_id.clone(),
            season_number,
            agent_id: agent_id.to_string(),
            pool_ref: objects.dex_global_id.clone(),
            direction,
            amount_in,
            reasoning: reasoning.to_string(),
            confidence,
            audit_pointer,
            type_arguments: objects.type_arguments(),
        }
    }

    /// Positional Move arguments in the entry function's order
    pub fn move_arguments(&self) -> Vec<Value> {
        vec![
            json!(self.season_ref),
            json!(self.season_number.to_string()),
            json!(self.agent_id),
            json!(self.pool_ref),
            json!(self.amount_in.to_string()),
            json!(self.reasoning),
            json!(self.confidence.to_string()),
            json!(self.audit_pointer.as_bytes().to_vec()),
            json!(SUI_CLOCK_OBJECT_ID),
        ]
    }
}

/// What the ledger reported for an accepted submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionReceipt {
    /// Transaction digest
    pub digest: String,
    /// Ledger timestamp of the commit, when reported
    pub timestamp_ms: Option<u64>,
    /// Output amount credited to the vault, when reported
    pub amount_out: Option<u64>,
}

/// Read and write access to the external ledger
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Short label for logs
    fn name(&self) -> &str;

    /// Fetch an object; `Ok(None)` if it does not exist
    async fn get_object(&self, object_id: &str) -> Result<Option<LedgerObject>>;

    /// Submit one trade atomically. Rejections surface as
    /// [`crate::Error::LedgerRejection`] and are never retried here.
    async fn submit_trade(&self, call: &TradeCall) -> Result<SubmissionReceipt>;
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_move_arguments_order() {
        let objects = ArenaObjects::default();
        let call = TradeCall::for_objects(
            &objects,
            2,
            "claude",
            TradeDirection::Short,
            150_000,
            "Taking profit",
            64,
            AuditPointer::new([1; 32]),
        );
        let args = call.move_arguments();
        assert_eq!(args.len(), 9);
        assert_eq!(args[0], json!(objects.season_global_id));
        assert_eq!(args[1], json!("2"));
        assert_eq!(args[2], json!("claude"));
        assert_eq!(args[3], json!(objects.dex_global_id));
        assert_eq!(args[4], json!("150000"));
        assert_eq!(args[6], json!("64"));
        assert_eq!(args[7].as_array().unwrap().len(), 32);
        assert_eq!(args[8], json!("0x6"));
        assert_eq!(call.direction.function_name(), "ai_execute_short");
        assert_eq!(call.type_arguments.len(), 2);
    }

    #[test]
    fn test_close_has_no_direction() {
        assert_eq!(TradeDirection::from_action(TradeAction::Close), None);
        assert_eq!(
            TradeDirection::from_action(TradeAction::Long),
            Some(TradeDirection::Long)
        );
    }
}
