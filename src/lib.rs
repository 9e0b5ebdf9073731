//! Trade Arena agent
//!
//! Core of an AI trading agent competing in an on-chain trade arena:
//! - Read constant-product pool state and quote swaps locally
//! - Value agent vaults and compute PnL against a reference price
//! - Submit LONG/SHORT trades atomically with an audit pointer
//! - Decode the ledger's stored trade history
//!
//! # Ledger Model
//!
//! - The ledger owns all pool, season and vault state; nothing is cached here
//! - A trade and its audit entry are one ledger call, never two
//! - All trade submissions pass through an interceptor pipeline
//! - Signing keys stay in the `sui` keystore, outside this process

#![recursion_limit = "256"]

pub mod audit;
pub mod config;
pub mod history;
pub mod interceptors;
pub mod ledger;
pub mod oracle;
pub mod paper_trading;
pub mod pool;
pub mod quote;
pub mod runtime;
pub mod season;
pub mod tokens;
pub mod tools;
pub mod trade;
pub mod vault;

mod error;

// Re-export commonly used types
pub use audit::{AuditPointer, AuditStore, LocalAuditStore, TradeRationale};
pub use config::{ArenaObjects, Config, Network, RpcConfig};
pub use error::{Error, RejectionReason, Result};
pub use history::{HistoryReader, TradeHistoryDecoder, TradeRecord};
pub use ledger::{Ledger, SubmissionReceipt, TradeCall, TradeDirection};
pub use paper_trading::{PaperLedger, PaperModeConfig};
pub use pool::{LiquidityPool, PoolStateReader};
pub use quote::{SwapQuote, SwapQuoteEngine};
pub use runtime::ArenaRuntime;
pub use season::{AgentVault, Season, SeasonReader, SeasonStatus, VaultRef};
pub use trade::{TradeAction, TradeDraft, TradeExecutor, TradeOutcome, TradeRequest, TradeState};
pub use vault::{ReferencePrice, VaultAccountant, VaultPosition};
