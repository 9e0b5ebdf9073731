//! Trade history decoding
//!
//! Turns raw stored trade records into typed [`TradeRecord`]s:
//! - stored order is preserved; sorting by recency is a separate step
//! - each record decodes independently, so one malformed record never
//!   hides or shifts its neighbours
//! - `exit_price` and `pnl` decode to `None` when unset, never to zero

use crate::audit::AuditPointer;
use crate::ledger::fields::{
    as_bytes, as_u64, first_of, optional_i64, optional_u64, required, required_str, required_u64,
};
use crate::season::{SeasonReader, VaultRef};
use crate::tokens::{BTC_DECIMALS, USDC_DECIMALS};
use crate::trade::TradeAction;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Decimal places of recorded `entry_price` and `exit_price` values
pub const PRICE_DECIMALS: u8 = 8;

/// USDC per whole BTC implied by a fill, scaled by 10^[`PRICE_DECIMALS`]
pub fn fill_price(usdc_amount: u64, btc_amount: u64) -> Result<u64> {
    let scale = 10u128.pow((BTC_DECIMALS + PRICE_DECIMALS - USDC_DECIMALS) as u32);
    let price = (usdc_amount as u128)
        .checked_mul(scale)
        .and_then(|scaled| scaled.checked_div(btc_amount as u128))
        .ok_or(Error::MathOverflow)?;
    u64::try_from(price).map_err(|_| Error::MathOverflow)
}

/// One accepted trade as recorded by the ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeRecord {
    /// Ledger commit time, milliseconds
    pub timestamp: u64,
    pub agent_id: String,
    pub action: TradeAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pair: Option<String>,
    /// USDC, 6 decimals
    pub usdc_amount: u64,
    /// BTC, 8 decimals
    pub btc_amount: u64,
    /// USDC per whole BTC at entry, [`PRICE_DECIMALS`] decimal places
    pub entry_price: u64,
    /// Same scale as `entry_price`
    pub exit_price: Option<u64>,
    pub pnl: Option<i64>,
    pub confidence: u8,
    pub reasoning: String,
    pub audit_pointer: AuditPointer,
}

impl TradeRecord {
    /// Still open: no exit recorded
    pub fn is_open(&self) -> bool {
        self.exit_price.is_none() && self.pnl.is_none()
    }
}

/// Decode one raw record. `index` only labels errors.
pub fn decode_record(raw: &Value, index: usize, default_agent: Option<&str>) -> Result<TradeRecord> {
    let context = format!("trade record #{}", index);

    let agent_id = match first_of(raw, &["agent_id", "ai_model"]).and_then(Value::as_str) {
        Some(agent) if !agent.is_empty() => agent.to_string(),
        _ => default_agent
            .map(str::to_string)
            .ok_or_else(|| Error::decode(&context, "missing field `agent_id`"))?,
    };

    let action = decode_action(required(raw, "action", &context)?, &context)?;

    let confidence = required_u64(raw, "confidence", &context)?;
    let confidence = u8::try_from(confidence)
        .ok()
        .filter(|c| *c <= 100)
        .ok_or_else(|| Error::decode(&context, format!("confidence {} outside 0..=100", confidence)))?;

    let pointer_value = first_of(raw, &["audit_pointer", "walrus_blob_id"])
        .ok_or_else(|| Error::decode(&context, "missing field `audit_pointer`"))?;
    let pointer_bytes = as_bytes(pointer_value, &context)?;
    let audit_pointer = AuditPointer::from_bytes(&pointer_bytes)
        .map_err(|e| Error::decode(&context, e.to_string()))?;

    Ok(TradeRecord {
        timestamp: required_u64(raw, "timestamp", &context)?,
        agent_id,
        action,
        pair: first_of(raw, &["pair"]).and_then(Value::as_str).map(str::to_string),
        usdc_amount: required_u64(raw, "usdc_amount", &context)?,
        btc_amount: required_u64(raw, "btc_amount", &context)?,
        entry_price: required_u64(raw, "entry_price", &context)?,
        exit_price: optional_u64(raw, "exit_price", &context)?,
        pnl: optional_i64(raw, "pnl", &context)?,
        confidence,
        reasoning: required_str(raw, "reasoning", &context)?.to_string(),
        audit_pointer,
    })
}

fn decode_action(value: &Value, context: &str) -> Result<TradeAction> {
    if let Some(text) = value.as_str() {
        if let Some(action) = TradeAction::parse(text) {
            return Ok(action);
        }
    }
    let code = as_u64(value, context)?;
    TradeAction::from_code(code)
        .ok_or_else(|| Error::decode(context, format!("unknown action code {}", code)))
}

/// Restartable view over raw records
pub struct TradeHistoryDecoder<'a> {
    raw: &'a [Value],
    default_agent: Option<&'a str>,
}

impl<'a> TradeHistoryDecoder<'a> {
    pub fn new(raw: &'a [Value]) -> Self {
        Self {
            raw,
            default_agent: None,
        }
    }

    /// Agent to attribute records that do not name one (the vault key)
    pub fn with_default_agent(mut self, agent: &'a str) -> Self {
        self.default_agent = Some(agent);
        self
    }

    pub fn len(&self) -> usize {
        self.raw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// Fresh pass over the records, in stored order
    pub fn iter(&self) -> impl Iterator<Item = Result<TradeRecord>> + 'a {
        let default_agent = self.default_agent;
        self.raw
            .iter()
            .enumerate()
            .map(move |(index, raw)| decode_record(raw, index, default_agent))
    }

    /// Records that decoded, plus the errors of those that did not
    pub fn partition(&self) -> (Vec<TradeRecord>, Vec<Error>) {
        let mut records = Vec::with_capacity(self.raw.len());
        let mut errors = Vec::new();
        for result in self.iter() {
            match result {
                Ok(record) => records.push(record),
                Err(e) => errors.push(e),
            }
        }
        (records, errors)
    }
}

/// Newest first; ties keep stored order
pub fn sort_by_recency(records: &mut [TradeRecord]) {
    records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
}

/// Whether any stored record carries `pointer`.
///
/// Only the pointer field is inspected, so records malformed elsewhere
/// still count.
pub fn contains_audit_pointer(raw: &[Value], pointer: &AuditPointer) -> bool {
    raw.iter().any(|record| {
        first_of(record, &["audit_pointer", "walrus_blob_id"])
            .and_then(|value| as_bytes(value, "audit pointer").ok())
            .is_some_and(|bytes| bytes.as_slice() == pointer.as_bytes())
    })
}

/// Win/loss statistics over decoded records
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSummary {
    pub total_trades: usize,
    pub open_trades: usize,
    pub closed_trades: usize,
    pub wins: usize,
    pub losses: usize,
    /// `None` until a trade closes
    pub win_rate: Option<f64>,
    /// Sum of recorded PnL, USDC smallest units
    pub realized_pnl: i64,
}

pub fn summarize(records: &[TradeRecord]) -> PerformanceSummary {
    let closed: Vec<i64> = records.iter().filter_map(|r| r.pnl).collect();
    let wins = closed.iter().filter(|p| **p > 0).count();
    let losses = closed.iter().filter(|p| **p < 0).count();
    PerformanceSummary {
        total_trades: records.len(),
        open_trades: records.iter().filter(|r| r.is_open()).count(),
        closed_trades: closed.len(),
        wins,
        losses,
        win_rate: (!closed.is_empty()).then(|| wins as f64 / closed.len() as f64),
        realized_pnl: closed.iter().fold(0i64, |acc, p| acc.saturating_add(*p)),
    }
}

/// Decoded history of one vault
#[derive(Debug, Serialize)]
pub struct VaultHistory {
    pub vault: VaultRef,
    pub records: Vec<TradeRecord>,
    /// Messages of records that failed to decode
    pub errors: Vec<String>,
}

/// Fetches vault histories from the ledger and decodes them
#[derive(Clone)]
pub struct HistoryReader {
    seasons: SeasonReader,
}

impl HistoryReader {
    pub fn new(seasons: SeasonReader) -> Self {
        Self { seasons }
    }

    pub async fn vault_history(&self, vault_ref: &VaultRef) -> Result<VaultHistory> {
        let vault = self.seasons.get_vault(vault_ref).await?;
        let (records, errors) = TradeHistoryDecoder::new(&vault.trade_history)
            .with_default_agent(&vault.agent_id)
            .partition();
        for error in &errors {
            tracing::warn!(vault = %vault_ref, error = %error, "Skipping malformed trade record");
        }
        Ok(VaultHistory {
            vault: vault_ref.clone(),
            records,
            errors: errors.iter().map(ToString::to_string).collect(),
        })
    }

    /// Every vault's records in a season, newest first
    pub async fn season_history(&self, season_number: u64) -> Result<Vec<TradeRecord>> {
        let season = self.seasons.get_season(season_number).await?;
        let mut all = Vec::new();
        for vault in &season.vaults {
            let (records, errors) = TradeHistoryDecoder::new(&vault.trade_history)
                .with_default_agent(&vault.agent_id)
                .partition();
            if !errors.is_empty() {
                tracing::warn!(
                    season = season_number,
                    agent = %vault.agent_id,
                    malformed = errors.len(),
                    "Skipping malformed trade records"
                );
            }
            all.extend(records);
        }
        sort_by_recency(&mut all);
        Ok(all)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::test_support::StaticLedger;
    use crate::season::fixtures::season_registry;
    use serde_json::json;
    use std::sync::Arc;

    fn raw_three() -> Vec<Value> {
        vec![
            json!({ "fields": {
                "timestamp": "1730000000000", "ai_model": "gpt", "action": "LONG",
                "usdc_amount": "500000000", "btc_amount": "750000", "entry_price": "6666666666666",
                "reasoning": "Momentum", "confidence": "70", "walrus_blob_id": vec![1u8; 32]
            } }),
            json!({
                "timestamp": 1730000100000u64, "action": "SHORT",
                "usdc_amount": "320000000", "btc_amount": "500000", "entry_price": "6400000000000",
                "exit_price": "6432400000000", "pnl": -162,
                "reasoning": "Overbought", "confidence": 55, "audit_pointer": hex::encode([2u8; 32])
            }),
            json!({
                "timestamp": "1730000200000", "ai_model": "gpt", "action": 0,
                "usdc_amount": "1000000000", "btc_amount": "1500000", "entry_price": "6666666666666",
                "exit_price": "6620400000000", "pnl": { "fields": { "is_negative": false, "value": "306" } },
                "reasoning": "Trend", "confidence": "81", "walrus_blob_id": vec![3u8; 32]
            }),
        ]
    }

    #[test]
    fn test_decode_preserves_order_and_unset_fields() {
        let raw = raw_three();
        let decoder = TradeHistoryDecoder::new(&raw).with_default_agent("gpt");
        let records: Vec<TradeRecord> = decoder.iter().collect::<Result<_>>().unwrap();

        assert_eq!(records.len(), 3);
        assert_eq!(records[0].action, TradeAction::Long);
        assert_eq!(records[0].exit_price, None);
        assert_eq!(records[0].pnl, None);
        assert!(records[0].is_open());

        assert_eq!(records[1].action, TradeAction::Short);
        assert_eq!(records[1].agent_id, "gpt");
        assert_eq!(records[1].pnl, Some(-162));

        assert_eq!(records[2].action, TradeAction::Long);
        assert_eq!(records[2].pnl, Some(306));
        assert_eq!(records[2].audit_pointer, AuditPointer::new([3; 32]));
    }

    #[test]
    fn test_decoder_is_restartable() {
        let raw = raw_three();
        let decoder = TradeHistoryDecoder::new(&raw).with_default_agent("gpt");
        let first: Vec<_> = decoder.iter().map(|r| r.unwrap().timestamp).collect();
        let second: Vec<_> = decoder.iter().map(|r| r.unwrap().timestamp).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_bad_pointer_fails_only_that_record() {
        let mut raw = raw_three();
        raw[1]["audit_pointer"] = json!(hex::encode([2u8; 31]));
        let results: Vec<_> = TradeHistoryDecoder::new(&raw)
            .with_default_agent("gpt")
            .iter()
            .collect();

        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());
        assert!(matches!(results[1], Err(Error::Decode { .. })));
        assert_eq!(results[2].as_ref().unwrap().pnl, Some(306));
    }

    #[test]
    fn test_missing_agent_without_default_fails() {
        let raw = raw_three();
        let results: Vec<_> = TradeHistoryDecoder::new(&raw).iter().collect();
        assert!(results[0].is_ok());
        assert!(results[1].is_err());
    }

    #[test]
    fn test_fill_price_scale() {
        // 1,000 USDC for 0.015 BTC
        assert_eq!(fill_price(1_000_000_000, 1_500_000).unwrap(), 6_666_666_666_666);
        // 64,000.5 USDC for 1 BTC
        assert_eq!(fill_price(64_000_500_000, 100_000_000).unwrap(), 6_400_050_000_000);
        assert!(matches!(fill_price(1, 0), Err(Error::MathOverflow)));
        assert!(matches!(fill_price(u64::MAX, 1), Err(Error::MathOverflow)));

        let record = decode_record(&raw_three()[2], 2, None).unwrap();
        assert_eq!(record.entry_price, fill_price(record.usdc_amount, record.btc_amount).unwrap());
    }

    #[test]
    fn test_confidence_out_of_range() {
        let mut raw = raw_three();
        raw[1]["confidence"] = json!(101);
        assert!(decode_record(&raw[1], 1, Some("gpt")).is_err());
    }

    #[test]
    fn test_sort_and_summarize() {
        let raw = raw_three();
        let (mut records, errors) = TradeHistoryDecoder::new(&raw).with_default_agent("gpt").partition();
        assert!(errors.is_empty());

        sort_by_recency(&mut records);
        assert_eq!(records[0].timestamp, 1_730_000_200_000);

        let summary = summarize(&records);
        assert_eq!(summary.total_trades, 3);
        assert_eq!(summary.open_trades, 1);
        assert_eq!(summary.wins, 1);
        assert_eq!(summary.losses, 1);
        assert_eq!(summary.win_rate, Some(0.5));
        assert_eq!(summary.realized_pnl, 144);
        assert_eq!(summarize(&[]).win_rate, None);
    }

    #[test]
    fn test_contains_audit_pointer() {
        let raw = raw_three();
        assert!(contains_audit_pointer(&raw, &AuditPointer::new([2; 32])));
        assert!(!contains_audit_pointer(&raw, &AuditPointer::new([9; 32])));
    }

    #[test]
    fn test_serialized_shape() {
        let raw = raw_three();
        let record = decode_record(&raw[0], 0, None).unwrap();
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["exit_price"], Value::Null);
        assert_eq!(json["pnl"], Value::Null);
        assert_eq!(json["action"], "LONG");
        assert_eq!(json["audit_pointer"], hex::encode([1u8; 32]));
    }

    #[tokio::test]
    async fn test_history_reader() {
        let ledger = StaticLedger::default().with_object(season_registry("0x323a"));
        let reader = HistoryReader::new(SeasonReader::new(Arc::new(ledger), "0x323a"));
        let history = reader.vault_history(&VaultRef::new(2, "deepseek")).await.unwrap();
        assert_eq!(history.records.len(), 1);
        assert_eq!(history.records[0].confidence, 78);
        assert!(history.errors.is_empty());

        let season = reader.season_history(2).await.unwrap();
        assert_eq!(season.len(), 1);
    }
}
