//! Sui full node ledger
//!
//! Reads objects with `sui_getObject` and submits trades in three steps:
//! build the Move call with `unsafe_moveCall`, sign the transaction bytes,
//! then execute with `sui_executeTransactionBlock`. The node validates
//! against the latest object versions, so a conflicting concurrent update
//! surfaces as a stale-state rejection.

use super::fields::{as_u64, field, first_of};
use super::{Ledger, LedgerObject, SubmissionReceipt, TradeCall, TradeDirection, SEASON_MODULE};
use crate::config::RpcConfig;
use crate::{Error, Result};
use async_trait::async_trait;
use reqwest::Client;
use secrecy::ExposeSecret;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    result: Option<Value>,
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

/// Signs transaction bytes for the agent's authorized wallet
#[async_trait]
pub trait TransactionSigner: Send + Sync {
    /// Sender address
    fn address(&self) -> &str;

    /// Sign base64 transaction bytes, returning the base64 serialized signature
    async fn sign(&self, tx_bytes: &str) -> Result<String>;
}

/// Signs with the local `sui` CLI keystore
pub struct KeytoolSigner {
    address: String,
    sui_binary: String,
}

impl KeytoolSigner {
    pub fn new(address: impl Into<String>, sui_binary: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            sui_binary: sui_binary.into(),
        }
    }
}

#[async_trait]
impl TransactionSigner for KeytoolSigner {
    fn address(&self) -> &str {
        &self.address
    }

    async fn sign(&self, tx_bytes: &str) -> Result<String> {
        let output = tokio::process::Command::new(&self.sui_binary)
            .args(["keytool", "sign", "--address", &self.address, "--data", tx_bytes, "--json"])
            .output()
            .await?;
        if !output.status.success() {
            return Err(Error::Rpc(format!(
                "keytool sign failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        let parsed: Value = serde_json::from_slice(&output.stdout)?;
        parse_keytool_signature(&parsed)
    }
}

fn parse_keytool_signature(output: &Value) -> Result<String> {
    first_of(output, &["suiSignature", "serializedSigAndPubKey"])
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| Error::decode("keytool output", "missing field `suiSignature`"))
}

/// Ledger backed by a Sui full node
pub struct SuiRpcLedger {
    client: Client,
    rpc: RpcConfig,
    signer: Option<Arc<dyn TransactionSigner>>,
    gas_budget: u64,
    next_id: AtomicU64,
}

impl SuiRpcLedger {
    /// Read-only until a signer is attached
    pub fn new(rpc: RpcConfig, gas_budget: u64) -> Self {
        Self {
            client: Client::new(),
            rpc,
            signer: None,
            gas_budget,
            next_id: AtomicU64::new(1),
        }
    }

    pub fn with_signer(mut self, signer: Arc<dyn TransactionSigner>) -> Self {
        self.signer = Some(signer);
        self
    }

    fn signer(&self) -> Result<&dyn TransactionSigner> {
        self.signer
            .as_deref()
            .ok_or_else(|| Error::Config("no signer configured (set SUI_SIGNER_ADDRESS)".to_string()))
    }

    /// Execute a raw JSON-RPC call
    async fn call(&self, method: &str, params: Value) -> Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut request = self.client.post(self.rpc.url().clone()).json(&json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params
        }));
        if let Some(token) = self.rpc.auth_token() {
            request = request.bearer_auth(token.expose_secret());
        }

        tracing::debug!(method, id, "Sending RPC request");
        let response: JsonRpcResponse = request.send().await?.error_for_status()?.json().await?;

        if let Some(error) = response.error {
            return Err(Error::Rpc(format!("{} ({}): {}", method, error.code, error.message)));
        }
        response
            .result
            .ok_or_else(|| Error::Rpc(format!("{}: no result in response", method)))
    }

    async fn build_trade(&self, signer: &dyn TransactionSigner, call: &TradeCall) -> Result<String> {
        let result = self
            .call(
                "unsafe_moveCall",
                json!([
                    signer.address(),
                    call.package_id,
                    SEASON_MODULE,
                    call.direction.function_name(),
                    call.type_arguments,
                    call.move_arguments(),
                    Value::Null,
                    self.gas_budget.to_string()
                ]),
            )
            .await?;
        field(&result, "txBytes")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| Error::decode("unsafe_moveCall", "missing field `txBytes`"))
    }
}

#[async_trait]
impl Ledger for SuiRpcLedger {
    fn name(&self) -> &str {
        "sui"
    }

    async fn get_object(&self, object_id: &str) -> Result<Option<LedgerObject>> {
        let result = self
            .call(
                "sui_getObject",
                json!([object_id, { "showContent": true, "showType": true }]),
            )
            .await?;
        parse_object_response(object_id, &result)
    }

    async fn submit_trade(&self, call: &TradeCall) -> Result<SubmissionReceipt> {
        let signer = self.signer()?;
        let tx_bytes = self.build_trade(signer, call).await?;
        let signature = signer.sign(&tx_bytes).await?;

        // Anything the node refuses at execution time is a rejection
        let result = self
            .call(
                "sui_executeTransactionBlock",
                json!([
                    tx_bytes,
                    [signature],
                    { "showEffects": true, "showEvents": true },
                    "WaitForLocalExecution"
                ]),
            )
            .await
            .map_err(|e| match e {
                Error::Rpc(message) => Error::rejection(message),
                other => other,
            })?;

        parse_execution_response(call.direction, &result)
    }
}

fn parse_object_response(object_id: &str, result: &Value) -> Result<Option<LedgerObject>> {
    if let Some(error) = result.get("error") {
        let code = error.get("code").and_then(Value::as_str).unwrap_or_default();
        if matches!(code, "notExists" | "deleted") {
            tracing::debug!(object = object_id, code, "Object not found");
            return Ok(None);
        }
        return Err(Error::Rpc(format!("sui_getObject {}: {}", object_id, error)));
    }

    let context = format!("object {}", object_id);
    let data = result
        .get("data")
        .ok_or_else(|| Error::decode(&context, "missing field `data`"))?;
    let content = data
        .get("content")
        .cloned()
        .ok_or_else(|| Error::decode(&context, "missing field `content`"))?;
    let version = data
        .get("version")
        .ok_or_else(|| Error::decode(&context, "missing field `version`"))
        .and_then(|v| as_u64(v, &context))?;
    let object_type = data
        .get("type")
        .or_else(|| content.get("type"))
        .and_then(Value::as_str)
        .map(str::to_string);

    Ok(Some(LedgerObject {
        object_id: data
            .get("objectId")
            .and_then(Value::as_str)
            .unwrap_or(object_id)
            .to_string(),
        version,
        object_type,
        content,
    }))
}

fn parse_execution_response(direction: TradeDirection, result: &Value) -> Result<SubmissionReceipt> {
    let digest = result
        .get("digest")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::decode("transaction response", "missing field `digest`"))?
        .to_string();

    let status = result.pointer("/effects/status");
    match status.and_then(|s| s.get("status")).and_then(Value::as_str) {
        Some("success") => {}
        Some(_) => {
            let raw = status
                .and_then(|s| s.get("error"))
                .and_then(Value::as_str)
                .unwrap_or("transaction failed");
            tracing::warn!(digest = %digest, error = raw, "Transaction aborted");
            return Err(Error::rejection(raw));
        }
        None => {
            return Err(Error::decode("transaction response", "missing effects status"));
        }
    }

    let timestamp_ms = result
        .get("timestampMs")
        .and_then(|v| as_u64(v, "timestampMs").ok());

    // Output leg of the swap event, when the package emits one
    let output_field = match direction {
        TradeDirection::Long => "btc_amount",
        TradeDirection::Short => "usdc_amount",
    };
    let amount_out = result
        .get("events")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|event| event.get("parsedJson"))
        .find_map(|json| {
            first_of(json, &["amount_out", output_field]).and_then(|v| as_u64(v, "event").ok())
        });

    Ok(SubmissionReceipt {
        digest,
        timestamp_ms,
        amount_out,
    })
}
