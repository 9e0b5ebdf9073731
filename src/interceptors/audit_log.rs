//! Audit log interceptor
//!
//! Journals every trade submission attempt and its outcome as JSONL.

use super::{InterceptorDecision, TradeContext, TradeInterceptor};
use crate::ledger::SubmissionReceipt;
use crate::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Entry in the audit log
#[derive(Debug, Serialize)]
struct AuditEntry<'a> {
    timestamp: DateTime<Utc>,
    entry_type: &'static str,
    context: &'a TradeContext,
    receipt: Option<&'a SubmissionReceipt>,
    error: Option<String>,
    duration_ms: u64,
    status: &'static str,
}

/// Writer for audit log entries
struct AuditLogWriter {
    path: PathBuf,
}

impl AuditLogWriter {
    fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn write(&self, entry: &AuditEntry<'_>) -> std::io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        let json = serde_json::to_string(entry)?;
        writeln!(file, "{}", json)?;
        Ok(())
    }
}

/// Interceptor that logs all submissions to a file
pub struct AuditLogInterceptor {
    writer: Arc<Mutex<AuditLogWriter>>,
}

impl AuditLogInterceptor {
    /// Create a new audit log interceptor
    ///
    /// # Arguments
    /// * `log_path` - Path to the audit log file (JSONL format)
    pub fn new(log_path: impl Into<PathBuf>) -> Self {
        Self {
            writer: Arc::new(Mutex::new(AuditLogWriter::new(log_path.into()))),
        }
    }

    async fn append(&self, entry: &AuditEntry<'_>) {
        let writer = self.writer.lock().await;
        if let Err(e) = writer.write(entry) {
            tracing::warn!(error = %e, "Failed to write audit log entry");
        }
    }
}

#[async_trait]
impl TradeInterceptor for AuditLogInterceptor {
    async fn intercept_trade(&self, context: &TradeContext) -> Result<InterceptorDecision> {
        self.append(&AuditEntry {
            timestamp: Utc::now(),
            entry_type: "trade_start",
            context,
            receipt: None,
            error: None,
            duration_ms: 0,
            status: "pending",
        })
        .await;

        // Audit logging never blocks
        Ok(InterceptorDecision::Allow)
    }

    async fn on_trade_complete(
        &self,
        context: &TradeContext,
        result: &Result<SubmissionReceipt>,
        duration_ms: u64,
    ) {
        let (receipt, error, status) = match result {
            Ok(receipt) => (Some(receipt), None, "confirmed"),
            Err(e) => (None, Some(e.to_string()), "failed"),
        };

        self.append(&AuditEntry {
            timestamp: Utc::now(),
            entry_type: "trade_complete",
            context,
            receipt,
            error,
            duration_ms,
            status,
        })
        .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interceptors::test_support::{context, receipt};
    use crate::Error;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn test_logs_submission() {
        let temp_file = NamedTempFile::new().unwrap();
        let interceptor = AuditLogInterceptor::new(temp_file.path());
        let ctx = context("gpt", 0.3);

        let decision = interceptor.intercept_trade(&ctx).await.unwrap();
        assert_eq!(decision, InterceptorDecision::Allow);

        interceptor.on_trade_complete(&ctx, &Ok(receipt()), 150).await;

        let content = std::fs::read_to_string(temp_file.path()).unwrap();
        let lines: Vec<serde_json::Value> = content
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["entry_type"], "trade_start");
        assert_eq!(lines[1]["status"], "confirmed");
        assert_eq!(lines[1]["receipt"]["digest"], "digest");
        assert_eq!(lines[1]["context"]["vault"]["agent_id"], "gpt");
    }

    #[tokio::test]
    async fn test_logs_failure_reason() {
        let temp_file = NamedTempFile::new().unwrap();
        let interceptor = AuditLogInterceptor::new(temp_file.path());
        interceptor
            .on_trade_complete(
                &context("gpt", 0.3),
                &Err(Error::Blocked("cooldown".to_string())),
                0,
            )
            .await;

        let content = std::fs::read_to_string(temp_file.path()).unwrap();
        assert!(content.contains("\"status\":\"failed\""));
        assert!(content.contains("cooldown"));
    }
}
