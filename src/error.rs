//! Error types for the trade arena agent

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Why the ledger refused a trade submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionReason {
    InsufficientFunds,
    PoolPaused,
    /// The submission raced another write to the same object
    StaleState,
    Other,
}

/// Move abort codes that map onto a rejection class, keyed by module name.
/// `balance` is the Sui framework's `ENotEnough`; the rest belong to the
/// arena package.
const ABORT_CODES: &[(&str, u64, RejectionReason)] = &[
    ("balance", 2, RejectionReason::InsufficientFunds),
    ("season_manager", 3, RejectionReason::InsufficientFunds),
    ("season_manager", 4, RejectionReason::PoolPaused),
    ("season_manager", 6, RejectionReason::StaleState),
    ("dex", 2, RejectionReason::InsufficientFunds),
    ("dex", 3, RejectionReason::PoolPaused),
    ("dex", 5, RejectionReason::StaleState),
];

impl RejectionReason {
    /// Classify a raw ledger error message
    pub fn classify(raw: &str) -> Self {
        if let Some((Some(module), code)) = parse_move_abort(raw) {
            if let Some((_, _, reason)) = ABORT_CODES
                .iter()
                .find(|(m, c, _)| *m == module && *c == code)
            {
                return *reason;
            }
        }

        let lower = raw.to_ascii_lowercase();
        // Gas exhaustion mentions "insufficient" but says nothing about the vault
        if lower.contains("gas") {
            RejectionReason::Other
        } else if lower.contains("insufficient") {
            RejectionReason::InsufficientFunds
        } else if lower.contains("paused") {
            RejectionReason::PoolPaused
        } else if lower.contains("not available for consumption")
            || lower.contains("version")
            || lower.contains("equivocat")
            || lower.contains("stale")
        {
            RejectionReason::StaleState
        } else {
            RejectionReason::Other
        }
    }
}

/// Module name and abort code of a `MoveAbort(<location>, <code>)` status
fn parse_move_abort(raw: &str) -> Option<(Option<&str>, u64)> {
    const PREFIX: &str = "MoveAbort(";
    let body = &raw[raw.find(PREFIX)? + PREFIX.len()..];

    let mut depth = 0usize;
    let mut end = None;
    for (i, c) in body.char_indices() {
        match c {
            '(' | '{' => depth += 1,
            ')' | '}' if depth > 0 => depth -= 1,
            ')' => {
                end = Some(i);
                break;
            }
            _ => {}
        }
    }
    let body = &body[..end?];

    let code = body.rsplit(',').next()?.trim().parse().ok()?;
    let module = body
        .split("Identifier(\"")
        .nth(1)
        .and_then(|rest| rest.split('"').next());
    Some((module, code))
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RejectionReason::InsufficientFunds => "insufficient funds",
            RejectionReason::PoolPaused => "pool paused",
            RejectionReason::StaleState => "stale state",
            RejectionReason::Other => "ledger error",
        };
        f.write_str(label)
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("{0} is paused")]
    Paused(String),

    #[error("Invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    #[error("Ledger rejected submission ({reason}): {raw}")]
    LedgerRejection { reason: RejectionReason, raw: String },

    #[error("Failed to decode {context}: {reason}")]
    Decode { context: String, reason: String },

    #[error("Pool has no liquidity")]
    NoLiquidity,

    #[error("Arithmetic overflow")]
    MathOverflow,

    #[error("Interceptor blocked: {0}")]
    Blocked(String),

    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        Error::Validation {
            field,
            reason: reason.into(),
        }
    }

    pub fn decode(context: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Decode {
            context: context.into(),
            reason: reason.into(),
        }
    }

    pub fn rejection(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        Error::LedgerRejection {
            reason: RejectionReason::classify(&raw),
            raw,
        }
    }

    /// Whether the orchestrator may safely retry the same request.
    ///
    /// Re-submitting an accepted trade is a detected no-op, so conflicts
    /// and transport failures are retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::LedgerRejection {
                reason: RejectionReason::StaleState,
                ..
            } | Error::Network(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_rejections() {
        assert_eq!(
            RejectionReason::classify("MoveAbort: E_INSUFFICIENT_BALANCE in vault"),
            RejectionReason::InsufficientFunds
        );
        assert_eq!(
            RejectionReason::classify("pool has_paused flag set"),
            RejectionReason::PoolPaused
        );
        assert_eq!(
            RejectionReason::classify(
                "Object 0x12 is not available for consumption, current version: 40"
            ),
            RejectionReason::StaleState
        );
        assert_eq!(
            RejectionReason::classify("something odd"),
            RejectionReason::Other
        );
    }

    #[test]
    fn test_gas_is_not_insufficient_funds() {
        assert_eq!(RejectionReason::classify("InsufficientGas"), RejectionReason::Other);
        assert_eq!(
            RejectionReason::classify("GasBalanceTooLow { gas_balance: 10, needed_gas_amount: 20 }"),
            RejectionReason::Other
        );
    }

    #[test]
    fn test_classify_move_abort_codes() {
        let abort = |module: &str, code: u64| {
            format!(
                "MoveAbort(MoveLocation {{ module: ModuleId {{ address: 0xa51f, name: Identifier(\"{}\") }}, \
                 function: 4, instruction: 31, function_name: Some(\"ai_execute_long\") }}, {}) in command 0",
                module, code
            )
        };
        assert_eq!(
            RejectionReason::classify(&abort("balance", 2)),
            RejectionReason::InsufficientFunds
        );
        assert_eq!(
            RejectionReason::classify(&abort("season_manager", 4)),
            RejectionReason::PoolPaused
        );
        assert_eq!(
            RejectionReason::classify(&abort("dex", 5)),
            RejectionReason::StaleState
        );
        assert_eq!(
            RejectionReason::classify(&abort("season_manager", 99)),
            RejectionReason::Other
        );
        assert_eq!(parse_move_abort(&abort("dex", 3)), Some((Some("dex"), 3)));
        assert_eq!(parse_move_abort("MoveAbort(..., 3) in command 0"), Some((None, 3)));
        assert_eq!(parse_move_abort("no abort here"), None);
    }

    #[test]
    fn test_stale_state_is_retryable() {
        assert!(Error::rejection("object version mismatch").is_retryable());
        assert!(!Error::rejection("insufficient balance").is_retryable());
        assert!(!Error::validation("amount", "must be positive").is_retryable());
    }

    #[test]
    fn test_validation_names_field() {
        let err = Error::validation("confidence", "must be within 0..=100");
        assert_eq!(err.to_string(), "Invalid confidence: must be within 0..=100");
    }
}
