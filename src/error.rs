//! Error types for swap coordination
//!
//! The taxonomy in [`FailureKind`] is chain-independent: adapters translate raw
//! revert reasons and Move abort codes into it, so callers never branch on
//! per-chain failure surfaces.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Chain-independent failure taxonomy shared by both chain families.
///
/// Execution failures carry one of these alongside the raw chain signal; the
/// explanation text for each kind is produced here, once, rather than at every
/// call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    InvalidSecret,
    NotDesignatedRecipient,
    AlreadyClaimed,
    AlreadyRefunded,
    NotSender,
    TimelockNotExpired,
    TimelockInPast,
    TimelockOrderingInvalid,
    SwapNotFound,
    InsufficientBalance,
    InsufficientAllowance,
    NoMatchingRecord,
    SubmissionTimeout,
    RandomnessUnavailable,
    Unknown,
}

impl FailureKind {
    /// Human-readable explanation for this failure kind.
    pub fn explanation(&self) -> &'static str {
        match self {
            FailureKind::InvalidSecret => "secret does not match the hashlock",
            FailureKind::NotDesignatedRecipient => "caller is not the designated recipient",
            FailureKind::AlreadyClaimed => "this HTLC has already been claimed",
            FailureKind::AlreadyRefunded => "this HTLC has already been refunded",
            FailureKind::NotSender => "caller is not the sender of this HTLC",
            FailureKind::TimelockNotExpired => "the timelock has not yet expired",
            FailureKind::TimelockInPast => "the timelock is not in the future",
            FailureKind::TimelockOrderingInvalid => {
                "responder timelock must expire before the initiator timelock"
            }
            FailureKind::SwapNotFound => "no swap exists under this reference",
            FailureKind::InsufficientBalance => "balance is insufficient for this amount",
            FailureKind::InsufficientAllowance => "token spending allowance was not granted",
            FailureKind::NoMatchingRecord => "no stored swap record matches",
            FailureKind::SubmissionTimeout => "submission did not confirm in time",
            FailureKind::RandomnessUnavailable => "secure randomness is unavailable",
            FailureKind::Unknown => "unrecognized chain failure",
        }
    }
}

/// Main error type for swap coordination.
#[derive(Error, Debug)]
pub enum SwapError {
    #[error("secret does not hash to the expected hashlock")]
    InvalidSecret,

    #[error("timelock {timelock} is not in the future (now {now})")]
    TimelockInPast { timelock: u64, now: u64 },

    #[error("responder timelock {responder} must be strictly below the initiator timelock {initiator}")]
    TimelockOrderingInvalid { responder: u64, initiator: u64 },

    #[error("timelock {timelock} has not expired yet (now {now})")]
    TimelockNotExpired { timelock: u64, now: u64 },

    #[error("initiator timelock {timelock} is more than {horizon}s in the future")]
    TimelockTooFarOut { timelock: u64, horizon: u64 },

    #[error("no stored swap record matches {selector}")]
    NoMatchingRecord { selector: String },

    #[error("claim transaction {tx_ref} not found")]
    ClaimTransactionNotFound { tx_ref: String },

    #[error("transaction {tx_ref} is not a claim transaction")]
    NotAClaimTransaction { tx_ref: String },

    #[error("token spending allowance was not granted: {raw}")]
    InsufficientAllowance { raw: String },

    #[error("{operation} did not confirm within {timeout_secs}s; query swap state before retrying")]
    SubmissionTimeout {
        operation: &'static str,
        timeout_secs: u64,
    },

    #[error("secure randomness unavailable: {0}")]
    RandomnessUnavailable(String),

    /// On-chain execution failure, classified plus the raw signal for audit.
    #[error("chain rejected {operation}: {} ({raw})", .kind.explanation())]
    Execution {
        operation: &'static str,
        kind: FailureKind,
        raw: String,
    },

    #[error("amount must be greater than zero")]
    ZeroAmount,

    #[error("address {address} is not well-formed for {chain}")]
    InvalidAddress { address: String, chain: &'static str },

    #[error("expected a 0x-prefixed {expected}-byte hex string, got {input:?}")]
    MalformedHex { input: String, expected: usize },

    #[error("no adapter configured for chain {chain}")]
    ChainNotConfigured { chain: String },

    #[error("record store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("record encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("record store error: {0}")]
    Storage(String),
}

impl SwapError {
    /// The taxonomy kind for this error, for chain-agnostic callers.
    pub fn kind(&self) -> FailureKind {
        match self {
            SwapError::InvalidSecret => FailureKind::InvalidSecret,
            SwapError::TimelockInPast { .. } => FailureKind::TimelockInPast,
            SwapError::TimelockOrderingInvalid { .. } => FailureKind::TimelockOrderingInvalid,
            SwapError::TimelockNotExpired { .. } => FailureKind::TimelockNotExpired,
            SwapError::NoMatchingRecord { .. } => FailureKind::NoMatchingRecord,
            SwapError::ClaimTransactionNotFound { .. } => FailureKind::SwapNotFound,
            SwapError::InsufficientAllowance { .. } => FailureKind::InsufficientAllowance,
            SwapError::SubmissionTimeout { .. } => FailureKind::SubmissionTimeout,
            SwapError::RandomnessUnavailable(_) => FailureKind::RandomnessUnavailable,
            SwapError::Execution { kind, .. } => *kind,
            _ => FailureKind::Unknown,
        }
    }

    /// Check whether this failure was detected locally, before any
    /// fee-incurring chain submission.
    pub fn is_validation(&self) -> bool {
        !matches!(
            self,
            SwapError::Execution { .. }
                | SwapError::InsufficientAllowance { .. }
                | SwapError::SubmissionTimeout { .. }
        )
    }
}

/// Result type for swap coordination operations
pub type SwapResult<T> = Result<T, SwapError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn execution_errors_keep_raw_signal_and_kind() {
        let err = SwapError::Execution {
            operation: "claim",
            kind: FailureKind::AlreadyClaimed,
            raw: "MoveAbort(.., 102)".to_string(),
        };
        assert_eq!(err.kind(), FailureKind::AlreadyClaimed);
        let msg = err.to_string();
        assert!(msg.contains("already been claimed"));
        assert!(msg.contains("MoveAbort"));
        assert!(!err.is_validation());
    }

    #[test]
    fn validation_errors_are_local() {
        assert!(SwapError::InvalidSecret.is_validation());
        assert!(SwapError::TimelockInPast {
            timelock: 10,
            now: 20
        }
        .is_validation());
        assert!(!SwapError::SubmissionTimeout {
            operation: "lock",
            timeout_secs: 30
        }
        .is_validation());
    }
}
