//! Chain failure classification
//!
//! Maps raw chain failure signals (EVM revert reasons, Sui Move aborts, RPC
//! error strings) onto the shared [`FailureKind`] taxonomy. Classification is
//! total: an unrecognized signal becomes [`FailureKind::Unknown`] rather than
//! an error, so classifying can never fail the operation that produced the
//! signal.

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::FailureKind;
use crate::store::Chain;

lazy_static! {
    /// `error_code: N` as surfaced by dry-run / execution RPC errors.
    static ref EXPLICIT_ABORT_CODE: Regex = Regex::new(r"error_code:\s*(\d+)").unwrap();
    /// Trailing code of a `MoveAbort(MoveLocation { .. }, N)` effects status.
    static ref TRAILING_ABORT_CODE: Regex = Regex::new(r",\s*(\d+)\s*\)").unwrap();
}

/// Classify a raw failure signal from the given chain family.
pub fn classify(chain: Chain, raw: &str) -> FailureKind {
    match chain {
        Chain::Evm => classify_evm(raw),
        Chain::Sui => classify_sui(raw),
    }
}

/// EVM classification: substring match over the contract's revert reasons and
/// common node-level errors.
pub fn classify_evm(raw: &str) -> FailureKind {
    let msg = raw.to_ascii_lowercase();

    if msg.contains("invalid secret") || msg.contains("secret does not match") {
        FailureKind::InvalidSecret
    } else if msg.contains("not the recipient") {
        FailureKind::NotDesignatedRecipient
    } else if msg.contains("already claimed") {
        FailureKind::AlreadyClaimed
    } else if msg.contains("already refunded") {
        FailureKind::AlreadyRefunded
    } else if msg.contains("not the sender") {
        FailureKind::NotSender
    } else if msg.contains("timelock not expired") {
        FailureKind::TimelockNotExpired
    } else if msg.contains("swap not found") {
        FailureKind::SwapNotFound
    } else if msg.contains("insufficient funds") || msg.contains("insufficient balance") {
        FailureKind::InsufficientBalance
    } else {
        FailureKind::Unknown
    }
}

/// Sui classification: the swap module's abort codes, plus the object-layer
/// errors a consumed or bogus HTLC id produces.
///
/// Claim aborts: 100 bad secret, 101 wrong recipient, 102 already claimed.
/// Refund aborts: 200 already claimed, 201 timelock not expired, 202 not the
/// sender.
pub fn classify_sui(raw: &str) -> FailureKind {
    if let Some(code) = extract_abort_code(raw) {
        return match code {
            100 => FailureKind::InvalidSecret,
            101 => FailureKind::NotDesignatedRecipient,
            102 | 200 => FailureKind::AlreadyClaimed,
            201 => FailureKind::TimelockNotExpired,
            202 => FailureKind::NotSender,
            _ => FailureKind::Unknown,
        };
    }

    let msg = raw.to_ascii_lowercase();
    if msg.contains("invalid input objects")
        || msg.contains("object does not exist")
        || msg.contains("notexists")
    {
        FailureKind::SwapNotFound
    } else if msg.contains("insufficientgas")
        || msg.contains("insufficient gas")
        || msg.contains("insufficient balance")
    {
        FailureKind::InsufficientBalance
    } else {
        FailureKind::Unknown
    }
}

/// Pull the Move abort code out of a failure signal, if one is present.
fn extract_abort_code(raw: &str) -> Option<u64> {
    if let Some(caps) = EXPLICIT_ABORT_CODE.captures(raw) {
        return caps[1].parse().ok();
    }
    if raw.contains("MoveAbort") {
        // The location struct nests parentheses, so take the last trailing
        // ", N)" group.
        return TRAILING_ABORT_CODE
            .captures_iter(raw)
            .last()
            .and_then(|caps| caps[1].parse().ok());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evm_revert_reasons_map_to_taxonomy() {
        assert_eq!(classify_evm("execution reverted: Invalid secret"), FailureKind::InvalidSecret);
        assert_eq!(classify_evm("Already claimed"), FailureKind::AlreadyClaimed);
        assert_eq!(classify_evm("Already refunded"), FailureKind::AlreadyRefunded);
        assert_eq!(classify_evm("Not the sender"), FailureKind::NotSender);
        assert_eq!(classify_evm("Not the recipient"), FailureKind::NotDesignatedRecipient);
        assert_eq!(classify_evm("Timelock not expired"), FailureKind::TimelockNotExpired);
        assert_eq!(classify_evm("Swap not found"), FailureKind::SwapNotFound);
        assert_eq!(
            classify_evm("insufficient funds for gas * price + value"),
            FailureKind::InsufficientBalance
        );
    }

    #[test]
    fn sui_abort_codes_map_to_taxonomy() {
        assert_eq!(classify_sui("error_code: 100"), FailureKind::InvalidSecret);
        assert_eq!(
            classify_sui("error_code: 101"),
            FailureKind::NotDesignatedRecipient
        );
        assert_eq!(classify_sui("error_code: 102"), FailureKind::AlreadyClaimed);
        assert_eq!(
            classify_sui(
                "MoveAbort(MoveLocation { module: ModuleId { address: 0xabc, \
                 name: Identifier(\"swap\") }, function: 2, instruction: 35, \
                 function_name: Some(\"refund\") }, 201) in command 0"
            ),
            FailureKind::TimelockNotExpired
        );
        assert_eq!(
            classify_sui("MoveAbort(MoveLocation { .. }, 200)"),
            FailureKind::AlreadyClaimed
        );
        assert_eq!(
            classify_sui("MoveAbort(MoveLocation { .. }, 202)"),
            FailureKind::NotSender
        );
    }

    #[test]
    fn sui_object_errors_map_to_swap_not_found() {
        assert_eq!(
            classify_sui("invalid input objects: 0xdeadbeef"),
            FailureKind::SwapNotFound
        );
        assert_eq!(
            classify_sui("object does not exist at version 42"),
            FailureKind::SwapNotFound
        );
    }

    #[test]
    fn unrecognized_signals_become_unknown_not_errors() {
        assert_eq!(classify_evm("something exploded"), FailureKind::Unknown);
        assert_eq!(classify_sui("something exploded"), FailureKind::Unknown);
        assert_eq!(classify_sui("MoveAbort(MoveLocation { .. }, 999)"), FailureKind::Unknown);
        assert_eq!(classify(Chain::Evm, ""), FailureKind::Unknown);
        assert_eq!(classify(Chain::Sui, ""), FailureKind::Unknown);
    }
}
