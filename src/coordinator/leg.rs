//! Request and outcome types for single swap legs

use serde::Serialize;

use crate::secret::{HashLock, Secret};
use crate::store::{Asset, Chain, RecordId, SwapPhase, SwapRef, TxRef};
use crate::timelock::TimelockAdvisory;

/// Open the first leg of a swap: generate a fresh secret and lock funds
/// under its hashlock.
#[derive(Debug, Clone)]
pub struct InitiateRequest {
    pub chain: Chain,
    /// Counterparty address on `chain`; the only party able to claim the lock.
    pub counterparty: String,
    pub asset: Asset,
    pub amount: u128,
    /// Unix seconds after which this lock becomes refundable.
    pub timelock: u64,
}

/// Open the second leg under the initiator's existing hashlock.
#[derive(Debug, Clone)]
pub struct RespondRequest {
    pub chain: Chain,
    pub counterparty: String,
    pub asset: Asset,
    pub amount: u128,
    pub timelock: u64,
    /// Hashlock received out of band. When absent, the latest locally
    /// recorded initiator lock on the counterpart chain supplies it.
    pub hash_lock: Option<HashLock>,
    /// Initiator-leg timelock for the ordering check; only meaningful
    /// together with an explicit `hash_lock`.
    pub initiator_timelock: Option<u64>,
}

/// Claim a locked leg by revealing the secret.
#[derive(Debug, Clone)]
pub struct ClaimRequest {
    pub chain: Chain,
    /// Target lock; defaults to the latest locally recorded lock on `chain`.
    pub swap_ref: Option<SwapRef>,
    /// Explicit secret; when absent the coordinator searches its own records,
    /// then the counterpart claim transaction.
    pub secret: Option<Secret>,
    /// Counterpart-chain transaction in which the counterparty revealed the
    /// secret by claiming.
    pub counterpart_claim_tx: Option<TxRef>,
}

/// Reclaim a locked leg after its timelock expired.
#[derive(Debug, Clone)]
pub struct RefundRequest {
    pub chain: Chain,
    pub swap_ref: Option<SwapRef>,
}

/// Result of a coordinated action on one leg.
#[derive(Debug, Clone, Serialize)]
pub struct SwapOutcome {
    pub chain: Chain,
    pub phase: SwapPhase,
    pub swap_ref: Option<SwapRef>,
    pub tx_ref: Option<TxRef>,
    /// Record written for this action, when one was.
    pub record_id: Option<RecordId>,
    /// Hashlock of the leg; the initiator hands this to the counterparty.
    pub hash_lock: Option<HashLock>,
    pub advisory: Option<TimelockAdvisory>,
    /// The leg was already in this terminal phase; nothing was submitted.
    pub already_settled: bool,
}
