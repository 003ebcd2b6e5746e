//! Chain adapters
//!
//! This module provides:
//! - Wire encoding of lock/claim/refund calls per chain family
//! - Precondition checks ahead of submission
//! - Failure classification into the shared taxonomy
//! - Secret extraction from executed claim transactions
//!
//! Adapters never sign or broadcast themselves; they hand fully-encoded calls
//! to a [`ChainTransport`], which owns keys, RPC endpoints and receipt
//! normalization. That keeps every protocol decision testable without a node.

pub mod evm;
pub mod sui;

pub use evm::EvmAdapter;
pub use sui::SuiAdapter;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::error::SwapResult;
use crate::secret::{HashAlgorithm, HashLock, Secret};
use crate::store::{Asset, Chain, ContractRef, SwapRef, TxRef};

/// A fully-encoded call ready for signing and submission.
#[derive(Debug, Clone)]
pub enum ChainCall {
    Evm {
        to: String,
        calldata: Vec<u8>,
        /// Native value attached to the call, in wei.
        value: u128,
        gas_limit: u64,
    },
    MoveCall {
        package: String,
        module: String,
        function: String,
        type_args: Vec<String>,
        args: Vec<MoveArg>,
        gas_budget: u64,
    },
}

/// One argument of a Move call, in submission order.
#[derive(Debug, Clone, PartialEq)]
pub enum MoveArg {
    /// A shared or owned object id.
    Object(String),
    Address(String),
    Pure(Value),
    /// The `0x6` system clock object.
    Clock,
    /// A coin of this balance split off the gas coin by the transport.
    SplitGas(u128),
}

/// A read-only lookup the transport answers with normalized JSON.
#[derive(Debug, Clone, PartialEq)]
pub enum ChainQuery {
    /// `eth_call` against a contract; answered with the decoded return value.
    EvmCall { to: String, calldata: Vec<u8> },
    /// Transaction by hash; `Null` when unknown to the node.
    EvmTransaction { tx_ref: String },
    /// Object by id, with `{"status": "exists" | "deleted" | "not_found"}`
    /// and, where the node indexes it, a `"terminal"` settlement marker.
    SuiObject { object_id: String },
    /// Transaction block by digest; `Null` when unknown.
    SuiTransaction { tx_ref: String },
    /// An owned coin of the given type holding at least `min_balance`;
    /// `Null` when the signer owns none.
    SuiCoinWithBalance { coin_type: String, min_balance: u128 },
}

/// Outcome of a submitted call.
#[derive(Debug, Clone)]
pub struct Submission {
    pub tx_ref: TxRef,
    /// Normalized execution effects (event fields, object changes, status).
    pub effects: Value,
}

/// Raw failure signal from the transport; classification happens adapter-side.
#[derive(Debug, Clone, Error)]
#[error("{raw}")]
pub struct TransportError {
    pub raw: String,
}

impl TransportError {
    pub fn new(raw: impl Into<String>) -> Self {
        Self { raw: raw.into() }
    }
}

/// Signing and RPC surface an adapter drives.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChainTransport: Send + Sync {
    /// Sign and submit a call, waiting for execution effects.
    async fn submit(&self, call: ChainCall) -> Result<Submission, TransportError>;

    /// Answer a read-only query.
    async fn query(&self, query: ChainQuery) -> Result<Value, TransportError>;
}

/// Parameters for locking funds into a new swap.
#[derive(Debug, Clone)]
pub struct LockRequest {
    /// Counterparty address on the target chain; the only party able to claim.
    pub counterparty: String,
    pub asset: Asset,
    /// Amount in the asset's smallest unit.
    pub amount: u128,
    pub hash_lock: HashLock,
    /// Unix seconds after which the locking party may refund.
    pub timelock: u64,
}

/// Receipt of a confirmed lock.
#[derive(Debug, Clone)]
pub struct LockReceipt {
    /// Chain-assigned swap handle: the contract's swap id or the HTLC object.
    pub swap_ref: SwapRef,
    pub tx_ref: TxRef,
}

/// Receipt of a confirmed claim or refund.
#[derive(Debug, Clone)]
pub struct ActionReceipt {
    pub tx_ref: TxRef,
    /// The secret this action made public, when the adapter knows it.
    pub revealed_secret: Option<Secret>,
    pub effects: Value,
}

/// On-chain lifecycle state of one swap leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapState {
    Locked,
    Claimed,
    Refunded,
    NotFound,
}

/// One chain family's view of the swap protocol.
#[async_trait]
pub trait ChainAdapter: Send + Sync {
    fn chain(&self) -> Chain;

    /// Digest function the deployed contract applies to secrets.
    fn hash_algorithm(&self) -> HashAlgorithm;

    fn contract_ref(&self) -> ContractRef;

    /// Address the transport signs with on this chain.
    fn owner_address(&self) -> &str;

    /// Lock funds under a hashlock and timelock.
    async fn lock(&self, request: &LockRequest) -> SwapResult<LockReceipt>;

    /// Claim locked funds by revealing the secret. The asset must be the one
    /// locked; Move entry functions are generic over it.
    async fn claim(
        &self,
        swap_ref: &SwapRef,
        secret: &Secret,
        asset: &Asset,
    ) -> SwapResult<ActionReceipt>;

    /// Reclaim locked funds after timelock expiry.
    async fn refund(&self, swap_ref: &SwapRef, asset: &Asset) -> SwapResult<ActionReceipt>;

    /// Current on-chain state of a swap leg.
    async fn swap_state(&self, swap_ref: &SwapRef) -> SwapResult<SwapState>;

    /// Extract the secret a counterparty revealed in an executed claim.
    async fn extract_revealed_secret(&self, tx_ref: &TxRef) -> SwapResult<Secret>;
}
