//! Off-chain coordinator for HTLC atomic swaps between an EVM chain and a
//! Sui-family chain.
//!
//! The coordinator generates secrets, validates timelock ordering, drives
//! lock/claim/refund submissions through per-chain adapters and records every
//! confirmed action in an append-only file store. It never executes chain
//! transactions itself: signing and RPC access live behind the
//! [`adapter::ChainTransport`] trait.
//!
//! A swap runs in two legs. The initiator locks first under a fresh secret's
//! hashlock; the responder locks second under the same hashlock with a
//! strictly shorter timelock. Claiming either leg reveals the secret on-chain,
//! which is what lets the other party claim theirs.

pub mod adapter;
pub mod classify;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod secret;
pub mod store;
pub mod timelock;

pub use adapter::{ChainAdapter, ChainTransport, EvmAdapter, SuiAdapter};
pub use config::Settings;
pub use coordinator::SwapCoordinator;
pub use error::{FailureKind, SwapError, SwapResult};
pub use secret::{HashAlgorithm, HashLock, Secret, SecretManager};
pub use store::{Chain, RecordStore, SwapPhase, SwapRecord};
pub use timelock::{TimelockAdvisory, TimelockValidator};
