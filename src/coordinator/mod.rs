//! Swap coordination engine
//!
//! The coordination engine:
//! 1. Validates timelock ordering before any funds move
//! 2. Drives lock/claim/refund submissions through chain adapters
//! 3. Records every confirmed action in the append-only store
//! 4. Resolves secrets from records or counterpart claim transactions

pub mod engine;
pub mod leg;

pub use engine::SwapCoordinator;
pub use leg::{ClaimRequest, InitiateRequest, RefundRequest, RespondRequest, SwapOutcome};
