//! Swap record persistence
//!
//! Handles:
//! - Append-only JSON records of every lock, claim and refund
//! - Chain/role directory segmentation
//! - Monotonic record ids for "latest" selection
//! - Selector queries over the in-memory index

mod manager;
mod record;

pub use manager::RecordStore;
pub use record::{
    Asset, Chain, ContractRef, PartyRecord, RecordId, RecordSelector, Role, StoredRecord,
    SwapPhase, SwapRecord, SwapRef, TxRef,
};
