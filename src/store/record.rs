//! Persisted swap record model
//!
//! One record per coordinator action, immutable once written. Who-knows-the-
//! secret is encoded in the type: an initiator-side record carries the secret,
//! a responder-side record never does, so a record observed from a
//! counterparty cannot accidentally claim to hold one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::secret::{HashLock, Secret};

/// The two chain families a swap spans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Chain {
    Evm,
    Sui,
}

impl Chain {
    /// The chain holding the other leg of a swap.
    pub fn counterpart(&self) -> Chain {
        match self {
            Chain::Evm => Chain::Sui,
            Chain::Sui => Chain::Evm,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Chain::Evm => "evm",
            Chain::Sui => "sui",
        }
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Swap participant role. The initiator locks first and bears the longer
/// exposure window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Initiator,
    Responder,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Initiator => "initiator",
            Role::Responder => "responder",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle phase of one swap leg. `Claimed` and `Refunded` are terminal and
/// mutually exclusive per leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwapPhase {
    Locked,
    Claimed,
    Refunded,
}

/// Asset locked in an HTLC: the chain's native coin or a token/coin type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "kind", content = "id")]
pub enum Asset {
    Native,
    Token(String),
}

/// Where the HTLC contract lives on its chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "family")]
pub enum ContractRef {
    Evm { address: String },
    Sui { package: String, module: String },
}

impl fmt::Display for ContractRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContractRef::Evm { address } => f.write_str(address),
            ContractRef::Sui { package, module } => write!(f, "{}::{}", package, module),
        }
    }
}

/// On-chain identifier of one HTLC: a bytes32 swap id on EVM, an object id on
/// Sui. Absent until the lock transaction confirms.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SwapRef(pub String);

impl fmt::Display for SwapRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque confirmed-transaction reference (tx hash or digest).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxRef(pub String);

impl fmt::Display for TxRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Store-assigned monotonic record id; the authoritative "latest" ordering.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct RecordId(pub u64);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Role-tagged party data. Only the side that knows the secret may persist it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "role")]
pub enum PartyRecord {
    Initiator { secret: Secret },
    Responder,
}

impl PartyRecord {
    pub fn role(&self) -> Role {
        match self {
            PartyRecord::Initiator { .. } => Role::Initiator,
            PartyRecord::Responder => Role::Responder,
        }
    }

    pub fn secret(&self) -> Option<&Secret> {
        match self {
            PartyRecord::Initiator { secret } => Some(secret),
            PartyRecord::Responder => None,
        }
    }
}

/// One persisted swap action. Append-only; a new action appends a new record
/// and never rewrites an old one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwapRecord {
    pub chain: Chain,
    pub phase: SwapPhase,
    pub contract_ref: ContractRef,
    pub swap_ref: Option<SwapRef>,
    pub asset: Asset,
    /// Chain-native smallest unit, persisted as a decimal string since wei
    /// amounts overflow a JSON number.
    #[serde(with = "amount_string")]
    pub amount: u128,
    pub hash_lock: HashLock,
    #[serde(flatten)]
    pub party: PartyRecord,
    /// Unix seconds after which the locker may reclaim.
    pub timelock: u64,
    pub counterparty_address: String,
    pub owner_address: String,
    pub created_at: DateTime<Utc>,
    /// Transaction that produced this record, when one was submitted.
    pub tx_ref: Option<TxRef>,
    /// Record this one was derived from, for audit.
    pub origin: Option<RecordId>,
}

impl SwapRecord {
    pub fn role(&self) -> Role {
        self.party.role()
    }

    pub fn has_secret(&self) -> bool {
        self.party.secret().is_some()
    }
}

mod amount_string {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(amount: &u128, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&amount.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

/// A record together with its store-assigned id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredRecord {
    pub id: RecordId,
    #[serde(flatten)]
    pub record: SwapRecord,
}

/// Narrows a `latest`/`all` lookup by chain, role, phase, and field presence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordSelector {
    pub chain: Option<Chain>,
    pub role: Option<Role>,
    pub phase: Option<SwapPhase>,
    pub has_secret: Option<bool>,
    pub has_swap_ref: Option<bool>,
}

impl RecordSelector {
    /// Matches every record; chain with the builder methods to narrow.
    pub fn any() -> Self {
        Self::default()
    }

    pub fn chain(mut self, chain: Chain) -> Self {
        self.chain = Some(chain);
        self
    }

    pub fn role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }

    pub fn phase(mut self, phase: SwapPhase) -> Self {
        self.phase = Some(phase);
        self
    }

    pub fn with_secret(mut self) -> Self {
        self.has_secret = Some(true);
        self
    }

    pub fn with_swap_ref(mut self) -> Self {
        self.has_swap_ref = Some(true);
        self
    }

    pub fn matches(&self, record: &SwapRecord) -> bool {
        if let Some(chain) = self.chain {
            if record.chain != chain {
                return false;
            }
        }
        if let Some(role) = self.role {
            if record.role() != role {
                return false;
            }
        }
        if let Some(phase) = self.phase {
            if record.phase != phase {
                return false;
            }
        }
        if let Some(want) = self.has_secret {
            if record.has_secret() != want {
                return false;
            }
        }
        if let Some(want) = self.has_swap_ref {
            if record.swap_ref.is_some() != want {
                return false;
            }
        }
        true
    }
}

impl fmt::Display for RecordSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(chain) = self.chain {
            parts.push(format!("chain={}", chain));
        }
        if let Some(role) = self.role {
            parts.push(format!("role={}", role));
        }
        if let Some(phase) = self.phase {
            parts.push(format!("phase={:?}", phase));
        }
        if let Some(v) = self.has_secret {
            parts.push(format!("has_secret={}", v));
        }
        if let Some(v) = self.has_swap_ref {
            parts.push(format!("has_swap_ref={}", v));
        }
        if parts.is_empty() {
            f.write_str("any record")
        } else {
            f.write_str(&parts.join(" "))
        }
    }
}
