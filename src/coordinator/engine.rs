//! Main coordination engine for atomic swap orchestration

use chrono::Utc;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::adapter::{ChainAdapter, ChainTransport, EvmAdapter, LockRequest, SuiAdapter, SwapState};
use crate::config::{ChainConfig, Settings};
use crate::coordinator::leg::{
    ClaimRequest, InitiateRequest, RefundRequest, RespondRequest, SwapOutcome,
};
use crate::error::{FailureKind, SwapError, SwapResult};
use crate::secret::{HashLock, Secret, SecretManager};
use crate::store::{
    Chain, PartyRecord, RecordSelector, RecordStore, Role, StoredRecord, SwapPhase, SwapRecord,
    SwapRef, TxRef,
};
use crate::timelock::{TimelockAdvisory, TimelockValidator};

/// Orchestrates swap legs across the configured chains.
///
/// Every confirmed on-chain action gets an append-only record before the
/// outcome is returned, so a crash after submission can always be reconciled
/// from the store plus the chain.
pub struct SwapCoordinator {
    store: Arc<RecordStore>,
    validator: TimelockValidator,
    adapters: HashMap<Chain, Arc<dyn ChainAdapter>>,
    submission_timeout: Duration,
}

impl SwapCoordinator {
    pub fn new(
        store: Arc<RecordStore>,
        validator: TimelockValidator,
        submission_timeout: Duration,
    ) -> Self {
        Self {
            store,
            validator,
            adapters: HashMap::new(),
            submission_timeout,
        }
    }

    /// Wire up a coordinator from settings plus one transport per chain.
    pub fn from_settings(
        settings: &Settings,
        transports: HashMap<Chain, Arc<dyn ChainTransport>>,
    ) -> SwapResult<Self> {
        let store = Arc::new(RecordStore::open(&settings.storage.record_dir)?);
        let validator = TimelockValidator::new(
            settings.policy.far_future_horizon_secs,
            settings.policy.reject_far_future,
        );
        let mut coordinator = Self::new(
            store,
            validator,
            Duration::from_secs(settings.policy.submission_timeout_secs),
        );

        for (name, chain_config) in settings.enabled_chains() {
            let adapter: Arc<dyn ChainAdapter> = match chain_config {
                ChainConfig::Evm {
                    contract_address,
                    owner_address,
                    gas_limit,
                    ..
                } => {
                    let transport = transports.get(&Chain::Evm).cloned().ok_or_else(|| {
                        SwapError::ChainNotConfigured {
                            chain: name.clone(),
                        }
                    })?;
                    Arc::new(EvmAdapter::new(
                        transport,
                        contract_address.clone(),
                        owner_address.clone(),
                        *gas_limit,
                    )?)
                }
                ChainConfig::Sui {
                    package_id,
                    module,
                    owner_address,
                    gas_budget,
                    ..
                } => {
                    let transport = transports.get(&Chain::Sui).cloned().ok_or_else(|| {
                        SwapError::ChainNotConfigured {
                            chain: name.clone(),
                        }
                    })?;
                    Arc::new(SuiAdapter::new(
                        transport,
                        package_id.clone(),
                        module.clone(),
                        owner_address.clone(),
                        *gas_budget,
                    )?)
                }
            };
            info!("Registered {} adapter for chain '{}'", adapter.chain(), name);
            coordinator.register_adapter(adapter);
        }
        Ok(coordinator)
    }

    /// Register the adapter for its chain, replacing any previous one.
    pub fn register_adapter(&mut self, adapter: Arc<dyn ChainAdapter>) {
        self.adapters.insert(adapter.chain(), adapter);
    }

    pub fn store(&self) -> &Arc<RecordStore> {
        &self.store
    }

    /// Open the first leg: generate a fresh secret, lock under its hashlock
    /// and persist the secret with the initiator record.
    pub async fn initiate(&self, request: InitiateRequest) -> SwapResult<SwapOutcome> {
        let adapter = self.adapter(request.chain)?;
        let advisory = self
            .validator
            .validate_initiator(unix_now(), request.timelock)?;
        log_advisory(&advisory);

        let (secret, hash_lock) = SecretManager::generate(adapter.hash_algorithm())?;
        let receipt = self
            .with_timeout(
                "lock",
                adapter.lock(&LockRequest {
                    counterparty: request.counterparty.clone(),
                    asset: request.asset.clone(),
                    amount: request.amount,
                    hash_lock,
                    timelock: request.timelock,
                }),
            )
            .await?;

        let record_id = self.store.append(SwapRecord {
            chain: request.chain,
            phase: SwapPhase::Locked,
            contract_ref: adapter.contract_ref(),
            swap_ref: Some(receipt.swap_ref.clone()),
            asset: request.asset,
            amount: request.amount,
            hash_lock,
            party: PartyRecord::Initiator { secret },
            timelock: request.timelock,
            counterparty_address: request.counterparty,
            owner_address: adapter.owner_address().to_string(),
            created_at: Utc::now(),
            tx_ref: Some(receipt.tx_ref.clone()),
            origin: None,
        })?;

        info!(
            "Initiated swap {} on {} (record {})",
            receipt.swap_ref, request.chain, record_id
        );
        Ok(SwapOutcome {
            chain: request.chain,
            phase: SwapPhase::Locked,
            swap_ref: Some(receipt.swap_ref),
            tx_ref: Some(receipt.tx_ref),
            record_id: Some(record_id),
            hash_lock: Some(hash_lock),
            advisory,
            already_settled: false,
        })
    }

    /// Open the second leg under the counterparty's hashlock. The responder
    /// timelock must expire strictly before the initiator's.
    pub async fn respond(&self, request: RespondRequest) -> SwapResult<SwapOutcome> {
        let adapter = self.adapter(request.chain)?;

        // An explicit hashlock wins; otherwise reuse the latest initiator
        // lock recorded on the counterpart chain, which also pins the
        // initiator timelock for the ordering check.
        let (hash_lock, initiator_timelock, origin) = match request.hash_lock {
            Some(hash_lock) => (hash_lock, request.initiator_timelock, None),
            None => {
                let initiator_leg = self.store.latest(
                    &RecordSelector::any()
                        .chain(request.chain.counterpart())
                        .role(Role::Initiator)
                        .phase(SwapPhase::Locked),
                )?;
                (
                    initiator_leg.record.hash_lock,
                    Some(initiator_leg.record.timelock),
                    Some(initiator_leg.id),
                )
            }
        };

        let advisory =
            self.validator
                .validate_responder(unix_now(), request.timelock, initiator_timelock)?;
        log_advisory(&advisory);

        let receipt = self
            .with_timeout(
                "lock",
                adapter.lock(&LockRequest {
                    counterparty: request.counterparty.clone(),
                    asset: request.asset.clone(),
                    amount: request.amount,
                    hash_lock,
                    timelock: request.timelock,
                }),
            )
            .await?;

        let record_id = self.store.append(SwapRecord {
            chain: request.chain,
            phase: SwapPhase::Locked,
            contract_ref: adapter.contract_ref(),
            swap_ref: Some(receipt.swap_ref.clone()),
            asset: request.asset,
            amount: request.amount,
            hash_lock,
            party: PartyRecord::Responder,
            timelock: request.timelock,
            counterparty_address: request.counterparty,
            owner_address: adapter.owner_address().to_string(),
            created_at: Utc::now(),
            tx_ref: Some(receipt.tx_ref.clone()),
            origin,
        })?;

        info!(
            "Responded with swap {} on {} (record {})",
            receipt.swap_ref, request.chain, record_id
        );
        Ok(SwapOutcome {
            chain: request.chain,
            phase: SwapPhase::Locked,
            swap_ref: Some(receipt.swap_ref),
            tx_ref: Some(receipt.tx_ref),
            record_id: Some(record_id),
            hash_lock: Some(hash_lock),
            advisory,
            already_settled: false,
        })
    }

    /// Claim a locked leg, resolving the secret from the request, the local
    /// records, or the counterpart claim transaction, in that order.
    pub async fn claim(&self, request: ClaimRequest) -> SwapResult<SwapOutcome> {
        let adapter = self.adapter(request.chain)?;
        let locked = self.locked_record(request.chain, request.swap_ref.as_ref())?;
        let swap_ref = locked_swap_ref(&locked)?;
        let hash_lock = locked.record.hash_lock;

        match self
            .with_timeout("state query", adapter.swap_state(&swap_ref))
            .await?
        {
            SwapState::Claimed => {
                info!("Swap {} on {} is already claimed", swap_ref, request.chain);
                return Ok(settled_outcome(request.chain, SwapPhase::Claimed, swap_ref));
            }
            SwapState::Refunded => {
                return Err(SwapError::Execution {
                    operation: "claim",
                    kind: FailureKind::AlreadyRefunded,
                    raw: format!("swap {} was refunded", swap_ref),
                });
            }
            SwapState::NotFound => {
                return Err(SwapError::Execution {
                    operation: "claim",
                    kind: FailureKind::SwapNotFound,
                    raw: format!("swap {} does not exist on {}", swap_ref, request.chain),
                });
            }
            SwapState::Locked => {}
        }

        let (secret, own_secret) = match request.secret {
            Some(secret) => (secret, true),
            None => match self.recorded_secret(&hash_lock) {
                Some(secret) => (secret, true),
                None => match &request.counterpart_claim_tx {
                    Some(tx_ref) => {
                        let counterpart = self.adapter(request.chain.counterpart())?;
                        let secret = self
                            .store
                            .find_by_secret_reveal(counterpart.as_ref(), tx_ref)
                            .await?;
                        (secret, false)
                    }
                    None => {
                        return Err(SwapError::NoMatchingRecord {
                            selector: format!("record holding the secret for {}", hash_lock),
                        })
                    }
                },
            },
        };

        // Reject locally instead of burning gas on a doomed claim.
        if !SecretManager::verify(&secret, &hash_lock, adapter.hash_algorithm()) {
            return Err(SwapError::InvalidSecret);
        }

        let receipt = self
            .with_timeout(
                "claim",
                adapter.claim(&swap_ref, &secret, &locked.record.asset),
            )
            .await?;

        // A secret we generated stays with the record; one lifted from the
        // counterparty's claim is already public and is not persisted again.
        let party = if own_secret {
            PartyRecord::Initiator { secret }
        } else {
            PartyRecord::Responder
        };
        let record_id = self.store.append(SwapRecord {
            chain: request.chain,
            phase: SwapPhase::Claimed,
            contract_ref: locked.record.contract_ref.clone(),
            swap_ref: Some(swap_ref.clone()),
            asset: locked.record.asset.clone(),
            amount: locked.record.amount,
            hash_lock,
            party,
            timelock: locked.record.timelock,
            counterparty_address: locked.record.counterparty_address.clone(),
            owner_address: adapter.owner_address().to_string(),
            created_at: Utc::now(),
            tx_ref: Some(receipt.tx_ref.clone()),
            origin: Some(locked.id),
        })?;

        info!(
            "Claimed swap {} on {} (record {})",
            swap_ref, request.chain, record_id
        );
        Ok(SwapOutcome {
            chain: request.chain,
            phase: SwapPhase::Claimed,
            swap_ref: Some(swap_ref),
            tx_ref: Some(receipt.tx_ref),
            record_id: Some(record_id),
            hash_lock: Some(hash_lock),
            advisory: None,
            already_settled: false,
        })
    }

    /// Reclaim an expired leg. Finding the leg claimed instead is a normal
    /// outcome: the counterparty settled first and revealed the secret.
    pub async fn refund(&self, request: RefundRequest) -> SwapResult<SwapOutcome> {
        let adapter = self.adapter(request.chain)?;
        let locked = self.locked_record(request.chain, request.swap_ref.as_ref())?;
        let swap_ref = locked_swap_ref(&locked)?;

        match self
            .with_timeout("state query", adapter.swap_state(&swap_ref))
            .await?
        {
            SwapState::Refunded => {
                info!("Swap {} on {} is already refunded", swap_ref, request.chain);
                return Ok(settled_outcome(
                    request.chain,
                    SwapPhase::Refunded,
                    swap_ref,
                ));
            }
            SwapState::Claimed => {
                info!(
                    "Swap {} on {} was claimed by the counterparty; their secret is now on-chain",
                    swap_ref, request.chain
                );
                return Ok(settled_outcome(request.chain, SwapPhase::Claimed, swap_ref));
            }
            SwapState::NotFound => {
                return Err(SwapError::Execution {
                    operation: "refund",
                    kind: FailureKind::SwapNotFound,
                    raw: format!("swap {} does not exist on {}", swap_ref, request.chain),
                });
            }
            SwapState::Locked => {}
        }

        self.validator
            .validate_refund_eligible(unix_now(), locked.record.timelock)?;

        let receipt = self
            .with_timeout("refund", adapter.refund(&swap_ref, &locked.record.asset))
            .await?;

        let record_id = self.store.append(SwapRecord {
            chain: request.chain,
            phase: SwapPhase::Refunded,
            contract_ref: locked.record.contract_ref.clone(),
            swap_ref: Some(swap_ref.clone()),
            asset: locked.record.asset.clone(),
            amount: locked.record.amount,
            hash_lock: locked.record.hash_lock,
            party: locked.record.party.clone(),
            timelock: locked.record.timelock,
            counterparty_address: locked.record.counterparty_address.clone(),
            owner_address: adapter.owner_address().to_string(),
            created_at: Utc::now(),
            tx_ref: Some(receipt.tx_ref.clone()),
            origin: Some(locked.id),
        })?;

        info!(
            "Refunded swap {} on {} (record {})",
            swap_ref, request.chain, record_id
        );
        Ok(SwapOutcome {
            chain: request.chain,
            phase: SwapPhase::Refunded,
            swap_ref: Some(swap_ref),
            tx_ref: Some(receipt.tx_ref),
            record_id: Some(record_id),
            hash_lock: Some(locked.record.hash_lock),
            advisory: None,
            already_settled: false,
        })
    }

    /// Extract the secret revealed by a claim transaction on `chain`.
    pub async fn revealed_secret(&self, chain: Chain, tx_ref: &TxRef) -> SwapResult<Secret> {
        let adapter = self.adapter(chain)?;
        self.store
            .find_by_secret_reveal(adapter.as_ref(), tx_ref)
            .await
    }

    fn adapter(&self, chain: Chain) -> SwapResult<&Arc<dyn ChainAdapter>> {
        self.adapters
            .get(&chain)
            .ok_or_else(|| SwapError::ChainNotConfigured {
                chain: chain.to_string(),
            })
    }

    /// The lock record an action targets: a specific swap, or the latest
    /// lock recorded on the chain.
    fn locked_record(&self, chain: Chain, swap_ref: Option<&SwapRef>) -> SwapResult<StoredRecord> {
        let selector = RecordSelector::any()
            .chain(chain)
            .phase(SwapPhase::Locked)
            .with_swap_ref();
        match swap_ref {
            Some(swap_ref) => self
                .store
                .all(&selector)
                .into_iter()
                .rev()
                .find(|stored| stored.record.swap_ref.as_ref() == Some(swap_ref))
                .ok_or_else(|| SwapError::NoMatchingRecord {
                    selector: format!("{} lock record for swap {}", chain, swap_ref),
                }),
            None => self.store.latest(&selector),
        }
    }

    /// The most recently recorded secret bound to this hashlock.
    fn recorded_secret(&self, hash_lock: &HashLock) -> Option<Secret> {
        self.store
            .all(&RecordSelector::any().with_secret())
            .into_iter()
            .rev()
            .find(|stored| stored.record.hash_lock == *hash_lock)
            .and_then(|stored| stored.record.party.secret().cloned())
    }

    async fn with_timeout<T>(
        &self,
        operation: &'static str,
        fut: impl Future<Output = SwapResult<T>>,
    ) -> SwapResult<T> {
        match tokio::time::timeout(self.submission_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(SwapError::SubmissionTimeout {
                operation,
                timeout_secs: self.submission_timeout.as_secs(),
            }),
        }
    }
}

fn unix_now() -> u64 {
    Utc::now().timestamp().max(0) as u64
}

fn log_advisory(advisory: &Option<TimelockAdvisory>) {
    if let Some(TimelockAdvisory::SuspiciousFarFutureTimelock { timelock, horizon }) = advisory {
        warn!(
            "Initiator timelock {} is more than {}s out; check the unit and the counterparty",
            timelock, horizon
        );
    }
}

fn locked_swap_ref(locked: &StoredRecord) -> SwapResult<SwapRef> {
    locked
        .record
        .swap_ref
        .clone()
        .ok_or_else(|| SwapError::Storage(format!("record {} has no swap reference", locked.id)))
}

fn settled_outcome(chain: Chain, phase: SwapPhase, swap_ref: SwapRef) -> SwapOutcome {
    SwapOutcome {
        chain,
        phase,
        swap_ref: Some(swap_ref),
        tx_ref: None,
        record_id: None,
        hash_lock: None,
        advisory: None,
        already_settled: true,
    }
}
