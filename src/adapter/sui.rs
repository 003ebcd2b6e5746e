//! Sui adapter
//!
//! Builds Move calls against the published swap package. The HTLC lives in a
//! shared object created by `init_swap`; claiming or refunding consumes it, so
//! settled swaps show up as deleted objects rather than flagged records.
//!
//! Token locks need a concrete coin object to escrow. The adapter asks the
//! transport for one holding enough balance before building the call, turning
//! a doomed submission into an immediate, classified error.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info};

use crate::adapter::{
    ActionReceipt, ChainAdapter, ChainCall, ChainQuery, ChainTransport, LockReceipt, LockRequest,
    MoveArg, Submission, SwapState, TransportError,
};
use crate::classify::classify_sui;
use crate::error::{FailureKind, SwapError, SwapResult};
use crate::secret::{HashAlgorithm, Secret, DIGEST_LEN};
use crate::store::{Asset, Chain, ContractRef, SwapRef, TxRef};

const NATIVE_COIN_TYPE: &str = "0x2::sui::SUI";

/// Adapter for the Move swap package.
pub struct SuiAdapter {
    transport: Arc<dyn ChainTransport>,
    package_id: String,
    module: String,
    owner_address: String,
    gas_budget: u64,
}

impl SuiAdapter {
    pub fn new(
        transport: Arc<dyn ChainTransport>,
        package_id: String,
        module: String,
        owner_address: String,
        gas_budget: u64,
    ) -> SwapResult<Self> {
        validate_sui_address(&package_id)?;
        validate_sui_address(&owner_address)?;
        Ok(Self {
            transport,
            package_id,
            module,
            owner_address,
            gas_budget,
        })
    }

    fn move_call(&self, function: &str, type_args: Vec<String>, args: Vec<MoveArg>) -> ChainCall {
        ChainCall::MoveCall {
            package: self.package_id.clone(),
            module: self.module.clone(),
            function: function.to_string(),
            type_args,
            args,
            gas_budget: self.gas_budget,
        }
    }

    async fn submit(&self, operation: &'static str, call: ChainCall) -> SwapResult<Submission> {
        let submission = self
            .transport
            .submit(call)
            .await
            .map_err(|e| execution_error(operation, e))?;

        // Some nodes report aborts through effects instead of the RPC error.
        if submission.effects["status"].as_str() == Some("failure") {
            let raw = submission.effects["error"]
                .as_str()
                .unwrap_or("execution failed")
                .to_string();
            return Err(SwapError::Execution {
                operation,
                kind: classify_sui(&raw),
                raw,
            });
        }
        Ok(submission)
    }

    /// Find a coin object able to cover a token lock.
    async fn escrow_coin(&self, coin_type: &str, amount: u128) -> SwapResult<MoveArg> {
        let coin = self
            .transport
            .query(ChainQuery::SuiCoinWithBalance {
                coin_type: coin_type.to_string(),
                min_balance: amount,
            })
            .await
            .map_err(|e| execution_error("coin lookup", e))?;

        let object_id = coin["coinObjectId"].as_str().ok_or(SwapError::Execution {
            operation: "lock",
            kind: FailureKind::InsufficientBalance,
            raw: format!("no {} coin holds {}", coin_type, amount),
        })?;
        debug!("Escrowing coin {} for {} units", object_id, amount);
        Ok(MoveArg::Object(object_id.to_string()))
    }

    fn swap_object_marker(&self) -> String {
        format!("::{}::Swap", self.module)
    }
}

#[async_trait]
impl ChainAdapter for SuiAdapter {
    fn chain(&self) -> Chain {
        Chain::Sui
    }

    // Both deployed contracts digest secrets with SHA-256, so a hashlock
    // generated for one chain binds on the other.
    fn hash_algorithm(&self) -> HashAlgorithm {
        HashAlgorithm::Sha256
    }

    fn contract_ref(&self) -> ContractRef {
        ContractRef::Sui {
            package: self.package_id.clone(),
            module: self.module.clone(),
        }
    }

    fn owner_address(&self) -> &str {
        &self.owner_address
    }

    async fn lock(&self, request: &LockRequest) -> SwapResult<LockReceipt> {
        if request.amount == 0 {
            return Err(SwapError::ZeroAmount);
        }
        validate_sui_address(&request.counterparty)?;

        let coin_arg = match &request.asset {
            Asset::Native => MoveArg::SplitGas(request.amount),
            Asset::Token(coin_type) => self.escrow_coin(coin_type, request.amount).await?,
        };

        let call = self.move_call(
            "init_swap",
            vec![coin_type(&request.asset)],
            vec![
                MoveArg::Address(request.counterparty.clone()),
                coin_arg,
                MoveArg::Pure(json!(request.amount.to_string())),
                MoveArg::Pure(json!(request.hash_lock.as_bytes().to_vec())),
                MoveArg::Pure(json!(request.timelock.to_string())),
            ],
        );
        let submission = self.submit("lock", call).await?;

        let marker = self.swap_object_marker();
        let swap_ref = submission.effects["objectChanges"]
            .as_array()
            .into_iter()
            .flatten()
            .find(|change| {
                change["type"].as_str() == Some("created")
                    && change["objectType"]
                        .as_str()
                        .is_some_and(|t| t.contains(&marker))
            })
            .and_then(|change| change["objectId"].as_str())
            .map(|object_id| SwapRef(object_id.to_string()))
            .ok_or_else(|| {
                execution_error("lock", TransportError::new("no swap object created"))
            })?;

        info!("Locked swap object {} in tx {}", swap_ref, submission.tx_ref);
        Ok(LockReceipt {
            swap_ref,
            tx_ref: submission.tx_ref,
        })
    }

    async fn claim(
        &self,
        swap_ref: &SwapRef,
        secret: &Secret,
        asset: &Asset,
    ) -> SwapResult<ActionReceipt> {
        let call = self.move_call(
            "claim",
            vec![coin_type(asset)],
            vec![
                MoveArg::Object(swap_ref.0.clone()),
                MoveArg::Address(self.owner_address.clone()),
                MoveArg::Pure(json!(secret.as_bytes().to_vec())),
            ],
        );
        let submission = self.submit("claim", call).await?;
        info!("Claimed swap object {} in tx {}", swap_ref, submission.tx_ref);
        Ok(ActionReceipt {
            tx_ref: submission.tx_ref,
            revealed_secret: Some(secret.clone()),
            effects: submission.effects,
        })
    }

    async fn refund(&self, swap_ref: &SwapRef, asset: &Asset) -> SwapResult<ActionReceipt> {
        let call = self.move_call(
            "refund",
            vec![coin_type(asset)],
            vec![
                MoveArg::Object(swap_ref.0.clone()),
                MoveArg::Clock,
            ],
        );
        let submission = self.submit("refund", call).await?;
        info!("Refunded swap object {} in tx {}", swap_ref, submission.tx_ref);
        Ok(ActionReceipt {
            tx_ref: submission.tx_ref,
            revealed_secret: None,
            effects: submission.effects,
        })
    }

    async fn swap_state(&self, swap_ref: &SwapRef) -> SwapResult<SwapState> {
        let object = self
            .transport
            .query(ChainQuery::SuiObject {
                object_id: swap_ref.0.clone(),
            })
            .await
            .map_err(|e| execution_error("state query", e))?;

        match object["status"].as_str() {
            Some("exists") => Ok(SwapState::Locked),
            // A consumed object is terminal; which way it settled is only
            // known when the node indexes the consuming transaction.
            Some("deleted") => match object["terminal"].as_str() {
                Some("claimed") => Ok(SwapState::Claimed),
                Some("refunded") => Ok(SwapState::Refunded),
                _ => Ok(SwapState::NotFound),
            },
            _ => Ok(SwapState::NotFound),
        }
    }

    async fn extract_revealed_secret(&self, tx_ref: &TxRef) -> SwapResult<Secret> {
        let tx = self
            .transport
            .query(ChainQuery::SuiTransaction {
                tx_ref: tx_ref.0.clone(),
            })
            .await
            .map_err(|e| execution_error("transaction lookup", e))?;

        if tx.is_null() {
            return Err(SwapError::ClaimTransactionNotFound {
                tx_ref: tx_ref.0.clone(),
            });
        }

        let not_a_claim = || SwapError::NotAClaimTransaction {
            tx_ref: tx_ref.0.clone(),
        };

        let claim_target = format!("::{}::claim", self.module);
        let claim_call = tx["transactions"]
            .as_array()
            .into_iter()
            .flatten()
            .find(|call| {
                call["kind"].as_str() == Some("MoveCall")
                    && call["target"]
                        .as_str()
                        .is_some_and(|t| t.ends_with(&claim_target))
            })
            .ok_or_else(not_a_claim)?;

        // Secret is the third argument, passed by value through the inputs.
        let input_index = claim_call["arguments"][2]["index"]
            .as_u64()
            .ok_or_else(not_a_claim)?;
        let input = &tx["inputs"][input_index as usize];
        if input["valueType"].as_str() != Some("vector<u8>") {
            return Err(not_a_claim());
        }

        let bytes: Vec<u8> = input["value"]
            .as_array()
            .ok_or_else(not_a_claim)?
            .iter()
            .map(|v| v.as_u64().and_then(|b| u8::try_from(b).ok()))
            .collect::<Option<Vec<u8>>>()
            .ok_or_else(not_a_claim)?;
        let bytes: [u8; DIGEST_LEN] = bytes.try_into().map_err(|_| not_a_claim())?;
        Ok(Secret::from_bytes(bytes))
    }
}

/// The type argument every entry function of the swap package takes.
fn coin_type(asset: &Asset) -> String {
    match asset {
        Asset::Native => NATIVE_COIN_TYPE.to_string(),
        Asset::Token(coin_type) => coin_type.clone(),
    }
}

fn validate_sui_address(address: &str) -> SwapResult<()> {
    let invalid = || SwapError::InvalidAddress {
        address: address.to_string(),
        chain: "sui",
    };
    let digits = address.strip_prefix("0x").ok_or_else(invalid)?;
    if digits.is_empty() || digits.len() > 64 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(invalid());
    }
    Ok(())
}

fn execution_error(operation: &'static str, e: TransportError) -> SwapError {
    SwapError::Execution {
        operation,
        kind: classify_sui(&e.raw),
        raw: e.raw,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::MockChainTransport;
    use crate::secret::SecretManager;
    use mockall::Sequence;

    const PACKAGE: &str = "0xabc123";
    const OWNER: &str = "0xdef456";
    const RECIPIENT: &str = "0x789abc";
    const COIN_TYPE: &str = "0xabc123::managed::MANAGED";

    fn adapter(transport: MockChainTransport) -> SuiAdapter {
        SuiAdapter::new(
            Arc::new(transport),
            PACKAGE.to_string(),
            "swap".to_string(),
            OWNER.to_string(),
            10_000_000,
        )
        .unwrap()
    }

    fn lock_request(asset: Asset) -> LockRequest {
        let (_, hash_lock) = SecretManager::generate(HashAlgorithm::Sha256).unwrap();
        LockRequest {
            counterparty: RECIPIENT.to_string(),
            asset,
            amount: 5_000,
            hash_lock,
            timelock: 1_700_000_300,
        }
    }

    fn lock_effects() -> Value {
        json!({
            "status": "success",
            "objectChanges": [
                { "type": "mutated", "objectType": "0x2::coin::Coin<0x2::sui::SUI>", "objectId": "0x1" },
                { "type": "created", "objectType": format!("{}::swap::Swap<0x2::sui::SUI>", PACKAGE), "objectId": "0xswap1" },
            ]
        })
    }

    #[tokio::test]
    async fn native_lock_splits_gas_and_reads_created_object() {
        let mut transport = MockChainTransport::new();
        transport
            .expect_submit()
            .withf(|call| match call {
                ChainCall::MoveCall {
                    package,
                    module,
                    function,
                    type_args,
                    args,
                    ..
                } => {
                    package == PACKAGE
                        && module == "swap"
                        && function == "init_swap"
                        && type_args == &[NATIVE_COIN_TYPE.to_string()]
                        && args[1] == MoveArg::SplitGas(5_000)
                }
                _ => false,
            })
            .returning(|_| {
                Ok(Submission {
                    tx_ref: TxRef("digest1".to_string()),
                    effects: lock_effects(),
                })
            });

        let receipt = adapter(transport)
            .lock(&lock_request(Asset::Native))
            .await
            .unwrap();
        assert_eq!(receipt.swap_ref.0, "0xswap1");
    }

    #[tokio::test]
    async fn token_lock_escrows_a_looked_up_coin() {
        let mut transport = MockChainTransport::new();
        let mut seq = Sequence::new();
        transport
            .expect_query()
            .times(1)
            .in_sequence(&mut seq)
            .withf(|query| {
                *query
                    == ChainQuery::SuiCoinWithBalance {
                        coin_type: COIN_TYPE.to_string(),
                        min_balance: 5_000,
                    }
            })
            .returning(|_| Ok(json!({ "coinObjectId": "0xcoin9" })));
        transport
            .expect_submit()
            .times(1)
            .in_sequence(&mut seq)
            .withf(|call| match call {
                ChainCall::MoveCall { args, type_args, .. } => {
                    args[1] == MoveArg::Object("0xcoin9".to_string())
                        && type_args == &[COIN_TYPE.to_string()]
                }
                _ => false,
            })
            .returning(|_| {
                Ok(Submission {
                    tx_ref: TxRef("digest2".to_string()),
                    effects: lock_effects(),
                })
            });

        adapter(transport)
            .lock(&lock_request(Asset::Token(COIN_TYPE.to_string())))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn missing_coin_is_insufficient_balance() {
        let mut transport = MockChainTransport::new();
        transport.expect_query().returning(|_| Ok(Value::Null));

        let err = adapter(transport)
            .lock(&lock_request(Asset::Token(COIN_TYPE.to_string())))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), FailureKind::InsufficientBalance);
    }

    #[tokio::test]
    async fn claim_abort_codes_are_classified() {
        let mut transport = MockChainTransport::new();
        transport
            .expect_submit()
            .returning(|_| Err(TransportError::new("error_code: 100 in command 0")));

        let (secret, _) = SecretManager::generate(HashAlgorithm::Sha256).unwrap();
        let err = adapter(transport)
            .claim(&SwapRef("0xswap1".to_string()), &secret, &Asset::Native)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), FailureKind::InvalidSecret);
    }

    #[tokio::test]
    async fn effects_level_failure_is_classified() {
        let mut transport = MockChainTransport::new();
        transport.expect_submit().returning(|_| {
            Ok(Submission {
                tx_ref: TxRef("digest3".to_string()),
                effects: json!({
                    "status": "failure",
                    "error": "MoveAbort(MoveLocation { module: ModuleId { address: 0xabc123, name: Identifier(\"swap\") }, function: 3, instruction: 12, function_name: Some(\"refund\") }, 201) in command 0",
                }),
            })
        });

        let err = adapter(transport)
            .refund(&SwapRef("0xswap1".to_string()), &Asset::Native)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), FailureKind::TimelockNotExpired);
    }

    #[tokio::test]
    async fn refund_passes_the_clock() {
        let mut transport = MockChainTransport::new();
        transport
            .expect_submit()
            .withf(|call| match call {
                ChainCall::MoveCall { function, args, .. } => {
                    function == "refund" && args[1] == MoveArg::Clock
                }
                _ => false,
            })
            .returning(|_| {
                Ok(Submission {
                    tx_ref: TxRef("digest4".to_string()),
                    effects: json!({ "status": "success" }),
                })
            });

        adapter(transport)
            .refund(&SwapRef("0xswap1".to_string()), &Asset::Native)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn claim_and_refund_instantiate_the_coin_type() {
        for (asset, expected) in [
            (Asset::Native, NATIVE_COIN_TYPE.to_string()),
            (Asset::Token(COIN_TYPE.to_string()), COIN_TYPE.to_string()),
        ] {
            let mut transport = MockChainTransport::new();
            let want = expected.clone();
            transport
                .expect_submit()
                .times(2)
                .withf(move |call| match call {
                    ChainCall::MoveCall { type_args, .. } => type_args == &[want.clone()],
                    _ => false,
                })
                .returning(|_| {
                    Ok(Submission {
                        tx_ref: TxRef("digest8".to_string()),
                        effects: json!({ "status": "success" }),
                    })
                });
            let adapter = adapter(transport);

            let (secret, _) = SecretManager::generate(HashAlgorithm::Sha256).unwrap();
            adapter
                .claim(&SwapRef("0xswap1".to_string()), &secret, &asset)
                .await
                .unwrap();
            adapter
                .refund(&SwapRef("0xswap1".to_string()), &asset)
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn swap_state_maps_object_status() {
        let cases = [
            (json!({ "status": "exists" }), SwapState::Locked),
            (
                json!({ "status": "deleted", "terminal": "claimed" }),
                SwapState::Claimed,
            ),
            (
                json!({ "status": "deleted", "terminal": "refunded" }),
                SwapState::Refunded,
            ),
            (json!({ "status": "deleted" }), SwapState::NotFound),
            (json!({ "status": "not_found" }), SwapState::NotFound),
        ];
        for (response, expected) in cases {
            let mut transport = MockChainTransport::new();
            transport.expect_query().returning(move |_| Ok(response.clone()));
            let state = adapter(transport)
                .swap_state(&SwapRef("0xswap1".to_string()))
                .await
                .unwrap();
            assert_eq!(state, expected);
        }
    }

    #[tokio::test]
    async fn extracts_secret_from_claim_inputs() {
        let (secret, _) = SecretManager::generate(HashAlgorithm::Sha256).unwrap();
        let secret_bytes = secret.as_bytes().to_vec();
        let tx = json!({
            "transactions": [
                {
                    "kind": "MoveCall",
                    "target": format!("{}::swap::claim", PACKAGE),
                    "arguments": [
                        { "kind": "Input", "index": 0 },
                        { "kind": "Input", "index": 1 },
                        { "kind": "Input", "index": 2 },
                    ],
                }
            ],
            "inputs": [
                { "type": "object", "objectId": "0xswap1" },
                { "type": "pure", "valueType": "address", "value": OWNER },
                { "type": "pure", "valueType": "vector<u8>", "value": secret_bytes },
            ],
        });

        let mut transport = MockChainTransport::new();
        transport.expect_query().returning(move |_| Ok(tx.clone()));

        let extracted = adapter(transport)
            .extract_revealed_secret(&TxRef("digest5".to_string()))
            .await
            .unwrap();
        assert_eq!(extracted.as_bytes(), secret.as_bytes());
    }

    #[tokio::test]
    async fn non_claim_transactions_are_rejected() {
        let tx = json!({
            "transactions": [
                { "kind": "MoveCall", "target": format!("{}::swap::refund", PACKAGE), "arguments": [] }
            ],
            "inputs": [],
        });
        let mut transport = MockChainTransport::new();
        transport.expect_query().returning(move |_| Ok(tx.clone()));

        let err = adapter(transport)
            .extract_revealed_secret(&TxRef("digest6".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, SwapError::NotAClaimTransaction { .. }));
    }

    #[tokio::test]
    async fn unknown_transaction_is_not_found() {
        let mut transport = MockChainTransport::new();
        transport.expect_query().returning(|_| Ok(Value::Null));

        let err = adapter(transport)
            .extract_revealed_secret(&TxRef("digest7".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, SwapError::ClaimTransactionNotFound { .. }));
    }

    #[test]
    fn malformed_addresses_are_rejected() {
        assert!(validate_sui_address("0xabc123").is_ok());
        assert!(validate_sui_address("abc123").is_err());
        assert!(validate_sui_address("0x").is_err());
        assert!(validate_sui_address("0xzz").is_err());
    }
}
