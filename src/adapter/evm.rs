//! EVM adapter
//!
//! Encodes calls against the HTLC contract with ethers ABI primitives. Token
//! locks run an ERC-20 `approve` ahead of the lock so the contract can pull the
//! funds; a failed approval surfaces as its own error rather than a confusing
//! lock revert.

use async_trait::async_trait;
use ethers::abi::{encode, Token};
use ethers::types::{Address, U256};
use ethers::utils::id;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

use crate::adapter::{
    ActionReceipt, ChainAdapter, ChainCall, ChainQuery, ChainTransport, LockReceipt, LockRequest,
    Submission, SwapState, TransportError,
};
use crate::classify::classify_evm;
use crate::error::{SwapError, SwapResult};
use crate::secret::{decode_hex32, HashAlgorithm, Secret};
use crate::store::{Asset, Chain, ContractRef, SwapRef, TxRef};

const LOCK_SIG: &str = "lock(address,bytes32,uint256)";
const LOCK_TOKEN_SIG: &str = "lockToken(address,address,uint256,bytes32,uint256)";
const CLAIM_SIG: &str = "claim(bytes32,bytes32)";
const REFUND_SIG: &str = "refund(bytes32)";
const GET_SWAP_SIG: &str = "getSwap(bytes32)";
const APPROVE_SIG: &str = "approve(address,uint256)";

/// Adapter for the Solidity HTLC contract.
pub struct EvmAdapter {
    transport: Arc<dyn ChainTransport>,
    contract_address: String,
    owner_address: String,
    gas_limit: u64,
}

impl std::fmt::Debug for EvmAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvmAdapter")
            .field("contract_address", &self.contract_address)
            .field("owner_address", &self.owner_address)
            .field("gas_limit", &self.gas_limit)
            .finish_non_exhaustive()
    }
}

impl EvmAdapter {
    pub fn new(
        transport: Arc<dyn ChainTransport>,
        contract_address: String,
        owner_address: String,
        gas_limit: u64,
    ) -> SwapResult<Self> {
        parse_address(&contract_address)?;
        parse_address(&owner_address)?;
        Ok(Self {
            transport,
            contract_address,
            owner_address,
            gas_limit,
        })
    }

    fn call(&self, calldata: Vec<u8>, value: u128) -> ChainCall {
        ChainCall::Evm {
            to: self.contract_address.clone(),
            calldata,
            value,
            gas_limit: self.gas_limit,
        }
    }

    async fn submit(&self, operation: &'static str, call: ChainCall) -> SwapResult<Submission> {
        self.transport
            .submit(call)
            .await
            .map_err(|e| execution_error(operation, e))
    }

    /// Grant the contract a spending allowance for a token lock.
    async fn approve(&self, token: &str, amount: u128) -> SwapResult<()> {
        let calldata = encode_call(
            APPROVE_SIG,
            &[
                Token::Address(parse_address(&self.contract_address)?),
                Token::Uint(U256::from(amount)),
            ],
        );
        let call = ChainCall::Evm {
            to: token.to_string(),
            calldata,
            value: 0,
            gas_limit: self.gas_limit,
        };
        debug!("Approving {} units of token {}", amount, token);
        self.transport
            .submit(call)
            .await
            .map_err(|e| SwapError::InsufficientAllowance { raw: e.raw })?;
        Ok(())
    }
}

#[async_trait]
impl ChainAdapter for EvmAdapter {
    fn chain(&self) -> Chain {
        Chain::Evm
    }

    fn hash_algorithm(&self) -> HashAlgorithm {
        HashAlgorithm::Sha256
    }

    fn contract_ref(&self) -> ContractRef {
        ContractRef::Evm {
            address: self.contract_address.clone(),
        }
    }

    fn owner_address(&self) -> &str {
        &self.owner_address
    }

    async fn lock(&self, request: &LockRequest) -> SwapResult<LockReceipt> {
        if request.amount == 0 {
            return Err(SwapError::ZeroAmount);
        }
        let recipient = parse_address(&request.counterparty)?;
        let hash_lock = Token::FixedBytes(request.hash_lock.as_bytes().to_vec());
        let timelock = Token::Uint(U256::from(request.timelock));

        let call = match &request.asset {
            Asset::Native => {
                let calldata =
                    encode_call(LOCK_SIG, &[Token::Address(recipient), hash_lock, timelock]);
                self.call(calldata, request.amount)
            }
            Asset::Token(token) => {
                let token_address = parse_address(token)?;
                self.approve(token, request.amount).await?;
                let calldata = encode_call(
                    LOCK_TOKEN_SIG,
                    &[
                        Token::Address(token_address),
                        Token::Address(recipient),
                        Token::Uint(U256::from(request.amount)),
                        hash_lock,
                        timelock,
                    ],
                );
                self.call(calldata, 0)
            }
        };

        let submission = self.submit("lock", call).await?;
        let swap_ref = submission.effects["swapId"]
            .as_str()
            .map(|id| SwapRef(id.to_string()))
            .ok_or_else(|| execution_error("lock", TransportError::new("no swap id in receipt")))?;

        info!("Locked swap {} in tx {}", swap_ref, submission.tx_ref);
        Ok(LockReceipt {
            swap_ref,
            tx_ref: submission.tx_ref,
        })
    }

    // The contract keys swaps by id alone, so the asset plays no part here.
    async fn claim(
        &self,
        swap_ref: &SwapRef,
        secret: &Secret,
        _asset: &Asset,
    ) -> SwapResult<ActionReceipt> {
        let calldata = encode_call(
            CLAIM_SIG,
            &[
                Token::FixedBytes(decode_hex32(&swap_ref.0)?.to_vec()),
                Token::FixedBytes(secret.as_bytes().to_vec()),
            ],
        );
        let submission = self.submit("claim", self.call(calldata, 0)).await?;
        info!("Claimed swap {} in tx {}", swap_ref, submission.tx_ref);
        Ok(ActionReceipt {
            tx_ref: submission.tx_ref,
            revealed_secret: Some(secret.clone()),
            effects: submission.effects,
        })
    }

    async fn refund(&self, swap_ref: &SwapRef, _asset: &Asset) -> SwapResult<ActionReceipt> {
        let calldata = encode_call(
            REFUND_SIG,
            &[Token::FixedBytes(decode_hex32(&swap_ref.0)?.to_vec())],
        );
        let submission = self.submit("refund", self.call(calldata, 0)).await?;
        info!("Refunded swap {} in tx {}", swap_ref, submission.tx_ref);
        Ok(ActionReceipt {
            tx_ref: submission.tx_ref,
            revealed_secret: None,
            effects: submission.effects,
        })
    }

    async fn swap_state(&self, swap_ref: &SwapRef) -> SwapResult<SwapState> {
        let calldata = encode_call(
            GET_SWAP_SIG,
            &[Token::FixedBytes(decode_hex32(&swap_ref.0)?.to_vec())],
        );
        let state: Value = self
            .transport
            .query(ChainQuery::EvmCall {
                to: self.contract_address.clone(),
                calldata,
            })
            .await
            .map_err(|e| execution_error("state query", e))?;

        if !state["exists"].as_bool().unwrap_or(false) {
            return Ok(SwapState::NotFound);
        }
        if state["claimed"].as_bool().unwrap_or(false) {
            return Ok(SwapState::Claimed);
        }
        if state["refunded"].as_bool().unwrap_or(false) {
            return Ok(SwapState::Refunded);
        }
        Ok(SwapState::Locked)
    }

    async fn extract_revealed_secret(&self, tx_ref: &TxRef) -> SwapResult<Secret> {
        let tx = self
            .transport
            .query(ChainQuery::EvmTransaction {
                tx_ref: tx_ref.0.clone(),
            })
            .await
            .map_err(|e| execution_error("transaction lookup", e))?;

        if tx.is_null() {
            return Err(SwapError::ClaimTransactionNotFound {
                tx_ref: tx_ref.0.clone(),
            });
        }

        let input = tx["input"].as_str().unwrap_or_default();
        let raw = hex::decode(input.strip_prefix("0x").unwrap_or(input)).map_err(|_| {
            SwapError::NotAClaimTransaction {
                tx_ref: tx_ref.0.clone(),
            }
        })?;

        // claim calldata: 4-byte selector, 32-byte swap id, 32-byte secret
        if raw.len() < 68 || raw[..4] != id(CLAIM_SIG) {
            return Err(SwapError::NotAClaimTransaction {
                tx_ref: tx_ref.0.clone(),
            });
        }
        let mut secret = [0u8; 32];
        secret.copy_from_slice(&raw[36..68]);
        Ok(Secret::from_bytes(secret))
    }
}

fn encode_call(signature: &str, tokens: &[Token]) -> Vec<u8> {
    let mut calldata = id(signature).to_vec();
    calldata.extend(encode(tokens));
    calldata
}

fn parse_address(address: &str) -> SwapResult<Address> {
    address
        .parse::<Address>()
        .map_err(|_| SwapError::InvalidAddress {
            address: address.to_string(),
            chain: "evm",
        })
}

fn execution_error(operation: &'static str, e: TransportError) -> SwapError {
    SwapError::Execution {
        operation,
        kind: classify_evm(&e.raw),
        raw: e.raw,
    }
}
