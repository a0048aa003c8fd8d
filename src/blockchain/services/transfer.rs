//! Transfer orchestration.
//!
//! Every transfer runs the same pipeline:
//!
//! 1. normalize addresses and numeric inputs (no network),
//! 2. check ownership or balance,
//! 3. price the exact call that will be sent,
//! 4. check the native balance covers that price,
//! 5. sign and broadcast,
//! 6. wait for the receipt,
//! 7. report.
//!
//! Steps 2 and the call built for step 3 are the only kind-specific parts; they live on
//! [`TransferPlan`]. Steps 1 to 4 never write. Nothing is retried or rolled back: a
//! failure after step 5 leaves a transaction on chain that the caller reconciles.

use std::sync::Arc;

use ethers_core::types::{Address, U256};
use ethers_core::utils::to_checksum;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::blockchain::{
    client::{ChainReader, ChainWriter},
    models::{
        AssetRef, ContractCall, GasBudget, OutcomeDetails, PreparedCall, TransferError,
        TransferOutcome,
    },
    services::{fees, token},
};

const NATIVE_DECIMALS: u8 = 18;
const UNKNOWN: &str = "Unknown";

/// Raw tool arguments for one transfer, before normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferInput {
    Fungible {
        token_address: String,
        to_address: String,
        amount: String,
    },
    NonFungible {
        token_address: String,
        token_id: String,
        to_address: String,
    },
    SemiFungible {
        token_address: String,
        token_id: String,
        amount: String,
        to_address: String,
    },
}

/// Normalized request. Built fresh per call and never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferPlan {
    Fungible {
        token: Address,
        recipient: Address,
        // decimals are only known after a chain read, so scaling happens in `verify`
        amount: String,
    },
    NonFungible {
        token: Address,
        recipient: Address,
        token_id: U256,
    },
    SemiFungible {
        token: Address,
        recipient: Address,
        token_id: U256,
        quantity: U256,
    },
}

/// Output of the read-only half of the pipeline (steps 1 to 4).
#[derive(Debug, Clone)]
pub struct PreparedTransfer {
    pub asset: AssetRef,
    pub recipient: Address,
    pub prepared: PreparedCall,
    pub details: OutcomeDetails,
}

struct Verified {
    call: ContractCall,
    details: OutcomeDetails,
}

impl TransferPlan {
    /// Step 1.
    pub fn normalize(input: &TransferInput) -> Result<Self, TransferError> {
        Ok(match input {
            TransferInput::Fungible { token_address, to_address, amount } => {
                let token = token::normalize_address("tokenAddress", token_address)?;
                let recipient = token::normalize_address("toAddress", to_address)?;
                token::check_decimal_amount(amount)?;
                TransferPlan::Fungible { token, recipient, amount: amount.clone() }
            }
            TransferInput::NonFungible { token_address, token_id, to_address } => {
                TransferPlan::NonFungible {
                    token: token::normalize_address("tokenAddress", token_address)?,
                    recipient: token::normalize_address("toAddress", to_address)?,
                    token_id: token::parse_token_id(token_id)?,
                }
            }
            TransferInput::SemiFungible { token_address, token_id, amount, to_address } => {
                TransferPlan::SemiFungible {
                    token: token::normalize_address("tokenAddress", token_address)?,
                    recipient: token::normalize_address("toAddress", to_address)?,
                    token_id: token::parse_token_id(token_id)?,
                    quantity: token::parse_quantity(amount)?,
                }
            }
        })
    }

    pub fn asset(&self) -> AssetRef {
        match self {
            TransferPlan::Fungible { token, .. } => AssetRef::fungible(*token),
            TransferPlan::NonFungible { token, token_id, .. } => AssetRef::non_fungible(*token, *token_id),
            TransferPlan::SemiFungible { token, token_id, .. } => AssetRef::semi_fungible(*token, *token_id),
        }
    }

    pub fn recipient(&self) -> Address {
        match self {
            TransferPlan::Fungible { recipient, .. }
            | TransferPlan::NonFungible { recipient, .. }
            | TransferPlan::SemiFungible { recipient, .. } => *recipient,
        }
    }

    /// Step 2, plus building the call that steps 3 and 5 operate on.
    async fn verify(&self, chain: &dyn ChainReader, sender: Address) -> Result<Verified, TransferError> {
        match self {
            TransferPlan::Fungible { token, recipient, amount } => {
                let decimals = token::erc20_decimals(chain, *token)
                    .await
                    .map_err(TransferError::chain)?;
                let symbol = token::read_string(chain, *token, "symbol()")
                    .await
                    .unwrap_or_else(|| UNKNOWN.to_string());
                let raw_amount = token::scale_amount(amount, decimals)?;

                let balance = token::erc20_balance_of(chain, *token, sender)
                    .await
                    .map_err(TransferError::chain)?;
                if balance < raw_amount {
                    return Err(TransferError::InsufficientBalance(format!(
                        "Insufficient token balance. Available: {} {}, Required: {} {}",
                        token::format_units_trimmed(balance, decimals),
                        symbol,
                        token::format_units_trimmed(raw_amount, decimals),
                        symbol
                    )));
                }

                Ok(Verified {
                    call: token::erc20_transfer_call(*token, *recipient, raw_amount),
                    details: OutcomeDetails::Fungible {
                        amount: amount.clone(),
                        formatted_amount: token::format_units_trimmed(raw_amount, decimals),
                        symbol,
                    },
                })
            }
            TransferPlan::NonFungible { token, recipient, token_id } => {
                let owner = token::erc721_owner_of(chain, *token, *token_id)
                    .await
                    .map_err(TransferError::chain)?;
                if owner != sender {
                    return Err(TransferError::NotOwner {
                        sender: to_checksum(&sender, None),
                        owner: to_checksum(&owner, None),
                        token_id: token_id.to_string(),
                    });
                }

                let name = token::read_string(chain, *token, "name()").await;
                let symbol = token::read_string(chain, *token, "symbol()").await;

                Ok(Verified {
                    call: token::erc721_transfer_from_call(*token, sender, *recipient, *token_id),
                    details: OutcomeDetails::NonFungible {
                        token_id: token_id.to_string(),
                        name: name.unwrap_or_else(|| UNKNOWN.to_string()),
                        symbol: symbol.unwrap_or_else(|| UNKNOWN.to_string()),
                    },
                })
            }
            TransferPlan::SemiFungible { token, recipient, token_id, quantity } => {
                let balance = token::erc1155_balance_of(chain, *token, sender, *token_id)
                    .await
                    .map_err(TransferError::chain)?;
                if balance < *quantity {
                    return Err(TransferError::InsufficientBalance(format!(
                        "Insufficient balance for token ID {}. Available: {}, Required: {}",
                        token_id, balance, quantity
                    )));
                }

                Ok(Verified {
                    call: token::erc1155_safe_transfer_from_call(
                        *token, sender, *recipient, *token_id, *quantity,
                    ),
                    details: OutcomeDetails::SemiFungible {
                        token_id: token_id.to_string(),
                        amount: quantity.to_string(),
                    },
                })
            }
        }
    }
}

/// Runs transfers for the single signing account.
pub struct TransferOrchestrator {
    reader: Arc<dyn ChainReader>,
    writer: Arc<dyn ChainWriter>,
    explorer_tx_url: String,
    native_symbol: String,
    // held from step 2 to step 6: one transfer, and one submission, at a time
    in_flight: Mutex<()>,
}

impl TransferOrchestrator {
    pub fn new(
        reader: Arc<dyn ChainReader>,
        writer: Arc<dyn ChainWriter>,
        explorer_tx_url: impl Into<String>,
        native_symbol: impl Into<String>,
    ) -> Self {
        Self {
            reader,
            writer,
            explorer_tx_url: explorer_tx_url.into(),
            native_symbol: native_symbol.into(),
            in_flight: Mutex::new(()),
        }
    }

    pub fn sender(&self) -> Address {
        self.writer.address()
    }

    pub fn explorer_link(&self, tx_hash: &str) -> String {
        format!("{}{}", self.explorer_tx_url, tx_hash)
    }

    pub async fn transfer_fungible(
        &self,
        token_address: &str,
        to_address: &str,
        amount: &str,
    ) -> Result<TransferOutcome, TransferError> {
        self.execute(&TransferInput::Fungible {
            token_address: token_address.to_string(),
            to_address: to_address.to_string(),
            amount: amount.to_string(),
        })
        .await
    }

    pub async fn transfer_non_fungible(
        &self,
        token_address: &str,
        token_id: &str,
        to_address: &str,
    ) -> Result<TransferOutcome, TransferError> {
        self.execute(&TransferInput::NonFungible {
            token_address: token_address.to_string(),
            token_id: token_id.to_string(),
            to_address: to_address.to_string(),
        })
        .await
    }

    pub async fn transfer_semi_fungible(
        &self,
        token_address: &str,
        token_id: &str,
        amount: &str,
        to_address: &str,
    ) -> Result<TransferOutcome, TransferError> {
        self.execute(&TransferInput::SemiFungible {
            token_address: token_address.to_string(),
            token_id: token_id.to_string(),
            amount: amount.to_string(),
            to_address: to_address.to_string(),
        })
        .await
    }

    /// Steps 1 to 4 only. Never writes; safe to call repeatedly.
    pub async fn preflight(&self, input: &TransferInput) -> Result<PreparedTransfer, TransferError> {
        let plan = TransferPlan::normalize(input)?;
        self.prepare(&plan).await
    }

    /// Full pipeline.
    pub async fn execute(&self, input: &TransferInput) -> Result<TransferOutcome, TransferError> {
        let plan = TransferPlan::normalize(input)?;
        let _guard = self.in_flight.lock().await;

        let prepared = self.prepare(&plan).await?;

        info!("Submitting {} to {:?}", prepared.prepared.call.signature, prepared.asset.contract);
        let tx_hash = self
            .writer
            .submit(&prepared.prepared)
            .await
            .map_err(|e| TransferError::SubmissionFailed(format!("{:#}", e)))?;
        let tx_hash_hex = format!("{:#x}", tx_hash);

        info!("Waiting for receipt of {}", tx_hash_hex);
        let receipt = self.reader.wait_for_receipt(tx_hash).await.map_err(|e| {
            warn!("Receipt lookup for submitted {} failed: {:#}", tx_hash_hex, e);
            TransferError::ChainUnavailable(format!(
                "transaction {} was submitted but its receipt could not be read: {:#}",
                tx_hash_hex, e
            ))
        })?;
        if !receipt.success {
            warn!("Transaction {} reverted", tx_hash_hex);
            return Err(TransferError::TransactionReverted(tx_hash_hex));
        }

        info!("Transaction {} confirmed in block {:?}", tx_hash_hex, receipt.block_number);
        Ok(TransferOutcome {
            success: true,
            tx_hash,
            explorer_link: self.explorer_link(&tx_hash_hex),
            asset: prepared.asset,
            recipient: prepared.recipient,
            details: prepared.details,
        })
    }

    async fn prepare(&self, plan: &TransferPlan) -> Result<PreparedTransfer, TransferError> {
        let sender = self.writer.address();
        let reader = self.reader.as_ref();

        let verified = plan.verify(reader, sender).await?;

        let gas = fees::estimate_gas_budget(reader, sender, &verified.call)
            .await
            .map_err(TransferError::chain)?;
        self.ensure_gas(sender, &gas).await?;

        Ok(PreparedTransfer {
            asset: plan.asset(),
            recipient: plan.recipient(),
            prepared: PreparedCall { call: verified.call, gas },
            details: verified.details,
        })
    }

    // The price can move before broadcast; this check is advisory but still blocks.
    async fn ensure_gas(&self, sender: Address, gas: &GasBudget) -> Result<(), TransferError> {
        let balance = self
            .reader
            .native_balance(sender)
            .await
            .map_err(TransferError::chain)?;
        if !fees::covers(balance, gas) {
            return Err(TransferError::InsufficientGas {
                symbol: self.native_symbol.clone(),
                available: token::format_units_trimmed(balance, NATIVE_DECIMALS),
                required: token::format_units_trimmed(gas.estimated_cost, NATIVE_DECIMALS),
            });
        }
        Ok(())
    }
}
