// src/blockchain/models.rs
use ethers_core::abi::Token;
use ethers_core::types::{Address, Bytes, H256, U256};
use ethers_core::utils::{keccak256, to_checksum};
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;

// --- Error types for transfer operations ---

/// Coarse classification used when reporting failures back to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorCategory {
    InvalidInput,
    PreconditionFailed,
    ChainUnavailable,
    SubmissionFailed,
    TransactionReverted,
    UpstreamUnavailable,
}

#[derive(Error, Debug)]
pub enum TransferError {
    #[error("invalid {field} '{value}': {reason}")]
    InvalidAddress {
        field: &'static str,
        value: String,
        reason: String,
    },
    #[error("invalid amount '{value}': {reason}")]
    InvalidAmount { value: String, reason: &'static str },
    #[error("invalid token ID '{0}': must be a non-negative integer")]
    InvalidTokenId(String),
    #[error("{0}")]
    InsufficientBalance(String),
    #[error("Account {sender} does not own token ID {token_id}. Current owner: {owner}")]
    NotOwner {
        sender: String,
        owner: String,
        token_id: String,
    },
    #[error("Insufficient {symbol} balance for gas fees. Available: {available} {symbol}, Required: {required} {symbol}")]
    InsufficientGas {
        symbol: String,
        available: String,
        required: String,
    },
    #[error("chain unavailable: {0}")]
    ChainUnavailable(String),
    #[error("submission failed: {0}")]
    SubmissionFailed(String),
    #[error("Transaction failed: {0}")]
    TransactionReverted(String),
}

impl TransferError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            TransferError::InvalidAddress { .. }
            | TransferError::InvalidAmount { .. }
            | TransferError::InvalidTokenId(_) => ErrorCategory::InvalidInput,
            TransferError::InsufficientBalance(_)
            | TransferError::NotOwner { .. }
            | TransferError::InsufficientGas { .. } => ErrorCategory::PreconditionFailed,
            TransferError::ChainUnavailable(_) => ErrorCategory::ChainUnavailable,
            TransferError::SubmissionFailed(_) => ErrorCategory::SubmissionFailed,
            TransferError::TransactionReverted(_) => ErrorCategory::TransactionReverted,
        }
    }

    /// Wraps a reader failure. The source chain is flattened into the message.
    pub fn chain(err: anyhow::Error) -> Self {
        TransferError::ChainUnavailable(format!("{:#}", err))
    }
}

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Max retries reached after {attempts} attempts: {last_error}")]
    FetchExhausted { attempts: u32, last_error: String },
    #[error("invalid response body from {url}: {reason}")]
    InvalidBody { url: String, reason: String },
    #[error("{0}")]
    Upstream(String),
}

impl FetchError {
    pub fn category(&self) -> ErrorCategory {
        ErrorCategory::UpstreamUnavailable
    }
}

// --- Asset Models ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    Fungible,
    NonFungible,
    SemiFungible,
}

/// A token contract plus, for NFT/SFT, the specific id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetRef {
    pub contract: Address,
    pub kind: AssetKind,
    pub token_id: Option<U256>,
}

impl AssetRef {
    pub fn fungible(contract: Address) -> Self {
        Self { contract, kind: AssetKind::Fungible, token_id: None }
    }

    pub fn non_fungible(contract: Address, token_id: U256) -> Self {
        Self { contract, kind: AssetKind::NonFungible, token_id: Some(token_id) }
    }

    pub fn semi_fungible(contract: Address, token_id: U256) -> Self {
        Self { contract, kind: AssetKind::SemiFungible, token_id: Some(token_id) }
    }

    pub fn checksummed(&self) -> String {
        to_checksum(&self.contract, None)
    }
}

// --- Call Models ---

/// A contract function invocation: target, canonical signature and ABI arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct ContractCall {
    pub to: Address,
    pub signature: &'static str,
    pub args: Vec<Token>,
}

impl ContractCall {
    pub fn new(to: Address, signature: &'static str, args: Vec<Token>) -> Self {
        Self { to, signature, args }
    }

    pub fn selector(&self) -> [u8; 4] {
        let mut sel = [0u8; 4];
        sel.copy_from_slice(&keccak256(self.signature.as_bytes())[0..4]);
        sel
    }

    pub fn calldata(&self) -> Bytes {
        let mut out = self.selector().to_vec();
        let mut tail = ethers_core::abi::encode(&self.args);
        out.append(&mut tail);
        Bytes::from(out)
    }
}

/// Gas figures sampled right before submission. Never cached between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GasBudget {
    pub gas_units: U256,
    pub gas_price: U256,
    pub estimated_cost: U256,
}

/// A call ready for signing, carrying the gas budget it was checked against.
#[derive(Debug, Clone)]
pub struct PreparedCall {
    pub call: ContractCall,
    pub gas: GasBudget,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxReceipt {
    pub success: bool,
    pub block_number: Option<u64>,
}

// --- Outcome Models ---

/// Kind-specific fields echoed back in a transfer outcome.
#[derive(Debug, Clone, PartialEq)]
pub enum OutcomeDetails {
    Fungible {
        amount: String,
        formatted_amount: String,
        symbol: String,
    },
    NonFungible {
        token_id: String,
        name: String,
        symbol: String,
    },
    SemiFungible {
        token_id: String,
        amount: String,
    },
}

/// Terminal record of a confirmed transfer.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferOutcome {
    pub success: bool,
    pub tx_hash: H256,
    pub explorer_link: String,
    pub asset: AssetRef,
    pub recipient: Address,
    pub details: OutcomeDetails,
}

impl TransferOutcome {
    pub fn tx_hash_hex(&self) -> String {
        format!("{:#x}", self.tx_hash)
    }

    pub fn to_json(&self) -> Value {
        let contract = self.asset.checksummed();
        let recipient = to_checksum(&self.recipient, None);
        match &self.details {
            OutcomeDetails::Fungible { amount, formatted_amount, symbol } => json!({
                "success": self.success,
                "txHash": self.tx_hash_hex(),
                "tokenAddress": contract,
                "toAddress": recipient,
                "amount": amount,
                "formattedAmount": formatted_amount,
                "symbol": symbol,
                "explorerLink": self.explorer_link,
            }),
            OutcomeDetails::NonFungible { token_id, name, symbol } => json!({
                "success": self.success,
                "txHash": self.tx_hash_hex(),
                "collection": contract,
                "tokenId": token_id,
                "recipient": recipient,
                "name": name,
                "symbol": symbol,
                "explorerLink": self.explorer_link,
            }),
            OutcomeDetails::SemiFungible { token_id, amount } => json!({
                "success": self.success,
                "txHash": self.tx_hash_hex(),
                "contract": contract,
                "tokenId": token_id,
                "amount": amount,
                "recipient": recipient,
                "explorerLink": self.explorer_link,
            }),
        }
    }
}
