//! Chain access contracts.
//!
//! The transfer pipeline only talks to the network through these two traits:
//! [`ChainReader`] for side-effect-free queries and [`ChainWriter`] for the single
//! signing account. Production code plugs in [`EvmClient`] and
//! [`SigningAccount`](super::signer::SigningAccount); tests plug in scripted fakes.

use anyhow::Result;
use async_trait::async_trait;
use ethers::types::{Address, Bytes, H256, U256};

use crate::blockchain::models::{ContractCall, PreparedCall, TxReceipt};

pub use super::evm_client::EvmClient;

/// Read-only view of the network. Every call hits the node; nothing is cached.
#[async_trait]
pub trait ChainReader: Send + Sync {
    /// `eth_call` against latest state, returning the raw ABI-encoded output.
    async fn read_state(&self, call: &ContractCall) -> Result<Bytes>;

    async fn gas_price(&self) -> Result<U256>;

    /// Gas units for `call` if it were sent from `from`.
    async fn estimate_gas(&self, from: Address, call: &ContractCall) -> Result<U256>;

    async fn native_balance(&self, address: Address) -> Result<U256>;

    /// Blocks until the node reports a receipt. No timeout.
    async fn wait_for_receipt(&self, tx_hash: H256) -> Result<TxReceipt>;
}

/// The process-wide signing account.
#[async_trait]
pub trait ChainWriter: Send + Sync {
    fn address(&self) -> Address;

    /// Signs and broadcasts `prepared`, returning the transaction hash.
    async fn submit(&self, prepared: &PreparedCall) -> Result<H256>;
}
