// src/blockchain/evm_client.rs

use crate::blockchain::{
    client::ChainReader,
    models::{ContractCall, TxReceipt},
};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use ethers::{
    providers::{Http, Middleware, Provider},
    types::{transaction::eip2718::TypedTransaction, Address, Bytes, TransactionRequest, H256, U256, U64},
};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// JSON-RPC reader for the configured network.
#[derive(Clone)]
pub struct EvmClient {
    provider: Arc<Provider<Http>>,
    receipt_poll_interval: Duration,
}

impl EvmClient {
    /// Create a new EvmClient for the given RPC URL
    pub fn new(rpc_url: &str, receipt_poll_interval: Duration) -> Result<Self> {
        let provider = Provider::<Http>::try_from(rpc_url)
            .map_err(|e| anyhow!("Failed to create provider for {}: {}", rpc_url, e))?;
        Ok(Self {
            provider: Arc::new(provider),
            receipt_poll_interval,
        })
    }

    /// Shared handle to the underlying provider, used by the signing account.
    pub fn provider(&self) -> Arc<Provider<Http>> {
        self.provider.clone()
    }

    fn call_tx(from: Option<Address>, call: &ContractCall) -> TypedTransaction {
        let mut tx = TransactionRequest::new().to(call.to).data(call.calldata());
        if let Some(from) = from {
            tx = tx.from(from);
        }
        tx.into()
    }
}

#[async_trait]
impl ChainReader for EvmClient {
    async fn read_state(&self, call: &ContractCall) -> Result<Bytes> {
        debug!("eth_call {} on {:?}", call.signature, call.to);
        self.provider
            .call(&Self::call_tx(None, call), None)
            .await
            .with_context(|| format!("eth_call {} failed", call.signature))
    }

    async fn gas_price(&self) -> Result<U256> {
        self.provider
            .get_gas_price()
            .await
            .context("eth_gasPrice failed")
    }

    async fn estimate_gas(&self, from: Address, call: &ContractCall) -> Result<U256> {
        self.provider
            .estimate_gas(&Self::call_tx(Some(from), call), None)
            .await
            .with_context(|| format!("eth_estimateGas for {} failed", call.signature))
    }

    async fn native_balance(&self, address: Address) -> Result<U256> {
        self.provider
            .get_balance(address, None)
            .await
            .context("eth_getBalance failed")
    }

    async fn wait_for_receipt(&self, tx_hash: H256) -> Result<TxReceipt> {
        loop {
            let receipt = self
                .provider
                .get_transaction_receipt(tx_hash)
                .await
                .context("eth_getTransactionReceipt failed")?;
            if let Some(receipt) = receipt {
                return Ok(TxReceipt {
                    success: receipt.status == Some(U64::one()),
                    block_number: receipt.block_number.map(|n| n.as_u64()),
                });
            }
            debug!("receipt for {:#x} not available yet", tx_hash);
            tokio::time::sleep(self.receipt_poll_interval).await;
        }
    }
}
