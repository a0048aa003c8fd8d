//! The signing account: the one credential this process holds, loaded at startup.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use ethers::types::{Address, BlockNumber, TransactionRequest, H256};
use ethers_providers::{Http, Middleware, Provider};
use ethers_signers::{LocalWallet, Signer};
use secrecy::{ExposeSecret, SecretString};
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{info, warn};

use crate::blockchain::{client::ChainWriter, models::PreparedCall};

/// Holds the wallet and the node handle it submits through.
#[derive(Clone)]
pub struct SigningAccount {
    wallet: LocalWallet,
    provider: Arc<Provider<Http>>,
    // read from the node on first submission
    chain_id: Arc<OnceCell<u64>>,
}

impl std::fmt::Debug for SigningAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningAccount")
            .field("address", &self.wallet.address())
            .field("chain_id", &self.chain_id.get())
            .finish()
    }
}

impl SigningAccount {
    /// Parses the key (with or without `0x`). An unparseable key is the only startup failure.
    pub fn new(private_key: &SecretString, provider: Arc<Provider<Http>>) -> Result<Self> {
        let wallet = LocalWallet::from_str(private_key.expose_secret().trim())
            .map_err(|e| anyhow!("Invalid private key: {}", e))?;
        info!("Signing account {:?}", wallet.address());
        Ok(Self {
            wallet,
            provider,
            chain_id: Arc::new(OnceCell::new()),
        })
    }

    pub async fn chain_id(&self) -> Result<u64> {
        let id = self
            .chain_id
            .get_or_try_init(|| async {
                let id = self
                    .provider
                    .get_chainid()
                    .await
                    .context("Failed to get chain_id from RPC")?;
                Ok::<u64, anyhow::Error>(id.as_u64())
            })
            .await?;
        Ok(*id)
    }

    /// The node's pending transaction count, read fresh for every submission.
    async fn pending_nonce(&self, from: Address) -> Result<ethers::types::U256> {
        self.provider
            .get_transaction_count(from, Some(BlockNumber::Pending.into()))
            .await
            .context("Failed to get pending transaction count")
    }
}

#[async_trait]
impl ChainWriter for SigningAccount {
    fn address(&self) -> Address {
        self.wallet.address()
    }

    async fn submit(&self, prepared: &PreparedCall) -> Result<H256> {
        let from = self.wallet.address();
        let chain_id = self.chain_id().await?;
        let nonce = self.pending_nonce(from).await?;

        let tx = TransactionRequest::new()
            .from(from)
            .to(prepared.call.to)
            .data(prepared.call.calldata())
            .nonce(nonce)
            .gas(prepared.gas.gas_units)
            .gas_price(prepared.gas.gas_price)
            .chain_id(chain_id);

        let signature = self
            .wallet
            .clone()
            .with_chain_id(chain_id)
            .sign_transaction(&tx.clone().into())
            .await
            .map_err(|e| anyhow!("Failed to sign transaction: {}", e))?;
        let raw_tx = tx.rlp_signed(&signature);

        match self.provider.send_raw_transaction(raw_tx).await {
            Ok(pending) => {
                let tx_hash = pending.tx_hash();
                info!("Broadcast {} with nonce {}: {:#x}", prepared.call.signature, nonce, tx_hash);
                Ok(tx_hash)
            }
            Err(e) => {
                warn!("eth_sendRawTransaction rejected nonce {}: {}", nonce, e);
                Err(anyhow!("RPC Error sending transaction: {}", e))
            }
        }
    }
}
