// src/lib.rs

use anyhow::Result;
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;

// Re-export commonly used types
pub use ethers::types::{Address, H256, U256};

// Re-export modules
pub mod api;
pub mod blockchain;
pub mod config;
pub mod mcp;
pub mod utils;

use blockchain::{
    client::EvmClient,
    services::{fetcher::ResilientFetcher, indexer::IndexerClient, transfer::TransferOrchestrator},
    signer::SigningAccount,
};

/// Application state shared across all request handlers
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<config::Config>,
    /// Runs transfers for the configured signing account
    pub transfers: Arc<TransferOrchestrator>,
    /// BlockVision and Reservoir access for the query tools
    pub indexer: IndexerClient,
}

impl AppState {
    pub fn new(config: config::Config, transfers: TransferOrchestrator, indexer: IndexerClient) -> Self {
        Self {
            config: Arc::new(config),
            transfers: Arc::new(transfers),
            indexer,
        }
    }

    /// Wires the node client, signer and HTTP fetcher from `config`. Makes no network calls.
    pub fn from_config(config: config::Config) -> Result<Self> {
        let evm_client = Arc::new(EvmClient::new(&config.rpc_url, config.receipt_poll_interval)?);
        let signer = Arc::new(SigningAccount::new(&config.private_key, evm_client.provider())?);
        let transfers = TransferOrchestrator::new(
            evm_client,
            signer,
            config.explorer_tx_url.clone(),
            config.native_symbol.clone(),
        );
        let indexer = IndexerClient::new(
            ResilientFetcher::new(config.fetch_retry),
            &config.blockvision_base_url,
            &config.reservoir_base_url,
            SecretString::new(config.blockvision_api_key.expose_secret().clone()),
        );
        Ok(Self::new(config, transfers, indexer))
    }
}
