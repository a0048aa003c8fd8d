// src/blockchain/services/indexer.rs

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

use crate::blockchain::{models::FetchError, services::fetcher::ResilientFetcher};

pub const BLOCKVISION_BASE: &str = "https://api.blockvision.org";
pub const RESERVOIR_BASE: &str = "https://api-monad-testnet.reservoir.tools";

/// Read-only access to the balances service (BlockVision) and the NFT indexer (Reservoir).
#[derive(Clone)]
pub struct IndexerClient {
    fetcher: ResilientFetcher,
    blockvision_base: String,
    reservoir_base: String,
    blockvision_api_key: Arc<SecretString>,
}

impl IndexerClient {
    pub fn new(
        fetcher: ResilientFetcher,
        blockvision_base: &str,
        reservoir_base: &str,
        blockvision_api_key: SecretString,
    ) -> Self {
        Self {
            fetcher,
            blockvision_base: blockvision_base.trim_end_matches('/').to_string(),
            reservoir_base: reservoir_base.trim_end_matches('/').to_string(),
            blockvision_api_key: Arc::new(blockvision_api_key),
        }
    }

    fn blockvision_headers(&self) -> Result<HeaderMap, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let key = HeaderValue::from_str(self.blockvision_api_key.expose_secret())
            .map_err(|_| FetchError::Upstream("BLOCKVISION_API_KEY is not a valid header value".into()))?;
        headers.insert("x-api-key", key);
        Ok(headers)
    }

    fn json_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers
    }

    /// Native and ERC-20 balances for `address`.
    pub async fn account_tokens(&self, address: &str) -> Result<Value, FetchError> {
        let url = format!("{}/v2/monad/account/tokens?address={}", self.blockvision_base, address);
        info!("Fetching token balances from: {}", url);
        self.fetcher.get_json(&url, &self.blockvision_headers()?).await
    }

    /// NFTs held by `address`.
    pub async fn user_tokens(&self, address: &str) -> Result<Value, FetchError> {
        let url = format!("{}/users/{}/tokens/v10", self.reservoir_base, address);
        info!("Fetching NFT portfolio from: {}", url);
        self.fetcher.get_json(&url, &Self::json_headers()).await
    }

    pub async fn trending_mints(&self) -> Result<Value, FetchError> {
        let url = format!("{}/collections/trending-mints/v2", self.reservoir_base);
        info!("Fetching trending collections from: {}", url);
        self.fetcher.get_json(&url, &Self::json_headers()).await
    }
}
