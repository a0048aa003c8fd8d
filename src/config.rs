// src/config.rs

use anyhow::{Context, Result};
use secrecy::SecretString;
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;
use url::Url;

use crate::blockchain::services::{
    fetcher::RetryPolicy,
    indexer::{BLOCKVISION_BASE, RESERVOIR_BASE},
};

pub const DEFAULT_RPC_URL: &str = "https://testnet-rpc.monad.xyz";
pub const DEFAULT_EXPLORER_TX_URL: &str = "https://testnet.monadexplorer.com/tx/";

// Everything the server needs, loaded once at startup.
#[derive(Debug)]
pub struct Config {
    // Server settings
    pub port: u16,

    // Network
    pub rpc_url: String,
    pub explorer_tx_url: String,
    pub native_symbol: String,
    pub receipt_poll_interval: Duration,

    /// The one signing credential. Required.
    pub private_key: SecretString,

    // External services
    pub blockvision_base_url: String,
    pub reservoir_base_url: String,
    /// Required.
    pub blockvision_api_key: SecretString,
    pub fetch_retry: RetryPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            rpc_url: DEFAULT_RPC_URL.to_string(),
            explorer_tx_url: DEFAULT_EXPLORER_TX_URL.to_string(),
            native_symbol: "MON".to_string(),
            receipt_poll_interval: Duration::from_millis(1000),
            private_key: SecretString::new(String::new()),
            blockvision_base_url: BLOCKVISION_BASE.to_string(),
            reservoir_base_url: RESERVOIR_BASE.to_string(),
            blockvision_api_key: SecretString::new(String::new()),
            fetch_retry: RetryPolicy::default(),
        }
    }
}

impl Config {
    /// Loads the .env file (if any) and then reads the process environment.
    pub fn from_env() -> Result<Self> {
        load_env_file()?;
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from any key lookup. Missing credentials are errors.
    pub fn from_lookup<F>(get: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();
        let required = |key: &str| {
            get(key)
                .filter(|v| !v.trim().is_empty())
                .with_context(|| format!("{} environment variable is not set", key))
        };
        let url = |key: &str, default: &str| -> Result<String> {
            let value = get(key).unwrap_or_else(|| default.to_string());
            Url::parse(&value).with_context(|| format!("{} must be a valid URL", key))?;
            Ok(value)
        };
        let number = |key: &str, default: u64| -> Result<u64> {
            match get(key) {
                Some(v) => v
                    .trim()
                    .parse()
                    .with_context(|| format!("{} must be a valid number", key)),
                None => Ok(default),
            }
        };

        let private_key = SecretString::new(required("PRIVATE_KEY")?);
        let blockvision_api_key = SecretString::new(required("BLOCKVISION_API_KEY")?);

        let port = u16::try_from(number("PORT", defaults.port as u64)?)
            .context("PORT must be a valid port number")?;

        Ok(Config {
            port,
            rpc_url: url("MONAD_RPC_URL", DEFAULT_RPC_URL)?,
            explorer_tx_url: url("EXPLORER_TX_URL", DEFAULT_EXPLORER_TX_URL)?,
            native_symbol: get("NATIVE_SYMBOL").unwrap_or(defaults.native_symbol),
            receipt_poll_interval: Duration::from_millis(number("RECEIPT_POLL_INTERVAL_MS", 1000)?),
            private_key,
            blockvision_base_url: url("BLOCKVISION_BASE_URL", BLOCKVISION_BASE)?,
            reservoir_base_url: url("RESERVOIR_BASE_URL", RESERVOIR_BASE)?,
            blockvision_api_key,
            fetch_retry: RetryPolicy {
                max_attempts: u32::try_from(number("FETCH_MAX_ATTEMPTS", defaults.fetch_retry.max_attempts as u64)?)
                    .context("FETCH_MAX_ATTEMPTS is too large")?,
                delay: Duration::from_millis(number(
                    "FETCH_RETRY_DELAY_MS",
                    defaults.fetch_retry.delay.as_millis() as u64,
                )?),
            },
        })
    }
}

// ENV_FILE wins; otherwise ./.env, then ~/.monad-mcp/.env. A missing default file is fine.
fn load_env_file() -> Result<()> {
    if let Ok(path) = env::var("ENV_FILE") {
        dotenvy::from_path(&path).with_context(|| format!("Failed to load ENV_FILE {}", path))?;
        info!("Loaded environment from {}", path);
        return Ok(());
    }
    if let Ok(path) = dotenvy::dotenv() {
        info!("Loaded environment from {}", path.display());
        return Ok(());
    }
    let fallback: Option<PathBuf> = dirs::home_dir().map(|mut p| {
        p.push(".monad-mcp");
        p.push(".env");
        p
    });
    if let Some(path) = fallback.filter(|p| p.exists()) {
        dotenvy::from_path(&path).with_context(|| format!("Failed to load {}", path.display()))?;
        info!("Loaded environment from {}", path.display());
    }
    Ok(())
}
