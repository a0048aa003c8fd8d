// src/blockchain/mod.rs

// Chain access: read/write traits and the node-backed implementations
pub mod client;
pub mod evm_client;
pub mod signer;
pub use client::{ChainReader, ChainWriter, EvmClient};

// Re-export other modules
pub mod models;
pub mod services;
