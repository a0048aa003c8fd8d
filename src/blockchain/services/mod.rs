pub mod fees;
pub mod fetcher;
pub mod indexer;
pub mod portfolio;
pub mod token;
pub mod transfer;
