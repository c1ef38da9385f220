//! On-chain backend surface. [`ChainBackend`] is the capability used for
//! watching addresses; [`Bitcoind`] implements it over bitcoind's JSON-RPC
//! wallet interface.

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

mod bitcoind;

pub use bitcoind::Bitcoind;

#[derive(Debug, Error)]
pub enum Error {
    #[error("bitcoind error ({code}): {message}")]
    Rpc { code: i64, message: String },
    #[error("bitcoind request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("malformed bitcoind response: {0}")]
    Response(#[from] serde_json::Error),
}

/// Receipts recorded for one watched address.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AddrStatus {
    #[serde(default)]
    pub address: String,
    /// Total received, in fractional BTC as bitcoind reports it.
    #[serde(default)]
    pub amount: f64,
    #[serde(default)]
    pub confirmations: i64,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub txids: Vec<String>,
}

#[async_trait]
pub trait ChainBackend: Send + Sync {
    async fn block_count(&self) -> Result<i64, Error>;

    /// A fresh wallet address. The issuing flow takes its addresses from the
    /// Lightning node's wallet; this exists for deployments that receive
    /// into a separate bitcoind wallet.
    async fn new_address(&self, bech32: bool) -> Result<String, Error>;

    /// Watch-only import under `label`. Importing the same address twice is
    /// not an error.
    async fn import_address(&self, address: &str, label: &str) -> Result<(), Error>;

    /// Receipts per address, including unconfirmed ones. An empty `address`
    /// returns every watched address; a specific one returns a single entry,
    /// zero-valued when the address has not seen any coins yet.
    async fn check_address(&self, address: &str) -> Result<Vec<AddrStatus>, Error>;
}
