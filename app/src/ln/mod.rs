//! Contains code related to integrating with the Lightning network.
//! [`LightningBackend`] is the capability the rest of the service programs
//! against; [`Lnd`] implements it on top of LND's gRPC interface.

use crate::btc;
use crate::seconds::Seconds;
use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

mod lnd;
mod monitor;

pub use lnd::Lnd;

/// Expiry applied to newly issued invoices.
pub const DEFAULT_INVOICE_EXPIRY: Seconds = Seconds::one_hour();

#[derive(Debug, Error)]
pub enum Error {
    #[error("lightning backend error ({code}): {message}")]
    Backend { code: String, message: String },
    #[error("invalid payment hash: {0}")]
    InvalidHash(String),
    #[error("invoice subscription lost")]
    SubscriptionLost,
    #[error("wait cancelled")]
    Cancelled,
}

/// Snapshot of one LN invoice.
#[derive(Debug, Clone, Copy)]
pub struct Status {
    pub created_at: i64,
    pub settled: bool,
    pub expiry: i64,
    pub value: btc::Sats,
}

impl Status {
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() > self.created_at + self.expiry
    }
}

/// A freshly issued invoice.
#[derive(Debug, Clone)]
pub struct NewInvoice {
    pub bolt11: String,
    /// Payment hash, lowercase hex.
    pub hash: String,
}

#[derive(Debug, Clone)]
pub struct Info {
    pub uris: Vec<String>,
}

/// One entry of the node's invoice history.
#[derive(Debug, Clone, Default)]
pub struct Invoice {
    pub bolt11: String,
    pub hash: String,
    pub created_at: i64,
    pub expiry: i64,
    pub description: String,
    /// The requested amount, not the amount paid.
    pub amount: btc::Sats,
    pub paid: bool,
    pub paid_at: i64,
    pub expired: bool,
}

#[async_trait]
pub trait LightningBackend: Send + Sync {
    /// Creates an invoice for `amount` with [`DEFAULT_INVOICE_EXPIRY`].
    async fn new_invoice(&self, amount: btc::Sats, memo: &str) -> Result<NewInvoice, Error>;

    /// One-shot invoice lookup.
    async fn status(&self, hash: &str) -> Result<Status, Error>;

    /// Waits until the node pushes the next event for `hash`, or until
    /// `cancel` fires. An event that arrived before this call is missed;
    /// callers are expected to [`status`](Self::status) first.
    async fn status_wait(&self, cancel: CancellationToken, hash: &str) -> Result<Status, Error>;

    /// A fresh receive address from the node's internal wallet.
    async fn new_address(&self, bech32: bool) -> Result<String, Error>;

    async fn info(&self) -> Result<Info, Error>;

    /// The 100 most recent invoices, in chronological order.
    async fn history(&self) -> Result<Vec<Invoice>, Error>;
}
