//! Mock backends shared by the payment tests.

use crate::btc::Sats;
use crate::chain::{self, AddrStatus, ChainBackend};
use crate::ln::{self, Info, Invoice, LightningBackend, NewInvoice, Status};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub(super) const HASH: &str = "3ca1a2b5f9c6d4e8a7b0c1d2e3f405162738495a6b7c8d9e0f1a2b3c4d5e6f70";

#[derive(Default)]
pub(super) struct FakeLightning {
    /// Reply for one-shot lookups; `None` makes the call fail.
    pub status: Option<Status>,
    /// Event eventually delivered to `status_wait`; `None` blocks until
    /// cancellation, like a stream that never produces a matching event.
    pub wait: Option<Status>,
    /// How long `status_wait` takes to produce its event.
    pub wait_delay: Duration,
    pub invoices: Vec<Invoice>,
    pub status_calls: AtomicUsize,
}

#[async_trait]
impl LightningBackend for FakeLightning {
    async fn new_invoice(&self, _amount: Sats, _memo: &str) -> Result<NewInvoice, ln::Error> {
        Ok(NewInvoice {
            bolt11: "lnbc10u1fakeinvoice".to_owned(),
            hash: HASH.to_owned(),
        })
    }

    async fn status(&self, _hash: &str) -> Result<Status, ln::Error> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        self.status.ok_or_else(|| ln::Error::Backend {
            code: "Unavailable".to_owned(),
            message: "lookup failed".to_owned(),
        })
    }

    async fn status_wait(&self, cancel: CancellationToken, _hash: &str) -> Result<Status, ln::Error> {
        match self.wait {
            Some(status) => {
                tokio::time::sleep(self.wait_delay).await;
                Ok(status)
            }
            None => {
                cancel.cancelled().await;
                Err(ln::Error::Cancelled)
            }
        }
    }

    async fn new_address(&self, _bech32: bool) -> Result<String, ln::Error> {
        Ok("2NFnM1SsNsHdXgXMWE8shmvNB6GYLqEXWYB".to_owned())
    }

    async fn info(&self) -> Result<Info, ln::Error> {
        Ok(Info {
            uris: vec!["pubkey@localhost:9735".to_owned()],
        })
    }

    async fn history(&self) -> Result<Vec<Invoice>, ln::Error> {
        Ok(self.invoices.clone())
    }
}

#[derive(Default)]
pub(super) struct FakeChain {
    /// Successive poll results for a specific address; the last one repeats.
    pub amounts: Vec<f64>,
    /// Label attached to specific-address poll results.
    pub label: String,
    /// Makes every call fail.
    pub fail: bool,
    /// Result of the all-addresses query.
    pub all: Vec<AddrStatus>,
    pub check_calls: AtomicUsize,
    pub imported: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl ChainBackend for FakeChain {
    async fn block_count(&self) -> Result<i64, chain::Error> {
        Ok(100)
    }

    async fn new_address(&self, _bech32: bool) -> Result<String, chain::Error> {
        Ok("bcrt1qfakeaddress".to_owned())
    }

    async fn import_address(&self, address: &str, label: &str) -> Result<(), chain::Error> {
        self.imported
            .lock()
            .unwrap()
            .push((address.to_owned(), label.to_owned()));
        Ok(())
    }

    async fn check_address(&self, address: &str) -> Result<Vec<AddrStatus>, chain::Error> {
        let call = self.check_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(chain::Error::Rpc {
                code: -28,
                message: "Loading wallet...".to_owned(),
            });
        }
        if address.is_empty() {
            return Ok(self.all.clone());
        }
        let amount = self
            .amounts
            .get(call)
            .or_else(|| self.amounts.last())
            .copied()
            .unwrap_or(0.0);
        Ok(vec![AddrStatus {
            address: address.to_owned(),
            amount,
            confirmations: if amount > 0.0 { 1 } else { 0 },
            label: self.label.clone(),
            txids: if amount > 0.0 {
                vec!["deadbeef".to_owned()]
            } else {
                Vec::new()
            },
        }])
    }
}
