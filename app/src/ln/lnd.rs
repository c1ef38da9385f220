use super::monitor::InvoiceMonitor;
use super::{Error, Info, Invoice, LightningBackend, NewInvoice, Status, DEFAULT_INVOICE_EXPIRY};
use crate::btc;
use crate::config::{self, LndConfig};
use anyhow::Context;
use async_trait::async_trait;
use chrono::Utc;
use fedimint_tonic_lnd::lnrpc;
use fedimint_tonic_lnd::tonic;
use fedimint_tonic_lnd::Client;
use futures::StreamExt;
use tokio_util::sync::CancellationToken;

const HISTORY_PAGE_SIZE: u64 = 100;

/// LND-backed [`LightningBackend`].
///
/// Two connections are held: the invoice macaroon covers issuing and
/// watching invoices, the read-only macaroon covers history and node info.
pub struct Lnd {
    invoice_client: Client,
    read_only_client: Client,
    monitor: InvoiceMonitor,
}

impl Lnd {
    /// Connects both clients and opens the invoice-event subscription that
    /// feeds the monitor for the lifetime of the process.
    pub async fn connect(conf: &LndConfig) -> anyhow::Result<Self> {
        let address = format!("https://{}:{}", conf.host, conf.port);
        let tls = config::expand_path(&conf.tls);

        let read_only_client = fedimint_tonic_lnd::connect(
            address.clone(),
            &tls,
            config::expand_path(&conf.macaroon.readonly),
        )
        .await
        .with_context(|| format!("unable to connect to lnd at {}", address))?;

        let mut invoice_client = fedimint_tonic_lnd::connect(
            address.clone(),
            &tls,
            config::expand_path(&conf.macaroon.invoice),
        )
        .await
        .with_context(|| format!("unable to connect to lnd at {}", address))?;

        let stream = invoice_client
            .lightning()
            .subscribe_invoices(lnrpc::InvoiceSubscription::default())
            .await
            .context("unable to subscribe to lnd invoice events")?
            .into_inner();

        Ok(Self {
            invoice_client,
            read_only_client,
            monitor: InvoiceMonitor::start(stream.boxed()),
        })
    }
}

#[async_trait]
impl LightningBackend for Lnd {
    async fn new_invoice(&self, amount: btc::Sats, memo: &str) -> Result<NewInvoice, Error> {
        let mut client = self.invoice_client.clone();
        let resp = client
            .lightning()
            .add_invoice(lnrpc::Invoice {
                memo: memo.to_owned(),
                value: amount.0,
                expiry: DEFAULT_INVOICE_EXPIRY.0,
                ..Default::default()
            })
            .await
            .map_err(backend_error)?
            .into_inner();
        Ok(NewInvoice {
            bolt11: resp.payment_request,
            hash: hex::encode(resp.r_hash),
        })
    }

    async fn status(&self, hash: &str) -> Result<Status, Error> {
        let r_hash = hex::decode(hash).map_err(|_| Error::InvalidHash(hash.to_owned()))?;
        let mut client = self.invoice_client.clone();
        let resp = client
            .lightning()
            .lookup_invoice(lnrpc::PaymentHash {
                r_hash,
                ..Default::default()
            })
            .await
            .map_err(backend_error)?
            .into_inner();
        Ok(map_status(&resp))
    }

    async fn status_wait(&self, cancel: CancellationToken, hash: &str) -> Result<Status, Error> {
        let invoice = self.monitor.wait(cancel, hash).await?;
        Ok(map_status(&invoice))
    }

    async fn new_address(&self, bech32: bool) -> Result<String, Error> {
        let addr_type = if bech32 {
            lnrpc::AddressType::WitnessPubkeyHash
        } else {
            lnrpc::AddressType::NestedPubkeyHash
        };
        let mut client = self.invoice_client.clone();
        let resp = client
            .lightning()
            .new_address(lnrpc::NewAddressRequest {
                r#type: addr_type.into(),
                ..Default::default()
            })
            .await
            .map_err(backend_error)?
            .into_inner();
        Ok(resp.address)
    }

    async fn info(&self) -> Result<Info, Error> {
        let mut client = self.read_only_client.clone();
        let resp = client
            .lightning()
            .get_info(lnrpc::GetInfoRequest {})
            .await
            .map_err(backend_error)?
            .into_inner();
        Ok(Info { uris: resp.uris })
    }

    async fn history(&self) -> Result<Vec<Invoice>, Error> {
        let mut client = self.read_only_client.clone();
        let resp = client
            .lightning()
            .list_invoices(lnrpc::ListInvoiceRequest {
                num_max_invoices: HISTORY_PAGE_SIZE,
                reversed: true,
                ..Default::default()
            })
            .await
            .map_err(backend_error)?
            .into_inner();
        let now = Utc::now().timestamp();
        Ok(resp
            .invoices
            .into_iter()
            .map(|invoice| map_history_entry(invoice, now))
            .collect())
    }
}

fn backend_error(e: tonic::Status) -> Error {
    Error::Backend {
        code: e.code().to_string(),
        message: e.message().to_owned(),
    }
}

fn map_status(invoice: &lnrpc::Invoice) -> Status {
    Status {
        created_at: invoice.creation_date,
        settled: invoice.state() == lnrpc::invoice::InvoiceState::Settled,
        expiry: invoice.expiry,
        value: normalized_value(invoice),
    }
}

// LND reports zero `value` for amountless invoices; once something has been
// received the paid amount is the next best answer.
fn normalized_value(invoice: &lnrpc::Invoice) -> btc::Sats {
    if invoice.value != 0 {
        btc::Sats(invoice.value)
    } else {
        btc::Sats(invoice.amt_paid_sat)
    }
}

fn map_history_entry(invoice: lnrpc::Invoice, now: i64) -> Invoice {
    let paid = invoice.state() == lnrpc::invoice::InvoiceState::Settled;
    Invoice {
        hash: hex::encode(&invoice.r_hash),
        created_at: invoice.creation_date,
        expiry: invoice.expiry,
        expired: invoice.creation_date + invoice.expiry < now,
        amount: btc::Sats(invoice.value),
        paid,
        paid_at: invoice.settle_date,
        description: invoice.memo,
        bolt11: invoice.payment_request,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_value_falls_back_to_paid_amount() {
        let invoice = lnrpc::Invoice {
            value: 0,
            amt_paid_sat: 1500,
            ..Default::default()
        };
        assert_eq!(normalized_value(&invoice), btc::Sats(1500));

        let invoice = lnrpc::Invoice {
            value: 1000,
            amt_paid_sat: 1500,
            ..Default::default()
        };
        assert_eq!(normalized_value(&invoice), btc::Sats(1000));
    }

    #[test]
    fn settled_state_maps_to_settled_flag() {
        let invoice = lnrpc::Invoice {
            state: lnrpc::invoice::InvoiceState::Settled as i32,
            creation_date: 500,
            expiry: 3600,
            ..Default::default()
        };
        let status = map_status(&invoice);
        assert!(status.settled);
        assert_eq!(status.created_at, 500);
        assert_eq!(status.expiry, 3600);
    }

    #[test]
    fn history_entry_derives_expiry_from_creation_date() {
        let invoice = lnrpc::Invoice {
            r_hash: vec![0xab; 32],
            creation_date: 1000,
            expiry: 600,
            value: 42,
            memo: "tea".to_owned(),
            ..Default::default()
        };
        let entry = map_history_entry(invoice.clone(), 1601);
        assert!(entry.expired);
        assert_eq!(entry.hash, "ab".repeat(32));
        assert_eq!(entry.amount, btc::Sats(42));

        let entry = map_history_entry(invoice, 1600);
        assert!(!entry.expired);
    }
}
