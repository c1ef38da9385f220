//! Issues dual-rail payments and tracks their settlement.

use crate::btc;
use crate::chain::ChainBackend;
use crate::ln::{self, LightningBackend};
use const_format::formatcp;
use thiserror::Error;

mod entities;
mod history;
mod resolver;
#[cfg(test)]
mod testing;

pub use entities::{NewPayment, Payment, StatusReply};
pub use history::{history, History, HistoryQuery, StatusFilter};
pub use resolver::{resolve, StatusQuery};

pub const MAX_DESCRIPTION_BYTES: usize = 639;

const DESCRIPTION_TOO_LONG: &str = formatcp!(
    "description too long. Max length is {}.",
    MAX_DESCRIPTION_BYTES
);

/// Which rail(s) a new payment should be issued on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Only {
    Both,
    Btc,
    Ln,
}

#[derive(Debug, Error)]
pub enum IssueError {
    #[error("{}", DESCRIPTION_TOO_LONG)]
    DescriptionTooLong,
    #[error("can't create new LN invoice: {0}")]
    CreateInvoice(#[source] ln::Error),
    #[error("can't get LN invoice: {0}")]
    LookupInvoice(#[source] ln::Error),
    #[error("can't get Bitcoin address: {0}")]
    NewAddress(#[source] ln::Error),
    #[error("can't import address ({address}) to Bitcoin node: {source}")]
    ImportAddress {
        address: String,
        source: crate::chain::Error,
    },
}

/// Issues a payment on the requested rails. The chain address is labelled
/// with the LN payment hash, which is what ties the two rails together for
/// the history merge later.
///
/// Failures abort the request as-is; an invoice that was already created
/// before a later step failed is not cleaned up.
pub async fn issue(
    ln: &dyn LightningBackend,
    chain: Option<&dyn ChainBackend>,
    amount: btc::Sats,
    description: &str,
    only: Only,
) -> Result<NewPayment, IssueError> {
    if description.len() > MAX_DESCRIPTION_BYTES {
        return Err(IssueError::DescriptionTooLong);
    }

    // Without an on-chain backend every payment is Lightning-only.
    let only = if chain.is_some() { only } else { Only::Ln };

    let mut payment = NewPayment::default();

    if only != Only::Btc {
        let invoice = ln
            .new_invoice(amount, description)
            .await
            .map_err(IssueError::CreateInvoice)?;
        payment.bolt11 = invoice.bolt11;
        payment.hash = invoice.hash;

        // The node's stored creation date and expiry are authoritative;
        // settlement checks later compare against exactly these values.
        let status = ln
            .status(&payment.hash)
            .await
            .map_err(IssueError::LookupInvoice)?;
        payment.created_at = status.created_at;
        payment.expiry = status.expiry;
    }

    if let Some(chain) = chain {
        if only != Only::Ln {
            payment.address = ln
                .new_address(false)
                .await
                .map_err(IssueError::NewAddress)?;

            let label = if payment.hash.is_empty() {
                description
            } else {
                payment.hash.as_str()
            };
            chain
                .import_address(&payment.address, label)
                .await
                .map_err(|source| IssueError::ImportAddress {
                    address: payment.address.clone(),
                    source,
                })?;
        }
    }

    Ok(payment)
}

#[cfg(test)]
mod tests {
    use super::testing::{FakeChain, FakeLightning, HASH};
    use super::*;
    use crate::ln::Status;

    fn lightning() -> FakeLightning {
        FakeLightning {
            status: Some(Status {
                created_at: 1_700_000_000,
                settled: false,
                expiry: 3600,
                value: btc::Sats(1000),
            }),
            ..FakeLightning::default()
        }
    }

    #[tokio::test]
    async fn issues_on_both_rails() {
        let ln = lightning();
        let chain = FakeChain::default();
        let payment = issue(&ln, Some(&chain), btc::Sats(1000), "tea", Only::Both)
            .await
            .unwrap();

        assert!(!payment.bolt11.is_empty());
        assert_eq!(payment.hash.len(), 64);
        assert!(payment.hash.chars().all(|c| c.is_ascii_hexdigit()));
        assert!(!payment.address.is_empty());
        assert!(payment.created_at > 0);
        assert_eq!(payment.expiry, 3600);

        let imported = chain.imported.lock().unwrap();
        assert_eq!(imported.len(), 1);
        assert_eq!(imported[0], (payment.address.clone(), HASH.to_owned()));
    }

    #[tokio::test]
    async fn lightning_only_skips_the_chain() {
        let ln = lightning();
        let chain = FakeChain::default();
        let payment = issue(&ln, Some(&chain), btc::Sats(1000), "tea", Only::Ln)
            .await
            .unwrap();
        assert!(payment.address.is_empty());
        assert!(!payment.bolt11.is_empty());
        assert!(chain.imported.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn chain_only_uses_the_description_as_label() {
        let ln = lightning();
        let chain = FakeChain::default();
        let payment = issue(&ln, Some(&chain), btc::Sats(1000), "tea", Only::Btc)
            .await
            .unwrap();
        assert!(payment.bolt11.is_empty());
        assert!(payment.hash.is_empty());
        assert!(!payment.address.is_empty());

        let imported = chain.imported.lock().unwrap();
        assert_eq!(imported[0].1, "tea");
    }

    #[tokio::test]
    async fn missing_chain_backend_coerces_to_lightning_only() {
        let ln = lightning();
        let payment = issue(&ln, None, btc::Sats(1000), "tea", Only::Btc)
            .await
            .unwrap();
        assert!(!payment.bolt11.is_empty());
        assert!(payment.address.is_empty());
    }

    #[tokio::test]
    async fn overlong_description_is_rejected() {
        let ln = lightning();
        let chain = FakeChain::default();
        let description = "x".repeat(MAX_DESCRIPTION_BYTES + 1);
        let err = issue(&ln, Some(&chain), btc::Sats(1000), &description, Only::Both)
            .await
            .unwrap_err();
        assert!(matches!(err, IssueError::DescriptionTooLong));
    }

    #[tokio::test]
    async fn lookup_failure_aborts_the_request() {
        let ln = FakeLightning::default(); // no status configured
        let chain = FakeChain::default();
        let err = issue(&ln, Some(&chain), btc::Sats(1000), "tea", Only::Both)
            .await
            .unwrap_err();
        assert!(matches!(err, IssueError::LookupInvoice(_)));
        assert!(chain.imported.lock().unwrap().is_empty());
    }
}
