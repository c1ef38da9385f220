use super::entities::Payment;
use crate::chain::{AddrStatus, ChainBackend};
use crate::ln::{self, LightningBackend};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusFilter {
    Paid,
    Expired,
    Pending,
}

/// History request. `limit` and `offset` are accepted for forward
/// compatibility; paging is not implemented yet.
#[derive(Debug, Default, Clone, Copy)]
pub struct HistoryQuery {
    pub limit: i64,
    pub offset: i64,
    pub only_status: Option<StatusFilter>,
}

#[derive(Debug, Default)]
pub struct History {
    pub history: Vec<Payment>,
    /// Set when the on-chain side could not be consulted; the Lightning
    /// side of the history is still returned.
    pub warning: Option<String>,
}

/// Joins the node's invoice list with on-chain receipts. The join key is
/// the address label, which the issuing flow sets to the LN payment hash.
/// A chain failure degrades to a Lightning-only listing; a Lightning
/// failure is fatal.
pub async fn history(
    ln: &dyn LightningBackend,
    chain: Option<&dyn ChainBackend>,
    query: HistoryQuery,
) -> Result<History, ln::Error> {
    let mut warning = None;
    let mut receipts: HashMap<String, AddrStatus> = HashMap::new();
    if let Some(chain) = chain {
        match chain.check_address("").await {
            Ok(all) => {
                for status in all {
                    if !status.label.is_empty() {
                        receipts.insert(status.label.clone(), status);
                    }
                }
            }
            Err(e) => {
                log::warn!("unable to fetch on-chain receipts: {}", e);
                warning = Some("Unable to fetch Bitcoin history. Only showing LN.".to_owned());
            }
        }
    }

    let mut history = Vec::new();
    for invoice in ln.history().await? {
        let hash = invoice.hash.clone();
        let mut payment = Payment::default();
        payment.apply_ln(invoice);
        if let Some(status) = receipts.remove(&hash) {
            payment.apply_btc(status);
        }

        let keep = match query.only_status {
            Some(StatusFilter::Paid) => payment.paid,
            Some(StatusFilter::Expired) => payment.expired,
            Some(StatusFilter::Pending) => !payment.paid && !payment.expired,
            None => true,
        };
        if keep {
            history.push(payment);
        }
    }

    // TODO: apply limit/offset once pagination is implemented.
    history.reverse();

    Ok(History { history, warning })
}

#[cfg(test)]
mod tests {
    use super::super::testing::{FakeChain, FakeLightning};
    use super::*;
    use crate::btc::Sats;

    fn invoice(hash: &str, paid: bool, expired: bool) -> ln::Invoice {
        ln::Invoice {
            bolt11: format!("lnbc1fake{}", hash),
            hash: hash.to_owned(),
            created_at: 1_700_000_000,
            expiry: 3600,
            description: "tea".to_owned(),
            amount: Sats(1000),
            paid,
            paid_at: 0,
            expired,
        }
    }

    fn receipt(label: &str, amount: f64) -> AddrStatus {
        AddrStatus {
            address: format!("addr-{}", label),
            amount,
            confirmations: 3,
            label: label.to_owned(),
            txids: vec!["deadbeef".to_owned()],
        }
    }

    #[tokio::test]
    async fn joins_receipts_by_label_and_reverses() {
        let ln = FakeLightning {
            invoices: vec![
                invoice("aaaa", false, false),
                invoice("bbbb", false, false),
            ],
            ..FakeLightning::default()
        };
        let chain = FakeChain {
            all: vec![
                receipt("bbbb", 0.00001000),
                receipt("", 0.5), // unlabelled, never joined
            ],
            ..FakeChain::default()
        };

        let result = history(&ln, Some(&chain), HistoryQuery::default())
            .await
            .unwrap();
        assert!(result.warning.is_none());
        assert_eq!(result.history.len(), 2);

        // Newest (last listed) first.
        let first = &result.history[0];
        assert_eq!(first.details.hash, "bbbb");
        assert_eq!(first.details.address, "addr-bbbb");
        assert_eq!(first.btc_amount, Sats(1000));
        assert!(first.btc_paid);
        assert!(first.paid);

        let second = &result.history[1];
        assert_eq!(second.details.hash, "aaaa");
        assert!(second.details.address.is_empty());
        assert!(!second.paid);
    }

    #[tokio::test]
    async fn chain_failure_degrades_to_lightning_only() {
        let ln = FakeLightning {
            invoices: vec![invoice("aaaa", true, false)],
            ..FakeLightning::default()
        };
        let chain = FakeChain {
            fail: true,
            ..FakeChain::default()
        };

        let result = history(&ln, Some(&chain), HistoryQuery::default())
            .await
            .unwrap();
        assert_eq!(
            result.warning.as_deref(),
            Some("Unable to fetch Bitcoin history. Only showing LN.")
        );
        assert_eq!(result.history.len(), 1);
    }

    #[tokio::test]
    async fn status_filters_apply() {
        let ln = FakeLightning {
            invoices: vec![
                invoice("paid", true, false),
                invoice("expired", false, true),
                invoice("pending", false, false),
            ],
            ..FakeLightning::default()
        };

        let run = |filter| {
            let query = HistoryQuery {
                only_status: Some(filter),
                ..HistoryQuery::default()
            };
            history(&ln, None, query)
        };

        let paid = run(StatusFilter::Paid).await.unwrap().history;
        assert_eq!(paid.len(), 1);
        assert!(paid[0].paid);

        let expired = run(StatusFilter::Expired).await.unwrap().history;
        assert_eq!(expired.len(), 1);
        assert!(expired[0].expired);

        let pending = run(StatusFilter::Pending).await.unwrap().history;
        assert_eq!(pending.len(), 1);
        assert!(!pending[0].paid && !pending[0].expired);
    }
}
