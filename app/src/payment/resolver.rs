use super::entities::StatusReply;
use crate::btc;
use crate::chain::ChainBackend;
use crate::ln::{self, LightningBackend, DEFAULT_INVOICE_EXPIRY};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// What a settlement watch should look at. At least one of `hash` and
/// `address` must be present; the API layer rejects everything else.
#[derive(Debug, Default, Clone)]
pub struct StatusQuery {
    pub hash: Option<String>,
    pub address: Option<String>,
    /// Accept any received on-chain amount instead of insisting on the
    /// invoiced one.
    pub flexible: bool,
}

const POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Resolves the status of one payment: races the Lightning settlement
/// stream against an on-chain poll loop until one rail reports something
/// terminal, the invoice deadline passes, or `caller` gives up.
///
/// The deadline is taken from the invoice's stored expiry when a hash is
/// given, and falls back to the default invoice expiry for address-only
/// watches. Both racers observe the same cancellation scope, which is
/// always cancelled before this function returns.
pub async fn resolve(
    ln: Arc<dyn LightningBackend>,
    chain: Option<Arc<dyn ChainBackend>>,
    query: StatusQuery,
    caller: CancellationToken,
) -> StatusReply {
    let hash = query.hash.filter(|h| !h.is_empty());
    let address = query.address.filter(|a| !a.is_empty());

    let mut desired = btc::Sats(0);
    let mut fin = Utc::now().timestamp() + DEFAULT_INVOICE_EXPIRY.0;

    // Synchronous preflight. Also the only way to learn about a settlement
    // that happened before this request could subscribe to the event
    // stream: the monitor never replays past events.
    if let Some(hash) = &hash {
        match preflight(ln.as_ref(), hash).await {
            Err(reply) => return reply,
            Ok(status) => {
                fin = status.created_at + status.expiry;
                desired = status.value;
            }
        }
    }

    let deadline = Instant::now()
        + Duration::from_secs(u64::try_from(fin - Utc::now().timestamp()).unwrap_or(0));

    let (reply_tx, mut reply_rx) = mpsc::channel(1);
    let race = caller.child_token();
    let _race_guard = race.clone().drop_guard();

    if let Some(hash) = hash.clone() {
        let ln = Arc::clone(&ln);
        let race = race.clone();
        let reply_tx = reply_tx.clone();
        tokio::spawn(async move {
            let reply = match ln.status_wait(race, &hash).await {
                Ok(status) => ln_reply(status),
                Err(ln::Error::Cancelled) => return,
                Err(e) => StatusReply::error(500, format!("unable to fetch invoice: {}", e)),
            };
            let _ = reply_tx.send(reply).await;
        });
    }

    if let (Some(chain), Some(address)) = (chain, address) {
        let race = race.clone();
        let ln_provided = hash.is_some();
        let flexible = query.flexible;
        let reply_tx = reply_tx.clone();
        tokio::spawn(async move {
            let reply =
                poll_chain(chain.as_ref(), &race, &address, ln_provided, flexible, desired).await;
            if let Some(reply) = reply {
                let _ = reply_tx.send(reply).await;
            }
        });
    }

    drop(reply_tx);

    tokio::select! {
        Some(reply) = reply_rx.recv() => reply,
        _ = tokio::time::sleep_until(deadline) => StatusReply::expired(),
        _ = caller.cancelled() => StatusReply::cancelled(),
    }
}

/// One-shot invoice check: settled and expired are terminal, anything else
/// keeps the race going with the invoice's own deadline and amount.
async fn preflight(ln: &dyn LightningBackend, hash: &str) -> Result<ln::Status, StatusReply> {
    let status = match ln.status(hash).await {
        Ok(status) => status,
        Err(e) => return Err(StatusReply::error(500, format!("unable to fetch invoice: {}", e))),
    };
    if status.settled {
        return Err(StatusReply::ln(200, status));
    }
    if status.is_expired() {
        return Err(StatusReply::expired());
    }
    Ok(status)
}

fn ln_reply(status: ln::Status) -> StatusReply {
    if status.settled {
        StatusReply::ln(200, status)
    } else if status.is_expired() {
        StatusReply::expired()
    } else {
        // A non-terminal update (the invoice was accepted but not settled);
        // reported as-is.
        StatusReply::ln(0, status)
    }
}

/// Polls the address every two seconds until it sees coins, the race is
/// cancelled, or the backend fails. Backend failures end the poll silently
/// when Lightning is also being watched; the other racer can still win.
async fn poll_chain(
    chain: &dyn ChainBackend,
    race: &CancellationToken,
    address: &str,
    ln_provided: bool,
    flexible: bool,
    desired: btc::Sats,
) -> Option<StatusReply> {
    loop {
        tokio::select! {
            _ = race.cancelled() => return None,
            _ = tokio::time::sleep(POLL_INTERVAL) => {}
        }

        let statuses = match chain.check_address(address).await {
            Ok(statuses) => statuses,
            Err(e) if ln_provided => {
                log::warn!("disabling on-chain check for {}: {}", address, e);
                return None;
            }
            Err(e) => return Some(StatusReply::error(500, format!("unable to check status: {}", e))),
        };

        let mut status = match statuses.into_iter().next() {
            Some(status) => status,
            None => continue,
        };

        if status.amount == 0.0 {
            continue;
        }

        let received = btc::Sats::from_btc(status.amount);

        // no need to return the label here
        status.label.clear();

        if flexible || received == desired {
            return Some(StatusReply::bitcoin(200, status));
        }
        if received > desired {
            return Some(StatusReply::bitcoin(202, status));
        }
        return Some(StatusReply {
            code: 402,
            error: Some("not enough".to_owned()),
            bitcoin: Some(status),
            ln: None,
        });
    }
}
