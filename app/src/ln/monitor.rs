use fedimint_tonic_lnd::lnrpc;
use fedimint_tonic_lnd::tonic;
use futures::stream::BoxStream;
use futures::StreamExt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{oneshot, Mutex};
use tokio_util::sync::CancellationToken;

pub(super) type InvoiceStream = BoxStream<'static, Result<lnrpc::Invoice, tonic::Status>>;

struct Subscriber {
    id: u64,
    hash: String,
    sink: oneshot::Sender<lnrpc::Invoice>,
}

/// Fans the node's single invoice-event stream out to per-hash waiters.
///
/// The upstream subscription is opened once when the backend connects, not
/// once per request. Each waiter registers a one-shot sink under the hash it
/// cares about; delivering an event consumes the sink and drops the waiter.
/// An event with no matching waiter is discarded, so a waiter that registers
/// after its event has passed stays pending until its caller's deadline.
#[derive(Clone)]
pub(super) struct InvoiceMonitor {
    subscribers: Arc<Mutex<Vec<Subscriber>>>,
    next_id: Arc<AtomicU64>,
}

impl InvoiceMonitor {
    pub(super) fn start(stream: InvoiceStream) -> Self {
        let monitor = Self {
            subscribers: Arc::new(Mutex::new(Vec::new())),
            next_id: Arc::new(AtomicU64::new(0)),
        };
        tokio::spawn(monitor.clone().read_upstream(stream));
        monitor
    }

    /// Waits for the next event carrying `hash`. The waiter is removed from
    /// the subscriber set on every exit path.
    pub(super) async fn wait(
        &self,
        cancel: CancellationToken,
        hash: &str,
    ) -> Result<lnrpc::Invoice, super::Error> {
        let (id, receiver) = self.register(hash).await;
        tokio::select! {
            invoice = receiver => invoice.map_err(|_| super::Error::SubscriptionLost),
            _ = cancel.cancelled() => {
                self.unregister(id).await;
                Err(super::Error::Cancelled)
            }
        }
    }

    async fn register(&self, hash: &str) -> (u64, oneshot::Receiver<lnrpc::Invoice>) {
        let (sink, receiver) = oneshot::channel();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.subscribers.lock().await.push(Subscriber {
            id,
            hash: hash.to_owned(),
            sink,
        });
        (id, receiver)
    }

    async fn unregister(&self, id: u64) {
        self.subscribers.lock().await.retain(|sub| sub.id != id);
    }

    async fn read_upstream(self, mut stream: InvoiceStream) {
        loop {
            match stream.next().await {
                Some(Ok(invoice)) => self.notify_all(invoice).await,
                Some(Err(e)) => {
                    log::error!("invoice subscription failed: {}", e);
                    return;
                }
                None => {
                    log::error!("invoice subscription closed by the node");
                    return;
                }
            }
        }
    }

    /// Delivers `invoice` to every waiter registered for its hash, dropping
    /// those waiters; everyone else stays registered.
    async fn notify_all(&self, invoice: lnrpc::Invoice) {
        let hash = hex::encode(&invoice.r_hash);
        let mut subscribers = self.subscribers.lock().await;
        let mut remaining = Vec::with_capacity(subscribers.len());
        for sub in subscribers.drain(..) {
            if sub.hash == hash {
                let _ = sub.sink.send(invoice.clone());
            } else {
                remaining.push(sub);
            }
        }
        *subscribers = remaining;
    }
}
