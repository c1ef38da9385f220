use async_trait::async_trait;
use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

/// A background task that runs forever on a fixed period. A panic inside
/// one cycle is contained so it can't take the loop down with it.
#[async_trait]
pub(crate) trait Worker: Send {
    async fn run(&mut self);
    fn period() -> Duration;
}

pub(crate) fn start<W: Worker + 'static>(mut worker: W) {
    tokio::spawn(async move {
        loop {
            swallow_panic(worker.run()).await;
            tokio::time::sleep(W::period()).await;
        }
    });
}

async fn swallow_panic(f: impl Future<Output = ()>) {
    let _ = AssertUnwindSafe(f).catch_unwind().await;
}
