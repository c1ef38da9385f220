//! Periodic liveness probe against the Lightning backend.

use crate::ln::LightningBackend;
use crate::worker;
use async_trait::async_trait;
use std::process;
use std::sync::Arc;
use std::time::Duration;

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);
const PROBE_INTERVAL: Duration = Duration::from_secs(60);

/// Spawns the watchdog. Once `kill_count` consecutive probes fail the
/// whole process is taken down; zero disables the kill path and only logs.
pub fn start(ln: Arc<dyn LightningBackend>, kill_count: u32) {
    worker::start(Watchdog {
        ln,
        counter: FailureCounter {
            failures: 0,
            kill_count,
        },
    });
}

struct Watchdog {
    ln: Arc<dyn LightningBackend>,
    counter: FailureCounter,
}

struct FailureCounter {
    failures: u32,
    kill_count: u32,
}

impl FailureCounter {
    /// Updates the consecutive-failure count; true means the process should
    /// terminate.
    fn observe(&mut self, success: bool) -> bool {
        if success {
            if self.failures >= 2 {
                log::info!(
                    "lnd connection reestablished after {} failed checks",
                    self.failures
                );
            }
            self.failures = 0;
            return false;
        }
        self.failures += 1;
        log::warn!("lnd unreachable ({} consecutive failures)", self.failures);
        self.kill_count > 0 && self.failures >= self.kill_count
    }
}

#[async_trait]
impl worker::Worker for Watchdog {
    async fn run(&mut self) {
        let probe = tokio::time::timeout(PROBE_TIMEOUT, self.ln.info()).await;
        let success = matches!(probe, Ok(Ok(_)));
        if self.counter.observe(success) {
            log::error!(
                "lnd unreachable {} times in a row, shutting down",
                self.counter.failures
            );
            process::exit(1);
        }
    }

    fn period() -> Duration {
        PROBE_INTERVAL
    }
}
