//! Background service: one thread owns the cache and applies commands in
//! arrival order, flushing the snapshot on a fixed interval.

use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use tracing::{error, info, warn};

use crate::engine::WordCountCache;
use crate::error::CacheError;
use crate::exclusion::ExclusionConfig;
use crate::persist::FlushOutcome;
use crate::query::WordCounts;
use crate::source::{DocumentEvent, DocumentSource};

/// Work items accepted by the service thread.
#[derive(Debug, Clone)]
pub enum Command {
    Event(DocumentEvent),
    /// Startup pass; an empty first listing is retried once after the delay.
    InitialReconcile(Duration),
    Reconcile,
    SetConfig(ExclusionConfig),
    Flush,
    /// Flush and stop. Commands queued after this are dropped.
    Shutdown,
}

/// Shortest flush interval; smaller values are raised to this.
pub const MIN_FLUSH_INTERVAL: Duration = Duration::from_millis(100);

pub struct Service;

impl Service {
    /// Move `cache` onto a worker thread. The worker flushes when the store is
    /// dirty every `flush_interval` (at least [`MIN_FLUSH_INTERVAL`]), and
    /// once more before it exits.
    pub fn spawn<S>(cache: WordCountCache<S>, flush_interval: Duration) -> ServiceHandle
    where
        S: DocumentSource + Send + 'static,
    {
        let flush_interval = flush_interval.max(MIN_FLUSH_INTERVAL);
        let (tx, rx) = mpsc::channel::<Command>();
        let query = cache.query();

        let join = std::thread::spawn(move || {
            let mut cache = cache;
            let mut last_flush = Instant::now();
            info!(flush_secs = flush_interval.as_secs_f64(), "Cache service started");

            loop {
                let wait = flush_interval.saturating_sub(last_flush.elapsed());
                match rx.recv_timeout(wait) {
                    Ok(Command::Event(event)) => {
                        cache.handle_event(&event);
                    }
                    Ok(Command::InitialReconcile(retry_delay)) => {
                        if let Err(e) = cache.initial_reconcile(retry_delay) {
                            warn!(error = %e, "Startup reconciliation failed, serving cached counts");
                        }
                    }
                    Ok(Command::Reconcile) => {
                        if let Err(e) = cache.reconcile() {
                            warn!(error = %e, "Reconciliation failed, keeping cached counts");
                        }
                    }
                    Ok(Command::SetConfig(config)) => {
                        if let Err(e) = cache.set_config(config) {
                            warn!(error = %e, "Reconciliation after settings change failed");
                        }
                    }
                    Ok(Command::Flush) => {
                        cache.flush();
                        last_flush = Instant::now();
                    }
                    Ok(Command::Shutdown) => {
                        info!("Shutdown requested");
                        break;
                    }
                    Err(RecvTimeoutError::Timeout) => {}
                    Err(RecvTimeoutError::Disconnected) => {
                        info!("Command channel disconnected, stopping");
                        break;
                    }
                }

                if last_flush.elapsed() >= flush_interval {
                    cache.flush();
                    last_flush = Instant::now();
                }
            }

            let outcome = cache.shutdown();
            if outcome == FlushOutcome::Failed {
                error!("Final snapshot flush failed, changes since the last flush are lost");
            }
            outcome
        });

        ServiceHandle { sender: tx, query, join }
    }
}

/// Handle to a running service. Dropping it disconnects the channel, which
/// also stops the worker after a final flush.
pub struct ServiceHandle {
    sender: Sender<Command>,
    query: WordCounts,
    join: JoinHandle<FlushOutcome>,
}

impl ServiceHandle {
    pub fn send(&self, command: Command) -> Result<(), CacheError> {
        self.sender.send(command).map_err(|_| CacheError::ServiceStopped)
    }

    /// A sender for producers on other threads (watchers, signal handlers).
    pub fn sender(&self) -> Sender<Command> {
        self.sender.clone()
    }

    pub fn query(&self) -> WordCounts {
        self.query.clone()
    }

    /// Request shutdown and wait for the final flush.
    pub fn shutdown(self) -> Result<FlushOutcome, CacheError> {
        // The worker may already be gone; joining reports how it ended.
        let _ = self.sender.send(Command::Shutdown);
        self.join.join().map_err(|_| CacheError::ServiceStopped)
    }
}
