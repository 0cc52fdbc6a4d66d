//! WriteSerializer: one persistence operation at a time, in submission order.
//!
//! A single worker task owns the [`DurableStore`] exclusively.  Callers send
//! requests over an unbounded channel and get back a [`WriteTicket`] for their
//! own operation, so enqueueing never blocks.
//!
//! ```text
//! enqueue(A) ─┐
//! enqueue(B) ─┼─► [ mpsc queue ] ─► worker: save(A) ─► save(B) ─► load() ─► …
//! load()     ─┘                            │            │
//!                                      ticket A     ticket B
//! ```
//!
//! Guarantees:
//!
//! - Operation N+1 starts only after operation N finished, whether N
//!   succeeded or failed.
//! - A failed write is logged and reported to its own ticket only; the queue
//!   keeps going.
//! - Loads go through the same queue, so a load never races a write.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use confsync_core::AppConfig;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use super::store::{DocumentBackend, DurableStore, SharedCache, StoreError};

/// Error delivered to everyone waiting on a save.
///
/// This type is `Clone` because a single failed write is reported to every
/// caller whose request was coalesced into it.
#[derive(Debug, Clone, Error)]
pub enum SaveError {
    /// The backend rejected the write.
    #[error("failed to save config: {0}")]
    Persist(#[source] Arc<StoreError>),

    /// The writer task is gone; nothing was written.
    #[error("config writer has stopped")]
    WriterClosed,

    /// The sync engine is gone; the request was never scheduled.
    #[error("config sync engine has stopped")]
    EngineClosed,
}

enum StoreRequest {
    Load {
        reply: oneshot::Sender<AppConfig>,
    },
    Save {
        document: AppConfig,
        reply: oneshot::Sender<Result<(), SaveError>>,
    },
}

/// Completion handle for one enqueued write.
#[derive(Debug)]
#[must_use = "a write ticket reports the outcome of its write only when awaited"]
pub struct WriteTicket {
    reply: oneshot::Receiver<Result<(), SaveError>>,
}

impl Future for WriteTicket {
    type Output = Result<(), SaveError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.reply)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(SaveError::WriterClosed)))
    }
}

/// Handle to the single writer task.
///
/// Dropping the handle closes the queue; the worker finishes every request
/// already enqueued and then exits.
pub struct WriteSerializer {
    requests: mpsc::UnboundedSender<StoreRequest>,
    cache: SharedCache,
}

impl WriteSerializer {
    /// Moves `store` into a new worker task.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn<B: DocumentBackend>(store: DurableStore<B>) -> Self {
        let (requests, rx) = mpsc::unbounded_channel();
        let cache = store.cache();
        tokio::spawn(run_worker(store, rx));
        Self { requests, cache }
    }

    /// Queues a write of `document` behind every previously queued operation.
    pub fn enqueue(&self, document: AppConfig) -> WriteTicket {
        let (reply, rx) = oneshot::channel();
        if self
            .requests
            .send(StoreRequest::Save { document, reply })
            .is_err()
        {
            // The request (and its reply sender) is dropped here, so the
            // ticket resolves to `WriterClosed`.
            warn!("save enqueued after config writer stopped");
        }
        WriteTicket { reply: rx }
    }

    /// Loads the document through the queue.
    ///
    /// Never fails: if the worker is gone the cached document (or the
    /// defaults) is returned.
    pub async fn load(&self) -> AppConfig {
        let (reply, rx) = oneshot::channel();
        if self.requests.send(StoreRequest::Load { reply }).is_ok() {
            if let Ok(config) = rx.await {
                return config;
            }
        }
        warn!("config writer stopped, serving cached config");
        self.cached().unwrap_or_default()
    }

    /// Last successfully loaded or saved document, without I/O.
    pub fn cached(&self) -> Option<AppConfig> {
        self.cache.read().clone()
    }
}

async fn run_worker<B: DocumentBackend>(
    store: DurableStore<B>,
    mut requests: mpsc::UnboundedReceiver<StoreRequest>,
) {
    while let Some(request) = requests.recv().await {
        match request {
            StoreRequest::Load { reply } => {
                let config = store.load().await;
                let _ = reply.send(config);
            }
            StoreRequest::Save { document, reply } => {
                // The sync engine reports the failure at error level.
                let outcome = store.save(&document).await.map_err(|e| {
                    warn!(error = %e, "failed to save config");
                    SaveError::Persist(Arc::new(e))
                });
                // The waiter may have given up; the write happened regardless.
                let _ = reply.send(outcome);
            }
        }
    }
    debug!("config writer stopped");
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::storage::memory::MemoryBackend;
    use std::time::Duration;

    fn config_with_theme(theme: &str) -> AppConfig {
        AppConfig {
            theme: theme.to_string(),
            ..AppConfig::default()
        }
    }

    fn theme_of(json: &str) -> String {
        let value: serde_json::Value = serde_json::from_str(json).expect("valid json");
        value["theme"].as_str().expect("theme").to_string()
    }

    #[tokio::test(start_paused = true)]
    async fn test_writes_run_one_at_a_time_in_enqueue_order() {
        // Arrange: slow writes so overlapping would be observable
        let backend = MemoryBackend::new();
        backend.set_write_delay(Duration::from_millis(100));
        let writer = WriteSerializer::spawn(DurableStore::new(backend.clone()));

        // Act
        let first = writer.enqueue(config_with_theme("a"));
        let second = writer.enqueue(config_with_theme("b"));
        let third = writer.enqueue(config_with_theme("c"));
        let (r1, r2, r3) = tokio::join!(first, second, third);

        // Assert
        assert!(r1.is_ok() && r2.is_ok() && r3.is_ok());
        assert_eq!(backend.max_concurrent_writes(), 1);
        let themes: Vec<String> = backend.writes().iter().map(|w| theme_of(w)).collect();
        assert_eq!(themes, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_failed_write_does_not_stop_the_queue() {
        // Arrange
        let backend = MemoryBackend::new();
        backend.fail_next_writes(1);
        let writer = WriteSerializer::spawn(DurableStore::new(backend.clone()));

        // Act
        let failing = writer.enqueue(config_with_theme("lost"));
        let next = writer.enqueue(config_with_theme("kept"));

        // Assert
        assert!(matches!(failing.await, Err(SaveError::Persist(_))));
        assert!(next.await.is_ok());
        assert_eq!(backend.writes().len(), 1);
        assert_eq!(theme_of(&backend.contents().expect("contents")), "kept");
    }

    #[tokio::test]
    async fn test_load_after_write_observes_written_document() {
        // Arrange
        let backend = MemoryBackend::new();
        let writer = WriteSerializer::spawn(DurableStore::new(backend));

        // Act: the load is queued behind the write, not awaited in between
        let ticket = writer.enqueue(config_with_theme("dark"));
        let loaded = writer.load().await;

        // Assert
        assert!(ticket.await.is_ok());
        assert_eq!(loaded.theme, "dark");
        assert_eq!(writer.cached().expect("cached").theme, "dark");
    }

    #[tokio::test]
    async fn test_cache_is_empty_before_first_operation() {
        let writer = WriteSerializer::spawn(DurableStore::new(MemoryBackend::new()));
        assert!(writer.cached().is_none());
    }

    #[test]
    fn test_save_error_is_cloneable_and_keeps_source() {
        // Arrange
        let err = SaveError::Persist(Arc::new(StoreError::NoPlatformDataDir));

        // Act
        let cloned = err.clone();

        // Assert
        assert_eq!(err.to_string(), cloned.to_string());
        assert!(std::error::Error::source(&cloned).is_some());
    }
}
