//! In-memory document backend for unit and integration testing.
//!
//! Lets tests inject read and write failures, slow down writes, and inspect
//! every successful write without touching the file system.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::application::store::{DocumentBackend, StoreError};

const MEMORY_LOCATION: &str = "memory://gui_config.json";

#[derive(Debug, Default)]
struct MemoryState {
    contents: Option<String>,
    writes: Vec<String>,
    attempts: usize,
    failing_writes: usize,
    fail_reads: bool,
    write_delay: Option<Duration>,
    active_writes: usize,
    max_concurrent_writes: usize,
}

/// A [`DocumentBackend`] that keeps the document in memory.
///
/// Clones share the same state, so a test can keep one clone for inspection
/// while the store owns another.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a backend that already holds `contents`.
    pub fn with_contents(contents: &str) -> Self {
        let backend = Self::new();
        backend.state.lock().contents = Some(contents.to_string());
        backend
    }

    /// Makes the next `count` writes fail with an I/O error.
    pub fn fail_next_writes(&self, count: usize) {
        self.state.lock().failing_writes = count;
    }

    /// Makes every read fail with an I/O error while `fail` is set.
    pub fn fail_reads(&self, fail: bool) {
        self.state.lock().fail_reads = fail;
    }

    /// Delays every write by `delay` before it completes.
    pub fn set_write_delay(&self, delay: Duration) {
        self.state.lock().write_delay = Some(delay);
    }

    /// Currently persisted text.
    pub fn contents(&self) -> Option<String> {
        self.state.lock().contents.clone()
    }

    /// Every successfully written text, oldest first.
    pub fn writes(&self) -> Vec<String> {
        self.state.lock().writes.clone()
    }

    /// Number of writes attempted, including failed ones.
    pub fn write_attempts(&self) -> usize {
        self.state.lock().attempts
    }

    /// Highest number of writes that were ever in progress at the same time.
    pub fn max_concurrent_writes(&self) -> usize {
        self.state.lock().max_concurrent_writes
    }
}

fn injected(what: &str) -> StoreError {
    StoreError::Io {
        path: MEMORY_LOCATION.into(),
        source: std::io::Error::new(std::io::ErrorKind::Other, format!("injected {what} failure")),
    }
}

#[async_trait]
impl DocumentBackend for MemoryBackend {
    async fn read(&self) -> Result<Option<String>, StoreError> {
        let state = self.state.lock();
        if state.fail_reads {
            return Err(injected("read"));
        }
        Ok(state.contents.clone())
    }

    async fn write(&self, contents: &str) -> Result<(), StoreError> {
        let delay = {
            let mut state = self.state.lock();
            state.attempts += 1;
            state.active_writes += 1;
            state.max_concurrent_writes = state.max_concurrent_writes.max(state.active_writes);
            state.write_delay
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock();
        state.active_writes -= 1;
        if state.failing_writes > 0 {
            state.failing_writes -= 1;
            return Err(injected("write"));
        }
        state.contents = Some(contents.to_string());
        state.writes.push(contents.to_string());
        Ok(())
    }

    fn location(&self) -> String {
        MEMORY_LOCATION.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_backend_starts_empty() {
        let backend = MemoryBackend::new();
        assert_eq!(backend.read().await.expect("read"), None);
        assert!(backend.writes().is_empty());
    }

    #[tokio::test]
    async fn test_injected_write_failure_is_consumed_once() {
        // Arrange
        let backend = MemoryBackend::new();
        backend.fail_next_writes(1);

        // Act
        let first = backend.write("a").await;
        let second = backend.write("b").await;

        // Assert
        assert!(first.is_err());
        assert!(second.is_ok());
        assert_eq!(backend.writes(), vec!["b".to_string()]);
        assert_eq!(backend.write_attempts(), 2);
    }
}
