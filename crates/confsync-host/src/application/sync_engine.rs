//! SyncEngine: optimistic view, debounced persistence, per-request completion.
//!
//! The UI calls [`SyncEngine::request_save`] on every edit.  The engine makes
//! the new document visible to readers immediately, coalesces edits that
//! arrive close together into a single write, and hands every caller a
//! [`SaveHandle`] that resolves once the write covering its edit settled.
//! On success the handle yields a [`SaveReceipt`] naming the document that
//! was actually written, which may be a later edit of the same burst.
//!
//! # State machine (for beginners)
//!
//! ```text
//!              request_save                 timer fires
//!   Idle ─────────────────────► Pending ───────────────────► Flushing
//!    ▲                          │  ▲  │                          │
//!    │                          │  └──┘ request_save:            │
//!    │                          │       replace doc, add waiter, │
//!    │                          │       re-arm timer             │
//!    └──────────────────────────┴────────────────────────────────┘
//!                               write settled (ok or err)
//! ```
//!
//! - `Idle`: nothing pending.
//! - `Pending`: one [`Burst`] exists and the debounce timer is armed.
//! - `Flushing`: a burst was handed to the [`WriteSerializer`].  A new
//!   request during `Flushing` starts a fresh `Pending` burst right away, so
//!   the two overlap.
//!
//! # Who owns what
//!
//! The burst and the queue of in-flight writes belong to a single actor task.
//! The reader-facing view (current document, last known-good document and a
//! revision counter) sits behind a `parking_lot::Mutex` so `request_save` can
//! update it synchronously without awaiting anything.
//!
//! The actor settles in-flight writes strictly in the order they were
//! enqueued, which is also the order the writer completes them in.  That
//! keeps the known-good bookkeeping correct when several bursts are in flight.
//!
//! # Failure handling
//!
//! When a write fails and no newer edit has been requested since, the view is
//! rolled back to the last known-good document.  If there is no known-good
//! document (nothing was ever loaded or saved) the view becomes
//! [`ConfigView::Stale`] and readers should call [`SyncEngine::load`].

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use confsync_core::AppConfig;
use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tracing::{debug, error, info, trace, warn};

use super::write_serializer::{SaveError, WriteSerializer, WriteTicket};

/// Delay after the last request of a burst before it is written.
pub const DEFAULT_SAVE_DEBOUNCE: Duration = Duration::from_millis(400);

/// What readers currently see.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigView {
    /// The most recently requested document (possibly not yet persisted).
    Current(Arc<AppConfig>),
    /// A write failed with no known-good document to fall back to; the value
    /// must be fetched again with [`SyncEngine::load`].
    Stale,
}

impl ConfigView {
    pub fn document(&self) -> Option<&AppConfig> {
        match self {
            ConfigView::Current(config) => Some(config),
            ConfigView::Stale => None,
        }
    }

    pub fn is_stale(&self) -> bool {
        matches!(self, ConfigView::Stale)
    }
}

#[derive(Default)]
struct ViewState {
    current: Option<Arc<AppConfig>>,
    known_good: Option<Arc<AppConfig>>,
    /// Bumped on every `request_save`; lets settlement tell whether a newer
    /// edit superseded the burst it is settling.
    revision: u64,
}

struct Shared {
    view: Mutex<ViewState>,
    flushing: AtomicUsize,
}

type Waiter = oneshot::Sender<Result<SaveReceipt, SaveError>>;

/// What a successful save handle resolves with.
///
/// All handles of one burst receive the same `document` and `previous`.
/// Exactly one of them, the burst's last request, is the one whose own
/// document was written.
#[derive(Debug, Clone)]
pub struct SaveReceipt {
    document: Arc<AppConfig>,
    previous: Option<Arc<AppConfig>>,
    own_document_written: bool,
}

impl SaveReceipt {
    /// The document now on disk.
    pub fn document(&self) -> &AppConfig {
        &self.document
    }

    /// The known-good document this write replaced, if there was one.
    pub fn previous(&self) -> Option<&AppConfig> {
        self.previous.as_deref()
    }

    /// Whether this request was the last of its burst, so the written
    /// document is the one it asked for.  Effects of a write should be
    /// applied only through this receipt.
    pub fn own_document_written(&self) -> bool {
        self.own_document_written
    }
}

enum Command {
    Save {
        document: AppConfig,
        revision: u64,
        waiter: Waiter,
    },
    Shutdown {
        done: oneshot::Sender<()>,
    },
}

/// Completion handle returned by [`SyncEngine::request_save`].
///
/// Resolves with the outcome of the write that covered this request.  Every
/// handle of one burst resolves with the same outcome.
#[derive(Debug)]
#[must_use = "a save handle reports the outcome of the save only when awaited"]
pub struct SaveHandle {
    outcome: oneshot::Receiver<Result<SaveReceipt, SaveError>>,
}

impl Future for SaveHandle {
    type Output = Result<SaveReceipt, SaveError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.outcome)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(SaveError::EngineClosed)))
    }
}

/// The configuration synchronization engine.
///
/// One instance owns one logical document.  Create it with
/// [`SyncEngine::new`] inside a Tokio runtime.
pub struct SyncEngine {
    commands: mpsc::UnboundedSender<Command>,
    shared: Arc<Shared>,
    writer: Arc<WriteSerializer>,
}

impl SyncEngine {
    /// Creates an engine with the default debounce window.
    pub fn new(writer: WriteSerializer) -> Self {
        Self::with_debounce(writer, DEFAULT_SAVE_DEBOUNCE)
    }

    /// Creates an engine with a custom debounce window.
    pub fn with_debounce(writer: WriteSerializer, debounce: Duration) -> Self {
        let (commands, rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared {
            view: Mutex::new(ViewState::default()),
            flushing: AtomicUsize::new(0),
        });
        let writer = Arc::new(writer);

        let actor = EngineActor {
            commands: rx,
            shared: Arc::clone(&shared),
            writer: Arc::clone(&writer),
            debounce,
            phase: Phase::Idle,
            in_flight: VecDeque::new(),
        };
        tokio::spawn(actor.run());

        Self {
            commands,
            shared,
            writer,
        }
    }

    /// Loads the persisted document and makes it the known-good document.
    ///
    /// The view is replaced too, unless an edit was requested while the load
    /// was in progress.  Never fails; see [`super::store::DurableStore::load`].
    pub async fn load(&self) -> AppConfig {
        let started_at = self.shared.view.lock().revision;
        let config = Arc::new(self.writer.load().await);

        let mut view = self.shared.view.lock();
        view.known_good = Some(Arc::clone(&config));
        if view.revision == started_at {
            view.current = Some(Arc::clone(&config));
        }
        drop(view);

        (*config).clone()
    }

    /// Requests that `document` be persisted.
    ///
    /// The view is updated before this returns.  The write itself happens
    /// once no further request arrived for the debounce window.
    pub fn request_save(&self, document: AppConfig) -> SaveHandle {
        let (waiter, outcome) = oneshot::channel();

        let revision = {
            let mut view = self.shared.view.lock();
            view.revision += 1;
            view.current = Some(Arc::new(document.clone()));
            view.revision
        };

        let command = Command::Save {
            document,
            revision,
            waiter,
        };
        if self.commands.send(command).is_err() {
            warn!("save requested after config sync engine stopped");
            let mut view = self.shared.view.lock();
            if view.revision == revision {
                view.current = view.known_good.clone();
            }
        }

        SaveHandle { outcome }
    }

    /// What readers currently see.
    pub fn view(&self) -> ConfigView {
        match &self.shared.view.lock().current {
            Some(config) => ConfigView::Current(Arc::clone(config)),
            None => ConfigView::Stale,
        }
    }

    /// Last document confirmed persisted (or loaded).
    pub fn known_good(&self) -> Option<Arc<AppConfig>> {
        self.shared.view.lock().known_good.clone()
    }

    /// Whether a write is currently in flight.
    pub fn is_saving(&self) -> bool {
        self.shared.flushing.load(Ordering::SeqCst) > 0
    }

    /// Flushes any pending burst immediately and waits for every in-flight
    /// write to settle.  Requests made afterwards fail with
    /// [`SaveError::EngineClosed`].
    pub async fn shutdown(&self) {
        let (done, finished) = oneshot::channel();
        if self.commands.send(Command::Shutdown { done }).is_ok() {
            let _ = finished.await;
        }
    }
}

// ── Actor ─────────────────────────────────────────────────────────────────────

/// Save requests coalesced into one write.
struct Burst {
    document: AppConfig,
    revision: u64,
    waiters: Vec<Waiter>,
}

enum Phase {
    Idle,
    Pending { burst: Burst, deadline: Instant },
}

impl Phase {
    fn deadline(&self) -> Option<Instant> {
        match self {
            Phase::Idle => None,
            Phase::Pending { deadline, .. } => Some(*deadline),
        }
    }
}

/// A burst whose write has been enqueued but not yet settled.
struct InFlight {
    ticket: WriteTicket,
    document: Arc<AppConfig>,
    revision: u64,
    waiters: Vec<Waiter>,
}

struct EngineActor {
    commands: mpsc::UnboundedReceiver<Command>,
    shared: Arc<Shared>,
    writer: Arc<WriteSerializer>,
    debounce: Duration,
    phase: Phase,
    in_flight: VecDeque<InFlight>,
}

impl EngineActor {
    async fn run(mut self) {
        loop {
            let deadline = self.phase.deadline();
            tokio::select! {
                biased;

                command = self.commands.recv() => match command {
                    Some(Command::Save { document, revision, waiter }) => {
                        self.on_request(document, revision, waiter);
                    }
                    Some(Command::Shutdown { done }) => {
                        self.drain().await;
                        let _ = done.send(());
                        return;
                    }
                    None => {
                        self.drain().await;
                        return;
                    }
                },
                _ = sleep_until(deadline) => self.flush(),
                outcome = next_settled(&mut self.in_flight) => self.settle(outcome),
            }
        }
    }

    fn on_request(&mut self, document: AppConfig, revision: u64, waiter: Waiter) {
        let rearmed = Instant::now() + self.debounce;
        match &mut self.phase {
            Phase::Pending { burst, deadline } => {
                burst.document = document;
                burst.revision = revision;
                burst.waiters.push(waiter);
                *deadline = rearmed;
                trace!(waiters = burst.waiters.len(), "save request joined pending burst");
            }
            Phase::Idle => {
                self.phase = Phase::Pending {
                    burst: Burst {
                        document,
                        revision,
                        waiters: vec![waiter],
                    },
                    deadline: rearmed,
                };
                debug!("save burst started");
            }
        }
    }

    /// Pending → Flushing: detaches the burst and hands it to the writer.
    fn flush(&mut self) {
        let Phase::Pending { burst, .. } = std::mem::replace(&mut self.phase, Phase::Idle) else {
            return;
        };

        let document = Arc::new(burst.document);
        let ticket = self.writer.enqueue((*document).clone());
        self.shared.flushing.fetch_add(1, Ordering::SeqCst);
        debug!(waiters = burst.waiters.len(), "flushing save burst");

        self.in_flight.push_back(InFlight {
            ticket,
            document,
            revision: burst.revision,
            waiters: burst.waiters,
        });
    }

    /// Applies the outcome of the oldest in-flight write and notifies its
    /// waiters.
    fn settle(&mut self, outcome: Result<(), SaveError>) {
        let Some(flight) = self.in_flight.pop_front() else {
            return;
        };
        self.shared.flushing.fetch_sub(1, Ordering::SeqCst);

        let previous = {
            let mut view = self.shared.view.lock();
            let superseded = view.revision != flight.revision;
            match &outcome {
                Ok(()) => {
                    if !superseded {
                        view.current = Some(Arc::clone(&flight.document));
                    }
                    view.known_good.replace(Arc::clone(&flight.document))
                }
                Err(_) => {
                    if !superseded {
                        // `None` here means there is nothing to fall back to: stale.
                        view.current = view.known_good.clone();
                    }
                    None
                }
            }
        };

        match &outcome {
            Ok(()) => info!(waiters = flight.waiters.len(), "settings saved"),
            Err(e) => {
                let cause: &(dyn std::error::Error + 'static) = e;
                error!(
                    error = cause,
                    waiters = flight.waiters.len(),
                    "error saving settings"
                );
            }
        }

        let last = flight.waiters.len().saturating_sub(1);
        for (index, waiter) in flight.waiters.into_iter().enumerate() {
            let result = outcome.clone().map(|()| SaveReceipt {
                document: Arc::clone(&flight.document),
                previous: previous.clone(),
                own_document_written: index == last,
            });
            let _ = waiter.send(result);
        }
    }

    /// Shutdown path: absorbs requests that are already queued, flushes the
    /// pending burst without waiting for the timer, and settles every write.
    async fn drain(&mut self) {
        self.commands.close();
        while let Ok(command) = self.commands.try_recv() {
            match command {
                Command::Save {
                    document,
                    revision,
                    waiter,
                } => self.on_request(document, revision, waiter),
                Command::Shutdown { done } => {
                    let _ = done.send(());
                }
            }
        }

        if matches!(self.phase, Phase::Pending { .. }) {
            info!("flushing pending settings before shutdown");
            self.flush();
        }

        while !self.in_flight.is_empty() {
            let outcome = next_settled(&mut self.in_flight).await;
            self.settle(outcome);
        }
        debug!("config sync engine stopped");
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Waits for the oldest in-flight write; never resolves when none is queued.
async fn next_settled(in_flight: &mut VecDeque<InFlight>) -> Result<(), SaveError> {
    match in_flight.front_mut() {
        Some(flight) => (&mut flight.ticket).await,
        None => std::future::pending().await,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
