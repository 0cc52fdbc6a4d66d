//! Application layer use cases for the configuration host.
//!
//! # What is the "application" layer? (for beginners)
//!
//! In Clean Architecture the *application* layer sits between the domain
//! (pure data and rules in `confsync_core`) and the infrastructure (files,
//! logging backends, OS integration).
//!
//! Use cases in this layer:
//!
//! - **Orchestrate** domain objects to fulfil a user goal (e.g., "persist the
//!   settings the user just edited, but not on every keystroke").
//! - **Depend on abstractions** (traits) rather than concrete implementations,
//!   so the storage medium or the error reporter can be swapped in tests.
//! - **Contain no direct file system access**.
//!
//! # Sub-modules
//!
//! - **`store`** – The `DocumentBackend` contract and the `DurableStore`
//!   that loads with default merging and saves pretty-printed JSON.
//!
//! - **`write_serializer`** – Single-worker actor that runs store operations
//!   strictly one at a time, in arrival order.
//!
//! - **`sync_engine`** – Debounced save coordinator: optimistic view,
//!   coalesced bursts, rollback on failure, flush on shutdown.
//!
//! - **`event_log`** – Bounded recent-activity window that escalates errors
//!   to an `ErrorReporter`.

pub mod event_log;
pub mod store;
pub mod sync_engine;
pub mod write_serializer;
