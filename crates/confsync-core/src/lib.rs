//! # confsync-core
//!
//! Shared library for confsync containing the configuration document schema,
//! the default-merging rules applied when a document is read back from disk,
//! and the bounded diagnostics log used as context for error reports.
//!
//! This crate has zero dependencies on the file system, the async runtime, or
//! any UI framework.  Everything here is plain data plus pure functions, which
//! keeps it trivially testable.
//!
//! # Architecture overview (for beginners)
//!
//! The desktop shell keeps exactly one configuration document per running
//! instance.  The UI edits it in rapid bursts (every toggle, every keystroke
//! in a text field) and the host process is responsible for persisting those
//! edits without hammering the disk.
//!
//! This crate (`confsync-core`) is the shared foundation.  It defines:
//!
//! - **`document`** – What the configuration looks like.  [`AppConfig`] is
//!   always fully populated; [`merge_with_defaults`] backfills anything an
//!   older (or hand-edited) file on disk is missing.
//!
//! - **`diagnostics`** – The recent-activity window.  [`RecentLog`] is a ring
//!   buffer bounded by both age and count, and [`ErrorReport`] is the payload
//!   handed to an external error reporter together with a snapshot of it.

pub mod diagnostics;
pub mod document;

// Re-export the most-used types at the crate root so callers can write
// `confsync_core::AppConfig` instead of `confsync_core::document::config::AppConfig`.
pub use diagnostics::entry::{ErrorDetails, LogEntry, LogLevel};
pub use diagnostics::recent_log::{RecentLog, DEFAULT_LOG_CAPACITY, DEFAULT_LOG_WINDOW};
pub use diagnostics::report::{redact_user_paths, ErrorReport};
pub use document::config::{AppConfig, ProxyConfig, UpstreamProxyConfig};
pub use document::merge::{merge_with_defaults, parse_document, MergeError};
