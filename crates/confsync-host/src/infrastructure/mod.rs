//! Infrastructure layer for the configuration host.
//!
//! Contains OS-facing adapters: the JSON file backend and platform paths,
//! the `tracing` subscriber and event log bridge, the error report spool,
//! login-item registration, host settings, and the UI command bridge.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `confsync_core`, but MUST NOT be imported by the `application` layer
//! (tests excepted).

pub mod autostart;
pub mod logging;
pub mod reporting;
pub mod settings;
pub mod storage;
pub mod ui_bridge;
