//! Storage infrastructure: configuration document persistence.
//!
//! This module provides thin adapters between the application and the
//! persistent medium, implementing
//! [`crate::application::store::DocumentBackend`]:
//!
//! - **`json_file`** – The production backend.  Writes `gui_config.json` in
//!   the platform-appropriate application-data directory, replacing the whole
//!   file atomically on every save.
//! - **`memory`** – An in-memory backend with failure injection.  Compiled
//!   only for unit tests.

pub mod json_file;
#[cfg(test)]
pub mod memory;
