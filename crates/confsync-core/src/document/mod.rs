//! The configuration document and the rules for reading it back from disk.
//!
//! - **`config`** – The schema: [`config::AppConfig`] and its nested proxy
//!   records, each with a fixed default.
//! - **`merge`** – Overlays whatever JSON was found on disk onto the default
//!   document so the result is always fully populated.

pub mod config;
pub mod merge;
