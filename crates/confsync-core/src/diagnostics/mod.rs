//! Recent-activity diagnostics.
//!
//! - **`entry`**      – A single rendered log line and its severity.
//! - **`recent_log`** – Ring buffer bounded by age and by count.
//! - **`report`**     – Payload handed to an external error reporter, plus the
//!   scrubbing applied to it before it leaves the process.

pub mod entry;
pub mod recent_log;
pub mod report;
