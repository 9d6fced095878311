//! Result Monitor Library
//!
//! Command-line front end for following algorithm result files. The
//! session machinery lives in `rmon-app`; this crate plays the owner
//! context and renders events as NDJSON.

pub mod headless;

// Re-export main entry points
pub use headless::runner::{monitor, run_headless, HeadlessOptions};
pub use headless::{HeadlessEvent, NdjsonHandler};
