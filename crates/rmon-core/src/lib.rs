//! # rmon-core - Core Domain Types
//!
//! Foundation crate for Result Monitor. Provides domain types, error
//! handling, the result decoding contract and logging setup.
//!
//! This crate has **zero internal dependencies** -- it only depends on external
//! crates (serde, chrono, thiserror, tracing).
//!
//! ## Public API
//!
//! ### Domain Types (`types`)
//! - [`ResultContext`] - Snapshot of a source: name, decoded result, progress
//! - [`AlgorithmResult`] - Decoded aggregate result
//! - [`LogEntry`], [`LogKind`], [`LogLine`] - Log lines and their origin
//! - [`OrderEvent`], [`AlgorithmStatus`] - Opaque payloads forwarded verbatim
//!
//! ### Decoding (`serializer`)
//! - [`ResultSerializer`] - Contract the session layer decodes through
//! - [`JsonResultSerializer`] - serde_json implementation
//!
//! ### Error Handling (`error`)
//! - [`Error`] - Error enum grouped by layer
//! - [`Result`] - Type alias for `std::result::Result<T, Error>`

pub mod error;
pub mod logging;
pub mod serializer;
pub mod types;

/// Prelude for common imports used throughout all Result Monitor crates
pub mod prelude {
    pub use super::error::{Error, Result};
    pub use tracing::{debug, error, info, trace, warn};
}

pub use error::{Error, Result};
pub use serializer::{JsonResultSerializer, ResultSerializer};
pub use types::{
    AlgorithmResult, AlgorithmStatus, LogEntry, LogKind, LogLine, OrderEvent, ResultContext,
};
