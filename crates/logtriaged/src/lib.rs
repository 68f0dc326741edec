//! LogTriage worker daemon internals.
//!
//! The binary wires these together: the Postgres result selector, the
//! content-addressed log cache, the subprocess classification adapter,
//! the processed-set tracker, the spool publisher and the worker loop.

pub mod cache;
pub mod engine;
pub mod selector;
pub mod spool;
pub mod tracker;
pub mod worker;

// Re-export key types
pub use cache::LogCache;
pub use engine::CommandClassifier;
pub use selector::PgResultSource;
pub use spool::Spool;
pub use tracker::ProcessedSet;
pub use worker::{PassStats, Worker};
