//! Incremental star-schema loader.
//!
//! Loads a flat tabular dataset into a star-schema warehouse through a
//! [`StarStore`](warehouse_db::StarStore) gateway:
//!
//! - [`DimensionMapper`] deduplicates shared dimensions and assigns
//!   stable surrogate keys, idempotently across overlapping runs.
//! - [`BatchLoader`] drives fixed-size batches through per-row dimension
//!   inserts and fact-row inserts, joining freshly assigned keys with the
//!   mapper's keys.
//! - [`JobManager`] owns one end-to-end run and exposes polled progress
//!   through [`JobState`]; [`RunLock`] serializes administrative
//!   operations across the process.
//!
//! All state is caller-owned: construct a [`JobManager`] once and pass it
//! where it is needed. There are no process-wide singletons.

mod batch;
pub mod catalog;
mod config;
mod job;
mod lock;
mod logging;
mod mapper;
mod source;

pub use self::{
    batch::{BatchLoader, BatchOutcome, DEFAULT_BATCH_SIZE, DEFAULT_INSERT_WIDTH},
    config::{ConfigError, LoaderConfig},
    job::{JobManager, JobState},
    lock::RunLock,
    logging::register_logger,
    mapper::{DimensionMapper, DimensionMapping},
    source::{SourceError, TabularSource},
};

/// Errors surfaced by a load run.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The persistence gateway failed.
    #[error("Warehouse store error: {0}")]
    Store(#[from] warehouse_db::Error),

    /// The tabular source failed to load.
    #[error(transparent)]
    Source(#[from] SourceError),

    /// A run was started while another run was already active.
    ///
    /// The run lock normally prevents this; the job manager also refuses
    /// on its own because it is not reentrant.
    #[error("A load job is already running")]
    AlreadyRunning,
}
