//! Persistence gateway for the star-schema warehouse.
//!
//! This crate owns the data model of the warehouse (scalar values,
//! source records, dimension specs, surrogate keys) and the
//! [`StarStore`] gateway the loader drives: bulk-insert-returning-keys,
//! dimension pre-pass queries, and fact-row inserts. [`PgStarStore`] is
//! the PostgreSQL implementation; an in-memory implementation is
//! available behind the `mem-store` feature for tests.

/// Date and time types used by [`Scalar`], re-exported for consumers that
/// do not depend on sqlx themselves.
pub use sqlx::types::chrono;
use thiserror::Error as ThisError;

mod conn;
#[cfg(any(test, feature = "mem-store"))]
pub mod mem;
mod pg;
mod record;
mod schema;
mod store;
mod value;

#[cfg(any(test, feature = "mem-store"))]
pub use self::mem::MemStore;
pub use self::{
    conn::{ConnError, DbConnPool},
    pg::PgStarStore,
    record::{normalize_column_name, Record},
    schema::{
        AttributeTuple, ColumnDef, DimensionRole, DimensionSpec, FactRow, StarSchema,
        SurrogateKey, KEY_COLUMN,
    },
    store::StarStore,
    value::{Scalar, ScalarType},
};

/// Errors surfaced by store backends.
#[derive(Debug, ThisError)]
pub enum Error {
    /// Error connecting to the warehouse DB.
    #[error("Error connecting to warehouse db: {0}")]
    ConnectionError(#[source] sqlx::Error),

    /// Error executing a database query.
    #[error("Error executing database query: {0}")]
    DbError(#[from] sqlx::Error),

    /// The store rejected an insert, typically a constraint violation.
    #[error("Insert rejected by table {table}: {reason}")]
    InsertRejected { table: String, reason: String },

    /// The store returned a different number of keys than rows submitted.
    ///
    /// This breaks the row-to-key alignment the fact loader depends on,
    /// so it is surfaced as a hard error instead of being reconciled.
    #[error("Table {table} returned {returned} keys for {submitted} submitted rows")]
    KeyCountMismatch {
        table: String,
        submitted: usize,
        returned: usize,
    },
}

impl From<ConnError> for Error {
    fn from(err: ConnError) -> Self {
        match err {
            ConnError::ConnectionError(err) => Error::ConnectionError(err),
        }
    }
}
