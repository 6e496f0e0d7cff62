//! The persistence gateway trait implemented by store backends

use async_trait::async_trait;

use crate::{
    schema::{AttributeTuple, DimensionSpec, FactRow, StarSchema, SurrogateKey},
    Error,
};

/// The persistence gateway the loader drives.
///
/// Implementations must uphold one ordering contract, and it is the only
/// one the loader depends on: [`insert_dimension_rows`] returns exactly one
/// key per submitted row, in submission order, retrieved from the insert
/// operation itself (`INSERT … RETURNING` or equivalent). There is no
/// "insert, then query the last N keys" round trip anywhere; a backend
/// that cannot return keys atomically from the insert cannot implement
/// this trait correctly.
///
/// Each bulk operation is atomic on its own. Run-level rollback is not
/// part of the gateway: a failed run keeps the batches it already
/// committed, and re-runs stay correct because dimension mapping is
/// idempotent.
///
/// [`insert_dimension_rows`]: StarStore::insert_dimension_rows
#[async_trait]
pub trait StarStore: Send + Sync {
    /// Fetches all existing rows of a dimension table as
    /// `(attribute tuple, key)` pairs. Used by the mapper pre-pass.
    async fn fetch_dimension(
        &self,
        spec: &DimensionSpec,
    ) -> Result<Vec<(AttributeTuple, SurrogateKey)>, Error>;

    /// Bulk-inserts dimension rows and returns the store-assigned keys,
    /// one per submitted row, in submission order.
    ///
    /// Submitting no rows is a no-op and returns an empty vector.
    async fn insert_dimension_rows(
        &self,
        spec: &DimensionSpec,
        rows: &[AttributeTuple],
    ) -> Result<Vec<SurrogateKey>, Error>;

    /// Bulk-inserts fact rows. Returns the number of rows inserted.
    async fn insert_fact_rows(&self, schema: &StarSchema, rows: &[FactRow]) -> Result<u64, Error>;

    /// Finalizes the current unit of work.
    ///
    /// Backends whose bulk operations are individually durable (each
    /// statement its own transaction) may treat this as a no-op.
    async fn commit(&self) -> Result<(), Error>;
}
