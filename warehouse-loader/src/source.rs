//! The tabular source collaborator

use async_trait::async_trait;
use warehouse_db::Record;

/// Error returned by a tabular source.
#[derive(Debug, thiserror::Error)]
#[error("Failed to load tabular source: {0}")]
pub struct SourceError(#[source] pub Box<dyn std::error::Error + Send + Sync>);

impl SourceError {
    pub fn new(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self(err.into())
    }
}

/// Supplies the normalized records of one load run.
///
/// Reading and normalizing the underlying file is not this crate's
/// concern; implementations hand over records that are already
/// column-normalized (lowercase, whitespace replaced with underscores)
/// with missing values as nulls, which is what [`Record::from_pairs`]
/// produces.
#[async_trait]
pub trait TabularSource: Send + Sync {
    /// Loads the full source snapshot for one run.
    async fn load(&self) -> Result<Vec<Record>, SourceError>;
}

/// A source that is already materialized in memory.
#[async_trait]
impl TabularSource for Vec<Record> {
    async fn load(&self) -> Result<Vec<Record>, SourceError> {
        Ok(self.clone())
    }
}
