//! Batched per-row dimension and fact-row loading

use futures::{stream, StreamExt};
use tracing::instrument;
use warehouse_db::{AttributeTuple, DimensionRole, FactRow, Record, StarSchema, StarStore, SurrogateKey};

use crate::{mapper::DimensionMapper, Error};

/// Default number of source rows per batch.
pub const DEFAULT_BATCH_SIZE: usize = 10_000;

/// Default number of per-row dimension inserts in flight within one batch.
pub const DEFAULT_INSERT_WIDTH: usize = 4;

/// Result of one [`BatchLoader::insert_one_batch`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOutcome {
    /// Number of fact rows inserted by this call.
    pub rows_processed: usize,
    /// `true` if the batch sequence was already exhausted and no rows
    /// were processed. The expected terminal signal, not an error.
    pub exhausted: bool,
}

impl BatchOutcome {
    fn exhausted() -> Self {
        Self {
            rows_processed: 0,
            exhausted: true,
        }
    }
}

/// Drives one batch at a time through per-row dimension insertion and
/// fact-row insertion.
///
/// Batches are contiguous fixed-size slices of the source, produced in
/// order and consumed exactly once; the loader never restarts or
/// overlaps batches. Within one batch, per-row dimension inserts run
/// concurrently (bounded width) because they touch disjoint tables; the
/// keys they return are joined with the shared-dimension mapper only
/// after all of them complete.
///
/// Row-to-key alignment relies solely on the store's
/// insert-returning-keys contract: the Nth key returned for a batch
/// belongs to the Nth record of that batch.
#[derive(Debug)]
pub struct BatchLoader<'a, S> {
    store: &'a S,
    schema: &'a StarSchema,
    mapper: &'a DimensionMapper,
    records: &'a [Record],
    cursor: usize,
    batch_size: usize,
    insert_width: usize,
}

impl<'a, S: StarStore> BatchLoader<'a, S> {
    pub fn new(
        store: &'a S,
        schema: &'a StarSchema,
        mapper: &'a DimensionMapper,
        records: &'a [Record],
    ) -> Self {
        Self {
            store,
            schema,
            mapper,
            records,
            cursor: 0,
            batch_size: DEFAULT_BATCH_SIZE,
            insert_width: DEFAULT_INSERT_WIDTH,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_insert_width(mut self, insert_width: usize) -> Self {
        self.insert_width = insert_width.max(1);
        self
    }

    /// Total number of batches this source will produce.
    pub fn total_batches(&self) -> usize {
        self.records.len().div_ceil(self.batch_size)
    }

    pub fn is_exhausted(&self) -> bool {
        self.cursor >= self.records.len()
    }

    /// Processes the next batch: bulk-inserts every per-row dimension,
    /// joins the returned keys with the shared-dimension mappings, and
    /// bulk-inserts the resulting fact rows. When `commit` is set, the
    /// store's unit of work is finalized before returning.
    ///
    /// Returns an exhausted [`BatchOutcome`] once no batches remain.
    #[instrument(skip_all, err, fields(batch_start = self.cursor))]
    pub async fn insert_one_batch(&mut self, commit: bool) -> Result<BatchOutcome, Error> {
        let Some(batch) = self.next_batch() else {
            return Ok(BatchOutcome::exhausted());
        };

        let store = self.store;
        let key_sets = {
            let per_row: Vec<(usize, _)> = self
                .schema
                .dimensions()
                .iter()
                .enumerate()
                .filter(|(_, spec)| !spec.is_shared())
                .collect();

            let mut key_sets: Vec<Option<Vec<SurrogateKey>>> =
                vec![None; self.schema.dimensions().len()];
            let mut inserts = stream::iter(per_row.into_iter().map(|(idx, spec)| async move {
                let tuples: Vec<AttributeTuple> =
                    batch.iter().map(|record| spec.tuple(record)).collect();
                let keys = store.insert_dimension_rows(spec, &tuples).await?;
                // A backend breaking the one-key-per-row contract must
                // fail here, not as an index panic at the fact join.
                if keys.len() != tuples.len() {
                    return Err(warehouse_db::Error::KeyCountMismatch {
                        table: spec.table().to_owned(),
                        submitted: tuples.len(),
                        returned: keys.len(),
                    }
                    .into());
                }
                Ok::<_, Error>((idx, keys))
            }))
            .buffer_unordered(self.insert_width);

            while let Some(result) = inserts.next().await {
                let (idx, keys) = result?;
                key_sets[idx] = Some(keys);
            }
            key_sets
        };

        let mut facts = Vec::with_capacity(batch.len());
        for (row_idx, record) in batch.iter().enumerate() {
            let keys = self
                .schema
                .dimensions()
                .iter()
                .enumerate()
                .map(|(dim_idx, spec)| match spec.role() {
                    DimensionRole::Shared => self.mapper.resolve(record, spec),
                    DimensionRole::PerRow => key_sets[dim_idx]
                        .as_ref()
                        .map(|batch_keys| batch_keys[row_idx]),
                })
                .collect();
            facts.push(FactRow::new(keys));
        }

        self.store.insert_fact_rows(self.schema, &facts).await?;
        if commit {
            self.store.commit().await?;
        }

        tracing::debug!(rows = batch.len(), "batch inserted");
        Ok(BatchOutcome {
            rows_processed: batch.len(),
            exhausted: false,
        })
    }

    fn next_batch(&mut self) -> Option<&'a [Record]> {
        if self.cursor >= self.records.len() {
            return None;
        }
        let end = (self.cursor + self.batch_size).min(self.records.len());
        let batch = &self.records[self.cursor..end];
        self.cursor = end;
        Some(batch)
    }
}
