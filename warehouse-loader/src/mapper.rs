//! Shared-dimension deduplication and surrogate key mapping

use std::collections::{HashMap, HashSet};

use tracing::instrument;
use warehouse_db::{AttributeTuple, DimensionSpec, Record, StarSchema, StarStore, SurrogateKey};

use crate::Error;

/// The attribute-tuple → surrogate-key mapping for one shared dimension.
///
/// Built once per run as the union of rows already persisted and the new
/// distinct tuples found in the source. All-null tuples are never
/// inserted and never mapped.
#[derive(Debug, Default)]
pub struct DimensionMapping {
    keys: HashMap<AttributeTuple, SurrogateKey>,
}

impl DimensionMapping {
    /// Builds the mapping for one shared dimension.
    ///
    /// Existing rows are fetched first and never re-inserted, so repeated
    /// runs over the same or overlapping data are idempotent: the second
    /// run finds every tuple already mapped and inserts nothing.
    #[instrument(skip_all, err, fields(table = spec.table()))]
    pub async fn build<S: StarStore>(
        store: &S,
        records: &[Record],
        spec: &DimensionSpec,
    ) -> Result<Self, Error> {
        let mut keys: HashMap<AttributeTuple, SurrogateKey> =
            store.fetch_dimension(spec).await?.into_iter().collect();

        // Distinct new tuples, in first-seen source order.
        let mut seen = HashSet::new();
        let mut new_tuples = Vec::new();
        for record in records {
            let tuple = spec.tuple(record);
            if tuple.is_all_null() || keys.contains_key(&tuple) || !seen.insert(tuple.clone()) {
                continue;
            }
            new_tuples.push(tuple);
        }

        if !new_tuples.is_empty() {
            let assigned = store.insert_dimension_rows(spec, &new_tuples).await?;
            tracing::debug!(
                table = spec.table(),
                new_rows = new_tuples.len(),
                "mapped new dimension tuples"
            );
            keys.extend(new_tuples.into_iter().zip(assigned));
        }

        Ok(Self { keys })
    }

    /// Resolves a record to this dimension's surrogate key. Returns `None`
    /// for an all-null tuple, which becomes a null foreign key on the
    /// fact row.
    pub fn resolve(&self, record: &Record, spec: &DimensionSpec) -> Option<SurrogateKey> {
        self.keys.get(&spec.tuple(record)).copied()
    }

    /// Number of mapped tuples.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn get(&self, tuple: &AttributeTuple) -> Option<SurrogateKey> {
        self.keys.get(tuple).copied()
    }
}

/// Mappings for every shared dimension of a schema, keyed by table name.
#[derive(Debug, Default)]
pub struct DimensionMapper {
    mappings: HashMap<String, DimensionMapping>,
}

impl DimensionMapper {
    /// Builds mappings for all shared dimensions of `schema`.
    ///
    /// Dimensions are independent: a failure aborts the build, but
    /// mappings already persisted for earlier dimensions stay committed
    /// and will simply be found as existing rows on the next run.
    #[instrument(skip_all, err)]
    pub async fn build<S: StarStore>(
        store: &S,
        records: &[Record],
        schema: &StarSchema,
    ) -> Result<Self, Error> {
        let mut mappings = HashMap::new();
        for spec in schema.shared_dimensions() {
            let mapping = DimensionMapping::build(store, records, spec).await?;
            mappings.insert(spec.table().to_owned(), mapping);
        }
        Ok(Self { mappings })
    }

    /// Resolves a record against a shared dimension's mapping. Returns
    /// `None` when the tuple is unmapped (all-null) or the dimension is
    /// unknown to this mapper.
    pub fn resolve(&self, record: &Record, spec: &DimensionSpec) -> Option<SurrogateKey> {
        self.mappings
            .get(spec.table())
            .and_then(|mapping| mapping.resolve(record, spec))
    }

    pub fn mapping(&self, table: &str) -> Option<&DimensionMapping> {
        self.mappings.get(table)
    }
}
