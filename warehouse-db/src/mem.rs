//! In-memory star store for tests and local experiments

use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex},
};

use async_trait::async_trait;

use crate::{
    schema::{AttributeTuple, DimensionSpec, FactRow, StarSchema, SurrogateKey},
    store::StarStore,
    Error,
};

/// An in-memory [`StarStore`].
///
/// Keys are assigned sequentially per table starting at 1, matching the
/// dense, insert-ordered assignment of a serial column. Clones share the
/// same underlying tables.
///
/// Inserts on a table can be made to fail on demand with [`poison`],
/// which is how tests exercise the loader's abort paths.
///
/// [`poison`]: MemStore::poison
#[derive(Debug, Clone, Default)]
pub struct MemStore {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Debug, Default)]
struct Inner {
    dimensions: HashMap<String, DimTable>,
    facts: HashMap<String, Vec<FactRow>>,
    poisoned: HashSet<String>,
}

#[derive(Debug, Default)]
struct DimTable {
    next_key: i64,
    rows: Vec<(AttributeTuple, SurrogateKey)>,
}

impl DimTable {
    fn assign_key(&mut self) -> SurrogateKey {
        self.next_key += 1;
        SurrogateKey::from(self.next_key)
    }
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent insert on `table` fail until [`heal`] is
    /// called.
    ///
    /// [`heal`]: MemStore::heal
    pub fn poison(&self, table: &str) {
        self.lock().poisoned.insert(table.to_owned());
    }

    pub fn heal(&self, table: &str) {
        self.lock().poisoned.remove(table);
    }

    /// Number of rows in a dimension table.
    pub fn dimension_row_count(&self, table: &str) -> usize {
        self.lock()
            .dimensions
            .get(table)
            .map_or(0, |t| t.rows.len())
    }

    /// All rows of a dimension table, in insertion order.
    pub fn dimension_rows(&self, table: &str) -> Vec<(AttributeTuple, SurrogateKey)> {
        self.lock()
            .dimensions
            .get(table)
            .map(|t| t.rows.clone())
            .unwrap_or_default()
    }

    /// Number of rows in a fact table.
    pub fn fact_row_count(&self, table: &str) -> usize {
        self.lock().facts.get(table).map_or(0, Vec::len)
    }

    /// All rows of a fact table, in insertion order.
    pub fn fact_rows(&self, table: &str) -> Vec<FactRow> {
        self.lock().facts.get(table).cloned().unwrap_or_default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // Lock poisoning only happens if a holder panicked; tests want the
        // state anyway.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn check_poisoned(inner: &Inner, table: &str) -> Result<(), Error> {
        if inner.poisoned.contains(table) {
            return Err(Error::InsertRejected {
                table: table.to_owned(),
                reason: "injected failure".to_owned(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl StarStore for MemStore {
    async fn fetch_dimension(
        &self,
        spec: &DimensionSpec,
    ) -> Result<Vec<(AttributeTuple, SurrogateKey)>, Error> {
        Ok(self
            .lock()
            .dimensions
            .get(spec.table())
            .map(|t| t.rows.clone())
            .unwrap_or_default())
    }

    async fn insert_dimension_rows(
        &self,
        spec: &DimensionSpec,
        rows: &[AttributeTuple],
    ) -> Result<Vec<SurrogateKey>, Error> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let mut inner = self.lock();
        Self::check_poisoned(&inner, spec.table())?;

        let table = inner.dimensions.entry(spec.table().to_owned()).or_default();
        let keys = rows
            .iter()
            .map(|tuple| {
                let key = table.assign_key();
                table.rows.push((tuple.clone(), key));
                key
            })
            .collect();
        Ok(keys)
    }

    async fn insert_fact_rows(&self, schema: &StarSchema, rows: &[FactRow]) -> Result<u64, Error> {
        if rows.is_empty() {
            return Ok(0);
        }

        let mut inner = self.lock();
        Self::check_poisoned(&inner, schema.fact_table())?;

        inner
            .facts
            .entry(schema.fact_table().to_owned())
            .or_default()
            .extend_from_slice(rows);
        Ok(rows.len() as u64)
    }

    async fn commit(&self) -> Result<(), Error> {
        Ok(())
    }
}
