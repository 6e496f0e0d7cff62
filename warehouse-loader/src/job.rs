//! Job orchestration: one full load run with polled progress

use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc,
};

use tracing::instrument;
use warehouse_db::{StarSchema, StarStore};

use crate::{
    batch::BatchLoader, config::LoaderConfig, lock::RunLock, mapper::DimensionMapper,
    source::TabularSource, Error,
};

/// Progress of the current (or most recent) load run.
///
/// Single writer, many readers: the job task writes, external observers
/// poll from other threads. All fields are atomics so polling never sees
/// torn values; `progress` is derived from the batch counters rather than
/// stored, which keeps it monotone within a run and pinned at its last
/// value after a failure.
#[derive(Debug, Default)]
pub struct JobState {
    running: AtomicBool,
    total_rows_added: AtomicU64,
    completed_batches: AtomicU64,
    total_batches: AtomicU64,
}

impl JobState {
    /// Whether a run is currently active.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Fact rows inserted by the current run so far.
    pub fn total_rows_added(&self) -> u64 {
        self.total_rows_added.load(Ordering::Acquire)
    }

    pub fn completed_batches(&self) -> u64 {
        self.completed_batches.load(Ordering::Acquire)
    }

    pub fn total_batches(&self) -> u64 {
        self.total_batches.load(Ordering::Acquire)
    }

    /// Completion percentage of the current run, `0.0` to `100.0`.
    ///
    /// `0.0` while no batch total is known (including an empty source).
    pub fn progress(&self) -> f64 {
        let total = self.total_batches();
        if total == 0 {
            return 0.0;
        }
        self.completed_batches() as f64 / total as f64 * 100.0
    }

    fn reset(&self, total_batches: u64) {
        self.completed_batches.store(0, Ordering::Release);
        self.total_rows_added.store(0, Ordering::Release);
        self.total_batches.store(total_batches, Ordering::Release);
    }

    fn record_batch(&self, rows: u64) {
        self.total_rows_added.fetch_add(rows, Ordering::AcqRel);
        self.completed_batches.fetch_add(1, Ordering::AcqRel);
    }
}

/// Clears the running flag when the run scope exits, error paths included.
struct RunningGuard<'a>(&'a JobState);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.running.store(false, Ordering::Release);
    }
}

/// Owns the end-to-end load run: snapshot the source, build the shared
/// dimension mappings, drive the batch loader to exhaustion, track
/// progress.
///
/// Caller-owned: construct one at process start and pass it (or its
/// [`JobState`]) to whichever layer needs it. The embedded [`RunLock`]
/// serializes [`run`] against any other administrative action performed
/// through the same lock.
///
/// [`run`]: JobManager::run
#[derive(Debug, Default)]
pub struct JobManager {
    state: Arc<JobState>,
    lock: RunLock,
    config: LoaderConfig,
}

impl JobManager {
    pub fn new(config: LoaderConfig) -> Self {
        Self {
            state: Arc::new(JobState::default()),
            lock: RunLock::new(),
            config,
        }
    }

    /// The shared progress state, for observers polling from elsewhere.
    pub fn state(&self) -> Arc<JobState> {
        Arc::clone(&self.state)
    }

    /// The lock serializing administrative operations. Callers running
    /// other exclusive actions (schema reset) should go through it.
    pub fn lock(&self) -> &RunLock {
        &self.lock
    }

    /// Runs one full load to completion.
    ///
    /// Blocks (asynchronously) until the source is exhausted or a fatal
    /// store error occurs. Any error aborts the whole run: the running
    /// flag is cleared, progress stays at its last successful value, fact
    /// rows from completed batches remain persisted, and no resume is
    /// attempted. A retry is simply a new run; dimension mapping
    /// idempotence keeps the dimensions duplicate-free.
    ///
    /// Returns the number of fact rows added.
    #[instrument(skip_all, err)]
    pub async fn run<S, T>(
        &self,
        store: &S,
        source: &T,
        schema: &StarSchema,
    ) -> Result<u64, Error>
    where
        S: StarStore,
        T: TabularSource,
    {
        self.lock
            .perform(|| self.run_exclusive(store, source, schema))
            .await
    }

    async fn run_exclusive<S, T>(
        &self,
        store: &S,
        source: &T,
        schema: &StarSchema,
    ) -> Result<u64, Error>
    where
        S: StarStore,
        T: TabularSource,
    {
        // The lock already serializes runs; this guards against a caller
        // bypassing it with two managers sharing a state, and makes the
        // component safe to refuse double entry on its own.
        if self
            .state
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(Error::AlreadyRunning);
        }
        let _guard = RunningGuard(&self.state);

        let records = source.load().await?;
        let total_batches = records.len().div_ceil(self.config.batch_size) as u64;
        self.state.reset(total_batches);
        tracing::info!(
            rows = records.len(),
            total_batches,
            batch_size = self.config.batch_size,
            "load run started"
        );

        let mapper = DimensionMapper::build(store, &records, schema).await?;

        let mut loader = BatchLoader::new(store, schema, &mapper, &records)
            .with_batch_size(self.config.batch_size)
            .with_insert_width(self.config.insert_width);

        let mut rows_added = 0u64;
        loop {
            let outcome = loader.insert_one_batch(true).await?;
            if outcome.exhausted {
                break;
            }
            rows_added += outcome.rows_processed as u64;
            self.state.record_batch(outcome.rows_processed as u64);
            tracing::info!(
                completed = self.state.completed_batches(),
                total = total_batches,
                progress = self.state.progress(),
                "batch completed"
            );
        }

        store.commit().await?;
        tracing::info!(rows_added, "load run finished");
        Ok(rows_added)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_is_zero_without_a_batch_total() {
        let state = JobState::default();
        assert_eq!(state.progress(), 0.0);
    }

    #[test]
    fn progress_tracks_completed_batches() {
        let state = JobState::default();
        state.reset(4);

        assert_eq!(state.progress(), 0.0);
        state.record_batch(10);
        assert_eq!(state.progress(), 25.0);
        state.record_batch(10);
        state.record_batch(10);
        state.record_batch(5);
        assert_eq!(state.progress(), 100.0);
        assert_eq!(state.total_rows_added(), 35);
    }

    #[test]
    fn reset_starts_a_fresh_run() {
        let state = JobState::default();
        state.reset(2);
        state.record_batch(7);
        state.reset(5);

        assert_eq!(state.completed_batches(), 0);
        assert_eq!(state.total_rows_added(), 0);
        assert_eq!(state.total_batches(), 5);
        assert_eq!(state.progress(), 0.0);
    }
}
