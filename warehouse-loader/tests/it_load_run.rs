//! End-to-end load runs against the in-memory store

use warehouse_db::{ColumnDef, DimensionSpec, MemStore, Record, Scalar, StarSchema};
use warehouse_loader::{Error, JobManager, LoaderConfig};

const FACT_TABLE: &str = "incidents";
const RESOLUTIONS: [&str; 3] = ["Open", "Cited", "Arrest"];

fn schema() -> StarSchema {
    StarSchema::new(
        FACT_TABLE,
        vec![
            DimensionSpec::shared(
                "resolution_dimension",
                "resolution_key",
                vec![ColumnDef::text("resolution")],
            ),
            DimensionSpec::per_row(
                "incident_details_dimension",
                "incident_details_key",
                vec![
                    ColumnDef::int("incident_number"),
                    ColumnDef::text("incident_description"),
                ],
            ),
        ],
    )
}

fn source(n: usize) -> Vec<Record> {
    (0..n)
        .map(|i| {
            Record::from_pairs([
                ("Resolution", Scalar::from(RESOLUTIONS[i % 3])),
                ("Incident Number", Scalar::from(i as i64)),
                ("Incident Description", Scalar::from(format!("incident {i}"))),
            ])
        })
        .collect()
}

#[tokio::test]
async fn full_run_conserves_row_counts_and_finishes_at_100_percent() {
    //* Given
    // 25 000 records at the default batch size of 10 000: three batches
    // of 10 000 / 10 000 / 5 000.
    let store = MemStore::new();
    let schema = schema();
    let records = source(25_000);
    let manager = JobManager::new(LoaderConfig::default());
    let state = manager.state();

    //* When
    let rows_added = manager
        .run(&store, &records, &schema)
        .await
        .expect("Load run failed");

    //* Then
    assert_eq!(rows_added, 25_000);
    assert_eq!(state.total_rows_added(), 25_000);
    assert_eq!(state.total_batches(), 3);
    assert_eq!(state.completed_batches(), 3);
    assert_eq!(state.progress(), 100.0);
    assert!(!state.is_running());

    assert_eq!(store.fact_row_count(FACT_TABLE), 25_000);
    // Three distinct resolutions across the whole source: exactly three
    // rows, no matter how many records reference each.
    assert_eq!(store.dimension_row_count("resolution_dimension"), 3);
    // Per-row dimension: one row per fact row.
    assert_eq!(store.dimension_row_count("incident_details_dimension"), 25_000);
}

#[tokio::test]
async fn rerunning_creates_no_duplicate_shared_dimension_rows() {
    //* Given
    let store = MemStore::new();
    let schema = schema();
    let records = source(50);
    let manager = JobManager::new(LoaderConfig::default());

    //* When
    manager
        .run(&store, &records, &schema)
        .await
        .expect("First run failed");
    manager
        .run(&store, &records, &schema)
        .await
        .expect("Second run failed");

    //* Then
    assert_eq!(store.dimension_row_count("resolution_dimension"), 3);
    // Facts and per-row dimensions append per run.
    assert_eq!(store.fact_row_count(FACT_TABLE), 100);
    assert_eq!(store.dimension_row_count("incident_details_dimension"), 100);
}

#[tokio::test]
async fn surrogate_keys_are_pairwise_distinct_within_each_table() {
    //* Given
    let store = MemStore::new();
    let schema = schema();
    let records = source(40);
    let manager = JobManager::new(LoaderConfig::default());

    //* When
    manager
        .run(&store, &records, &schema)
        .await
        .expect("Load run failed");

    //* Then
    for table in ["resolution_dimension", "incident_details_dimension"] {
        let mut keys: Vec<_> = store
            .dimension_rows(table)
            .into_iter()
            .map(|(_, key)| key)
            .collect();
        let len = keys.len();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), len, "duplicate keys in {table}");
    }
}

#[tokio::test]
async fn all_null_shared_tuples_produce_null_foreign_keys() {
    //* Given
    let store = MemStore::new();
    let schema = schema();
    let records = vec![
        Record::from_pairs([
            ("resolution", Scalar::Null),
            ("incident_number", Scalar::from(1i64)),
            ("incident_description", Scalar::from("no resolution")),
        ]),
        Record::from_pairs([
            ("resolution", Scalar::from("Open")),
            ("incident_number", Scalar::from(2i64)),
            ("incident_description", Scalar::from("resolved")),
        ]),
    ];
    let manager = JobManager::new(LoaderConfig::default());

    //* When
    manager
        .run(&store, &records, &schema)
        .await
        .expect("Load run failed");

    //* Then
    // The all-null tuple was never inserted into the shared dimension.
    assert_eq!(store.dimension_row_count("resolution_dimension"), 1);

    let facts = store.fact_rows(FACT_TABLE);
    assert_eq!(facts.len(), 2);
    assert_eq!(facts[0].keys()[0], None);
    assert!(facts[1].keys()[0].is_some());
    // Per-row keys are present on both.
    assert!(facts[0].keys()[1].is_some());
    assert!(facts[1].keys()[1].is_some());
}

#[tokio::test]
async fn a_store_failure_aborts_the_run_and_clears_running() {
    //* Given
    let store = MemStore::new();
    let schema = schema();
    let records = source(10);
    let manager = JobManager::new(LoaderConfig::default());
    let state = manager.state();
    store.poison(FACT_TABLE);

    //* When
    let err = manager
        .run(&store, &records, &schema)
        .await
        .expect_err("Run should have failed");

    //* Then
    assert!(matches!(
        err,
        Error::Store(warehouse_db::Error::InsertRejected { .. })
    ));
    assert!(!state.is_running());
    assert_eq!(state.completed_batches(), 0);
    assert_eq!(state.progress(), 0.0);
    assert_eq!(store.fact_row_count(FACT_TABLE), 0);

    // A retry after the fault clears succeeds and stays duplicate-free.
    store.heal(FACT_TABLE);
    manager
        .run(&store, &records, &schema)
        .await
        .expect("Retry failed");
    assert_eq!(store.fact_row_count(FACT_TABLE), 10);
    assert_eq!(store.dimension_row_count("resolution_dimension"), 3);
    assert_eq!(state.progress(), 100.0);
}

#[tokio::test]
async fn a_mapping_failure_keeps_earlier_dimensions_and_retries_cleanly() {
    //* Given
    // Two shared dimensions, mapped in schema order; the second one is
    // poisoned, so the run dies during the mapping pre-pass.
    let store = MemStore::new();
    let schema = StarSchema::new(
        FACT_TABLE,
        vec![
            DimensionSpec::shared(
                "resolution_dimension",
                "resolution_key",
                vec![ColumnDef::text("resolution")],
            ),
            DimensionSpec::shared(
                "district_dimension",
                "district_key",
                vec![ColumnDef::text("police_district")],
            ),
        ],
    );
    let records: Vec<Record> = (0..6)
        .map(|i| {
            Record::from_pairs([
                ("resolution", Scalar::from(RESOLUTIONS[i % 3])),
                (
                    "police_district",
                    Scalar::from(if i % 2 == 0 { "Central" } else { "Mission" }),
                ),
            ])
        })
        .collect();
    let manager = JobManager::new(LoaderConfig::default());
    let state = manager.state();
    store.poison("district_dimension");

    //* When
    let err = manager
        .run(&store, &records, &schema)
        .await
        .expect_err("Run should have failed");

    //* Then
    assert!(matches!(
        err,
        Error::Store(warehouse_db::Error::InsertRejected { .. })
    ));
    assert!(!state.is_running());
    // The dimension mapped before the failure keeps its rows; nothing
    // further was loaded.
    assert_eq!(store.dimension_row_count("resolution_dimension"), 3);
    assert_eq!(store.dimension_row_count("district_dimension"), 0);
    assert_eq!(store.fact_row_count(FACT_TABLE), 0);

    // A retry re-finds those rows as existing instead of duplicating them.
    store.heal("district_dimension");
    manager
        .run(&store, &records, &schema)
        .await
        .expect("Retry failed");
    assert_eq!(store.dimension_row_count("resolution_dimension"), 3);
    assert_eq!(store.dimension_row_count("district_dimension"), 2);
    assert_eq!(store.fact_row_count(FACT_TABLE), 6);
}

#[tokio::test]
async fn empty_source_completes_without_batches() {
    //* Given
    let store = MemStore::new();
    let schema = schema();
    let records: Vec<Record> = Vec::new();
    let manager = JobManager::new(LoaderConfig::default());
    let state = manager.state();

    //* When
    let rows_added = manager
        .run(&store, &records, &schema)
        .await
        .expect("Load run failed");

    //* Then
    assert_eq!(rows_added, 0);
    assert_eq!(state.total_batches(), 0);
    assert!(!state.is_running());
    assert_eq!(store.fact_row_count(FACT_TABLE), 0);
}
