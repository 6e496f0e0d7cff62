//! DB integration tests for the PostgreSQL star store
//!
//! These tests spin up a temporary PostgreSQL instance and therefore only
//! run with `--features pg-tests`.

#![cfg(feature = "pg-tests")]

use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};
use pgtemp::PgTempDB;
use warehouse_db::{
    AttributeTuple, ColumnDef, DimensionSpec, FactRow, PgStarStore, Scalar, StarSchema, StarStore,
};

/// Connect with retry: pgtemp's server may not be ready immediately.
async fn connect(temp_db: &PgTempDB) -> PgStarStore {
    let url = temp_db.connection_uri();
    (|| PgStarStore::connect(&url, 4))
        .retry(
            ExponentialBuilder::default()
                .with_min_delay(Duration::from_millis(10))
                .with_max_delay(Duration::from_millis(100))
                .with_max_times(20),
        )
        .await
        .expect("Failed to connect to temp db")
}

async fn create_tables(store: &PgStarStore) {
    let ddl = [
        indoc::indoc! {r#"
            CREATE TABLE resolution_dimension (
                key BIGSERIAL PRIMARY KEY,
                resolution VARCHAR(255)
            )
        "#},
        indoc::indoc! {r#"
            CREATE TABLE location_dimension (
                key BIGSERIAL PRIMARY KEY,
                latitude DOUBLE PRECISION,
                longitude DOUBLE PRECISION
            )
        "#},
        indoc::indoc! {r#"
            CREATE TABLE incidents (
                incident_id BIGSERIAL PRIMARY KEY,
                resolution_key BIGINT REFERENCES resolution_dimension (key),
                location_key BIGINT REFERENCES location_dimension (key)
            )
        "#},
    ];
    for stmt in ddl {
        sqlx::query(stmt)
            .execute(&**store.pool())
            .await
            .expect("Failed to create table");
    }
}

fn resolution_spec() -> DimensionSpec {
    DimensionSpec::shared(
        "resolution_dimension",
        "resolution_key",
        vec![ColumnDef::text("resolution")],
    )
}

fn location_spec() -> DimensionSpec {
    DimensionSpec::shared(
        "location_dimension",
        "location_key",
        vec![ColumnDef::float("latitude"), ColumnDef::float("longitude")],
    )
}

fn schema() -> StarSchema {
    StarSchema::new("incidents", vec![resolution_spec(), location_spec()])
}

#[tokio::test]
async fn insert_returns_keys_in_submission_order() {
    //* Given
    let temp_db = PgTempDB::new();
    let store = connect(&temp_db).await;
    create_tables(&store).await;

    let rows: Vec<AttributeTuple> = ["Open", "Cited", "Arrest", "Open"]
        .into_iter()
        .map(|v| AttributeTuple::from([Scalar::from(v)]))
        .collect();

    //* When
    let keys = store
        .insert_dimension_rows(&resolution_spec(), &rows)
        .await
        .expect("Failed to insert dimension rows");

    //* Then
    assert_eq!(keys.len(), rows.len());
    for pair in keys.windows(2) {
        assert!(pair[0] < pair[1], "keys must be monotonically increasing");
    }
}

#[tokio::test]
async fn fetch_dimension_round_trips_values_and_nulls() {
    //* Given
    let temp_db = PgTempDB::new();
    let store = connect(&temp_db).await;
    create_tables(&store).await;

    let spec = location_spec();
    let rows = vec![
        AttributeTuple::from([Scalar::Float(37.7749), Scalar::Float(-122.4194)]),
        AttributeTuple::from([Scalar::Null, Scalar::Float(-122.5)]),
    ];
    let keys = store
        .insert_dimension_rows(&spec, &rows)
        .await
        .expect("Failed to insert dimension rows");

    //* When
    let fetched = store
        .fetch_dimension(&spec)
        .await
        .expect("Failed to fetch dimension");

    //* Then
    assert_eq!(fetched.len(), 2);
    for (tuple, key) in &rows.into_iter().zip(keys).collect::<Vec<_>>() {
        assert!(
            fetched.iter().any(|(t, k)| t == tuple && k == key),
            "inserted row must round-trip"
        );
    }
}

#[tokio::test]
async fn fact_rows_accept_null_foreign_keys() {
    //* Given
    let temp_db = PgTempDB::new();
    let store = connect(&temp_db).await;
    create_tables(&store).await;

    let schema = schema();
    let resolution_keys = store
        .insert_dimension_rows(
            &resolution_spec(),
            &[AttributeTuple::from([Scalar::from("Open")])],
        )
        .await
        .expect("Failed to insert dimension rows");

    //* When
    let inserted = store
        .insert_fact_rows(
            &schema,
            &[
                FactRow::new(vec![Some(resolution_keys[0]), None]),
                FactRow::new(vec![None, None]),
            ],
        )
        .await
        .expect("Failed to insert fact rows");

    //* Then
    assert_eq!(inserted, 2);
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM incidents")
        .fetch_one(&**store.pool())
        .await
        .expect("Failed to count facts");
    assert_eq!(count, 2);
}
