//! Star-schema description: dimension specs, attribute tuples, keys

use crate::{
    record::Record,
    value::{Scalar, ScalarType},
};

/// A store-assigned integer identity for a dimension row.
///
/// Keys are assigned densely and monotonically per table in insert order,
/// and are never reused or reassigned.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    sqlx::Type,
    serde::Serialize,
    serde::Deserialize,
)]
#[repr(transparent)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct SurrogateKey(i64);

impl SurrogateKey {
    /// Convert the [`SurrogateKey`] to an `i64`
    pub fn to_i64(self) -> i64 {
        self.0
    }
}

impl From<i64> for SurrogateKey {
    fn from(key: i64) -> Self {
        Self(key)
    }
}

impl From<SurrogateKey> for i64 {
    fn from(key: SurrogateKey) -> Self {
        key.0
    }
}

impl std::fmt::Display for SurrogateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One attribute column of a dimension table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: String,
    pub ty: ScalarType,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, ty: ScalarType) -> Self {
        Self { name: name.into(), ty }
    }

    pub fn text(name: impl Into<String>) -> Self {
        Self::new(name, ScalarType::Text)
    }

    pub fn int(name: impl Into<String>) -> Self {
        Self::new(name, ScalarType::Int)
    }

    pub fn float(name: impl Into<String>) -> Self {
        Self::new(name, ScalarType::Float)
    }

    pub fn timestamp(name: impl Into<String>) -> Self {
        Self::new(name, ScalarType::Timestamp)
    }

    pub fn date(name: impl Into<String>) -> Self {
        Self::new(name, ScalarType::Date)
    }

    pub fn time(name: impl Into<String>) -> Self {
        Self::new(name, ScalarType::Time)
    }
}

/// How a dimension participates in the load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DimensionRole {
    /// Low cardinality, deduplicated across the whole dataset, pre-mapped
    /// once per run.
    Shared,
    /// High cardinality, one new row per fact row, bulk-inserted per batch
    /// with no deduplication.
    PerRow,
}

/// Describes one dimension table: its identity, its ordered attribute
/// columns (excluding the surrogate key), the fact-table column that
/// references it, and its [`DimensionRole`].
///
/// Dimensions are data-described values, not types: a concrete warehouse
/// is a list of these plus a fact table name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DimensionSpec {
    table: String,
    key_column: String,
    fact_key_column: String,
    columns: Vec<ColumnDef>,
    role: DimensionRole,
}

/// Name of the surrogate key column in every dimension table.
pub const KEY_COLUMN: &str = "key";

impl DimensionSpec {
    pub fn new(
        table: impl Into<String>,
        fact_key_column: impl Into<String>,
        columns: Vec<ColumnDef>,
        role: DimensionRole,
    ) -> Self {
        Self {
            table: table.into(),
            key_column: KEY_COLUMN.to_owned(),
            fact_key_column: fact_key_column.into(),
            columns,
            role,
        }
    }

    /// A shared (deduplicated) dimension.
    pub fn shared(
        table: impl Into<String>,
        fact_key_column: impl Into<String>,
        columns: Vec<ColumnDef>,
    ) -> Self {
        Self::new(table, fact_key_column, columns, DimensionRole::Shared)
    }

    /// A per-row (one row per fact row) dimension.
    pub fn per_row(
        table: impl Into<String>,
        fact_key_column: impl Into<String>,
        columns: Vec<ColumnDef>,
    ) -> Self {
        Self::new(table, fact_key_column, columns, DimensionRole::PerRow)
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn key_column(&self) -> &str {
        &self.key_column
    }

    pub fn fact_key_column(&self) -> &str {
        &self.fact_key_column
    }

    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    pub fn role(&self) -> DimensionRole {
        self.role
    }

    pub fn is_shared(&self) -> bool {
        self.role == DimensionRole::Shared
    }

    /// Extracts this dimension's attribute tuple from a source record.
    /// Absent columns read as null.
    pub fn tuple(&self, record: &Record) -> AttributeTuple {
        AttributeTuple(
            self.columns
                .iter()
                .map(|col| record.get(&col.name).clone())
                .collect(),
        )
    }
}

/// The ordered attribute values of one dimension row, in the dimension's
/// column order. This is the deduplication identity for shared dimensions;
/// two tuples are equal iff all values compare equal, nulls included.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AttributeTuple(pub Vec<Scalar>);

impl AttributeTuple {
    pub fn values(&self) -> &[Scalar] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// An all-null tuple is never inserted into a shared dimension and
    /// resolves to a null foreign key on the fact row.
    pub fn is_all_null(&self) -> bool {
        self.0.iter().all(Scalar::is_null)
    }
}

impl<const N: usize> From<[Scalar; N]> for AttributeTuple {
    fn from(values: [Scalar; N]) -> Self {
        Self(values.into())
    }
}

/// The full star layout: a fact table plus the dimensions it references.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StarSchema {
    fact_table: String,
    dimensions: Vec<DimensionSpec>,
}

impl StarSchema {
    pub fn new(fact_table: impl Into<String>, dimensions: Vec<DimensionSpec>) -> Self {
        Self {
            fact_table: fact_table.into(),
            dimensions,
        }
    }

    pub fn fact_table(&self) -> &str {
        &self.fact_table
    }

    /// All dimensions, in fact-column order.
    pub fn dimensions(&self) -> &[DimensionSpec] {
        &self.dimensions
    }

    pub fn shared_dimensions(&self) -> impl Iterator<Item = &DimensionSpec> {
        self.dimensions.iter().filter(|spec| spec.is_shared())
    }

    pub fn per_row_dimensions(&self) -> impl Iterator<Item = &DimensionSpec> {
        self.dimensions.iter().filter(|spec| !spec.is_shared())
    }
}

/// One row of the fact table: one foreign key per dimension, aligned with
/// [`StarSchema::dimensions`] order. `None` means a null foreign key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FactRow {
    keys: Vec<Option<SurrogateKey>>,
}

impl FactRow {
    pub fn new(keys: Vec<Option<SurrogateKey>>) -> Self {
        Self { keys }
    }

    pub fn keys(&self) -> &[Option<SurrogateKey>] {
        &self.keys
    }
}
