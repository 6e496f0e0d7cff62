//! Normalized source records

use std::collections::HashMap;

use crate::value::Scalar;

/// One row of the tabular source: a mapping from normalized column name to
/// scalar value. Immutable once built.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    columns: HashMap<String, Scalar>,
}

/// Normalizes a raw column name: lowercase, whitespace replaced with
/// underscores.
pub fn normalize_column_name(raw: &str) -> String {
    raw.trim()
        .chars()
        .map(|c| {
            if c.is_whitespace() {
                '_'
            } else {
                c.to_ascii_lowercase()
            }
        })
        .collect()
}

impl Record {
    /// Builds a record from `(column, value)` pairs, normalizing column
    /// names on the way in.
    ///
    /// A repeated column name keeps the last value.
    pub fn from_pairs<I, N, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (N, V)>,
        N: AsRef<str>,
        V: Into<Scalar>,
    {
        let columns = pairs
            .into_iter()
            .map(|(name, value)| (normalize_column_name(name.as_ref()), value.into()))
            .collect();
        Self { columns }
    }

    /// Returns the value for a column, or the null scalar if the column is
    /// absent. Missing values and explicit nulls are indistinguishable,
    /// matching how the source represents them.
    pub fn get(&self, column: &str) -> &Scalar {
        const NULL: Scalar = Scalar::Null;
        self.columns.get(column).unwrap_or(&NULL)
    }

    /// Number of columns present in the record.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}
