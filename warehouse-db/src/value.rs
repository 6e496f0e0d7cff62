//! Scalar values carried by source records and dimension attributes

use std::hash::{Hash, Hasher};

use sqlx::types::chrono::{NaiveDate, NaiveDateTime, NaiveTime};

/// A single scalar value from the tabular source.
///
/// `Scalar` is the deduplication identity used by the dimension mapper, so
/// equality and hashing must agree for every variant, nulls included.
/// Floats compare by bit pattern: two values are the same dimension
/// attribute iff they are byte-identical, which also makes `Scalar`
/// hashable without excluding `NaN`.
#[derive(Debug, Clone)]
pub enum Scalar {
    Null,
    Text(String),
    Int(i64),
    Float(f64),
    Timestamp(NaiveDateTime),
    Date(NaiveDate),
    Time(NaiveTime),
}

impl Scalar {
    /// Returns `true` if the value is the SQL null.
    pub fn is_null(&self) -> bool {
        matches!(self, Scalar::Null)
    }

    /// The type of this value, if it is not null.
    pub fn scalar_type(&self) -> Option<ScalarType> {
        match self {
            Scalar::Null => None,
            Scalar::Text(_) => Some(ScalarType::Text),
            Scalar::Int(_) => Some(ScalarType::Int),
            Scalar::Float(_) => Some(ScalarType::Float),
            Scalar::Timestamp(_) => Some(ScalarType::Timestamp),
            Scalar::Date(_) => Some(ScalarType::Date),
            Scalar::Time(_) => Some(ScalarType::Time),
        }
    }
}

impl PartialEq for Scalar {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Scalar::Null, Scalar::Null) => true,
            (Scalar::Text(a), Scalar::Text(b)) => a == b,
            (Scalar::Int(a), Scalar::Int(b)) => a == b,
            (Scalar::Float(a), Scalar::Float(b)) => a.to_bits() == b.to_bits(),
            (Scalar::Timestamp(a), Scalar::Timestamp(b)) => a == b,
            (Scalar::Date(a), Scalar::Date(b)) => a == b,
            (Scalar::Time(a), Scalar::Time(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Scalar {}

impl Hash for Scalar {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Scalar::Null => {}
            Scalar::Text(v) => v.hash(state),
            Scalar::Int(v) => v.hash(state),
            Scalar::Float(v) => v.to_bits().hash(state),
            Scalar::Timestamp(v) => v.hash(state),
            Scalar::Date(v) => v.hash(state),
            Scalar::Time(v) => v.hash(state),
        }
    }
}

impl std::fmt::Display for Scalar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scalar::Null => f.write_str("NULL"),
            Scalar::Text(v) => write!(f, "{v}"),
            Scalar::Int(v) => write!(f, "{v}"),
            Scalar::Float(v) => write!(f, "{v}"),
            Scalar::Timestamp(v) => write!(f, "{v}"),
            Scalar::Date(v) => write!(f, "{v}"),
            Scalar::Time(v) => write!(f, "{v}"),
        }
    }
}

impl From<&str> for Scalar {
    fn from(v: &str) -> Self {
        Scalar::Text(v.to_owned())
    }
}

impl From<String> for Scalar {
    fn from(v: String) -> Self {
        Scalar::Text(v)
    }
}

impl From<i64> for Scalar {
    fn from(v: i64) -> Self {
        Scalar::Int(v)
    }
}

impl From<i32> for Scalar {
    fn from(v: i32) -> Self {
        Scalar::Int(v.into())
    }
}

impl From<f64> for Scalar {
    fn from(v: f64) -> Self {
        Scalar::Float(v)
    }
}

impl From<NaiveDateTime> for Scalar {
    fn from(v: NaiveDateTime) -> Self {
        Scalar::Timestamp(v)
    }
}

impl From<NaiveDate> for Scalar {
    fn from(v: NaiveDate) -> Self {
        Scalar::Date(v)
    }
}

impl From<NaiveTime> for Scalar {
    fn from(v: NaiveTime) -> Self {
        Scalar::Time(v)
    }
}

impl<T> From<Option<T>> for Scalar
where
    T: Into<Scalar>,
{
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Scalar::Null)
    }
}

/// The declared type of a dimension attribute column.
///
/// Needed by store backends to decode existing rows and to bind typed
/// nulls: a null slot in a bulk insert must carry the column's type, not
/// a guessed one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarType {
    Text,
    Int,
    Float,
    Timestamp,
    Date,
    Time,
}
