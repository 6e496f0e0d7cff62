//! PostgreSQL implementation of the star store

use sqlx::{
    postgres::PgRow,
    query_builder::Separated,
    types::chrono::{NaiveDate, NaiveDateTime, NaiveTime},
    Postgres, QueryBuilder, Row as _,
};
use tracing::instrument;

use crate::{
    conn::DbConnPool,
    schema::{AttributeTuple, DimensionSpec, FactRow, StarSchema, SurrogateKey},
    store::StarStore,
    value::{Scalar, ScalarType},
    Error,
};

/// PostgreSQL bind-parameter budget per statement. The wire protocol caps
/// parameters at 65535; large batches are split into chunks that stay
/// under it. Chunking does not affect key ordering: `RETURNING` yields
/// keys in insertion order per statement, and chunk results are
/// concatenated in submission order.
const BIND_LIMIT: usize = 65_000;

/// [`StarStore`] backed by a PostgreSQL connection pool.
///
/// Every bulk insert is a single multi-row `INSERT … RETURNING` statement
/// (per chunk), so the keys come from the insert itself and concurrent
/// writers on other tables cannot disturb row-to-key alignment. Each
/// statement runs in its own implicit transaction; there is no run-level
/// transaction, which is what makes per-batch durability possible.
#[derive(Debug, Clone)]
pub struct PgStarStore {
    pool: DbConnPool,
}

impl PgStarStore {
    /// Connects a new store to the given database URL.
    #[instrument(skip_all, err)]
    pub async fn connect(url: &str, pool_size: u32) -> Result<Self, Error> {
        let pool = DbConnPool::connect(url, pool_size).await?;
        Ok(Self { pool })
    }

    /// Wraps an existing connection pool.
    pub fn with_pool(pool: DbConnPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbConnPool {
        &self.pool
    }
}

#[async_trait::async_trait]
impl StarStore for PgStarStore {
    #[instrument(skip_all, err, fields(table = spec.table()))]
    async fn fetch_dimension(
        &self,
        spec: &DimensionSpec,
    ) -> Result<Vec<(AttributeTuple, SurrogateKey)>, Error> {
        let mut sql = String::from("SELECT ");
        for col in spec.columns() {
            sql.push_str(&quote_ident(&col.name));
            sql.push_str(", ");
        }
        sql.push_str(&quote_ident(spec.key_column()));
        sql.push_str(" FROM ");
        sql.push_str(&quote_ident(spec.table()));

        let rows = sqlx::query(&sql).fetch_all(&*self.pool).await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let values = spec
                .columns()
                .iter()
                .enumerate()
                .map(|(idx, col)| decode_scalar(&row, idx, col.ty))
                .collect::<Result<Vec<_>, _>>()?;
            let key: SurrogateKey = row.try_get(spec.columns().len())?;
            out.push((AttributeTuple(values), key));
        }
        Ok(out)
    }

    #[instrument(skip_all, err, fields(table = spec.table(), rows = rows.len()))]
    async fn insert_dimension_rows(
        &self,
        spec: &DimensionSpec,
        rows: &[AttributeTuple],
    ) -> Result<Vec<SurrogateKey>, Error> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let chunk_rows = (BIND_LIMIT / spec.columns().len().max(1)).max(1);
        let mut keys = Vec::with_capacity(rows.len());

        for chunk in rows.chunks(chunk_rows) {
            let mut qb = insert_prelude(spec.table(), spec.columns().iter().map(|c| &c.name));
            qb.push_values(chunk, |mut b, tuple| {
                for (value, col) in tuple.values().iter().zip(spec.columns()) {
                    push_scalar(&mut b, value, col.ty);
                }
            });
            qb.push(" RETURNING ");
            qb.push(quote_ident(spec.key_column()));

            let assigned: Vec<SurrogateKey> = qb
                .build_query_scalar()
                .fetch_all(&*self.pool)
                .await
                .map_err(|err| insert_error(spec.table(), err))?;

            if assigned.len() != chunk.len() {
                return Err(Error::KeyCountMismatch {
                    table: spec.table().to_owned(),
                    submitted: chunk.len(),
                    returned: assigned.len(),
                });
            }
            keys.extend(assigned);
        }
        Ok(keys)
    }

    #[instrument(skip_all, err, fields(table = schema.fact_table(), rows = rows.len()))]
    async fn insert_fact_rows(&self, schema: &StarSchema, rows: &[FactRow]) -> Result<u64, Error> {
        if rows.is_empty() {
            return Ok(0);
        }

        let chunk_rows = (BIND_LIMIT / schema.dimensions().len().max(1)).max(1);
        let mut inserted = 0u64;

        for chunk in rows.chunks(chunk_rows) {
            let mut qb = insert_prelude(
                schema.fact_table(),
                schema.dimensions().iter().map(|d| d.fact_key_column()),
            );
            qb.push_values(chunk, |mut b, fact| {
                for key in fact.keys() {
                    b.push_bind(*key);
                }
            });

            let result = qb
                .build()
                .execute(&*self.pool)
                .await
                .map_err(|err| insert_error(schema.fact_table(), err))?;
            inserted += result.rows_affected();
        }
        Ok(inserted)
    }

    async fn commit(&self) -> Result<(), Error> {
        // Every bulk statement above runs in its own implicit transaction,
        // so there is nothing left to flush here.
        Ok(())
    }
}

/// Builds `INSERT INTO "table" ("col", …) ` ready for `push_values`.
fn insert_prelude<'args>(
    table: &str,
    columns: impl Iterator<Item = impl AsRef<str>>,
) -> QueryBuilder<'args, Postgres> {
    let mut qb = QueryBuilder::new("INSERT INTO ");
    qb.push(quote_ident(table));
    qb.push(" (");
    let mut sep = qb.separated(", ");
    for col in columns {
        sep.push(quote_ident(col.as_ref()));
    }
    qb.push(") ");
    qb
}

/// Quotes an SQL identifier, escaping embedded quotes.
fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

fn push_scalar(b: &mut Separated<'_, '_, Postgres, &str>, value: &Scalar, ty: ScalarType) {
    match value {
        Scalar::Text(v) => {
            b.push_bind(v.clone());
        }
        Scalar::Int(v) => {
            b.push_bind(*v);
        }
        Scalar::Float(v) => {
            b.push_bind(*v);
        }
        Scalar::Timestamp(v) => {
            b.push_bind(*v);
        }
        Scalar::Date(v) => {
            b.push_bind(*v);
        }
        Scalar::Time(v) => {
            b.push_bind(*v);
        }
        // A null slot must be bound with the column's declared type, or
        // the server cannot infer the parameter type.
        Scalar::Null => match ty {
            ScalarType::Text => {
                b.push_bind(None::<String>);
            }
            ScalarType::Int => {
                b.push_bind(None::<i64>);
            }
            ScalarType::Float => {
                b.push_bind(None::<f64>);
            }
            ScalarType::Timestamp => {
                b.push_bind(None::<NaiveDateTime>);
            }
            ScalarType::Date => {
                b.push_bind(None::<NaiveDate>);
            }
            ScalarType::Time => {
                b.push_bind(None::<NaiveTime>);
            }
        },
    }
}

fn decode_scalar(row: &PgRow, idx: usize, ty: ScalarType) -> Result<Scalar, sqlx::Error> {
    let value = match ty {
        ScalarType::Text => row.try_get::<Option<String>, _>(idx)?.map(Scalar::Text),
        ScalarType::Int => row.try_get::<Option<i64>, _>(idx)?.map(Scalar::Int),
        ScalarType::Float => row.try_get::<Option<f64>, _>(idx)?.map(Scalar::Float),
        ScalarType::Timestamp => row
            .try_get::<Option<NaiveDateTime>, _>(idx)?
            .map(Scalar::Timestamp),
        ScalarType::Date => row.try_get::<Option<NaiveDate>, _>(idx)?.map(Scalar::Date),
        ScalarType::Time => row.try_get::<Option<NaiveTime>, _>(idx)?.map(Scalar::Time),
    };
    Ok(value.unwrap_or(Scalar::Null))
}

fn insert_error(table: &str, err: sqlx::Error) -> Error {
    use sqlx::error::ErrorKind;

    match &err {
        sqlx::Error::Database(db_err)
            if matches!(
                db_err.kind(),
                ErrorKind::UniqueViolation
                    | ErrorKind::ForeignKeyViolation
                    | ErrorKind::NotNullViolation
                    | ErrorKind::CheckViolation
            ) =>
        {
            Error::InsertRejected {
                table: table.to_owned(),
                reason: db_err.to_string(),
            }
        }
        _ => Error::DbError(err),
    }
}
