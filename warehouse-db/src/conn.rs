//! Internal connection and connection pool implementations

use std::time::Duration;

use sqlx::{postgres::PgPoolOptions, Pool, Postgres};
use tracing::instrument;

/// Errors that can occur when connecting to the warehouse DB.
#[derive(Debug, thiserror::Error)]
pub enum ConnError {
    /// Error connecting to the warehouse DB.
    #[error("Error connecting to warehouse db: {0}")]
    ConnectionError(#[source] sqlx::Error),
}

/// A connection pool to the warehouse DB.
///
/// Pooled connections are what make the bounded per-batch insert width
/// safe: each concurrent dimension insert checks out its own connection,
/// so no session is ever shared across workers.
#[derive(Debug, Clone)]
pub struct DbConnPool(Pool<Postgres>);

impl DbConnPool {
    /// Set up a connection pool to the warehouse DB.
    #[instrument(skip_all, err)]
    pub async fn connect(url: &str, pool_size: u32) -> Result<Self, ConnError> {
        PgPoolOptions::new()
            .max_connections(pool_size)
            .acquire_timeout(Duration::from_secs(5))
            .connect(url)
            .await
            .map(Self)
            .map_err(ConnError::ConnectionError)
    }
}

impl std::ops::Deref for DbConnPool {
    type Target = Pool<Postgres>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl std::ops::DerefMut for DbConnPool {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}
