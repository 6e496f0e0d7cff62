//! Loader configuration

use figment::{
    providers::{Env, Format as _, Toml},
    Figment,
};
use serde::Deserialize;

use crate::batch::{DEFAULT_BATCH_SIZE, DEFAULT_INSERT_WIDTH};

/// Default warehouse connection pool size.
pub const DEFAULT_POOL_SIZE: u32 = 10;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read loader configuration: {0}")]
    Figment(#[from] figment::Error),

    #[error("batch_size must be at least 1")]
    InvalidBatchSize,

    #[error("insert_width must be at least 1")]
    InvalidInsertWidth,
}

/// Configuration for a load run.
///
/// Layered from an optional `loader.toml` and `LOADER_`-prefixed
/// environment variables, environment winning.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoaderConfig {
    /// Warehouse database URL. Unused by stores constructed elsewhere.
    pub database_url: Option<String>,

    /// Warehouse connection pool size.
    pub pool_size: u32,

    /// Source rows per batch.
    pub batch_size: usize,

    /// Per-row dimension inserts in flight within one batch.
    pub insert_width: usize,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            pool_size: DEFAULT_POOL_SIZE,
            batch_size: DEFAULT_BATCH_SIZE,
            insert_width: DEFAULT_INSERT_WIDTH,
        }
    }
}

impl LoaderConfig {
    /// Loads configuration from `loader.toml` (if present) and the
    /// environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_figment(
            Figment::new()
                .merge(Toml::file("loader.toml"))
                .merge(Env::prefixed("LOADER_")),
        )
    }

    /// Extracts and validates configuration from a prepared [`Figment`].
    pub fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size == 0 {
            return Err(ConfigError::InvalidBatchSize);
        }
        if self.insert_width == 0 {
            return Err(ConfigError::InvalidInsertWidth);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use figment::providers::{Format as _, Toml};

    use super::*;

    #[test]
    fn defaults_match_the_loader_constants() {
        let config = LoaderConfig::default();

        assert_eq!(config.batch_size, 10_000);
        assert_eq!(config.insert_width, 4);
        assert_eq!(config.pool_size, 10);
        assert!(config.database_url.is_none());
    }

    #[test]
    fn toml_overrides_defaults() {
        let figment = Figment::new().merge(Toml::string(
            r#"
            database_url = "postgres://localhost/warehouse"
            batch_size = 500
            "#,
        ));

        let config = LoaderConfig::from_figment(figment).unwrap();

        assert_eq!(config.batch_size, 500);
        assert_eq!(config.insert_width, 4);
        assert_eq!(
            config.database_url.as_deref(),
            Some("postgres://localhost/warehouse")
        );
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        let figment = Figment::new().merge(Toml::string("batch_size = 0"));

        let err = LoaderConfig::from_figment(figment).unwrap_err();

        assert!(matches!(err, ConfigError::InvalidBatchSize));
    }
}
