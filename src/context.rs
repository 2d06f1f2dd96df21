//! Persistence context: the configured handle to the relational store.

use crate::comments::CommentEntity;
use crate::config::ServiceConfig;
use crate::error::StartupError;
use crate::service::PgRepository;
use crate::store::{ensure_database_exists, PgMigrationStore};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;

/// A storage context that can be announced to the white-label directory.
pub trait PersistenceContext {
    /// Stable identifier of the context type, sent during registration.
    const CONTEXT_TYPE: &'static str;
}

/// Comment storage over a PostgreSQL pool.
#[derive(Clone)]
pub struct CommentContext {
    pool: PgPool,
}

impl PersistenceContext for CommentContext {
    const CONTEXT_TYPE: &'static str = "CommentContext";
}

impl CommentContext {
    /// Create the database if missing, then open the pool.
    pub async fn connect(config: &ServiceConfig) -> Result<Self, StartupError> {
        ensure_database_exists(&config.database_url).await?;
        let pool = PgPoolOptions::new()
            .max_connections(config.database.max_connections)
            .acquire_timeout(Duration::from_secs(config.database.acquire_timeout_secs))
            .connect(&config.database_url)
            .await?;
        Ok(CommentContext { pool })
    }

    pub fn migration_store(&self) -> PgMigrationStore {
        PgMigrationStore::new(self.pool.clone())
    }

    pub fn repository(&self) -> PgRepository<CommentEntity> {
        PgRepository::new(self.pool.clone())
    }
}
