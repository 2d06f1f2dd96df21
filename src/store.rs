//! PostgreSQL side of the schema bootstrap: database creation, schema detection,
//! and the migration history table.

use crate::error::StartupError;
use crate::migration::{Migration, MigrationRecord, MigrationStore, SchemaDefinition};
use async_trait::async_trait;
use sqlx::ConnectOptions;
use sqlx::PgPool;
use std::str::FromStr;

/// History table name; lives in the connection's default schema.
pub const HISTORY_TABLE: &str = "__migrations_history";

#[derive(Clone)]
pub struct PgMigrationStore {
    pool: PgPool,
}

impl PgMigrationStore {
    pub fn new(pool: PgPool) -> Self {
        PgMigrationStore { pool }
    }

    fn history_ddl() -> String {
        format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                migration_id TEXT PRIMARY KEY,
                product_version TEXT NOT NULL
            )
            "#,
            quote_ident(HISTORY_TABLE)
        )
    }

    fn insert_history_sql() -> String {
        format!(
            "INSERT INTO {} (migration_id, product_version) VALUES ($1, $2)",
            quote_ident(HISTORY_TABLE)
        )
    }
}

#[async_trait]
impl MigrationStore for PgMigrationStore {
    async fn schema_exists(&self, schema: &SchemaDefinition) -> Result<bool, sqlx::Error> {
        let exists: (bool,) = sqlx::query_as("SELECT to_regclass($1::text) IS NOT NULL")
            .bind(schema.sentinel_table)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists.0)
    }

    async fn create_schema(
        &self,
        schema: &SchemaDefinition,
        records: &[MigrationRecord],
    ) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        for statement in schema.model {
            tracing::debug!(sql = %statement, "schema");
            sqlx::query(statement).execute(&mut *tx).await?;
        }
        sqlx::query(&Self::history_ddl()).execute(&mut *tx).await?;
        let insert = Self::insert_history_sql();
        for record in records {
            sqlx::query(&insert)
                .bind(&record.migration_id)
                .bind(&record.product_version)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await
    }

    async fn applied_migrations(&self) -> Result<Vec<String>, sqlx::Error> {
        let present: (bool,) = sqlx::query_as("SELECT to_regclass($1::text) IS NOT NULL")
            .bind(quote_ident(HISTORY_TABLE))
            .fetch_one(&self.pool)
            .await?;
        if !present.0 {
            return Ok(Vec::new());
        }
        let rows: Vec<(String,)> = sqlx::query_as(&format!(
            "SELECT migration_id FROM {} ORDER BY migration_id",
            quote_ident(HISTORY_TABLE)
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|r| r.0).collect())
    }

    async fn apply_migration(
        &self,
        migration: &Migration,
        record: &MigrationRecord,
    ) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        // Only reached with a pending migration; a missing history table is created with it.
        sqlx::query(&Self::history_ddl()).execute(&mut *tx).await?;
        for statement in migration.statements {
            tracing::debug!(migration = migration.id, sql = %statement, "schema");
            sqlx::query(statement).execute(&mut *tx).await?;
        }
        sqlx::query(&Self::insert_history_sql())
            .bind(&record.migration_id)
            .bind(&record.product_version)
            .execute(&mut *tx)
            .await?;
        tx.commit().await
    }
}

/// Ensure the database in `database_url` exists; create it if not. Connects to the
/// default `postgres` database to run CREATE DATABASE. Call before creating the main pool.
pub async fn ensure_database_exists(database_url: &str) -> Result<(), StartupError> {
    let (admin_url, db_name) = parse_db_name_from_url(database_url)?;
    if db_name.is_empty() || db_name == "postgres" {
        return Ok(());
    }
    let opts = sqlx::postgres::PgConnectOptions::from_str(&admin_url)?;
    let mut conn: sqlx::PgConnection = opts.connect().await?;
    let exists: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
        .bind(&db_name)
        .fetch_one(&mut conn)
        .await?;
    if !exists.0 {
        tracing::info!(database = %db_name, "creating database");
        sqlx::query(&format!("CREATE DATABASE {}", quote_ident(&db_name)))
            .execute(&mut conn)
            .await?;
    }
    Ok(())
}

fn parse_db_name_from_url(url: &str) -> Result<(String, String), StartupError> {
    let scheme_end = url.find("://").map(|i| i + 3).unwrap_or(0);
    let path_start = url
        .get(scheme_end..)
        .and_then(|rest| rest.find('/'))
        .map(|i| scheme_end + i + 1)
        .ok_or_else(|| {
            crate::error::ConfigError::Invalid {
                key: "DATABASE_URL",
                message: "no database path".into(),
            }
        })?;
    let path_and_query = url.get(path_start..).unwrap_or("");
    let mut parts = path_and_query.splitn(2, '?');
    let db_name = parts.next().unwrap_or("").trim();
    let query = parts.next().map(|q| format!("?{}", q)).unwrap_or_default();
    let base = url.get(..path_start).unwrap_or(url);
    let admin_url = format!("{}postgres{}", base, query);
    Ok((admin_url, db_name.to_string()))
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
