//! Schema bootstrap: bring the database to a fully migrated state before serving.
//!
//! A database without the schema gets the current model in one transaction, together
//! with a history record for every declared migration (the fresh model already
//! reflects all of them). A database with the schema gets each pending migration
//! applied in declaration order, one transaction per migration. Any failure is fatal.

mod memory;

pub use memory::MemoryMigrationStore;

use crate::error::SchemaBootstrapError;
use async_trait::async_trait;
use std::collections::HashSet;

/// One schema change, identified by a stable id.
#[derive(Clone, Copy, Debug)]
pub struct Migration {
    pub id: &'static str,
    pub statements: &'static [&'static str],
}

/// Everything the bootstrapper needs to know about a schema, declared statically.
#[derive(Clone, Copy, Debug)]
pub struct SchemaDefinition {
    /// Table whose presence means "schema exists", e.g. `public.comments`.
    pub sentinel_table: &'static str,
    /// DDL for the current model on an empty database.
    pub model: &'static [&'static str],
    /// Oldest first.
    pub migrations: &'static [Migration],
}

impl SchemaDefinition {
    pub fn check_unique_ids(&self) -> Result<(), SchemaBootstrapError> {
        let mut seen = HashSet::new();
        for m in self.migrations {
            if !seen.insert(m.id) {
                return Err(SchemaBootstrapError::DuplicateMigration(m.id.to_string()));
            }
        }
        Ok(())
    }
}

/// Row of the migration history table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MigrationRecord {
    pub migration_id: String,
    pub product_version: String,
}

impl MigrationRecord {
    pub fn new(migration: &Migration, product_version: &str) -> Self {
        MigrationRecord {
            migration_id: migration.id.to_string(),
            product_version: product_version.to_string(),
        }
    }
}

/// Database operations the bootstrapper drives.
#[async_trait]
pub trait MigrationStore: Send + Sync {
    async fn schema_exists(&self, schema: &SchemaDefinition) -> Result<bool, sqlx::Error>;

    /// Run the model DDL, create the history table and insert `records`, all in one transaction.
    async fn create_schema(
        &self,
        schema: &SchemaDefinition,
        records: &[MigrationRecord],
    ) -> Result<(), sqlx::Error>;

    /// Ids recorded in history; empty when the history table does not exist yet.
    /// Read-only: a fully migrated database sees no DDL.
    async fn applied_migrations(&self) -> Result<Vec<String>, sqlx::Error>;

    /// Run the migration's statements and insert `record` in one transaction, creating
    /// the history table first if it is missing.
    async fn apply_migration(
        &self,
        migration: &Migration,
        record: &MigrationRecord,
    ) -> Result<(), sqlx::Error>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BootstrapState {
    Unknown,
    SchemaAbsent,
    SchemaPresent,
    Ready,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BootstrapReport {
    /// What detection found.
    pub detected: BootstrapState,
    pub state: BootstrapState,
    /// Migration ids recorded as applied when the schema was created fresh.
    pub seeded: Vec<String>,
    /// Migration ids executed against an existing schema.
    pub applied: Vec<String>,
}

impl BootstrapReport {
    pub fn created(&self) -> bool {
        self.detected == BootstrapState::SchemaAbsent
    }
}

pub struct SchemaBootstrapper<'a, S> {
    store: &'a S,
    schema: &'a SchemaDefinition,
    product_version: String,
}

impl<'a, S: MigrationStore> SchemaBootstrapper<'a, S> {
    pub fn new(store: &'a S, schema: &'a SchemaDefinition, product_version: impl Into<String>) -> Self {
        SchemaBootstrapper {
            store,
            schema,
            product_version: product_version.into(),
        }
    }

    pub async fn run(&self) -> Result<BootstrapReport, SchemaBootstrapError> {
        self.schema.check_unique_ids()?;

        let exists = self
            .store
            .schema_exists(self.schema)
            .await
            .map_err(SchemaBootstrapError::Detect)?;
        let state = transition(
            BootstrapState::Unknown,
            if exists {
                BootstrapState::SchemaPresent
            } else {
                BootstrapState::SchemaAbsent
            },
        );

        let mut report = BootstrapReport {
            detected: state,
            state,
            seeded: Vec::new(),
            applied: Vec::new(),
        };
        match state {
            BootstrapState::SchemaAbsent => report.seeded = self.create().await?,
            _ => report.applied = self.migrate().await?,
        }
        report.state = transition(state, BootstrapState::Ready);
        Ok(report)
    }

    async fn create(&self) -> Result<Vec<String>, SchemaBootstrapError> {
        let records: Vec<MigrationRecord> = self
            .schema
            .migrations
            .iter()
            .map(|m| MigrationRecord::new(m, &self.product_version))
            .collect();
        self.store
            .create_schema(self.schema, &records)
            .await
            .map_err(SchemaBootstrapError::Create)?;
        tracing::info!(
            table = self.schema.sentinel_table,
            seeded = records.len(),
            "schema created"
        );
        Ok(records.into_iter().map(|r| r.migration_id).collect())
    }

    async fn migrate(&self) -> Result<Vec<String>, SchemaBootstrapError> {
        let recorded: HashSet<String> = self
            .store
            .applied_migrations()
            .await
            .map_err(SchemaBootstrapError::History)?
            .into_iter()
            .collect();
        let known: HashSet<&str> = self.schema.migrations.iter().map(|m| m.id).collect();
        for id in recorded.iter().filter(|id| !known.contains(id.as_str())) {
            tracing::warn!(migration = %id, "history holds a migration this build does not know");
        }

        let mut applied = Vec::new();
        for m in self.schema.migrations {
            if recorded.contains(m.id) {
                continue;
            }
            let record = MigrationRecord::new(m, &self.product_version);
            self.store
                .apply_migration(m, &record)
                .await
                .map_err(|source| SchemaBootstrapError::Migration {
                    id: m.id.to_string(),
                    source,
                })?;
            tracing::info!(migration = m.id, "migration applied");
            applied.push(m.id.to_string());
        }
        if applied.is_empty() {
            tracing::info!("schema up to date");
        }
        Ok(applied)
    }
}

fn transition(from: BootstrapState, to: BootstrapState) -> BootstrapState {
    tracing::debug!(?from, ?to, "bootstrap state");
    to
}

#[cfg(test)]
mod tests {
    use super::*;

    static SCHEMA: SchemaDefinition = SchemaDefinition {
        sentinel_table: "public.widgets",
        model: &["CREATE TABLE widgets (id BIGINT, name TEXT)"],
        migrations: &[
            Migration {
                id: "001_widgets",
                statements: &["CREATE TABLE widgets (id BIGINT)"],
            },
            Migration {
                id: "002_widget_name",
                statements: &["ALTER TABLE widgets ADD COLUMN name TEXT"],
            },
        ],
    };

    static DUPLICATED: SchemaDefinition = SchemaDefinition {
        sentinel_table: "public.widgets",
        model: &[],
        migrations: &[
            Migration { id: "001", statements: &[] },
            Migration { id: "001", statements: &[] },
        ],
    };

    #[tokio::test]
    async fn fresh_store_is_created_and_seeded() {
        let store = MemoryMigrationStore::new();
        let report = SchemaBootstrapper::new(&store, &SCHEMA, "1.0.0").run().await.unwrap();

        assert_eq!(report.detected, BootstrapState::SchemaAbsent);
        assert_eq!(report.state, BootstrapState::Ready);
        assert!(report.created());
        assert_eq!(report.seeded, vec!["001_widgets", "002_widget_name"]);
        assert!(report.applied.is_empty());

        assert_eq!(store.executed().await, SCHEMA.model);
        let history = store.history().await;
        assert_eq!(history.len(), 2);
        assert!(history.iter().all(|r| r.product_version == "1.0.0"));
    }

    #[tokio::test]
    async fn second_run_is_a_no_op() {
        let store = MemoryMigrationStore::new();
        SchemaBootstrapper::new(&store, &SCHEMA, "1.0.0").run().await.unwrap();
        let executed = store.executed().await.len();
        let recorded = store.history().await.len();

        let report = SchemaBootstrapper::new(&store, &SCHEMA, "1.0.0").run().await.unwrap();
        assert_eq!(report.detected, BootstrapState::SchemaPresent);
        assert!(report.seeded.is_empty());
        assert!(report.applied.is_empty());
        assert_eq!(store.executed().await.len(), executed);
        assert_eq!(store.history().await.len(), recorded);
    }

    #[tokio::test]
    async fn pending_migrations_apply_in_order() {
        let store = MemoryMigrationStore::with_existing_schema(&["001_widgets"]);
        let report = SchemaBootstrapper::new(&store, &SCHEMA, "1.1.0").run().await.unwrap();

        assert_eq!(report.applied, vec!["002_widget_name"]);
        assert_eq!(store.executed().await, vec!["ALTER TABLE widgets ADD COLUMN name TEXT"]);
        let history = store.history().await;
        assert_eq!(history.last().unwrap().migration_id, "002_widget_name");
        assert_eq!(history.last().unwrap().product_version, "1.1.0");
    }

    #[tokio::test]
    async fn missing_history_table_is_created_with_the_first_migration() {
        let store = MemoryMigrationStore::with_existing_schema(&[]);
        assert!(!store.has_history_table().await);

        let report = SchemaBootstrapper::new(&store, &SCHEMA, "1.0.0").run().await.unwrap();
        assert_eq!(report.applied, vec!["001_widgets", "002_widget_name"]);
        assert!(store.has_history_table().await);
        assert_eq!(store.history().await.len(), 2);
    }

    #[tokio::test]
    async fn up_to_date_schema_sees_no_history_ddl() {
        let store = MemoryMigrationStore::with_existing_schema(&["001_widgets", "002_widget_name"]);
        let report = SchemaBootstrapper::new(&store, &SCHEMA, "1.0.0").run().await.unwrap();
        assert!(report.applied.is_empty());
        assert_eq!(store.history_table_creations().await, 0);
        assert!(store.executed().await.is_empty());
    }

    #[tokio::test]
    async fn failed_migration_stops_the_sequence() {
        let store = MemoryMigrationStore::with_existing_schema(&[]);
        store.fail_migration("001_widgets").await;

        let err = SchemaBootstrapper::new(&store, &SCHEMA, "1.0.0").run().await.unwrap_err();
        assert!(matches!(err, SchemaBootstrapError::Migration { ref id, .. } if id == "001_widgets"));
        assert!(store.history().await.is_empty());
        assert!(store.executed().await.is_empty());
        assert!(!store.has_history_table().await);
    }

    #[tokio::test]
    async fn failed_creation_leaves_nothing_behind() {
        let store = MemoryMigrationStore::new();
        store.fail_create().await;

        let err = SchemaBootstrapper::new(&store, &SCHEMA, "1.0.0").run().await.unwrap_err();
        assert!(matches!(err, SchemaBootstrapError::Create(_)));
        assert!(store.history().await.is_empty());
        assert!(!store.schema_exists(&SCHEMA).await.unwrap());
    }

    #[tokio::test]
    async fn duplicate_ids_are_rejected_before_touching_the_store() {
        let store = MemoryMigrationStore::new();
        let err = SchemaBootstrapper::new(&store, &DUPLICATED, "1.0.0").run().await.unwrap_err();
        assert!(matches!(err, SchemaBootstrapError::DuplicateMigration(ref id) if id == "001"));
        assert!(store.executed().await.is_empty());
    }
}
