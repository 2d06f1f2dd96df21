use super::{Migration, MigrationRecord, MigrationStore, SchemaDefinition};
use async_trait::async_trait;
use tokio::sync::Mutex;

/// In-process migration store. Records every schema-altering statement it is asked
/// to run so callers can assert on what a bootstrap actually did.
#[derive(Default)]
pub struct MemoryMigrationStore {
    inner: Mutex<State>,
}

#[derive(Default)]
struct State {
    schema_created: bool,
    history_table: bool,
    history_table_creations: usize,
    executed: Vec<String>,
    history: Vec<MigrationRecord>,
    fail_create: bool,
    fail_migration: Option<String>,
}

impl MemoryMigrationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A database whose schema predates this process, with `applied` already in history.
    /// An empty `applied` means the history table was never created.
    pub fn with_existing_schema(applied: &[&str]) -> Self {
        let state = State {
            schema_created: true,
            history_table: !applied.is_empty(),
            history: applied
                .iter()
                .map(|id| MigrationRecord {
                    migration_id: id.to_string(),
                    product_version: "0.0.0".into(),
                })
                .collect(),
            ..State::default()
        };
        MemoryMigrationStore {
            inner: Mutex::new(state),
        }
    }

    pub async fn fail_create(&self) {
        self.inner.lock().await.fail_create = true;
    }

    pub async fn fail_migration(&self, id: &str) {
        self.inner.lock().await.fail_migration = Some(id.to_string());
    }

    /// Schema-altering statements executed so far, in order.
    pub async fn executed(&self) -> Vec<String> {
        self.inner.lock().await.executed.clone()
    }

    pub async fn history(&self) -> Vec<MigrationRecord> {
        self.inner.lock().await.history.clone()
    }

    pub async fn has_history_table(&self) -> bool {
        self.inner.lock().await.history_table
    }

    /// How many times the history table had to be created.
    pub async fn history_table_creations(&self) -> usize {
        self.inner.lock().await.history_table_creations
    }
}

impl State {
    fn ensure_history_table(&mut self) {
        if !self.history_table {
            self.history_table = true;
            self.history_table_creations += 1;
        }
    }
}

#[async_trait]
impl MigrationStore for MemoryMigrationStore {
    async fn schema_exists(&self, _schema: &SchemaDefinition) -> Result<bool, sqlx::Error> {
        Ok(self.inner.lock().await.schema_created)
    }

    async fn create_schema(
        &self,
        schema: &SchemaDefinition,
        records: &[MigrationRecord],
    ) -> Result<(), sqlx::Error> {
        let mut state = self.inner.lock().await;
        if state.fail_create {
            return Err(sqlx::Error::Protocol("injected schema creation failure".into()));
        }
        if records
            .iter()
            .any(|r| state.history.iter().any(|h| h.migration_id == r.migration_id))
        {
            return Err(sqlx::Error::Protocol("duplicate migration_id in history".into()));
        }
        state.executed.extend(schema.model.iter().map(|s| s.to_string()));
        state.schema_created = true;
        state.ensure_history_table();
        state.history.extend_from_slice(records);
        Ok(())
    }

    async fn applied_migrations(&self) -> Result<Vec<String>, sqlx::Error> {
        let state = self.inner.lock().await;
        if !state.history_table {
            return Ok(Vec::new());
        }
        Ok(state.history.iter().map(|r| r.migration_id.clone()).collect())
    }

    async fn apply_migration(
        &self,
        migration: &Migration,
        record: &MigrationRecord,
    ) -> Result<(), sqlx::Error> {
        let mut state = self.inner.lock().await;
        if state.fail_migration.as_deref() == Some(migration.id) {
            return Err(sqlx::Error::Protocol(format!("injected failure in {}", migration.id)));
        }
        if state.history.iter().any(|h| h.migration_id == record.migration_id) {
            return Err(sqlx::Error::Protocol("duplicate migration_id in history".into()));
        }
        state.ensure_history_table();
        state.executed.extend(migration.statements.iter().map(|s| s.to_string()));
        state.history.push(record.clone());
        Ok(())
    }
}
