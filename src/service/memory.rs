//! In-process repository. Same contract as the PostgreSQL one, used for tests and
//! local runs without a database.

use crate::contract::{Entity, Mutation, Repository};
use crate::error::AppError;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

/// Identifiers are assigned sequentially from 1, like a BIGSERIAL column, so only
/// entities keyed by `i64` can be stored.
pub struct MemoryRepository<E> {
    inner: RwLock<Inner<E>>,
}

struct Inner<E> {
    next_id: i64,
    rows: BTreeMap<i64, E>,
}

impl<E: Entity<Id = i64>> Default for MemoryRepository<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Entity<Id = i64>> MemoryRepository<E> {
    pub fn new() -> Self {
        MemoryRepository {
            inner: RwLock::new(Inner {
                next_id: 1,
                rows: BTreeMap::new(),
            }),
        }
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.rows.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl<E: Entity<Id = i64>> Repository<E> for MemoryRepository<E> {
    async fn insert(&self, draft: E::Draft) -> Result<E, AppError> {
        let mut inner = self.inner.write().await;
        let mut row = match serde_json::to_value(&draft) {
            Ok(Value::Object(m)) => m,
            Ok(_) => return Err(AppError::BadRequest("draft must serialize to an object".into())),
            Err(e) => return Err(AppError::BadRequest(e.to_string())),
        };
        row.insert(E::TABLE.primary_key.to_string(), Value::from(inner.next_id));
        let entity: E = serde_json::from_value(Value::Object(row))
            .map_err(|e| AppError::Db(sqlx::Error::Decode(Box::new(e))))?;
        inner.next_id += 1;
        inner.rows.insert(entity.id(), entity.clone());
        Ok(entity)
    }

    async fn find(&self, id: E::Id) -> Result<Option<E>, AppError> {
        Ok(self.inner.read().await.rows.get(&id).cloned())
    }

    async fn list(&self, limit: u32, offset: u32) -> Result<Vec<E>, AppError> {
        Ok(self
            .inner
            .read()
            .await
            .rows
            .values()
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn modify(&self, id: E::Id, mutation: Mutation<E>) -> Result<Option<E>, AppError> {
        let mut inner = self.inner.write().await;
        let Some(entity) = inner.rows.get_mut(&id) else {
            return Ok(None);
        };
        mutation(entity);
        Ok(Some(entity.clone()))
    }

    async fn delete(&self, id: E::Id) -> Result<bool, AppError> {
        Ok(self.inner.write().await.rows.remove(&id).is_some())
    }

    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }
}
