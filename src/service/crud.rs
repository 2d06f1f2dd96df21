//! Generic CRUD execution against PostgreSQL.

use crate::contract::{Entity, Mutation, Repository};
use crate::error::AppError;
use crate::sql::{delete, insert, select_by_id, select_for_update, select_list, update, QueryBuf};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};
use sqlx::PgPool;
use std::marker::PhantomData;

/// Repository for any [`Entity`] whose table descriptor matches a PostgreSQL table.
/// Every call checks a connection out of the pool (or opens a transaction) and returns it.
pub struct PgRepository<E> {
    pool: PgPool,
    _entity: PhantomData<fn() -> E>,
}

impl<E> Clone for PgRepository<E> {
    fn clone(&self) -> Self {
        PgRepository {
            pool: self.pool.clone(),
            _entity: PhantomData,
        }
    }
}

impl<E: Entity> PgRepository<E> {
    pub fn new(pool: PgPool) -> Self {
        PgRepository {
            pool,
            _entity: PhantomData,
        }
    }

    fn id_value(id: E::Id) -> Result<Value, AppError> {
        serde_json::to_value(id).map_err(|e| AppError::BadRequest(format!("id: {}", e)))
    }
}

#[async_trait]
impl<E: Entity> Repository<E> for PgRepository<E> {
    async fn insert(&self, draft: E::Draft) -> Result<E, AppError> {
        let q = insert(&E::TABLE, &to_object(&draft)?);
        let row = fetch_optional(&self.pool, &q)
            .await?
            .ok_or(AppError::Db(sqlx::Error::RowNotFound))?;
        from_row(row)
    }

    async fn find(&self, id: E::Id) -> Result<Option<E>, AppError> {
        let q = select_by_id(&E::TABLE, &Self::id_value(id)?);
        fetch_optional(&self.pool, &q).await?.map(from_row::<E>).transpose()
    }

    async fn list(&self, limit: u32, offset: u32) -> Result<Vec<E>, AppError> {
        let q = select_list(&E::TABLE, limit, offset);
        tracing::debug!(sql = %q.sql, "query");
        let rows = bind_all(&q).fetch_all(&self.pool).await?;
        rows.iter().map(|r| from_row::<E>(row_to_json(r))).collect()
    }

    async fn modify(&self, id: E::Id, mutation: Mutation<E>) -> Result<Option<E>, AppError> {
        let id_value = Self::id_value(id)?;
        let mut tx = self.pool.begin().await?;
        let locked = select_for_update(&E::TABLE, &id_value);
        tracing::debug!(sql = %locked.sql, params = ?locked.params, "query (tx)");
        let Some(row) = bind_all(&locked).fetch_optional(&mut *tx).await? else {
            return Ok(None);
        };
        let mut entity: E = from_row(row_to_json(&row))?;
        mutation(&mut entity);
        let q = update(&E::TABLE, &id_value, &to_object(&entity)?);
        tracing::debug!(sql = %q.sql, params = ?q.params, "query (tx)");
        let row = bind_all(&q).fetch_optional(&mut *tx).await?;
        tx.commit().await?;
        row.map(|r| from_row::<E>(row_to_json(&r))).transpose()
    }

    async fn delete(&self, id: E::Id) -> Result<bool, AppError> {
        let q = delete(&E::TABLE, &Self::id_value(id)?);
        Ok(fetch_optional(&self.pool, &q).await?.is_some())
    }

    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").fetch_optional(&self.pool).await?;
        Ok(())
    }
}

fn bind_all(q: &QueryBuf) -> sqlx::query::Query<'_, sqlx::Postgres, sqlx::postgres::PgArguments> {
    let mut query = sqlx::query(&q.sql);
    for p in &q.params {
        query = query.bind(p.clone());
    }
    query
}

async fn fetch_optional(pool: &PgPool, q: &QueryBuf) -> Result<Option<Value>, AppError> {
    tracing::debug!(sql = %q.sql, params = ?q.params, "query");
    let row = bind_all(q).fetch_optional(pool).await?;
    Ok(row.map(|r| row_to_json(&r)))
}

fn to_object<T: Serialize>(value: &T) -> Result<Map<String, Value>, AppError> {
    match serde_json::to_value(value) {
        Ok(Value::Object(m)) => Ok(m),
        Ok(other) => Err(AppError::BadRequest(format!("expected an object, got {}", other))),
        Err(e) => Err(AppError::BadRequest(e.to_string())),
    }
}

fn from_row<E: Entity>(row: Value) -> Result<E, AppError> {
    serde_json::from_value(row).map_err(|e| AppError::Db(sqlx::Error::Decode(Box::new(e))))
}

fn row_to_json(row: &sqlx::postgres::PgRow) -> Value {
    use sqlx::Column;
    use sqlx::Row;
    let mut map = Map::new();
    for col in row.columns() {
        let name = col.name();
        map.insert(name.to_string(), cell_to_value(row, name));
    }
    Value::Object(map)
}

/// Try the column as each supported type in turn; NULL of any type ends as `Value::Null`.
fn cell_to_value(row: &sqlx::postgres::PgRow, name: &str) -> Value {
    use sqlx::Row;
    if let Ok(Some(n)) = row.try_get::<Option<i16>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<i32>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<i64>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<f64>, _>(name) {
        if let Some(n) = serde_json::Number::from_f64(n) {
            return Value::Number(n);
        }
    }
    if let Ok(Some(b)) = row.try_get::<Option<bool>, _>(name) {
        return Value::Bool(b);
    }
    if let Ok(Some(u)) = row.try_get::<Option<uuid::Uuid>, _>(name) {
        return Value::String(u.to_string());
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(name) {
        return Value::String(d.to_rfc3339());
    }
    if let Ok(Some(s)) = row.try_get::<Option<String>, _>(name) {
        return Value::String(s);
    }
    if let Ok(Some(j)) = row.try_get::<Option<Value>, _>(name) {
        return j;
    }
    Value::Null
}
