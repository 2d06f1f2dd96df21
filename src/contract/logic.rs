use super::{AddContract, Entity, ReadContract, Repository, UpdateContract};
use crate::error::AppError;
use crate::service::RequestValidator;
use chrono::Utc;
use serde::Serialize;
use serde_json::{Map, Value};
use std::marker::PhantomData;

pub const DEFAULT_LIST_LIMIT: u32 = 100;
pub const MAX_LIST_LIMIT: u32 = 1000;

/// Effective `(limit, offset)` for a list request: defaults filled in, limit clamped.
pub fn page_bounds(limit: Option<u32>, offset: Option<u32>) -> (u32, u32) {
    (
        limit.unwrap_or(DEFAULT_LIST_LIMIT).min(MAX_LIST_LIMIT),
        offset.unwrap_or(0),
    )
}

/// CRUD translation between entity `E` and its contracts `A` (add), `U` (update),
/// `R` (read), backed by repository `S`.
///
/// No locking of its own: concurrent calls on the same id rely on the store.
pub struct ContractLogic<E, A, U, R, S> {
    repository: S,
    _contracts: PhantomData<fn(A, U) -> (E, R)>,
}

impl<E, A, U, R, S> ContractLogic<E, A, U, R, S>
where
    E: Entity,
    A: AddContract<E>,
    U: UpdateContract<E>,
    R: ReadContract<E>,
    S: Repository<E>,
{
    /// Bind the contract triple for `E` onto `repository`.
    pub fn resolve(repository: S) -> Self {
        ContractLogic {
            repository,
            _contracts: PhantomData,
        }
    }

    pub fn repository(&self) -> &S {
        &self.repository
    }

    pub async fn add(&self, contract: A) -> Result<R, AppError> {
        RequestValidator::validate(&to_object(&contract)?, A::RULES)?;
        let entity = self.repository.insert(contract.into_draft(Utc::now())).await?;
        tracing::debug!(table = E::TABLE.name, id = %entity.id(), "added");
        Ok(R::from_entity(&entity))
    }

    /// Applies only the fields set on `contract`; everything else keeps its stored value.
    pub async fn update(&self, contract: U) -> Result<R, AppError> {
        RequestValidator::validate_partial(&to_object(&contract)?, U::RULES)?;
        let id = contract.id();
        let now = Utc::now();
        let updated = self
            .repository
            .modify(id, Box::new(move |entity: &mut E| contract.apply(entity, now)))
            .await?
            .ok_or_else(|| not_found::<E>(id))?;
        tracing::debug!(table = E::TABLE.name, %id, "updated");
        Ok(R::from_entity(&updated))
    }

    pub async fn get(&self, id: E::Id) -> Result<R, AppError> {
        let entity = self.repository.find(id).await?.ok_or_else(|| not_found::<E>(id))?;
        Ok(R::from_entity(&entity))
    }

    /// Limit defaults to 100 and is capped at 1000; offset defaults to 0.
    pub async fn list(&self, limit: Option<u32>, offset: Option<u32>) -> Result<Vec<R>, AppError> {
        let (limit, offset) = page_bounds(limit, offset);
        let rows = self.repository.list(limit, offset).await?;
        Ok(rows.iter().map(R::from_entity).collect())
    }

    /// Deleting an id that is already gone is `NotFound`, not a silent success.
    pub async fn delete(&self, id: E::Id) -> Result<(), AppError> {
        if !self.repository.delete(id).await? {
            return Err(not_found::<E>(id));
        }
        tracing::debug!(table = E::TABLE.name, %id, "deleted");
        Ok(())
    }
}

fn not_found<E: Entity>(id: E::Id) -> AppError {
    AppError::NotFound(format!("{} {}", E::TABLE.name, id))
}

fn to_object<T: Serialize>(contract: &T) -> Result<Map<String, Value>, AppError> {
    match serde_json::to_value(contract) {
        Ok(Value::Object(m)) => Ok(m),
        Ok(_) => Err(AppError::BadRequest("contract must serialize to an object".into())),
        Err(e) => Err(AppError::BadRequest(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_bounds_fill_defaults_and_clamp() {
        assert_eq!(page_bounds(None, None), (DEFAULT_LIST_LIMIT, 0));
        assert_eq!(page_bounds(Some(10), Some(30)), (10, 30));
        assert_eq!(page_bounds(Some(MAX_LIST_LIMIT + 1), None), (MAX_LIST_LIMIT, 0));
    }
}
