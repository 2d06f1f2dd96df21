//! Compile-time binding of an entity to its add / update / read contract shapes.
//!
//! An [`Entity`] describes how a record is stored; the three contract traits describe
//! how callers create, modify and see it. [`ContractLogic`] ties one such quadruple
//! to a [`Repository`] once, by type, so no entity needs its own CRUD plumbing.

mod logic;

pub use logic::{page_bounds, ContractLogic, DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT};

use crate::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::{Debug, Display};

#[derive(Clone, Copy, Debug)]
pub struct ColumnDef {
    pub name: &'static str,
    /// PostgreSQL type used for `$n::type` casts when binding. `None` binds as-is (text).
    pub pg_type: Option<&'static str>,
    /// Whether the column has a DB default (e.g. BIGSERIAL, NOW()).
    pub has_default: bool,
}

/// Where and how an entity is stored.
#[derive(Clone, Copy, Debug)]
pub struct TableDescriptor {
    pub schema: &'static str,
    pub name: &'static str,
    pub primary_key: &'static str,
    pub columns: &'static [ColumnDef],
}

impl TableDescriptor {
    pub fn primary_key_type(&self) -> Option<&'static str> {
        self.columns
            .iter()
            .find(|c| c.name == self.primary_key)
            .and_then(|c| c.pg_type)
    }
}

/// Persisted record shape.
///
/// Entities round-trip through JSON objects keyed by column name; `Draft` is the
/// entity before the store has assigned its identifier.
pub trait Entity: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    type Id: Copy + Eq + Ord + Debug + Display + Serialize + Send + Sync + 'static;
    type Draft: Serialize + Send + Sync + 'static;

    const TABLE: TableDescriptor;

    fn id(&self) -> Self::Id;
}

/// Static per-field validation, checked against the contract's JSON form.
#[derive(Clone, Copy, Debug, Default)]
pub struct FieldRule {
    pub field: &'static str,
    pub required: bool,
    /// Character counts, not bytes.
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub pattern: Option<&'static str>,
}

/// Input shape for creation. Consumed once.
pub trait AddContract<E: Entity>: Serialize + Send + 'static {
    const RULES: &'static [FieldRule] = &[];

    fn into_draft(self, now: DateTime<Utc>) -> E::Draft;
}

/// Input shape for modification.
///
/// Serialization must omit unset fields: only fields present in the serialized form
/// are validated, and `apply` must leave every unset field of the entity untouched.
pub trait UpdateContract<E: Entity>: Serialize + Send + 'static {
    const RULES: &'static [FieldRule] = &[];

    fn id(&self) -> E::Id;

    fn apply(self, entity: &mut E, now: DateTime<Utc>);
}

/// Output shape returned to callers.
pub trait ReadContract<E: Entity>: Serialize + Send + 'static {
    fn from_entity(entity: &E) -> Self;
}

/// Mutation applied inside one unit of work by [`Repository::modify`].
pub type Mutation<E> = Box<dyn FnOnce(&mut E) + Send>;

/// Store-facing half of the contract logic. Each call is one unit of work: it
/// acquires its own connection or transaction and releases it before returning.
#[async_trait]
pub trait Repository<E: Entity>: Send + Sync + 'static {
    /// Persist a draft; the store assigns the identifier.
    async fn insert(&self, draft: E::Draft) -> Result<E, AppError>;

    async fn find(&self, id: E::Id) -> Result<Option<E>, AppError>;

    /// Ordered by identifier.
    async fn list(&self, limit: u32, offset: u32) -> Result<Vec<E>, AppError>;

    /// Read, mutate and write back atomically. `None` when the id does not exist.
    async fn modify(&self, id: E::Id, mutation: Mutation<E>) -> Result<Option<E>, AppError>;

    /// `false` when nothing was deleted.
    async fn delete(&self, id: E::Id) -> Result<bool, AppError>;

    /// Cheap liveness probe used by readiness checks.
    async fn ping(&self) -> Result<(), AppError>;
}
