//! Comment microservice: generic contract logic over one entity, idempotent schema
//! bootstrap, and white-label directory registration.

pub mod comments;
pub mod config;
pub mod context;
pub mod contract;
pub mod error;
pub mod handlers;
pub mod migration;
pub mod registration;
pub mod response;
pub mod routes;
pub mod service;
pub mod sql;
pub mod startup;
pub mod state;
pub mod store;

pub use comments::{AddCommentContract, CommentContract, CommentEntity, CommentLogic, UpdateCommentContract, COMMENT_SCHEMA};
pub use config::ServiceConfig;
pub use context::{CommentContext, PersistenceContext};
pub use contract::{ContractLogic, Entity, Repository};
pub use error::{AppError, ConfigError, RegistrationError, SchemaBootstrapError, StartupError};
pub use migration::{MemoryMigrationStore, MigrationStore, SchemaBootstrapper};
pub use registration::{HttpDirectoryClient, RegistrationStatus, WhiteLabelManager};
pub use routes::router;
pub use service::{MemoryRepository, PgRepository};
pub use startup::{prepare, run};
pub use state::AppState;
pub use store::PgMigrationStore;
