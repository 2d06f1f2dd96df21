//! Startup sequence: context → schema bootstrap → registration → serve.
//!
//! Serving never starts before the schema is `Ready`. Registration is attempted (and
//! bounded by its timeout) before the listener binds, but its failure only costs
//! discoverability.

use crate::comments::{CommentLogic, COMMENT_SCHEMA};
use crate::config::ServiceConfig;
use crate::context::{CommentContext, PersistenceContext};
use crate::error::{SchemaBootstrapError, StartupError};
use crate::migration::{BootstrapReport, MigrationStore, SchemaBootstrapper, SchemaDefinition};
use crate::registration::{DirectoryClient, RegistrationStatus, WhiteLabelManager};
use crate::routes::router;
use crate::state::AppState;
use tokio::net::TcpListener;

/// Recorded in the migration history next to each migration id.
pub const PRODUCT_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Clone, Debug)]
pub struct StartupReport {
    pub bootstrap: BootstrapReport,
    pub registration: RegistrationStatus,
}

/// Bring the schema to `Ready`. Any error here must abort startup.
pub async fn bootstrap_schema<S: MigrationStore>(
    store: &S,
    schema: &SchemaDefinition,
) -> Result<BootstrapReport, SchemaBootstrapError> {
    let report = SchemaBootstrapper::new(store, schema, PRODUCT_VERSION).run().await?;
    tracing::info!(
        created = report.created(),
        seeded = report.seeded.len(),
        applied = report.applied.len(),
        "schema ready"
    );
    Ok(report)
}

/// Announce the service. Never fails; the outcome is reported instead.
pub async fn register<D: DirectoryClient>(
    config: &ServiceConfig,
    manager: &WhiteLabelManager<D>,
    context_type: &str,
) -> RegistrationStatus {
    manager
        .register_best_effort(
            &config.service_name,
            config.white_label_address.as_deref(),
            context_type,
        )
        .await
}

/// Bootstrap then register, strictly in that order.
pub async fn prepare<S: MigrationStore, D: DirectoryClient>(
    config: &ServiceConfig,
    store: &S,
    schema: &SchemaDefinition,
    manager: &WhiteLabelManager<D>,
    context_type: &str,
) -> Result<StartupReport, SchemaBootstrapError> {
    let bootstrap = bootstrap_schema(store, schema).await?;
    let registration = register(config, manager, context_type).await;
    Ok(StartupReport {
        bootstrap,
        registration,
    })
}

/// Run the comment service against PostgreSQL until the server stops.
pub async fn run(config: ServiceConfig) -> Result<(), StartupError> {
    let context = CommentContext::connect(&config).await?;
    let store = context.migration_store();

    let StartupReport {
        bootstrap,
        registration,
    } = match WhiteLabelManager::http(config.registration_timeout) {
        Ok(manager) => {
            prepare(&config, &store, &COMMENT_SCHEMA, &manager, CommentContext::CONTEXT_TYPE).await?
        }
        Err(e) => {
            tracing::warn!(error = %e, "white-label client unavailable");
            StartupReport {
                bootstrap: bootstrap_schema(&store, &COMMENT_SCHEMA).await?,
                registration: RegistrationStatus::Failed { reason: e.to_string() },
            }
        }
    };
    tracing::debug!(?bootstrap, ?registration, "startup complete");

    let logic = CommentLogic::resolve(context.repository());
    let app = router(AppState::new(logic, registration));

    let listener = TcpListener::bind(config.listen_addr).await?;
    tracing::info!(service = %config.service_name, "listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
