//! Common routes: health, readiness, version.

use crate::comments::CommentEntity;
use crate::contract::Repository;
use crate::registration::RegistrationStatus;
use crate::state::AppState;
use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::Serialize;

#[derive(Serialize)]
struct HealthBody {
    status: &'static str,
}

#[derive(Serialize)]
struct ReadyBody {
    status: &'static str,
    database: &'static str,
    /// Informational: an unregistered service still serves requests.
    registration: RegistrationStatus,
}

async fn health() -> Json<HealthBody> {
    Json(HealthBody { status: "ok" })
}

async fn ready<S: Repository<CommentEntity>>(
    State(state): State<AppState<S>>,
) -> (StatusCode, Json<ReadyBody>) {
    let registration = state.registration.as_ref().clone();
    if state.logic.repository().ping().await.is_err() {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ReadyBody {
                status: "degraded",
                database: "unavailable",
                registration,
            }),
        );
    }
    (
        StatusCode::OK,
        Json(ReadyBody {
            status: "ok",
            database: "ok",
            registration,
        }),
    )
}

async fn version() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// GET /health, GET /ready (store check + registration outcome), GET /version.
pub fn common_routes<S: Repository<CommentEntity>>(state: AppState<S>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready::<S>))
        .route("/version", get(version))
        .with_state(state)
}
