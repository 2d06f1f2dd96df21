//! HTTP surface: common probes plus the comment API under `/api/v1`.

mod comment;
mod common;

pub use comment::comment_routes;
pub use common::common_routes;

use crate::comments::CommentEntity;
use crate::contract::Repository;
use crate::state::AppState;
use axum::Router;
use tower_http::limit::RequestBodyLimitLayer;

pub const BODY_LIMIT_BYTES: usize = 64 * 1024;

pub fn router<S: Repository<CommentEntity>>(state: AppState<S>) -> Router {
    Router::new()
        .merge(common_routes(state.clone()))
        .nest("/api/v1", comment_routes(state))
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT_BYTES))
}
