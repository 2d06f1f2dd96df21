//! Comment CRUD routes.

use crate::comments::CommentEntity;
use crate::contract::Repository;
use crate::handlers::comment::{create, delete, list, read, update};
use crate::state::AppState;
use axum::{routing::get, Router};

pub fn comment_routes<S: Repository<CommentEntity>>(state: AppState<S>) -> Router {
    Router::new()
        .route("/comments", get(list::<S>).post(create::<S>))
        .route(
            "/comments/:id",
            get(read::<S>).patch(update::<S>).delete(delete::<S>),
        )
        .with_state(state)
}
