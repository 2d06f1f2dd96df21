//! Comment handlers: thin glue from HTTP onto the contract logic.

use crate::comments::{AddCommentContract, CommentEntity, UpdateCommentContract};
use crate::contract::{page_bounds, Repository};
use crate::error::AppError;
use crate::response::Envelope;
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

fn parse_id(id_str: &str) -> Result<i64, AppError> {
    id_str
        .parse()
        .map_err(|_| AppError::BadRequest(format!("invalid id '{}'", id_str)))
}

pub async fn create<S: Repository<CommentEntity>>(
    State(state): State<AppState<S>>,
    Json(contract): Json<AddCommentContract>,
) -> Result<impl IntoResponse, AppError> {
    let created = state.logic.add(contract).await?;
    Ok(Envelope::created(created))
}

pub async fn list<S: Repository<CommentEntity>>(
    State(state): State<AppState<S>>,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, AppError> {
    let (limit, offset) = page_bounds(params.limit, params.offset);
    let rows = state.logic.list(Some(limit), Some(offset)).await?;
    Ok(Envelope::page(rows, limit, offset))
}

pub async fn read<S: Repository<CommentEntity>>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let comment = state.logic.get(parse_id(&id)?).await?;
    Ok(Envelope::ok(comment))
}

/// The path id wins over any id in the body.
pub async fn update<S: Repository<CommentEntity>>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
    Json(mut contract): Json<UpdateCommentContract>,
) -> Result<impl IntoResponse, AppError> {
    contract.id = parse_id(&id)?;
    let updated = state.logic.update(contract).await?;
    Ok(Envelope::ok(updated))
}

pub async fn delete<S: Repository<CommentEntity>>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    state.logic.delete(parse_id(&id)?).await?;
    Ok(StatusCode::NO_CONTENT)
}
