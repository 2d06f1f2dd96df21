//! The comment entity, its contracts, and its schema.

mod contracts;
mod entity;
mod schema;

pub use contracts::{AddCommentContract, CommentContract, UpdateCommentContract};
pub use entity::{CommentDraft, CommentEntity};
pub use schema::COMMENT_SCHEMA;

use crate::contract::ContractLogic;

/// Contract logic for comments over repository `S`.
pub type CommentLogic<S> =
    ContractLogic<CommentEntity, AddCommentContract, UpdateCommentContract, CommentContract, S>;
