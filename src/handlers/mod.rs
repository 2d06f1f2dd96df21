//! HTTP handlers for the comment API.

pub mod comment;
