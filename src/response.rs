//! `{"data": …}` envelopes for comment responses. Lists also echo their page.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct Page {
    pub count: usize,
    pub limit: u32,
    pub offset: u32,
}

#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Page>,
    #[serde(skip)]
    status: StatusCode,
}

impl<T: Serialize> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Envelope {
            data,
            meta: None,
            status: StatusCode::OK,
        }
    }

    pub fn created(data: T) -> Self {
        Envelope {
            status: StatusCode::CREATED,
            ..Envelope::ok(data)
        }
    }
}

impl<T: Serialize> Envelope<Vec<T>> {
    /// `limit` and `offset` as actually applied, after clamping.
    pub fn page(data: Vec<T>, limit: u32, offset: u32) -> Self {
        let count = data.len();
        Envelope {
            meta: Some(Page { count, limit, offset }),
            ..Envelope::ok(data)
        }
    }
}

impl<T: Serialize> IntoResponse for Envelope<T> {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}
