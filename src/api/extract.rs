use axum::extract::{rejection::JsonRejection, FromRequest};

use crate::api::error::ApiError;

/// `axum::Json` whose rejections render as `invalid_input` error bodies.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}
