use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::api::{error::ApiError, state::AppState};

pub const API_KEY_HEADER: &str = "X-API-Key";

/// Guards the admin routes. Without a configured key nothing gets through.
pub async fn api_key_auth(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let provided = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok());

    let authorized = match (state.config.config.admin_api_key.as_deref(), provided) {
        (Some(expected), Some(provided)) => constant_time_eq(expected.as_bytes(), provided.as_bytes()),
        _ => false,
    };

    if !authorized {
        tracing::warn!(path = %request.uri().path(), "admin request rejected");
        return ApiError::new(StatusCode::UNAUTHORIZED, "unauthorized", "missing or invalid API key")
            .into_response();
    }

    next.run(request).await
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"secret", b"secret"));
        assert!(!constant_time_eq(b"secret", b"secreT"));
        assert!(!constant_time_eq(b"secret", b"secret2"));
        assert!(!constant_time_eq(b"", b"x"));
    }
}
