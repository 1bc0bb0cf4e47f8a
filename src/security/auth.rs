use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};

use crate::AppState;
use crate::error::ApiError;

/// Bearer token presented by the caller, inserted as a request extension.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiKey(pub String);

pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string);

    let security = &state.config.security;
    let Some(token) = token else {
        if security.auth_required {
            return Err(ApiError::Unauthorized);
        }
        return Ok(next.run(request).await);
    };

    if !security.api_keys.is_empty() && !security.api_keys.contains(&token) {
        tracing::debug!(name: "auth.rejected", "Unknown API key");
        return Err(ApiError::Unauthorized);
    }

    request.extensions_mut().insert(ApiKey(token));
    Ok(next.run(request).await)
}
