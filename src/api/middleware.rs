use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use tracing::{debug, warn};

use super::{responses::ErrorResponse, state::AppState};
use crate::auth::AuthError;

/// Bearer-token middleware.
///
/// On success the authenticated [`crate::auth::Teacher`] is inserted as a
/// request extension for the handlers.
pub async fn auth_middleware(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ErrorResponse> {
    let token = bearer_token(&headers).ok_or_else(|| {
        warn!("Missing bearer token");
        ErrorResponse::unauthorized(AuthError::Missing.to_string())
    })?;

    let claims = state.tokens.verify(token).map_err(|e| {
        warn!("Rejected token: {}", e);
        ErrorResponse::unauthorized(e.to_string())
    })?;

    let Some(teacher) = state.credentials.find_by_id(&claims.sub) else {
        warn!("Token subject {} is not a known teacher", claims.sub);
        return Err(ErrorResponse::unauthorized(AuthError::Invalid.to_string()));
    };

    debug!("Authenticated teacher {}", teacher.id);
    request.extensions_mut().insert(teacher);
    Ok(next.run(request).await)
}

/// The token from `Authorization: Bearer <token>`, if present and non-empty.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("bearer "))?
        .trim();
    (!token.is_empty()).then_some(token)
}
