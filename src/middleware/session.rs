use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::auth::Claims;
use crate::error::ApiError;
use crate::state::AppState;

/// Authenticated user for the current request
#[derive(Clone, Debug)]
pub struct SessionUser {
    pub id: Uuid,
    pub email: Option<String>,
}

impl From<Claims> for SessionUser {
    fn from(claims: Claims) -> Self {
        Self { id: claims.sub, email: claims.email }
    }
}

/// Rejects requests without a valid session and stores the `SessionUser`
/// in request extensions for handlers
pub async fn require_session(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_token(request.headers(), &state.session_cookie)
        .ok_or_else(|| ApiError::unauthorized("Missing session token"))?;

    let claims = state.keys.verify(&token).map_err(|e| {
        tracing::debug!("Rejected session token: {}", e);
        ApiError::unauthorized("Invalid or expired session")
    })?;

    request.extensions_mut().insert(SessionUser::from(claims));
    Ok(next.run(request).await)
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for SessionUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<SessionUser>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized("Session required"))
    }
}

/// Session if one is present and valid; never rejects
#[derive(Clone, Debug)]
pub struct MaybeSession(pub Option<SessionUser>);

#[async_trait]
impl FromRequestParts<AppState> for MaybeSession {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<SessionUser>() {
            return Ok(MaybeSession(Some(user.clone())));
        }

        let user = extract_token(&parts.headers, &state.session_cookie)
            .and_then(|token| state.keys.verify(&token).ok())
            .map(SessionUser::from);
        Ok(MaybeSession(user))
    }
}

/// Bearer header first, then the session cookie
pub fn extract_token(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());
    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == cookie_name && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_header_wins_over_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        headers.insert(header::COOKIE, HeaderValue::from_static("sb-access-token=from-cookie"));
        assert_eq!(extract_token(&headers, "sb-access-token").as_deref(), Some("abc"));
    }

    #[test]
    fn falls_back_to_named_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("theme=dark; sb-access-token=xyz; other=1"));
        assert_eq!(extract_token(&headers, "sb-access-token").as_deref(), Some("xyz"));
        assert_eq!(extract_token(&headers, "missing"), None);
    }

    #[test]
    fn non_bearer_authorization_is_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic dXNlcjpwYXNz"));
        assert_eq!(extract_token(&headers, "sb-access-token"), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer   "));
        assert_eq!(extract_token(&headers, "sb-access-token"), None);
    }
}
