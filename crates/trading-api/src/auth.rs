//! Caller identification.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::ApiError;

/// Header carrying the caller's user id.
pub const USER_ID_HEADER: &str = "x-user-id";

/// The authenticated caller, taken from the `x-user-id` header.
///
/// Requests without a non-empty header are rejected with 401 before the
/// handler runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser(pub String);

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or(ApiError::Unauthenticated)?;

        Ok(AuthUser(user_id.to_string()))
    }
}
