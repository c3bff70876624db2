//! Caller identity
//!
//! Authentication happens upstream; the authenticated user's ID arrives in
//! the `x-user-id` header and is trusted as given.

use axum::{extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use crate::api::error::ApiError;

pub const USER_ID_HEADER: &str = "x-user-id";

/// ID of the calling user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserId(pub Uuid);

impl<S> FromRequestParts<S> for UserId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(USER_ID_HEADER)
            .ok_or_else(|| ApiError::Unauthorized(format!("Missing {USER_ID_HEADER} header")))?;

        value
            .to_str()
            .ok()
            .and_then(|s| Uuid::parse_str(s.trim()).ok())
            .map(UserId)
            .ok_or_else(|| ApiError::Unauthorized(format!("Invalid {USER_ID_HEADER} header")))
    }
}
