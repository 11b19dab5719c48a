//! Identity extractor.
//!
//! Authentication happens upstream; the gateway resolves the session and
//! forwards the authenticated user as an `x-user-id` header, which this
//! service trusts as given.

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};

use copperpot_core::UserId;

/// Header carrying the authenticated user id.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Extractor for the authenticated user on cart and checkout routes.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(
///     CurrentUser(user_id): CurrentUser,
/// ) -> impl IntoResponse {
///     format!("user {user_id}")
/// }
/// ```
pub struct CurrentUser(pub UserId);

/// Error returned when the identity header is missing or malformed.
pub struct IdentityRejection;

impl IntoResponse for IdentityRejection {
    fn into_response(self) -> Response {
        (StatusCode::UNAUTHORIZED, "missing or invalid x-user-id").into_response()
    }
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = IdentityRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse::<i32>().ok())
            .ok_or(IdentityRejection)?;

        Ok(Self(UserId::new(user_id)))
    }
}
