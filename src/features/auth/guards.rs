//! Authorization guards for report endpoints.
//!
//! The auth middleware only proves the bearer token is valid. Report
//! ownership needs a numeric account id, which some tokens do not carry.

use crate::core::error::AppError;
use crate::features::auth::model::AuthenticatedUser;
use axum::{extract::FromRequestParts, http::request::Parts};

/// Guard yielding the numeric principal id of the caller.
///
/// Rejects with 401 when the request was not authenticated and with 403 when
/// the token subject is not a numeric account id.
///
/// # Example
/// ```ignore
/// pub async fn handler(RequirePrincipal(owner_id): RequirePrincipal) { ... }
/// ```
pub struct RequirePrincipal(pub i64);

impl<S> FromRequestParts<S> for RequirePrincipal
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = parts
            .extensions
            .get::<AuthenticatedUser>()
            .ok_or_else(|| AppError::Unauthorized("User not authenticated".to_string()))?;

        principal_of(user).map(RequirePrincipal)
    }
}

/// Numeric principal of an authenticated user, Forbidden when absent
pub fn principal_of(user: &AuthenticatedUser) -> Result<i64, AppError> {
    user.principal_id
        .ok_or_else(|| AppError::Forbidden("A registered account is required".to_string()))
}
