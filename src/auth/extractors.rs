//! Axum extractors for the per-request principal.

use axum::{extract::FromRequestParts, http::request::Parts};

use super::errors::AuthError;
use super::types::Principal;

/// Extractor for handlers that require authentication.
///
/// Reads the principal the pipeline attached to the request; rejects with a
/// JSON 401 when the request is unauthenticated.
pub struct Auth(pub Principal);

impl<S> FromRequestParts<S> for Auth
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .cloned()
            .map(Auth)
            .ok_or(AuthError::NotAuthenticated)
    }
}
