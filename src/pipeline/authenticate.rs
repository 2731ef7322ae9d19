//! Bearer-token authentication, the innermost pipeline stage.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{error, warn};

use super::routes::RouteTable;
use crate::auth::{AuthBackend, AuthError, Principal};
use crate::identity::IdentityError;

#[derive(Clone)]
pub struct Authenticator {
    pub backend: AuthBackend,
    pub routes: Arc<RouteTable>,
}

/// Token from `Authorization: Bearer <token>`, if the header has that shape.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// Validate an access token and resolve its subject against the identity
/// store. Authorization-relevant fields come from the store, not the claims.
pub async fn resolve_principal(backend: &AuthBackend, token: &str) -> Result<Principal, AuthError> {
    let claims = backend.jwt.validate_access_token(token)?;
    let user_id = claims.subject_id()?;

    match backend.identities.load_by_id(user_id).await {
        Ok(identity) => Ok(Principal::new(&identity, claims.jti)),
        Err(IdentityError::NotFound) => Err(AuthError::IdentityNotFound),
        Err(IdentityError::Store(e)) => {
            error!(user_id, error = %e, "Identity lookup failed during authentication");
            Err(AuthError::Internal)
        }
    }
}

/// Attach a [`Principal`] to the request when a valid bearer token is present.
///
/// Public paths and requests without a bearer header pass through
/// unauthenticated. An expired token is answered with 401 and the
/// `X-Token-Expired` marker; every other token failure is logged and the
/// request continues unauthenticated so handlers produce the usual 401/403.
pub async fn authenticate(
    State(auth): State<Authenticator>,
    mut request: Request,
    next: Next,
) -> Response {
    if auth.routes.is_public(request.uri().path()) {
        return next.run(request).await;
    }

    let Some(token) = bearer_token(request.headers()) else {
        return next.run(request).await;
    };

    match resolve_principal(&auth.backend, token).await {
        Ok(principal) => {
            request.extensions_mut().insert(principal);
        }
        Err(AuthError::TokenExpired) => return AuthError::TokenExpired.into_response(),
        Err(AuthError::Internal) => return AuthError::Internal.into_response(),
        Err(e) => {
            warn!(
                path = %request.uri().path(),
                error = %e,
                "Bearer token rejected, continuing unauthenticated"
            );
        }
    }

    next.run(request).await
}
