//! The ordered request filter chain.
//!
//! Outermost to innermost: origin guard, CORS, CSRF, token authentication,
//! then the routed handler. Each stage may answer the request itself.

mod authenticate;
mod cors;
mod csrf;
mod origin;
mod routes;

use std::sync::Arc;

use axum::{Router, http::HeaderValue, middleware};

pub use authenticate::{Authenticator, authenticate, bearer_token, resolve_principal};
pub use cors::cors_layer;
pub use csrf::{CSRF_HEADER_NAME, csrf_protect};
pub use origin::{OriginGuard, origin_guard};
pub use routes::{
    CSRF_PATH, HEALTH_PATH, LOGIN_PATH, LOGOUT_PATH, OriginClass, REFRESH_PATH, REGISTER_PATH,
    RouteTable, USER_PATH,
};

/// Wrap `router` in the full chain. `Router::layer` wraps outward, so the
/// stages are added innermost first.
pub fn apply(
    router: Router,
    authenticator: Authenticator,
    origin: Arc<OriginGuard>,
    allowed_origin: HeaderValue,
) -> Router {
    let routes = authenticator.routes.clone();
    router
        .layer(middleware::from_fn_with_state(authenticator, authenticate))
        .layer(middleware::from_fn_with_state(routes, csrf_protect))
        .layer(cors_layer(allowed_origin))
        .layer(middleware::from_fn_with_state(origin, origin_guard))
}
