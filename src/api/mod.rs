mod auth;
mod csrf;
mod error;
mod users;

use axum::{
    Router, middleware,
    routing::{get, post},
};
use std::sync::Arc;

use crate::auth::{AuthBackend, RefreshCookie};
use crate::db::Database;
use crate::pipeline::{
    CSRF_PATH, HEALTH_PATH, LOGIN_PATH, LOGOUT_PATH, REFRESH_PATH, REGISTER_PATH, RouteTable,
    USER_PATH,
};
use crate::rate_limit::{RateLimitConfig, rate_limit_login, rate_limit_register};

pub use error::{ApiError, ResultExt};

#[derive(Clone)]
pub struct ApiState {
    pub backend: AuthBackend,
    pub db: Database,
    pub refresh_cookie: Arc<RefreshCookie>,
    pub secure_cookies: bool,
}

/// Create the router for the authentication endpoints and the identity
/// summary. Registration is left unrouted when signups are disabled.
pub fn create_api_router(
    state: ApiState,
    routes: &RouteTable,
    no_signup: bool,
    rate_limit: Option<Arc<RateLimitConfig>>,
) -> Router {
    let mut login_router: Router = Router::new()
        .route(&routes.path(LOGIN_PATH), post(auth::login))
        .with_state(state.clone());

    let mut register_router: Router = if no_signup {
        Router::new()
    } else {
        Router::new()
            .route(&routes.path(REGISTER_PATH), post(users::register))
            .with_state(state.clone())
    };

    if let Some(config) = rate_limit {
        login_router = login_router.route_layer(middleware::from_fn_with_state(
            config.clone(),
            rate_limit_login,
        ));
        if !no_signup {
            register_router = register_router
                .route_layer(middleware::from_fn_with_state(config, rate_limit_register));
        }
    }

    Router::new()
        .route(&routes.path(REFRESH_PATH), post(auth::refresh))
        .route(&routes.path(LOGOUT_PATH), post(auth::logout))
        .route(&routes.path(USER_PATH), get(users::current_user))
        .route(&routes.path(CSRF_PATH), get(csrf::issue_csrf_token))
        .route(&routes.path(HEALTH_PATH), get(health))
        .with_state(state)
        .merge(login_router)
        .merge(register_router)
}

async fn health() -> &'static str {
    "ok"
}
