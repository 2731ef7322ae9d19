pub mod api;
pub mod auth;
pub mod cli;
pub mod db;
pub mod identity;
pub mod jwt;
pub mod password;
pub mod pipeline;
pub mod rate_limit;

use api::{ApiState, create_api_router};
use auth::{AuthBackend, ClientIpHeader, RefreshCookie, SameSitePolicy};
use axum::{Router, http::HeaderValue};
use db::Database;
use jwt::JwtConfig;
use password::PasswordHasher;
use pipeline::{Authenticator, OriginGuard, REFRESH_PATH, RouteTable};
use rate_limit::RateLimitConfig;
use std::sync::Arc;
use url::Url;

/// Shortest accepted signing secret, in bytes.
pub const MIN_JWT_SECRET_LENGTH: usize = 32;

pub struct ServerConfig {
    /// Base path for the application (e.g., "/app"); `None` mounts at the root
    pub base: Option<String>,
    /// Database connection (cloneable, uses connection pool internally)
    pub db: Database,
    /// JWT secret for signing tokens
    pub jwt_secret: Vec<u8>,
    /// Access token lifetime in seconds
    pub access_token_ttl: u64,
    /// Refresh token lifetime in seconds
    pub refresh_token_ttl: u64,
    /// The single browser origin allowed to call the API (the SPA)
    pub allowed_origin: Url,
    /// This server's own public origin, used for Referer checks
    pub server_origin: Url,
    /// Whether to set Secure flag on cookies (should be true in production with HTTPS)
    pub secure_cookies: bool,
    /// SameSite attribute of the refresh cookie
    pub same_site: SameSitePolicy,
    /// Whether new user signups are disabled
    pub no_signup: bool,
    /// bcrypt work factor for new password hashes
    pub bcrypt_cost: u32,
    /// Whether login and registration are rate limited per client IP
    pub rate_limit: bool,
    /// Client IP source (requires running behind a proxy)
    pub ip_header: Option<ClientIpHeader>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("JWT secret must be at least {} bytes", MIN_JWT_SECRET_LENGTH)]
    SecretTooShort,
    #[error("token lifetimes must be greater than zero")]
    InvalidTokenTtl,
    #[error("{0} must use HTTPS unless the host is localhost")]
    InsecureOrigin(&'static str),
    #[error("{0} must be a plain origin (scheme, host and optional port)")]
    InvalidOrigin(&'static str),
    #[error("SameSite=None requires secure cookies")]
    SameSiteNoneWithoutSecure,
    #[error("invalid bcrypt cost: {0}")]
    BcryptCost(#[from] bcrypt::BcryptError),
}

/// Reject anything that is not `scheme://host[:port]`, and plain HTTP except
/// on localhost.
fn check_origin(url: &Url, what: &'static str) -> Result<HeaderValue, ConfigError> {
    let origin = url.origin();
    if !origin.is_tuple() || !matches!(url.path(), "" | "/") || url.query().is_some() {
        return Err(ConfigError::InvalidOrigin(what));
    }
    if url.scheme() != "https" && url.host_str() != Some("localhost") {
        return Err(ConfigError::InsecureOrigin(what));
    }
    HeaderValue::from_str(&origin.ascii_serialization())
        .map_err(|_| ConfigError::InvalidOrigin(what))
}

/// Create the application router with the given configuration.
pub fn create_app(config: &ServerConfig) -> Result<Router, ConfigError> {
    create_app_with_routes(config, Router::new())
}

/// Like [`create_app`], with deployment routes merged in behind the same
/// request pipeline. Handlers read the caller through [`auth::Auth`].
pub fn create_app_with_routes(config: &ServerConfig, routes: Router) -> Result<Router, ConfigError> {
    if config.jwt_secret.len() < MIN_JWT_SECRET_LENGTH {
        return Err(ConfigError::SecretTooShort);
    }
    if config.access_token_ttl == 0 || config.refresh_token_ttl == 0 {
        return Err(ConfigError::InvalidTokenTtl);
    }
    let allowed_origin = check_origin(&config.allowed_origin, "allowed origin")?;
    check_origin(&config.server_origin, "server origin")?;
    if config.same_site == SameSitePolicy::None && !config.secure_cookies {
        return Err(ConfigError::SameSiteNoneWithoutSecure);
    }

    let table = Arc::new(RouteTable::new(config.base.as_deref().unwrap_or("")));

    let backend = AuthBackend {
        jwt: Arc::new(JwtConfig::with_ttls(
            &config.jwt_secret,
            config.access_token_ttl,
            config.refresh_token_ttl,
        )),
        identities: Arc::new(config.db.clone()),
        passwords: Arc::new(PasswordHasher::new(config.bcrypt_cost)?),
    };

    let api_state = ApiState {
        backend: backend.clone(),
        db: config.db.clone(),
        refresh_cookie: Arc::new(RefreshCookie {
            path: table.path(REFRESH_PATH),
            secure: config.secure_cookies,
            same_site: config.same_site,
            max_age: config.refresh_token_ttl,
        }),
        secure_cookies: config.secure_cookies,
    };

    let rate_limit = config
        .rate_limit
        .then(|| Arc::new(RateLimitConfig::new(config.ip_header)));
    if let Some(limits) = &rate_limit {
        // Outside a runtime (plain unit tests) there is nothing to schedule on.
        if tokio::runtime::Handle::try_current().is_ok() {
            rate_limit::spawn_cleanup_scheduler(limits);
        }
    }

    let app = create_api_router(api_state, &table, config.no_signup, rate_limit).merge(routes);

    let origin = Arc::new(OriginGuard::new(
        &config.allowed_origin,
        &config.server_origin,
        table.clone(),
    ));
    let authenticator = Authenticator {
        backend,
        routes: table,
    };

    Ok(pipeline::apply(app, authenticator, origin, allowed_origin))
}
