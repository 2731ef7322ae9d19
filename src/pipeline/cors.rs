//! CORS policy for the single allowed browser origin.

use std::time::Duration;

use axum::http::{
    HeaderName, HeaderValue, Method,
    header::{AUTHORIZATION, CACHE_CONTROL, CONTENT_TYPE},
};
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::auth::TOKEN_EXPIRED_HEADER;

const XSRF_HEADER: HeaderName = HeaderName::from_static("x-xsrf-token");
const REQUESTED_WITH_HEADER: HeaderName = HeaderName::from_static("x-requested-with");

/// Credentialed CORS for exactly one origin. Preflights are answered here and
/// never reach authentication.
pub fn cors_layer(allowed_origin: HeaderValue) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::exact(allowed_origin))
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
            Method::PATCH,
        ])
        .allow_headers([
            AUTHORIZATION,
            CACHE_CONTROL,
            CONTENT_TYPE,
            XSRF_HEADER,
            REQUESTED_WITH_HEADER,
        ])
        .expose_headers([XSRF_HEADER, HeaderName::from_static(TOKEN_EXPIRED_HEADER)])
        .max_age(Duration::from_secs(3600))
}
