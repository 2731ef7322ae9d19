//! Double-submit CSRF check for cookie-style submissions.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::Method,
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::warn;

use super::authenticate::bearer_token;
use super::routes::RouteTable;
use crate::auth::{AuthError, CSRF_COOKIE_NAME, get_cookie};

/// Header the client echoes the `XSRF-TOKEN` cookie into.
pub const CSRF_HEADER_NAME: &str = "x-xsrf-token";

fn is_unsafe(method: &Method) -> bool {
    matches!(
        *method,
        Method::POST | Method::PUT | Method::PATCH | Method::DELETE
    )
}

/// Unsafe methods on non-exempt paths must echo the CSRF cookie in the
/// `X-XSRF-TOKEN` header. Bearer-token requests are exempt: a cross-site page
/// cannot attach the header.
pub async fn csrf_protect(
    State(routes): State<Arc<RouteTable>>,
    request: Request,
    next: Next,
) -> Response {
    let headers = request.headers();
    let path = request.uri().path();

    if !is_unsafe(request.method())
        || routes.is_csrf_exempt(path)
        || bearer_token(headers).is_some()
    {
        return next.run(request).await;
    }

    let cookie = get_cookie(headers, CSRF_COOKIE_NAME).filter(|c| !c.is_empty());
    let header = headers
        .get(CSRF_HEADER_NAME)
        .and_then(|v| v.to_str().ok());

    if matches!((cookie, header), (Some(cookie), Some(header)) if cookie == header) {
        return next.run(request).await;
    }

    warn!(path = %path, "CSRF token missing or mismatched");
    AuthError::CsrfRejected.into_response()
}
