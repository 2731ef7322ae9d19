//! Origin/Referer enforcement, evaluated before any authentication logic.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::warn;
use url::{Origin, Url};

use super::routes::{OriginClass, RouteTable};
use crate::auth::AuthError;

pub struct OriginGuard {
    /// ASCII serialization of the single allowed browser origin.
    allowed_origin: String,
    /// This server's own origin, used for Referer checks.
    server_origin: Origin,
    routes: Arc<RouteTable>,
}

impl OriginGuard {
    pub fn new(allowed_origin: &Url, server_origin: &Url, routes: Arc<RouteTable>) -> Self {
        Self {
            allowed_origin: allowed_origin.origin().ascii_serialization(),
            server_origin: server_origin.origin(),
            routes,
        }
    }

    /// Decide whether a request with these headers may reach `class`.
    /// The error is a reason for the server log only.
    pub fn check(
        &self,
        class: OriginClass,
        origin: Option<&str>,
        referer: Option<&str>,
    ) -> Result<(), &'static str> {
        match (class, origin) {
            (OriginClass::Unclassified, _) => Ok(()),
            (_, Some(origin)) if origin == self.allowed_origin => Ok(()),
            (_, Some(_)) => Err("origin not allowed"),
            (OriginClass::Lenient, None) => Ok(()),
            (OriginClass::Strict, None) => {
                let referer = referer.ok_or("missing origin and referer")?;
                let referer = Url::parse(referer).map_err(|_| "unparseable referer")?;
                if referer.origin() == self.server_origin {
                    Ok(())
                } else {
                    Err("referer not same-origin")
                }
            }
        }
    }
}

fn header_value<'a>(headers: &'a HeaderMap, name: header::HeaderName) -> Option<&'a str> {
    // A present but non-UTF-8 value must not count as absent.
    headers.get(name).map(|v| v.to_str().unwrap_or_default())
}

/// Outermost pipeline stage. Rejections are a generic 403; the offending
/// origin only appears in the server log.
pub async fn origin_guard(
    State(guard): State<Arc<OriginGuard>>,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path();
    let class = guard.routes.classify(path);
    let headers = request.headers();
    let origin = header_value(headers, header::ORIGIN);
    let referer = header_value(headers, header::REFERER);

    if let Err(reason) = guard.check(class, origin, referer) {
        warn!(
            path = %path,
            origin = ?origin,
            referer = ?referer,
            reason,
            "Request rejected by origin guard"
        );
        return AuthError::OriginRejected.into_response();
    }

    next.run(request).await
}
