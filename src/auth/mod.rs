//! Token-based authentication.
//!
//! Short-lived access tokens travel as bearer credentials; long-lived refresh
//! tokens live in an HttpOnly cookie scoped to the refresh endpoint and are
//! rotated on every use.

mod cookie;
mod errors;
mod extractors;
mod ip;
mod lifecycle;
mod state;
mod types;

pub use cookie::{
    CSRF_COOKIE_NAME, REFRESH_COOKIE_NAME, RefreshCookie, SameSitePolicy, csrf_cookie, get_cookie,
};
pub use errors::{AuthError, RefreshFailure, TOKEN_EXPIRED_HEADER};
pub use extractors::Auth;
pub use ip::{ClientIpHeader, HasHeadersAndExtensions, extract_client_ip};
pub use lifecycle::TokenPair;
pub use state::AuthBackend;
pub use types::{Principal, UserInfo};
