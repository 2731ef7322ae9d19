//! Cookie parsing and the refresh/CSRF cookie contracts.

use axum::http::header;

/// Cookie name for the refresh token.
pub const REFRESH_COOKIE_NAME: &str = "refresh_token";

/// Cookie name for the CSRF double-submit token (readable by scripts).
pub const CSRF_COOKIE_NAME: &str = "XSRF-TOKEN";

/// Extract a cookie value from the Cookie header.
pub fn get_cookie<'a>(headers: &'a axum::http::HeaderMap, name: &str) -> Option<&'a str> {
    for cookie_header in headers.get_all(header::COOKIE) {
        let Ok(cookie_header) = cookie_header.to_str() else {
            continue;
        };
        for part in cookie_header.split(';') {
            let part = part.trim();
            if let Some((key, value)) = part.split_once('=') {
                if key.trim() == name {
                    return Some(value.trim());
                }
            }
        }
    }
    None
}

/// Cross-site policy for the refresh cookie. `None` requires `Secure`.
#[derive(clap::ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SameSitePolicy {
    #[default]
    Strict,
    Lax,
    None,
}

impl SameSitePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SameSitePolicy::Strict => "Strict",
            SameSitePolicy::Lax => "Lax",
            SameSitePolicy::None => "None",
        }
    }
}

/// How the refresh token travels: http-only, scoped to the refresh endpoint.
#[derive(Debug, Clone)]
pub struct RefreshCookie {
    pub path: String,
    pub secure: bool,
    pub same_site: SameSitePolicy,
    pub max_age: u64,
}

impl RefreshCookie {
    /// `Set-Cookie` value delivering a refresh token.
    pub fn issue(&self, token: &str) -> String {
        self.render(token, self.max_age)
    }

    /// `Set-Cookie` value that clears the refresh cookie.
    pub fn clear(&self) -> String {
        self.render("", 0)
    }

    fn render(&self, value: &str, max_age: u64) -> String {
        let secure = if self.secure { "; Secure" } else { "" };
        format!(
            "{}={}; HttpOnly{}; Path={}; SameSite={}; Max-Age={}",
            REFRESH_COOKIE_NAME,
            value,
            secure,
            self.path,
            self.same_site.as_str(),
            max_age
        )
    }
}

/// `Set-Cookie` value for the CSRF token. Not http-only so the frontend can
/// echo it back in the `X-XSRF-TOKEN` header.
pub fn csrf_cookie(token: &str, secure: bool) -> String {
    let secure = if secure { "; Secure" } else { "" };
    format!("{}={}; Path=/; SameSite=Lax{}", CSRF_COOKIE_NAME, token, secure)
}
