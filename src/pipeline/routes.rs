//! Path classification table, built once at startup from the base path.

/// Login, under the base path.
pub const LOGIN_PATH: &str = "/auth/login";
/// Registration, under the base path.
pub const REGISTER_PATH: &str = "/auth/register";
/// Refresh-token rotation, under the base path. Also the refresh cookie's scope.
pub const REFRESH_PATH: &str = "/auth/refresh";
/// Logout, under the base path.
pub const LOGOUT_PATH: &str = "/auth/logout";
/// CSRF token bootstrap, under the base path.
pub const CSRF_PATH: &str = "/csrf";
/// Current user summary, under the base path.
pub const USER_PATH: &str = "/api/user";
/// Liveness probe, under the base path.
pub const HEALTH_PATH: &str = "/health";

const STATIC_EXTENSIONS: &[&str] = &[
    "js", "css", "json", "png", "jpg", "jpeg", "gif", "svg", "ico",
];

/// How strictly the origin guard treats a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OriginClass {
    /// Credential submission and token issuance: Origin must match, or
    /// Referer must be same-origin when Origin is absent.
    Strict,
    /// Session-bearing endpoints: a present Origin must match.
    Lenient,
    /// Not origin-checked.
    Unclassified,
}

#[derive(Debug, Clone)]
pub struct RouteTable {
    base: String,
    strict: Vec<String>,
    lenient: Vec<String>,
    public_exact: Vec<String>,
    public_prefixes: Vec<String>,
    csrf_exempt: Vec<String>,
}

impl RouteTable {
    /// Build the table for an application mounted under `base` (`""` for root).
    pub fn new(base: &str) -> Self {
        let base = base.trim_end_matches('/').to_string();
        let at = |suffix: &str| format!("{}{}", base, suffix);

        let root = if base.is_empty() { "/".to_string() } else { base.clone() };
        let mut public_exact = vec![
            root,
            at("/"),
            at("/index.html"),
            at("/error"),
            at("/favicon.ico"),
            at(HEALTH_PATH),
        ];
        public_exact.dedup();

        Self {
            strict: vec![at(LOGIN_PATH), at(REGISTER_PATH), at(CSRF_PATH)],
            lenient: vec![at(USER_PATH), at(LOGOUT_PATH)],
            public_exact,
            public_prefixes: vec![
                at(LOGIN_PATH),
                at(REGISTER_PATH),
                at(REFRESH_PATH),
                at(CSRF_PATH),
                at("/static"),
                at("/assets"),
            ],
            csrf_exempt: vec![at("/auth"), at("/api"), at(CSRF_PATH)],
            base,
        }
    }

    /// Full path for a route suffix such as [`LOGIN_PATH`].
    pub fn path(&self, suffix: &str) -> String {
        format!("{}{}", self.base, suffix)
    }

    pub fn classify(&self, path: &str) -> OriginClass {
        if self.strict.iter().any(|p| matches_prefix(path, p)) {
            OriginClass::Strict
        } else if self.lenient.iter().any(|p| matches_prefix(path, p)) {
            OriginClass::Lenient
        } else {
            OriginClass::Unclassified
        }
    }

    /// Public paths skip token authentication entirely.
    pub fn is_public(&self, path: &str) -> bool {
        self.public_exact.iter().any(|p| p == path)
            || self.public_prefixes.iter().any(|p| matches_prefix(path, p))
            || self.is_root_static_file(path)
    }

    /// Paths where the double-submit CSRF check does not apply.
    pub fn is_csrf_exempt(&self, path: &str) -> bool {
        self.csrf_exempt.iter().any(|p| matches_prefix(path, p))
    }

    /// A single-segment file directly under the base, with a static extension.
    fn is_root_static_file(&self, path: &str) -> bool {
        let Some(file) = path
            .strip_prefix(self.base.as_str())
            .and_then(|rest| rest.strip_prefix('/'))
        else {
            return false;
        };
        if file.contains('/') {
            return false;
        }
        file.rsplit_once('.').is_some_and(|(stem, ext)| {
            !stem.is_empty() && STATIC_EXTENSIONS.iter().any(|e| ext.eq_ignore_ascii_case(e))
        })
    }
}

/// Segment-aware prefix match: `/auth/login` matches itself and
/// `/auth/login/...`, never `/auth/loginx`.
fn matches_prefix(path: &str, prefix: &str) -> bool {
    path.strip_prefix(prefix)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}
