#![allow(dead_code)]

use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    Router,
    body::Body,
    http::{Request, Response, header},
};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use tokengate::{
    ServerConfig, create_app,
    auth::SameSitePolicy,
    db::Database,
    identity::Role,
    jwt::{Claims, JwtConfig, TokenKind},
    password::PasswordHasher,
};
use url::Url;

pub const SECRET: &[u8] = b"integration-test-secret-0123456789";
pub const ALLOWED_ORIGIN: &str = "https://app.example";
pub const SERVER_ORIGIN: &str = "https://api.example";
pub const PASSWORD: &str = "correct horse";

/// Config for an in-memory app with rate limiting off and cheap bcrypt.
pub async fn test_config() -> ServerConfig {
    let db = Database::open(":memory:")
        .await
        .expect("Failed to open test database");
    ServerConfig {
        base: None,
        db,
        jwt_secret: SECRET.to_vec(),
        access_token_ttl: 900,
        refresh_token_ttl: 7 * 24 * 60 * 60,
        allowed_origin: Url::parse(ALLOWED_ORIGIN).unwrap(),
        server_origin: Url::parse(SERVER_ORIGIN).unwrap(),
        secure_cookies: true,
        same_site: SameSitePolicy::Strict,
        no_signup: false,
        bcrypt_cost: 4,
        rate_limit: false,
        ip_header: None,
    }
}

pub async fn test_app() -> (Router, Database) {
    let config = test_config().await;
    let app = create_app(&config).expect("Failed to create app");
    (app, config.db)
}

/// Insert a user directly into the store. Returns the new id.
pub async fn create_user(db: &Database, email: &str, role: Role) -> i64 {
    let hash = PasswordHasher::new(4).unwrap().hash(PASSWORD).unwrap();
    db.users()
        .create(email, "Test User", &hash, role)
        .await
        .expect("Failed to create user")
}

/// Mint a valid access token for a stored user.
pub async fn access_token_for(db: &Database, id: i64) -> String {
    let identity = db.users().get_by_id(id).await.unwrap().unwrap();
    JwtConfig::new(SECRET)
        .issue_access_token(&identity)
        .unwrap()
        .token
}

/// Mint a valid refresh token for a user id.
pub fn refresh_token_for(id: i64) -> String {
    JwtConfig::new(SECRET).issue_refresh_token(id).unwrap().token
}

pub fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs()
}

/// Sign arbitrary claims with the given secret.
pub fn forge(claims: &Claims, secret: &[u8]) -> String {
    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret),
    )
    .unwrap()
}

/// Well-formed claims that expired a minute ago.
pub fn expired_claims(id: i64, kind: TokenKind) -> Claims {
    let issued = now() - 3600;
    let profile = kind == TokenKind::Access;
    Claims {
        jti: uuid::Uuid::new_v4().to_string(),
        sub: id.to_string(),
        kind,
        iat: issued,
        exp: now() - 60,
        role: profile.then_some(Role::User),
        email: profile.then(|| "a@x.com".to_string()),
        name: profile.then(|| "Test User".to_string()),
    }
}

pub fn login_request(email: &str, password: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::ORIGIN, ALLOWED_ORIGIN)
        .body(Body::from(
            serde_json::json!({ "email": email, "password": password }).to_string(),
        ))
        .unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

pub fn set_cookies(response: &Response<Body>) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect()
}

/// Value of a cookie set by the response, if any.
pub fn set_cookie_value(response: &Response<Body>, name: &str) -> Option<String> {
    set_cookies(response).into_iter().find_map(|cookie| {
        let (pair, _) = cookie.split_once(';').unwrap_or((cookie.as_str(), ""));
        let (key, value) = pair.split_once('=')?;
        (key == name).then(|| value.to_string())
    })
}
