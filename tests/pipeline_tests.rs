mod common;

use axum::{
    Json, Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
    routing::{get, post},
};
use common::*;
use tokengate::{
    auth::{Auth, AuthError},
    create_app_with_routes,
    db::Database,
    identity::Role,
    jwt::{JwtConfig, TokenKind},
};
use tower::ServiceExt;

fn get_user(token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri("/api/user");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

/// App with downstream routes standing in for deployment handlers.
async fn app_with_routes() -> (Router, Database) {
    let config = test_config().await;

    let routes = Router::new()
        .route(
            "/profile",
            post(|Auth(principal): Auth| async move { Json(principal.email) }),
        )
        .route(
            "/settings",
            post(|| async { "saved" }),
        )
        .route(
            "/api/admin",
            get(|Auth(principal): Auth| async move {
                principal.require_role(Role::Admin)?;
                Ok::<_, AuthError>("welcome")
            }),
        );

    let app = create_app_with_routes(&config, routes).unwrap();
    (app, config.db)
}

#[tokio::test]
async fn test_valid_bearer_token_authenticates() {
    let (app, db) = test_app().await;
    let id = create_user(&db, "a@x.com", Role::User).await;
    let token = access_token_for(&db, id).await;

    let response = app.oneshot(get_user(Some(&token))).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["id"], id);
    assert_eq!(json["email"], "a@x.com");
    assert_eq!(json["name"], "Test User");
    assert_eq!(json["roles"], serde_json::json!(["ROLE_USER"]));
    assert!(json["createdAt"].is_string());
    assert!(json["updatedAt"].is_string());
}

#[tokio::test]
async fn test_missing_token_is_unauthenticated() {
    let (app, _db) = test_app().await;

    let response = app.oneshot(get_user(None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(response.headers().get("x-token-expired").is_none());
    assert_eq!(
        body_json(response).await,
        serde_json::json!({ "error": "Not authenticated" })
    );
}

#[tokio::test]
async fn test_expired_token_carries_marker() {
    let (app, db) = test_app().await;
    let id = create_user(&db, "a@x.com", Role::User).await;
    let expired = forge(&expired_claims(id, TokenKind::Access), SECRET);

    let response = app.oneshot(get_user(Some(&expired))).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(response.headers()["x-token-expired"], "true");
    assert_eq!(
        body_json(response).await,
        serde_json::json!({ "error": "access_token_expired" })
    );
}

#[tokio::test]
async fn test_expired_refresh_token_as_bearer_reports_expiry() {
    let (app, db) = test_app().await;
    let id = create_user(&db, "a@x.com", Role::User).await;
    let expired = forge(&expired_claims(id, TokenKind::Refresh), SECRET);

    let response = app.oneshot(get_user(Some(&expired))).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(response.headers()["x-token-expired"], "true");
}

#[tokio::test]
async fn test_invalid_tokens_degrade_to_unauthenticated() {
    let (app, db) = test_app().await;
    let id = create_user(&db, "a@x.com", Role::User).await;

    let refresh = refresh_token_for(id);
    let foreign = JwtConfig::new(b"some-other-secret-that-is-long-enough")
        .issue_access_token(&db.users().get_by_id(id).await.unwrap().unwrap())
        .unwrap()
        .token;

    for token in [refresh.as_str(), foreign.as_str(), "garbage"] {
        let response = app.clone().oneshot(get_user(Some(token))).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().get("x-token-expired").is_none());
        assert_eq!(
            body_json(response).await,
            serde_json::json!({ "error": "Not authenticated" })
        );
    }
}

#[tokio::test]
async fn test_token_for_deleted_identity_is_unauthenticated() {
    let (app, db) = test_app().await;
    let id = create_user(&db, "a@x.com", Role::User).await;
    let token = access_token_for(&db, id).await;
    db.users().delete(id).await.unwrap();

    let response = app.oneshot(get_user(Some(&token))).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_lenient_path_rejects_foreign_origin_only() {
    let (app, db) = test_app().await;
    let id = create_user(&db, "a@x.com", Role::User).await;
    let token = access_token_for(&db, id).await;

    let mut request = get_user(Some(&token));
    request
        .headers_mut()
        .insert(header::ORIGIN, "https://evil.example".parse().unwrap());
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let mut request = get_user(Some(&token));
    request
        .headers_mut()
        .insert(header::ORIGIN, ALLOWED_ORIGIN.parse().unwrap());
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_public_paths_skip_authentication() {
    let (app, _db) = test_app().await;
    let expired = forge(&expired_claims(1, TokenKind::Access), SECRET);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .header(header::AUTHORIZATION, format!("Bearer {}", expired))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&body[..], b"ok");
}

#[tokio::test]
async fn test_cors_preflight_for_allowed_origin() {
    let (app, _db) = test_app().await;

    let response = app
        .oneshot(
            Request::builder()
                .method(Method::OPTIONS)
                .uri("/api/user")
                .header(header::ORIGIN, ALLOWED_ORIGIN)
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
                .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "authorization")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], ALLOWED_ORIGIN);
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
    assert_eq!(headers[header::ACCESS_CONTROL_MAX_AGE], "3600");
    let methods = headers[header::ACCESS_CONTROL_ALLOW_METHODS]
        .to_str()
        .unwrap()
        .to_string();
    assert!(methods.contains("PATCH"));
}

#[tokio::test]
async fn test_cors_headers_on_actual_response() {
    let (app, _db) = test_app().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .header(header::ORIGIN, ALLOWED_ORIGIN)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let headers = response.headers();
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], ALLOWED_ORIGIN);
    let exposed = headers[header::ACCESS_CONTROL_EXPOSE_HEADERS]
        .to_str()
        .unwrap()
        .to_ascii_lowercase();
    assert!(exposed.contains("x-token-expired"));
    assert!(exposed.contains("x-xsrf-token"));
}

#[tokio::test]
async fn test_cors_ignores_foreign_origin() {
    let (app, _db) = test_app().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .header(header::ORIGIN, "https://evil.example")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .is_none()
    );
}

#[tokio::test]
async fn test_csrf_bootstrap_and_double_submit() {
    let (app, _db) = app_with_routes().await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/csrf")
                .header(header::ORIGIN, ALLOWED_ORIGIN)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let cookie = set_cookies(&response)[0].clone();
    assert!(cookie.starts_with("XSRF-TOKEN="));
    assert!(!cookie.contains("HttpOnly"));
    assert!(cookie.contains("; Secure"));
    let cookie_token = set_cookie_value(&response, "XSRF-TOKEN").unwrap();
    let json = body_json(response).await;
    assert_eq!(json["token"], cookie_token.as_str());

    let submit = |header_token: Option<&str>| {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/settings")
            .header(header::COOKIE, format!("XSRF-TOKEN={}", cookie_token));
        if let Some(token) = header_token {
            builder = builder.header("x-xsrf-token", token);
        }
        builder.body(Body::empty()).unwrap()
    };

    let response = app.clone().oneshot(submit(None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        body_json(response).await,
        serde_json::json!({ "error": "Invalid CSRF token" })
    );

    let response = app.clone().oneshot(submit(Some("wrong"))).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .clone()
        .oneshot(submit(Some(cookie_token.as_str())))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Safe methods are never checked.
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_csrf_bootstrap_requires_allowed_origin() {
    let (app, _db) = test_app().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/csrf")
                .header(header::ORIGIN, "https://evil.example")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert!(set_cookies(&response).is_empty());
}

#[tokio::test]
async fn test_bearer_requests_are_csrf_exempt() {
    let (app, db) = app_with_routes().await;
    let id = create_user(&db, "a@x.com", Role::User).await;
    let token = access_token_for(&db, id).await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/profile")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, "a@x.com");

    // Without the bearer token the same request needs a CSRF token.
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/profile")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_role_requirement() {
    let (app, db) = app_with_routes().await;
    let user = create_user(&db, "user@x.com", Role::User).await;
    let admin = create_user(&db, "admin@x.com", Role::Admin).await;

    let request = |token: String| {
        Request::builder()
            .uri("/api/admin")
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap()
    };

    let response = app
        .clone()
        .oneshot(request(access_token_for(&db, user).await))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        body_json(response).await,
        serde_json::json!({ "error": "Insufficient permissions" })
    );

    let response = app
        .oneshot(request(access_token_for(&db, admin).await))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_logout_clears_refresh_cookie() {
    let (app, db) = test_app().await;
    let id = create_user(&db, "a@x.com", Role::User).await;
    let token = access_token_for(&db, id).await;

    let logout = |token: Option<&str>| {
        let mut builder = Request::builder().method("POST").uri("/auth/logout");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        builder.body(Body::empty()).unwrap()
    };

    let response = app.clone().oneshot(logout(Some(&token))).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let cookies = set_cookies(&response);
    assert_eq!(cookies.len(), 1);
    assert!(cookies[0].starts_with("refresh_token=;"));
    assert!(cookies[0].contains("Max-Age=0"));
    assert!(cookies[0].contains("Path=/auth/refresh"));

    let response = app.oneshot(logout(None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
