//! Login, refresh-token rotation and logout.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::{HeaderMap, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use super::ApiState;
use crate::auth::{Auth, AuthError, REFRESH_COOKIE_NAME, TokenPair, UserInfo, get_cookie};

#[derive(Deserialize)]
pub struct LoginRequest {
    email: String,
    password: String,
}

#[derive(Serialize)]
struct TokenResponse {
    access_token: String,
    token_type: &'static str,
    expires_in: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    user: Option<UserInfo>,
}

impl TokenResponse {
    fn new(pair: &TokenPair, user: Option<UserInfo>) -> Self {
        Self {
            access_token: pair.access.token.clone(),
            token_type: "Bearer",
            expires_in: pair.access.duration,
            user,
        }
    }
}

#[derive(Serialize)]
struct MessageResponse {
    message: &'static str,
}

/// `POST /auth/login`: the access token in the body, the refresh token as an
/// http-only cookie. Any failure, including an unreadable body, is a generic
/// 401 with no cookie.
pub async fn login(
    State(state): State<ApiState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Response, AuthError> {
    let Json(payload) = payload.map_err(|e| {
        tracing::debug!(error = %e, "Unreadable login request");
        AuthError::InvalidCredentials
    })?;
    let (pair, identity) = state
        .backend
        .login(payload.email.trim(), &payload.password)
        .await?;

    Ok((
        [(header::SET_COOKIE, state.refresh_cookie.issue(&pair.refresh.token))],
        Json(TokenResponse::new(&pair, Some(UserInfo::from(&identity)))),
    )
        .into_response())
}

/// `POST /auth/refresh`: rotate the refresh cookie and mint a new access
/// token. A refused refresh token is cleared so the client re-logs in.
pub async fn refresh(State(state): State<ApiState>, headers: HeaderMap) -> Response {
    let Some(token) = get_cookie(&headers, REFRESH_COOKIE_NAME).filter(|t| !t.is_empty()) else {
        return AuthError::RefreshTokenMissing.into_response();
    };

    match state.backend.rotate(token).await {
        Ok((pair, _)) => (
            [(header::SET_COOKIE, state.refresh_cookie.issue(&pair.refresh.token))],
            Json(TokenResponse::new(&pair, None)),
        )
            .into_response(),
        Err(e @ AuthError::RefreshTokenInvalid(_)) => (
            [(header::SET_COOKIE, state.refresh_cookie.clear())],
            e,
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

/// `POST /auth/logout`: clears the refresh cookie. Tokens already issued stay
/// valid until they expire.
pub async fn logout(State(state): State<ApiState>, Auth(principal): Auth) -> Response {
    tracing::info!(user_id = principal.id, token_id = %principal.token_id, "Logged out");
    (
        [(header::SET_COOKIE, state.refresh_cookie.clear())],
        Json(MessageResponse {
            message: "Logged out successfully",
        }),
    )
        .into_response()
}
