use axum::{
    Json,
    extract::State,
    http::header,
    response::{IntoResponse, Response},
};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::RngCore;
use serde::Serialize;

use super::ApiState;
use crate::auth::csrf_cookie;

#[derive(Serialize)]
struct CsrfResponse {
    token: String,
}

/// `GET /csrf`: a fresh double-submit token, both in a script-readable cookie
/// and in the body.
pub async fn issue_csrf_token(State(state): State<ApiState>) -> Response {
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    let token = URL_SAFE_NO_PAD.encode(bytes);

    (
        [(header::SET_COOKIE, csrf_cookie(&token, state.secure_cookies))],
        Json(CsrfResponse { token }),
    )
        .into_response()
}
