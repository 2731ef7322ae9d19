//! Authentication error taxonomy and its HTTP mapping.

use axum::{
    Json,
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::identity::IdentityError;
use crate::jwt::JwtError;

/// Header telling clients that a refresh (not a re-login) is needed.
pub const TOKEN_EXPIRED_HEADER: &str = "x-token-expired";

/// Why a refresh token was refused. Callers only ever see
/// `RefreshTokenInvalid`; the detail is kept for logs and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshFailure {
    Invalid,
    Expired,
    IdentityGone,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("malformed token")]
    TokenMalformed,
    #[error("invalid token signature")]
    TokenSignatureInvalid,
    #[error("token expired")]
    TokenExpired,
    #[error("wrong token kind")]
    TokenWrongKind,
    #[error("identity not found")]
    IdentityNotFound,
    #[error("origin rejected")]
    OriginRejected,
    #[error("refresh token invalid ({0:?})")]
    RefreshTokenInvalid(RefreshFailure),
    #[error("refresh token missing")]
    RefreshTokenMissing,
    #[error("CSRF token rejected")]
    CsrfRejected,
    #[error("not authenticated")]
    NotAuthenticated,
    #[error("insufficient role")]
    InsufficientRole,
    #[error("internal error")]
    Internal,
}

impl From<JwtError> for AuthError {
    fn from(e: JwtError) -> Self {
        match e {
            JwtError::Expired => AuthError::TokenExpired,
            JwtError::SignatureInvalid => AuthError::TokenSignatureInvalid,
            JwtError::WrongKind => AuthError::TokenWrongKind,
            JwtError::Malformed => AuthError::TokenMalformed,
            JwtError::Encoding(_) | JwtError::TimeError => AuthError::Internal,
        }
    }
}

impl From<IdentityError> for AuthError {
    fn from(e: IdentityError) -> Self {
        match e {
            IdentityError::NotFound => AuthError::IdentityNotFound,
            IdentityError::Store(_) => AuthError::Internal,
        }
    }
}

impl AuthError {
    fn status_code(&self) -> StatusCode {
        match self {
            AuthError::OriginRejected | AuthError::CsrfRejected | AuthError::InsufficientRole => {
                StatusCode::FORBIDDEN
            }
            AuthError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::UNAUTHORIZED,
        }
    }

    /// Outward message. Token and identity failures collapse to one message so
    /// responses never reveal which check failed.
    fn message(&self) -> &'static str {
        match self {
            AuthError::InvalidCredentials => "Invalid credentials",
            AuthError::TokenExpired => "access_token_expired",
            AuthError::TokenMalformed
            | AuthError::TokenSignatureInvalid
            | AuthError::TokenWrongKind
            | AuthError::IdentityNotFound
            | AuthError::NotAuthenticated => "Not authenticated",
            AuthError::OriginRejected => "Origin not allowed",
            AuthError::RefreshTokenInvalid(_) => "Invalid or expired refresh token",
            AuthError::RefreshTokenMissing => "Refresh token missing",
            AuthError::CsrfRejected => "Invalid CSRF token",
            AuthError::InsufficientRole => "Insufficient permissions",
            AuthError::Internal => "Internal server error",
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: &'static str,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let mut response = (
            self.status_code(),
            Json(ErrorResponse {
                error: self.message(),
            }),
        )
            .into_response();

        if self == AuthError::TokenExpired {
            response
                .headers_mut()
                .insert(TOKEN_EXPIRED_HEADER, HeaderValue::from_static("true"));
        }

        response
    }
}
