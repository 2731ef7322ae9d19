//! Registration and the current-user summary.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use super::ApiState;
use super::error::{ApiError, ResultExt};
use crate::auth::{Auth, AuthError, UserInfo};
use crate::identity::{IdentityError, Role};

const MIN_PASSWORD_LENGTH: usize = 8;
const MAX_NAME_LENGTH: usize = 64;
const MAX_EMAIL_LENGTH: usize = 254;

#[derive(Deserialize)]
pub struct RegisterRequest {
    name: String,
    email: String,
    password: String,
}

#[derive(Serialize)]
pub struct MessageResponse {
    message: &'static str,
}

fn is_plausible_email(email: &str) -> bool {
    if email.len() > MAX_EMAIL_LENGTH || email.chars().any(char::is_whitespace) {
        return false;
    }
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain
                    .split_once('.')
                    .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty())
        }
        None => false,
    }
}

/// `POST /auth/register`. New identities always get the `User` role.
pub async fn register(
    State(state): State<ApiState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let Json(payload) =
        payload.map_err(|_| ApiError::bad_request("Name, email and password are required"))?;
    let name = payload.name.trim();
    let email = payload.email.trim();

    if name.is_empty() {
        return Err(ApiError::bad_request("Name cannot be empty"));
    }
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(ApiError::bad_request(format!(
            "Name cannot be longer than {} characters",
            MAX_NAME_LENGTH
        )));
    }
    if !is_plausible_email(email) {
        return Err(ApiError::bad_request("Invalid email address"));
    }
    if payload.password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(ApiError::bad_request(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LENGTH
        )));
    }

    let users = state.db.users();
    if users
        .email_exists(email)
        .await
        .db_err("Failed to check email availability")?
    {
        return Err(ApiError::bad_request("Email already in use"));
    }

    let passwords = state.backend.passwords.clone();
    let password = payload.password;
    let password_hash = tokio::task::spawn_blocking(move || passwords.hash(&password))
        .await
        .map_err(|e| {
            error!(error = %e, "Password hashing task failed");
            ApiError::internal("Internal server error")
        })?
        .map_err(|e| {
            error!(error = %e, "Password hashing failed");
            ApiError::internal("Internal server error")
        })?;

    let user_id = match users.create(email, name, &password_hash, Role::User).await {
        Ok(id) => id,
        // Lost a race with a concurrent registration for the same email.
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            return Err(ApiError::bad_request("Email already in use"));
        }
        Err(e) => return Err(ApiError::db_error("Failed to create user", e)),
    };

    info!(user_id, "User registered");
    Ok(Json(MessageResponse {
        message: "User registered successfully",
    }))
}

/// `GET /api/user`: a fresh summary of the authenticated identity.
pub async fn current_user(
    State(state): State<ApiState>,
    Auth(principal): Auth,
) -> Result<Json<UserInfo>, AuthError> {
    match state.backend.identities.load_by_id(principal.id).await {
        Ok(identity) => Ok(Json(UserInfo::from(&identity))),
        Err(IdentityError::NotFound) => Err(AuthError::IdentityNotFound),
        Err(IdentityError::Store(e)) => {
            error!(user_id = principal.id, error = %e, "Failed to load current user");
            Err(AuthError::Internal)
        }
    }
}
