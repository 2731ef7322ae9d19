//! The authenticated principal attached to a request.

use serde::Serialize;

use super::errors::AuthError;
use crate::identity::{Identity, Role};

/// Identity resolved for one request from a validated access token and a
/// fresh store lookup. Lives in the request's extensions and is dropped with
/// the request.
#[derive(Debug, Clone)]
pub struct Principal {
    pub id: i64,
    pub email: String,
    pub display_name: String,
    pub role: Role,
    pub authorities: Vec<String>,
    /// JTI of the access token that authenticated the request
    pub token_id: String,
}

impl Principal {
    pub fn new(identity: &Identity, token_id: impl Into<String>) -> Self {
        Self {
            id: identity.id,
            email: identity.email.clone(),
            display_name: identity.display_name.clone(),
            role: identity.role,
            authorities: vec![identity.role.authority()],
            token_id: token_id.into(),
        }
    }

    pub fn has_authority(&self, authority: &str) -> bool {
        self.authorities.iter().any(|a| a == authority)
    }

    pub fn require_role(&self, role: Role) -> Result<(), AuthError> {
        if self.has_authority(&role.authority()) {
            Ok(())
        } else {
            Err(AuthError::InsufficientRole)
        }
    }
}

/// Identity summary returned to clients. Never includes the password hash.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub roles: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&Identity> for UserInfo {
    fn from(identity: &Identity) -> Self {
        Self {
            id: identity.id,
            name: identity.display_name.clone(),
            email: identity.email.clone(),
            roles: vec![identity.role.authority()],
            created_at: identity.created_at.clone(),
            updated_at: identity.updated_at.clone(),
        }
    }
}
