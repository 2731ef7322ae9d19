//! Identity records and the lookup seam the authentication core depends on.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Single-valued role of an identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "USER",
            Role::Admin => "ADMIN",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "ADMIN" => Role::Admin,
            _ => Role::User,
        }
    }

    /// Authority string granted by this role, e.g. `ROLE_USER`.
    pub fn authority(&self) -> String {
        format!("ROLE_{}", self.as_str())
    }
}

/// A stored identity. Read-only to the authentication core.
#[derive(Debug, Clone)]
pub struct Identity {
    pub id: i64,
    /// Unique login handle
    pub email: String,
    pub display_name: String,
    pub password_hash: String,
    pub role: Role,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("Identity not found")]
    NotFound,
    #[error("Identity store error: {0}")]
    Store(String),
}

/// Resolves subjects to identities.
///
/// Implementations must be safe for concurrent use without holding locks
/// across the lookup; the pipeline calls this once per authenticated request.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn load_by_id(&self, id: i64) -> Result<Identity, IdentityError>;

    async fn load_by_email(&self, email: &str) -> Result<Identity, IdentityError>;
}
