//! Shared, immutable authentication backend.

use std::sync::Arc;

use crate::identity::IdentityProvider;
use crate::jwt::JwtConfig;
use crate::password::PasswordHasher;

/// Everything the login, rotation and token-authentication paths need.
/// Cheap to clone; nothing inside is mutated after startup.
#[derive(Clone)]
pub struct AuthBackend {
    pub jwt: Arc<JwtConfig>,
    pub identities: Arc<dyn IdentityProvider>,
    pub passwords: Arc<PasswordHasher>,
}
