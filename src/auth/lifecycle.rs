//! Login and refresh-token rotation.
//!
//! Rotation is stateless: a superseded refresh token stays cryptographically
//! valid until it expires, because no revocation store exists.

use tracing::{error, info, warn};

use super::errors::{AuthError, RefreshFailure};
use super::state::AuthBackend;
use crate::identity::{Identity, IdentityError};
use crate::jwt::{IssuedToken, JwtError};

/// A freshly minted access/refresh pair.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access: IssuedToken,
    pub refresh: IssuedToken,
}

impl AuthBackend {
    /// Check credentials and issue a token pair.
    ///
    /// Unknown email and wrong password are indistinguishable to the caller,
    /// in both the error returned and the work performed.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
    ) -> Result<(TokenPair, Identity), AuthError> {
        let identity = match self.identities.load_by_email(email).await {
            Ok(identity) => Some(identity),
            Err(IdentityError::NotFound) => None,
            Err(IdentityError::Store(e)) => {
                error!(error = %e, "Identity lookup failed during login");
                return Err(AuthError::Internal);
            }
        };

        let passwords = self.passwords.clone();
        let password = password.to_owned();
        let hash = identity.as_ref().map(|i| i.password_hash.clone());
        let verified =
            tokio::task::spawn_blocking(move || passwords.verify(&password, hash.as_deref()))
                .await
                .map_err(|e| {
                    error!(error = %e, "Password verification task failed");
                    AuthError::Internal
                })?;

        let identity = match identity {
            Some(identity) if verified => identity,
            _ => {
                info!("Login rejected");
                return Err(AuthError::InvalidCredentials);
            }
        };

        let pair = self.issue_pair(&identity)?;
        info!(user_id = identity.id, "Login succeeded");
        Ok((pair, identity))
    }

    /// Exchange a refresh token for a brand-new pair.
    pub async fn rotate(&self, refresh_token: &str) -> Result<(TokenPair, Identity), AuthError> {
        let claims = self
            .jwt
            .validate_refresh_token(refresh_token)
            .map_err(|e| match e {
                JwtError::Expired => AuthError::RefreshTokenInvalid(RefreshFailure::Expired),
                JwtError::Encoding(_) | JwtError::TimeError => AuthError::Internal,
                JwtError::Malformed | JwtError::SignatureInvalid | JwtError::WrongKind => {
                    warn!(error = %e, "Refresh token rejected");
                    AuthError::RefreshTokenInvalid(RefreshFailure::Invalid)
                }
            })?;

        let user_id = claims
            .subject_id()
            .map_err(|_| AuthError::RefreshTokenInvalid(RefreshFailure::Invalid))?;

        let identity = match self.identities.load_by_id(user_id).await {
            Ok(identity) => identity,
            Err(IdentityError::NotFound) => {
                warn!(user_id, "Refresh token subject no longer exists");
                return Err(AuthError::RefreshTokenInvalid(RefreshFailure::IdentityGone));
            }
            Err(IdentityError::Store(e)) => {
                error!(user_id, error = %e, "Identity lookup failed during refresh");
                return Err(AuthError::Internal);
            }
        };

        let pair = self.issue_pair(&identity)?;
        info!(user_id, old_jti = %claims.jti, new_jti = %pair.refresh.jti, "Refresh token rotated");
        Ok((pair, identity))
    }

    fn issue_pair(&self, identity: &Identity) -> Result<TokenPair, AuthError> {
        let access = self.jwt.issue_access_token(identity).map_err(|e| {
            error!(error = %e, "Failed to issue access token");
            AuthError::Internal
        })?;
        let refresh = self.jwt.issue_refresh_token(identity.id).map_err(|e| {
            error!(error = %e, "Failed to issue refresh token");
            AuthError::Internal
        })?;
        Ok(TokenPair { access, refresh })
    }
}
