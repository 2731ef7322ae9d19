//! JWT token issuance and validation.
//!
//! Two token kinds share one HS256 signing key:
//! - Access tokens: short-lived, carry the identity profile (role, email, name)
//! - Refresh tokens: long-lived, carry only subject, timestamps and a JTI
//!
//! The `typ` claim keeps the kinds disjoint: a refresh token never passes
//! access validation and an access token is never accepted for rotation.

use std::collections::HashSet;
use std::time::{SystemTime, UNIX_EPOCH};

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::identity::{Identity, Role};

/// Token kind, encoded in the `typ` claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// Claims carried by both token kinds.
///
/// Profile claims are only present on access tokens. They are informational:
/// authorization decisions use a fresh identity lookup, not these values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// JWT ID, unique per issued token
    pub jti: String,
    /// Subject (identity id as a decimal string)
    pub sub: String,
    #[serde(rename = "typ")]
    pub kind: TokenKind,
    /// Issued at (Unix seconds)
    pub iat: u64,
    /// Expiration time (Unix seconds)
    pub exp: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Claims {
    /// Subject parsed as an identity id.
    pub fn subject_id(&self) -> Result<i64, JwtError> {
        self.sub.parse().map_err(|_| JwtError::Malformed)
    }
}

/// Default access token lifetime: 15 minutes
pub const DEFAULT_ACCESS_TOKEN_TTL_SECS: u64 = 15 * 60;

/// Default refresh token lifetime: 7 days
pub const DEFAULT_REFRESH_TOKEN_TTL_SECS: u64 = 7 * 24 * 60 * 60;

/// A freshly signed token plus the metadata the transport layer needs.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    /// The compact JWT string
    pub token: String,
    /// JWT ID
    pub jti: String,
    /// Issued at (Unix seconds)
    pub issued_at: u64,
    /// Expiration (Unix seconds)
    pub expires_at: u64,
    /// Lifetime in seconds
    pub duration: u64,
}

/// Signing keys and lifetimes. Immutable after construction and safe to share.
#[derive(Clone)]
pub struct JwtConfig {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_ttl: u64,
    refresh_ttl: u64,
}

impl JwtConfig {
    /// Create a configuration with the default token lifetimes.
    pub fn new(secret: &[u8]) -> Self {
        Self::with_ttls(
            secret,
            DEFAULT_ACCESS_TOKEN_TTL_SECS,
            DEFAULT_REFRESH_TOKEN_TTL_SECS,
        )
    }

    pub fn with_ttls(secret: &[u8], access_ttl: u64, refresh_ttl: u64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            access_ttl,
            refresh_ttl,
        }
    }

    pub fn access_ttl(&self) -> u64 {
        self.access_ttl
    }

    pub fn refresh_ttl(&self) -> u64 {
        self.refresh_ttl
    }

    /// Issue an access token carrying the identity's profile claims.
    pub fn issue_access_token(&self, identity: &Identity) -> Result<IssuedToken, JwtError> {
        self.issue(
            identity.id,
            TokenKind::Access,
            self.access_ttl,
            Some(identity),
        )
    }

    /// Issue a refresh token. Only subject, timestamps and JTI are encoded.
    pub fn issue_refresh_token(&self, identity_id: i64) -> Result<IssuedToken, JwtError> {
        self.issue(identity_id, TokenKind::Refresh, self.refresh_ttl, None)
    }

    fn issue(
        &self,
        identity_id: i64,
        kind: TokenKind,
        ttl: u64,
        profile: Option<&Identity>,
    ) -> Result<IssuedToken, JwtError> {
        let now = now_secs()?;
        let jti = uuid::Uuid::new_v4().to_string();
        let exp = now + ttl;

        let claims = Claims {
            jti: jti.clone(),
            sub: identity_id.to_string(),
            kind,
            iat: now,
            exp,
            role: profile.map(|i| i.role),
            email: profile.map(|i| i.email.clone()),
            name: profile.map(|i| i.display_name.clone()),
        };

        let token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| JwtError::Encoding(e.to_string()))?;

        Ok(IssuedToken {
            token,
            jti,
            issued_at: now,
            expires_at: exp,
            duration: ttl,
        })
    }

    /// Parse, verify the signature, check expiry, then check the kind.
    ///
    /// Expiry is reported before a kind mismatch, so an expired but otherwise
    /// well-formed token always yields `Expired`.
    pub fn parse_and_validate(&self, token: &str, expected: TokenKind) -> Result<Claims, JwtError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        let claims = jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(JwtError::from)?
            .claims;

        if claims.kind != expected {
            return Err(JwtError::WrongKind);
        }

        if expected == TokenKind::Access
            && (claims.role.is_none() || claims.email.is_none() || claims.name.is_none())
        {
            return Err(JwtError::Malformed);
        }

        Ok(claims)
    }

    pub fn validate_access_token(&self, token: &str) -> Result<Claims, JwtError> {
        self.parse_and_validate(token, TokenKind::Access)
    }

    pub fn validate_refresh_token(&self, token: &str) -> Result<Claims, JwtError> {
        self.parse_and_validate(token, TokenKind::Refresh)
    }

    /// Read the subject after a signature check, without enforcing expiry.
    ///
    /// Callers must not authorize on this result alone.
    pub fn extract_subject(&self, token: &str) -> Result<String, JwtError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.required_spec_claims = HashSet::from(["sub".to_string()]);

        let claims = jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(JwtError::from)?
            .claims;

        Ok(claims.sub)
    }
}

fn now_secs() -> Result<u64, JwtError> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .map_err(|_| JwtError::TimeError)
}

/// Errors that can occur during JWT operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JwtError {
    #[error("Failed to encode token: {0}")]
    Encoding(String),
    #[error("Malformed token")]
    Malformed,
    #[error("Invalid token signature")]
    SignatureInvalid,
    #[error("Token expired")]
    Expired,
    /// An access token presented where a refresh token is required, or vice versa
    #[error("Wrong token type")]
    WrongKind,
    #[error("System time error")]
    TimeError,
}

impl From<jsonwebtoken::errors::Error> for JwtError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        match e.kind() {
            ErrorKind::InvalidSignature => JwtError::SignatureInvalid,
            ErrorKind::ExpiredSignature => JwtError::Expired,
            _ => JwtError::Malformed,
        }
    }
}
