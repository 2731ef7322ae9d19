//! Password hashing and verification (bcrypt).

use tracing::warn;

pub use bcrypt::DEFAULT_COST;

/// Hashes and verifies passwords at a fixed bcrypt cost.
///
/// Holds a dummy hash so that a login attempt for an unknown email still pays
/// for one bcrypt comparison.
pub struct PasswordHasher {
    cost: u32,
    dummy_hash: String,
}

impl PasswordHasher {
    pub fn new(cost: u32) -> Result<Self, bcrypt::BcryptError> {
        let dummy_hash = bcrypt::hash(uuid::Uuid::new_v4().to_string(), cost)?;
        Ok(Self { cost, dummy_hash })
    }

    pub fn hash(&self, password: &str) -> Result<String, bcrypt::BcryptError> {
        bcrypt::hash(password, self.cost)
    }

    /// Verify a password. `None` means the account does not exist; the dummy
    /// hash is checked instead and the result is always `false`.
    pub fn verify(&self, password: &str, hash: Option<&str>) -> bool {
        match hash {
            Some(hash) => bcrypt::verify(password, hash).unwrap_or_else(|e| {
                warn!(error = %e, "Stored password hash could not be verified");
                false
            }),
            None => {
                let _ = bcrypt::verify(password, &self.dummy_hash);
                false
            }
        }
    }
}
