//! Password hashing and verification using Argon2id
//!
//! The work factor comes from [`HasherConfig`], built once at startup from
//! the `HASH_*` settings. Requests never influence it.
//!
//! - Algorithm: Argon2id
//! - Memory: 19 MiB
//! - Iterations: 2
//! - Parallelism: 1 lane
//! - Salt: 16 bytes random, fresh per call
//! - Output: 32 bytes hash
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use quill_core::AuthConfig;
use thiserror::Error;
use tracing::{error, warn};

/// Password hashing errors
#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("Invalid hashing parameters: {0}")]
    InvalidParams(String),

    #[error("Failed to hash password: {0}")]
    HashingFailed(String),
}

/// Argon2 cost parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HasherConfig {
    /// Memory cost in KiB
    pub memory_cost: u32,
    /// Time cost (iterations)
    pub time_cost: u32,
    /// Parallelism (lanes)
    pub parallelism: u32,
    /// Output length in bytes
    pub output_len: Option<usize>,
}

impl Default for HasherConfig {
    fn default() -> Self {
        Self {
            memory_cost: 19 * 1024,
            time_cost: 2,
            parallelism: 1,
            output_len: Some(32),
        }
    }
}

impl HasherConfig {
    /// Cheapest valid parameters, for tests only
    pub fn light() -> Self {
        Self {
            memory_cost: 1024,
            time_cost: 1,
            parallelism: 1,
            output_len: Some(32),
        }
    }

    fn to_params(&self) -> Result<Params, PasswordError> {
        Params::new(
            self.memory_cost,
            self.time_cost,
            self.parallelism,
            self.output_len,
        )
        .map_err(|e| PasswordError::InvalidParams(e.to_string()))
    }
}

impl From<&AuthConfig> for HasherConfig {
    fn from(config: &AuthConfig) -> Self {
        Self {
            memory_cost: config.hash_memory_kib,
            time_cost: config.hash_time_cost,
            parallelism: config.hash_parallelism,
            ..Default::default()
        }
    }
}

/// One-way credential hashing with a fixed work factor
#[derive(Clone)]
pub struct CredentialHasher {
    argon2: Argon2<'static>,
}

impl std::fmt::Debug for CredentialHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialHasher").finish_non_exhaustive()
    }
}

impl CredentialHasher {
    /// Build a hasher; fails only on out-of-range parameters
    pub fn new(config: &HasherConfig) -> Result<Self, PasswordError> {
        let params = config.to_params()?;
        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }

    /// Hash a plaintext password into a PHC string
    ///
    /// Every call draws a fresh salt, so hashing the same input twice
    /// gives two different digests.
    pub fn hash(&self, plaintext: &str) -> Result<String, PasswordError> {
        let salt = SaltString::generate(&mut OsRng);

        let digest = self
            .argon2
            .hash_password(plaintext.as_bytes(), &salt)
            .map_err(|e| PasswordError::HashingFailed(e.to_string()))?;

        Ok(digest.to_string())
    }

    /// Check a plaintext password against a stored digest
    ///
    /// Uses the salt and parameters embedded in the digest. A mismatch is
    /// `false`, and so is a digest that cannot be parsed.
    pub fn verify(&self, plaintext: &str, digest: &str) -> bool {
        let parsed = match PasswordHash::new(digest) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(error = %e, "Stored password digest is malformed");
                return false;
            }
        };

        match self.argon2.verify_password(plaintext.as_bytes(), &parsed) {
            Ok(()) => true,
            Err(argon2::password_hash::Error::Password) => false,
            Err(e) => {
                warn!(error = %e, "Password verification failed");
                false
            }
        }
    }

    /// [`Self::hash`] on the blocking thread pool
    pub async fn hash_blocking(&self, plaintext: String) -> Result<String, PasswordError> {
        let hasher = self.clone();
        tokio::task::spawn_blocking(move || hasher.hash(&plaintext))
            .await
            .map_err(|e| PasswordError::HashingFailed(e.to_string()))?
    }

    /// [`Self::verify`] on the blocking thread pool
    pub async fn verify_blocking(&self, plaintext: String, digest: String) -> bool {
        let hasher = self.clone();
        match tokio::task::spawn_blocking(move || hasher.verify(&plaintext, &digest)).await {
            Ok(matched) => matched,
            Err(e) => {
                error!(error = %e, "Password verification task failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn hasher() -> CredentialHasher {
        CredentialHasher::new(&HasherConfig::light()).unwrap()
    }

    #[test]
    fn test_hash_and_verify_password() {
        let hasher = hasher();
        let digest = hasher.hash("SecureP@ssw0rd!").unwrap();

        assert!(hasher.verify("SecureP@ssw0rd!", &digest));
        assert!(!hasher.verify("WrongPassword", &digest));
    }

    #[test]
    fn test_same_password_produces_different_hashes() {
        let hasher = hasher();
        let first = hasher.hash("SamePassword123!").unwrap();
        let second = hasher.hash("SamePassword123!").unwrap();

        assert_ne!(first, second);
        assert!(hasher.verify("SamePassword123!", &first));
        assert!(hasher.verify("SamePassword123!", &second));
    }

    #[test]
    fn test_malformed_digest_is_false() {
        let hasher = hasher();
        assert!(!hasher.verify("password", "invalid-hash-format"));
        assert!(!hasher.verify("password", ""));
    }

    #[test]
    fn test_digest_carries_parameters() {
        let config = HasherConfig {
            memory_cost: 2048,
            time_cost: 2,
            parallelism: 2,
            output_len: Some(32),
        };
        let digest = CredentialHasher::new(&config).unwrap().hash("pw123456").unwrap();

        assert!(digest.starts_with("$argon2id$"));
        assert!(digest.contains("m=2048"));
        assert!(digest.contains("t=2"));
        assert!(digest.contains("p=2"));

        // Verification follows the digest, not the verifier's own cost
        assert!(hasher().verify("pw123456", &digest));
    }

    #[test]
    fn test_invalid_params_rejected() {
        let config = HasherConfig {
            time_cost: 0,
            ..HasherConfig::light()
        };
        assert!(matches!(
            CredentialHasher::new(&config),
            Err(PasswordError::InvalidParams(_))
        ));
    }

    #[test]
    fn test_from_auth_config() {
        let auth = AuthConfig {
            hash_memory_kib: 4096,
            hash_time_cost: 3,
            hash_parallelism: 2,
            ..Default::default()
        };
        let config = HasherConfig::from(&auth);
        assert_eq!(config.memory_cost, 4096);
        assert_eq!(config.time_cost, 3);
        assert_eq!(config.parallelism, 2);
    }

    #[tokio::test]
    async fn test_blocking_variants() {
        let hasher = hasher();
        let digest = hasher.hash_blocking("from-a-task".to_string()).await.unwrap();

        assert!(
            hasher
                .verify_blocking("from-a-task".to_string(), digest.clone())
                .await
        );
        assert!(!hasher.verify_blocking("other".to_string(), digest).await);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(12))]

        #[test]
        fn verify_accepts_own_hash(password in "\\PC{0,24}") {
            let hasher = hasher();
            let digest = hasher.hash(&password).unwrap();
            prop_assert!(hasher.verify(&password, &digest));
        }

        #[test]
        fn verify_rejects_other_password(p in "[a-zA-Z0-9]{1,16}", q in "[a-zA-Z0-9]{1,16}") {
            prop_assume!(p != q);
            let hasher = hasher();
            let digest = hasher.hash(&p).unwrap();
            prop_assert!(!hasher.verify(&q, &digest));
        }
    }
}
