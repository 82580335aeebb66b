//! Credential service - one-way hashing and verification of card secrets.
//!
//! Security codes and passwords are stored as Argon2id PHC strings with a fresh
//! random salt per digest. Digests must never be compared with `==`; hashing the
//! same secret twice yields different strings. Use [`CredentialService::verify`].

use crate::config::CredentialSettings;
use crate::errors::{Error, Result};
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use rand::rngs::OsRng;
use tokio::task;

/// Hashes and verifies secrets with a fixed work factor.
#[derive(Clone)]
pub struct CredentialService {
    hasher: Argon2<'static>,
}

impl std::fmt::Debug for CredentialService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialService")
            .field("params", self.hasher.params())
            .finish()
    }
}

impl CredentialService {
    /// Builds the service from configured cost parameters.
    ///
    /// # Errors
    /// Returns [`Error::Config`] when the parameters are outside Argon2's limits
    /// (e.g. less than 8 KiB of memory per lane).
    pub fn new(settings: &CredentialSettings) -> Result<Self> {
        let params = Params::new(
            settings.memory_kib,
            settings.iterations,
            settings.parallelism,
            None,
        )
        .map_err(|e| Error::Config {
            message: format!("Invalid credential work factor: {e}"),
        })?;

        Ok(Self {
            hasher: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }

    /// Produces a salted digest of `secret`.
    ///
    /// Hashing runs on the blocking pool so it never stalls other tasks.
    ///
    /// # Errors
    /// Returns [`Error::Internal`] if the hasher fails, which only happens on
    /// resource exhaustion, or if the hashing task is lost.
    pub async fn hash(&self, secret: &str) -> Result<String> {
        let hasher = self.hasher.clone();
        let secret = secret.to_owned();
        task::spawn_blocking(move || {
            let salt = SaltString::generate(&mut OsRng);
            hasher
                .hash_password(secret.as_bytes(), &salt)
                .map(|digest| digest.to_string())
                .map_err(|e| Error::internal(format!("failed to hash secret: {e}")))
        })
        .await
        .map_err(|e| Error::internal(format!("hashing task failed: {e}")))?
    }

    /// True iff `secret` is the input `digest` was produced from.
    ///
    /// A malformed digest never verifies. The digest carries its own parameters,
    /// so secrets hashed under an older work factor still verify.
    ///
    /// # Errors
    /// Returns [`Error::Internal`] if the verification task is lost.
    pub async fn verify(&self, secret: &str, digest: &str) -> Result<bool> {
        let hasher = self.hasher.clone();
        let secret = secret.to_owned();
        let digest = digest.to_owned();
        task::spawn_blocking(move || {
            PasswordHash::new(&digest)
                .is_ok_and(|parsed| hasher.verify_password(secret.as_bytes(), &parsed).is_ok())
        })
        .await
        .map_err(|e| Error::internal(format!("verification task failed: {e}")))
    }

    /// Like [`verify`](Self::verify), treating an absent digest as one that
    /// nothing matches.
    ///
    /// # Errors
    /// Returns [`Error::Internal`] if the verification task is lost.
    pub async fn verify_optional(&self, secret: &str, digest: Option<&str>) -> Result<bool> {
        match digest {
            Some(digest) => self.verify(secret, digest).await,
            None => Ok(false),
        }
    }
}
