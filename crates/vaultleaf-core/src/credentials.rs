//! Password gate in front of the vault.
//!
//! The record is two preference keys written together: a flag saying a
//! password has been configured and an Argon2id PHC string (salt included).

use crate::error::{Result, VaultError};
use crate::prefs::PreferenceStore;
use argon2::Argon2;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use tracing::{info, warn};

const KEY_PASSWORD_HASH: &str = "app_password_hash";
const KEY_PASSWORD_SET: &str = "password_set";

pub const MIN_PASSWORD_LEN: usize = 6;

/// Checks applied on the setup screen before a password is stored.
pub fn validate_new_password(password: &str, confirmation: &str) -> Result<()> {
    if password.is_empty() || confirmation.is_empty() {
        return Err(VaultError::PasswordRejected("password fields cannot be empty"));
    }
    if password != confirmation {
        return Err(VaultError::PasswordRejected("passwords do not match"));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(VaultError::PasswordRejected(
            "password must be at least 6 characters long",
        ));
    }
    Ok(())
}

pub struct CredentialGate {
    prefs: PreferenceStore,
}

impl CredentialGate {
    pub fn new(prefs: PreferenceStore) -> Self {
        Self { prefs }
    }

    pub fn is_configured(&self) -> bool {
        self.prefs.get_bool(KEY_PASSWORD_SET).unwrap_or(false)
    }

    pub fn set_password(&mut self, plaintext: &str) -> Result<()> {
        let hash = hash_password(plaintext)?;
        self.prefs.edit(|e| {
            e.put_string(KEY_PASSWORD_HASH, hash)
                .put_bool(KEY_PASSWORD_SET, true);
        })?;
        info!("Vault password configured");
        Ok(())
    }

    pub fn verify(&self, plaintext: &str) -> bool {
        let Some(stored) = self.prefs.get_string(KEY_PASSWORD_HASH) else {
            return false;
        };
        let parsed = match PasswordHash::new(stored) {
            Ok(parsed) => parsed,
            Err(err) => {
                warn!("Stored password hash is unreadable: {err}");
                return false;
            }
        };
        Argon2::default()
            .verify_password(plaintext.as_bytes(), &parsed)
            .is_ok()
    }
}

fn hash_password(plaintext: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plaintext.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| VaultError::Preferences(format!("hashing password: {err}")))
}
