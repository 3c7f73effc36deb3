//! User - Account Entity with Salted Password Hashing
//!
//! The stored `password` field holds an Argon2id hash, never the plain text.
//! Rehydration copies the stored hash as-is; only [`User::set_password`]
//! hashes.

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};

use super::{BaseModel, Entity, EntityKind, Model};
use crate::storage::{StorageError, StorageResult};

// =============================================================================
// Constants
// =============================================================================

/// Dict key / column of the password hash
pub const PASSWORD_FIELD: &str = "password";

/// Argon2 memory cost in KiB (19 MiB)
pub const PASSWORD_MEMORY_KIB: u32 = 19 * 1024;

/// Argon2 iterations
pub const PASSWORD_ITERATIONS: u32 = 2;

/// Argon2 lanes
pub const PASSWORD_PARALLELISM: u32 = 1;

// =============================================================================
// User
// =============================================================================

/// A registered account.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct User {
    #[serde(flatten)]
    pub base: BaseModel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Argon2id hash in PHC string format (`$argon2id$v=19$...`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
}

impl User {
    /// Create a user with an email address.
    #[must_use]
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: Some(email.into()),
            ..Self::default()
        }
    }

    /// Set first and last name.
    #[must_use]
    pub fn with_name(mut self, first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        self.first_name = Some(first_name.into());
        self.last_name = Some(last_name.into());
        self
    }

    /// Hash `plain` with a fresh random salt and store it.
    ///
    /// # Errors
    /// Returns `StorageError::Password` if the hasher rejects its parameters.
    pub fn set_password(&mut self, plain: &str) -> StorageResult<()> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = hasher()?
            .hash_password(plain.as_bytes(), &salt)
            .map_err(|e| StorageError::Password(e.to_string()))?;
        self.password = Some(hash.to_string());
        Ok(())
    }

    /// Check `plain` against the stored hash.
    ///
    /// Returns `false` when no password is set or the stored value is not a
    /// PHC hash string. Parameters are read from the stored hash.
    #[must_use]
    pub fn verify_password(&self, plain: &str) -> bool {
        let Some(stored) = self.password.as_deref() else {
            return false;
        };
        let Ok(parsed) = PasswordHash::new(stored) else {
            return false;
        };
        Argon2::default()
            .verify_password(plain.as_bytes(), &parsed)
            .is_ok()
    }
}

fn hasher() -> StorageResult<Argon2<'static>> {
    let params = Params::new(
        PASSWORD_MEMORY_KIB,
        PASSWORD_ITERATIONS,
        PASSWORD_PARALLELISM,
        None,
    )
    .map_err(|e| StorageError::Password(e.to_string()))?;
    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}

impl Entity for User {
    const KIND: EntityKind = EntityKind::User;

    fn base(&self) -> &BaseModel {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BaseModel {
        &mut self.base
    }

    fn from_model(model: Model) -> Option<Self> {
        match model {
            Model::User(user) => Some(user),
            _ => None,
        }
    }
}

impl From<User> for Model {
    fn from(user: User) -> Self {
        Self::User(user)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_is_hashed_not_stored() {
        let mut user = User::new("betty@hbnb.io");
        user.set_password("pwd").unwrap();
        let stored = user.password.clone().unwrap();
        assert!(stored.starts_with("$argon2id$"));
        assert!(!stored.contains("pwd"));
        assert!(user.verify_password("pwd"));
        assert!(!user.verify_password("other"));
    }

    #[test]
    fn test_password_hash_is_salted() {
        let mut a = User::new("a@hbnb.io");
        let mut b = User::new("b@hbnb.io");
        a.set_password("same").unwrap();
        b.set_password("same").unwrap();
        assert_ne!(a.password, b.password);
    }

    #[test]
    fn test_verify_without_password_is_false() {
        let user = User::new("nobody@hbnb.io");
        assert!(!user.verify_password(""));

        let mut legacy = User::new("legacy@hbnb.io");
        legacy.password = Some("5f4dcc3b5aa765d61d8327deb882cf99".to_string());
        assert!(!legacy.verify_password("password"));
    }

    #[test]
    fn test_hash_records_parameters() {
        let mut user = User::new("params@hbnb.io");
        user.set_password("pwd").unwrap();
        let stored = user.password.clone().unwrap();
        let parsed = PasswordHash::new(&stored).unwrap();
        assert_eq!(parsed.algorithm.as_str(), "argon2id");
        let params = format!("m={PASSWORD_MEMORY_KIB},t={PASSWORD_ITERATIONS},p={PASSWORD_PARALLELISM}");
        assert!(stored.contains(&params));
    }

    #[test]
    fn test_rehydration_keeps_hash() {
        let mut user = User::new("c@hbnb.io").with_name("Betty", "Holberton");
        user.set_password("pwd").unwrap();
        let back = User::from_dict(user.to_dict()).unwrap();
        assert_eq!(back.password, user.password);
        assert!(back.verify_password("pwd"));
        assert_eq!(back.first_name.as_deref(), Some("Betty"));
    }

    #[test]
    fn test_unset_fields_absent_from_dict() {
        let dict = User::default().to_dict();
        assert!(!dict.contains_key("email"));
        assert!(!dict.contains_key("password"));
        assert_eq!(dict["__class__"], "User");
    }
}
