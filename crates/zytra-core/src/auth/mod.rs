//! Account management
//!
//! Credentials live behind the [`CredentialStore`] trait so the web layer and
//! the session workflow never depend on a concrete backend. The bundled
//! [`InMemoryCredentialStore`] keeps plaintext secrets in a map and forgets
//! everything on restart; deployments that need more should inject their own
//! implementation (hashed secrets, durable storage).

pub mod session;

use std::collections::HashMap;
use std::sync::RwLock;

use serde::Serialize;
use tracing::{debug, info};

use crate::config::AuthConfig;
use crate::error::{Error, Result};

pub use session::{AuthState, ResetFlow, Session};

/// Public view of an account (never carries the secret)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub email: String,
    pub display_name: String,
}

/// Abstraction over a credential backend.
///
/// Email and display name are each unique across all records. Rejected
/// mutations must leave the store unchanged.
pub trait CredentialStore: Send + Sync {
    /// Whether an account exists for this email
    fn exists_by_email(&self, email: &str) -> Result<bool>;

    /// Whether any account uses this display name
    fn exists_by_display_name(&self, display_name: &str) -> Result<bool>;

    /// Create a new account.
    ///
    /// Checks run in a fixed order: duplicate email, duplicate display name,
    /// then empty fields.
    fn register(&self, email: &str, display_name: &str, secret: &str) -> Result<Identity>;

    /// Check a secret. Unknown email and wrong secret are both
    /// [`Error::InvalidCredentials`].
    fn authenticate(&self, email: &str, secret: &str) -> Result<Identity>;

    /// Overwrite the secret of an existing account
    fn update_secret(&self, email: &str, new_secret: &str) -> Result<()>;
}

#[derive(Debug, Clone)]
struct Record {
    display_name: String,
    secret: String,
}

/// Reference store backed by a lock-guarded map
#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    records: RwLock<HashMap<String, Record>>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding the configured admin account (if enabled)
    pub fn from_config(config: &AuthConfig) -> Result<Self> {
        let store = Self::new();
        if config.seed_admin {
            store.register(&config.admin_email, &config.admin_name, &config.admin_secret)?;
            info!(email = %config.admin_email, "Seeded admin account");
        }
        Ok(store)
    }

    /// Number of registered accounts
    pub fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, HashMap<String, Record>>> {
        self.records
            .read()
            .map_err(|_| Error::Store("credential store lock poisoned".into()))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, HashMap<String, Record>>> {
        self.records
            .write()
            .map_err(|_| Error::Store("credential store lock poisoned".into()))
    }
}

impl CredentialStore for InMemoryCredentialStore {
    fn exists_by_email(&self, email: &str) -> Result<bool> {
        Ok(self.read()?.contains_key(email))
    }

    fn exists_by_display_name(&self, display_name: &str) -> Result<bool> {
        Ok(self
            .read()?
            .values()
            .any(|r| r.display_name == display_name))
    }

    fn register(&self, email: &str, display_name: &str, secret: &str) -> Result<Identity> {
        // Single write guard so the uniqueness checks and the insert are atomic
        let mut records = self.write()?;

        if records.contains_key(email) {
            return Err(Error::DuplicateEmail);
        }
        if records.values().any(|r| r.display_name == display_name) {
            return Err(Error::DuplicateDisplayName);
        }
        if email.is_empty() || display_name.is_empty() || secret.is_empty() {
            return Err(Error::InvalidInput("Please fill all fields".into()));
        }

        records.insert(
            email.to_string(),
            Record {
                display_name: display_name.to_string(),
                secret: secret.to_string(),
            },
        );
        debug!(email, display_name, "Registered account");

        Ok(Identity {
            email: email.to_string(),
            display_name: display_name.to_string(),
        })
    }

    fn authenticate(&self, email: &str, secret: &str) -> Result<Identity> {
        let records = self.read()?;
        match records.get(email) {
            Some(record) if record.secret == secret => Ok(Identity {
                email: email.to_string(),
                display_name: record.display_name.clone(),
            }),
            _ => Err(Error::InvalidCredentials),
        }
    }

    fn update_secret(&self, email: &str, new_secret: &str) -> Result<()> {
        let mut records = self.write()?;
        let record = records
            .get_mut(email)
            .ok_or_else(|| Error::NotFound(format!("Email not found: {}", email)))?;
        record.secret = new_secret.to_string();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with_admin() -> InMemoryCredentialStore {
        let store = InMemoryCredentialStore::new();
        store
            .register("admin@zytra.com", "admin", "zytra123")
            .unwrap();
        store
    }

    #[test]
    fn test_register_and_lookup() {
        let store = store_with_admin();
        assert!(store.exists_by_email("admin@zytra.com").unwrap());
        assert!(!store.exists_by_email("nobody@zytra.com").unwrap());
        assert!(store.exists_by_display_name("admin").unwrap());
        assert!(!store.exists_by_display_name("Admin").unwrap());
    }

    #[test]
    fn test_duplicate_email_rejected_without_change() {
        let store = store_with_admin();
        let err = store
            .register("admin@zytra.com", "someone", "pw")
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateEmail));
        assert_eq!(store.len(), 1);
        assert!(!store.exists_by_display_name("someone").unwrap());
        // Original secret still works
        assert!(store.authenticate("admin@zytra.com", "zytra123").is_ok());
    }

    #[test]
    fn test_duplicate_display_name_rejected() {
        let store = store_with_admin();
        let err = store.register("new@zytra.com", "admin", "pw").unwrap_err();
        assert!(matches!(err, Error::DuplicateDisplayName));
        assert!(!store.exists_by_email("new@zytra.com").unwrap());
    }

    #[test]
    fn test_duplicate_email_wins_over_duplicate_name() {
        let store = store_with_admin();
        let err = store.register("admin@zytra.com", "admin", "pw").unwrap_err();
        assert!(matches!(err, Error::DuplicateEmail));
    }

    #[test]
    fn test_empty_fields_rejected() {
        let store = InMemoryCredentialStore::new();
        for (email, name, secret) in [("", "n", "s"), ("e@x.com", "", "s"), ("e@x.com", "n", "")] {
            let err = store.register(email, name, secret).unwrap_err();
            assert!(matches!(err, Error::InvalidInput(_)));
        }
        assert!(store.is_empty());
    }

    #[test]
    fn test_authenticate() {
        let store = store_with_admin();
        let identity = store.authenticate("admin@zytra.com", "zytra123").unwrap();
        assert_eq!(identity.display_name, "admin");

        assert!(matches!(
            store.authenticate("admin@zytra.com", "wrong"),
            Err(Error::InvalidCredentials)
        ));
        assert!(matches!(
            store.authenticate("ghost@zytra.com", "zytra123"),
            Err(Error::InvalidCredentials)
        ));
    }

    #[test]
    fn test_update_secret() {
        let store = store_with_admin();
        store.update_secret("admin@zytra.com", "fresh").unwrap();
        assert!(store.authenticate("admin@zytra.com", "fresh").is_ok());
        assert!(store.authenticate("admin@zytra.com", "zytra123").is_err());

        assert!(matches!(
            store.update_secret("ghost@zytra.com", "x"),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_from_config_seeds_admin() {
        let store = InMemoryCredentialStore::from_config(&AuthConfig::default()).unwrap();
        assert!(store.authenticate("admin@zytra.com", "zytra123").is_ok());

        let config = AuthConfig {
            seed_admin: false,
            ..Default::default()
        };
        let store = InMemoryCredentialStore::from_config(&config).unwrap();
        assert!(store.is_empty());
    }
}
