//! Login / password reset state machine for one session

use serde::Serialize;
use tracing::{info, warn};

use super::{CredentialStore, Identity};
use crate::error::{Error, Result};

/// Whether someone is logged in
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum AuthState {
    LoggedOut,
    LoggedIn { identity: Identity },
}

/// Password reset progress, orthogonal to [`AuthState`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum ResetFlow {
    Inactive,
    AwaitingEmailVerification,
    AwaitingNewSecret { email: String },
}

/// Authentication state of a single session
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    pub auth: AuthState,
    pub reset: ResetFlow,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            auth: AuthState::LoggedOut,
            reset: ResetFlow::Inactive,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self.auth, AuthState::LoggedIn { .. })
    }

    /// Currently logged-in identity
    pub fn identity(&self) -> Option<&Identity> {
        match &self.auth {
            AuthState::LoggedIn { identity } => Some(identity),
            AuthState::LoggedOut => None,
        }
    }

    fn require_logged_out(&self) -> Result<()> {
        if self.is_authenticated() {
            return Err(Error::InvalidState("Already logged in".into()));
        }
        Ok(())
    }

    pub fn login(
        &mut self,
        store: &dyn CredentialStore,
        email: &str,
        secret: &str,
    ) -> Result<Identity> {
        self.require_logged_out()?;
        if self.reset != ResetFlow::Inactive {
            return Err(Error::InvalidState("Password reset in progress".into()));
        }

        let identity = store.authenticate(email, secret).inspect_err(|_| {
            warn!(email, "Rejected login attempt");
        })?;
        info!(email, "User logged in");

        self.auth = AuthState::LoggedIn {
            identity: identity.clone(),
        };
        Ok(identity)
    }

    /// Register a new account. The session stays logged out.
    pub fn sign_up(
        &self,
        store: &dyn CredentialStore,
        email: &str,
        display_name: &str,
        secret: &str,
    ) -> Result<Identity> {
        self.require_logged_out()?;
        store.register(email, display_name, secret)
    }

    pub fn logout(&mut self) -> Result<()> {
        match &self.auth {
            AuthState::LoggedIn { identity } => {
                info!(email = %identity.email, "User logged out");
                self.auth = AuthState::LoggedOut;
                Ok(())
            }
            AuthState::LoggedOut => Err(Error::InvalidState("Not logged in".into())),
        }
    }

    pub fn request_reset(&mut self) -> Result<()> {
        self.require_logged_out()?;
        self.reset = ResetFlow::AwaitingEmailVerification;
        Ok(())
    }

    /// Confirm which account is being reset
    pub fn verify(&mut self, store: &dyn CredentialStore, email: &str) -> Result<()> {
        if self.reset != ResetFlow::AwaitingEmailVerification {
            return Err(Error::InvalidState("No password reset awaiting verification".into()));
        }
        if !store.exists_by_email(email)? {
            return Err(Error::NotFound("Email not found".into()));
        }
        self.reset = ResetFlow::AwaitingNewSecret {
            email: email.to_string(),
        };
        Ok(())
    }

    /// Store the new secret and return to the login screen
    pub fn submit(&mut self, store: &dyn CredentialStore, new_secret: &str) -> Result<()> {
        let email = match &self.reset {
            ResetFlow::AwaitingNewSecret { email } => email.clone(),
            _ => return Err(Error::InvalidState("No verified password reset".into())),
        };
        store.update_secret(&email, new_secret)?;
        info!(email = %email, "Password reset completed");

        self.reset = ResetFlow::Inactive;
        self.auth = AuthState::LoggedOut;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::InMemoryCredentialStore;

    fn store() -> InMemoryCredentialStore {
        let store = InMemoryCredentialStore::new();
        store
            .register("admin@zytra.com", "admin", "zytra123")
            .unwrap();
        store
    }

    #[test]
    fn test_initial_state() {
        let session = Session::new();
        assert_eq!(session.auth, AuthState::LoggedOut);
        assert_eq!(session.reset, ResetFlow::Inactive);
        assert!(session.identity().is_none());
    }

    #[test]
    fn test_login_logout() {
        let store = store();
        let mut session = Session::new();

        let identity = session.login(&store, "admin@zytra.com", "zytra123").unwrap();
        assert_eq!(identity.email, "admin@zytra.com");
        assert!(session.is_authenticated());

        session.logout().unwrap();
        assert!(!session.is_authenticated());
        assert!(session.identity().is_none());
    }

    #[test]
    fn test_failed_login_stays_logged_out() {
        let store = store();
        let mut session = Session::new();
        let err = session.login(&store, "admin@zytra.com", "nope").unwrap_err();
        assert!(matches!(err, Error::InvalidCredentials));
        assert_eq!(session, Session::new());
    }

    #[test]
    fn test_logout_when_logged_out_is_invalid() {
        let mut session = Session::new();
        assert!(matches!(session.logout(), Err(Error::InvalidState(_))));
    }

    #[test]
    fn test_reset_flow() {
        let store = store();
        let mut session = Session::new();

        session.request_reset().unwrap();
        assert_eq!(session.reset, ResetFlow::AwaitingEmailVerification);

        session.verify(&store, "admin@zytra.com").unwrap();
        assert_eq!(
            session.reset,
            ResetFlow::AwaitingNewSecret {
                email: "admin@zytra.com".into()
            }
        );

        session.submit(&store, "newpass").unwrap();
        assert_eq!(session.reset, ResetFlow::Inactive);
        assert!(!session.is_authenticated());

        assert!(store.authenticate("admin@zytra.com", "newpass").is_ok());
        assert!(store.authenticate("admin@zytra.com", "zytra123").is_err());
    }

    #[test]
    fn test_verify_unknown_email_stays_awaiting() {
        let store = store();
        let mut session = Session::new();
        session.request_reset().unwrap();

        let err = session.verify(&store, "ghost@zytra.com").unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        assert_eq!(session.reset, ResetFlow::AwaitingEmailVerification);
    }

    #[test]
    fn test_out_of_order_reset_steps() {
        let store = store();
        let mut session = Session::new();

        assert!(matches!(
            session.verify(&store, "admin@zytra.com"),
            Err(Error::InvalidState(_))
        ));
        assert!(matches!(
            session.submit(&store, "x"),
            Err(Error::InvalidState(_))
        ));

        session.request_reset().unwrap();
        assert!(matches!(
            session.submit(&store, "x"),
            Err(Error::InvalidState(_))
        ));
        // Login is blocked while the reset flow is active
        assert!(matches!(
            session.login(&store, "admin@zytra.com", "zytra123"),
            Err(Error::InvalidState(_))
        ));
    }

    #[test]
    fn test_sign_up_keeps_session_logged_out() {
        let store = store();
        let session = Session::new();
        let identity = session
            .sign_up(&store, "new@zytra.com", "newbie", "pw")
            .unwrap();
        assert_eq!(identity.display_name, "newbie");
        assert!(!session.is_authenticated());
        assert!(store.authenticate("new@zytra.com", "pw").is_ok());
    }

    #[test]
    fn test_empty_new_secret_is_accepted() {
        let store = store();
        let mut session = Session::new();
        session.request_reset().unwrap();
        session.verify(&store, "admin@zytra.com").unwrap();
        session.submit(&store, "").unwrap();
        assert!(store.authenticate("admin@zytra.com", "").is_ok());
    }
}
