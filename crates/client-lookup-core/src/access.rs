//! Two-tier access control
//!
//! A credential is compared against two shared secrets. The admin secret is
//! checked first, so a deployment that configures the same value for both
//! grants admin.
//!
//! ```text
//! Anonymous ──(general secret)──► User
//!     │
//!     └─────(admin secret)──────► Admin
//! ```
//!
//! Both granted roles are terminal for the life of the session. A failed
//! attempt leaves the session anonymous and may be retried without limit.

use crate::error::{AuthError, ConfigError};
use crate::types::{Role, Session};

/// The two configured shared secrets
#[derive(Clone)]
pub struct Secrets {
    general: String,
    admin: String,
}

impl Secrets {
    pub fn new(general: impl Into<String>, admin: impl Into<String>) -> Result<Self, ConfigError> {
        let general = general.into();
        let admin = admin.into();
        if general.is_empty() {
            return Err(ConfigError::EmptySecret {
                name: "general secret",
            });
        }
        if admin.is_empty() {
            return Err(ConfigError::EmptySecret {
                name: "admin secret",
            });
        }
        Ok(Self { general, admin })
    }
}

// Never print secret material.
impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secrets")
            .field("general", &"***")
            .field("admin", &"***")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct AccessController {
    secrets: Secrets,
}

impl AccessController {
    pub fn new(secrets: Secrets) -> Self {
        Self { secrets }
    }

    /// Map a credential to the role it grants.
    pub fn authenticate(&self, credential: &str) -> Result<Role, AuthError> {
        if credential.is_empty() {
            return Err(AuthError::Incorrect);
        }
        if credential == self.secrets.admin {
            Ok(Role::Admin)
        } else if credential == self.secrets.general {
            Ok(Role::User)
        } else {
            Err(AuthError::Incorrect)
        }
    }

    /// Apply a login attempt to `session` and return the successor session.
    ///
    /// An already authenticated session is returned unchanged.
    pub fn login(&self, session: &Session, credential: &str) -> Result<Session, AuthError> {
        if session.is_authenticated() {
            tracing::debug!(session_id = %session.id(), role = %session.role(), "Session already authenticated");
            return Ok(session.clone());
        }

        match self.authenticate(credential) {
            Ok(role) => {
                tracing::info!(session_id = %session.id(), %role, "Session authenticated");
                Ok(session.clone().with_role(role))
            }
            Err(e) => {
                tracing::warn!(session_id = %session.id(), "Rejected credential");
                Err(e)
            }
        }
    }
}
