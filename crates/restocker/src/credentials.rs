//! Portal login credentials.
//!
//! The library never reads the environment itself; the CLI resolves the
//! credential variables and hands a [`CredentialSource`] to the pipeline.

use std::fmt;

/// User name and access code for the portal login form
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Portal user name
    pub username: String,
    /// Password / access code
    pub password: String,
}

impl Credentials {
    /// Build credentials
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Where credentials come from
pub trait CredentialSource: Send + Sync {
    /// Credentials, if both parts are configured
    fn credentials(&self) -> Option<Credentials>;
}

/// Credentials fixed at construction
///
/// Blank parts count as missing, so an exported-but-empty variable does not
/// reach the login form.
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials {
    username: Option<String>,
    password: Option<String>,
}

impl StaticCredentials {
    /// Source over optional parts
    #[must_use]
    pub fn new(username: Option<String>, password: Option<String>) -> Self {
        Self { username, password }
    }

    /// Source that never yields credentials
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }
}

impl CredentialSource for StaticCredentials {
    fn credentials(&self) -> Option<Credentials> {
        let username = self.username.as_deref().map(str::trim).filter(|s| !s.is_empty())?;
        let password = self.password.as_deref().filter(|s| !s.is_empty())?;
        Some(Credentials::new(username, password))
    }
}
