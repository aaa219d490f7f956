//! Session context supplied by the host application.
//!
//! The controller never obtains or refreshes credentials itself; it only reads
//! the bearer token and user id it was handed.
use secrecy::SecretString;

/// Bearer token plus the user identity it belongs to.
///
/// Either half may be missing (logged-out view). Blank strings count as missing.
#[derive(Clone, Default)]
pub struct Session {
    token: Option<SecretString>,
    user_id: Option<String>,
}

impl Session {
    pub fn new(token: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self::from_parts(Some(token.into()), Some(user_id.into()))
    }

    /// Build a session from optional parts, discarding blank values.
    pub fn from_parts(token: Option<String>, user_id: Option<String>) -> Self {
        let token = token
            .filter(|t| !t.trim().is_empty())
            .map(SecretString::from);
        let user_id = user_id.filter(|u| !u.trim().is_empty());
        Self { token, user_id }
    }

    /// A session with neither token nor user id.
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn token(&self) -> Option<&SecretString> {
        self.token.as_ref()
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    /// Token and user id together, as required by every mutating call.
    pub fn credentials(&self) -> Option<Credentials<'_>> {
        Some(Credentials {
            token: self.token.as_ref()?,
            user_id: self.user_id.as_deref()?,
        })
    }
}

/// Mask the token in Debug output.
impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("user_id", &self.user_id)
            .finish()
    }
}

/// Borrowed view of a complete session.
#[derive(Clone, Copy)]
pub struct Credentials<'a> {
    pub token: &'a SecretString,
    pub user_id: &'a str,
}
