use std::fmt;

/// Opaque provider credential handle.
///
/// Carried inside a [`Session`] and handed back to the identity provider for
/// follow-up requests (e.g. sending a verification email). The application
/// never interprets its contents.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Reveal the raw token. Intended for identity provider implementations;
    /// application code has no use for the contents.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

// Keep tokens out of logs
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(..)")
    }
}

/// The signed-in identity as reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Provider-assigned subject identifier, stable per account.
    pub subject_id: String,
    /// May be empty for anonymous-capable providers.
    pub email: String,
    pub email_verified: bool,
    /// Opaque handle used only to pass back into provider requests.
    pub credential: Credential,
}

impl Session {
    pub fn new(
        subject_id: impl Into<String>,
        email: impl Into<String>,
        email_verified: bool,
        credential: Credential,
    ) -> Self {
        Self {
            subject_id: subject_id.into(),
            email: email.into(),
            email_verified,
            credential,
        }
    }
}

/// Snapshot of the session store.
///
/// Transitions: `Unknown` -> `Anonymous` | `Authenticated`, then between
/// `Anonymous` and `Authenticated` as the provider reports changes. The store
/// never writes `Unknown` again once the first provider event has arrived.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    /// No provider callback received yet.
    #[default]
    Unknown,
    /// Provider reported no active identity.
    Anonymous,
    /// Provider reported a signed-in identity.
    Authenticated(Session),
}

impl SessionState {
    /// True once the provider has reported anything at all.
    pub fn is_resolved(&self) -> bool {
        !matches!(self, SessionState::Unknown)
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionState::Authenticated(_))
    }

    /// The active session, if any.
    pub fn session(&self) -> Option<&Session> {
        match self {
            SessionState::Authenticated(session) => Some(session),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_debug_is_redacted() {
        let credential = Credential::new("super-secret-token");
        let rendered = format!("{:?}", credential);
        assert!(!rendered.contains("super-secret-token"));
        assert_eq!(credential.expose(), "super-secret-token");
    }

    #[test]
    fn test_state_predicates() {
        let session = Session::new("u1", "a@x.com", false, Credential::new("t"));

        assert!(!SessionState::Unknown.is_resolved());
        assert!(SessionState::Anonymous.is_resolved());
        assert!(!SessionState::Anonymous.is_authenticated());

        let state = SessionState::Authenticated(session.clone());
        assert!(state.is_resolved());
        assert!(state.is_authenticated());
        assert_eq!(state.session(), Some(&session));
        assert_eq!(SessionState::Anonymous.session(), None);
    }
}
