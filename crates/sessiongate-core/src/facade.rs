//! Identity operations façade.
//!
//! Wraps every provider request in a uniform outcome: the payload on
//! success, one of a closed set of [`OperationError`] kinds on failure.
//! Provider-level failures never cross this boundary raw.
//!
//! A resolved operation is an acknowledgment only. The authoritative session
//! transition arrives through the store's own subscription, possibly after
//! the operation resolves; callers that need "the store already reflects my
//! login" must observe [`SessionStore::watch`].

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::auth::{Session, SessionState, SessionStore};
use crate::provider::{IdentityProvider, ProviderError};

/// Closed error taxonomy surfaced by the façade.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OperationError {
    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("an account with this email already exists")]
    AccountAlreadyExists,

    #[error("network unavailable: {0}")]
    NetworkUnavailable(String),

    #[error("no active session")]
    NoActiveSession,

    /// Catch-all for provider failures with no dedicated kind.
    #[error("identity provider error: {0}")]
    ProviderUnknown(String),
}

impl From<ProviderError> for OperationError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::InvalidCredentials => OperationError::InvalidCredentials,
            ProviderError::EmailInUse => OperationError::AccountAlreadyExists,
            ProviderError::Network(e) => OperationError::NetworkUnavailable(e.to_string()),
            other => OperationError::ProviderUnknown(other.to_string()),
        }
    }
}

/// Outcome of a verification-email request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationOutcome {
    /// The provider was asked to send the email.
    Sent,
    /// The target address was already verified; no request was issued.
    AlreadyVerified,
}

pub struct IdentityFacade {
    provider: Arc<dyn IdentityProvider>,
    state: watch::Receiver<SessionState>,
    return_url: String,
}

impl IdentityFacade {
    /// `return_url` is where the provider sends the user after they confirm
    /// a verification email.
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        store: &SessionStore,
        return_url: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            state: store.watch(),
            return_url: return_url.into(),
        }
    }

    /// Request account creation. The store converges to `Authenticated`
    /// through its own subscription; the façade does not mutate it.
    pub async fn register(&self, email: &str, password: &str) -> Result<Session, OperationError> {
        match self.provider.request_register(email, password).await {
            Ok(session) => {
                info!(email = %session.email, "account created");
                Ok(session)
            }
            Err(err) => {
                warn!(email, error = %err, "registration failed");
                Err(err.into())
            }
        }
    }

    /// Request credential verification for an existing account.
    pub async fn login(&self, email: &str, password: &str) -> Result<Session, OperationError> {
        match self.provider.request_login(email, password).await {
            Ok(session) => {
                info!(email = %session.email, "login acknowledged");
                Ok(session)
            }
            Err(err) => {
                warn!(email, error = %err, "login failed");
                Err(err.into())
            }
        }
    }

    /// Request session termination. The store transitions to `Anonymous`
    /// through the push path afterwards.
    pub async fn logout(&self) -> Result<(), OperationError> {
        match self.provider.request_logout().await {
            Ok(()) => {
                info!("logout acknowledged");
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "logout failed");
                Err(err.into())
            }
        }
    }

    /// Request a verification email for `session_override`, or for the
    /// store's current session when no override is given.
    ///
    /// An already-verified target short-circuits to
    /// [`VerificationOutcome::AlreadyVerified`] without issuing any provider
    /// request, no matter how often it is called. Having no target at all is
    /// a precondition failure ([`OperationError::NoActiveSession`]), not a
    /// provider error.
    pub async fn send_verification_email(
        &self,
        session_override: Option<&Session>,
    ) -> Result<VerificationOutcome, OperationError> {
        let target = match session_override {
            Some(session) => session.clone(),
            None => match self.state.borrow().session().cloned() {
                Some(session) => session,
                None => {
                    warn!("verification email requested with no active session");
                    return Err(OperationError::NoActiveSession);
                }
            },
        };

        if target.email_verified {
            info!(email = %target.email, "email already verified, skipping provider request");
            return Ok(VerificationOutcome::AlreadyVerified);
        }

        match self
            .provider
            .request_send_verification(&target, &self.return_url)
            .await
        {
            Ok(()) => {
                info!(email = %target.email, "verification email requested");
                Ok(VerificationOutcome::Sent)
            }
            Err(err) => {
                warn!(email = %target.email, error = %err, "verification request failed");
                Err(err.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ScriptedProvider;

    /// Provider, connected store and façade wired the way an application
    /// shell does it.
    fn wired() -> (Arc<ScriptedProvider>, SessionStore, IdentityFacade) {
        let provider = Arc::new(ScriptedProvider::new());
        let store = SessionStore::connect(provider.as_ref()).unwrap();
        let facade = IdentityFacade::new(provider.clone(), &store, "/profile");
        (provider, store, facade)
    }

    #[tokio::test]
    async fn test_login_acknowledges_and_store_converges_independently() {
        let (_provider, store, facade) = wired();

        let session = facade.login("a@x.com", "secret").await.unwrap();
        assert_eq!(session.email, "a@x.com");

        // The acknowledgment does not imply the store already transitioned;
        // convergence is observed through the watch channel.
        let expected = SessionState::Authenticated(session);
        let mut rx = store.watch();
        rx.wait_for(|s| *s == expected).await.unwrap();
        assert_eq!(store.current(), expected);
    }

    #[tokio::test]
    async fn test_duplicate_account_maps_to_already_exists() {
        let (provider, _store, facade) = wired();
        provider.fail_next(ProviderError::EmailInUse);

        let err = facade.register("dup@x.com", "pw").await.unwrap_err();
        assert_eq!(err, OperationError::AccountAlreadyExists);
    }

    #[tokio::test]
    async fn test_invalid_login_maps_to_invalid_credentials() {
        let (provider, _store, facade) = wired();
        provider.fail_next(ProviderError::InvalidCredentials);

        let err = facade.login("a@x.com", "wrong").await.unwrap_err();
        assert_eq!(err, OperationError::InvalidCredentials);
    }

    #[tokio::test]
    async fn test_unmapped_provider_failure_is_catch_all() {
        let (provider, _store, facade) = wired();
        provider.fail_next(ProviderError::Rejected {
            code: "OPERATION_NOT_ALLOWED".to_string(),
        });

        let err = facade.logout().await.unwrap_err();
        assert!(matches!(err, OperationError::ProviderUnknown(_)));
    }

    #[tokio::test]
    async fn test_verification_without_session_is_precondition_failure() {
        let (provider, store, facade) = wired();

        provider.emit(None);
        let mut rx = store.watch();
        rx.wait_for(|s| *s == SessionState::Anonymous).await.unwrap();

        let err = facade.send_verification_email(None).await.unwrap_err();
        assert_eq!(err, OperationError::NoActiveSession);
        assert_eq!(provider.verification_request_count(), 0);
    }

    #[tokio::test]
    async fn test_already_verified_short_circuits_every_time() {
        let (provider, _store, facade) = wired();
        let verified = ScriptedProvider::session_for("a@x.com", true);

        for _ in 0..3 {
            let outcome = facade
                .send_verification_email(Some(&verified))
                .await
                .unwrap();
            assert_eq!(outcome, VerificationOutcome::AlreadyVerified);
        }
        assert_eq!(provider.verification_request_count(), 0);
    }

    #[tokio::test]
    async fn test_unverified_target_issues_one_request_per_call() {
        let (provider, _store, facade) = wired();
        let unverified = ScriptedProvider::session_for("a@x.com", false);

        let outcome = facade
            .send_verification_email(Some(&unverified))
            .await
            .unwrap();
        assert_eq!(outcome, VerificationOutcome::Sent);
        assert_eq!(provider.verification_request_count(), 1);
    }

    #[tokio::test]
    async fn test_verification_defaults_to_current_session() {
        let (provider, store, facade) = wired();

        let signed_in = ScriptedProvider::session_for("a@x.com", false);
        provider.emit(Some(signed_in.clone()));
        let expected = SessionState::Authenticated(signed_in);
        let mut rx = store.watch();
        rx.wait_for(|s| *s == expected).await.unwrap();

        let outcome = facade.send_verification_email(None).await.unwrap();
        assert_eq!(outcome, VerificationOutcome::Sent);
        assert_eq!(provider.verification_request_count(), 1);
    }
}
