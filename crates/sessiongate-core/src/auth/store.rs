//! The session store: single authoritative snapshot of "who is signed in".

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::provider::{IdentityProvider, ProviderError};

use super::{Session, SessionState};

/// Reactive mirror of the provider's authentication state.
///
/// On construction the store registers exactly one subscription with the
/// provider and spawns the single writer task: every received event fully
/// replaces the stored snapshot - the provider is the sole source of truth,
/// so no stale local read survives a transition. Readers take snapshot-style
/// value reads without locking.
///
/// Dropping the store aborts the writer, cancelling the subscription so no
/// callback ever lands in a torn-down store.
#[derive(Debug)]
pub struct SessionStore {
    state: watch::Receiver<SessionState>,
    writer: JoinHandle<()>,
}

impl SessionStore {
    /// Subscribe to the provider and start mirroring its state.
    ///
    /// A subscription that cannot be established is a fatal configuration
    /// error, not a per-event failure; it surfaces here and startup should
    /// abort visibly.
    pub fn connect(provider: &dyn IdentityProvider) -> Result<Self, ProviderError> {
        let mut subscription = provider.subscribe()?;
        let (tx, rx) = watch::channel(SessionState::Unknown);

        let writer = tokio::spawn(async move {
            while let Some(event) = subscription.recv().await {
                let next = match event {
                    Some(session) => {
                        debug!(
                            subject = %session.subject_id,
                            email = %session.email,
                            "provider reported signed-in identity"
                        );
                        SessionState::Authenticated(session)
                    }
                    None => {
                        debug!("provider reported no active identity");
                        SessionState::Anonymous
                    }
                };
                tx.send_replace(next);
            }
            debug!("provider subscription ended");
        });

        Ok(Self { state: rx, writer })
    }

    /// Latest snapshot; never blocks.
    pub fn current(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Hand out a receiver for reactive consumers (bootstrap gate, UI).
    ///
    /// This is also the documented way to await convergence after a façade
    /// operation: a resolved request carries no ordering guarantee relative
    /// to the store's transition.
    pub fn watch(&self) -> watch::Receiver<SessionState> {
        self.state.clone()
    }

    /// The active session, if any.
    pub fn session(&self) -> Option<Session> {
        self.state.borrow().session().cloned()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated()
    }
}

impl Drop for SessionStore {
    fn drop(&mut self) {
        self.writer.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{ProviderError, ScriptedProvider};

    #[tokio::test]
    async fn test_unknown_until_first_event() {
        let provider = ScriptedProvider::new();
        let store = SessionStore::connect(&provider).unwrap();
        assert_eq!(store.current(), SessionState::Unknown);

        provider.emit(None);
        let mut rx = store.watch();
        rx.wait_for(|s| *s == SessionState::Anonymous).await.unwrap();
        assert_eq!(store.current(), SessionState::Anonymous);
    }

    #[tokio::test]
    async fn test_snapshot_tracks_last_event_exactly() {
        let provider = ScriptedProvider::new();
        let store = SessionStore::connect(&provider).unwrap();

        let first = ScriptedProvider::session_for("first@x.com", false);
        let second = ScriptedProvider::session_for("second@x.com", true);

        provider.emit(Some(first));
        provider.emit(None);
        provider.emit(Some(second.clone()));

        let expected = SessionState::Authenticated(second.clone());
        let mut rx = store.watch();
        rx.wait_for(|s| *s == expected).await.unwrap();

        // The snapshot is the third payload wholesale, not a merge
        assert_eq!(store.current(), expected);
        assert_eq!(store.session(), Some(second));
        assert!(store.is_authenticated());
    }

    #[tokio::test]
    async fn test_sign_out_replaces_authenticated_snapshot() {
        let provider = ScriptedProvider::new();
        let store = SessionStore::connect(&provider).unwrap();

        provider.emit(Some(ScriptedProvider::session_for("a@x.com", true)));
        provider.emit(None);

        let mut rx = store.watch();
        rx.wait_for(|s| *s == SessionState::Anonymous).await.unwrap();
        assert_eq!(store.session(), None);
        assert!(!store.is_authenticated());
    }

    #[tokio::test]
    async fn test_subscription_failure_is_fatal() {
        let provider = ScriptedProvider::new();
        provider.refuse_subscriptions();

        let err = SessionStore::connect(&provider).unwrap_err();
        assert!(matches!(err, ProviderError::Subscription(_)));
    }
}
