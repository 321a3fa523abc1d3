//! Bootstrap gate: hold application startup for the first authoritative
//! session state.
//!
//! Some providers fire once for a cache-restore and again for the live
//! confirmation; the gate turns that into exactly one startup. Later events
//! are ordinary state updates, not repeated startups.

use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;
use tokio::sync::watch;

use crate::auth::{SessionState, SessionStore};

/// The provider subscription ended before any session state arrived.
/// No session state can ever be known, so startup should abort visibly.
#[derive(Debug, Error)]
#[error("identity provider subscription ended before any session state arrived")]
pub struct StartupAborted;

/// Single-fire startup latch over the session store.
pub struct BootstrapGate {
    state: watch::Receiver<SessionState>,
    opened: AtomicBool,
}

impl BootstrapGate {
    pub fn new(store: &SessionStore) -> Self {
        Self {
            state: store.watch(),
            opened: AtomicBool::new(false),
        }
    }

    /// Completes when the store first leaves `Unknown`.
    ///
    /// Any number of waiters may wait concurrently; once the state has
    /// resolved, further calls complete immediately.
    pub async fn ready(&self) -> Result<SessionState, StartupAborted> {
        let mut rx = self.state.clone();
        let state = rx
            .wait_for(SessionState::is_resolved)
            .await
            .map_err(|_| StartupAborted)?;
        Ok(state.clone())
    }

    /// Wait for [`ready`](Self::ready), then claim the one-shot startup.
    ///
    /// The first caller receives the resolved state; every later caller gets
    /// `None`, no matter how many provider events have fired in between.
    pub async fn open(&self) -> Result<Option<SessionState>, StartupAborted> {
        let state = self.ready().await?;
        let first = self
            .opened
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        Ok(first.then_some(state))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ScriptedProvider;

    #[tokio::test]
    async fn test_opens_exactly_once_across_restore_and_confirm() {
        let provider = ScriptedProvider::new();
        let store = SessionStore::connect(&provider).unwrap();
        let gate = BootstrapGate::new(&store);

        // Cache-restore fires first with no identity
        provider.emit(None);
        let first = gate.open().await.unwrap();
        assert_eq!(first, Some(SessionState::Anonymous));

        // Live confirmation arrives later; the gate stays consumed
        provider.emit(Some(ScriptedProvider::session_for("a@x.com", true)));
        assert_eq!(gate.open().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_ready_serves_multiple_waiters() {
        let provider = ScriptedProvider::new();
        let store = SessionStore::connect(&provider).unwrap();
        let gate = BootstrapGate::new(&store);

        provider.emit(None);
        let (first, second) = tokio::join!(gate.ready(), gate.ready());
        assert_eq!(first.unwrap(), SessionState::Anonymous);
        assert_eq!(second.unwrap(), SessionState::Anonymous);

        // Still answers after the one-shot open has been claimed
        assert!(gate.open().await.unwrap().is_some());
        assert_eq!(gate.ready().await.unwrap(), SessionState::Anonymous);
    }

    #[tokio::test]
    async fn test_lost_subscription_aborts_startup() {
        let provider = ScriptedProvider::new();
        let store = SessionStore::connect(&provider).unwrap();
        let gate = BootstrapGate::new(&store);

        // Tearing down the store cancels the subscription before any event
        drop(store);
        assert!(gate.ready().await.is_err());
        assert!(gate.open().await.is_err());
    }
}
