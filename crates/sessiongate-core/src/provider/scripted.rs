//! Scripted in-memory provider for tests and offline demos.
//!
//! Lets a test drive the push path directly: emit an arbitrary event
//! sequence with [`ScriptedProvider::emit`], inject failures for the next
//! request operation, and count verification requests to assert that a
//! short-circuit issued none.
//!
//! Unlike [`RestProvider`](super::RestProvider), subscribing does not queue an
//! initial event - the scripted sequence is the whole truth, which lets tests
//! hold a store in its initial unresolved state for as long as they need.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::auth::{Credential, Session};

use super::{AuthEvent, IdentityProvider, ProviderError, Subscription};

#[derive(Default)]
struct ScriptedState {
    subscribers: Vec<mpsc::UnboundedSender<AuthEvent>>,
    failures: VecDeque<ProviderError>,
}

#[derive(Default)]
pub struct ScriptedProvider {
    state: Mutex<ScriptedState>,
    verification_requests: AtomicUsize,
    refuse_subscriptions: AtomicBool,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, ScriptedState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Push one provider event to every live subscription.
    pub fn emit(&self, event: AuthEvent) {
        self.state()
            .subscribers
            .retain(|tx| tx.send(event.clone()).is_ok());
    }

    /// Queue a failure; the next request operation returns it instead of
    /// succeeding.
    pub fn fail_next(&self, error: ProviderError) {
        self.state().failures.push_back(error);
    }

    /// Make every subsequent `subscribe` call fail, to exercise the
    /// fatal-at-startup path.
    pub fn refuse_subscriptions(&self) {
        self.refuse_subscriptions.store(true, Ordering::Release);
    }

    /// Number of verification emails actually requested.
    pub fn verification_request_count(&self) -> usize {
        self.verification_requests.load(Ordering::Acquire)
    }

    /// Deterministic session for an email, matching what the request
    /// operations fabricate.
    pub fn session_for(email: &str, email_verified: bool) -> Session {
        Session::new(
            format!("scripted-{email}"),
            email,
            email_verified,
            Credential::new(format!("token-{email}")),
        )
    }

    fn take_failure(&self) -> Result<(), ProviderError> {
        match self.state().failures.pop_front() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl IdentityProvider for ScriptedProvider {
    fn subscribe(&self) -> Result<Subscription, ProviderError> {
        if self.refuse_subscriptions.load(Ordering::Acquire) {
            return Err(ProviderError::Subscription(
                "refused by script".to_string(),
            ));
        }
        let (tx, subscription) = Subscription::channel();
        self.state().subscribers.push(tx);
        Ok(subscription)
    }

    async fn request_register(
        &self,
        email: &str,
        _password: &str,
    ) -> Result<Session, ProviderError> {
        self.take_failure()?;
        let session = Self::session_for(email, false);
        self.emit(Some(session.clone()));
        Ok(session)
    }

    async fn request_login(&self, email: &str, _password: &str) -> Result<Session, ProviderError> {
        self.take_failure()?;
        let session = Self::session_for(email, false);
        self.emit(Some(session.clone()));
        Ok(session)
    }

    async fn request_logout(&self) -> Result<(), ProviderError> {
        self.take_failure()?;
        self.emit(None);
        Ok(())
    }

    async fn request_send_verification(
        &self,
        _session: &Session,
        _return_url: &str,
    ) -> Result<(), ProviderError> {
        self.take_failure()?;
        self.verification_requests.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }
}
