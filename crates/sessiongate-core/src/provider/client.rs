//! The identity provider boundary.
//!
//! Everything the rest of the crate knows about the provider goes through
//! [`IdentityProvider`]: a state-change subscription plus four request
//! operations. Implementations push an [`AuthEvent`] through every active
//! [`Subscription`] whenever the authoritative session changes, including
//! after their own successful credential operations.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::auth::Session;

use super::ProviderError;

/// One provider-pushed state change: the new identity, or `None` when the
/// provider reports no active identity.
pub type AuthEvent = Option<Session>;

/// Receiving half of a provider state-change subscription.
///
/// Events arrive strictly in the order the provider emitted them. Dropping
/// the subscription cancels it; the provider prunes the dead channel on its
/// next emission.
pub struct Subscription {
    events: mpsc::UnboundedReceiver<AuthEvent>,
}

impl Subscription {
    /// Create a subscription and the sender a provider emits into.
    pub fn channel() -> (mpsc::UnboundedSender<AuthEvent>, Subscription) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, Subscription { events: rx })
    }

    /// Next state change, or `None` once the provider side has gone away.
    pub async fn recv(&mut self) -> Option<AuthEvent> {
        self.events.recv().await
    }
}

/// Boundary contract for the external identity provider.
///
/// Request operations resolve as acknowledgments only: the authoritative
/// session transition arrives separately through the subscription, with no
/// ordering guarantee relative to the resolved request.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Register a state-change subscription.
    ///
    /// Failure to establish the subscription is a fatal configuration error:
    /// no session state can ever be known without it.
    fn subscribe(&self) -> Result<Subscription, ProviderError>;

    /// Request account creation with the given credentials.
    async fn request_register(&self, email: &str, password: &str)
        -> Result<Session, ProviderError>;

    /// Request credential verification for an existing account.
    async fn request_login(&self, email: &str, password: &str) -> Result<Session, ProviderError>;

    /// Request termination of the active session.
    async fn request_logout(&self) -> Result<(), ProviderError>;

    /// Request a verification email for `session`, returning the user to
    /// `return_url` after they confirm.
    async fn request_send_verification(
        &self,
        session: &Session,
        return_url: &str,
    ) -> Result<(), ProviderError>;
}
