//! REST identity provider client.
//!
//! Speaks the provider's identity-toolkit HTTP API: `accounts:signUp`,
//! `accounts:signInWithPassword`, `accounts:lookup` and
//! `accounts:sendOobCode`, all keyed by an API key. Successful credential
//! operations also push the resulting state change through every active
//! subscription, mirroring how the provider's own SDKs behave.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::auth::{Credential, Session};

use super::{AuthEvent, IdentityProvider, ProviderError, Subscription};

/// HTTP request timeout in seconds.
/// 30s allows for slow provider responses while failing fast enough for good UX.
const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Deserialize)]
struct SignUpResponse {
    #[serde(rename = "localId")]
    local_id: String,
    email: String,
    #[serde(rename = "idToken")]
    id_token: String,
}

#[derive(Debug, Deserialize)]
struct SignInResponse {
    #[serde(rename = "localId")]
    local_id: String,
    email: String,
    #[serde(rename = "idToken")]
    id_token: String,
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<LookupUser>,
}

#[derive(Debug, Deserialize)]
struct LookupUser {
    #[serde(rename = "emailVerified", default)]
    email_verified: bool,
}

struct ProviderState {
    subscribers: Vec<mpsc::UnboundedSender<AuthEvent>>,
    current: Option<Session>,
}

/// REST-backed [`IdentityProvider`].
/// Shared behind an `Arc`; subscriber fan-out lives inside.
pub struct RestProvider {
    client: Client,
    base_url: String,
    api_key: String,
    state: Mutex<ProviderState>,
}

impl RestProvider {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
            state: Mutex::new(ProviderState {
                subscribers: Vec::new(),
                current: None,
            }),
        })
    }

    fn state(&self) -> MutexGuard<'_, ProviderState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record the new identity and push it through every live subscription.
    fn emit(&self, event: AuthEvent) {
        let mut state = self.state();
        state.current = event.clone();
        state
            .subscribers
            .retain(|tx| tx.send(event.clone()).is_ok());
        debug!(
            subscribers = state.subscribers.len(),
            authenticated = event.is_some(),
            "pushed auth state change"
        );
    }

    fn endpoint(&self, operation: &str) -> String {
        format!("{}/v1/accounts:{}", self.base_url, operation)
    }

    async fn post<T: for<'de> Deserialize<'de>>(
        &self,
        operation: &str,
        body: &serde_json::Value,
    ) -> Result<T, ProviderError> {
        let response = self
            .client
            .post(self.endpoint(operation))
            .query(&[("key", self.api_key.as_str())])
            .json(body)
            .send()
            .await?;

        let response = Self::check_response(response).await?;
        response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))
    }

    /// Check if a response is successful, mapping the error body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let err = ProviderError::from_response(status, &body);
            warn!(status = %status, error = %err, "provider request rejected");
            Err(err)
        }
    }

    /// Fetch the verified flag for a freshly issued token.
    async fn lookup_email_verified(&self, id_token: &str) -> Result<bool, ProviderError> {
        let body = serde_json::json!({ "idToken": id_token });
        let lookup: LookupResponse = self.post("lookup", &body).await?;
        match lookup.users.first() {
            Some(user) => Ok(user.email_verified),
            None => Err(ProviderError::InvalidResponse(
                "account lookup returned no users".to_string(),
            )),
        }
    }
}

#[async_trait]
impl IdentityProvider for RestProvider {
    fn subscribe(&self) -> Result<Subscription, ProviderError> {
        let (tx, subscription) = Subscription::channel();
        let mut state = self.state();
        // Queue the currently known identity so a fresh subscriber converges
        // without waiting for a credential operation.
        let _ = tx.send(state.current.clone());
        state.subscribers.push(tx);
        Ok(subscription)
    }

    async fn request_register(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, ProviderError> {
        let body = serde_json::json!({
            "email": email,
            "password": password,
            "returnSecureToken": true,
        });
        let created: SignUpResponse = self.post("signUp", &body).await?;

        // New accounts always start unverified
        let session = Session::new(
            created.local_id,
            created.email,
            false,
            Credential::new(created.id_token),
        );
        self.emit(Some(session.clone()));
        Ok(session)
    }

    async fn request_login(&self, email: &str, password: &str) -> Result<Session, ProviderError> {
        let body = serde_json::json!({
            "email": email,
            "password": password,
            "returnSecureToken": true,
        });
        let signed_in: SignInResponse = self.post("signInWithPassword", &body).await?;
        let email_verified = self.lookup_email_verified(&signed_in.id_token).await?;

        let session = Session::new(
            signed_in.local_id,
            signed_in.email,
            email_verified,
            Credential::new(signed_in.id_token),
        );
        self.emit(Some(session.clone()));
        Ok(session)
    }

    /// Sign-out is client-side: the cached credential is discarded and the
    /// state change pushed; issued tokens expire server-side.
    async fn request_logout(&self) -> Result<(), ProviderError> {
        self.emit(None);
        Ok(())
    }

    async fn request_send_verification(
        &self,
        session: &Session,
        return_url: &str,
    ) -> Result<(), ProviderError> {
        let body = serde_json::json!({
            "requestType": "VERIFY_EMAIL",
            "idToken": session.credential.expose(),
            "continueUrl": return_url,
        });
        let response = self
            .client
            .post(self.endpoint("sendOobCode"))
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await?;

        Self::check_response(response).await?;
        debug!(email = %session.email, "verification email requested");
        Ok(())
    }
}
