//! Route guard: synchronous allow/deny decisions from the session snapshot.
//!
//! The guard never suspends and has no error path: every route it sees has
//! already been resolved by the router, and every input combination maps to
//! a decision. An unresolved store counts as "not authenticated" so a
//! protected view can never flash open before the provider responds.

use tokio::sync::watch;
use tracing::debug;

use crate::auth::{SessionState, SessionStore};

/// Where unauthenticated navigations to protected routes are sent.
const DEFAULT_LOGIN_PATH: &str = "/login";

/// A resolved navigation target. `requires_auth` is static route metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub path: String,
    pub requires_auth: bool,
}

impl Route {
    pub fn public(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            requires_auth: false,
        }
    }

    pub fn protected(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            requires_auth: true,
        }
    }
}

/// Guard verdict for one navigation attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    RedirectTo(String),
}

pub struct RouteGuard {
    state: watch::Receiver<SessionState>,
    login_path: String,
}

impl RouteGuard {
    pub fn new(store: &SessionStore) -> Self {
        Self::with_login_path(store, DEFAULT_LOGIN_PATH)
    }

    pub fn with_login_path(store: &SessionStore, login_path: impl Into<String>) -> Self {
        Self {
            state: store.watch(),
            login_path: login_path.into(),
        }
    }

    /// Decide a navigation attempt from the current snapshot.
    ///
    /// | requires_auth | state           | decision          |
    /// |---------------|-----------------|-------------------|
    /// | false         | any             | allow             |
    /// | true          | `Authenticated` | allow             |
    /// | true          | `Anonymous`     | redirect to login |
    /// | true          | `Unknown`       | redirect to login |
    pub fn decide(&self, route: &Route) -> Decision {
        if !route.requires_auth {
            return Decision::Allow;
        }
        if self.state.borrow().is_authenticated() {
            Decision::Allow
        } else {
            debug!(path = %route.path, "redirecting unauthenticated navigation");
            Decision::RedirectTo(self.login_path.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facade::IdentityFacade;
    use crate::provider::ScriptedProvider;
    use std::sync::Arc;

    fn redirect(to: &str) -> Decision {
        Decision::RedirectTo(to.to_string())
    }

    #[tokio::test]
    async fn test_public_routes_always_allowed() {
        let provider = ScriptedProvider::new();
        let store = SessionStore::connect(&provider).unwrap();
        let guard = RouteGuard::new(&store);

        let route = Route::public("/characters");
        // Unknown, anonymous and authenticated all pass
        assert_eq!(guard.decide(&route), Decision::Allow);

        provider.emit(None);
        let mut rx = store.watch();
        rx.wait_for(|s| *s == SessionState::Anonymous).await.unwrap();
        assert_eq!(guard.decide(&route), Decision::Allow);
    }

    #[tokio::test]
    async fn test_protected_route_fails_closed_before_resolution() {
        let provider = ScriptedProvider::new();
        let store = SessionStore::connect(&provider).unwrap();
        let guard = RouteGuard::new(&store);

        // No provider event yet: deny rather than flash the view open
        assert_eq!(store.current(), SessionState::Unknown);
        assert_eq!(guard.decide(&Route::protected("/favorites")), redirect("/login"));
    }

    #[tokio::test]
    async fn test_protected_route_redirects_anonymous() {
        let provider = ScriptedProvider::new();
        let store = SessionStore::connect(&provider).unwrap();
        let guard = RouteGuard::new(&store);

        provider.emit(None);
        let mut rx = store.watch();
        rx.wait_for(|s| *s == SessionState::Anonymous).await.unwrap();

        assert_eq!(guard.decide(&Route::protected("/favorites")), redirect("/login"));
    }

    #[tokio::test]
    async fn test_login_then_navigation_is_allowed() {
        let provider = Arc::new(ScriptedProvider::new());
        let store = SessionStore::connect(provider.as_ref()).unwrap();
        let facade = IdentityFacade::new(provider.clone(), &store, "/profile");
        let guard = RouteGuard::new(&store);

        let session = facade.login("a@x.com", "secret").await.unwrap();

        // Navigation is gated on the store, not on the resolved request
        let expected = SessionState::Authenticated(session);
        let mut rx = store.watch();
        rx.wait_for(|s| *s == expected).await.unwrap();

        assert_eq!(guard.decide(&Route::protected("/favorites")), Decision::Allow);
    }

    #[tokio::test]
    async fn test_custom_login_path() {
        let provider = ScriptedProvider::new();
        let store = SessionStore::connect(&provider).unwrap();
        let guard = RouteGuard::with_login_path(&store, "/sign-in");

        assert_eq!(guard.decide(&Route::protected("/favorites")), redirect("/sign-in"));
    }
}
