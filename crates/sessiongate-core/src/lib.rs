//! Core library for sessiongate - session-state synchronization and route
//! guarding for applications backed by an external identity provider.
//!
//! The provider is the single source of truth for "who is signed in"; this
//! crate mirrors its pushed state and gates the application on it:
//!
//! - [`provider`]: the provider boundary plus REST and scripted clients
//! - [`SessionStore`]: reactive snapshot of the pushed auth state
//! - [`IdentityFacade`]: register/login/logout/verify with a closed error
//!   taxonomy
//! - [`BootstrapGate`]: hold startup for the first authoritative state
//! - [`RouteGuard`]: synchronous, fail-closed navigation decisions

pub mod auth;
pub mod config;
pub mod facade;
pub mod gate;
pub mod guard;
pub mod provider;

pub use auth::{Credential, CredentialStore, Session, SessionState, SessionStore};
pub use config::Config;
pub use facade::{IdentityFacade, OperationError, VerificationOutcome};
pub use gate::{BootstrapGate, StartupAborted};
pub use guard::{Decision, Route, RouteGuard};
pub use provider::{
    AuthEvent, IdentityProvider, ProviderError, RestProvider, ScriptedProvider, Subscription,
};
