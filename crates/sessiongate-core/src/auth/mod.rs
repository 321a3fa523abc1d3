//! Session state and credential handling.
//!
//! This module provides:
//! - `Session` / `SessionState`: the signed-in identity and its three-state
//!   lifecycle (`Unknown` -> `Anonymous` | `Authenticated`)
//! - `SessionStore`: reactive mirror of provider-pushed auth events
//! - `CredentialStore`: optional remember-me storage via the OS keychain

pub mod credentials;
pub mod session;
pub mod store;

pub use credentials::CredentialStore;
pub use session::{Credential, Session, SessionState};
pub use store::SessionStore;
