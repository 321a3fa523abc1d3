//! Identity provider boundary and implementations.
//!
//! This module provides:
//! - `IdentityProvider`: the boundary contract (subscription + requests)
//! - `RestProvider`: client for the provider's identity-toolkit HTTP API
//! - `ScriptedProvider`: in-memory provider for tests and offline demos
//!
//! State changes are pushed, not polled: every implementation delivers
//! ordered `AuthEvent`s through `Subscription` channels.

pub mod client;
pub mod error;
pub mod rest;
pub mod scripted;

pub use client::{AuthEvent, IdentityProvider, Subscription};
pub use error::ProviderError;
pub use rest::RestProvider;
pub use scripted::ScriptedProvider;
