//! Session management for the Heat client.
//!
//! Orchestrates the browser-based authorization flow, the backend token
//! exchange, and local persistence of the resulting session. The session
//! is exposed as observable state (snapshot plus subscription) decoupled
//! from any rendering framework.
//!
//! # Architecture
//!
//! - [`SessionManager`]: owns the session state and the two operations
//!   (begin session, end session) plus restore-on-start
//! - [`AuthorizationBroker`]: opens the provider login page and reports
//!   the outcome (code, cancellation, or denial)
//! - [`TokenExchange`]: trades the authorization code for a profile and
//!   bearer token via the backend
//! - [`SessionStore`]: two-key local persistence for profile and token

pub mod broker;
pub mod callback_server;
mod error;
pub mod exchange;
pub mod manager;
pub mod store;

pub use broker::AuthorizationBroker;
pub use broker::BrowserBroker;
pub use callback_server::CallbackServer;
pub use error::SessionError;
pub use exchange::HttpTokenExchange;
pub use exchange::SessionGrant;
pub use exchange::TokenExchange;
pub use manager::SessionManager;
pub use store::FileSessionStore;
pub use store::MemorySessionStore;
pub use store::SessionStore;
pub use store::TOKEN_KEY;
pub use store::USER_KEY;

use serde::Deserialize;
use serde::Serialize;

/// User profile as returned by the token exchange backend.
///
/// Opaque to this crate: replaced wholesale on sign-in, cleared on
/// sign-out, never partially updated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Provider-side identifier.
    pub id: String,
    /// Avatar image URL.
    pub avatar_url: String,
    /// Display name.
    pub name: String,
    /// Provider handle.
    pub login: String,
}

/// Result of the browser authorization step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizeOutcome {
    /// The user approved access; `code` is exchanged with the backend.
    Granted {
        /// Authorization code from the provider callback.
        code: String,
    },
    /// The user abandoned the flow (window closed, deadline passed).
    Cancelled,
    /// The provider reported an explicit denial.
    Denied,
}

/// Typed result of a sign-in attempt.
///
/// Cancellation and denial leave the session untouched; the variant makes
/// the reason inspectable without changing that contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignInOutcome {
    /// The session was established for this user.
    Established(UserProfile),
    /// The user abandoned the authorization flow.
    Cancelled,
    /// The user denied the authorization request.
    Denied,
    /// Another sign-in attempt is already running on this manager.
    AlreadyInProgress,
}

/// Observable session state.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionSnapshot {
    /// Current user, if a session is active.
    pub user: Option<UserProfile>,
    /// True during restore-on-start and while a sign-in is in flight.
    pub establishing: bool,
}
