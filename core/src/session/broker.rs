//! Browser-based authorization broker.
//!
//! Opens the provider login page in the system browser and resolves the
//! attempt from the loopback redirect: an authorization code, an explicit
//! denial, or cancellation (the user walked away and the wait expired).

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;

use super::AuthorizeOutcome;
use super::SessionError;
use super::callback_server::CallbackOutcome;
use super::callback_server::CallbackServer;
use crate::config::AuthConfig;

/// Runs the provider authorization step of a sign-in attempt.
#[async_trait]
pub trait AuthorizationBroker: Send + Sync {
    /// Drives one authorization attempt to a terminal outcome.
    async fn authorize(&self) -> Result<AuthorizeOutcome, SessionError>;
}

/// Production broker backed by the system browser and a loopback listener.
pub struct BrowserBroker {
    config: AuthConfig,
}

impl BrowserBroker {
    pub fn new(config: AuthConfig) -> Self {
        Self { config }
    }

    /// Full authorization URL for one attempt.
    fn authorize_url(&self, redirect_uri: &str, state: &str) -> String {
        format!(
            "{}?client_id={}&scope={}&redirect_uri={}&state={}",
            self.config.authorize_url,
            self.config.client_id,
            urlencoding::encode(&self.config.scope),
            urlencoding::encode(redirect_uri),
            state,
        )
    }
}

#[async_trait]
impl AuthorizationBroker for BrowserBroker {
    async fn authorize(&self) -> Result<AuthorizeOutcome, SessionError> {
        let server = CallbackServer::bind()?;
        let state = generate_state();
        let url = self.authorize_url(&server.redirect_uri(), &state);

        tracing::debug!(port = server.port(), "opening provider authorization page");
        webbrowser::open(&url).map_err(|e| SessionError::BrowserLaunch(e.to_string()))?;

        let timeout = self.config.callback_timeout;
        let result = tokio::task::spawn_blocking(move || server.wait(&state, timeout))
            .await
            .map_err(|e| SessionError::Io(std::io::Error::other(e)))?;

        match result {
            Ok(CallbackOutcome::Granted { code }) => Ok(AuthorizeOutcome::Granted { code }),
            Ok(CallbackOutcome::Denied) => Ok(AuthorizeOutcome::Denied),
            // An expired wait is the only way this flow observes the user
            // abandoning the login page.
            Err(SessionError::CallbackTimeout) => Ok(AuthorizeOutcome::Cancelled),
            Err(e) => Err(e),
        }
    }
}

/// Generates a random `state` parameter for CSRF protection.
///
/// A base64url-encoded 16-byte random value, echoed back by the provider
/// and validated on the callback.
pub fn generate_state() -> String {
    let random_bytes: [u8; 16] = rand::random();
    URL_SAFE_NO_PAD.encode(random_bytes)
}
