//! Token exchange against the Heat backend.
//!
//! One network call: the authorization code goes out, a profile and a
//! bearer token come back. No retries, no backoff; a failed exchange ends
//! the sign-in attempt.

use async_trait::async_trait;
use serde::Deserialize;
use serde::Serialize;

use super::SessionError;
use super::UserProfile;

/// Profile and bearer token returned by a successful exchange.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SessionGrant {
    /// Opaque bearer credential for subsequent backend calls.
    pub token: String,
    /// Profile of the authenticated user.
    pub user: UserProfile,
}

/// Trades an authorization code for a session grant.
#[async_trait]
pub trait TokenExchange: Send + Sync {
    async fn exchange_code(&self, code: &str) -> Result<SessionGrant, SessionError>;
}

#[derive(Serialize)]
struct ExchangeRequest<'a> {
    code: &'a str,
}

/// Production exchange client: `POST <backend>/authenticate`.
pub struct HttpTokenExchange {
    client: reqwest::Client,
    backend_url: String,
}

impl HttpTokenExchange {
    pub fn new(client: reqwest::Client, backend_url: impl Into<String>) -> Self {
        Self {
            client,
            backend_url: backend_url.into(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/authenticate", self.backend_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl TokenExchange for HttpTokenExchange {
    async fn exchange_code(&self, code: &str) -> Result<SessionGrant, SessionError> {
        let response = self
            .client
            .post(self.endpoint())
            .json(&ExchangeRequest { code })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SessionError::InvalidResponse(format!(
                "exchange failed with {status}: {body}"
            )));
        }

        response
            .json::<SessionGrant>()
            .await
            .map_err(|e| SessionError::InvalidResponse(format!("malformed exchange response: {e}")))
    }
}
