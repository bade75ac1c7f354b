//! Shared HTTP client construction.
//!
//! Credentials are injected per request by the session manager; the
//! client itself carries no default authorization header.

use reqwest::Client;

/// Product User-Agent attached to all outgoing requests.
const USER_AGENT: &str = concat!("heat/", env!("CARGO_PKG_VERSION"));

/// Creates the shared HTTP client used for backend calls.
pub fn create_client() -> Client {
    Client::builder()
        .user_agent(USER_AGENT)
        .build()
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_agent_carries_crate_version() {
        assert!(USER_AGENT.starts_with("heat/"));
        assert!(USER_AGENT.len() > "heat/".len());
    }

    #[test]
    fn client_builds() {
        let _client = create_client();
    }
}
