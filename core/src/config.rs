//! Configuration for the session authentication flow.

use std::path::PathBuf;
use std::time::Duration;

/// OAuth application client id registered for the Heat client.
pub const CLIENT_ID: &str = "e093b9f4ca9d20d882f4";

/// Permission scope requested during authorization.
pub const SCOPE: &str = "read:user";

/// GitHub authorization endpoint.
pub const AUTHORIZE_URL: &str = "https://github.com/login/oauth/authorize";

/// Default base URL of the token exchange backend.
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:4000";

/// Environment variable overriding the heat home directory.
const HEAT_HOME_ENV: &str = "HEAT_HOME";

/// Environment variable overriding the backend base URL.
const BACKEND_URL_ENV: &str = "HEAT_BACKEND_URL";

/// Settings for the authorization flow and session persistence.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// OAuth client id sent in the authorization URL.
    pub client_id: String,
    /// Requested permission scope.
    pub scope: String,
    /// Provider authorization endpoint.
    pub authorize_url: String,
    /// Base URL of the token exchange backend.
    pub backend_url: String,
    /// Directory holding the persisted session file.
    pub heat_home: PathBuf,
    /// How long to wait for the authorization callback before treating
    /// the attempt as abandoned.
    pub callback_timeout: Duration,
}

impl AuthConfig {
    /// Configuration with product defaults, rooted at `heat_home`.
    pub fn new(heat_home: PathBuf) -> Self {
        Self {
            client_id: CLIENT_ID.to_string(),
            scope: SCOPE.to_string(),
            authorize_url: AUTHORIZE_URL.to_string(),
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            heat_home,
            callback_timeout: Duration::from_secs(300),
        }
    }

    /// Resolves configuration from the environment.
    ///
    /// `$HEAT_HOME` overrides the home directory (default `~/.heat`);
    /// `$HEAT_BACKEND_URL` overrides the token exchange base URL.
    pub fn from_env() -> std::io::Result<Self> {
        let heat_home = match std::env::var_os(HEAT_HOME_ENV) {
            Some(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => dirs::home_dir()
                .map(|home| home.join(".heat"))
                .ok_or_else(|| std::io::Error::other("could not determine home directory"))?,
        };

        let mut config = Self::new(heat_home);
        if let Ok(url) = std::env::var(BACKEND_URL_ENV)
            && !url.is_empty()
        {
            config.backend_url = url;
        }
        Ok(config)
    }
}
