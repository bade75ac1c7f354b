//! Session manager: observable session state plus the sign-in, sign-out,
//! and restore-on-start operations.
//!
//! State is published through a `tokio::sync::watch` channel so any
//! front end can take a snapshot or subscribe to changes. The bearer
//! token is held here and injected per request via
//! [`SessionManager::authorization_header`]; there is no process-wide
//! default header, so signing out revokes the credential everywhere.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;

use tokio::sync::watch;

use super::AuthorizeOutcome;
use super::SessionError;
use super::SessionSnapshot;
use super::SignInOutcome;
use super::UserProfile;
use super::broker::AuthorizationBroker;
use super::broker::BrowserBroker;
use super::exchange::HttpTokenExchange;
use super::exchange::TokenExchange;
use super::store::FileSessionStore;
use super::store::SessionStore;
use super::store::TOKEN_KEY;
use super::store::USER_KEY;
use crate::config::AuthConfig;
use crate::default_client;

/// Orchestrates the authorization broker, the token exchange, and the
/// local store, and mirrors their results into observable session state.
pub struct SessionManager {
    broker: Arc<dyn AuthorizationBroker>,
    exchange: Arc<dyn TokenExchange>,
    store: Arc<dyn SessionStore>,
    state: watch::Sender<SessionSnapshot>,
    token: Mutex<Option<String>>,
    /// Held for the duration of a sign-in attempt; a second concurrent
    /// attempt observes it and backs off instead of racing on state.
    sign_in_gate: tokio::sync::Mutex<()>,
}

impl SessionManager {
    /// Builds a manager wired to the production collaborators.
    pub fn from_config(config: AuthConfig) -> Self {
        let client = default_client::create_client();
        let store = FileSessionStore::new(&config.heat_home);
        let exchange = HttpTokenExchange::new(client, config.backend_url.clone());
        let broker = BrowserBroker::new(config);
        Self::new(Arc::new(broker), Arc::new(exchange), Arc::new(store))
    }

    /// Builds a manager from explicit collaborators.
    ///
    /// The snapshot starts with `establishing = true`; call
    /// [`SessionManager::restore`] once at startup to load any persisted
    /// session and settle it.
    pub fn new(
        broker: Arc<dyn AuthorizationBroker>,
        exchange: Arc<dyn TokenExchange>,
        store: Arc<dyn SessionStore>,
    ) -> Self {
        let (state, _) = watch::channel(SessionSnapshot {
            user: None,
            establishing: true,
        });

        Self {
            broker,
            exchange,
            store,
            state,
            token: Mutex::new(None),
            sign_in_gate: tokio::sync::Mutex::new(()),
        }
    }

    /// Current session state.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.borrow().clone()
    }

    /// Subscribes to session state changes.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.state.subscribe()
    }

    pub fn current_user(&self) -> Option<UserProfile> {
        self.state.borrow().user.clone()
    }

    pub fn is_establishing(&self) -> bool {
        self.state.borrow().establishing
    }

    /// Current bearer token, for per-request credential injection.
    pub fn bearer_token(&self) -> Option<String> {
        self.token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Value for an outgoing `Authorization` header, if signed in.
    pub fn authorization_header(&self) -> Option<String> {
        self.bearer_token().map(|token| format!("Bearer {token}"))
    }

    /// Runs a full sign-in attempt.
    ///
    /// Cancellation and denial leave the session untouched and are
    /// reported as outcomes; failures are logged and surfaced as typed
    /// errors with the session likewise untouched. `establishing` is
    /// reset on every exit path.
    pub async fn begin_session(&self) -> Result<SignInOutcome, SessionError> {
        let Ok(_gate) = self.sign_in_gate.try_lock() else {
            tracing::debug!("sign-in already in progress; ignoring");
            return Ok(SignInOutcome::AlreadyInProgress);
        };

        self.set_establishing(true);
        let result = self.sign_in().await;
        self.set_establishing(false);

        if let Err(e) = &result {
            tracing::warn!("sign-in attempt failed: {e}");
        }
        result
    }

    async fn sign_in(&self) -> Result<SignInOutcome, SessionError> {
        let code = match self.broker.authorize().await? {
            AuthorizeOutcome::Granted { code } => code,
            AuthorizeOutcome::Cancelled => {
                tracing::debug!("authorization cancelled by user");
                return Ok(SignInOutcome::Cancelled);
            }
            AuthorizeOutcome::Denied => {
                tracing::debug!("authorization denied by user");
                return Ok(SignInOutcome::Denied);
            }
        };

        let grant = self.exchange.exchange_code(&code).await?;

        // Persist first; in-memory state only changes once the attempt
        // can no longer fail, so errors leave the session as it was.
        self.store.set(USER_KEY, &serde_json::to_string(&grant.user)?)?;
        self.store.set(TOKEN_KEY, &grant.token)?;
        self.set_token(Some(grant.token.clone()));
        self.set_user(Some(grant.user.clone()));

        tracing::debug!(login = %grant.user.login, "session established");
        Ok(SignInOutcome::Established(grant.user))
    }

    /// Signs out: clears the in-memory session immediately, then removes
    /// the persisted entries. The in-memory clear happens even if the
    /// store removal fails.
    pub async fn end_session(&self) -> Result<(), SessionError> {
        self.set_user(None);
        self.set_token(None);

        self.store.remove(USER_KEY)?;
        self.store.remove(TOKEN_KEY)?;

        tracing::debug!("session cleared");
        Ok(())
    }

    /// Restores a persisted session, if any. Runs once at startup.
    ///
    /// Requires both entries to be present; a partial write from an
    /// earlier crash restores nothing. `establishing` ends false whether
    /// or not a session was found, and no network call is made.
    pub async fn restore(&self) -> Result<bool, SessionError> {
        let restored = self.load_persisted();
        self.set_establishing(false);

        match &restored {
            Ok(true) => tracing::debug!("session restored from storage"),
            Ok(false) => tracing::debug!("no persisted session"),
            Err(e) => tracing::warn!("session restore failed: {e}"),
        }
        restored
    }

    fn load_persisted(&self) -> Result<bool, SessionError> {
        let user = self.store.get(USER_KEY)?;
        let token = self.store.get(TOKEN_KEY)?;

        let (Some(user), Some(token)) = (user, token) else {
            return Ok(false);
        };

        let profile: UserProfile = serde_json::from_str(&user)?;
        self.set_token(Some(token));
        self.set_user(Some(profile));
        Ok(true)
    }

    fn set_establishing(&self, establishing: bool) {
        self.state.send_modify(|s| s.establishing = establishing);
    }

    fn set_user(&self, user: Option<UserProfile>) {
        self.state.send_modify(|s| s.user = user);
    }

    fn set_token(&self, token: Option<String>) {
        *self.token.lock().unwrap_or_else(PoisonError::into_inner) = token;
    }
}
