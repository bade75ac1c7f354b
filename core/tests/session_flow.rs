//! End-to-end session flow against a mock backend and a real file store.

use std::sync::Arc;

use async_trait::async_trait;
use heat_core::default_client;
use heat_core::session::AuthorizationBroker;
use heat_core::session::AuthorizeOutcome;
use heat_core::session::FileSessionStore;
use heat_core::session::HttpTokenExchange;
use heat_core::session::SessionError;
use heat_core::session::SessionManager;
use heat_core::session::SessionStore;
use heat_core::session::SignInOutcome;
use heat_core::session::TOKEN_KEY;
use heat_core::session::USER_KEY;
use pretty_assertions::assert_eq;
use serde_json::json;
use tempfile::TempDir;
use wiremock::Mock;
use wiremock::MockServer;
use wiremock::ResponseTemplate;
use wiremock::matchers::body_json;
use wiremock::matchers::method;
use wiremock::matchers::path;

struct StaticBroker(AuthorizeOutcome);

#[async_trait]
impl AuthorizationBroker for StaticBroker {
    async fn authorize(&self) -> Result<AuthorizeOutcome, SessionError> {
        Ok(self.0.clone())
    }
}

fn manager_for(backend: &MockServer, home: &TempDir, outcome: AuthorizeOutcome) -> SessionManager {
    let exchange = HttpTokenExchange::new(default_client::create_client(), backend.uri());
    let store = FileSessionStore::new(home.path());
    SessionManager::new(Arc::new(StaticBroker(outcome)), Arc::new(exchange), Arc::new(store))
}

#[tokio::test]
async fn sign_in_exchanges_code_and_persists_session() {
    let backend = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/authenticate"))
        .and(body_json(json!({ "code": "auth-code" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token": "abc123",
            "user": {
                "id": "42",
                "avatar_url": "https://x/y.png",
                "name": "Octo",
                "login": "octo"
            }
        })))
        .expect(1)
        .mount(&backend)
        .await;

    let home = TempDir::new().unwrap();
    let manager = manager_for(
        &backend,
        &home,
        AuthorizeOutcome::Granted {
            code: "auth-code".to_string(),
        },
    );

    let outcome = manager.begin_session().await.unwrap();

    assert!(matches!(outcome, SignInOutcome::Established(ref user) if user.login == "octo"));
    assert_eq!(manager.authorization_header(), Some("Bearer abc123".to_string()));
    assert!(!manager.is_establishing());

    let store = FileSessionStore::new(home.path());
    assert_eq!(store.get(TOKEN_KEY).unwrap(), Some("abc123".to_string()));
    assert!(store.get(USER_KEY).unwrap().unwrap().contains("\"login\":\"octo\""));
}

#[tokio::test]
async fn backend_failure_surfaces_typed_error_without_writes() {
    let backend = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/authenticate"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&backend)
        .await;

    let home = TempDir::new().unwrap();
    let manager = manager_for(
        &backend,
        &home,
        AuthorizeOutcome::Granted {
            code: "auth-code".to_string(),
        },
    );

    let result = manager.begin_session().await;

    assert!(matches!(result, Err(SessionError::InvalidResponse(_))));
    assert_eq!(manager.current_user(), None);
    assert!(!manager.is_establishing());

    let store = FileSessionStore::new(home.path());
    assert_eq!(store.get(USER_KEY).unwrap(), None);
    assert_eq!(store.get(TOKEN_KEY).unwrap(), None);
}

#[tokio::test]
async fn restore_uses_storage_without_calling_the_backend() {
    let backend = MockServer::start().await;
    // Any request to the exchange endpoint during restore is a failure.
    Mock::given(method("POST"))
        .and(path("/authenticate"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&backend)
        .await;

    let home = TempDir::new().unwrap();
    let store = FileSessionStore::new(home.path());
    store
        .set(
            USER_KEY,
            r#"{"id":"42","login":"octo","name":"Octo","avatar_url":"https://x/y.png"}"#,
        )
        .unwrap();
    store.set(TOKEN_KEY, "abc123").unwrap();

    let manager = manager_for(&backend, &home, AuthorizeOutcome::Cancelled);
    let restored = manager.restore().await.unwrap();

    assert!(restored);
    assert_eq!(manager.current_user().map(|u| u.login), Some("octo".to_string()));
    assert_eq!(manager.bearer_token(), Some("abc123".to_string()));
    assert!(!manager.is_establishing());
}

#[tokio::test]
async fn sign_out_after_sign_in_clears_everything() {
    let backend = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/authenticate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token": "abc123",
            "user": {
                "id": "42",
                "avatar_url": "https://x/y.png",
                "name": "Octo",
                "login": "octo"
            }
        })))
        .mount(&backend)
        .await;

    let home = TempDir::new().unwrap();
    let manager = manager_for(
        &backend,
        &home,
        AuthorizeOutcome::Granted {
            code: "auth-code".to_string(),
        },
    );

    manager.begin_session().await.unwrap();
    manager.end_session().await.unwrap();

    assert_eq!(manager.current_user(), None);
    assert_eq!(manager.authorization_header(), None);

    let store = FileSessionStore::new(home.path());
    assert_eq!(store.get(USER_KEY).unwrap(), None);
    assert_eq!(store.get(TOKEN_KEY).unwrap(), None);
}
