//! End-to-end flows over the wired services

use serde_json::json;

use crate::api::mock::{CountingCredentials, MockExchange};
use crate::api::Method;
use crate::config::AppConfig;
use crate::context::Services;
use crate::credentials::CredentialStore;
use crate::error::ApiError;
use crate::models::{Registration, Task, TaskDraft};
use crate::routes::{decide, Decision, Route};
use crate::session::SessionStatus;

fn services() -> (std::rc::Rc<MockExchange>, std::rc::Rc<CountingCredentials>, Services) {
    let mock = MockExchange::new();
    let creds = CountingCredentials::new();
    let services = Services::new(AppConfig::default(), mock.clone(), creds.clone());
    (mock, creds, services)
}

#[tokio::test]
async fn test_register_verify_login_create() {
    let (mock, creds, services) = services();
    let session = &services.session;
    session.initialize();
    assert_eq!(decide(session.resolved_status(), Route::Tasks), Decision::Redirect(Route::Login));

    mock.respond(Method::POST, "/auth/register", 200, json!({"message": "verification code sent"}));
    mock.respond(Method::POST, "/auth/verify-email", 200, json!({"message": "verified"}));
    mock.respond(Method::POST, "/auth/login", 200, json!({"ACCESS_TOKEN": "jwt-1", "token_type": "bearer"}));
    mock.respond(Method::GET, "/task/", 200, json!([]));
    mock.respond(Method::POST, "/task/", 201, json!({"id": 1, "name": "Buy milk", "description": null}));

    let registered = session
        .register(&Registration {
            username: "alice".into(),
            email: "alice@example.com".into(),
            name: "Alice Liddell".into(),
            password: "secret".into(),
            confirm_password: "secret".into(),
        })
        .await
        .unwrap();
    assert_eq!(session.status(), SessionStatus::Anonymous);

    session.verify_email(&registered.email, "123456").await.unwrap();
    session.login("alice", "secret").await.unwrap();
    assert_eq!(decide(session.resolved_status(), Route::Tasks), Decision::Allow);
    assert_eq!(creds.load().as_deref(), Some("jwt-1"));

    services.tasks.fetch_all().await.unwrap();
    assert!(services.tasks.is_empty());

    services.tasks.create(&TaskDraft::new("Buy milk", None)).await.unwrap();
    assert_eq!(
        services.tasks.snapshot(),
        vec![Task { id: 1, name: "Buy milk".into(), description: None }]
    );

    let sent = mock.last_request(Method::POST, "/task/").unwrap();
    assert_eq!(sent.authorization.as_deref(), Some("Bearer jwt-1"));
    assert_eq!(mock.last_request(Method::POST, "/auth/register").unwrap().authorization, None);
}

#[tokio::test]
async fn test_expired_token_ends_everything() {
    let (mock, creds, services) = services();
    creds.save("stale");
    services.session.initialize();
    assert!(services.session.is_authenticated());

    mock.respond(Method::GET, "/reminder/", 200, json!([]));
    services.reminders.fetch_all().await.unwrap();
    mock.respond(Method::GET, "/task/", 401, json!({"detail": "Could not validate credentials"}));

    let err = services.tasks.fetch_all().await.unwrap_err();

    assert_eq!(err, ApiError::AuthorizationLost);
    assert_eq!(services.session.status(), SessionStatus::Anonymous);
    assert_eq!(creds.load(), None);
    assert_eq!(creds.clear_count(), 1);
    assert!(services.tasks.is_empty() && services.reminders.is_empty());
    assert_eq!(decide(services.session.resolved_status(), Route::Dashboard), Decision::Redirect(Route::Login));
}

#[tokio::test]
async fn test_logout_then_login_again() {
    let (mock, creds, services) = services();
    services.session.initialize();
    mock.respond(Method::POST, "/auth/login", 200, json!({"access_token": "a"}));
    mock.respond(Method::POST, "/auth/login", 401, json!({"detail": "Incorrect username or password"}));

    services.session.login("bob", "pw").await.unwrap();
    services.logout();
    assert_eq!(creds.load(), None);

    let err = services.session.login("bob", "wrong").await.unwrap_err();
    assert_eq!(err, ApiError::Authentication("Incorrect username or password".into()));
    assert_eq!(services.session.status(), SessionStatus::Anonymous);
}

#[tokio::test]
async fn test_relogin_as_other_user_drops_cached_tasks() {
    let (mock, creds, services) = services();
    creds.save("alice-token");
    services.session.initialize();
    mock.respond(Method::GET, "/task/", 200, json!([{"id": 1, "name": "Alice private"}]));
    services.tasks.fetch_all().await.unwrap();
    assert_eq!(services.tasks.len(), 1);

    mock.respond(Method::POST, "/auth/login", 400, json!({"detail": "Incorrect username or password"}));
    assert!(services.session.login("bob", "wrong").await.is_err());
    assert_eq!(services.session.status(), SessionStatus::Anonymous);
    assert!(services.tasks.is_empty());

    mock.respond(Method::POST, "/auth/login", 200, json!({"ACCESS_TOKEN": "bob-token"}));
    services.session.login("bob", "pw").await.unwrap();
    assert!(services.tasks.is_empty());
    assert_eq!(creds.load().as_deref(), Some("bob-token"));
}
