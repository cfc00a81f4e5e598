//! Application Context
//!
//! Services are single-threaded (`Rc` inside), so they are parked in a local
//! `StoredValue` and only the session signals travel as plain context values.

use std::rc::Rc;

use leptos::prelude::*;

use crate::api::{ApiClient, HttpExchange, ReqwestExchange};
use crate::config::AppConfig;
use crate::credentials::{CredentialStore, LocalStorageCredentials, MemoryCredentials};
use crate::session::{Session, SessionState};
use crate::store::{ReminderStore, TaskStore};

/// Everything the views talk to, wired to one transport
#[derive(Clone)]
pub struct Services {
    pub config: AppConfig,
    pub client: ApiClient,
    pub session: Session,
    pub tasks: TaskStore,
    pub reminders: ReminderStore,
}

impl Services {
    pub fn new(config: AppConfig, exchange: Rc<dyn HttpExchange>, credentials: Rc<dyn CredentialStore>) -> Self {
        let client = ApiClient::new(exchange, credentials);
        Self {
            session: Session::new(client.clone()),
            tasks: TaskStore::new(client.clone()),
            reminders: ReminderStore::new(client.clone()),
            client,
            config,
        }
    }

    /// Browser wiring: reqwest over fetch, token in localStorage when available
    pub fn browser(config: AppConfig) -> Self {
        let credentials: Rc<dyn CredentialStore> = match LocalStorageCredentials::open(config.token_storage_key.clone()) {
            Some(store) => Rc::new(store),
            None => {
                tracing::warn!("localStorage unavailable; session will not survive a reload");
                Rc::new(MemoryCredentials::new())
            }
        };
        let exchange = Rc::new(ReqwestExchange::from_config(&config));
        Self::new(config, exchange, credentials)
    }

    /// Stores are discarded through the session's `LoggedOut` event.
    pub fn logout(&self) {
        self.session.logout();
    }
}

/// App-wide handles provided via context
#[derive(Clone)]
pub struct AppContext {
    services: StoredValue<Services, LocalStorage>,
    /// Session state - read
    pub session_state: ArcReadSignal<SessionState>,
    /// Flips once the stored token has been read - read
    pub session_resolved: ArcReadSignal<bool>,
}

impl AppContext {
    pub fn new(services: Services) -> Self {
        Self {
            session_state: services.session.state(),
            session_resolved: services.session.resolved(),
            services: StoredValue::new_local(services),
        }
    }

    /// Clone of the service handles; all clones share state
    pub fn services(&self) -> Services {
        self.services.get_value()
    }

    pub fn with_services<T>(&self, f: impl FnOnce(&Services) -> T) -> T {
        self.services.with_value(f)
    }
}

pub fn use_app_context() -> AppContext {
    use_context::<AppContext>().expect("AppContext should be provided")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock::{CountingCredentials, MockExchange};
    use crate::api::Method;
    use crate::session::SessionStatus;
    use serde_json::json;

    #[tokio::test]
    async fn test_logout_discards_every_store() {
        let mock = MockExchange::new();
        let creds = CountingCredentials::with_token("tok");
        let services = Services::new(AppConfig::default(), mock.clone(), creds.clone());
        services.session.initialize();
        mock.respond(Method::GET, "/task/", 200, json!([{"id": 1, "name": "Walk dog"}]));
        mock.respond(Method::GET, "/reminder/", 200, json!([]));
        services.tasks.fetch_all().await.unwrap();
        services.reminders.fetch_all().await.unwrap();
        assert_eq!(services.tasks.len(), 1);

        services.logout();

        assert!(services.tasks.is_empty());
        assert_eq!(services.session.status(), SessionStatus::Anonymous);
        assert_eq!(creds.load(), None);
    }
}
