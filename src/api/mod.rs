//! API Transport
//!
//! Every call to the task service goes through [`ApiClient`]. Outbound, the
//! stored bearer token is attached. Inbound, a 401 from any endpoint clears
//! the credential store and publishes [`SessionEvent::Invalidated`]; the
//! session and the navigation shell react to that event, not the transport.

mod http;
pub mod auth;
pub mod reminder;
pub mod task;

#[cfg(test)]
pub mod mock;

use std::cell::RefCell;
use std::rc::Rc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::credentials::CredentialStore;
use crate::error::TransportError;
use crate::models::AccessToken;

pub use http::ReqwestExchange;
pub use reqwest::Method;

// ========================
// Wire Types
// ========================

/// Outbound request, before and after credential augmentation
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    /// Path relative to the service base URL, e.g. `/task/5`
    pub path: String,
    pub authorization: Option<String>,
    pub body: Option<serde_json::Value>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            authorization: None,
            body: None,
        }
    }

    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, TransportError> {
        let value = serde_json::to_value(body).map_err(|e| TransportError::Encode(e.to_string()))?;
        self.body = Some(value);
        Ok(self)
    }
}

/// Raw response: status plus body text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, TransportError> {
        serde_json::from_str(&self.body).map_err(|e| TransportError::Decode(e.to_string()))
    }
}

/// The actual HTTP round trip. Implementations report network failures and
/// timeouts; status handling is left to [`ApiClient`].
#[async_trait(?Send)]
pub trait HttpExchange {
    async fn exchange(&self, request: ApiRequest) -> Result<ApiResponse, TransportError>;
}

// ========================
// Session Events
// ========================

/// Session-ending notifications published on the client's bus
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A request to `path` came back 401; the stored token is already gone
    Invalidated { path: String },
    /// The user logged out
    LoggedOut,
}

type Listener = Rc<dyn Fn(&SessionEvent)>;

/// Fan-out of [`SessionEvent`]s to subscribers, in subscription order
#[derive(Clone, Default)]
pub struct SessionEvents {
    listeners: Rc<RefCell<Vec<Listener>>>,
}

impl SessionEvents {
    pub fn subscribe(&self, listener: impl Fn(&SessionEvent) + 'static) {
        self.listeners.borrow_mut().push(Rc::new(listener));
    }

    pub fn emit(&self, event: SessionEvent) {
        // Listeners may subscribe or emit in turn; call outside the borrow.
        let listeners: Vec<Listener> = self.listeners.borrow().clone();
        for listener in listeners {
            listener(&event);
        }
    }
}

// ========================
// Client
// ========================

/// Shared handle to the transport
#[derive(Clone)]
pub struct ApiClient {
    exchange: Rc<dyn HttpExchange>,
    credentials: Rc<dyn CredentialStore>,
    events: SessionEvents,
}

impl ApiClient {
    pub fn new(exchange: Rc<dyn HttpExchange>, credentials: Rc<dyn CredentialStore>) -> Self {
        Self {
            exchange,
            credentials,
            events: SessionEvents::default(),
        }
    }

    pub fn credentials(&self) -> &dyn CredentialStore {
        self.credentials.as_ref()
    }

    pub fn events(&self) -> &SessionEvents {
        &self.events
    }

    /// Send one request through both interceptors.
    pub async fn send(&self, mut request: ApiRequest) -> Result<ApiResponse, TransportError> {
        if let Some(token) = self.credentials.load() {
            request.authorization = Some(AccessToken::new(token).bearer());
        }

        let method = request.method.clone();
        let path = request.path.clone();
        tracing::debug!(%method, %path, "sending request");

        let response = self.exchange.exchange(request).await.map_err(|e| {
            tracing::warn!(%method, %path, error = %e, "request failed");
            e
        })?;

        match response.status {
            200..=299 => Ok(response),
            401 => {
                self.force_logout(&path);
                Err(TransportError::Unauthorized { body: response.body })
            }
            status => {
                tracing::debug!(%method, %path, status, "request rejected");
                Err(TransportError::Status { status, body: response.body })
            }
        }
    }

    fn force_logout(&self, path: &str) {
        tracing::warn!(%path, "authorization lost, forcing logout");
        self.credentials.clear();
        self.events.emit(SessionEvent::Invalidated { path: path.to_string() });
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, TransportError> {
        self.send(ApiRequest::new(Method::GET, path)).await?.json()
    }

    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, TransportError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = ApiRequest::new(Method::POST, path).json(body)?;
        self.send(request).await?.json()
    }

    pub async fn put<B, T>(&self, path: &str, body: &B) -> Result<T, TransportError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = ApiRequest::new(Method::PUT, path).json(body)?;
        self.send(request).await?.json()
    }

    /// DELETE; the response body is not interpreted
    pub async fn delete(&self, path: &str) -> Result<(), TransportError> {
        self.send(ApiRequest::new(Method::DELETE, path)).await.map(|_| ())
    }
}

/// Liveness probe
pub async fn health_check(client: &ApiClient) -> Result<serde_json::Value, TransportError> {
    client.get("/health").await
}
