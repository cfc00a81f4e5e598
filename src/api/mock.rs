//! Scripted exchange and counting credential store for tests

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use async_trait::async_trait;
use tokio::sync::oneshot;

use super::{ApiClient, ApiRequest, ApiResponse, HttpExchange, Method};
use crate::credentials::{CredentialStore, MemoryCredentials};
use crate::error::TransportError;

enum Scripted {
    Ready(Result<ApiResponse, TransportError>),
    Held(oneshot::Receiver<ApiResponse>),
}

/// Answers requests from per-route queues; unscripted routes get a 404
#[derive(Default)]
pub struct MockExchange {
    scripts: RefCell<HashMap<(Method, String), VecDeque<Scripted>>>,
    requests: RefCell<Vec<ApiRequest>>,
}

pub fn reply(status: u16, body: serde_json::Value) -> ApiResponse {
    ApiResponse { status, body: body.to_string() }
}

impl MockExchange {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub fn client(self: &Rc<Self>, credentials: &Rc<CountingCredentials>) -> ApiClient {
        ApiClient::new(self.clone(), credentials.clone())
    }

    fn push(&self, method: Method, path: &str, scripted: Scripted) {
        self.scripts
            .borrow_mut()
            .entry((method, path.to_string()))
            .or_default()
            .push_back(scripted);
    }

    pub fn respond(&self, method: Method, path: &str, status: u16, body: serde_json::Value) {
        self.push(method, path, Scripted::Ready(Ok(reply(status, body))));
    }

    pub fn respond_raw(&self, method: Method, path: &str, status: u16, body: &str) {
        let response = ApiResponse { status, body: body.to_string() };
        self.push(method, path, Scripted::Ready(Ok(response)));
    }

    pub fn fail(&self, method: Method, path: &str, error: TransportError) {
        self.push(method, path, Scripted::Ready(Err(error)));
    }

    /// Keep the response open until the returned sender fires
    pub fn hold(&self, method: Method, path: &str) -> oneshot::Sender<ApiResponse> {
        let (tx, rx) = oneshot::channel();
        self.push(method, path, Scripted::Held(rx));
        tx
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.borrow().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.borrow().len()
    }

    pub fn last_request(&self, method: Method, path: &str) -> Option<ApiRequest> {
        self.requests
            .borrow()
            .iter()
            .rev()
            .find(|r| r.method == method && r.path == path)
            .cloned()
    }
}

#[async_trait(?Send)]
impl HttpExchange for MockExchange {
    async fn exchange(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        let key = (request.method.clone(), request.path.clone());
        self.requests.borrow_mut().push(request);
        let next = self.scripts.borrow_mut().get_mut(&key).and_then(VecDeque::pop_front);
        match next {
            Some(Scripted::Ready(result)) => result,
            Some(Scripted::Held(rx)) => rx
                .await
                .map_err(|_| TransportError::Network("held response dropped".into())),
            None => Ok(reply(404, serde_json::json!({"detail": "Not Found"}))),
        }
    }
}

/// Memory store that counts saves and clears
#[derive(Default)]
pub struct CountingCredentials {
    inner: MemoryCredentials,
    saves: Cell<usize>,
    clears: Cell<usize>,
}

impl CountingCredentials {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub fn with_token(token: &str) -> Rc<Self> {
        Rc::new(Self {
            inner: MemoryCredentials::with_token(token),
            ..Self::default()
        })
    }

    pub fn save_count(&self) -> usize {
        self.saves.get()
    }

    pub fn clear_count(&self) -> usize {
        self.clears.get()
    }
}

impl CredentialStore for CountingCredentials {
    fn save(&self, token: &str) {
        self.saves.set(self.saves.get() + 1);
        self.inner.save(token);
    }

    fn load(&self) -> Option<String> {
        self.inner.load()
    }

    fn clear(&self) {
        self.clears.set(self.clears.get() + 1);
        self.inner.clear();
    }
}
