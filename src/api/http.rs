//! reqwest-backed exchange (browser `fetch` on wasm32)

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;

use super::{ApiRequest, ApiResponse, HttpExchange};
use crate::config::AppConfig;
use crate::error::TransportError;

pub struct ReqwestExchange {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl ReqwestExchange {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client: reqwest::Client::new(),
            base_url,
            timeout,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(&config.api_base_url, config.request_timeout())
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// `Content-Type` is only set (by `json`) when there is a body, so reads
    /// stay simple CORS requests.
    fn build(&self, request: ApiRequest) -> reqwest::RequestBuilder {
        let mut builder = self.client.request(request.method, self.url(&request.path));
        if let Some(authorization) = request.authorization {
            builder = builder.header(AUTHORIZATION, authorization);
        }
        if let Some(body) = request.body {
            builder = builder.json(&body);
        }
        #[cfg(not(target_arch = "wasm32"))]
        {
            builder = builder.timeout(self.timeout);
        }
        builder
    }
}

#[async_trait(?Send)]
impl HttpExchange for ReqwestExchange {
    async fn exchange(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        let limit = self.timeout;
        let builder = self.build(request);

        let round_trip = async move {
            let response = builder.send().await.map_err(|e| classify(e, limit))?;
            let status = response.status().as_u16();
            let body = response.text().await.map_err(|e| classify(e, limit))?;
            Ok(ApiResponse { status, body })
        };
        with_timeout(limit, round_trip).await
    }
}

fn classify(error: reqwest::Error, limit: Duration) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout(limit)
    } else {
        TransportError::Network(error.to_string())
    }
}

/// fetch has no native timeout; race it against a timer.
#[cfg(target_arch = "wasm32")]
async fn with_timeout<F>(limit: Duration, round_trip: F) -> Result<ApiResponse, TransportError>
where
    F: Future<Output = Result<ApiResponse, TransportError>>,
{
    use futures::future::{self, Either};

    let millis = u32::try_from(limit.as_millis()).unwrap_or(u32::MAX);
    let timer = gloo_timers::future::TimeoutFuture::new(millis);
    futures::pin_mut!(round_trip);
    futures::pin_mut!(timer);
    match future::select(round_trip, timer).await {
        Either::Left((result, _)) => result,
        Either::Right(_) => Err(TransportError::Timeout(limit)),
    }
}

#[cfg(not(target_arch = "wasm32"))]
async fn with_timeout<F>(_limit: Duration, round_trip: F) -> Result<ApiResponse, TransportError>
where
    F: Future<Output = Result<ApiResponse, TransportError>>,
{
    round_trip.await
}
