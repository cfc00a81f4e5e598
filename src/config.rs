//! Application Configuration
//!
//! Build-time defaults, optionally overridden by a JSON document embedded in
//! the host page (`<script id="app-config" type="application/json">`).

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Element id of the inline configuration document
pub const CONFIG_ELEMENT_ID: &str = "app-config";

const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";
const DEFAULT_TOKEN_KEY: &str = "access_token";
const DEFAULT_LOGIN_PATH: &str = "/login";
const DEFAULT_TIMEOUT_MS: u64 = 15_000;
const DEFAULT_LOG_LEVEL: &str = "info";

/// Runtime settings for the client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Base URL of the task service
    pub api_base_url: String,
    /// localStorage key holding the session token
    pub token_storage_key: String,
    /// Login entry point used for forced-logout redirects
    pub login_path: String,
    /// Per-request timeout in milliseconds
    pub request_timeout_ms: u64,
    /// Max tracing level (`trace`..`error`, or `off`)
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: option_env!("TASK_MANAGER_API_URL")
                .unwrap_or(DEFAULT_API_BASE_URL)
                .to_string(),
            token_storage_key: DEFAULT_TOKEN_KEY.to_string(),
            login_path: DEFAULT_LOGIN_PATH.to_string(),
            request_timeout_ms: DEFAULT_TIMEOUT_MS,
            log_level: option_env!("TASK_MANAGER_LOG")
                .unwrap_or(DEFAULT_LOG_LEVEL)
                .to_string(),
        }
    }
}

impl AppConfig {
    /// Parse a (possibly partial) JSON config; missing fields keep defaults.
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// Load config from the host page, falling back to defaults.
    ///
    /// A malformed document is reported on the console and ignored, since
    /// the logger is not installed yet at this point.
    pub fn load() -> Self {
        let Some(raw) = inline_document() else {
            return Self::default();
        };
        match Self::from_json(&raw) {
            Ok(config) => config,
            Err(e) => {
                web_sys::console::warn_1(&format!("[CONFIG] ignoring #{}: {}", CONFIG_ELEMENT_ID, e).into());
                Self::default()
            }
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

fn inline_document() -> Option<String> {
    let document = web_sys::window()?.document()?;
    let element = document.get_element_by_id(CONFIG_ELEMENT_ID)?;
    element.text_content().filter(|text| !text.trim().is_empty())
}
