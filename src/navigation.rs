//! Browser location helpers
//!
//! Forced logouts use a full page load rather than client-side routing so
//! no state from the old session survives.

/// Current `pathname`, or `/` outside a browser
pub fn current_path() -> String {
    web_sys::window()
        .and_then(|w| w.location().pathname().ok())
        .unwrap_or_else(|| "/".to_string())
}

pub fn hard_redirect(path: &str) {
    let Some(window) = web_sys::window() else {
        tracing::warn!(%path, "no window; cannot redirect");
        return;
    };
    if let Err(e) = window.location().set_href(path) {
        tracing::error!(%path, error = ?e, "redirect failed");
    }
}

/// Whether a forced logout observed at `current` should reload to `login_path`
pub fn needs_redirect(current: &str, login_path: &str) -> bool {
    current.trim_end_matches('/') != login_path.trim_end_matches('/')
}
