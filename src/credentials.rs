//! Credential Store
//!
//! Durable home of the session token. No validation: the token is opaque.

use std::cell::RefCell;

/// get/set/clear over wherever the token lives
pub trait CredentialStore {
    fn save(&self, token: &str);
    fn load(&self) -> Option<String>;
    fn clear(&self);
}

/// Browser `localStorage`, surviving reloads within the profile
pub struct LocalStorageCredentials {
    key: String,
}

impl LocalStorageCredentials {
    /// `None` when the page has no usable localStorage (private mode, sandboxed iframe)
    pub fn open(key: impl Into<String>) -> Option<Self> {
        storage()?;
        Some(Self { key: key.into() })
    }
}

fn storage() -> Option<web_sys::Storage> {
    web_sys::window().and_then(|w| w.local_storage().ok().flatten())
}

impl CredentialStore for LocalStorageCredentials {
    fn save(&self, token: &str) {
        match storage() {
            Some(storage) => {
                if let Err(e) = storage.set_item(&self.key, token) {
                    tracing::warn!(key = %self.key, error = ?e, "failed to persist session token");
                }
            }
            None => tracing::warn!("localStorage unavailable; session token not persisted"),
        }
    }

    fn load(&self) -> Option<String> {
        storage()?.get_item(&self.key).ok().flatten().filter(|t| !t.is_empty())
    }

    fn clear(&self) {
        if let Some(storage) = storage() {
            if let Err(e) = storage.remove_item(&self.key) {
                tracing::warn!(key = %self.key, error = ?e, "failed to remove session token");
            }
        }
    }
}

/// Process-lifetime store; used when localStorage is unavailable
#[derive(Default)]
pub struct MemoryCredentials {
    token: RefCell<Option<String>>,
}

impl MemoryCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: RefCell::new(Some(token.into())),
        }
    }
}

impl CredentialStore for MemoryCredentials {
    fn save(&self, token: &str) {
        *self.token.borrow_mut() = Some(token.to_string());
    }

    fn load(&self) -> Option<String> {
        self.token.borrow().clone()
    }

    fn clear(&self) {
        self.token.borrow_mut().take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_round_trip() {
        let store = MemoryCredentials::new();
        assert_eq!(store.load(), None);

        store.save("abc");
        assert_eq!(store.load().as_deref(), Some("abc"));

        store.clear();
        store.clear();
        assert_eq!(store.load(), None);
    }

    #[test]
    fn test_memory_store_seeded() {
        assert_eq!(MemoryCredentials::with_token("t").load().as_deref(), Some("t"));
    }
}
