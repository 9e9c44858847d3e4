//! Authentication helpers and token providers.
//!
//! Two capabilities meet here:
//! - a synchronous access-token supplier consulted while composing headers, and
//! - an asynchronous refresher invoked at most once per logical request after
//!   a 401.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use crate::error::Result;

/// A synchronous Bearer token provider.
///
/// Notes:
/// - The interface is intentionally synchronous; header composition is not async.
/// - Returning `None` omits the `Authorization` header.
pub trait TokenProvider: Send + Sync {
    /// Returns an access token suitable for the `Authorization: Bearer <token>` header.
    fn access_token(&self) -> Option<String>;
}

/// Refreshes credentials after the server rejected them.
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    async fn refresh(&self) -> Result<()>;
}

/// A simple static token provider useful for tests and basic scenarios where
/// the token is managed externally.
pub struct StaticTokenProvider {
    token: SecretString,
}

impl StaticTokenProvider {
    /// Create a new static token provider.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: SecretString::from(token.into()),
        }
    }
}

impl TokenProvider for StaticTokenProvider {
    fn access_token(&self) -> Option<String> {
        Some(self.token.expose_secret().to_string())
    }
}

/// A token slot that a refresher can overwrite.
#[derive(Clone, Default)]
pub struct SharedTokenProvider {
    token: Arc<RwLock<Option<SecretString>>>,
}

impl SharedTokenProvider {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: Arc::new(RwLock::new(token.map(SecretString::from))),
        }
    }

    /// Replace the current token.
    pub fn set(&self, token: Option<String>) {
        let mut guard = self.token.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = token.map(SecretString::from);
    }
}

impl TokenProvider for SharedTokenProvider {
    fn access_token(&self) -> Option<String> {
        let guard = self.token.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        guard.as_ref().map(|t| t.expose_secret().to_string())
    }
}

impl<F> TokenProvider for F
where
    F: Fn() -> Option<String> + Send + Sync,
{
    fn access_token(&self) -> Option<String> {
        self()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_provider_returns_token() {
        let provider = StaticTokenProvider::new("abc");
        assert_eq!(provider.access_token().as_deref(), Some("abc"));
    }

    #[test]
    fn shared_provider_can_be_replaced() {
        let provider = SharedTokenProvider::new(None);
        assert!(provider.access_token().is_none());
        let writer = provider.clone();
        writer.set(Some("fresh".into()));
        assert_eq!(provider.access_token().as_deref(), Some("fresh"));
    }

    #[test]
    fn shared_provider_survives_poisoned_lock() {
        let provider = SharedTokenProvider::new(Some("stale".into()));
        let poisoner = provider.clone();
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.token.write().unwrap();
            panic!("poison the token lock");
        })
        .join();
        assert!(provider.token.is_poisoned());

        assert_eq!(provider.access_token().as_deref(), Some("stale"));
        provider.set(Some("fresh".into()));
        assert_eq!(provider.access_token().as_deref(), Some("fresh"));
    }

    #[test]
    fn closures_supply_tokens() {
        let supplier = || Some("from-closure".to_string());
        assert_eq!(supplier.access_token().as_deref(), Some("from-closure"));
    }
}
