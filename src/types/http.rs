//! HTTP configuration types.
//!
//! This module defines `HttpConfig` and its builder, used to configure the
//! shared `reqwest::Client` and the base headers applied to every request.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Inputs for the generated `User-Agent` header.
///
/// Rendered as
/// `AppName/AppVersion (BundleId; build:Build; Platform OSVersion) LibraryName/LibraryVersion`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAgentConfig {
    pub app_name: String,
    pub app_version: String,
    pub bundle_id: String,
    pub build: String,
    pub platform: String,
    pub os_version: String,
    pub library_name: String,
    pub library_version: String,
}

impl UserAgentConfig {
    /// Create a config for the given application; platform and library fields
    /// default to the host OS and this crate.
    pub fn new(
        app_name: impl Into<String>,
        app_version: impl Into<String>,
        bundle_id: impl Into<String>,
        build: impl Into<String>,
    ) -> Self {
        Self {
            app_name: app_name.into(),
            app_version: app_version.into(),
            bundle_id: bundle_id.into(),
            build: build.into(),
            platform: std::env::consts::OS.to_string(),
            os_version: String::new(),
            library_name: crate::defaults::library::NAME.to_string(),
            library_version: crate::defaults::library::VERSION.to_string(),
        }
    }

    pub fn with_platform(mut self, platform: impl Into<String>, os_version: impl Into<String>) -> Self {
        self.platform = platform.into();
        self.os_version = os_version.into();
        self
    }

    pub fn with_library(mut self, name: impl Into<String>, version: impl Into<String>) -> Self {
        self.library_name = name.into();
        self.library_version = version.into();
        self
    }

    /// Render the header value.
    pub fn render(&self) -> String {
        let platform = if self.os_version.is_empty() {
            self.platform.clone()
        } else {
            format!("{} {}", self.platform, self.os_version)
        };
        format!(
            "{}/{} ({}; build:{}; {}) {}/{}",
            self.app_name,
            self.app_version,
            self.bundle_id,
            self.build,
            platform,
            self.library_name,
            self.library_version
        )
    }
}

/// HTTP configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Request timeout
    #[serde(with = "duration_option_serde")]
    pub timeout: Option<Duration>,
    /// Connection timeout
    #[serde(with = "duration_option_serde")]
    pub connect_timeout: Option<Duration>,
    /// Base headers applied to every request (request headers win)
    pub headers: HashMap<String, String>,
    /// Proxy settings
    pub proxy: Option<String>,
    /// User agent inputs; no `User-Agent` header is generated when absent
    pub user_agent: Option<UserAgentConfig>,
}

/// Builder for `HttpConfig`
#[derive(Debug, Clone, Default)]
pub struct HttpConfigBuilder {
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    headers: HashMap<String, String>,
    proxy: Option<String>,
    user_agent: Option<UserAgentConfig>,
}

impl HttpConfigBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self::default()
    }

    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
    pub fn connect_timeout(mut self, connect_timeout: Option<Duration>) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }
    pub fn user_agent(mut self, user_agent: Option<UserAgentConfig>) -> Self {
        self.user_agent = user_agent;
        self
    }
    pub fn proxy<S: Into<String>>(mut self, proxy: Option<S>) -> Self {
        self.proxy = proxy.map(|s| s.into());
        self
    }
    pub fn header<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }
    pub fn headers(mut self, headers: HashMap<String, String>) -> Self {
        self.headers.extend(headers);
        self
    }

    /// Build the configuration
    pub fn build(self) -> HttpConfig {
        let defaults = HttpConfig::default();
        HttpConfig {
            timeout: self.timeout.or(defaults.timeout),
            connect_timeout: self.connect_timeout.or(defaults.connect_timeout),
            headers: self.headers,
            proxy: self.proxy,
            user_agent: self.user_agent,
        }
    }
}

impl HttpConfig {
    /// Returns a builder for constructing `HttpConfig`
    pub fn builder() -> HttpConfigBuilder {
        HttpConfigBuilder::new()
    }

    /// Build the `reqwest::Client` shared by direct and progress-tracked dispatch.
    pub fn build_client(&self) -> crate::error::Result<reqwest::Client> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(connect_timeout) = self.connect_timeout {
            builder = builder.connect_timeout(connect_timeout);
        }
        if let Some(proxy) = &self.proxy {
            let proxy = reqwest::Proxy::all(proxy).map_err(|e| {
                crate::error::HttpClientError::ConfigurationError(format!(
                    "Invalid proxy '{proxy}': {e}"
                ))
            })?;
            builder = builder.proxy(proxy);
        }
        builder
            .build()
            .map_err(|e| crate::error::HttpClientError::ConfigurationError(e.to_string()))
    }
}

// Helper module for Duration serialization
mod duration_option_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => d.as_secs().serialize(serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs: Option<u64> = Option::deserialize(deserializer)?;
        Ok(secs.map(Duration::from_secs))
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: Some(crate::defaults::http::REQUEST_TIMEOUT),
            connect_timeout: Some(crate::defaults::http::CONNECT_TIMEOUT),
            headers: HashMap::new(),
            proxy: None,
            user_agent: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_agent_renders_all_segments() {
        let ua = UserAgentConfig::new("Notes", "2.1", "com.example.notes", "42")
            .with_platform("iOS", "17.4")
            .with_library("wirecall", "0.3.0");
        assert_eq!(
            ua.render(),
            "Notes/2.1 (com.example.notes; build:42; iOS 17.4) wirecall/0.3.0"
        );
    }

    #[test]
    fn builder_keeps_default_timeouts() {
        let config = HttpConfig::builder().header("x-team", "core").build();
        assert_eq!(config.timeout, Some(crate::defaults::http::REQUEST_TIMEOUT));
        assert_eq!(config.headers.get("x-team").map(String::as_str), Some("core"));
    }

    #[test]
    fn config_roundtrips_through_json() {
        let config = HttpConfig::builder()
            .timeout(Some(Duration::from_secs(5)))
            .proxy(Some("http://proxy.local:8080"))
            .build();
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["timeout"], 5);
        let back: HttpConfig = serde_json::from_value(json).unwrap();
        assert_eq!(back.timeout, Some(Duration::from_secs(5)));
        assert_eq!(back.proxy.as_deref(), Some("http://proxy.local:8080"));
    }
}
