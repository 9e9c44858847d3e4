//! HTTP Headers Utility
//!
//! Composes the header set of a wire request. Caller-supplied request headers
//! always win; everything else is only filled in where the key is absent.

use crate::error::{HttpClientError, Result};
use crate::types::http::UserAgentConfig;
use reqwest::header::{
    ACCEPT, AUTHORIZATION, HeaderMap, HeaderName, HeaderValue, USER_AGENT,
};
use std::collections::HashMap;

/// HTTP header builder for API requests
pub struct HttpHeaderBuilder {
    headers: HeaderMap,
}

impl HttpHeaderBuilder {
    /// Create a new header builder
    pub fn new() -> Self {
        Self {
            headers: HeaderMap::new(),
        }
    }

    /// Add Bearer token authorization unless one is already present
    pub fn with_bearer_auth(mut self, token: &str) -> Result<Self> {
        if self.headers.contains_key(AUTHORIZATION) {
            return Ok(self);
        }
        let auth_value = format!("Bearer {token}");
        let mut value = HeaderValue::from_str(&auth_value)
            .map_err(|e| HttpClientError::InvalidHeader(format!("Invalid access token format: {e}")))?;
        value.set_sensitive(true);
        self.headers.insert(AUTHORIZATION, value);
        Ok(self)
    }

    /// Add `Accept: application/json` unless an Accept header is present
    pub fn with_json_accept(mut self) -> Self {
        if !self.headers.contains_key(ACCEPT) {
            self.headers
                .insert(ACCEPT, HeaderValue::from_static("application/json"));
        }
        self
    }

    /// Add user agent unless one is present
    pub fn with_user_agent(mut self, user_agent: &str) -> Result<Self> {
        if self.headers.contains_key(USER_AGENT) {
            return Ok(self);
        }
        self.headers.insert(
            USER_AGENT,
            HeaderValue::from_str(user_agent)
                .map_err(|e| HttpClientError::InvalidHeader(format!("Invalid user agent: {e}")))?,
        );
        Ok(self)
    }

    /// Add a custom header, replacing any previous value
    pub fn with_header(mut self, name: &str, value: &str) -> Result<Self> {
        let (name, value) = parse_header(name, value)?;
        self.headers.insert(name, value);
        Ok(self)
    }

    /// Add headers from a HashMap, replacing previous values
    pub fn with_custom_headers(mut self, custom_headers: &HashMap<String, String>) -> Result<Self> {
        for (key, value) in custom_headers {
            let (name, value) = parse_header(key, value)?;
            self.headers.insert(name, value);
        }
        Ok(self)
    }

    /// Add headers from a HashMap only where the name is not yet present
    pub fn with_default_headers(mut self, defaults: &HashMap<String, String>) -> Result<Self> {
        for (key, value) in defaults {
            let (name, value) = parse_header(key, value)?;
            if !self.headers.contains_key(&name) {
                self.headers.insert(name, value);
            }
        }
        Ok(self)
    }

    /// Build the final HeaderMap
    pub fn build(self) -> HeaderMap {
        self.headers
    }
}

impl Default for HttpHeaderBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_header(name: &str, value: &str) -> Result<(HeaderName, HeaderValue)> {
    let header_name = HeaderName::from_bytes(name.as_bytes())
        .map_err(|e| HttpClientError::InvalidHeader(format!("Invalid header name '{name}': {e}")))?;
    let header_value = HeaderValue::from_str(value).map_err(|e| {
        HttpClientError::InvalidHeader(format!("Invalid value for header '{name}': {e}"))
    })?;
    Ok((header_name, header_value))
}

/// Compose the header set for one wire request.
///
/// Precedence: request headers, then base headers, then the generated
/// `Authorization`, `Accept` and `User-Agent` values, each only when absent.
pub fn compose_headers(
    base_headers: &HashMap<String, String>,
    request_headers: &HashMap<String, String>,
    access_token: Option<&str>,
    content_type: &str,
    user_agent: Option<&UserAgentConfig>,
) -> Result<HeaderMap> {
    let mut builder = HttpHeaderBuilder::new()
        .with_custom_headers(request_headers)?
        .with_default_headers(base_headers)?;
    if let Some(token) = access_token {
        builder = builder.with_bearer_auth(token)?;
    }
    if content_type.contains("application/json") {
        builder = builder.with_json_accept();
    }
    if let Some(ua) = user_agent {
        builder = builder.with_user_agent(&ua.render())?;
    }
    Ok(builder.build())
}

/// Convert reqwest HeaderMap to HashMap<String, String>
///
/// Invalid UTF-8 header values are filtered out; keys are lowercase.
pub fn headermap_to_hashmap(headers: &HeaderMap) -> HashMap<String, String> {
    headers
        .iter()
        .filter_map(|(k, v)| {
            v.to_str()
                .ok()
                .map(|v_str| (k.as_str().to_string(), v_str.to_string()))
        })
        .collect()
}
