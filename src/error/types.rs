//! Core error types.

use bytes::Bytes;
use reqwest::header::HeaderMap;
use std::sync::Arc;
use thiserror::Error;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, HttpClientError>;

/// Errors surfaced by request construction, dispatch and decoding.
///
/// Foreign errors are captured as strings so the type stays `Clone`; the
/// retry loop keeps the last failure around while it decides what to do next.
#[derive(Error, Debug, Clone)]
pub enum HttpClientError {
    /// The path or query could not be turned into a URL (including traversal).
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// A multipart part carries metadata that cannot be written as a header line.
    #[error("Invalid multipart encoding: {0}")]
    InvalidMultipartEncoding(String),

    /// Both a body and a multipart payload were set on the same request.
    #[error("Request sets both a body and a multipart payload")]
    ConflictingBodyTypes,

    /// The request body could not be encoded.
    #[error("Invalid body encoding: {0}")]
    InvalidEncoding(String),

    /// A header name or value is not valid on the wire.
    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    /// Success status with an empty body and no empty-body handler.
    #[error("Empty response body (HTTP {status})")]
    EmptyResponse { status: u16 },

    /// Response metadata was missing or unexpected.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// 401 after the single refresh attempt, or with retry disallowed.
    #[error("Unauthorized")]
    Unauthorized { body: Bytes, headers: HeaderMap },

    /// Any other non-2xx response.
    #[error("HTTP {status}")]
    HttpError {
        status: u16,
        body: Bytes,
        headers: HeaderMap,
    },

    /// Cooperative cancellation was observed.
    #[error("Request was cancelled")]
    Cancelled,

    /// The transport failed before a response was received.
    #[error("Transport error: {0}")]
    TransportError(String),

    /// The response body could not be decoded into the requested type.
    #[error("Decode error: {0}")]
    DecodeError(String),

    /// Client configuration is invalid (base URL, proxy, TLS setup).
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// A domain error produced by an error decoder or a token refresher.
    #[error("{0}")]
    Custom(Arc<dyn std::error::Error + Send + Sync>),
}

impl HttpClientError {
    /// Build a generic HTTP error with a text body and no headers.
    pub fn http(status: u16, body: impl Into<Bytes>) -> Self {
        Self::HttpError {
            status,
            body: body.into(),
            headers: HeaderMap::new(),
        }
    }

    /// Wrap a domain error.
    pub fn custom<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Custom(Arc::new(error))
    }

    /// Status code carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::HttpError { status, .. } | Self::EmptyResponse { status } => Some(*status),
            Self::Unauthorized { .. } => Some(401),
            _ => None,
        }
    }

    /// Default retry predicate: transport failures, timeouts, throttling and 5xx.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::TransportError(_) => true,
            Self::HttpError { status, .. } => {
                matches!(status, 408 | 429) || (500..=599).contains(status)
            }
            _ => false,
        }
    }

    /// Failures raised while building the wire request. Never retried.
    pub fn is_construction_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidUrl(_)
                | Self::InvalidMultipartEncoding(_)
                | Self::ConflictingBodyTypes
                | Self::InvalidEncoding(_)
                | Self::InvalidHeader(_)
        )
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Lossy UTF-8 view of the response body carried by HTTP-level errors.
    pub fn body_text(&self) -> Option<String> {
        match self {
            Self::HttpError { body, .. } | Self::Unauthorized { body, .. } => {
                Some(String::from_utf8_lossy(body).into_owned())
            }
            _ => None,
        }
    }
}

impl From<reqwest::Error> for HttpClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_builder() {
            Self::ConfigurationError(err.to_string())
        } else {
            Self::TransportError(err.to_string())
        }
    }
}

impl From<serde_json::Error> for HttpClientError {
    fn from(err: serde_json::Error) -> Self {
        Self::DecodeError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Error)]
    #[error("quota exhausted for {0}")]
    struct QuotaError(String);

    #[test]
    fn server_errors_are_retryable() {
        assert!(HttpClientError::http(503, "busy").is_retryable());
        assert!(HttpClientError::http(429, "").is_retryable());
        assert!(HttpClientError::TransportError("reset".into()).is_retryable());
        assert!(!HttpClientError::http(404, "").is_retryable());
        assert!(!HttpClientError::Cancelled.is_retryable());
    }

    #[test]
    fn construction_errors_are_flagged() {
        assert!(HttpClientError::ConflictingBodyTypes.is_construction_error());
        assert!(HttpClientError::InvalidUrl("..".into()).is_construction_error());
        assert!(!HttpClientError::EmptyResponse { status: 204 }.is_construction_error());
    }

    #[test]
    fn custom_error_displays_inner_message() {
        let err = HttpClientError::custom(QuotaError("acct-1".into()));
        assert_eq!(err.to_string(), "quota exhausted for acct-1");
        assert_eq!(err.status(), None);
    }

    #[test]
    fn body_text_reads_http_error_payload() {
        let err = HttpClientError::http(500, "boom");
        assert_eq!(err.body_text().as_deref(), Some("boom"));
        assert_eq!(err.status(), Some(500));
    }
}
