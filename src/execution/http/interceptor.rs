//! HTTP Interceptor interfaces
//!
//! Interceptors observe every wire attempt: they may tweak the outgoing
//! request before dispatch, look at the raw response, and get notified about
//! errors and resends. Hooks are best-effort and should stay cheap.

use crate::error::{HttpClientError, Result};
use crate::execution::http::transport::{HttpTransportRequest, HttpTransportResponse};
use crate::types::request::HttpMethod;

/// Context passed to interceptors describing the request.
#[derive(Clone, Debug)]
pub struct HttpRequestContext {
    /// Stable for one logical request across retries and the 401 resend.
    pub request_id: String,
    pub method: HttpMethod,
    pub url: String,
    /// Zero-based wire attempt counter.
    pub attempt: u32,
}

/// Generate a fresh request id.
pub fn generate_request_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// HTTP interceptor trait
pub trait HttpInterceptor: Send + Sync {
    /// Called before a request goes on the wire. Returning an error aborts the
    /// attempt without dispatching it.
    fn on_before_send(
        &self,
        _ctx: &HttpRequestContext,
        _request: &mut HttpTransportRequest,
    ) -> Result<()> {
        Ok(())
    }

    /// Called for every response that made it back, whatever its status.
    fn on_response(&self, _ctx: &HttpRequestContext, _response: &HttpTransportResponse) -> Result<()> {
        Ok(())
    }

    /// Called when an attempt fails.
    fn on_error(&self, _ctx: &HttpRequestContext, _error: &HttpClientError) {}

    /// Called before the request is sent again after a 401 refresh.
    fn on_retry(&self, _ctx: &HttpRequestContext, _error: &HttpClientError, _attempt: u32) {}
}

/// A simple logging interceptor backed by `tracing` (no header values).
#[derive(Clone, Default)]
pub struct LoggingInterceptor;

impl HttpInterceptor for LoggingInterceptor {
    fn on_before_send(
        &self,
        ctx: &HttpRequestContext,
        request: &mut HttpTransportRequest,
    ) -> Result<()> {
        tracing::debug!(
            target: "wirecall::http",
            request_id = %ctx.request_id,
            method = %ctx.method,
            url = %ctx.url,
            attempt = ctx.attempt,
            header_count = request.headers.len(),
            content_length = ?request.content_length,
            "sending request"
        );
        Ok(())
    }

    fn on_response(&self, ctx: &HttpRequestContext, response: &HttpTransportResponse) -> Result<()> {
        tracing::debug!(
            target: "wirecall::http",
            request_id = %ctx.request_id,
            url = %ctx.url,
            status = response.status,
            body_len = response.body.len(),
            "response received"
        );
        Ok(())
    }

    fn on_error(&self, ctx: &HttpRequestContext, error: &HttpClientError) {
        tracing::debug!(target: "wirecall::http", request_id = %ctx.request_id, url = %ctx.url, err = %error, "request error");
    }

    fn on_retry(&self, ctx: &HttpRequestContext, error: &HttpClientError, attempt: u32) {
        tracing::debug!(target: "wirecall::http", request_id = %ctx.request_id, url = %ctx.url, attempt, err = %error, "resending request");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_ids_are_unique() {
        let a = generate_request_id();
        let b = generate_request_id();
        assert_ne!(a, b);
        assert_eq!(a.len(), 36);
    }
}
