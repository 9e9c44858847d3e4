//! Request executor.
//!
//! One logical `send` runs attempts through the `RetryExecutor`. Each attempt
//! builds the wire request (path, URL, headers, body), dispatches it directly
//! or through the progress dispatcher, and classifies the outcome. A 401 on a
//! request that allows it triggers at most one token refresh per logical
//! request, followed by one resend with freshly composed headers.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use reqwest::Url;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE, HeaderValue};

use crate::auth::{TokenProvider, TokenRefresher};
use crate::encoding::Codec;
use crate::error::{HttpClientError, Result};
use crate::execution::body::materialize_request_body;
use crate::execution::http::headers::compose_headers;
use crate::execution::http::interceptor::{HttpInterceptor, HttpRequestContext, generate_request_id};
use crate::execution::http::path::{build_url, normalize_path};
use crate::execution::http::transport::{
    HttpTransport, HttpTransportRequest, HttpTransportResponse, WireBody,
};
use crate::execution::progress::{ProgressDispatcher, ProgressSink};
use crate::retry::{AttemptError, RetryExecutor};
use crate::types::http::UserAgentConfig;
use crate::types::request::Request;
use crate::utils::cancel::CancelHandle;

/// Builds, dispatches and classifies requests against one base URL.
pub struct RequestExecutor {
    pub(crate) base_url: Url,
    pub(crate) base_headers: HashMap<String, String>,
    pub(crate) user_agent: Option<UserAgentConfig>,
    pub(crate) transport: Arc<dyn HttpTransport>,
    pub(crate) progress: Arc<ProgressDispatcher>,
    pub(crate) codec: Arc<dyn Codec>,
    pub(crate) refresher: Option<Arc<dyn TokenRefresher>>,
    pub(crate) interceptors: Vec<Arc<dyn HttpInterceptor>>,
}

/// State shared by every attempt of one logical request.
struct LogicalRequest<'a, R> {
    request: &'a Request<R>,
    tokens: &'a dyn TokenProvider,
    cancel: &'a CancelHandle,
    request_id: String,
    /// Set once the single refresh has been spent.
    refreshed: AtomicBool,
}

impl RequestExecutor {
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Execute `request` to completion: a decoded response or the last error.
    pub async fn send<R: Send + 'static>(
        &self,
        request: &Request<R>,
        tokens: &dyn TokenProvider,
        cancel: &CancelHandle,
    ) -> Result<R> {
        let logical = LogicalRequest {
            request,
            tokens,
            cancel,
            request_id: generate_request_id(),
            refreshed: AtomicBool::new(false),
        };

        let result = RetryExecutor::new(&request.retry_policy)
            .execute(cancel, |attempt| self.run_attempt(&logical, attempt))
            .await;

        if let Err(error) = &result {
            tracing::error!(
                target: "wirecall::http",
                request_id = %logical.request_id,
                method = %request.method,
                path = %request.path,
                err = %error,
                "request failed"
            );
        }
        result
    }

    async fn run_attempt<R: Send + 'static>(
        &self,
        logical: &LogicalRequest<'_, R>,
        attempt: u32,
    ) -> std::result::Result<R, AttemptError> {
        let request = logical.request;
        let cancel = logical.cancel;
        tracing::info!(
            target: "wirecall::http",
            request_id = %logical.request_id,
            method = %request.method,
            path = %request.path,
            attempt,
            "starting request attempt"
        );

        cancel.check()?;
        let wire = self.build(request, logical.tokens)?;
        cancel.check()?;

        let ctx = HttpRequestContext {
            request_id: logical.request_id.clone(),
            method: request.method,
            url: wire.url.to_string(),
            attempt,
        };
        let mut response = self.dispatch(&ctx, wire, request.progress.as_ref(), cancel).await?;
        cancel.check()?;

        if response.status == 401 && request.allows_retry {
            if let Some(refresher) = &self.refresher {
                if !logical.refreshed.swap(true, Ordering::SeqCst) {
                    response = self.refresh_and_resend(logical, &ctx, refresher.as_ref()).await?;
                }
            }
        }

        let codec = request.codec.as_deref().unwrap_or(self.codec.as_ref());
        classify(request, response, codec).map_err(|error| {
            for interceptor in &self.interceptors {
                interceptor.on_error(&ctx, &error);
            }
            AttemptError::from(error)
        })
    }

    /// Refresh credentials once, then resend with rebuilt headers. The resend
    /// is classified without another refresh.
    async fn refresh_and_resend<R: Send + 'static>(
        &self,
        logical: &LogicalRequest<'_, R>,
        ctx: &HttpRequestContext,
        refresher: &dyn TokenRefresher,
    ) -> std::result::Result<HttpTransportResponse, AttemptError> {
        let cancel = logical.cancel;
        tracing::debug!(target: "wirecall::http", request_id = %ctx.request_id, "401 received, refreshing credentials");

        cancel.run(refresher.refresh()).await.map_err(|error| {
            tracing::debug!(target: "wirecall::http", request_id = %ctx.request_id, err = %error, "credential refresh failed");
            AttemptError::terminal(error)
        })?;
        cancel.check()?;

        let unauthorized = HttpClientError::Unauthorized {
            body: Default::default(),
            headers: Default::default(),
        };
        for interceptor in &self.interceptors {
            interceptor.on_retry(ctx, &unauthorized, ctx.attempt + 1);
        }

        let wire = self.build(logical.request, logical.tokens)?;
        cancel.check()?;
        let response = self
            .dispatch(ctx, wire, logical.request.progress.as_ref(), cancel)
            .await?;
        cancel.check()?;
        Ok(response)
    }

    /// Building: path, URL, headers and body.
    fn build<R>(&self, request: &Request<R>, tokens: &dyn TokenProvider) -> Result<HttpTransportRequest> {
        let path = normalize_path(&request.path)?;
        let url = build_url(&self.base_url, &path, &request.query)?;
        let codec = request.codec.as_deref().unwrap_or(self.codec.as_ref());
        let body = materialize_request_body(
            request.body.as_ref(),
            request.multipart.as_ref(),
            &request.content_type,
            codec,
        )?;

        let access_token = tokens.access_token();
        let mut headers = compose_headers(
            &self.base_headers,
            &request.headers,
            access_token.as_deref(),
            &request.content_type,
            self.user_agent.as_ref(),
        )?;

        let Some(body) = body else {
            return Ok(HttpTransportRequest {
                method: request.method,
                url,
                headers,
                body: WireBody::Empty,
                content_length: None,
            });
        };

        if body.content_type_forced || !headers.contains_key(CONTENT_TYPE) {
            let value = HeaderValue::from_str(&body.content_type).map_err(|e| {
                HttpClientError::InvalidHeader(format!("Invalid content type '{}': {e}", body.content_type))
            })?;
            headers.insert(CONTENT_TYPE, value);
        }
        if let Some(len) = body.content_length {
            headers.insert(CONTENT_LENGTH, HeaderValue::from(len));
        }

        Ok(HttpTransportRequest {
            method: request.method,
            url,
            headers,
            body: body.body,
            content_length: body.content_length,
        })
    }

    /// Dispatching: through the progress dispatcher when a sink is attached,
    /// otherwise straight to the transport.
    async fn dispatch(
        &self,
        ctx: &HttpRequestContext,
        mut wire: HttpTransportRequest,
        progress: Option<&Arc<dyn ProgressSink>>,
        cancel: &CancelHandle,
    ) -> Result<HttpTransportResponse> {
        for interceptor in &self.interceptors {
            interceptor.on_before_send(ctx, &mut wire)?;
        }

        let outcome = match progress {
            Some(sink) => self.progress.execute(wire, sink.clone(), cancel).await,
            None => cancel.run(self.transport.send(wire)).await,
        };

        match outcome {
            Ok(response) => {
                for interceptor in &self.interceptors {
                    interceptor.on_response(ctx, &response)?;
                }
                Ok(response)
            }
            Err(error) => {
                for interceptor in &self.interceptors {
                    interceptor.on_error(ctx, &error);
                }
                Err(error)
            }
        }
    }
}

/// Classification of a response that will not be refreshed.
fn classify<R>(request: &Request<R>, response: HttpTransportResponse, codec: &dyn Codec) -> Result<R> {
    if !response.is_success() {
        if let Some(error) = request
            .error_decoder
            .as_ref()
            .and_then(|decode| decode(&response.body))
        {
            return Err(error);
        }
        return Err(if response.status == 401 {
            HttpClientError::Unauthorized {
                body: response.body,
                headers: response.headers,
            }
        } else {
            HttpClientError::HttpError {
                status: response.status,
                body: response.body,
                headers: response.headers,
            }
        });
    }

    if response.body.is_empty() {
        return match &request.empty_body_handler {
            Some(handler) => handler(response.status, &response.headers),
            None => Err(HttpClientError::EmptyResponse {
                status: response.status,
            }),
        };
    }

    (request.decoder)(&response, codec)
}
