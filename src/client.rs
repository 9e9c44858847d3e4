//! Client Module
//!
//! `Client` is the entry point: it owns one `reqwest::Client` (one connection
//! pool) shared by the direct transport and the progress dispatcher, plus the
//! collaborators every request goes through.

use std::sync::Arc;

use reqwest::Url;

use crate::auth::{TokenProvider, TokenRefresher};
use crate::encoding::{Codec, JsonCodec};
use crate::error::{HttpClientError, Result};
use crate::execution::executors::RequestExecutor;
use crate::execution::http::interceptor::HttpInterceptor;
use crate::execution::http::path::parse_base_url;
use crate::execution::http::transport::{HttpTransport, ReqwestTransport};
use crate::execution::progress::{ProgressDispatcher, ReqwestSession, TransferSession};
use crate::types::http::HttpConfig;
use crate::types::request::Request;
use crate::utils::cancel::CancelHandle;

/// Typed HTTP client bound to one base URL.
#[derive(Clone)]
pub struct Client {
    executor: Arc<RequestExecutor>,
    tokens: Arc<dyn TokenProvider>,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.executor.base_url.as_str())
            .field("interceptors", &self.executor.interceptors.len())
            .field("refresher", &self.executor.refresher.is_some())
            .finish_non_exhaustive()
    }
}

impl Client {
    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    pub fn base_url(&self) -> &Url {
        self.executor.base_url()
    }

    /// The dispatcher used for requests with a progress sink.
    pub fn progress_dispatcher(&self) -> &Arc<ProgressDispatcher> {
        &self.executor.progress
    }

    /// Send with the configured token provider and no external cancellation.
    pub async fn send<R: Send + 'static>(&self, request: &Request<R>) -> Result<R> {
        self.send_with_cancel(request, &CancelHandle::new()).await
    }

    /// Send, stopping at the next suspension point once `cancel` fires.
    pub async fn send_with_cancel<R: Send + 'static>(
        &self,
        request: &Request<R>,
        cancel: &CancelHandle,
    ) -> Result<R> {
        self.executor.send(request, self.tokens.as_ref(), cancel).await
    }

    /// Send with an explicit access-token supplier for this call.
    pub async fn send_with_token<R: Send + 'static>(
        &self,
        request: &Request<R>,
        tokens: &dyn TokenProvider,
        cancel: &CancelHandle,
    ) -> Result<R> {
        self.executor.send(request, tokens, cancel).await
    }
}

/// Builder for `Client`
#[derive(Default)]
pub struct ClientBuilder {
    base_url: Option<String>,
    config: HttpConfig,
    http_client: Option<reqwest::Client>,
    tokens: Option<Arc<dyn TokenProvider>>,
    refresher: Option<Arc<dyn TokenRefresher>>,
    transport: Option<Arc<dyn HttpTransport>>,
    session: Option<Arc<dyn TransferSession>>,
    interceptors: Vec<Arc<dyn HttpInterceptor>>,
    codec: Option<Arc<dyn Codec>>,
}

impl ClientBuilder {
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn http_config(mut self, config: HttpConfig) -> Self {
        self.config = config;
        self
    }

    /// Use an existing `reqwest::Client` instead of building one from the config.
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http_client = Some(client);
        self
    }

    pub fn token_provider(mut self, tokens: Arc<dyn TokenProvider>) -> Self {
        self.tokens = Some(tokens);
        self
    }

    pub fn token_refresher(mut self, refresher: Arc<dyn TokenRefresher>) -> Self {
        self.refresher = Some(refresher);
        self
    }

    /// Replace the direct-dispatch transport.
    pub fn with_transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Replace the session behind the progress dispatcher.
    pub fn with_transfer_session(mut self, session: Arc<dyn TransferSession>) -> Self {
        self.session = Some(session);
        self
    }

    pub fn with_interceptor(mut self, interceptor: Arc<dyn HttpInterceptor>) -> Self {
        self.interceptors.push(interceptor);
        self
    }

    pub fn codec(mut self, codec: Arc<dyn Codec>) -> Self {
        self.codec = Some(codec);
        self
    }

    pub fn build(self) -> Result<Client> {
        let base_url = self
            .base_url
            .ok_or_else(|| HttpClientError::ConfigurationError("base_url is required".into()))?;
        let base_url = parse_base_url(&base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(HttpClientError::InvalidUrl(format!(
                "base URL cannot carry a path: {base_url}"
            )));
        }

        let http_client = match self.http_client {
            Some(client) => client,
            None => self.config.build_client()?,
        };
        let transport: Arc<dyn HttpTransport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::new(http_client.clone())),
        };
        let session: Arc<dyn TransferSession> = match self.session {
            Some(session) => session,
            None => Arc::new(ReqwestSession::new(http_client)),
        };
        let codec: Arc<dyn Codec> = match self.codec {
            Some(codec) => codec,
            None => Arc::new(JsonCodec::default()),
        };

        let executor = RequestExecutor {
            base_url,
            base_headers: self.config.headers,
            user_agent: self.config.user_agent,
            transport,
            progress: Arc::new(ProgressDispatcher::new(session)),
            codec,
            refresher: self.refresher,
            interceptors: self.interceptors,
        };
        let tokens: Arc<dyn TokenProvider> = match self.tokens {
            Some(tokens) => tokens,
            None => Arc::new(|| None::<String>),
        };

        Ok(Client {
            executor: Arc::new(executor),
            tokens,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_is_required() {
        let err = Client::builder().build().unwrap_err();
        assert!(matches!(err, HttpClientError::ConfigurationError(_)));
    }

    #[test]
    fn malformed_base_url_is_invalid_url() {
        let err = Client::builder().base_url("not a url").build().unwrap_err();
        assert!(matches!(err, HttpClientError::InvalidUrl(_)));

        let err = Client::builder().base_url("mailto:ops@example.com").build().unwrap_err();
        assert!(matches!(err, HttpClientError::InvalidUrl(_)));
    }

    #[tokio::test]
    async fn builds_with_defaults() {
        let client = Client::builder().base_url("https://api.test/v1").build().unwrap();
        assert_eq!(client.base_url().as_str(), "https://api.test/v1");
        assert_eq!(client.progress_dispatcher().in_flight(), 0);
    }
}
