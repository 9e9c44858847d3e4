//! Declarative request description.
//!
//! A `Request<R>` carries everything the executor needs to build, dispatch,
//! retry and decode one logical call. Response-type behavior (decoding,
//! empty-body handling, error decoding) is stored as function-valued fields
//! so callers can swap strategies per request.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use futures::Stream;
use reqwest::header::HeaderMap;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::encoding::Codec;
use crate::error::{HttpClientError, Result};
use crate::execution::http::transport::HttpTransportResponse;
use crate::execution::multipart::MultipartPayload;
use crate::execution::progress::ProgressSink;
use crate::retry::RetryPolicy;
use crate::types::response::FromHttpResponse;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Head,
    Options,
    Trace,
    Connect,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Patch => "PATCH",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
            Self::Trace => "TRACE",
            Self::Connect => "CONNECT",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Head => reqwest::Method::HEAD,
            HttpMethod::Options => reqwest::Method::OPTIONS,
            HttpMethod::Trace => reqwest::Method::TRACE,
            HttpMethod::Connect => reqwest::Method::CONNECT,
        }
    }
}

/// A chunked request body.
pub type BodyStream = Pin<Box<dyn Stream<Item = std::io::Result<Bytes>> + Send + Sync>>;

/// Re-openable source for streamed bodies.
///
/// Streams are consumed by a single dispatch, so the source is a factory that
/// the executor calls again for every attempt (retry or post-refresh resend).
#[derive(Clone)]
pub struct StreamSource(Arc<dyn Fn() -> BodyStream + Send + Sync>);

impl StreamSource {
    pub fn new<F>(open: F) -> Self
    where
        F: Fn() -> BodyStream + Send + Sync + 'static,
    {
        Self(Arc::new(open))
    }

    /// A source replaying fixed chunks; handy for tests and small uploads.
    pub fn from_chunks(chunks: Vec<Bytes>) -> Self {
        Self::new(move || {
            let items: Vec<std::io::Result<Bytes>> = chunks.iter().cloned().map(Ok).collect();
            Box::pin(futures::stream::iter(items))
        })
    }

    pub fn open(&self) -> BodyStream {
        (self.0)()
    }
}

impl fmt::Debug for StreamSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("StreamSource")
    }
}

/// Typed request body.
#[derive(Debug, Clone)]
pub enum Body {
    /// Value serialized by the request codec; Content-Type comes from the request.
    Encodable { value: serde_json::Value },
    /// Bytes passed through untouched.
    Raw { bytes: Bytes, content_type: String },
    /// Streamed upload with no known length.
    Stream {
        source: StreamSource,
        content_type: String,
    },
    /// `key=value` pairs joined with `&`, percent-encoded.
    FormUrlEncoded(BTreeMap<String, String>),
}

impl Body {
    /// Encodable body from any serializable value.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self> {
        let value = serde_json::to_value(value)
            .map_err(|e| HttpClientError::InvalidEncoding(e.to_string()))?;
        Ok(Self::Encodable { value })
    }

    pub fn raw(bytes: impl Into<Bytes>, content_type: impl Into<String>) -> Self {
        Self::Raw {
            bytes: bytes.into(),
            content_type: content_type.into(),
        }
    }

    pub fn stream(source: StreamSource, content_type: impl Into<String>) -> Self {
        Self::Stream {
            source,
            content_type: content_type.into(),
        }
    }

    pub fn form<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self::FormUrlEncoded(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Whether the materialized body has a length known up front.
    pub fn has_known_length(&self) -> bool {
        !matches!(self, Self::Stream { .. })
    }
}

/// Decodes a non-empty success response.
pub type ResponseDecoder<R> =
    Arc<dyn Fn(&HttpTransportResponse, &dyn Codec) -> Result<R> + Send + Sync>;

/// Synthesizes a response from status and headers when the body is empty.
pub type EmptyBodyHandler<R> = Arc<dyn Fn(u16, &HeaderMap) -> Result<R> + Send + Sync>;

/// Turns an error body into a domain error, if it recognizes one.
pub type ErrorDecoder = Arc<dyn Fn(&[u8]) -> Option<HttpClientError> + Send + Sync>;

/// One logical HTTP call and the policies that govern it.
pub struct Request<R> {
    pub path: String,
    pub method: HttpMethod,
    pub headers: HashMap<String, String>,
    pub query: BTreeMap<String, String>,
    /// Declared content type; also the Content-Type of encodable bodies.
    pub content_type: String,
    pub body: Option<Body>,
    /// Mutually exclusive with `body`.
    pub multipart: Option<MultipartPayload>,
    pub progress: Option<Arc<dyn ProgressSink>>,
    pub retry_policy: RetryPolicy,
    pub error_decoder: Option<ErrorDecoder>,
    /// Enables the single 401 refresh-and-resend cycle.
    pub allows_retry: bool,
    pub empty_body_handler: Option<EmptyBodyHandler<R>>,
    /// Overrides the client codec for this request.
    pub codec: Option<Arc<dyn Codec>>,
    pub decoder: ResponseDecoder<R>,
}

impl<R: DeserializeOwned + Send + 'static> Request<R> {
    /// Request whose success body is decoded with the codec into `R`.
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self::with_decoder(
            method,
            path,
            Arc::new(|response: &HttpTransportResponse, codec: &dyn Codec| -> Result<R> {
                let value = codec.decode(&response.body)?;
                serde_json::from_value(value).map_err(|e| HttpClientError::DecodeError(e.to_string()))
            }),
        )
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, path)
    }
}

impl<R: FromHttpResponse> Request<R> {
    /// Request for a response type that reads status/headers/bytes directly.
    pub fn for_response(method: HttpMethod, path: impl Into<String>) -> Self {
        let mut request = Self::with_decoder(
            method,
            path,
            Arc::new(
                |response: &HttpTransportResponse, _codec: &dyn Codec| -> Result<R> {
                    R::from_response(response)
                },
            ),
        );
        request.empty_body_handler = R::empty_body_handler();
        request
    }
}

impl<R> Request<R> {
    pub fn with_decoder(method: HttpMethod, path: impl Into<String>, decoder: ResponseDecoder<R>) -> Self {
        Self {
            path: path.into(),
            method,
            headers: HashMap::new(),
            query: BTreeMap::new(),
            content_type: crate::defaults::http::CONTENT_TYPE.to_string(),
            body: None,
            multipart: None,
            progress: None,
            retry_policy: RetryPolicy::none(),
            error_decoder: None,
            allows_retry: true,
            empty_body_handler: None,
            codec: None,
            decoder,
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(name.into(), value.into());
        self
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    pub fn with_body(mut self, body: Body) -> Self {
        self.body = Some(body);
        self
    }

    /// Serialize `value` as the body; fails with `InvalidEncoding`.
    pub fn with_json<T: Serialize + ?Sized>(self, value: &T) -> Result<Self> {
        Ok(self.with_body(Body::json(value)?))
    }

    pub fn with_multipart(mut self, payload: MultipartPayload) -> Self {
        self.multipart = Some(payload);
        self
    }

    pub fn with_progress(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.progress = Some(sink);
        self
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    pub fn with_error_decoder<F>(mut self, decoder: F) -> Self
    where
        F: Fn(&[u8]) -> Option<HttpClientError> + Send + Sync + 'static,
    {
        self.error_decoder = Some(Arc::new(decoder));
        self
    }

    pub fn with_allows_retry(mut self, allows_retry: bool) -> Self {
        self.allows_retry = allows_retry;
        self
    }

    pub fn with_empty_body_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(u16, &HeaderMap) -> Result<R> + Send + Sync + 'static,
    {
        self.empty_body_handler = Some(Arc::new(handler));
        self
    }

    pub fn with_codec(mut self, codec: Arc<dyn Codec>) -> Self {
        self.codec = Some(codec);
        self
    }
}

impl<R> Clone for Request<R> {
    fn clone(&self) -> Self {
        Self {
            path: self.path.clone(),
            method: self.method,
            headers: self.headers.clone(),
            query: self.query.clone(),
            content_type: self.content_type.clone(),
            body: self.body.clone(),
            multipart: self.multipart.clone(),
            progress: self.progress.clone(),
            retry_policy: self.retry_policy.clone(),
            error_decoder: self.error_decoder.clone(),
            allows_retry: self.allows_retry,
            empty_body_handler: self.empty_body_handler.clone(),
            codec: self.codec.clone(),
            decoder: self.decoder.clone(),
        }
    }
}

impl<R> fmt::Debug for Request<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("query", &self.query)
            .field("content_type", &self.content_type)
            .field("body", &self.body)
            .field("multipart", &self.multipart.as_ref().map(|m| m.boundary()))
            .field("progress", &self.progress.is_some())
            .field("retry_policy", &self.retry_policy)
            .field("allows_retry", &self.allows_retry)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::response::StatusResponse;

    #[derive(Debug, serde::Deserialize)]
    struct User {
        #[allow(dead_code)]
        id: u64,
    }

    #[test]
    fn new_request_has_json_defaults() {
        let req = Request::<User>::get("/users/1");
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.content_type, "application/json");
        assert!(req.allows_retry);
        assert_eq!(req.retry_policy.max_retry_count, 0);
        assert!(req.empty_body_handler.is_none());
    }

    #[test]
    fn status_response_requests_carry_empty_body_handler() {
        let req = Request::<StatusResponse>::for_response(HttpMethod::Delete, "/users/1");
        assert!(req.empty_body_handler.is_some());
    }

    #[test]
    fn form_body_collects_pairs_in_key_order() {
        let body = Body::form([("b", "2"), ("a", "1")]);
        match body {
            Body::FormUrlEncoded(map) => {
                let keys: Vec<_> = map.keys().cloned().collect();
                assert_eq!(keys, vec!["a".to_string(), "b".to_string()]);
            }
            other => panic!("unexpected body: {other:?}"),
        }
    }

    #[test]
    fn stream_body_has_no_known_length() {
        let body = Body::stream(StreamSource::from_chunks(vec![Bytes::from_static(b"x")]), "text/plain");
        assert!(!body.has_known_length());
        assert!(Body::raw(vec![1u8, 2], "application/octet-stream").has_known_length());
    }

    #[test]
    fn method_maps_to_reqwest() {
        assert_eq!(reqwest::Method::from(HttpMethod::Patch), reqwest::Method::PATCH);
        assert_eq!(HttpMethod::Options.to_string(), "OPTIONS");
    }
}
