//! HTTP transport abstraction.
//!
//! The executor hands a fully built wire request to an `HttpTransport` and
//! gets back status, headers and the collected body. The default transport
//! is `reqwest`; tests and embedders can inject their own to observe the
//! final URL/headers/body or return synthetic responses.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::HeaderMap;
use reqwest::Url;

use crate::error::Result;
use crate::types::request::{HttpMethod, StreamSource};

/// Body of a wire request.
#[derive(Debug, Clone, Default)]
pub enum WireBody {
    #[default]
    Empty,
    Bytes(Bytes),
    /// Opened anew for each dispatch.
    Stream(StreamSource),
}

impl WireBody {
    pub fn len(&self) -> Option<u64> {
        match self {
            Self::Empty => Some(0),
            Self::Bytes(bytes) => Some(bytes.len() as u64),
            Self::Stream(_) => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == Some(0)
    }

    /// Convert into a `reqwest::Body`, opening stream sources.
    pub fn into_reqwest(self) -> Option<reqwest::Body> {
        match self {
            Self::Empty => None,
            Self::Bytes(bytes) => Some(reqwest::Body::from(bytes)),
            Self::Stream(source) => Some(reqwest::Body::wrap_stream(source.open())),
        }
    }
}

/// Transport-level request data.
#[derive(Debug, Clone)]
pub struct HttpTransportRequest {
    pub method: HttpMethod,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: WireBody,
    /// Known body length; `None` for streamed uploads.
    pub content_length: Option<u64>,
}

/// Transport-level response data.
#[derive(Debug, Clone)]
pub struct HttpTransportResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl HttpTransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends one wire request and collects the full response.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: HttpTransportRequest) -> Result<HttpTransportResponse>;
}

/// `reqwest`-backed transport.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }
}

/// Build a `reqwest::RequestBuilder` from a wire request.
pub(crate) fn to_reqwest(client: &reqwest::Client, request: HttpTransportRequest) -> reqwest::RequestBuilder {
    let mut builder = client
        .request(request.method.into(), request.url)
        .headers(request.headers);
    if let Some(body) = request.body.into_reqwest() {
        builder = builder.body(body);
    }
    builder
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpTransportRequest) -> Result<HttpTransportResponse> {
        let response = to_reqwest(&self.client, request).send().await?;
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response.bytes().await?;
        Ok(HttpTransportResponse {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_body_lengths() {
        assert_eq!(WireBody::Empty.len(), Some(0));
        assert_eq!(WireBody::Bytes(Bytes::from_static(b"abc")).len(), Some(3));
        let stream = WireBody::Stream(StreamSource::from_chunks(vec![Bytes::from_static(b"x")]));
        assert_eq!(stream.len(), None);
        assert!(!stream.is_empty());
    }

    #[tokio::test]
    async fn reqwest_transport_collects_response() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("PUT", "/items/1")
            .match_header("x-test", "1")
            .match_body("payload")
            .with_status(201)
            .with_header("x-server", "mock")
            .with_body("created")
            .create_async()
            .await;

        let mut headers = HeaderMap::new();
        headers.insert("x-test", "1".parse().unwrap());
        let transport = ReqwestTransport::new(reqwest::Client::new());
        let response = transport
            .send(HttpTransportRequest {
                method: HttpMethod::Put,
                url: Url::parse(&format!("{}/items/1", server.url())).unwrap(),
                headers,
                body: WireBody::Bytes(Bytes::from_static(b"payload")),
                content_length: Some(7),
            })
            .await
            .unwrap();

        assert_eq!(response.status, 201);
        assert!(response.is_success());
        assert_eq!(response.headers.get("x-server").unwrap(), "mock");
        assert_eq!(&response.body[..], b"created");
    }
}
