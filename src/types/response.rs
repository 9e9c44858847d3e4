//! Response types that read the transport response directly.

use std::sync::Arc;

use bytes::Bytes;
use reqwest::header::HeaderMap;

use crate::error::Result;
use crate::execution::http::transport::HttpTransportResponse;
use crate::types::request::EmptyBodyHandler;

/// Response types built from status, headers and raw bytes rather than a codec.
pub trait FromHttpResponse: Sized + Send + 'static {
    fn from_response(response: &HttpTransportResponse) -> Result<Self>;

    /// Default handler used when a success response has no body.
    fn empty_body_handler() -> Option<EmptyBodyHandler<Self>> {
        None
    }
}

/// Status and headers only.
#[derive(Debug, Clone)]
pub struct StatusResponse {
    pub status: u16,
    pub headers: HeaderMap,
}

impl FromHttpResponse for StatusResponse {
    fn from_response(response: &HttpTransportResponse) -> Result<Self> {
        Ok(Self {
            status: response.status,
            headers: response.headers.clone(),
        })
    }

    fn empty_body_handler() -> Option<EmptyBodyHandler<Self>> {
        Some(Arc::new(|status: u16, headers: &HeaderMap| -> Result<Self> {
            Ok(Self {
                status,
                headers: headers.clone(),
            })
        }))
    }
}

/// "No content" marker; any body is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoContent;

impl FromHttpResponse for NoContent {
    fn from_response(_response: &HttpTransportResponse) -> Result<Self> {
        Ok(Self)
    }

    fn empty_body_handler() -> Option<EmptyBodyHandler<Self>> {
        Some(Arc::new(|_status: u16, _headers: &HeaderMap| -> Result<Self> {
            Ok(Self)
        }))
    }
}

/// Raw payload with its status and headers.
///
/// Has no empty-body handler: an empty success body surfaces as `EmptyResponse`.
#[derive(Debug, Clone)]
pub struct DataResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl FromHttpResponse for DataResponse {
    fn from_response(response: &HttpTransportResponse) -> Result<Self> {
        Ok(Self {
            status: response.status,
            headers: response.headers.clone(),
            body: response.body.clone(),
        })
    }
}
