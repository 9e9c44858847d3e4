//! wirecall
//!
//! Typed HTTP request execution: declarative requests, body and multipart
//! encoding, header composition, retry with backoff, a single token refresh
//! after a 401, and progress-tracked transfers over a shared connection pool.
#![deny(unsafe_code)]

pub mod auth;
pub mod client;
pub mod defaults;
pub mod encoding;
pub mod error;
pub mod execution;
pub mod retry;
pub mod types;
pub mod utils;

pub use auth::{SharedTokenProvider, StaticTokenProvider, TokenProvider, TokenRefresher};
pub use client::{Client, ClientBuilder};
pub use encoding::{Codec, JsonCodec, KeyStrategy};
pub use error::{HttpClientError, Result};
pub use execution::http::interceptor::{HttpInterceptor, HttpRequestContext, LoggingInterceptor};
pub use execution::http::transport::{
    HttpTransport, HttpTransportRequest, HttpTransportResponse, ReqwestTransport, WireBody,
};
pub use execution::multipart::{MultipartPayload, Part};
pub use execution::progress::{ProgressDispatcher, ProgressSink, TransferProgress};
pub use retry::RetryPolicy;
pub use types::{
    Body, DataResponse, FromHttpResponse, HttpConfig, HttpMethod, NoContent, Request,
    StatusResponse, StreamSource, UserAgentConfig,
};
pub use utils::cancel::CancelHandle;
