//! Request, response and configuration types.

pub mod http;
pub mod request;
pub mod response;

pub use http::{HttpConfig, HttpConfigBuilder, UserAgentConfig};
pub use request::{
    Body, BodyStream, EmptyBodyHandler, ErrorDecoder, HttpMethod, Request, ResponseDecoder,
    StreamSource,
};
pub use response::{DataResponse, FromHttpResponse, NoContent, StatusResponse};
