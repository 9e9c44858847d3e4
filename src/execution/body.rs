//! Body materialization.
//!
//! Turns a typed `Body` (or a multipart payload) into wire bytes or a stream,
//! the Content-Type header value, and the length when it is known up front.

use bytes::Bytes;

use crate::encoding::Codec;
use crate::error::{HttpClientError, Result};
use crate::execution::http::transport::WireBody;
use crate::execution::multipart::MultipartPayload;
use crate::types::request::Body;

/// Content type forced onto form bodies.
pub const FORM_URLENCODED: &str = crate::defaults::http::FORM_CONTENT_TYPE;

/// A body ready for the wire.
#[derive(Debug, Clone)]
pub struct MaterializedBody {
    pub body: WireBody,
    pub content_type: String,
    /// `None` for streams.
    pub content_length: Option<u64>,
    /// Replaces any caller-supplied Content-Type (form and multipart bodies).
    pub content_type_forced: bool,
}

impl MaterializedBody {
    fn from_bytes(bytes: impl Into<Bytes>, content_type: impl Into<String>) -> Self {
        let bytes = bytes.into();
        Self {
            content_length: Some(bytes.len() as u64),
            body: WireBody::Bytes(bytes),
            content_type: content_type.into(),
            content_type_forced: false,
        }
    }

    fn forced(mut self) -> Self {
        self.content_type_forced = true;
        self
    }
}

/// Materialize `body`.
///
/// Encodable bodies take the request's declared content type; raw and
/// stream bodies keep their own; form bodies are always
/// `application/x-www-form-urlencoded`.
pub fn materialize(body: &Body, request_content_type: &str, codec: &dyn Codec) -> Result<MaterializedBody> {
    match body {
        Body::Encodable { value } => {
            let bytes = codec.encode(value).map_err(|e| match e {
                HttpClientError::InvalidEncoding(_) => e,
                other => HttpClientError::InvalidEncoding(other.to_string()),
            })?;
            Ok(MaterializedBody::from_bytes(bytes, request_content_type))
        }
        Body::Raw {
            bytes,
            content_type,
        } => Ok(MaterializedBody::from_bytes(bytes.clone(), content_type.as_str())),
        Body::Stream {
            source,
            content_type,
        } => Ok(MaterializedBody {
            body: WireBody::Stream(source.clone()),
            content_type: content_type.clone(),
            content_length: None,
            content_type_forced: false,
        }),
        Body::FormUrlEncoded(pairs) => {
            let encoded = encode_form(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())));
            Ok(MaterializedBody::from_bytes(encoded, FORM_URLENCODED).forced())
        }
    }
}

/// Materialize a multipart payload.
pub fn materialize_multipart(payload: &MultipartPayload) -> Result<MaterializedBody> {
    let bytes = payload.encode()?;
    Ok(MaterializedBody::from_bytes(bytes, payload.content_type()).forced())
}

/// Materialize whichever of body/multipart is set.
///
/// Both set is a construction error; neither set yields `None`.
pub fn materialize_request_body(
    body: Option<&Body>,
    multipart: Option<&MultipartPayload>,
    request_content_type: &str,
    codec: &dyn Codec,
) -> Result<Option<MaterializedBody>> {
    match (body, multipart) {
        (Some(_), Some(_)) => Err(HttpClientError::ConflictingBodyTypes),
        (Some(body), None) => materialize(body, request_content_type, codec).map(Some),
        (None, Some(payload)) => materialize_multipart(payload).map(Some),
        (None, None) => Ok(None),
    }
}

/// Percent-encode each pair and join with `&`. Spaces become `%20`.
pub fn encode_form<'a, I>(pairs: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    pairs
        .into_iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}
