//! In-chain response.
//!
//! # Responsibilities
//! - Collect status and headers set by successive handlers
//! - Terminate with a complete body or a byte stream
//! - Convert into an axum response at the chain boundary
//!
//! # Design Decisions
//! - Nothing is sent until the chain returns, so the error path can still
//!   replace a response a failing stage had started to shape
//! - Invalid header values are logged and skipped rather than panicking

use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use bytes::{Bytes, BytesMut};
use futures_util::stream::{BoxStream, StreamExt};
use std::sync::Arc;

use crate::error::SsrError;

/// Streamed document body. An `Err` item aborts the response.
pub type BodyStream = BoxStream<'static, Result<Bytes, Arc<SsrError>>>;

/// Body of an [`SsrResponse`].
pub enum ResponseBody {
    Empty,
    Full(Bytes),
    Stream(BodyStream),
}

impl std::fmt::Debug for ResponseBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResponseBody::Empty => f.write_str("Empty"),
            ResponseBody::Full(bytes) => f.debug_tuple("Full").field(&bytes.len()).finish(),
            ResponseBody::Stream(_) => f.write_str("Stream"),
        }
    }
}

/// Response being assembled by the handler chain.
#[derive(Debug)]
pub struct SsrResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: ResponseBody,
    ended: bool,
}

impl Default for SsrResponse {
    fn default() -> Self {
        Self::new()
    }
}

impl SsrResponse {
    pub fn new() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: ResponseBody::Empty,
            ended: false,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn header(&self, name: HeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Set a header, replacing any previous value.
    pub fn set_header(&mut self, name: HeaderName, value: &str) {
        match HeaderValue::from_str(value) {
            Ok(value) => {
                self.headers.insert(name, value);
            }
            Err(_) => {
                tracing::warn!(header = %name, "Dropping invalid header value");
            }
        }
    }

    pub fn set_content_type(&mut self, content_type: &str) {
        self.set_header(header::CONTENT_TYPE, content_type);
    }

    /// Write the complete body and terminate.
    pub fn end(&mut self, body: impl Into<Bytes>) {
        self.body = ResponseBody::Full(body.into());
        self.ended = true;
    }

    /// Attach a streamed body and terminate.
    pub fn stream(&mut self, body: BodyStream) {
        self.body = ResponseBody::Stream(body);
        self.ended = true;
    }

    /// Whether a handler has terminated the response.
    pub fn is_ended(&self) -> bool {
        self.ended
    }

    /// Drop everything set so far. Used before writing an error page.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Drain the body into memory. Stops at the first stream error.
    pub async fn into_bytes(self) -> Result<Bytes, Arc<SsrError>> {
        match self.body {
            ResponseBody::Empty => Ok(Bytes::new()),
            ResponseBody::Full(bytes) => Ok(bytes),
            ResponseBody::Stream(mut stream) => {
                let mut buf = BytesMut::new();
                while let Some(chunk) = stream.next().await {
                    buf.extend_from_slice(&chunk?);
                }
                Ok(buf.freeze())
            }
        }
    }
}

impl IntoResponse for SsrResponse {
    fn into_response(self) -> Response {
        let body = match self.body {
            ResponseBody::Empty => Body::empty(),
            ResponseBody::Full(bytes) => Body::from(bytes),
            ResponseBody::Stream(stream) => Body::from_stream(stream),
        };
        let mut response = Response::new(body);
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}
