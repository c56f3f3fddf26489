//! Transport capabilities the request lifecycle needs from a web framework.
//!
//! The lifecycle only ever reads the request URI and body and writes one JSON
//! document back. [`AxumTransport`] binds that to axum; [`MemoryTransport`]
//! serves tests and any caller that drives the lifecycle without HTTP.

use std::future::Future;

use axum::{
    body::{Body, Bytes},
    extract::{OriginalUri, Request},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Largest request body buffered by [`AxumTransport`].
pub const DEFAULT_BODY_LIMIT: usize = 2 * 1024 * 1024;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("failed to read request body: {0}")]
    Read(String),

    #[error("request body already consumed")]
    BodyConsumed,

    #[error("response already written")]
    AlreadyWritten,

    #[error("failed to write response: {0}")]
    Write(String),
}

pub trait Transport: Send {
    /// Request target as sent by the client (path and query).
    fn request_uri(&self) -> &str;

    /// Buffer the whole request body. Can only succeed once.
    fn read_body(&mut self) -> impl Future<Output = Result<Bytes, TransportError>> + Send;

    /// Write `body` as an `application/json` response.
    fn write_json(&mut self, status: StatusCode, body: Vec<u8>) -> Result<(), TransportError>;
}

/// Axum binding: wraps the incoming request and collects the response.
#[derive(Debug)]
pub struct AxumTransport {
    uri: String,
    body: Option<Body>,
    body_limit: usize,
    response: Option<Response>,
}

impl AxumTransport {
    pub fn new(req: Request) -> Self {
        // Nested routers strip their prefix from `req.uri()`.
        let uri = req
            .extensions()
            .get::<OriginalUri>()
            .map(|OriginalUri(uri)| uri.clone())
            .unwrap_or_else(|| req.uri().clone());
        let uri = uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| uri.path().to_string());

        Self {
            uri,
            body: Some(req.into_body()),
            body_limit: DEFAULT_BODY_LIMIT,
            response: None,
        }
    }

    pub fn with_body_limit(mut self, limit: usize) -> Self {
        self.body_limit = limit;
        self
    }

    /// The written response, or an empty 200 if nothing was written.
    pub fn into_response(self) -> Response {
        self.response
            .unwrap_or_else(|| StatusCode::OK.into_response())
    }
}

impl Transport for AxumTransport {
    fn request_uri(&self) -> &str {
        &self.uri
    }

    fn read_body(&mut self) -> impl Future<Output = Result<Bytes, TransportError>> + Send {
        let body = self.body.take();
        let limit = self.body_limit;
        async move {
            let body = body.ok_or(TransportError::BodyConsumed)?;
            axum::body::to_bytes(body, limit)
                .await
                .map_err(|e| TransportError::Read(e.to_string()))
        }
    }

    fn write_json(&mut self, status: StatusCode, body: Vec<u8>) -> Result<(), TransportError> {
        if self.response.is_some() {
            return Err(TransportError::AlreadyWritten);
        }
        let response = Response::builder()
            .status(status)
            .header(header::CONTENT_TYPE, "application/json; charset=utf-8")
            .body(Body::from(body))
            .map_err(|e| TransportError::Write(e.to_string()))?;
        self.response = Some(response);
        Ok(())
    }
}

/// In-memory binding with optional injected failures.
#[derive(Debug, Default)]
pub struct MemoryTransport {
    uri: String,
    body: Option<Bytes>,
    fail_read: bool,
    fail_write: bool,
    written: Option<(StatusCode, Vec<u8>)>,
}

impl MemoryTransport {
    pub fn new(uri: impl Into<String>, body: impl Into<Bytes>) -> Self {
        Self {
            uri: uri.into(),
            body: Some(body.into()),
            ..Self::default()
        }
    }

    /// Make `read_body` fail as if the connection broke mid-body.
    pub fn failing_read(mut self) -> Self {
        self.fail_read = true;
        self
    }

    /// Make `write_json` fail as if the client went away.
    pub fn failing_write(mut self) -> Self {
        self.fail_write = true;
        self
    }

    pub fn written(&self) -> Option<(StatusCode, &[u8])> {
        self.written
            .as_ref()
            .map(|(status, body)| (*status, body.as_slice()))
    }
}

impl Transport for MemoryTransport {
    fn request_uri(&self) -> &str {
        &self.uri
    }

    fn read_body(&mut self) -> impl Future<Output = Result<Bytes, TransportError>> + Send {
        let result = if self.fail_read {
            Err(TransportError::Read("connection reset".to_string()))
        } else {
            self.body.take().ok_or(TransportError::BodyConsumed)
        };
        async move { result }
    }

    fn write_json(&mut self, status: StatusCode, body: Vec<u8>) -> Result<(), TransportError> {
        if self.fail_write {
            return Err(TransportError::Write("broken pipe".to_string()));
        }
        if self.written.is_some() {
            return Err(TransportError::AlreadyWritten);
        }
        self.written = Some((status, body));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn axum_transport_reads_body_once() {
        let req = Request::builder()
            .uri("/userserver/user/login?x=1")
            .body(Body::from(r#"{"userId":"u1"}"#))
            .unwrap();
        let mut t = AxumTransport::new(req);

        assert_eq!(t.request_uri(), "/userserver/user/login?x=1");
        assert_eq!(t.read_body().await.unwrap(), Bytes::from_static(br#"{"userId":"u1"}"#));
        assert_eq!(t.read_body().await.unwrap_err(), TransportError::BodyConsumed);
    }

    #[tokio::test]
    async fn axum_transport_prefers_original_uri() {
        let mut req = Request::builder().uri("/login").body(Body::empty()).unwrap();
        req.extensions_mut()
            .insert(OriginalUri("/userserver/user/login".parse().unwrap()));

        assert_eq!(AxumTransport::new(req).request_uri(), "/userserver/user/login");
    }

    #[tokio::test]
    async fn axum_transport_enforces_body_limit() {
        let req = Request::builder().uri("/").body(Body::from(vec![b'x'; 64])).unwrap();
        let mut t = AxumTransport::new(req).with_body_limit(16);

        assert!(matches!(t.read_body().await, Err(TransportError::Read(_))));
    }

    #[test]
    fn axum_transport_writes_json_once() {
        let req = Request::builder().uri("/").body(Body::empty()).unwrap();
        let mut t = AxumTransport::new(req);

        t.write_json(StatusCode::OK, b"{}".to_vec()).unwrap();
        assert_eq!(
            t.write_json(StatusCode::OK, b"{}".to_vec()).unwrap_err(),
            TransportError::AlreadyWritten
        );

        let resp = t.into_response();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json; charset=utf-8"
        );
    }

    #[test]
    fn unwritten_axum_transport_still_answers_200() {
        let req = Request::builder().uri("/").body(Body::empty()).unwrap();
        assert_eq!(AxumTransport::new(req).into_response().status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn memory_transport_injects_failures() {
        let mut t = MemoryTransport::new("/x", "body").failing_read().failing_write();
        assert!(matches!(t.read_body().await, Err(TransportError::Read(_))));
        assert!(matches!(t.write_json(StatusCode::OK, vec![]), Err(TransportError::Write(_))));
        assert!(t.written().is_none());
    }
}
