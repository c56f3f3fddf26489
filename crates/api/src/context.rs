use std::time::Instant;

use axum::body::Bytes;
use tokio_util::sync::CancellationToken;

use userserver_core::RequestId;

/// What the lifecycle captured about a request before any handler ran.
///
/// This is immutable once built and dropped with the request.
#[derive(Debug, Clone)]
pub struct RequestContext {
    request_id: RequestId,
    url: String,
    params: Bytes,
    started: Instant,
}

impl RequestContext {
    pub fn new(request_id: RequestId, url: impl Into<String>, params: Bytes) -> Self {
        Self {
            request_id,
            url: url.into(),
            params,
            started: Instant::now(),
        }
    }

    /// Count elapsed time from `started` rather than from construction.
    pub(crate) fn started(mut self, started: Instant) -> Self {
        self.started = started;
        self
    }

    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Raw request body; empty if reading it failed.
    pub fn params(&self) -> &[u8] {
        &self.params
    }

    pub fn elapsed(&self) -> std::time::Duration {
        self.started.elapsed()
    }
}

/// Request-scoped values plus a cancellation signal, handed to collaborators.
///
/// The token is a child of the server's shutdown token, so it fires when the
/// process begins shutting down.
#[derive(Debug, Clone)]
pub struct RequestScope {
    request_id: RequestId,
    url: String,
    cancel: CancellationToken,
}

impl RequestScope {
    pub fn new(ctx: &RequestContext, cancel: CancellationToken) -> Self {
        Self {
            request_id: ctx.request_id(),
            url: ctx.url().to_string(),
            cancel,
        }
    }

    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}
