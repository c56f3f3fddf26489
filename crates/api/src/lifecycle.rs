//! Per-request lifecycle: `prepare` before the handler, `finish` after it.
//!
//! Every envelope endpoint follows the same shape:
//!
//! ```ignore
//! let mut transport = AxumTransport::new(req);
//! let mut lc = RequestLifecycle::prepare(&mut transport, verifier, cancel).await;
//! // ... parse params, check tokens, set data or an error code ...
//! lc.finish(&mut transport);
//! transport.into_response()
//! ```

use std::sync::Arc;
use std::time::Instant;

use axum::{body::Bytes, http::StatusCode};
use chrono::Utc;
use serde::{Serialize, de::DeserializeOwned};
use tokio_util::sync::CancellationToken;
use tracing::{Span, error, info, info_span, warn};

use userserver_auth::{AuthzError, TokenVerifier, check_token};
use userserver_core::{ErrorCode, RequestId};

use crate::context::{RequestContext, RequestScope};
use crate::envelope::ResponseEnvelope;
use crate::transport::Transport;

/// Handling unit for one request: owns its context, envelope and log span.
pub struct RequestLifecycle {
    ctx: RequestContext,
    scope: RequestScope,
    resp: ResponseEnvelope,
    server_token: Option<String>,
    verifier: Arc<dyn TokenVerifier>,
    span: Span,
}

impl RequestLifecycle {
    /// Start handling a request.
    ///
    /// A body that cannot be read is treated as empty; the failure is logged
    /// and the request carries on.
    pub async fn prepare<T: Transport>(
        transport: &mut T,
        verifier: Arc<dyn TokenVerifier>,
        cancel: CancellationToken,
    ) -> Self {
        let started = Instant::now();
        let request_id = RequestId::new();
        let url = transport.request_uri().to_string();
        let span = info_span!("request", request_id = %request_id, url = %url);

        let params = match transport.read_body().await {
            Ok(body) => body,
            Err(e) => {
                span.in_scope(|| warn!(error = %e, "request body unreadable; treating as empty"));
                Bytes::new()
            }
        };

        let ctx = RequestContext::new(request_id, url, params).started(started);
        let scope = RequestScope::new(&ctx, cancel);
        let resp = ResponseEnvelope::new(request_id.to_string());

        span.in_scope(|| {
            info!(
                request_id = %ctx.request_id(),
                url = %ctx.url(),
                params = %String::from_utf8_lossy(ctx.params()),
                "request received"
            )
        });

        Self {
            ctx,
            scope,
            resp,
            server_token: None,
            verifier,
            span,
        }
    }

    pub fn context(&self) -> &RequestContext {
        &self.ctx
    }

    pub fn scope(&self) -> &RequestScope {
        &self.scope
    }

    pub fn envelope(&self) -> &ResponseEnvelope {
        &self.resp
    }

    pub fn envelope_mut(&mut self) -> &mut ResponseEnvelope {
        &mut self.resp
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    /// Mark this request as coming from a trusted backend.
    ///
    /// An empty token counts as absent.
    pub fn set_server_token(&mut self, token: Option<String>) {
        self.server_token = token.filter(|t| !t.is_empty());
    }

    pub fn server_token(&self) -> Option<&str> {
        self.server_token.as_deref()
    }

    /// Decode the buffered body as `P`.
    ///
    /// On failure the envelope carries [`ErrorCode::ParamsParse`] and `None`
    /// is returned.
    pub fn parse_params<P: DeserializeOwned>(&mut self) -> Option<P> {
        match serde_json::from_slice(self.ctx.params()) {
            Ok(params) => Some(params),
            Err(e) => {
                self.span
                    .in_scope(|| warn!(error = %e, "request params rejected"));
                self.resp.set_error(ErrorCode::ParamsParse);
                None
            }
        }
    }

    /// Authorization gate for the current request.
    ///
    /// With a server token set, only that token is verified. Otherwise
    /// `token` must verify and belong to `user_id`. Failures are written to
    /// the envelope before being returned.
    pub fn check_token(&mut self, user_id: &str, token: &str) -> Result<(), AuthzError> {
        let result = check_token(
            self.verifier.as_ref(),
            self.server_token.as_deref(),
            user_id,
            token,
            Utc::now(),
        );
        if let Err(e) = &result {
            self.span.in_scope(|| {
                warn!(
                    error = %e,
                    cause = ?std::error::Error::source(e).map(ToString::to_string),
                    server = self.server_token.is_some(),
                    "authorization rejected"
                )
            });
            self.resp.set_error_with(e.code(), e.message());
        }
        result
    }

    pub fn fail(&mut self, code: ErrorCode) {
        self.resp.set_error(code);
    }

    /// Attach the response payload. A payload that cannot be serialized is
    /// logged and left as `null`.
    pub fn set_data<D: Serialize>(&mut self, data: &D) {
        if let Err(e) = self.resp.set_data(data) {
            self.span
                .in_scope(|| error!(error = %e, "response data not serializable"));
        }
    }

    /// Finalize the envelope and write it with HTTP 200.
    ///
    /// Consumes the lifecycle so the envelope is finalized exactly once.
    /// Serialization and write failures are logged, never returned.
    pub fn finish<T: Transport>(mut self, transport: &mut T) {
        self.resp.finalize(self.ctx.elapsed());
        let _enter = self.span.enter();
        let url = self.ctx.url();

        let body = match serde_json::to_vec(&self.resp.to_wire()) {
            Ok(body) => body,
            Err(e) => {
                error!(
                    request_id = %self.resp.request_id(),
                    url = %url,
                    error = %e,
                    "response serialization failed"
                );
                return;
            }
        };
        let logged = String::from_utf8_lossy(&body).into_owned();

        if let Err(e) = transport.write_json(StatusCode::OK, body) {
            error!(
                request_id = %self.resp.request_id(),
                url = %url,
                error = %e,
                "response write failed"
            );
        }
        info!(url = %url, response = %logged, "response data");
    }
}
