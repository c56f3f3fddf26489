//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: the user directory behind the account endpoints
//! - `routes/`: HTTP routes + handlers (one file per account flavour)
//! - `dto.rs`: request/response bodies
//! - `errors.rs`: mapping collaborator failures onto the envelope

use std::sync::Arc;

use axum::{Extension, Router, routing::get};
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;

use userserver_auth::{Hs256Tokens, TokenIssuer, TokenVerifier};

use crate::config::Config;
use crate::lifecycle::RequestLifecycle;
use crate::middleware;
use crate::transport::Transport;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Collaborators shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub verifier: Arc<dyn TokenVerifier>,
    pub issuer: Arc<dyn TokenIssuer>,
    pub users: Arc<dyn services::UserDirectory>,

    /// Cancelled when the server starts shutting down.
    pub shutdown: CancellationToken,
}

impl AppState {
    /// Wire HS256 tokens and an in-memory user directory from `config`.
    pub fn from_config(config: &Config, shutdown: CancellationToken) -> Self {
        let tokens = Arc::new(
            Hs256Tokens::new(&config.user_token_secret, &config.server_token_secret)
                .with_ttls(config.user_token_ttl, config.server_token_ttl)
                .with_clock_skew(config.token_clock_skew),
        );
        Self {
            verifier: tokens.clone(),
            issuer: tokens,
            users: Arc::new(services::InMemoryUserDirectory::new()),
            shutdown,
        }
    }

    /// Prepare the lifecycle for a request arriving on `transport`.
    pub async fn begin<T: Transport>(&self, transport: &mut T) -> RequestLifecycle {
        RequestLifecycle::prepare(
            transport,
            self.verifier.clone(),
            self.shutdown.child_token(),
        )
        .await
    }
}

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub fn build_app(state: AppState) -> Router {
    let app = Router::new()
        .route("/health", get(routes::system::health))
        .nest("/userserver", routes::router())
        .layer(Extension(state));
    with_recovery(app)
}

/// Wrap `router` so a panicking handler is logged and answered with a 500.
///
/// Layers only cover routes already present, so apply this last.
pub fn with_recovery(router: Router) -> Router {
    router.layer(ServiceBuilder::new().layer(CatchPanicLayer::custom(middleware::handle_panic)))
}
