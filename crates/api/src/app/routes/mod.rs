use axum::Router;

pub mod common;
pub mod miniuser;
pub mod system;
pub mod user;

/// Router for all envelope endpoints (mounted under `/userserver`).
pub fn router() -> Router {
    Router::new()
        .nest("/user", user::router())
        .nest("/miniuser", miniuser::router())
}
