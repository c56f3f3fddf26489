//! HTTP API: request lifecycle, envelope, routing and wiring.

pub mod app;
pub mod config;
pub mod context;
pub mod envelope;
pub mod lifecycle;
pub mod middleware;
pub mod transport;

pub use app::{AppState, build_app, with_recovery};
pub use config::{Config, ConfigError};
pub use envelope::{ResponseEnvelope, WireEnvelope};
pub use lifecycle::RequestLifecycle;
pub use transport::{AxumTransport, MemoryTransport, Transport, TransportError};
