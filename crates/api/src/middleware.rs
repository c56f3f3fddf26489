//! Transport-level middleware shared by every route.

use std::any::Any;
use std::backtrace::Backtrace;

use axum::{
    body::Body,
    http::{Response, StatusCode},
};

/// Route panic reports through `tracing`, with location and a backtrace.
///
/// The payload alone says little about where a handler blew up; the hook runs
/// on the panicking thread before unwinding, so the stack is still intact.
pub fn install_panic_hook() {
    std::panic::set_hook(Box::new(|info| {
        let backtrace = Backtrace::force_capture();
        tracing::error!(panic = %info, backtrace = %backtrace, "panic");
    }));
}

/// Panic handler for `CatchPanicLayer`.
///
/// The panic is logged at error level and the client gets a bare 500: no
/// envelope exists at this point to report it through. The stack trace comes
/// from [`install_panic_hook`], which logs before unwinding reaches here.
pub fn handle_panic(payload: Box<dyn Any + Send + 'static>) -> Response<Body> {
    let detail = if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else {
        "unknown panic payload"
    };
    tracing::error!(panic = %detail, "handler panicked");

    Response::builder()
        .status(StatusCode::INTERNAL_SERVER_ERROR)
        .body(Body::empty())
        .unwrap_or_else(|_| Response::new(Body::empty()))
}
