use std::fmt::Display;

use tracing::warn;

use userserver_core::ErrorCode;

use crate::lifecycle::RequestLifecycle;

/// Record a collaborator failure on the envelope.
///
/// Clients get the fixed message for `code`; the cause only goes to the log.
pub fn reject(lc: &mut RequestLifecycle, code: ErrorCode, cause: impl Display) {
    lc.span()
        .in_scope(|| warn!(errcode = code.code(), error = %cause, "request rejected"));
    lc.fail(code);
}
