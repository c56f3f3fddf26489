//! `userserver-core` — shared vocabulary for the user service.
//!
//! This crate holds the error-code catalogue and identifier types used by the
//! token layer and the HTTP layer. It has no transport or storage concerns.

pub mod error;
pub mod id;

pub use error::{ErrorCode, UnknownErrorCode};
pub use id::{RequestId, UserId};
