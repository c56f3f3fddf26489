//! `userserver-auth` — token issuance/verification and the authorization gate.
//!
//! This crate is intentionally decoupled from HTTP: the API layer hands it raw
//! token strings and maps [`AuthzError`] onto the response envelope.

pub mod claims;
pub mod gate;
pub mod tokens;

pub use claims::{
    DEFAULT_CLOCK_SKEW_SECS, ServerClaims, TokenError, UserClaims, UserData, validate_window,
};
pub use gate::{AuthzError, check_token};
pub use tokens::{Hs256Tokens, TokenIssuer, TokenVerifier};
