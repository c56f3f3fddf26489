use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use userserver_core::UserId;

/// User payload embedded in an end-user token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserData {
    pub user_id: UserId,
}

/// Claims carried by an end-user token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserClaims {
    pub user_data: UserData,

    /// Issued-at, seconds since the Unix epoch.
    pub iat: i64,

    /// Expiration, seconds since the Unix epoch.
    pub exp: i64,
}

/// Claims carried by a server-to-server token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerClaims {
    /// Name of the trusted backend that requested the token.
    pub server_name: String,
    pub iat: i64,
    pub exp: i64,
}

impl UserClaims {
    pub fn user_id(&self) -> &UserId {
        &self.user_data.user_id
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("malformed token: {0}")]
    Malformed(String),

    #[error("token signature mismatch")]
    BadSignature,

    #[error("token has expired")]
    Expired,

    #[error("token not yet valid (iat is in the future)")]
    NotYetValid,

    #[error("invalid token time window (exp <= iat)")]
    InvalidTimeWindow,

    #[error("failed to sign token: {0}")]
    Signing(String),
}

/// Clock difference, in seconds, tolerated between the issuing host and this one.
pub const DEFAULT_CLOCK_SKEW_SECS: i64 = 60;

/// Check the `iat`/`exp` window of a decoded token against `now`.
///
/// `leeway` widens the window on both sides so tokens minted by a peer whose
/// clock runs slightly ahead or behind still verify. Signature verification
/// happens before this, in [`crate::Hs256Tokens`].
pub fn validate_window(
    iat: i64,
    exp: i64,
    now: DateTime<Utc>,
    leeway: Duration,
) -> Result<(), TokenError> {
    if exp <= iat {
        return Err(TokenError::InvalidTimeWindow);
    }
    let now = now.timestamp();
    let leeway = leeway.num_seconds().max(0);
    if now.saturating_add(leeway) < iat {
        return Err(TokenError::NotYetValid);
    }
    if now.saturating_sub(leeway) >= exp {
        return Err(TokenError::Expired);
    }
    Ok(())
}
