//! Authorization gate shared by every protected handler.
//!
//! Two branches only: a handler carrying a server token is a trusted backend
//! and is checked on that token alone; otherwise the end-user token must
//! verify and belong to the user the request is acting on.

use chrono::{DateTime, Utc};
use thiserror::Error;

use userserver_core::{ErrorCode, UserId};

use crate::claims::TokenError;
use crate::tokens::TokenVerifier;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("token check failed!")]
    TokenCheck(#[source] TokenError),

    #[error("user is invalid!")]
    UserMismatch { expected: String, actual: UserId },
}

impl AuthzError {
    /// Envelope code for this failure.
    pub fn code(&self) -> ErrorCode {
        match self {
            AuthzError::TokenCheck(_) => ErrorCode::TokenCheck,
            AuthzError::UserMismatch { .. } => ErrorCode::UserCheck,
        }
    }

    /// Envelope message for this failure.
    pub fn message(&self) -> &'static str {
        self.code().message()
    }
}

/// Decide whether the caller may act on `user_id`.
///
/// A non-empty `server_token` takes precedence: `user_id` and `token` are then
/// ignored entirely.
pub fn check_token(
    verifier: &dyn TokenVerifier,
    server_token: Option<&str>,
    user_id: &str,
    token: &str,
    now: DateTime<Utc>,
) -> Result<(), AuthzError> {
    match server_token.filter(|t| !t.is_empty()) {
        None => user_check(verifier, user_id, token, now),
        Some(server_token) => server_check(verifier, server_token, now),
    }
}

fn user_check(
    verifier: &dyn TokenVerifier,
    user_id: &str,
    token: &str,
    now: DateTime<Utc>,
) -> Result<(), AuthzError> {
    let claims = verifier
        .check_user_token(token, now)
        .map_err(AuthzError::TokenCheck)?;

    if claims.user_id().as_str() != user_id {
        return Err(AuthzError::UserMismatch {
            expected: user_id.to_string(),
            actual: claims.user_data.user_id,
        });
    }
    Ok(())
}

fn server_check(
    verifier: &dyn TokenVerifier,
    server_token: &str,
    now: DateTime<Utc>,
) -> Result<(), AuthzError> {
    verifier
        .check_server_token(server_token, now)
        .map(|_claims| ())
        .map_err(AuthzError::TokenCheck)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::claims::{ServerClaims, UserClaims};
    use crate::tokens::{Hs256Tokens, TokenIssuer};
    use std::sync::Mutex;

    fn tokens() -> Hs256Tokens {
        Hs256Tokens::new("user-secret", "server-secret")
    }

    /// Records calls; rejects every user token, accepts every server token.
    #[derive(Default)]
    struct RecordingVerifier {
        calls: Mutex<Vec<String>>,
    }

    impl TokenVerifier for RecordingVerifier {
        fn check_user_token(&self, token: &str, _now: DateTime<Utc>) -> Result<UserClaims, TokenError> {
            self.calls.lock().unwrap().push(format!("user:{token}"));
            Err(TokenError::BadSignature)
        }

        fn check_server_token(&self, token: &str, _now: DateTime<Utc>) -> Result<ServerClaims, TokenError> {
            self.calls.lock().unwrap().push(format!("server:{token}"));
            Ok(ServerClaims { server_name: "svc".into(), iat: 0, exp: 1 })
        }
    }

    #[test]
    fn matching_user_token_passes() {
        let t = tokens();
        let now = Utc::now();
        let token = t.issue_user_token(&UserId::new("u1"), now).unwrap();

        assert_eq!(check_token(&t, None, "u1", &token, now), Ok(()));
    }

    #[test]
    fn mismatched_user_is_rejected_with_user_check() {
        let t = tokens();
        let now = Utc::now();
        let token = t.issue_user_token(&UserId::new("u2"), now).unwrap();

        let err = check_token(&t, None, "u1", &token, now).unwrap_err();
        assert_eq!(err.code(), ErrorCode::UserCheck);
        assert_eq!(err.message(), "user is invalid!");
    }

    #[test]
    fn bad_user_token_is_rejected_with_token_check() {
        let err = check_token(&tokens(), None, "u1", "bad-token", Utc::now()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::TokenCheck);
        assert_eq!(err.message(), "token check failed!");
    }

    #[test]
    fn empty_server_token_falls_back_to_user_check() {
        let verifier = RecordingVerifier::default();
        let _ = check_token(&verifier, Some(""), "u1", "tok", Utc::now());
        assert_eq!(*verifier.calls.lock().unwrap(), vec!["user:tok".to_string()]);
    }

    #[test]
    fn server_token_takes_precedence_and_ignores_user_inputs() {
        let verifier = RecordingVerifier::default();
        let result = check_token(&verifier, Some("srv"), "whoever", "garbage", Utc::now());

        assert_eq!(result, Ok(()));
        assert_eq!(*verifier.calls.lock().unwrap(), vec!["server:srv".to_string()]);
    }

    #[test]
    fn invalid_server_token_is_rejected_even_with_valid_user_token() {
        let t = tokens();
        let now = Utc::now();
        let user_token = t.issue_user_token(&UserId::new("u1"), now).unwrap();

        let err = check_token(&t, Some("forged"), "u1", &user_token, now).unwrap_err();
        assert_eq!(err.code(), ErrorCode::TokenCheck);
    }

    #[test]
    fn valid_server_token_passes() {
        let t = tokens();
        let now = Utc::now();
        let server_token = t.issue_server_token("demand-server", now).unwrap();

        assert_eq!(check_token(&t, Some(&server_token), "", "", now), Ok(()));
    }
}
