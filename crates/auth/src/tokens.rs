//! HS256 token issuance and verification.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, errors::ErrorKind};
use serde::{Serialize, de::DeserializeOwned};

use userserver_core::UserId;

use crate::claims::{
    DEFAULT_CLOCK_SKEW_SECS, ServerClaims, TokenError, UserClaims, UserData, validate_window,
};

/// Verifies tokens presented by callers.
///
/// Shared across request handlers, so implementations must be thread-safe.
pub trait TokenVerifier: Send + Sync {
    fn check_user_token(&self, token: &str, now: DateTime<Utc>) -> Result<UserClaims, TokenError>;

    fn check_server_token(&self, token: &str, now: DateTime<Utc>) -> Result<ServerClaims, TokenError>;
}

/// Mints tokens for logged-in users and trusted backends.
pub trait TokenIssuer: Send + Sync {
    fn issue_user_token(&self, user_id: &UserId, now: DateTime<Utc>) -> Result<String, TokenError>;

    fn issue_server_token(&self, server_name: &str, now: DateTime<Utc>) -> Result<String, TokenError>;
}

struct KeyPair {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl KeyPair {
    fn from_secret(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }
}

/// HMAC-SHA256 tokens with distinct secrets for end users and servers.
///
/// A user token never verifies as a server token and vice versa.
pub struct Hs256Tokens {
    user: KeyPair,
    server: KeyPair,
    user_ttl: Duration,
    server_ttl: Duration,
    clock_skew: Duration,
}

impl Hs256Tokens {
    pub fn new(user_secret: impl AsRef<[u8]>, server_secret: impl AsRef<[u8]>) -> Self {
        Self {
            user: KeyPair::from_secret(user_secret.as_ref()),
            server: KeyPair::from_secret(server_secret.as_ref()),
            user_ttl: Duration::days(7),
            server_ttl: Duration::days(1),
            clock_skew: Duration::seconds(DEFAULT_CLOCK_SKEW_SECS),
        }
    }

    pub fn with_ttls(mut self, user_ttl: Duration, server_ttl: Duration) -> Self {
        self.user_ttl = user_ttl;
        self.server_ttl = server_ttl;
        self
    }

    /// Tolerated clock difference with token issuers; zero disables it.
    pub fn with_clock_skew(mut self, clock_skew: Duration) -> Self {
        self.clock_skew = clock_skew;
        self
    }

    fn validation() -> Validation {
        // Expiry is checked by `validate_window` against the caller's clock.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;
        validation
    }
}

fn sign<C: Serialize>(claims: &C, key: &EncodingKey) -> Result<String, TokenError> {
    jsonwebtoken::encode(&Header::new(Algorithm::HS256), claims, key)
        .map_err(|e| TokenError::Signing(e.to_string()))
}

fn decode<C: DeserializeOwned>(token: &str, key: &DecodingKey) -> Result<C, TokenError> {
    jsonwebtoken::decode::<C>(token, key, &Hs256Tokens::validation())
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            ErrorKind::InvalidSignature => TokenError::BadSignature,
            ErrorKind::ExpiredSignature => TokenError::Expired,
            ErrorKind::ImmatureSignature => TokenError::NotYetValid,
            _ => TokenError::Malformed(e.to_string()),
        })
}

impl TokenVerifier for Hs256Tokens {
    fn check_user_token(&self, token: &str, now: DateTime<Utc>) -> Result<UserClaims, TokenError> {
        let claims: UserClaims = decode(token, &self.user.decoding)?;
        validate_window(claims.iat, claims.exp, now, self.clock_skew)?;
        Ok(claims)
    }

    fn check_server_token(&self, token: &str, now: DateTime<Utc>) -> Result<ServerClaims, TokenError> {
        let claims: ServerClaims = decode(token, &self.server.decoding)?;
        validate_window(claims.iat, claims.exp, now, self.clock_skew)?;
        Ok(claims)
    }
}

impl TokenIssuer for Hs256Tokens {
    fn issue_user_token(&self, user_id: &UserId, now: DateTime<Utc>) -> Result<String, TokenError> {
        let claims = UserClaims {
            user_data: UserData { user_id: user_id.clone() },
            iat: now.timestamp(),
            exp: (now + self.user_ttl).timestamp(),
        };
        sign(&claims, &self.user.encoding)
    }

    fn issue_server_token(&self, server_name: &str, now: DateTime<Utc>) -> Result<String, TokenError> {
        let claims = ServerClaims {
            server_name: server_name.to_string(),
            iat: now.timestamp(),
            exp: (now + self.server_ttl).timestamp(),
        };
        sign(&claims, &self.server.encoding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens() -> Hs256Tokens {
        Hs256Tokens::new("user-secret", "server-secret")
    }

    #[test]
    fn user_token_verifies_and_carries_user_id() {
        let t = tokens();
        let now = Utc::now();
        let token = t.issue_user_token(&UserId::new("u1"), now).unwrap();

        let claims = t.check_user_token(&token, now).unwrap();
        assert_eq!(claims.user_id().as_str(), "u1");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn server_token_verifies() {
        let t = tokens();
        let now = Utc::now();
        let token = t.issue_server_token("demand-server", now).unwrap();

        let claims = t.check_server_token(&token, now).unwrap();
        assert_eq!(claims.server_name, "demand-server");
    }

    #[test]
    fn user_and_server_tokens_are_not_interchangeable() {
        let t = tokens();
        let now = Utc::now();
        let user = t.issue_user_token(&UserId::new("u1"), now).unwrap();
        let server = t.issue_server_token("svc", now).unwrap();

        assert_eq!(t.check_server_token(&user, now).unwrap_err(), TokenError::BadSignature);
        assert_eq!(t.check_user_token(&server, now).unwrap_err(), TokenError::BadSignature);
    }

    #[test]
    fn garbage_is_malformed() {
        let err = tokens().check_user_token("bad-token", Utc::now()).unwrap_err();
        assert!(matches!(err, TokenError::Malformed(_)));
    }

    #[test]
    fn expired_user_token_is_rejected() {
        let t = tokens().with_ttls(Duration::minutes(5), Duration::minutes(5));
        let issued = Utc::now();
        let token = t.issue_user_token(&UserId::new("u1"), issued).unwrap();

        let later = issued + Duration::minutes(10);
        assert_eq!(t.check_user_token(&token, later).unwrap_err(), TokenError::Expired);
    }

    #[test]
    fn token_from_the_future_is_rejected() {
        let t = tokens();
        let now = Utc::now();
        let token = t.issue_server_token("svc", now + Duration::hours(1)).unwrap();
        assert_eq!(t.check_server_token(&token, now).unwrap_err(), TokenError::NotYetValid);
    }

    #[test]
    fn peer_clock_slightly_ahead_is_tolerated() {
        let t = tokens();
        let now = Utc::now();
        let token = t.issue_server_token("svc", now + Duration::seconds(1)).unwrap();
        assert_eq!(t.check_server_token(&token, now).unwrap().server_name, "svc");

        let strict = tokens().with_clock_skew(Duration::zero());
        assert_eq!(strict.check_server_token(&token, now).unwrap_err(), TokenError::NotYetValid);
    }
}
