//! Logical error codes returned in the `errcode` field of every response.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Failure class reported to API consumers.
///
/// Success is never represented here: a response without a code carries `0`.
/// Discriminants are part of the wire contract and must not be renumbered.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(i64)]
pub enum ErrorCode {
    /// The request body could not be parsed into the expected parameters.
    ParamsParse = 1001,
    /// An end-user or server token failed verification.
    TokenCheck = 1002,
    /// The token is valid but belongs to a different user.
    UserCheck = 1003,
    UserRegister = 1004,
    UserLogin = 1005,
    UserGetInfos = 1006,
    UserUpdateInfos = 1007,
    DemandCreate = 1008,
    DemandUpdate = 1009,
    DemandQuery = 1010,
    DemandDelete = 1011,
    SkillCreate = 1012,
    SkillUpdate = 1013,
    SkillQuery = 1014,
    SkillDelete = 1015,
}

/// Integer that does not correspond to any [`ErrorCode`].
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("unknown error code: {0}")]
pub struct UnknownErrorCode(pub i64);

impl ErrorCode {
    pub const ALL: [ErrorCode; 15] = [
        ErrorCode::ParamsParse,
        ErrorCode::TokenCheck,
        ErrorCode::UserCheck,
        ErrorCode::UserRegister,
        ErrorCode::UserLogin,
        ErrorCode::UserGetInfos,
        ErrorCode::UserUpdateInfos,
        ErrorCode::DemandCreate,
        ErrorCode::DemandUpdate,
        ErrorCode::DemandQuery,
        ErrorCode::DemandDelete,
        ErrorCode::SkillCreate,
        ErrorCode::SkillUpdate,
        ErrorCode::SkillQuery,
        ErrorCode::SkillDelete,
    ];

    /// Wire value of the code.
    pub fn code(self) -> i64 {
        self as i64
    }

    /// Default human-readable message for the failure class.
    pub fn message(self) -> &'static str {
        match self {
            ErrorCode::ParamsParse => "params parse failed!",
            ErrorCode::TokenCheck => "token check failed!",
            ErrorCode::UserCheck => "user is invalid!",
            ErrorCode::UserRegister => "user register failed!",
            ErrorCode::UserLogin => "user login failed!",
            ErrorCode::UserGetInfos => "get user infos failed!",
            ErrorCode::UserUpdateInfos => "update user infos failed!",
            ErrorCode::DemandCreate => "create demand failed!",
            ErrorCode::DemandUpdate => "update demand failed!",
            ErrorCode::DemandQuery => "query demand failed!",
            ErrorCode::DemandDelete => "delete demand failed!",
            ErrorCode::SkillCreate => "create skill failed!",
            ErrorCode::SkillUpdate => "update skill failed!",
            ErrorCode::SkillQuery => "query skill failed!",
            ErrorCode::SkillDelete => "delete skill failed!",
        }
    }
}

impl core::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} ({})", self.code(), self.message())
    }
}

impl From<ErrorCode> for i64 {
    fn from(value: ErrorCode) -> Self {
        value.code()
    }
}

impl TryFrom<i64> for ErrorCode {
    type Error = UnknownErrorCode;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        ErrorCode::ALL
            .into_iter()
            .find(|c| c.code() == value)
            .ok_or(UnknownErrorCode(value))
    }
}

impl Serialize for ErrorCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.code())
    }
}

impl<'de> Deserialize<'de> for ErrorCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = i64::deserialize(deserializer)?;
        ErrorCode::try_from(raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn codes_are_sequential_from_1001() {
        for (offset, code) in ErrorCode::ALL.iter().enumerate() {
            assert_eq!(code.code(), 1001 + offset as i64);
        }
    }

    #[test]
    fn codes_and_messages_are_unique() {
        let codes: HashSet<i64> = ErrorCode::ALL.iter().map(|c| c.code()).collect();
        let messages: HashSet<&str> = ErrorCode::ALL.iter().map(|c| c.message()).collect();
        assert_eq!(codes.len(), ErrorCode::ALL.len());
        assert_eq!(messages.len(), ErrorCode::ALL.len());
    }

    #[test]
    fn gate_messages_are_fixed() {
        assert_eq!(ErrorCode::TokenCheck.code(), 1002);
        assert_eq!(ErrorCode::TokenCheck.message(), "token check failed!");
        assert_eq!(ErrorCode::UserCheck.code(), 1003);
        assert_eq!(ErrorCode::UserCheck.message(), "user is invalid!");
    }

    #[test]
    fn try_from_rejects_unknown_values() {
        assert_eq!(ErrorCode::try_from(1005), Ok(ErrorCode::UserLogin));
        assert_eq!(ErrorCode::try_from(0), Err(UnknownErrorCode(0)));
        assert_eq!(ErrorCode::try_from(1016), Err(UnknownErrorCode(1016)));
    }

    #[test]
    fn serializes_as_integer() {
        let json = serde_json::to_string(&ErrorCode::SkillDelete).unwrap();
        assert_eq!(json, "1015");
        let back: ErrorCode = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ErrorCode::SkillDelete);
        assert!(serde_json::from_str::<ErrorCode>("42").is_err());
    }
}
