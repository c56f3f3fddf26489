//! User directory backing the account endpoints.
//!
//! Only an in-memory implementation exists; swapping in a database means
//! implementing [`UserDirectory`] and passing it to `build_app`.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::Serialize;
use argon2::Argon2;
use argon2::password_hash::{
    PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng,
};
use thiserror::Error;

use userserver_core::UserId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    #[error("user name '{0}' is already registered")]
    AlreadyRegistered(String),

    #[error("invalid user name or password")]
    InvalidCredentials,

    #[error("user not found: {0}")]
    NotFound(UserId),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("user directory lock poisoned")]
    Poisoned,

    #[error("password hashing failed: {0}")]
    Hashing(String),
}

/// Profile of an account registered with a user name and password.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub user_id: UserId,
    pub user_name: String,
    pub nick_name: String,
    pub avatar: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Profile of a mini-app account, keyed by the platform open id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MiniUserProfile {
    pub user_id: UserId,
    pub open_id: String,
    pub nick_name: String,
    pub created_at: DateTime<Utc>,
}

/// Fields a user may change on their own profile. `None` keeps the old value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub nick_name: Option<String>,
    pub avatar: Option<String>,
}

pub trait UserDirectory: Send + Sync {
    fn register(
        &self,
        user_name: &str,
        password: &str,
        nick_name: Option<&str>,
    ) -> Result<UserProfile, DirectoryError>;

    fn authenticate(&self, user_name: &str, password: &str) -> Result<UserProfile, DirectoryError>;

    fn profile(&self, user_id: &UserId) -> Result<UserProfile, DirectoryError>;

    fn update_profile(
        &self,
        user_id: &UserId,
        update: ProfileUpdate,
    ) -> Result<UserProfile, DirectoryError>;

    /// Return the mini-app account for `open_id`, creating it on first login.
    fn mini_login(
        &self,
        open_id: &str,
        nick_name: Option<&str>,
    ) -> Result<MiniUserProfile, DirectoryError>;

    fn mini_profile(&self, user_id: &UserId) -> Result<MiniUserProfile, DirectoryError>;
}

#[derive(Debug, Clone)]
struct StoredUser {
    profile: UserProfile,
    /// Argon2id PHC string; embeds its own salt and parameters.
    password_hash: String,
}

#[derive(Debug, Default)]
struct Directory {
    users: HashMap<UserId, StoredUser>,
    by_name: HashMap<String, UserId>,
    mini_users: HashMap<UserId, MiniUserProfile>,
    by_open_id: HashMap<String, UserId>,
}

/// In-memory user directory for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryUserDirectory {
    inner: RwLock<Directory>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }
}

fn hash_password(password: &str) -> Result<String, DirectoryError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| DirectoryError::Hashing(e.to_string()))
}

fn verify_password(stored_hash: &str, password: &str) -> Result<bool, DirectoryError> {
    let parsed = PasswordHash::new(stored_hash).map_err(|e| DirectoryError::Hashing(e.to_string()))?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(DirectoryError::Hashing(e.to_string())),
    }
}

fn require(field: &str, value: &str) -> Result<(), DirectoryError> {
    if value.trim().is_empty() {
        return Err(DirectoryError::Validation(format!("{field} must not be empty")));
    }
    Ok(())
}

impl UserDirectory for InMemoryUserDirectory {
    fn register(
        &self,
        user_name: &str,
        password: &str,
        nick_name: Option<&str>,
    ) -> Result<UserProfile, DirectoryError> {
        require("userName", user_name)?;
        require("password", password)?;
        // Hash before taking the lock; argon2 is deliberately slow.
        let password_hash = hash_password(password)?;

        let mut dir = self.inner.write().map_err(|_| DirectoryError::Poisoned)?;
        if dir.by_name.contains_key(user_name) {
            return Err(DirectoryError::AlreadyRegistered(user_name.to_string()));
        }

        let now = Utc::now();
        let profile = UserProfile {
            user_id: UserId::generate(),
            user_name: user_name.to_string(),
            nick_name: nick_name.unwrap_or(user_name).to_string(),
            avatar: String::new(),
            created_at: now,
            updated_at: now,
        };
        let stored = StoredUser {
            profile: profile.clone(),
            password_hash,
        };

        dir.by_name.insert(user_name.to_string(), profile.user_id.clone());
        dir.users.insert(profile.user_id.clone(), stored);
        Ok(profile)
    }

    fn authenticate(&self, user_name: &str, password: &str) -> Result<UserProfile, DirectoryError> {
        let stored = {
            let dir = self.inner.read().map_err(|_| DirectoryError::Poisoned)?;
            dir.by_name
                .get(user_name)
                .and_then(|id| dir.users.get(id))
                .cloned()
                .ok_or(DirectoryError::InvalidCredentials)?
        };

        if !verify_password(&stored.password_hash, password)? {
            return Err(DirectoryError::InvalidCredentials);
        }
        Ok(stored.profile)
    }

    fn profile(&self, user_id: &UserId) -> Result<UserProfile, DirectoryError> {
        let dir = self.inner.read().map_err(|_| DirectoryError::Poisoned)?;
        dir.users
            .get(user_id)
            .map(|u| u.profile.clone())
            .ok_or_else(|| DirectoryError::NotFound(user_id.clone()))
    }

    fn update_profile(
        &self,
        user_id: &UserId,
        update: ProfileUpdate,
    ) -> Result<UserProfile, DirectoryError> {
        if let Some(nick_name) = &update.nick_name {
            require("nickName", nick_name)?;
        }

        let mut dir = self.inner.write().map_err(|_| DirectoryError::Poisoned)?;
        let stored = dir
            .users
            .get_mut(user_id)
            .ok_or_else(|| DirectoryError::NotFound(user_id.clone()))?;

        if let Some(nick_name) = update.nick_name {
            stored.profile.nick_name = nick_name;
        }
        if let Some(avatar) = update.avatar {
            stored.profile.avatar = avatar;
        }
        stored.profile.updated_at = Utc::now();
        Ok(stored.profile.clone())
    }

    fn mini_login(
        &self,
        open_id: &str,
        nick_name: Option<&str>,
    ) -> Result<MiniUserProfile, DirectoryError> {
        require("openId", open_id)?;

        let mut dir = self.inner.write().map_err(|_| DirectoryError::Poisoned)?;
        if let Some(existing) = dir
            .by_open_id
            .get(open_id)
            .and_then(|id| dir.mini_users.get(id))
        {
            return Ok(existing.clone());
        }

        let profile = MiniUserProfile {
            user_id: UserId::generate(),
            open_id: open_id.to_string(),
            nick_name: nick_name.unwrap_or_default().to_string(),
            created_at: Utc::now(),
        };
        dir.by_open_id.insert(open_id.to_string(), profile.user_id.clone());
        dir.mini_users.insert(profile.user_id.clone(), profile.clone());
        Ok(profile)
    }

    fn mini_profile(&self, user_id: &UserId) -> Result<MiniUserProfile, DirectoryError> {
        let dir = self.inner.read().map_err(|_| DirectoryError::Poisoned)?;
        dir.mini_users
            .get(user_id)
            .cloned()
            .ok_or_else(|| DirectoryError::NotFound(user_id.clone()))
    }
}
