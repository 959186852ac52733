//! User model
//!
//! Registered accounts and their roles. Publishing requires the author role;
//! the matching author profile row is created on first publication.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// User entity representing a registered account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier
    pub id: i64,
    /// Username (unique)
    pub username: String,
    /// Email address, may be empty
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    /// Password hash (argon2)
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// User role
    pub role: UserRole,
    /// Registration timestamp
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Check if the user is an administrator
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    /// Check if the user may publish news and articles
    pub fn can_publish(&self) -> bool {
        matches!(self.role, UserRole::Admin | UserRole::Author)
    }

    /// Check if the user may edit or delete content owned by `owner_user_id`
    pub fn can_manage(&self, owner_user_id: i64) -> bool {
        self.is_admin() || self.id == owner_user_id
    }

    /// Whether the user has an address to send mail to
    pub fn has_email(&self) -> bool {
        !self.email.trim().is_empty()
    }
}

/// User role for authorization.
///
/// - Common: can read, comment, rate and subscribe
/// - Author: can additionally publish
/// - Admin: full access
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    #[default]
    Common,
    Author,
    Admin,
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserRole::Common => write!(f, "common"),
            UserRole::Author => write!(f, "author"),
            UserRole::Admin => write!(f, "admin"),
        }
    }
}

impl FromStr for UserRole {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "common" => Ok(UserRole::Common),
            "author" => Ok(UserRole::Author),
            "admin" => Ok(UserRole::Admin),
            _ => Err(anyhow::anyhow!("Invalid user role: {}", s)),
        }
    }
}

/// Input for registering a new user (before password hashing)
#[derive(Debug, Clone, Default)]
pub struct CreateUserInput {
    pub username: String,
    pub email: String,
    /// Plaintext password (will be hashed)
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}
