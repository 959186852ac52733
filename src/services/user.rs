//! User service
//!
//! Implements business logic for accounts:
//! - Registration (first user becomes admin) with a welcome email
//! - Login/logout with seven-day session tokens
//! - Session validation for the HTTP layer
//! - Upgrading a reader to an author

use crate::db::repositories::{SessionRepository, UserRepository};
use crate::models::{CreateUserInput, Session, User, UserRole};
use crate::services::password::{check_password_strength, hash_password, verify_password};
use crate::tasks::{system_clock, Clock, Task, TaskQueue};
use anyhow::Context;
use serde::Deserialize;
use std::sync::Arc;

const MAX_USERNAME_CHARS: usize = 150;

/// Error types for user service operations
#[derive(Debug, thiserror::Error)]
pub enum UserServiceError {
    /// Invalid credentials
    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Username already taken
    #[error("User already exists: {0}")]
    UserExists(String),

    #[error("User not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Input for user login
#[derive(Debug, Clone, Deserialize)]
pub struct LoginInput {
    pub username: String,
    pub password: String,
}

impl LoginInput {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

/// User service for managing accounts and sessions
pub struct UserService {
    users: Arc<dyn UserRepository>,
    sessions: Arc<dyn SessionRepository>,
    queue: TaskQueue,
    clock: Clock,
}

impl UserService {
    pub fn new(users: Arc<dyn UserRepository>, sessions: Arc<dyn SessionRepository>, queue: TaskQueue) -> Self {
        Self {
            users,
            sessions,
            queue,
            clock: system_clock(),
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Register a new user
    ///
    /// The first account in the system becomes an admin, every later one a
    /// common reader. A welcome email is queued for accounts with an address.
    ///
    /// # Errors
    ///
    /// - `ValidationError` for a bad username, email or weak password
    /// - `UserExists` if the username is taken
    pub async fn register(&self, input: CreateUserInput) -> Result<User, UserServiceError> {
        let username = input.username.trim().to_string();
        let email = input.email.trim().to_string();
        validate_username(&username)?;
        validate_email(&email)?;
        check_password_strength(&input.password, &username).map_err(UserServiceError::ValidationError)?;

        if self
            .users
            .get_by_username(&username)
            .await
            .context("Failed to check username")?
            .is_some()
        {
            return Err(UserServiceError::UserExists(format!(
                "Username '{}' is already taken",
                username
            )));
        }

        let role = if self.users.count().await.context("Failed to count users")? == 0 {
            UserRole::Admin
        } else {
            UserRole::Common
        };

        let user = User {
            id: 0,
            username,
            email,
            first_name: input.first_name.trim().to_string(),
            last_name: input.last_name.trim().to_string(),
            password_hash: hash_password(&input.password)?,
            role,
            created_at: (self.clock)(),
        };
        let created = self.users.create(&user).await.context("Failed to create user")?;
        tracing::info!(user_id = created.id, username = %created.username, role = %created.role, "User registered");

        if created.has_email() {
            if let Err(e) = self.queue.enqueue(Task::Welcome { user_id: created.id }) {
                tracing::warn!(user_id = created.id, error = %e, "Welcome email not queued");
            }
        }

        Ok(created)
    }

    /// Check credentials and open a new session
    ///
    /// # Errors
    ///
    /// - `AuthenticationError` for an unknown user or a wrong password
    pub async fn login(&self, input: LoginInput) -> Result<Session, UserServiceError> {
        let invalid = || UserServiceError::AuthenticationError("Invalid username or password".to_string());

        let user = self
            .users
            .get_by_username(input.username.trim())
            .await
            .context("Failed to get user by username")?
            .ok_or_else(invalid)?;

        if !verify_password(&input.password, &user.password_hash)? {
            tracing::info!(user_id = user.id, "Login rejected");
            return Err(invalid());
        }

        let session = Session::start(user.id, (self.clock)());
        self.sessions
            .create(&session)
            .await
            .context("Failed to create session")?;

        tracing::debug!(user_id = user.id, "Session opened");
        Ok(session)
    }

    /// Drop a session. Unknown tokens are ignored.
    pub async fn logout(&self, token: &str) -> Result<(), UserServiceError> {
        self.sessions
            .delete(token)
            .await
            .context("Failed to delete session")?;
        Ok(())
    }

    /// Resolve a session token to its user
    ///
    /// Returns `None` for unknown or expired tokens; expired sessions are
    /// deleted on the way.
    pub async fn validate_session(&self, token: &str) -> Result<Option<User>, UserServiceError> {
        let Some(session) = self
            .sessions
            .get_by_id(token)
            .await
            .context("Failed to get session")?
        else {
            return Ok(None);
        };

        if session.is_expired_at((self.clock)()) {
            self.sessions
                .delete(token)
                .await
                .context("Failed to delete expired session")?;
            return Ok(None);
        }

        let user = self
            .users
            .get_by_id(session.user_id)
            .await
            .context("Failed to get session user")?;
        Ok(user)
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<User>, UserServiceError> {
        Ok(self.users.get_by_id(id).await.context("Failed to get user by ID")?)
    }

    /// Grant the author role to a common user. Authors and admins are
    /// returned unchanged.
    pub async fn upgrade_to_author(&self, user: &User) -> Result<User, UserServiceError> {
        if user.role != UserRole::Common {
            return Ok(user.clone());
        }

        if !self
            .users
            .set_role(user.id, UserRole::Author)
            .await
            .context("Failed to update user role")?
        {
            return Err(UserServiceError::NotFound(user.id.to_string()));
        }

        tracing::info!(user_id = user.id, "User upgraded to author");
        Ok(User {
            role: UserRole::Author,
            ..user.clone()
        })
    }
}

fn validate_username(username: &str) -> Result<(), UserServiceError> {
    if username.is_empty() {
        return Err(UserServiceError::ValidationError("Username cannot be empty".to_string()));
    }
    if username.chars().count() > MAX_USERNAME_CHARS {
        return Err(UserServiceError::ValidationError(format!(
            "Username cannot exceed {} characters",
            MAX_USERNAME_CHARS
        )));
    }
    // letters, digits and @/./+/-/_
    if !username
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
    {
        return Err(UserServiceError::ValidationError(
            "Username may contain only letters, digits and @/./+/-/_".to_string(),
        ));
    }
    Ok(())
}

/// Empty is allowed; such users just receive no mail
fn validate_email(email: &str) -> Result<(), UserServiceError> {
    if email.is_empty() {
        return Ok(());
    }
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') && !email.contains(char::is_whitespace) => {
            Ok(())
        }
        _ => Err(UserServiceError::ValidationError("Invalid email format".to_string())),
    }
}
