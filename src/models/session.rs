//! Session model

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// How long a login stays valid
pub const SESSION_LIFETIME_DAYS: i64 = 7;

/// Session entity for user authentication
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Session ID (token)
    pub id: String,
    pub user_id: i64,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// Build a fresh session for `user_id` starting at `now`
    pub fn start(user_id: i64, now: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().simple().to_string(),
            user_id,
            expires_at: now + Duration::days(SESSION_LIFETIME_DAYS),
            created_at: now,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_lifetime() {
        let now = Utc::now();
        let session = Session::start(5, now);
        assert_eq!(session.user_id, 5);
        assert_eq!(session.id.len(), 32);
        assert!(!session.is_expired_at(now + Duration::days(6)));
        assert!(session.is_expired_at(now + Duration::days(7)));
    }
}
