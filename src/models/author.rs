//! Author model

use serde::{Deserialize, Serialize};

/// Publishing profile attached one-to-one to a user.
///
/// `rating` is derived; see `services::rating::RatingEngine::recompute_author_rating`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Author {
    pub id: i64,
    pub user_id: i64,
    /// Username of the owning user
    pub username: String,
    pub rating: i64,
}
