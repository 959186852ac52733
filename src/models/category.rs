//! Category model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Topic label posts are filed under and users subscribe to
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Category {
    pub id: i64,
    /// Unique name
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a category
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCategoryInput {
    pub name: String,
}
