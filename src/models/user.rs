//! User model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A registered student or teacher
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier
    pub id: i64,
    /// Username (unique)
    pub username: String,
    /// Password hash (argon2)
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Teachers see every essay and may rewrite feedback
    pub is_teacher: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Create a new User.
    ///
    /// The password must already be hashed with `services::password::hash_password()`.
    pub fn new(username: String, password_hash: String, is_teacher: bool) -> Self {
        Self {
            id: 0, // Will be set by the database
            username,
            password_hash,
            is_teacher,
            created_at: Utc::now(),
        }
    }

    /// Whether this user may read the given essay
    pub fn can_view(&self, owner_id: i64) -> bool {
        self.is_teacher || self.id == owner_id
    }
}
