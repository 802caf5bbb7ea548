//! Article model
//!
//! An article is one uploaded essay: the title the student gave it, the
//! name it is stored under in the upload directory, and the feedback text.

use serde::{Deserialize, Serialize};

/// Uploaded essay with its feedback
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    pub id: i64,
    pub title: String,
    /// Sanitized file name inside the upload directory
    pub filename: String,
    /// Generated feedback, a degraded-stage message, or a teacher's rewrite
    pub feedback: Option<String>,
    /// Owning student
    pub user_id: i64,
}

/// Fields of a new article
#[derive(Debug, Clone)]
pub struct CreateArticleInput {
    pub title: String,
    pub filename: String,
    pub feedback: Option<String>,
    pub user_id: i64,
}
