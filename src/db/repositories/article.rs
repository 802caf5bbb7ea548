//! Article repository
//!
//! - `ArticleRepository` trait defining the interface for essay records
//! - `SqlxArticleRepository` implementing it on SQLite
//!
//! Listings are ordered newest first (by ID, which follows insertion order).

use crate::models::{Article, CreateArticleInput};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use std::sync::Arc;

/// Article repository trait
#[async_trait]
pub trait ArticleRepository: Send + Sync {
    /// Insert a new article
    async fn create(&self, input: &CreateArticleInput) -> Result<Article>;

    /// Get article by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Article>>;

    /// Every article, for teachers
    async fn list_all(&self) -> Result<Vec<Article>>;

    /// Articles owned by one user
    async fn list_by_user(&self, user_id: i64) -> Result<Vec<Article>>;

    /// Replace the feedback text, returning the updated article if it exists
    async fn update_feedback(&self, id: i64, feedback: &str) -> Result<Option<Article>>;
}

/// SQLx-based article repository implementation
pub struct SqlxArticleRepository {
    pool: SqlitePool,
}

impl SqlxArticleRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: SqlitePool) -> Arc<dyn ArticleRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl ArticleRepository for SqlxArticleRepository {
    async fn create(&self, input: &CreateArticleInput) -> Result<Article> {
        let result = sqlx::query(
            r#"
            INSERT INTO articles (title, filename, feedback, user_id)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&input.title)
        .bind(&input.filename)
        .bind(&input.feedback)
        .bind(input.user_id)
        .execute(&self.pool)
        .await
        .context("Failed to create article")?;

        Ok(Article {
            id: result.last_insert_rowid(),
            title: input.title.clone(),
            filename: input.filename.clone(),
            feedback: input.feedback.clone(),
            user_id: input.user_id,
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Article>> {
        let row = sqlx::query(
            r#"
            SELECT id, title, filename, feedback, user_id
            FROM articles
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to get article by ID")?;

        Ok(row.as_ref().map(row_to_article))
    }

    async fn list_all(&self) -> Result<Vec<Article>> {
        let rows = sqlx::query(
            r#"
            SELECT id, title, filename, feedback, user_id
            FROM articles
            ORDER BY id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list articles")?;

        Ok(rows.iter().map(row_to_article).collect())
    }

    async fn list_by_user(&self, user_id: i64) -> Result<Vec<Article>> {
        let rows = sqlx::query(
            r#"
            SELECT id, title, filename, feedback, user_id
            FROM articles
            WHERE user_id = ?
            ORDER BY id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list articles by user")?;

        Ok(rows.iter().map(row_to_article).collect())
    }

    async fn update_feedback(&self, id: i64, feedback: &str) -> Result<Option<Article>> {
        let result = sqlx::query("UPDATE articles SET feedback = ? WHERE id = ?")
            .bind(feedback)
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to update article feedback")?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_by_id(id).await
    }
}

fn row_to_article(row: &SqliteRow) -> Article {
    Article {
        id: row.get("id"),
        title: row.get("title"),
        filename: row.get("filename"),
        feedback: row.get("feedback"),
        user_id: row.get("user_id"),
    }
}
