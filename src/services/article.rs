//! Article service
//!
//! Read and edit access to uploaded essays:
//! - teachers list and open every essay and may rewrite its feedback
//! - students list and open only their own essays

use crate::db::repositories::ArticleRepository;
use crate::models::{Article, CreateArticleInput, User};
use anyhow::Context;
use std::sync::Arc;

/// Error types for article service operations
#[derive(Debug, thiserror::Error)]
pub enum ArticleServiceError {
    #[error("Article not found: {0}")]
    NotFound(i64),

    /// The user may not perform this operation on this article
    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Article service for essay records
pub struct ArticleService {
    repo: Arc<dyn ArticleRepository>,
}

impl ArticleService {
    pub fn new(repo: Arc<dyn ArticleRepository>) -> Self {
        Self { repo }
    }

    /// Insert a new article
    pub async fn create(&self, input: CreateArticleInput) -> Result<Article, ArticleServiceError> {
        let article = self
            .repo
            .create(&input)
            .await
            .context("Failed to create article")?;

        Ok(article)
    }

    /// Dashboard listing: every article for teachers, own articles otherwise
    pub async fn list_for(&self, user: &User) -> Result<Vec<Article>, ArticleServiceError> {
        let articles = if user.is_teacher {
            self.repo.list_all().await
        } else {
            self.repo.list_by_user(user.id).await
        }
        .context("Failed to list articles")?;

        Ok(articles)
    }

    /// Fetch one article on behalf of `user`.
    ///
    /// # Errors
    ///
    /// - `NotFound` if no article has this ID
    /// - `Forbidden` if a student asks for someone else's article
    pub async fn get_for(&self, user: &User, id: i64) -> Result<Article, ArticleServiceError> {
        let article = self
            .repo
            .get_by_id(id)
            .await
            .context("Failed to get article")?
            .ok_or(ArticleServiceError::NotFound(id))?;

        if !user.can_view(article.user_id) {
            return Err(ArticleServiceError::Forbidden(
                "Students can only view their own essays".to_string(),
            ));
        }

        Ok(article)
    }

    /// Replace an article's feedback with `feedback`, stored verbatim.
    ///
    /// Only teachers may do this; for anyone else nothing is changed.
    pub async fn update_feedback(
        &self,
        user: &User,
        id: i64,
        feedback: &str,
    ) -> Result<Article, ArticleServiceError> {
        if !user.is_teacher {
            tracing::warn!(user_id = user.id, article_id = id, "Feedback edit refused: not a teacher");
            return Err(ArticleServiceError::Forbidden(
                "Only teachers can edit feedback".to_string(),
            ));
        }

        let article = self
            .repo
            .update_feedback(id, feedback)
            .await
            .context("Failed to update feedback")?
            .ok_or(ArticleServiceError::NotFound(id))?;

        tracing::info!(user_id = user.id, article_id = id, "Feedback updated");
        Ok(article)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxArticleRepository, SqlxUserRepository, UserRepository};
    use crate::db::{create_test_pool, migrations};

    struct Fixture {
        service: ArticleService,
        teacher: User,
        alice: User,
        bob: User,
    }

    async fn setup() -> Fixture {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let users = SqlxUserRepository::new(pool.clone());
        let mk = |name: &str, teacher: bool| User::new(name.to_string(), "hash".to_string(), teacher);

        Fixture {
            teacher: users.create(&mk("teacher", true)).await.unwrap(),
            alice: users.create(&mk("alice", false)).await.unwrap(),
            bob: users.create(&mk("bob", false)).await.unwrap(),
            service: ArticleService::new(SqlxArticleRepository::boxed(pool)),
        }
    }

    async fn upload(f: &Fixture, owner: &User, title: &str) -> Article {
        f.service
            .create(CreateArticleInput {
                title: title.to_string(),
                filename: format!("{}.txt", title),
                feedback: Some("Good start.".to_string()),
                user_id: owner.id,
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_list_for_teacher_and_student() {
        let f = setup().await;
        upload(&f, &f.alice, "a").await;
        upload(&f, &f.bob, "b").await;

        assert_eq!(f.service.list_for(&f.teacher).await.unwrap().len(), 2);

        let own = f.service.list_for(&f.alice).await.unwrap();
        assert_eq!(own.len(), 1);
        assert_eq!(own[0].user_id, f.alice.id);
    }

    #[tokio::test]
    async fn test_get_for_enforces_ownership() {
        let f = setup().await;
        let article = upload(&f, &f.alice, "a").await;

        assert!(f.service.get_for(&f.alice, article.id).await.is_ok());
        assert!(f.service.get_for(&f.teacher, article.id).await.is_ok());
        assert!(matches!(
            f.service.get_for(&f.bob, article.id).await,
            Err(ArticleServiceError::Forbidden(_))
        ));
        assert!(matches!(
            f.service.get_for(&f.teacher, 999).await,
            Err(ArticleServiceError::NotFound(999))
        ));
    }

    #[tokio::test]
    async fn test_teacher_updates_feedback_verbatim() {
        let f = setup().await;
        let article = upload(&f, &f.alice, "a").await;
        let text = "  Strong thesis.\n\nWork on transitions.  ";

        let updated = f.service.update_feedback(&f.teacher, article.id, text).await.unwrap();

        assert_eq!(updated.feedback.as_deref(), Some(text));
    }

    #[tokio::test]
    async fn test_student_cannot_update_feedback() {
        let f = setup().await;
        let article = upload(&f, &f.alice, "a").await;

        let result = f.service.update_feedback(&f.alice, article.id, "A+").await;
        assert!(matches!(result, Err(ArticleServiceError::Forbidden(_))));

        let unchanged = f.service.get_for(&f.alice, article.id).await.unwrap();
        assert_eq!(unchanged.feedback.as_deref(), Some("Good start."));
    }

    #[tokio::test]
    async fn test_update_missing_article() {
        let f = setup().await;
        let result = f.service.update_feedback(&f.teacher, 42, "x").await;
        assert!(matches!(result, Err(ArticleServiceError::NotFound(42))));
    }
}
