//! Database repositories
//!
//! One repository per table. Services depend on the traits and receive the
//! `Sqlx*` implementations through `boxed()`.

pub mod article;
pub mod session;
pub mod user;

pub use article::{ArticleRepository, SqlxArticleRepository};
pub use session::{SessionRepository, SqlxSessionRepository};
pub use user::{SqlxUserRepository, UserRepository};
