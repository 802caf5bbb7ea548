//! Data models
//!
//! Database entities (User, Session, Article) and the stage result type
//! shared by text extraction and feedback generation.

mod article;
mod outcome;
mod session;
mod user;

pub use article::{Article, CreateArticleInput};
pub use outcome::{Outcome, OutcomeStatus};
pub use session::Session;
pub use user::User;
