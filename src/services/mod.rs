//! Services layer - Business logic
//!
//! Services hold the rules (who may see or edit what, how an upload
//! proceeds) and talk to repositories and the outside world.

pub mod article;
pub mod feedback;
pub mod password;
pub mod upload;
pub mod user;

pub use article::{ArticleService, ArticleServiceError};
pub use feedback::{FeedbackError, FeedbackGenerator, OpenAiFeedback};
pub use password::{hash_password, verify_password};
pub use upload::{
    sanitize_filename, stored_filename, UploadError, UploadReport, UploadRequest, UploadService,
    UploadStage,
};
pub use user::{LoginInput, RegisterInput, UserService, UserServiceError};
