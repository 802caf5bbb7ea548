//! Essay upload workflow
//!
//! `received -> validated -> stored-on-disk -> extracted -> feedback-generated -> persisted`
//!
//! Validation happens before anything touches the disk. Once the file is
//! written, a failure in a later stage aborts the upload without removing
//! the file, and no article row is created. Degraded extraction or feedback
//! is not a failure: the message is persisted as the article's feedback.
//!
//! Stored files keep their sanitized original name, so two uploads that
//! sanitize to the same name share one file on disk (last write wins) while
//! each gets its own article row.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use unicode_normalization::UnicodeNormalization;

use crate::config::UploadConfig;
use crate::extract::{DocumentKind, ExtractError, TextExtractor};
use crate::models::{Article, CreateArticleInput, OutcomeStatus};
use crate::services::article::{ArticleService, ArticleServiceError};
use crate::services::feedback::FeedbackGenerator;

/// Workflow stages, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadStage {
    Received,
    Validated,
    StoredOnDisk,
    Extracted,
    FeedbackGenerated,
    Persisted,
}

impl fmt::Display for UploadStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UploadStage::Received => "received",
            UploadStage::Validated => "validated",
            UploadStage::StoredOnDisk => "stored-on-disk",
            UploadStage::Extracted => "extracted",
            UploadStage::FeedbackGenerated => "feedback-generated",
            UploadStage::Persisted => "persisted",
        };
        f.write_str(name)
    }
}

/// Errors that abort an upload
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("Title cannot be empty")]
    EmptyTitle,

    /// No extension, or one outside the allow-list
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("File is {size} bytes, limit is {limit}")]
    TooLarge { size: u64, limit: u64 },

    #[error("Failed to store '{path}': {source}")]
    Storage {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Extraction(#[from] ExtractError),

    /// The blocking extraction task panicked or was cancelled
    #[error("Extraction task failed: {0}")]
    Task(String),

    #[error(transparent)]
    Persist(#[from] ArticleServiceError),
}

impl UploadError {
    /// The stage that was being attempted when the upload aborted
    pub fn stage(&self) -> UploadStage {
        match self {
            UploadError::EmptyTitle
            | UploadError::UnsupportedFormat(_)
            | UploadError::TooLarge { .. } => UploadStage::Validated,
            UploadError::Storage { .. } => UploadStage::StoredOnDisk,
            UploadError::Extraction(_) | UploadError::Task(_) => UploadStage::Extracted,
            UploadError::Persist(_) => UploadStage::Persisted,
        }
    }
}

/// A received essay
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub title: String,
    /// Client-supplied file name
    pub filename: String,
    pub data: Vec<u8>,
    pub user_id: i64,
}

/// Result of a completed upload
#[derive(Debug, Clone)]
pub struct UploadReport {
    pub article: Article,
    pub extraction: OutcomeStatus,
    pub feedback: OutcomeStatus,
}

/// Runs the upload workflow
pub struct UploadService {
    articles: Arc<ArticleService>,
    extractor: TextExtractor,
    feedback: Arc<dyn FeedbackGenerator>,
    config: UploadConfig,
}

impl UploadService {
    pub fn new(
        articles: Arc<ArticleService>,
        extractor: TextExtractor,
        feedback: Arc<dyn FeedbackGenerator>,
        config: UploadConfig,
    ) -> Self {
        Self {
            articles,
            extractor,
            feedback,
            config,
        }
    }

    /// Run every stage for one essay
    pub async fn upload(&self, request: UploadRequest) -> Result<UploadReport, UploadError> {
        let UploadRequest {
            title,
            filename,
            data,
            user_id,
        } = request;
        tracing::debug!(stage = %UploadStage::Received, user_id, %filename, bytes = data.len());

        let title = title.trim().to_string();
        if title.is_empty() {
            return Err(UploadError::EmptyTitle);
        }
        let kind = self
            .config
            .accepted_kind(&filename)
            .ok_or_else(|| UploadError::UnsupportedFormat(filename.clone()))?;
        let size = data.len() as u64;
        if size > self.config.max_file_size {
            return Err(UploadError::TooLarge {
                size,
                limit: self.config.max_file_size,
            });
        }
        tracing::debug!(stage = %UploadStage::Validated, %kind);

        let stored_name = stored_filename(&filename, kind);
        let path = self.config.path.join(&stored_name);
        tokio::fs::create_dir_all(&self.config.path)
            .await
            .map_err(|source| UploadError::Storage {
                path: self.config.path.clone(),
                source,
            })?;
        tokio::fs::write(&path, &data)
            .await
            .map_err(|source| UploadError::Storage {
                path: path.clone(),
                source,
            })?;
        tracing::debug!(stage = %UploadStage::StoredOnDisk, path = %path.display());

        let extractor = self.extractor;
        let extract_path = path.clone();
        let extracted = tokio::task::spawn_blocking(move || extractor.extract_as(kind, &extract_path))
            .await
            .map_err(|e| UploadError::Task(e.to_string()))??;
        tracing::debug!(stage = %UploadStage::Extracted, status = %extracted.status());

        // A degraded extraction message is what gets sent for feedback
        let feedback = self.feedback.generate(extracted.as_str()).await;
        tracing::debug!(stage = %UploadStage::FeedbackGenerated, status = %feedback.status());

        let extraction = extracted.status();
        let feedback_status = feedback.status();
        let article = self
            .articles
            .create(CreateArticleInput {
                title,
                filename: stored_name,
                feedback: Some(feedback.into_text()),
                user_id,
            })
            .await?;

        tracing::info!(
            stage = %UploadStage::Persisted,
            article_id = article.id,
            user_id,
            filename = %article.filename,
            extraction = %extraction,
            feedback = %feedback_status,
            "Essay uploaded"
        );

        Ok(UploadReport {
            article,
            extraction,
            feedback: feedback_status,
        })
    }
}

/// Windows reserved device names, which cannot be used as file stems
const WINDOWS_DEVICE_NAMES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Reduce a client file name to a safe single path component.
///
/// The name is NFKD-normalized so accented letters keep their base letter.
/// Path separators become spaces, remaining non-ASCII characters are
/// dropped, whitespace runs become `_`, anything outside `[A-Za-z0-9_.-]`
/// is removed and leading or trailing `.`/`_` are trimmed. The result may
/// be empty.
pub fn sanitize_filename(name: &str) -> String {
    let spaced: String = name
        .nfkd()
        .filter(char::is_ascii)
        .map(|c| if c == '/' || c == '\\' { ' ' } else { c })
        .collect();

    let joined = spaced.split_whitespace().collect::<Vec<_>>().join("_");
    let safe: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .collect();
    let trimmed = safe.trim_matches(|c| c == '.' || c == '_');

    let stem = trimmed.split('.').next().unwrap_or_default();
    if WINDOWS_DEVICE_NAMES
        .iter()
        .any(|device| device.eq_ignore_ascii_case(stem))
    {
        return format!("_{}", trimmed);
    }

    trimmed.to_string()
}

/// Name to store an upload of `kind` under.
///
/// The sanitized original name, unless sanitizing emptied it or changed its
/// extension, in which case a random `<uuid>.<ext>` name is used.
pub fn stored_filename(original: &str, kind: DocumentKind) -> String {
    let sanitized = sanitize_filename(original);
    if !sanitized.is_empty() && DocumentKind::from_filename(&sanitized) == Some(kind) {
        sanitized
    } else {
        format!("{}.{}", uuid::Uuid::new_v4(), kind.extension())
    }
}
