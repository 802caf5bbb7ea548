//! Article API endpoints
//!
//! - GET /api/v1/articles - Dashboard listing (teachers see every essay)
//! - POST /api/v1/articles - Upload an essay (multipart `title` + `file`)
//! - GET /api/v1/articles/{id} - Single essay with its feedback
//! - PUT /api/v1/articles/{id}/feedback - Teacher rewrites the feedback

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::extract::ExtractError;
use crate::i18n::Messages;
use crate::models::{Article, OutcomeStatus};
use crate::services::{ArticleServiceError, UploadError, UploadRequest};

/// Room for the multipart framing and the title part around the file
const MULTIPART_OVERHEAD: usize = 64 * 1024;

#[derive(Debug, Serialize)]
pub struct ArticleListResponse {
    pub articles: Vec<Article>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub article: Article,
    pub extraction: OutcomeStatus,
    pub feedback_status: OutcomeStatus,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateFeedbackRequest {
    pub feedback: String,
}

#[derive(Debug, Serialize)]
pub struct UpdateFeedbackResponse {
    pub article: Article,
    pub message: String,
}

/// Article routes; every route needs an authenticated user
pub fn router(max_file_size: u64) -> Router<AppState> {
    let body_limit = usize::try_from(max_file_size)
        .unwrap_or(usize::MAX)
        .saturating_add(MULTIPART_OVERHEAD);

    Router::new()
        .route(
            "/",
            get(list_articles).post(upload_article).layer(DefaultBodyLimit::max(body_limit)),
        )
        .route("/{id}", get(get_article))
        .route("/{id}/feedback", put(update_feedback))
}

/// GET /api/v1/articles
async fn list_articles(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<ArticleListResponse>, ApiError> {
    let articles = state
        .article_service
        .list_for(&user.0)
        .await
        .map_err(article_error)?;

    Ok(Json(ArticleListResponse {
        total: articles.len(),
        articles,
    }))
}

/// POST /api/v1/articles
async fn upload_article(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let mut title: Option<String> = None;
    let mut file: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        match field.name() {
            Some("title") => {
                title = Some(field.text().await.map_err(multipart_error)?);
            }
            Some("file") => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let data = field.bytes().await.map_err(multipart_error)?;
                file = Some((filename, data.to_vec()));
            }
            _ => {}
        }
    }

    let title = title.ok_or_else(|| ApiError::validation_error("Missing 'title' field"))?;
    let (filename, data) = file.ok_or_else(|| ApiError::validation_error("Missing 'file' field"))?;
    if filename.is_empty() {
        return Err(ApiError::validation_error("No file selected"));
    }

    let report = state
        .upload_service
        .upload(UploadRequest {
            title,
            filename,
            data,
            user_id: user.0.id,
        })
        .await
        .map_err(|e| upload_error(e, &state.messages))?;

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            article: report.article,
            extraction: report.extraction,
            feedback_status: report.feedback,
            message: state.messages.upload_succeeded().to_string(),
        }),
    ))
}

/// GET /api/v1/articles/{id}
async fn get_article(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<Json<Article>, ApiError> {
    let article = state
        .article_service
        .get_for(&user.0, id)
        .await
        .map_err(article_error)?;

    Ok(Json(article))
}

/// PUT /api/v1/articles/{id}/feedback
async fn update_feedback(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
    Json(body): Json<UpdateFeedbackRequest>,
) -> Result<Json<UpdateFeedbackResponse>, ApiError> {
    let article = state
        .article_service
        .update_feedback(&user.0, id, &body.feedback)
        .await
        .map_err(|e| match e {
            ArticleServiceError::Forbidden(_) => ApiError::forbidden(state.messages.teacher_only()),
            other => article_error(other),
        })?;

    Ok(Json(UpdateFeedbackResponse {
        article,
        message: state.messages.feedback_updated().to_string(),
    }))
}

fn multipart_error(e: axum::extract::multipart::MultipartError) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::payload_too_large(e.body_text())
    } else {
        ApiError::validation_error(format!("Failed to read multipart: {}", e))
    }
}

fn article_error(e: ArticleServiceError) -> ApiError {
    match e {
        ArticleServiceError::NotFound(id) => ApiError::not_found(format!("Article {} not found", id)),
        ArticleServiceError::Forbidden(reason) => ApiError::forbidden(reason),
        ArticleServiceError::InternalError(e) => ApiError::internal_error(e.to_string()),
    }
}

fn upload_error(e: UploadError, messages: &Messages) -> ApiError {
    let stage = serde_json::json!({ "stage": e.stage().to_string() });
    match e {
        UploadError::EmptyTitle => ApiError::validation_error(e.to_string()),
        UploadError::UnsupportedFormat(_) => ApiError::unsupported_format(messages.unsupported_format()),
        UploadError::TooLarge { .. } => ApiError::payload_too_large(e.to_string()),
        UploadError::Extraction(ExtractError::Malformed { .. })
        | UploadError::Extraction(ExtractError::InvalidEncoding { .. }) => {
            ApiError::with_details("VALIDATION_ERROR", e.to_string(), stage)
        }
        UploadError::Persist(inner) => article_error(inner),
        other => ApiError::with_details("INTERNAL_ERROR", other.to_string(), stage),
    }
}
