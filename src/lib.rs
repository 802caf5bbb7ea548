//! Essayfeed - essay submission with generated feedback and teacher review
//!
//! Students upload essays in common document formats, the text is
//! extracted and sent to a chat-completions service for feedback, and
//! teachers can review and rewrite that feedback.

pub mod api;
pub mod config;
pub mod db;
pub mod extract;
pub mod i18n;
pub mod models;
pub mod services;
