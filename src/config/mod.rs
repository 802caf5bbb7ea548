//! Configuration management
//!
//! Configuration is read from `config.yml` and can be overridden with
//! `ESSAYFEED_*` environment variables. Missing values fall back to defaults,
//! so an absent or empty file is a valid configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::extract::DocumentKind;
use crate::i18n::Locale;

/// Prefix shared by all environment overrides
const ENV_PREFIX: &str = "ESSAYFEED_";

/// Instruction sent ahead of every essay
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are an assistant that excels in constructive feedback for the given student essay. Your reply should be in the main language used in the essay.";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub upload: UploadConfig,
    #[serde(default)]
    pub feedback: FeedbackConfig,
    #[serde(default)]
    pub session: SessionConfig,
    /// Language of every user-facing message
    #[serde(default)]
    pub locale: Locale,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
    /// CORS allowed origin
    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origin: default_cors_origin(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_cors_origin() -> String {
    "http://localhost:3000".to_string()
}

/// Database configuration (SQLite)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database file path or `sqlite:` URL
    #[serde(default = "default_database_url")]
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
        }
    }
}

fn default_database_url() -> String {
    "data/essayfeed.db".to_string()
}

/// Upload configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Upload directory path
    #[serde(default = "default_upload_path")]
    pub path: PathBuf,
    /// Maximum file size in bytes (default: 10MB)
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
    /// Accepted file extensions, lowercase without the dot
    #[serde(default = "default_allowed_extensions")]
    pub allowed_extensions: Vec<String>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            path: default_upload_path(),
            max_file_size: default_max_file_size(),
            allowed_extensions: default_allowed_extensions(),
        }
    }
}

fn default_upload_path() -> PathBuf {
    PathBuf::from("uploads")
}

fn default_max_file_size() -> u64 {
    10 * 1024 * 1024 // 10MB
}

fn default_allowed_extensions() -> Vec<String> {
    DocumentKind::ALL
        .iter()
        .map(|kind| kind.extension().to_string())
        .collect()
}

impl UploadConfig {
    /// Kind of `filename` if its extension is both supported and enabled
    pub fn accepted_kind(&self, filename: &str) -> Option<DocumentKind> {
        let kind = DocumentKind::from_filename(filename)?;
        self.allowed_extensions
            .iter()
            .any(|ext| ext.eq_ignore_ascii_case(kind.extension()))
            .then_some(kind)
    }
}

/// Feedback service configuration (OpenAI-compatible chat completions)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackConfig {
    /// API key; without one every request degrades
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Upper bound on the length of the generated feedback
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
    /// Request timeout; unset means the client default
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_base_url(),
            model: default_model(),
            max_tokens: default_max_tokens(),
            system_prompt: default_system_prompt(),
            timeout_secs: None,
        }
    }
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_max_tokens() -> u32 {
    500
}

fn default_system_prompt() -> String {
    DEFAULT_SYSTEM_PROMPT.to_string()
}

impl FeedbackConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// Session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Days a login stays valid
    #[serde(default = "default_expiration_days")]
    pub expiration_days: i64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            expiration_days: default_expiration_days(),
        }
    }
}

fn default_expiration_days() -> i64 {
    7
}

/// Error type for configuration parsing
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    FileRead {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{path}': {message}")]
    ParseError { path: String, message: String },
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

impl Config {
    /// Load configuration from file
    ///
    /// A missing or empty file yields the defaults. Invalid YAML is an error
    /// that names the offending line and column.
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.display().to_string(),
            source: e,
        })?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config = serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.display().to_string(),
            message: format_yaml_error(&e),
        })?;

        Ok(config)
    }

    /// Load configuration from file with environment variable overrides
    ///
    /// Overrides follow the pattern `ESSAYFEED_<SECTION>_<KEY>`, for example
    /// `ESSAYFEED_SERVER_PORT` or `ESSAYFEED_FEEDBACK_MODEL`, plus
    /// `ESSAYFEED_LOCALE`. `OPENAI_API_KEY` is used when no API key is
    /// configured any other way.
    pub fn load_with_env(path: &std::path::Path) -> anyhow::Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides to the configuration
    fn apply_env_overrides(&mut self) {
        if let Some(host) = env("SERVER_HOST") {
            self.server.host = host;
        }
        if let Some(port) = env_parsed("SERVER_PORT") {
            self.server.port = port;
        }
        if let Some(cors_origin) = env("SERVER_CORS_ORIGIN") {
            self.server.cors_origin = cors_origin;
        }

        if let Some(url) = env("DATABASE_URL") {
            self.database.url = url;
        }

        if let Some(path) = env("UPLOAD_PATH") {
            self.upload.path = PathBuf::from(path);
        }
        if let Some(size) = env_parsed("UPLOAD_MAX_FILE_SIZE") {
            self.upload.max_file_size = size;
        }

        if let Some(key) = env("FEEDBACK_API_KEY") {
            self.feedback.api_key = Some(key);
        } else if self.feedback.api_key.is_none() {
            if let Ok(key) = std::env::var("OPENAI_API_KEY") {
                self.feedback.api_key = Some(key);
            }
        }
        if let Some(base_url) = env("FEEDBACK_BASE_URL") {
            self.feedback.base_url = base_url;
        }
        if let Some(model) = env("FEEDBACK_MODEL") {
            self.feedback.model = model;
        }
        if let Some(max_tokens) = env_parsed("FEEDBACK_MAX_TOKENS") {
            self.feedback.max_tokens = max_tokens;
        }
        if let Some(timeout) = env_parsed("FEEDBACK_TIMEOUT_SECS") {
            self.feedback.timeout_secs = Some(timeout);
        }

        if let Some(locale) = env_parsed("LOCALE") {
            self.locale = locale;
        }
    }

    /// Check values that parse fine but cannot work
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.upload.allowed_extensions.is_empty() {
            return Err(ConfigError::ValidationError(
                "upload.allowed_extensions must not be empty".to_string(),
            ));
        }
        if let Some(unknown) = self
            .upload
            .allowed_extensions
            .iter()
            .find(|ext| DocumentKind::from_extension(ext).is_none())
        {
            return Err(ConfigError::ValidationError(format!(
                "upload.allowed_extensions contains unsupported extension '{}'",
                unknown
            )));
        }
        if self.upload.max_file_size == 0 {
            return Err(ConfigError::ValidationError(
                "upload.max_file_size must be greater than 0".to_string(),
            ));
        }
        if self.feedback.max_tokens == 0 {
            return Err(ConfigError::ValidationError(
                "feedback.max_tokens must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

fn env(key: &str) -> Option<String> {
    std::env::var(format!("{}{}", ENV_PREFIX, key)).ok()
}

/// Unparseable values are ignored
fn env_parsed<T: std::str::FromStr>(key: &str) -> Option<T> {
    env(key).and_then(|value| value.trim().parse().ok())
}

/// Format YAML parsing error with location and context
fn format_yaml_error(e: &serde_yaml::Error) -> String {
    if let Some(location) = e.location() {
        format!(
            "at line {}, column {}: {}",
            location.line(),
            location.column(),
            e
        )
    } else {
        e.to_string()
    }
}

// Shared by every test that touches process environment variables
#[cfg(test)]
static CONFIG_ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const ENV_KEYS: &[&str] = &[
        "ESSAYFEED_SERVER_HOST",
        "ESSAYFEED_SERVER_PORT",
        "ESSAYFEED_SERVER_CORS_ORIGIN",
        "ESSAYFEED_DATABASE_URL",
        "ESSAYFEED_UPLOAD_PATH",
        "ESSAYFEED_UPLOAD_MAX_FILE_SIZE",
        "ESSAYFEED_FEEDBACK_API_KEY",
        "ESSAYFEED_FEEDBACK_BASE_URL",
        "ESSAYFEED_FEEDBACK_MODEL",
        "ESSAYFEED_FEEDBACK_MAX_TOKENS",
        "ESSAYFEED_FEEDBACK_TIMEOUT_SECS",
        "ESSAYFEED_LOCALE",
        "OPENAI_API_KEY",
    ];

    fn lock_env() -> std::sync::MutexGuard<'static, ()> {
        let guard = super::CONFIG_ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
        for key in ENV_KEYS {
            std::env::remove_var(key);
        }
        guard
    }

    fn config_file(yaml: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", yaml).unwrap();
        file
    }

    #[test]
    fn test_load_missing_file_returns_defaults() {
        let config = Config::load(std::path::Path::new("nonexistent_config.yml")).unwrap();

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.database.url, "data/essayfeed.db");
        assert_eq!(config.upload.path, PathBuf::from("uploads"));
        assert_eq!(config.upload.max_file_size, 10 * 1024 * 1024);
        assert_eq!(config.upload.allowed_extensions.len(), 5);
        assert_eq!(config.feedback.api_key, None);
        assert_eq!(config.feedback.model, "gpt-4o-mini");
        assert_eq!(config.feedback.max_tokens, 500);
        assert_eq!(config.feedback.system_prompt, DEFAULT_SYSTEM_PROMPT);
        assert_eq!(config.feedback.timeout(), None);
        assert_eq!(config.session.expiration_days, 7);
        assert_eq!(config.locale, Locale::En);
    }

    #[test]
    fn test_load_empty_file_returns_defaults() {
        let file = config_file("");
        let config = Config::load(file.path()).unwrap();

        assert_eq!(config.server.port, 8080);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_partial_config_fills_defaults() {
        let file = config_file("feedback:\n  model: gpt-4o\nlocale: tr\n");
        let config = Config::load(file.path()).unwrap();

        assert_eq!(config.feedback.model, "gpt-4o");
        assert_eq!(config.feedback.max_tokens, 500);
        assert_eq!(config.feedback.base_url, "https://api.openai.com/v1");
        assert_eq!(config.locale, Locale::Tr);
        assert_eq!(config.server.host, "0.0.0.0");
    }

    #[test]
    fn test_load_full_config() {
        let file = config_file(
            r#"
server:
  host: "127.0.0.1"
  port: 9000
  cors_origin: "https://school.example"
database:
  url: "sqlite::memory:"
upload:
  path: "/srv/essays"
  max_file_size: 2048
  allowed_extensions: [txt, pdf]
feedback:
  api_key: "sk-test"
  base_url: "http://localhost:11434/v1"
  model: "local"
  max_tokens: 200
  system_prompt: "Be brief."
  timeout_secs: 30
session:
  expiration_days: 1
locale: tr
"#,
        );
        let config = Config::load(file.path()).unwrap();

        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.cors_origin, "https://school.example");
        assert_eq!(config.database.url, "sqlite::memory:");
        assert_eq!(config.upload.path, PathBuf::from("/srv/essays"));
        assert_eq!(config.upload.max_file_size, 2048);
        assert_eq!(config.upload.allowed_extensions, vec!["txt", "pdf"]);
        assert_eq!(config.feedback.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.feedback.base_url, "http://localhost:11434/v1");
        assert_eq!(config.feedback.max_tokens, 200);
        assert_eq!(config.feedback.system_prompt, "Be brief.");
        assert_eq!(config.feedback.timeout(), Some(Duration::from_secs(30)));
        assert_eq!(config.session.expiration_days, 1);
        assert_eq!(config.locale, Locale::Tr);
    }

    #[test]
    fn test_load_invalid_yaml_returns_error() {
        let file = config_file("server:\n  port: not_a_number\n");
        let err = Config::load(file.path()).unwrap_err().to_string();

        assert!(err.contains("parse"));
        assert!(err.contains("line"));
    }

    #[test]
    fn test_load_unknown_locale_is_error() {
        let file = config_file("locale: de\n");
        assert!(Config::load(file.path()).is_err());
    }

    #[test]
    fn test_accepted_kind_respects_allow_list() {
        let upload = UploadConfig {
            allowed_extensions: vec!["txt".to_string(), "PDF".to_string()],
            ..UploadConfig::default()
        };

        assert_eq!(upload.accepted_kind("essay.TXT"), Some(DocumentKind::Text));
        assert_eq!(upload.accepted_kind("essay.pdf"), Some(DocumentKind::Pdf));
        assert_eq!(upload.accepted_kind("essay.docx"), None);
        assert_eq!(upload.accepted_kind("essay.exe"), None);
        assert_eq!(upload.accepted_kind("essay"), None);
    }

    #[test]
    fn test_validate_rejects_unknown_extension() {
        let mut config = Config::default();
        config.upload.allowed_extensions.push("exe".to_string());

        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(ref msg) if msg.contains("exe")));
    }

    #[test]
    fn test_validate_rejects_empty_allow_list_and_zero_limits() {
        let mut config = Config::default();
        config.upload.allowed_extensions.clear();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.upload.max_file_size = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.feedback.max_tokens = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_override_server_and_database() {
        let _guard = lock_env();
        let file = config_file("server:\n  host: \"0.0.0.0\"\n  port: 8080\n");

        std::env::set_var("ESSAYFEED_SERVER_HOST", "192.168.1.1");
        std::env::set_var("ESSAYFEED_SERVER_PORT", "4000");
        std::env::set_var("ESSAYFEED_DATABASE_URL", "/tmp/test.db");

        let config = Config::load_with_env(file.path()).unwrap();

        assert_eq!(config.server.host, "192.168.1.1");
        assert_eq!(config.server.port, 4000);
        assert_eq!(config.database.url, "/tmp/test.db");

        for key in ENV_KEYS {
            std::env::remove_var(key);
        }
    }

    #[test]
    fn test_env_override_feedback_and_locale() {
        let _guard = lock_env();
        let file = config_file("");

        std::env::set_var("ESSAYFEED_FEEDBACK_API_KEY", "sk-env");
        std::env::set_var("ESSAYFEED_FEEDBACK_MODEL", "gpt-4o");
        std::env::set_var("ESSAYFEED_FEEDBACK_MAX_TOKENS", "800");
        std::env::set_var("ESSAYFEED_FEEDBACK_TIMEOUT_SECS", "15");
        std::env::set_var("ESSAYFEED_LOCALE", "tr");
        std::env::set_var("ESSAYFEED_UPLOAD_MAX_FILE_SIZE", "1024");

        let config = Config::load_with_env(file.path()).unwrap();

        assert_eq!(config.feedback.api_key.as_deref(), Some("sk-env"));
        assert_eq!(config.feedback.model, "gpt-4o");
        assert_eq!(config.feedback.max_tokens, 800);
        assert_eq!(config.feedback.timeout_secs, Some(15));
        assert_eq!(config.locale, Locale::Tr);
        assert_eq!(config.upload.max_file_size, 1024);

        for key in ENV_KEYS {
            std::env::remove_var(key);
        }
    }

    #[test]
    fn test_openai_key_is_fallback_only() {
        let _guard = lock_env();

        std::env::set_var("OPENAI_API_KEY", "sk-fallback");
        let config = Config::load_with_env(config_file("").path()).unwrap();
        assert_eq!(config.feedback.api_key.as_deref(), Some("sk-fallback"));

        let config =
            Config::load_with_env(config_file("feedback:\n  api_key: sk-file\n").path()).unwrap();
        assert_eq!(config.feedback.api_key.as_deref(), Some("sk-file"));

        std::env::set_var("ESSAYFEED_FEEDBACK_API_KEY", "sk-env");
        let config = Config::load_with_env(config_file("").path()).unwrap();
        assert_eq!(config.feedback.api_key.as_deref(), Some("sk-env"));

        for key in ENV_KEYS {
            std::env::remove_var(key);
        }
    }

    #[test]
    fn test_env_invalid_values_ignored() {
        let _guard = lock_env();

        std::env::set_var("ESSAYFEED_SERVER_PORT", "not_a_port");
        std::env::set_var("ESSAYFEED_LOCALE", "klingon");

        let config = Config::load_with_env(config_file("").path()).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.locale, Locale::En);

        for key in ENV_KEYS {
            std::env::remove_var(key);
        }
    }

    #[test]
    fn test_load_with_env_validates() {
        let _guard = lock_env();
        let file = config_file("upload:\n  allowed_extensions: [txt, doc]\n");

        assert!(Config::load_with_env(file.path()).is_err());
    }
}
