//! User-facing messages
//!
//! A deployment speaks one language. Every message a user can read (API
//! notices and the degraded-stage messages that end up stored as feedback)
//! comes from the catalog selected by the configured [`Locale`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Deployment language
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    /// English (default)
    #[default]
    En,
    /// Turkish
    Tr,
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locale::En => write!(f, "en"),
            Locale::Tr => write!(f, "tr"),
        }
    }
}

impl FromStr for Locale {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "en" => Ok(Locale::En),
            "tr" => Ok(Locale::Tr),
            _ => Err(anyhow::anyhow!("Unsupported locale: {}", s)),
        }
    }
}

/// Message catalog for one locale
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Messages {
    locale: Locale,
}

impl Messages {
    pub fn new(locale: Locale) -> Self {
        Self { locale }
    }

    /// Stored in place of extracted text when a document cannot be read
    pub fn extraction_failed(&self, detail: impl fmt::Display) -> String {
        match self.locale {
            Locale::En => format!("Error while processing the file: {}", detail),
            Locale::Tr => format!("Dosya işlenirken hata oluştu: {}", detail),
        }
    }

    /// Stored in place of feedback when the feedback service cannot be reached
    pub fn feedback_failed(&self, detail: impl fmt::Display) -> String {
        match self.locale {
            Locale::En => format!("Error while generating feedback: {}", detail),
            Locale::Tr => format!("Geribildirim oluşturulurken hata oluştu: {}", detail),
        }
    }

    pub fn unsupported_format(&self) -> &'static str {
        match self.locale {
            Locale::En => "File format is not supported.",
            Locale::Tr => "Dosya formatı desteklenmiyor.",
        }
    }

    pub fn upload_succeeded(&self) -> &'static str {
        match self.locale {
            Locale::En => "Essay uploaded and feedback generated successfully!",
            Locale::Tr => "Makale yüklendi ve geribildirim başarıyla oluşturuldu!",
        }
    }

    pub fn feedback_updated(&self) -> &'static str {
        match self.locale {
            Locale::En => "Feedback updated successfully!",
            Locale::Tr => "Geribildirim başarıyla güncellendi!",
        }
    }

    pub fn login_failed(&self) -> &'static str {
        match self.locale {
            Locale::En => "Login failed. Please check your username and password.",
            Locale::Tr => "Giriş Başarısız. Lütfen kullanıcı adı ve şifrenizi kontrol edin.",
        }
    }

    pub fn login_succeeded(&self) -> &'static str {
        match self.locale {
            Locale::En => "Logged in successfully!",
            Locale::Tr => "Giriş başarılı!",
        }
    }

    pub fn account_created(&self) -> &'static str {
        match self.locale {
            Locale::En => "Account created successfully!",
            Locale::Tr => "Hesap başarıyla oluşturuldu!",
        }
    }

    pub fn teacher_only(&self) -> &'static str {
        match self.locale {
            Locale::En => "Only teachers can edit feedback.",
            Locale::Tr => "Geribildirimi yalnızca öğretmenler düzenleyebilir.",
        }
    }
}
