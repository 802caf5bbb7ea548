//! Text extraction
//!
//! Turns a stored essay file into plain text. The set of accepted formats
//! and the way each one is read are both defined by [`DocumentKind`]: an
//! extension is accepted exactly when it maps to a kind.
//!
//! Failure policy differs by format:
//! - `txt`, `docx`, `pdf`: read or parse errors are returned as
//!   [`ExtractError`] and abort the upload.
//! - `rtf`, `odt`: conversion errors become [`Outcome::Degraded`] with a
//!   localized message, and the upload carries on.

mod docx;
mod odf;
mod rtf;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::i18n::Messages;
use crate::models::Outcome;

/// Supported essay formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    /// Plain UTF-8 text (.txt)
    Text,
    /// Office Open XML word processing (.docx)
    Word,
    /// Portable Document Format (.pdf)
    Pdf,
    /// Rich Text Format (.rtf)
    RichText,
    /// OpenDocument text (.odt)
    OpenDocument,
}

impl DocumentKind {
    pub const ALL: [DocumentKind; 5] = [
        DocumentKind::Text,
        DocumentKind::Pdf,
        DocumentKind::Word,
        DocumentKind::RichText,
        DocumentKind::OpenDocument,
    ];

    /// Map a file extension (without the dot, any case) to its kind
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "txt" => Some(DocumentKind::Text),
            "docx" => Some(DocumentKind::Word),
            "pdf" => Some(DocumentKind::Pdf),
            "rtf" => Some(DocumentKind::RichText),
            "odt" => Some(DocumentKind::OpenDocument),
            _ => None,
        }
    }

    /// Classify a file name by the text after its last `.`
    pub fn from_filename(name: &str) -> Option<Self> {
        let (_, ext) = name.rsplit_once('.')?;
        Self::from_extension(ext)
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.file_name()
            .and_then(|name| name.to_str())
            .and_then(Self::from_filename)
    }

    /// Canonical extension, lowercase and without the dot
    pub fn extension(&self) -> &'static str {
        match self {
            DocumentKind::Text => "txt",
            DocumentKind::Word => "docx",
            DocumentKind::Pdf => "pdf",
            DocumentKind::RichText => "rtf",
            DocumentKind::OpenDocument => "odt",
        }
    }

    /// Whether a conversion failure degrades to a message instead of failing
    pub fn degrades_on_failure(&self) -> bool {
        matches!(self, DocumentKind::RichText | DocumentKind::OpenDocument)
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Errors that abort extraction
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    /// The file name does not map to a supported kind
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("Failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A .txt file that is not valid UTF-8
    #[error("'{path}' is not valid UTF-8 text")]
    InvalidEncoding { path: PathBuf },

    /// A .docx or .pdf file that could not be parsed
    #[error("Malformed {kind} document: {message}")]
    Malformed { kind: DocumentKind, message: String },
}

/// Reads stored essays into plain text
#[derive(Debug, Clone, Copy)]
pub struct TextExtractor {
    messages: Messages,
}

impl TextExtractor {
    pub fn new(messages: Messages) -> Self {
        Self { messages }
    }

    /// Extract the text of the file at `path`, choosing the reader from its extension.
    pub fn extract(&self, path: &Path) -> Result<Outcome, ExtractError> {
        let kind = DocumentKind::from_path(path)
            .ok_or_else(|| ExtractError::UnsupportedFormat(path.display().to_string()))?;
        self.extract_as(kind, path)
    }

    /// Extract the text of the file at `path` as a document of `kind`.
    pub fn extract_as(&self, kind: DocumentKind, path: &Path) -> Result<Outcome, ExtractError> {
        let data = std::fs::read(path).map_err(|source| ExtractError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        if kind == DocumentKind::Text {
            return String::from_utf8(data)
                .map(Outcome::Complete)
                .map_err(|_| ExtractError::InvalidEncoding {
                    path: path.to_path_buf(),
                });
        }

        // Document parsers may panic on hostile input
        let converted = std::panic::catch_unwind(|| convert(kind, &data))
            .unwrap_or_else(|_| Err(format!("{} reader aborted on malformed input", kind)));

        match converted {
            Ok(text) => Ok(Outcome::Complete(text)),
            Err(message) if kind.degrades_on_failure() => {
                tracing::warn!(path = %path.display(), %kind, "Extraction degraded: {}", message);
                Ok(Outcome::Degraded(self.messages.extraction_failed(message)))
            }
            Err(message) => Err(ExtractError::Malformed { kind, message }),
        }
    }
}

/// Text of a binary document format
fn convert(kind: DocumentKind, data: &[u8]) -> Result<String, String> {
    match kind {
        DocumentKind::Text => String::from_utf8(data.to_vec()).map_err(|e| e.to_string()),
        DocumentKind::Word => docx::paragraphs(data).map(|paragraphs| paragraphs.join("\n")),
        DocumentKind::Pdf => pdf_extract::extract_text_from_mem_by_pages(data)
            .map(join_pages)
            .map_err(|e| e.to_string()),
        DocumentKind::RichText => rtf::text(data),
        DocumentKind::OpenDocument => odf::text(data),
    }
}

/// Pages are concatenated in order with no separator
fn join_pages(pages: Vec<String>) -> String {
    pages.concat()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::i18n::Locale;
    use proptest::prelude::*;
    use std::fs;
    use tempfile::TempDir;

    fn extractor() -> TextExtractor {
        TextExtractor::new(Messages::new(Locale::En))
    }

    fn write(dir: &TempDir, name: &str, data: &[u8]) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, data).unwrap();
        path
    }

    /// Assemble a PDF with one Helvetica text line per page
    fn build_pdf(pages: &[&str]) -> Vec<u8> {
        let mut objects: Vec<String> = Vec::new();
        let kids: Vec<String> = (0..pages.len()).map(|i| format!("{} 0 R", 4 + 2 * i)).collect();
        objects.push("<< /Type /Catalog /Pages 2 0 R >>".to_string());
        objects.push(format!("<< /Type /Pages /Kids [{}] /Count {} >>", kids.join(" "), pages.len()));
        objects.push("<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_string());
        for (i, text) in pages.iter().enumerate() {
            let stream = format!("BT /F1 24 Tf 72 700 Td ({}) Tj ET", text);
            objects.push(format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Resources << /Font << /F1 3 0 R >> >> /Contents {} 0 R >>",
                5 + 2 * i
            ));
            objects.push(format!("<< /Length {} >>\nstream\n{}\nendstream", stream.len(), stream));
        }

        let mut out = b"%PDF-1.4\n".to_vec();
        let mut offsets = Vec::new();
        for (i, body) in objects.iter().enumerate() {
            offsets.push(out.len());
            out.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", i + 1, body).as_bytes());
        }
        let xref_at = out.len();
        out.extend_from_slice(format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1).as_bytes());
        for offset in offsets {
            out.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
        }
        out.extend_from_slice(
            format!(
                "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
                objects.len() + 1,
                xref_at
            )
            .as_bytes(),
        );
        out
    }

    #[test]
    fn test_kind_from_extension_case_insensitive() {
        assert_eq!(DocumentKind::from_extension("TXT"), Some(DocumentKind::Text));
        assert_eq!(DocumentKind::from_extension("Docx"), Some(DocumentKind::Word));
        assert_eq!(DocumentKind::from_extension("pdf"), Some(DocumentKind::Pdf));
        assert_eq!(DocumentKind::from_extension("rTf"), Some(DocumentKind::RichText));
        assert_eq!(DocumentKind::from_extension("ODT"), Some(DocumentKind::OpenDocument));
        assert_eq!(DocumentKind::from_extension("doc"), None);
        assert_eq!(DocumentKind::from_extension(""), None);
    }

    #[test]
    fn test_kind_from_filename_uses_last_dot() {
        assert_eq!(DocumentKind::from_filename("essay.final.pdf"), Some(DocumentKind::Pdf));
        assert_eq!(DocumentKind::from_filename("essay.pdf.exe"), None);
        assert_eq!(DocumentKind::from_filename("essay"), None);
        assert_eq!(DocumentKind::from_filename("essay."), None);
        assert_eq!(DocumentKind::from_filename(".txt"), Some(DocumentKind::Text));
    }

    #[test]
    fn test_all_kinds_round_trip_extension() {
        for kind in DocumentKind::ALL {
            assert_eq!(DocumentKind::from_extension(kind.extension()), Some(kind));
        }
    }

    #[test]
    fn test_txt_is_verbatim() {
        let dir = TempDir::new().unwrap();
        let content = "Başlık\r\n\nLine two with ünïcödé\t and trailing space ";
        let path = write(&dir, "essay.txt", content.as_bytes());

        assert_eq!(extractor().extract(&path).unwrap(), Outcome::Complete(content.to_string()));
    }

    #[test]
    fn test_txt_invalid_utf8_is_error() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "essay.txt", &[0x66, 0xFF, 0xFE, 0x6F]);

        assert!(matches!(extractor().extract(&path), Err(ExtractError::InvalidEncoding { .. })));
    }

    #[test]
    fn test_missing_file_is_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing.odt");

        assert!(matches!(extractor().extract(&path), Err(ExtractError::Io { .. })));
    }

    #[test]
    fn test_unsupported_extension_is_error() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "essay.doc", b"data");

        assert!(matches!(extractor().extract(&path), Err(ExtractError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_docx_paragraphs_joined_with_newline() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "essay.docx", &docx::tests::build_docx(&["A", "B"]));

        assert_eq!(extractor().extract(&path).unwrap(), Outcome::Complete("A\nB".to_string()));
    }

    #[test]
    fn test_malformed_docx_propagates() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "essay.docx", b"not a zip archive");

        let err = extractor().extract(&path).unwrap_err();
        assert!(matches!(err, ExtractError::Malformed { kind: DocumentKind::Word, .. }));
    }

    #[test]
    fn test_pages_concatenated_without_separator() {
        assert_eq!(join_pages(vec!["A".to_string(), "B".to_string()]), "AB");
        assert_eq!(join_pages(Vec::new()), "");
    }

    #[test]
    fn test_pdf_pages_in_order() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "essay.pdf", &build_pdf(&["A", "B"]));

        let outcome = extractor().extract(&path).unwrap();
        assert!(!outcome.is_degraded());
        let compact: String = outcome.as_str().split_whitespace().collect();
        assert_eq!(compact, "AB");
    }

    #[test]
    fn test_malformed_pdf_propagates() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "essay.pdf", b"%PDF-1.4\ngarbage");

        let err = extractor().extract(&path).unwrap_err();
        assert!(matches!(err, ExtractError::Malformed { kind: DocumentKind::Pdf, .. }));
    }

    #[test]
    fn test_rtf_extracts_text() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "essay.rtf", br"{\rtf1\ansi Hello\par World}");

        assert_eq!(
            extractor().extract(&path).unwrap(),
            Outcome::Complete("Hello\nWorld".to_string())
        );
    }

    #[test]
    fn test_odt_extracts_text() {
        let dir = TempDir::new().unwrap();
        let data = odf::tests::build_odt("<text:p>One</text:p><text:p>Two</text:p>");
        let path = write(&dir, "essay.odt", &data);

        assert_eq!(extractor().extract(&path).unwrap(), Outcome::Complete("One\nTwo".to_string()));
    }

    #[test]
    fn test_odt_with_huge_space_count_completes() {
        let dir = TempDir::new().unwrap();
        let data = odf::tests::build_odt(r#"<text:p>a<text:s text:c="18446744073709551615"/>b</text:p>"#);
        let path = write(&dir, "essay.odt", &data);

        let outcome = extractor().extract(&path).unwrap();
        assert!(!outcome.is_degraded());
        assert_eq!(outcome.as_str().len(), odf::MAX_SPACE_RUN + 2);
    }

    #[test]
    fn test_odt_over_size_limit_degrades() {
        let dir = TempDir::new().unwrap();
        let spaces = format!(r#"<text:s text:c="{}"/>"#, odf::MAX_SPACE_RUN);
        let body = format!(
            "<text:p>{}</text:p>",
            spaces.repeat(odf::MAX_TEXT_BYTES / odf::MAX_SPACE_RUN + 1)
        );
        let path = write(&dir, "essay.odt", &odf::tests::build_odt(&body));

        let outcome = extractor().extract(&path).unwrap();
        assert!(outcome.is_degraded());
        assert!(outcome.as_str().starts_with("Error while processing the file: "));
    }

    #[test]
    fn test_broken_rtf_degrades_to_message() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "essay.rtf", b"this is not rtf");

        let outcome = extractor().extract(&path).unwrap();
        assert!(outcome.is_degraded());
        assert!(outcome.as_str().starts_with("Error while processing the file: "));
    }

    #[test]
    fn test_broken_odt_degrades_to_localized_message() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "essay.odt", b"not a package");

        let outcome = TextExtractor::new(Messages::new(Locale::Tr)).extract(&path).unwrap();
        assert!(outcome.is_degraded());
        assert!(outcome.as_str().starts_with("Dosya işlenirken hata oluştu: "));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn property_unknown_extensions_rejected(stem in "[a-z]{1,8}", ext in "[a-z0-9]{1,5}") {
            let name = format!("{}.{}", stem, ext);
            let known = ["txt", "pdf", "docx", "rtf", "odt"].contains(&ext.as_str());
            prop_assert_eq!(DocumentKind::from_filename(&name).is_some(), known);
        }

        #[test]
        fn property_names_without_dot_rejected(name in "[A-Za-z0-9_ -]{0,16}") {
            prop_assert!(DocumentKind::from_filename(&name).is_none());
        }
    }
}
