//! Word (.docx) reader
//!
//! Returns the text of each top-level body paragraph. Paragraphs inside
//! tables are not part of the body sequence and are skipped.

use docx_rs::{read_docx, DocumentChild, Paragraph, ParagraphChild, RunChild};

/// Extract the body paragraphs of a .docx package, in document order.
pub fn paragraphs(data: &[u8]) -> Result<Vec<String>, String> {
    let docx = read_docx(data).map_err(|e| format!("Invalid DOCX package: {}", e))?;

    Ok(docx
        .document
        .children
        .iter()
        .filter_map(|child| match child {
            DocumentChild::Paragraph(para) => Some(paragraph_text(para)),
            _ => None,
        })
        .collect())
}

/// Runs concatenated; tabs and breaks kept as whitespace
fn paragraph_text(para: &Paragraph) -> String {
    let mut text = String::new();
    for child in &para.children {
        if let ParagraphChild::Run(run) = child {
            for run_child in &run.children {
                match run_child {
                    RunChild::Text(t) => text.push_str(&t.text),
                    RunChild::Tab(_) => text.push('\t'),
                    RunChild::Break(_) => text.push('\n'),
                    _ => {}
                }
            }
        }
    }
    text
}
