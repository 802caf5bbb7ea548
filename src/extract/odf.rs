//! OpenDocument text (.odt) reader

use std::io::{Cursor, Read};

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use zip::ZipArchive;

const CONTENT_PART: &str = "content.xml";

/// Longest run of spaces a single `text:s` element may expand to
pub(crate) const MAX_SPACE_RUN: usize = 1024;

/// Upper bound on the extracted text, in bytes
pub(crate) const MAX_TEXT_BYTES: usize = 16 * 1024 * 1024;

/// Extract the text of an .odt package.
///
/// Every paragraph and heading becomes one line. Spacing elements
/// (`text:s`, `text:tab`, `text:line-break`) are expanded.
pub fn text(data: &[u8]) -> Result<String, String> {
    let mut archive =
        ZipArchive::new(Cursor::new(data)).map_err(|e| format!("Invalid ODF package: {}", e))?;

    let mut content = String::new();
    archive
        .by_name(CONTENT_PART)
        .map_err(|e| format!("Missing {}: {}", CONTENT_PART, e))?
        .read_to_string(&mut content)
        .map_err(|e| format!("Failed to read {}: {}", CONTENT_PART, e))?;

    Ok(block_lines(&content)?.join("\n"))
}

fn is_block(name: &[u8]) -> bool {
    name == b"text:p" || name == b"text:h"
}

/// Lines collected so far, with a running size check
#[derive(Default)]
struct Lines {
    done: Vec<String>,
    /// Open block and how many elements deep inside it the reader is
    current: Option<(usize, String)>,
    bytes: usize,
}

impl Lines {
    fn push_str(&mut self, s: &str) -> Result<(), String> {
        if let Some((_, line)) = self.current.as_mut() {
            self.bytes += s.len();
            if self.bytes > MAX_TEXT_BYTES {
                return Err(format!("Document text exceeds {} bytes", MAX_TEXT_BYTES));
            }
            line.push_str(s);
        }
        Ok(())
    }

    fn spacing(&mut self, element: &BytesStart<'_>) -> Result<(), String> {
        match element.name().as_ref() {
            b"text:s" => {
                let count = element
                    .try_get_attribute("text:c")
                    .ok()
                    .flatten()
                    .and_then(|attr| std::str::from_utf8(&attr.value).ok()?.trim().parse::<usize>().ok())
                    .unwrap_or(1)
                    .min(MAX_SPACE_RUN);
                self.push_str(&" ".repeat(count))
            }
            b"text:tab" => self.push_str("\t"),
            b"text:line-break" => self.push_str("\n"),
            _ => Ok(()),
        }
    }
}

fn block_lines(content: &str) -> Result<Vec<String>, String> {
    let mut reader = Reader::from_str(content);
    let mut lines = Lines::default();

    loop {
        let event = reader
            .read_event()
            .map_err(|e| format!("Invalid {}: {}", CONTENT_PART, e))?;
        match event {
            Event::Start(element) => match lines.current.as_mut() {
                Some((depth, _)) => *depth += 1,
                None if is_block(element.name().as_ref()) => {
                    lines.current = Some((0, String::new()));
                }
                None => {}
            },
            Event::Empty(element) => {
                if lines.current.is_some() {
                    lines.spacing(&element)?;
                } else if is_block(element.name().as_ref()) {
                    lines.done.push(String::new());
                }
            }
            Event::End(_) => match lines.current.as_mut() {
                Some((0, _)) => {
                    if let Some((_, line)) = lines.current.take() {
                        lines.done.push(line);
                    }
                }
                Some((depth, _)) => *depth -= 1,
                None => {}
            },
            Event::Text(text) => {
                if lines.current.is_some() {
                    let text = text
                        .unescape()
                        .map_err(|e| format!("Invalid {}: {}", CONTENT_PART, e))?;
                    lines.push_str(&text)?;
                }
            }
            Event::CData(data) => {
                if lines.current.is_some() {
                    lines.push_str(&String::from_utf8_lossy(&data))?;
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(lines.done)
}
