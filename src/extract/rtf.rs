//! Rich Text Format reader
//!
//! Converts an RTF document to plain text: paragraph marks become
//! newlines, escaped and Unicode characters are decoded, and destination
//! groups that carry no body text (font tables, stylesheets, document
//! info, pictures, `\*` extensions) are skipped.

/// Destinations whose content never reaches the body text
const SKIPPED_DESTINATIONS: &[&str] = &[
    "fonttbl",
    "colortbl",
    "stylesheet",
    "listtable",
    "listoverridetable",
    "revtbl",
    "rsidtbl",
    "info",
    "pict",
    "object",
    "header",
    "headerl",
    "headerr",
    "headerf",
    "footer",
    "footerl",
    "footerr",
    "footerf",
    "fldinst",
    "themedata",
    "colorschememapping",
    "datastore",
    "latentstyles",
    "generator",
    "xmlnstbl",
    "mmathPr",
];

/// Windows-1254 (Turkish) differs from 1252 in six positions
const CP1254_OVERRIDES: &[(u8, char)] = &[
    (0xD0, 'Ğ'),
    (0xDD, 'İ'),
    (0xDE, 'Ş'),
    (0xF0, 'ğ'),
    (0xFD, 'ı'),
    (0xFE, 'ş'),
];

/// Windows-1252 code points for 0x80..=0x9F; unassigned slots map to U+FFFD
const CP1252_HIGH: [char; 32] = [
    '€', '\u{FFFD}', '‚', 'ƒ', '„', '…', '†', '‡', 'ˆ', '‰', 'Š', '‹', 'Œ', '\u{FFFD}', 'Ž',
    '\u{FFFD}', '\u{FFFD}', '‘', '’', '“', '”', '•', '–', '—', '˜', '™', 'š', '›', 'œ',
    '\u{FFFD}', 'ž', 'Ÿ',
];

#[derive(Debug, Clone, Copy)]
struct GroupState {
    skip: bool,
    /// Fallback characters to drop after a `\u` escape
    unicode_skip: usize,
}

/// Convert an RTF document to plain text.
pub fn text(data: &[u8]) -> Result<String, String> {
    let start = data
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .ok_or_else(|| "Empty document".to_string())?;
    if !data[start..].starts_with(b"{\\rtf") {
        return Err("Not an RTF document (missing {\\rtf header)".to_string());
    }

    let mut out = String::new();
    let mut stack: Vec<GroupState> = Vec::new();
    let mut state = GroupState { skip: false, unicode_skip: 1 };
    let mut code_page = 1252u32;
    // Characters still to swallow after a \uN escape
    let mut pending_skip = 0usize;
    // Set right after `{`: the next control word names the group's destination
    let mut group_start = false;
    let mut i = start;

    while i < data.len() {
        let byte = data[i];
        match byte {
            b'{' => {
                stack.push(state);
                group_start = true;
                pending_skip = 0;
                i += 1;
                continue;
            }
            b'}' => {
                state = stack
                    .pop()
                    .ok_or_else(|| format!("Unbalanced closing brace at byte {}", i))?;
                pending_skip = 0;
                i += 1;
                group_start = false;
                continue;
            }
            b'\\' => {
                let (control, next) = read_control(data, i + 1)?;
                i = next;
                let at_group_start = std::mem::replace(&mut group_start, false);

                match control {
                    Control::Symbol(symbol) => {
                        if symbol == '*' && at_group_start {
                            state.skip = true;
                            continue;
                        }
                        if let Some(c) = symbol_char(symbol) {
                            emit(&mut out, &state, &mut pending_skip, c);
                        }
                    }
                    Control::Hex(value) => {
                        if pending_skip > 0 {
                            pending_skip -= 1;
                        } else if !state.skip {
                            out.push(decode_byte(value, code_page));
                        }
                    }
                    Control::Word(word, param) => {
                        if SKIPPED_DESTINATIONS.contains(&word) {
                            if at_group_start || word == "fldinst" {
                                state.skip = true;
                            }
                            continue;
                        }
                        match word {
                            "ansicpg" => {
                                if let Some(cp) = param.and_then(|p| u32::try_from(p).ok()) {
                                    code_page = cp;
                                }
                            }
                            "uc" => {
                                state.unicode_skip =
                                    param.and_then(|p| usize::try_from(p).ok()).unwrap_or(1);
                            }
                            "u" => {
                                if let Some(p) = param {
                                    let code = if p < 0 { p + 65536 } else { p };
                                    let c = u32::try_from(code)
                                        .ok()
                                        .and_then(char::from_u32)
                                        .unwrap_or('\u{FFFD}');
                                    if !state.skip {
                                        out.push(c);
                                    }
                                    pending_skip = state.unicode_skip;
                                }
                            }
                            _ => {
                                if let Some(s) = word_text(word) {
                                    for c in s.chars() {
                                        emit(&mut out, &state, &mut pending_skip, c);
                                    }
                                }
                            }
                        }
                    }
                }
                continue;
            }
            b'\r' | b'\n' => {
                i += 1;
                continue;
            }
            _ => {}
        }

        group_start = false;
        // Plain text runs up to the next special byte
        let run_end = data[i..]
            .iter()
            .position(|b| matches!(b, b'{' | b'}' | b'\\' | b'\r' | b'\n'))
            .map(|p| i + p)
            .unwrap_or(data.len());
        for &b in &data[i..run_end] {
            let c = if b.is_ascii() { b as char } else { decode_byte(b, code_page) };
            emit(&mut out, &state, &mut pending_skip, c);
        }
        i = run_end;
    }

    if !stack.is_empty() {
        return Err(format!("Unbalanced document: {} group(s) left open", stack.len()));
    }

    Ok(out)
}

enum Control<'a> {
    Word(&'a str, Option<i32>),
    Symbol(char),
    Hex(u8),
}

/// Parse the control sequence that follows a backslash at `pos`
fn read_control(data: &[u8], pos: usize) -> Result<(Control<'_>, usize), String> {
    let first = *data
        .get(pos)
        .ok_or_else(|| "Document ends inside a control sequence".to_string())?;

    if first.is_ascii_alphabetic() {
        let mut end = pos;
        while end < data.len() && data[end].is_ascii_alphabetic() && end - pos < 32 {
            end += 1;
        }
        let word = std::str::from_utf8(&data[pos..end]).map_err(|e| e.to_string())?;

        let mut num_end = end;
        if num_end < data.len() && data[num_end] == b'-' {
            num_end += 1;
        }
        while num_end < data.len() && data[num_end].is_ascii_digit() && num_end - end < 11 {
            num_end += 1;
        }
        let param = std::str::from_utf8(&data[end..num_end])
            .ok()
            .and_then(|s| s.parse::<i32>().ok());
        let mut next = if param.is_some() { num_end } else { end };
        // A single space delimits the control word and belongs to it
        if next < data.len() && data[next] == b' ' {
            next += 1;
        }
        return Ok((Control::Word(word, param), next));
    }

    if first == b'\'' {
        let hex = data
            .get(pos + 1..pos + 3)
            .and_then(|h| std::str::from_utf8(h).ok())
            .and_then(|h| u8::from_str_radix(h, 16).ok())
            .ok_or_else(|| format!("Invalid hex escape at byte {}", pos))?;
        return Ok((Control::Hex(hex), pos + 3));
    }

    // \<newline> is an alias for \par
    if first == b'\n' || first == b'\r' {
        return Ok((Control::Word("par", None), pos + 1));
    }

    Ok((Control::Symbol(first as char), pos + 1))
}

fn emit(out: &mut String, state: &GroupState, pending_skip: &mut usize, c: char) {
    if *pending_skip > 0 {
        *pending_skip -= 1;
        return;
    }
    if !state.skip {
        out.push(c);
    }
}

fn symbol_char(symbol: char) -> Option<char> {
    match symbol {
        '\\' | '{' | '}' => Some(symbol),
        '~' => Some('\u{00A0}'),
        '_' => Some('\u{2011}'),
        '\t' => Some('\t'),
        _ => None,
    }
}

fn word_text(word: &str) -> Option<&'static str> {
    let text = match word {
        "par" | "line" | "sect" | "page" | "row" => "\n",
        "tab" | "cell" => "\t",
        "emdash" => "—",
        "endash" => "–",
        "emspace" | "enspace" | "qmspace" => " ",
        "bullet" => "•",
        "lquote" => "‘",
        "rquote" => "’",
        "ldblquote" => "“",
        "rdblquote" => "”",
        _ => return None,
    };
    Some(text)
}

fn decode_byte(value: u8, code_page: u32) -> char {
    if code_page == 1254 {
        if let Some(&(_, c)) = CP1254_OVERRIDES.iter().find(|(b, _)| *b == value) {
            return c;
        }
    }
    match value {
        0x80..=0x9F => CP1252_HIGH[usize::from(value - 0x80)],
        _ => char::from(value),
    }
}
