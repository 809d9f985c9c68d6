//! Inline emphasis parsing and bullet indent inference.
//!
//! Slide text uses a small Markdown-like subset: `` `code` ``, `**bold**`
//! and `*italic*`. Anything that does not form a complete span is kept as
//! literal text.

use regex::Regex;
use std::sync::LazyLock;

/// Deepest bullet level a paragraph may take.
pub const MAX_INDENT_LEVEL: u8 = 4;

/// A leading run of two or more dashes, plus the whitespace after it.
static DASH_PREFIX_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(-{2,})\s*").unwrap());

/// Styling of one text run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStyle {
    Plain,
    Bold,
    Italic,
    Code,
}

/// A contiguous run of identically styled text. May contain `\n`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextRun {
    pub text: String,
    pub style: RunStyle,
}

impl TextRun {
    pub fn new(text: impl Into<String>, style: RunStyle) -> Self {
        Self {
            text: text.into(),
            style,
        }
    }

    pub fn plain(text: impl Into<String>) -> Self {
        Self::new(text, RunStyle::Plain)
    }
}

/// Split `text` into styled runs.
///
/// Scans left to right. At each position a code span is tried first, then
/// bold, then italic; a delimiter that does not close is emitted literally.
/// A single `*` never pairs with either asterisk of a `**`.
pub fn parse_inline(text: &str) -> Vec<TextRun> {
    let mut runs = Vec::new();
    let mut literal = String::new();
    let mut i = 0;

    while i < text.len() {
        let rest = &text[i..];

        if let Some(inner) = rest.strip_prefix('`') {
            if let Some(end) = inner.find('`').filter(|&end| end > 0) {
                push_span(&mut runs, &mut literal, &inner[..end], RunStyle::Code);
                i += end + 2;
                continue;
            }
            literal.push('`');
            i += 1;
            continue;
        }

        if let Some(inner) = rest.strip_prefix("**") {
            if let Some(end) = inner.find("**").filter(|&end| end > 0) {
                push_span(&mut runs, &mut literal, &inner[..end], RunStyle::Bold);
                i += end + 4;
                continue;
            }
            literal.push_str("**");
            i += 2;
            continue;
        }

        if let Some(inner) = rest.strip_prefix('*') {
            if let Some(end) = find_single_asterisk(inner).filter(|&end| end > 0) {
                push_span(&mut runs, &mut literal, &inner[..end], RunStyle::Italic);
                i += end + 2;
                continue;
            }
            literal.push('*');
            i += 1;
            continue;
        }

        let ch = rest.chars().next().unwrap_or_default();
        literal.push(ch);
        i += ch.len_utf8();
    }

    if !literal.is_empty() {
        runs.push(TextRun::plain(literal));
    }
    runs
}

fn push_span(runs: &mut Vec<TextRun>, literal: &mut String, text: &str, style: RunStyle) {
    if !literal.is_empty() {
        runs.push(TextRun::plain(std::mem::take(literal)));
    }
    runs.push(TextRun::new(text, style));
}

/// Byte offset of the first `*` in `s` that is not part of a `**` pair.
fn find_single_asterisk(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut j = 0;
    while j < bytes.len() {
        if bytes[j] == b'*' {
            if bytes.get(j + 1) == Some(&b'*') {
                j += 2;
                continue;
            }
            return Some(j);
        }
        j += 1;
    }
    None
}

/// Infer the indent level of a bullet string and strip its indent marker.
///
/// A leading run of at least two dashes gives `level = run length - 1`.
/// Otherwise leading whitespace counts, one level per tab and per pair of
/// spaces. The level is capped at [`MAX_INDENT_LEVEL`].
pub fn bullet_indent(raw: &str) -> (u8, String) {
    if let Some(caps) = DASH_PREFIX_REGEX.captures(raw) {
        let run = caps[1].len();
        let level = (run - 1).min(MAX_INDENT_LEVEL as usize) as u8;
        let text = raw[caps[0].len()..].to_string();
        return (level, text);
    }

    let mut tabs = 0usize;
    let mut spaces = 0usize;
    for ch in raw.chars() {
        match ch {
            '\t' => tabs += 1,
            ' ' => spaces += 1,
            _ => break,
        }
    }
    let level = (tabs + spaces / 2).min(MAX_INDENT_LEVEL as usize) as u8;
    (level, raw.trim_start_matches([' ', '\t']).to_string())
}

/// Count whitespace-delimited tokens.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}
