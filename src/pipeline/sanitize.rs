//! Response sanitisation: turn a model's near-JSON answer into JSON.
//!
//! Models asked for "a JSON array of objects" still come back with Markdown
//! fences around the payload, stray control bytes, unescaped backslashes
//! inside code snippets, objects glued together without commas, or a trailing
//! comma before the closing bracket. Two pure functions deal with this:
//!
//! * [`normalize`] strips the wrapping and guarantees array framing.
//! * [`repair`] fixes punctuation between structural tokens and, when the
//!   result parses, returns it in canonical compact form.
//!
//! ## Rule Order
//!
//! Escape repair runs first, over the whole text, because the string-literal
//! scanner used by the later passes relies on escapes being well-formed to
//! find where strings end. The comma passes then only ever touch text outside
//! string literals, so string values come through byte-for-byte.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use tracing::debug;

/// Fence language tags that mark a structured-data payload.
const DATA_FENCE_TAGS: [&str; 3] = ["json", "jsonc", "json5"];

const FENCE: &str = "```";

/// Strip wrapping artefacts and frame the text as a single JSON array.
///
/// Total: never fails, and the result always starts with `[` and ends with
/// `]`. Steps (applied in order):
/// 1. Drop control characters below U+0020 other than `\n`, `\r`, `\t`
/// 2. Strip a leading fence line whose tag names a data format (or is empty)
/// 3. Strip a trailing closing fence
/// 4. Add missing array brackets
pub fn normalize(raw: &str) -> String {
    let cleaned = strip_control_chars(raw);
    let text = strip_opening_fence(cleaned.trim());
    let text = strip_closing_fence(text.trim());
    frame_as_array(text.trim())
}

/// Best-effort syntactic repair of near-JSON text.
///
/// Passes (applied in order):
/// 1. Double backslashes that do not start a legal JSON escape
/// 2. Insert the comma missing between `}` `{` and between `]` `[`
/// 3. Insert a comma between any closing and opening bracket pair
/// 4. Remove commas directly before a closing bracket
///
/// If the result parses, the canonical compact serialisation is returned.
/// Otherwise the text is only framed as an array and returned unvalidated;
/// [`crate::pipeline::validate`] reports what is still wrong with it.
pub fn repair(text: &str) -> String {
    let s = fix_invalid_escapes(text);
    let s = map_outside_strings(&s, insert_missing_commas);
    let s = map_outside_strings(&s, insert_adjacent_commas);
    let s = map_outside_strings(&s, remove_trailing_commas);

    match serde_json::from_str::<serde_json::Value>(&s) {
        Ok(value) => serde_json::to_string(&value).unwrap_or(s),
        Err(e) => {
            debug!(
                "Repair left invalid JSON ({}): {}…",
                e,
                truncate_chars(&s, 1000)
            );
            frame_as_array(s.trim())
        }
    }
}

/// Prepend `[` / append `]` when missing.
pub(crate) fn frame_as_array(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    if !text.starts_with('[') {
        out.push('[');
    }
    out.push_str(text);
    if !text.ends_with(']') {
        out.push(']');
    }
    out
}

// ── Normalizer steps ─────────────────────────────────────────────────────────

fn strip_control_chars(input: &str) -> String {
    input
        .chars()
        .filter(|&c| c >= ' ' || matches!(c, '\n' | '\r' | '\t'))
        .collect()
}

/// Remove an opening fence line such as ```` ```json ````.
///
/// A fence naming some other language (```` ```python ````) is left alone:
/// the payload is not ours to unwrap.
fn strip_opening_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix(FENCE) else {
        return text;
    };
    let line_end = rest.find('\n').unwrap_or(rest.len());
    let info = rest[..line_end].trim();
    let after_line = rest.get(line_end + 1..).unwrap_or("");

    if info.is_empty() {
        return after_line;
    }
    for tag in DATA_FENCE_TAGS {
        let Some(prefix) = info.get(..tag.len()) else {
            continue;
        };
        if !prefix.eq_ignore_ascii_case(tag) {
            continue;
        }
        let remainder = info[tag.len()..].trim_start();
        if remainder.is_empty() {
            return after_line;
        }
        // ```json[{"question": …  on one line
        if remainder.starts_with('[') || remainder.starts_with('{') {
            return rest.trim_start()[tag.len()..].trim_start();
        }
    }
    text
}

fn strip_closing_fence(text: &str) -> &str {
    text.strip_suffix(FENCE).unwrap_or(text)
}

// ── Pass 1: escape repair ────────────────────────────────────────────────────

static RE_BACKSLASH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\\(u[0-9A-Fa-f]{4}|.)?").unwrap());

fn is_legal_escape(seq: &str) -> bool {
    seq.len() == 5 || matches!(seq, "\"" | "\\" | "/" | "b" | "f" | "n" | "r" | "t")
}

fn fix_invalid_escapes(input: &str) -> String {
    RE_BACKSLASH
        .replace_all(input, |caps: &Captures<'_>| match caps.get(1) {
            Some(seq) if is_legal_escape(seq.as_str()) => caps[0].to_string(),
            Some(seq) => format!("\\\\{}", seq.as_str()),
            None => "\\\\".to_string(),
        })
        .into_owned()
}

// ── Pass 2: missing comma between objects / arrays ───────────────────────────

static RE_OBJECT_GAP: Lazy<Regex> = Lazy::new(|| Regex::new(r"\}\s*\{").unwrap());
static RE_ARRAY_GAP: Lazy<Regex> = Lazy::new(|| Regex::new(r"\]\s*\[").unwrap());

fn insert_missing_commas(input: &str) -> String {
    let s = RE_OBJECT_GAP.replace_all(input, "},{");
    RE_ARRAY_GAP.replace_all(&s, "],[").into_owned()
}

// ── Pass 3: generic adjacency ────────────────────────────────────────────────

static RE_ADJACENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"([}\]])\s*([{\[])").unwrap());

fn insert_adjacent_commas(input: &str) -> String {
    RE_ADJACENT.replace_all(input, "${1},${2}").into_owned()
}

// ── Pass 4: trailing commas ──────────────────────────────────────────────────

static RE_TRAILING_COMMA: Lazy<Regex> = Lazy::new(|| Regex::new(r",(\s*[}\]])").unwrap());

fn remove_trailing_commas(input: &str) -> String {
    RE_TRAILING_COMMA.replace_all(input, "${1}").into_owned()
}

// ── Character-class helpers ──────────────────────────────────────────────────

/// Split `text` into runs that are outside (`false`) or inside (`true`) a
/// JSON string literal. Quote characters belong to the string run. An
/// unterminated string runs to the end of the text.
fn string_segments(text: &str) -> Vec<(bool, &str)> {
    let mut segments = Vec::new();
    let mut start = 0;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                segments.push((true, &text[start..=i]));
                start = i + 1;
                in_string = false;
            }
        } else if c == '"' {
            if start < i {
                segments.push((false, &text[start..i]));
            }
            start = i;
            in_string = true;
        }
    }
    if start < text.len() {
        segments.push((in_string, &text[start..]));
    }
    segments
}

/// Apply `f` to every run outside string literals, leaving strings untouched.
fn map_outside_strings(text: &str, f: impl Fn(&str) -> String) -> String {
    let mut out = String::with_capacity(text.len() + 16);
    for (quoted, part) in string_segments(text) {
        if quoted {
            out.push_str(part);
        } else {
            out.push_str(&f(part));
        }
    }
    out
}

pub(crate) fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
