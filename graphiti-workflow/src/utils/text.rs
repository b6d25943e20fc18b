//! Text processing utilities.

use regex::Regex;
use std::sync::OnceLock;

static WHITESPACE_RE: OnceLock<Regex> = OnceLock::new();
static LUCENE_RE: OnceLock<Regex> = OnceLock::new();

fn whitespace_re() -> &'static Regex {
    WHITESPACE_RE.get_or_init(|| Regex::new(r"\s+").expect("static regex is valid"))
}

fn lucene_re() -> &'static Regex {
    LUCENE_RE.get_or_init(|| {
        Regex::new(r#"(&&|\|\||[+\-!(){}\[\]^"~*?:\\/])"#).expect("static regex is valid")
    })
}

/// Collapse every whitespace run to a single space and trim both ends.
pub fn normalize_whitespace(s: &str) -> String {
    whitespace_re().replace_all(s, " ").trim().to_string()
}

/// Flatten `s` onto one line and cap it at `max_chars` characters.
///
/// A truncated label keeps exactly `max_chars` characters (minus trailing
/// whitespace) followed by `"..."`. Counts `char`s, so multi-byte text is safe.
pub fn display_label(s: &str, max_chars: usize) -> String {
    let flat = normalize_whitespace(s);
    if flat.chars().count() <= max_chars {
        return flat;
    }
    let kept: String = flat.chars().take(max_chars).collect();
    format!("{}...", kept.trim_end())
}

/// Return the first balanced `{...}` object in an LLM reply.
///
/// Local models often wrap JSON in prose or markdown fences; braces inside
/// string literals are ignored while matching.
pub fn extract_json_object(s: &str) -> Option<&str> {
    let start = s.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in s[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&s[start..=start + offset]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Escape Lucene query syntax so user text can be passed to a Neo4j full-text index.
pub fn lucene_escape(s: &str) -> String {
    lucene_re().replace_all(s, "\\${1}").into_owned()
}
