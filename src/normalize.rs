//! Name, tag and title normalization.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

static REGEX_TAGS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^tags:[ \t]*\[(?P<tags>[^\]\n]+)\][ \t]*\r?$").unwrap());

static REGEX_UNICODE_ESCAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\\u(?P<hex>[0-9a-fA-F]{4})").unwrap());

/// Canonical file stem for an exported note folder.
/// Leading dashes are stripped last so the result is a fixed point.
pub fn standardize_note_name(name: &str) -> String {
    let cleaned = name
        .replace(['"', '\''], "")
        .replace(['?', '!'], "")
        .replace('/', "-");
    match cleaned.trim_start_matches('-') {
        "" if !cleaned.is_empty() => "-".to_string(),
        stripped => stripped.to_string(),
    }
}

pub fn standardize_tag(tag: &str) -> String {
    tag.replace(['-', '_'], "").to_lowercase()
}

fn is_tag_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_' || c == '/'
}

/// Rewrite every inline `#tag` whose spelling differs from its normalized
/// form, using the tags declared on the `tags: [...]` line.
pub fn standardize_tags(content: &str) -> String {
    let Some(caps) = REGEX_TAGS.captures(content) else {
        return content.to_string();
    };

    let tags: Vec<String> = caps["tags"]
        .split(',')
        .map(|t| t.trim().trim_matches(['\'', '"']).trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();

    let mut updated = content.to_string();
    for tag in tags {
        let normalized = standardize_tag(&tag);
        if normalized == tag {
            continue;
        }
        updated = replace_inline_tag(&updated, &tag, &normalized);
    }
    updated
}

/// `#tag` is replaced unless it is only the prefix of a longer tag.
fn replace_inline_tag(content: &str, tag: &str, replacement: &str) -> String {
    let needle = format!("#{}", tag);
    let mut result = String::with_capacity(content.len());
    let mut rest = content;
    while let Some(pos) = rest.find(&needle) {
        let end = pos + needle.len();
        let continues = rest[end..].chars().next().map_or(false, is_tag_char);
        result.push_str(&rest[..pos]);
        if continues {
            result.push_str(&needle);
        } else {
            result.push('#');
            result.push_str(replacement);
        }
        rest = &rest[end..];
    }
    result.push_str(rest);
    result
}

/// Fold a title to the form stored in the identifier index: accents dropped,
/// literal `\uXXXX` escapes decoded.
pub fn normalize_title(text: &str) -> String {
    let folded: String = text.nfkd().filter(|c| !is_combining_mark(*c)).collect();
    REGEX_UNICODE_ESCAPE
        .replace_all(&folded, |caps: &Captures| {
            u32::from_str_radix(&caps["hex"], 16)
                .ok()
                .and_then(char::from_u32)
                .map(String::from)
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}
