//! Pattern matchers over note bodies.
//!
//! Every matcher works on the raw text and reports byte ranges, so callers can
//! collect all matches first and rewrite afterwards with [`replace_spans`].

mod fields;

pub use fields::{extract_date, extract_title, extract_url, parse_date, split_front_matter, DateField};

use once_cell::sync::Lazy;
use regex::Regex;
use std::ops::Range;

use crate::error::{MigrationError, Result};

/// Link target: no whitespace, one level of parentheses (`Scan(2).pdf`).
const PATTERN_PATH: &str = r"(?:[^()\s]|\([^()\s]*\))+";

/// Optional `"title"` after the target.
const PATTERN_TITLE: &str = r#"(?:[ \t]+"[^"\n]*")?"#;

/// `![alt](path "title")`
static REGEX_IMAGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"!\[(?P<label>[^\[\]\n]*)\]\((?P<path>{path}){title}\)",
        path = PATTERN_PATH,
        title = PATTERN_TITLE
    ))
    .unwrap()
});

/// `[label](path)`. The label may hold an image (`[![alt](a.png)](a.png)`),
/// images themselves come out with a non-empty `bang`.
static REGEX_FILE_LINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?P<bang>!?)\[(?P<label>(?:[^\[\]\n]|!\[[^\[\]\n]*\]\({path}{title}\))*)\]\((?P<path>{path}){title}\)",
        path = PATTERN_PATH,
        title = PATTERN_TITLE
    ))
    .unwrap()
});

/// Anything starting with a URI scheme (`https:`, `evernote:`, `mailto:`...).
static REGEX_SCHEME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*:").unwrap());

/// Client link: `evernote:///view/<user>/<shard>/<note guid>/<note guid>/`
const PATTERN_NOTE_LINK_CLIENT: &str = r"\[(?P<label>[^\]\n]*)\]\((?P<url>evernote:///view/\d+/s\d+/(?P<id>[0-9a-fA-F\-]{36})/[0-9a-fA-F\-]{36}/?)\)";

/// Web link: `https://www.evernote.com/shard/<shard>/nl/<user>/<note guid>/`
const PATTERN_NOTE_LINK_WEB: &str = r"\[(?P<label>[^\]\n]*)\]\((?P<url>https?://(?:www\.)?evernote\.com/shard/s\d+/nl/\d+/(?P<id>[0-9a-fA-F\-]{36})/?)\)";

/// Link to a migrated note sitting next to the current one: `[label](./name.md)`.
/// Names may hold one level of parentheses (`Daily (2).md`).
static REGEX_LOCAL_NOTE_LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[(?P<label>[^\]\n]*)\]\((?P<url>\./(?P<name>(?:[^()/\n]|\([^()/\n]*\))+))\)").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentKind {
    /// Plain markdown link to a local file.
    File,
    /// Markdown image.
    Image,
}

impl AttachmentKind {
    pub const ALL: [AttachmentKind; 2] = [AttachmentKind::File, AttachmentKind::Image];
}

/// Reference to a local attachment. `span` covers the path only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentRef {
    pub path: String,
    pub span: Range<usize>,
}

/// Reference to another note through its Evernote identifier.
/// `url` covers the link target only, the label is left alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteLinkRef {
    pub url: Range<usize>,
    pub id: String,
    pub label: String,
}

/// Link between two migrated notes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalNoteLink {
    pub label: String,
    pub target: String,
}

fn is_local_path(path: &str) -> bool {
    if path.starts_with('#') || path.starts_with('/') || path.starts_with('\\') {
        return false;
    }
    if path.contains("://") || REGEX_SCHEME.is_match(path) {
        return false;
    }
    // Sibling notes written by the link pass
    !(path.starts_with("./") && path.to_ascii_lowercase().ends_with(".md"))
}

/// Lazily scan `text` for local attachment references of one kind.
pub fn find_attachment_refs(
    kind: AttachmentKind,
    text: &str,
) -> impl Iterator<Item = AttachmentRef> + '_ {
    let regex: &Regex = match kind {
        AttachmentKind::File => &REGEX_FILE_LINK,
        AttachmentKind::Image => &REGEX_IMAGE,
    };
    regex.captures_iter(text).filter_map(move |caps| {
        if caps.name("bang").map_or(false, |m| !m.as_str().is_empty()) {
            return None;
        }
        let path = caps.name("path")?;
        if !is_local_path(path.as_str()) {
            return None;
        }
        Some(AttachmentRef {
            path: path.as_str().to_string(),
            span: path.range(),
        })
    })
}

/// Set of patterns recognizing note-to-note links by external identifier.
///
/// Each pattern must expose the named groups `url`, `id` and `label`.
#[derive(Debug, Clone)]
pub struct NoteLinkPatterns {
    patterns: Vec<Regex>,
}

impl Default for NoteLinkPatterns {
    fn default() -> Self {
        Self::evernote()
    }
}

impl NoteLinkPatterns {
    /// Client (`evernote:///view/...`) and web (`evernote.com/shard/...`) links.
    pub fn evernote() -> Self {
        let patterns = [PATTERN_NOTE_LINK_CLIENT, PATTERN_NOTE_LINK_WEB]
            .iter()
            .map(|p| Regex::new(p).unwrap())
            .collect();
        Self { patterns }
    }

    pub fn new(patterns: Vec<Regex>) -> Result<Self> {
        for pattern in &patterns {
            let names: Vec<&str> = pattern.capture_names().flatten().collect();
            for required in ["url", "id", "label"] {
                if !names.contains(&required) {
                    return Err(MigrationError::Config(format!(
                        "note link pattern `{}` lacks the `{}` group",
                        pattern.as_str(),
                        required
                    )));
                }
            }
        }
        Ok(Self { patterns })
    }

    /// All note links of `text`, in position order. When patterns match
    /// overlapping text, only the first match is kept.
    pub fn find(&self, text: &str) -> Vec<NoteLinkRef> {
        let mut links: Vec<NoteLinkRef> = self
            .patterns
            .iter()
            .flat_map(|re| re.captures_iter(text))
            .filter_map(|caps| {
                Some(NoteLinkRef {
                    url: caps.name("url")?.range(),
                    id: caps.name("id")?.as_str().to_string(),
                    label: caps.name("label")?.as_str().to_string(),
                })
            })
            .collect();
        // Stable sort: on equal starts the earlier pattern wins
        links.sort_by_key(|link| link.url.start);
        let mut end = 0;
        links.retain(|link| {
            if link.url.start < end {
                return false;
            }
            end = link.url.end;
            true
        });
        links
    }
}

/// Links to sibling notes with the given extension (without the dot).
pub fn find_local_note_links(text: &str, extension: &str) -> Vec<LocalNoteLink> {
    let suffix = format!(".{}", extension);
    REGEX_LOCAL_NOTE_LINK
        .captures_iter(text)
        .filter_map(|caps| {
            let target = caps.name("name")?.as_str();
            if !target.ends_with(&suffix) {
                return None;
            }
            Some(LocalNoteLink {
                label: caps.name("label")?.as_str().to_string(),
                target: target.to_string(),
            })
        })
        .collect()
}

/// Apply non-overlapping edits, last one first, each step producing a new
/// buffer. Offsets of earlier edits stay valid whatever the replacement length.
/// An edit overlapping an earlier one (by start, then by order given) is dropped.
pub fn replace_spans(text: &str, mut edits: Vec<(Range<usize>, String)>) -> String {
    edits.sort_by_key(|(span, _)| span.start);
    let mut end = 0;
    edits.retain(|(span, _)| {
        if span.start < end {
            return false;
        }
        end = span.end;
        true
    });
    edits
        .into_iter()
        .rev()
        .fold(text.to_string(), |current, (span, replacement)| {
            let mut next = String::with_capacity(current.len() + replacement.len());
            next.push_str(&current[..span.start]);
            next.push_str(&replacement);
            next.push_str(&current[span.end..]);
            next
        })
}
