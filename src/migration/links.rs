use std::path::Path;

use crate::error::Result;
use crate::extract::{replace_spans, NoteLinkPatterns};
use crate::identifier::IdentifierIndex;
use crate::{list_notes, load_note_content, save_note_content};

/// Point every resolvable Evernote link of `content` at the migrated file.
/// Returns the new content and the number of rewritten links.
pub fn rewrite_links_in(
    content: &str,
    note_name: &str,
    index: &IdentifierIndex,
    patterns: &NoteLinkPatterns,
) -> (String, usize) {
    let mut edits = Vec::new();
    for link in patterns.find(content) {
        match index.container_of(&link.id) {
            Some(container) => edits.push((link.url, format!("./{}", container))),
            None => log::warn!(
                "Container of `{}` not found for note ID `{}` ({})",
                link.label,
                link.id,
                note_name
            ),
        }
    }
    let count = edits.len();
    if count == 0 {
        return (content.to_string(), 0);
    }
    (replace_spans(content, edits), count)
}

/// Rewrite note links across the notebook. Notes without any resolved link
/// are not written back.
pub fn rewrite_note_links(
    notebook: &Path,
    extension: &str,
    index: &IdentifierIndex,
    patterns: &NoteLinkPatterns,
) -> Result<usize> {
    log::info!("Process notes links");

    let mut total = 0;
    for note_path in list_notes(notebook, extension)? {
        let note_name = note_path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();
        let content = load_note_content(&note_path)?;
        let (updated, count) = rewrite_links_in(&content, &note_name, index, patterns);
        if count > 0 {
            save_note_content(&note_path, &updated)?;
            log::debug!("Rewrote {} links in `{}`", count, note_name);
            total += count;
        }
    }

    log::info!("Rewrote {} note links", total);
    Ok(total)
}
