use std::collections::BTreeMap;
use std::path::Path;

use crate::error::Result;
use crate::extract::find_local_note_links;
use crate::{list_notes, load_note_content, save_note_content};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BacklinkStats {
    /// Notes that received a backlinks section.
    pub notes: usize,
    pub backlinks: usize,
}

/// Append a backlinks section listing `backlinks` (note file names).
pub fn append_backlinks(content: &str, backlinks: &[String]) -> String {
    let mut updated = String::with_capacity(content.len() + 64 * (backlinks.len() + 1));
    updated.push_str(content);
    updated.push_str("\n---\n\n");
    updated.push_str("## Backlinks\n\n");
    for backlink in backlinks {
        let stem = Path::new(backlink)
            .file_stem()
            .unwrap_or_default()
            .to_string_lossy();
        updated.push_str(&format!("- [{}](./{})\n", stem, backlink));
    }
    updated
}

/// Target note => notes linking to it, in scan order. A note linking twice
/// to the same target appears twice.
pub fn collect_backlinks(notebook: &Path, extension: &str) -> Result<BTreeMap<String, Vec<String>>> {
    let mut backlinks: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for note_path in list_notes(notebook, extension)? {
        let note_name = note_path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();
        let content = load_note_content(&note_path)?;
        for link in find_local_note_links(&content, extension) {
            backlinks.entry(link.target).or_default().push(note_name.clone());
        }
    }
    Ok(backlinks)
}

/// Add a backlinks section to every note that is linked from another one.
pub fn inject_backlinks(notebook: &Path, extension: &str) -> Result<BacklinkStats> {
    log::info!("Process backlinks");

    let backlinks = collect_backlinks(notebook, extension)?;

    let mut stats = BacklinkStats::default();
    for (target, sources) in &backlinks {
        let note_path = notebook.join(target);
        if !note_path.is_file() {
            log::warn!(
                "Linked note `{}` does not exist (linked from {})",
                target,
                sources.join(", ")
            );
            continue;
        }
        let content = load_note_content(&note_path)?;
        save_note_content(&note_path, &append_backlinks(&content, sources))?;
        stats.notes += 1;
        stats.backlinks += sources.len();
    }

    log::info!(
        "Created {} backlinks from {} links",
        stats.backlinks,
        backlinks.len()
    );
    Ok(stats)
}
