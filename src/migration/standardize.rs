use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::MigrationOptions;
use crate::error::{MigrationError, Result};
use crate::extract::{find_attachment_refs, replace_spans, AttachmentKind, AttachmentRef};
use crate::identifier::IdentifierIndex;
use crate::metadata::{attachment_metadata, note_metadata, AttachmentMetadata, NoteMetadata};
use crate::normalize::{standardize_note_name, standardize_tags};
use crate::{load_note_content, save_note_content};

/// Outcome of standardizing one exported note folder.
#[derive(Debug, Clone)]
pub struct StandardizedNote {
    pub path: PathBuf,
    pub metadata: NoteMetadata,
    pub attachments: Vec<AttachmentMetadata>,
}

/// First free note path for `folder`: `base`, `base-1`, `base-2`...
/// With `overwrite`, `base` is returned even if it exists.
pub fn resolve_note_path(options: &MigrationOptions, folder: &str) -> PathBuf {
    let base = standardize_note_name(folder);
    let layout = &options.layout;
    let target = options.notebook.join(layout.note_file_name(&base));
    if options.overwrite || !target.exists() {
        return target;
    }
    let mut counter = 1;
    loop {
        let candidate = options
            .notebook
            .join(layout.note_file_name(&format!("{}-{}", base, counter)));
        if !candidate.exists() {
            return candidate;
        }
        counter += 1;
    }
}

/// Fresh attachment name keeping the original extension.
fn unique_attachment_name(original: &str) -> String {
    let id = uuid::Uuid::new_v4();
    match Path::new(original).extension() {
        Some(ext) => format!("{}.{}", id, ext.to_string_lossy()),
        None => id.to_string(),
    }
}

/// Copies attachments into the shared folder and rewrites their references.
/// The rename table lives for one note only.
struct AttachmentMigrator<'a> {
    options: &'a MigrationOptions,
    note_dir: &'a Path,
    renames: HashMap<String, String>,
    attachments: Vec<AttachmentMetadata>,
}

impl<'a> AttachmentMigrator<'a> {
    fn new(options: &'a MigrationOptions, note_dir: &'a Path) -> Self {
        Self {
            options,
            note_dir,
            renames: HashMap::new(),
            attachments: Vec::new(),
        }
    }

    fn migrate(mut self, mut content: String) -> Result<(String, Vec<AttachmentMetadata>)> {
        for kind in AttachmentKind::ALL {
            let refs: Vec<AttachmentRef> = find_attachment_refs(kind, &content).collect();
            if refs.is_empty() {
                continue;
            }
            let mut edits = Vec::with_capacity(refs.len());
            // Last reference first, so names follow reverse position order
            for reference in refs.into_iter().rev() {
                if self.is_missing_note(&reference.path) {
                    log::warn!(
                        "Link to `{}` left as is, no such file in `{}`",
                        reference.path,
                        self.note_dir.display()
                    );
                    continue;
                }
                let new_path = self.new_path_for(&reference.path)?;
                edits.push((reference.span, new_path));
            }
            content = replace_spans(&content, edits);
        }
        Ok((content, self.attachments))
    }

    /// A link to a note that is not part of the export (`Other.md`).
    /// Markdown files present in the folder are regular attachments.
    fn is_missing_note(&self, original: &str) -> bool {
        let suffix = format!(".{}", self.options.layout.note_extension);
        original.to_ascii_lowercase().ends_with(&suffix.to_ascii_lowercase())
            && !self.note_dir.join(original).is_file()
    }

    fn new_path_for(&mut self, original: &str) -> Result<String> {
        if let Some(new_path) = self.renames.get(original) {
            return Ok(new_path.clone());
        }

        let layout = &self.options.layout;
        let name = unique_attachment_name(original);
        let source = self.note_dir.join(original);
        let metadata = attachment_metadata(&name, &source)?;

        if !self.options.report_only {
            let target = self.options.attachments_dir().join(&name);
            fs::copy(&source, &target).map_err(|e| MigrationError::io(&source, e))?;
            log::debug!("Copied attachment `{}` to `{}`", original, name);
        }

        let new_path = format!("{}/{}", layout.attachments_folder, name);
        self.renames.insert(original.to_string(), new_path.clone());
        self.attachments.push(metadata);
        Ok(new_path)
    }
}

/// Standardize one exported note folder.
///
/// - Attachments get UUID names and move to the shared attachments folder.
/// - Inline tags are normalized after the `tags:` declaration.
/// - The note is written under a collision-free name (unless report-only).
/// - The note's Evernote ID is resolved and registered against its new name.
pub fn standardize_note(
    options: &MigrationOptions,
    index: Option<&mut IdentifierIndex>,
    folder: &str,
) -> Result<StandardizedNote> {
    let note_dir = options.notebook.join(folder);
    let body_path = note_dir.join(&options.layout.note_filename);
    if !body_path.is_file() {
        return Err(MigrationError::MissingNoteBody(body_path));
    }

    let content = load_note_content(&body_path)?;
    let (content, attachments) = AttachmentMigrator::new(options, &note_dir).migrate(content)?;
    let content = standardize_tags(&content);

    let note_path = resolve_note_path(options, folder);
    if !options.report_only {
        save_note_content(&note_path, &content)?;
    }

    let container = note_path
        .file_name()
        .unwrap_or_default()
        .to_string_lossy()
        .to_string();
    let mut metadata = note_metadata(&container, &content);

    if let Some(index) = index {
        metadata.id = index.resolve(metadata.title.as_deref(), metadata.date_created)?;
        match &metadata.id {
            Some(id) => index.record_container(id, &container),
            None => log::warn!("Note ID not found for container `{}`", container),
        }
    }

    Ok(StandardizedNote {
        path: note_path,
        metadata,
        attachments,
    })
}
