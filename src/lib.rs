pub mod config;
pub mod error;
pub mod extract;
pub mod identifier;
pub mod metadata;
pub mod migration;
pub mod move_notes;
pub mod normalize;
pub mod report;


#[cfg(test)]
mod attachment_dedup_test;


use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub use config::{Layout, MigrationOptions, Settings};
pub use error::{MigrationError, Result};
pub use identifier::{EvernoteDb, IdentifierIndex, NoteIdSource, NoteRecord};
pub use metadata::{AttachmentMetadata, Note, NoteMetadata};
pub use migration::{Migration, MigrationSummary};
pub use move_notes::NoteMover;

/// Read a note. Invalid UTF-8 is replaced rather than rejected.
pub fn load_note_content(path: &Path) -> Result<String> {
    let bytes = fs::read(path).map_err(|e| MigrationError::io(path, e))?;
    match String::from_utf8(bytes) {
        Ok(content) => Ok(content),
        Err(e) => {
            log::warn!("Invalid UTF-8 in {}, replacing bad bytes", path.display());
            Ok(String::from_utf8_lossy(e.as_bytes()).into_owned())
        }
    }
}

/// Atomic write: write to a temp file in the same directory, then rename.
/// An interrupted run never leaves a truncated note behind.
pub fn save_note_content(path: &Path, content: &str) -> Result<()> {
    let file_name = path.file_name().unwrap_or_default().to_string_lossy();
    let temp_path = path.with_file_name(format!("{}.migration-tmp", file_name));

    let mut file = fs::File::create(&temp_path).map_err(|e| MigrationError::io(&temp_path, e))?;
    file.write_all(content.as_bytes())
        .map_err(|e| MigrationError::io(&temp_path, e))?;
    file.sync_all().map_err(|e| MigrationError::io(&temp_path, e))?;
    drop(file);

    fs::rename(&temp_path, path).map_err(|e| MigrationError::io(path, e))?;

    Ok(())
}

/// Standardized notes directly under `folder`, sorted by file name.
pub fn list_notes(folder: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    let mut notes = Vec::new();
    for entry in WalkDir::new(folder)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| MigrationError::io(folder, e.into()))?;
        let path = entry.path();
        if entry.file_type().is_file()
            && path.extension().map_or(false, |ext| ext == extension)
        {
            notes.push(path.to_path_buf());
        }
    }
    Ok(notes)
}
