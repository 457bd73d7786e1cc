//! Move a subset of migrated notes, with their attachments, to another folder.
//!
//! Notes are selected from the migration report. A run can be resumed: files
//! already gone from the source are skipped, while a file already present at
//! the destination stops the move.

use chrono::{DateTime, Utc};
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::Layout;
use crate::error::{MigrationError, Result};
use crate::metadata::Note;
use crate::report::read_report;

pub struct NoteMover {
    notebook: PathBuf,
    dest: PathBuf,
    report: PathBuf,
    /// Only notes updated at or after this date are moved.
    date_updated: Option<DateTime<Utc>>,
    layout: Layout,
}

impl NoteMover {
    pub fn new(notebook: impl Into<PathBuf>, dest: impl Into<PathBuf>, report: impl Into<PathBuf>) -> Self {
        Self {
            notebook: notebook.into(),
            dest: dest.into(),
            report: report.into(),
            date_updated: None,
            layout: Layout::default(),
        }
    }

    pub fn updated_since(mut self, date_updated: Option<DateTime<Utc>>) -> Self {
        self.date_updated = date_updated;
        self
    }

    pub fn with_layout(mut self, layout: Layout) -> Self {
        self.layout = layout;
        self
    }

    /// Move the selected notes. Returns the number of notes moved.
    pub fn process(&self) -> Result<usize> {
        let notes = self.filter_notes(read_report(&self.report)?);

        let dest_attachments = self.layout.attachments_dir(&self.dest);
        for dir in [&self.dest, &dest_attachments] {
            if !dir.exists() {
                fs::create_dir_all(dir).map_err(|e| MigrationError::io(dir, e))?;
            }
        }

        let mut count = 0;
        for note in &notes {
            if self.move_note(note)? {
                count += 1;
            }
        }

        log::info!("Number of notes moved: {}", count);
        Ok(count)
    }

    pub fn filter_notes(&self, notes: Vec<Note>) -> Vec<Note> {
        match self.date_updated {
            Some(threshold) => notes
                .into_iter()
                .filter(|n| n.body.date_updated.map_or(false, |d| d >= threshold))
                .collect(),
            None => notes,
        }
    }

    fn move_note(&self, note: &Note) -> Result<bool> {
        let name = &note.body.name;
        let moved = move_file(&self.notebook.join(name), &self.dest.join(name))?;
        if moved {
            log::info!("Moved note `{}`", name);
        }

        // Attachments are tried even when the note is already gone, to finish
        // a previous move that stopped half-way.
        let source_attachments = self.layout.attachments_dir(&self.notebook);
        let dest_attachments = self.layout.attachments_dir(&self.dest);
        for attachment in &note.attachments {
            if move_file(
                &source_attachments.join(&attachment.name),
                &dest_attachments.join(&attachment.name),
            )? {
                log::info!("Moved attachment `{}`", attachment.name);
            }
        }

        Ok(moved)
    }
}

/// Move a file. A missing source counts as already moved (`Ok(false)`).
fn move_file(source: &Path, dest: &Path) -> Result<bool> {
    if !source.exists() {
        return Ok(false);
    }
    if dest.exists() {
        return Err(MigrationError::DuplicateOnMove(dest.to_path_buf()));
    }

    if let Err(rename_err) = fs::rename(source, dest) {
        // Cross-device: copy, then delete
        log::debug!("Rename failed ({}), copying {}", rename_err, source.display());
        fs::copy(source, dest).map_err(|e| MigrationError::io(source, e))?;
        fs::remove_file(source).map_err(|e| MigrationError::io(source, e))?;
    }

    Ok(true)
}
