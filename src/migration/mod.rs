//! Notebook migration.
//!
//! One run goes through three stages, strictly in this order:
//! 1. every exported note folder is standardized into a single note file,
//!    registering its Evernote ID against the new file name;
//! 2. Evernote links are rewritten to relative links between migrated notes;
//! 3. linked notes receive a backlinks section.
//!
//! Stages 2 and 3 need the ID => file mapping of the whole notebook, so they
//! only start once stage 1 is complete.

pub mod backlinks;
pub mod links;
pub mod standardize;

pub use backlinks::{append_backlinks, inject_backlinks, BacklinkStats};
pub use links::{rewrite_links_in, rewrite_note_links};
pub use standardize::{resolve_note_path, standardize_note, StandardizedNote};

use std::fs;
use std::path::PathBuf;

use crate::config::MigrationOptions;
use crate::error::{MigrationError, Result};
use crate::extract::NoteLinkPatterns;
use crate::identifier::IdentifierIndex;
use crate::report::{append_report, remove_report};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MigrationSummary {
    pub notes: usize,
    pub attachments: usize,
    /// Notes whose Evernote ID could be resolved.
    pub identified: usize,
    pub links_rewritten: usize,
    pub backlinks: usize,
}

pub struct Migration {
    options: MigrationOptions,
    index: Option<IdentifierIndex>,
    link_patterns: NoteLinkPatterns,
}

impl Migration {
    /// Without an identifier index, notes are standardized but links and
    /// backlinks are left alone.
    pub fn new(options: MigrationOptions, index: Option<IdentifierIndex>) -> Self {
        Self {
            options,
            index,
            link_patterns: NoteLinkPatterns::default(),
        }
    }

    pub fn with_link_patterns(mut self, link_patterns: NoteLinkPatterns) -> Self {
        self.link_patterns = link_patterns;
        self
    }

    pub fn options(&self) -> &MigrationOptions {
        &self.options
    }

    pub fn index(&self) -> Option<&IdentifierIndex> {
        self.index.as_ref()
    }

    /// Exported note folders, the attachments folder excluded.
    fn note_folders(&self) -> Result<Vec<String>> {
        let notebook = &self.options.notebook;
        let mut folders = Vec::new();
        for entry in fs::read_dir(notebook).map_err(|e| MigrationError::io(notebook, e))? {
            let entry = entry.map_err(|e| MigrationError::io(notebook, e))?;
            let is_dir = entry
                .file_type()
                .map_err(|e| MigrationError::io(entry.path(), e))?
                .is_dir();
            let name = entry.file_name().to_string_lossy().to_string();
            if is_dir && name != self.options.layout.attachments_folder {
                folders.push(name);
            }
        }
        folders.sort();
        Ok(folders)
    }

    fn setup(&self) -> Result<()> {
        let attachments_dir = self.options.attachments_dir();
        if !self.options.report_only && !attachments_dir.exists() {
            fs::create_dir(&attachments_dir).map_err(|e| MigrationError::io(&attachments_dir, e))?;
        }
        // Start from a fresh report
        if let Some(report) = &self.options.report {
            remove_report(report)?;
        }
        Ok(())
    }

    /// Standardize a notebook.
    pub fn process(&mut self) -> Result<MigrationSummary> {
        self.options.validate()?;
        self.setup()?;

        let mut summary = MigrationSummary::default();

        for folder in self.note_folders()? {
            log::info!("Migrate note `{}`", folder);

            let note = standardize_note(&self.options, self.index.as_mut(), &folder)?;
            summary.notes += 1;
            summary.attachments += note.attachments.len();
            if note.metadata.id.is_some() {
                summary.identified += 1;
            }

            if let Some(report) = &self.options.report {
                append_report(report, &note.metadata, &note.attachments)?;
            }

            if !self.options.report_only && !self.options.keep {
                // Best effort: a leftover folder is harmless
                let folder_path: PathBuf = self.options.notebook.join(&folder);
                log::info!("Delete folder `{}`", folder);
                if let Err(e) = fs::remove_dir_all(&folder_path) {
                    log::warn!("Failed to delete folder `{}`: {}", folder, e);
                }
            }
        }

        match &self.index {
            Some(index) if !self.options.report_only => {
                let extension = &self.options.layout.note_extension;
                summary.links_rewritten = rewrite_note_links(
                    &self.options.notebook,
                    extension,
                    index,
                    &self.link_patterns,
                )?;
                summary.backlinks = inject_backlinks(&self.options.notebook, extension)?.backlinks;
            }
            _ => log::debug!("Skipping link and backlink passes"),
        }

        log::info!(
            "Migrated {} notes ({} attachments, {} identified)",
            summary.notes,
            summary.attachments,
            summary.identified
        );
        Ok(summary)
    }
}
