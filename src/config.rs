use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{MigrationError, Result};

/// On-disk layout of a notebook, before and after migration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Layout {
    /// Shared folder (under the notebook) receiving every migrated attachment.
    pub attachments_folder: String,
    /// Body file inside each exported note folder.
    pub note_filename: String,
    /// Extension of the standardized notes, without the dot.
    pub note_extension: String,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            attachments_folder: "_attachments".to_string(),
            note_filename: "README.md".to_string(),
            note_extension: "md".to_string(),
        }
    }
}

impl Layout {
    pub fn attachments_dir(&self, notebook: &Path) -> PathBuf {
        notebook.join(&self.attachments_folder)
    }

    pub fn note_file_name(&self, stem: &str) -> String {
        format!("{}.{}", stem, self.note_extension)
    }
}

/// Settings file accepted by `--config`.
///
/// ```yaml
/// layout:
///   attachments_folder: _resources
///   note_filename: index.md
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub layout: Layout,
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|e| MigrationError::io(path, e))?;
        Self::from_yaml(&raw)
    }

    pub fn from_yaml(raw: &str) -> Result<Self> {
        let settings: Settings = serde_yaml::from_str(raw)
            .map_err(|e| MigrationError::Config(format!("Failed to parse settings: {}", e)))?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        let layout = &self.layout;
        for (key, value) in [
            ("attachments_folder", &layout.attachments_folder),
            ("note_filename", &layout.note_filename),
            ("note_extension", &layout.note_extension),
        ] {
            if value.trim().is_empty() {
                return Err(MigrationError::Config(format!("`{}` cannot be empty", key)));
            }
            if value.contains('/') || value.contains('\\') {
                return Err(MigrationError::Config(format!(
                    "`{}` must be a plain name, got `{}`",
                    key, value
                )));
            }
        }
        Ok(())
    }
}

/// Options of one migration run.
#[derive(Debug, Clone)]
pub struct MigrationOptions {
    /// Folder holding one sub-folder per exported note.
    pub notebook: PathBuf,
    /// CSV report to (re)create, if any.
    pub report: Option<PathBuf>,
    /// Compute the report without touching the notebook.
    pub report_only: bool,
    /// Keep the exported note folders after migration.
    pub keep: bool,
    /// Reuse the standardized name even when a note with that name exists.
    pub overwrite: bool,
    pub layout: Layout,
}

impl MigrationOptions {
    pub fn new(notebook: impl Into<PathBuf>) -> Self {
        Self {
            notebook: notebook.into(),
            report: None,
            report_only: false,
            keep: false,
            overwrite: false,
            layout: Layout::default(),
        }
    }

    pub fn with_report(mut self, report: impl Into<PathBuf>) -> Self {
        self.report = Some(report.into());
        self
    }

    pub fn report_only(mut self, report_only: bool) -> Self {
        self.report_only = report_only;
        self
    }

    pub fn keep(mut self, keep: bool) -> Self {
        self.keep = keep;
        self
    }

    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn with_layout(mut self, layout: Layout) -> Self {
        self.layout = layout;
        self
    }

    /// A report-only run without a report would do nothing observable.
    pub fn validate(&self) -> Result<()> {
        if self.report_only && self.report.is_none() {
            return Err(MigrationError::Config(
                "--report-only must be used with --report".to_string(),
            ));
        }
        Ok(())
    }

    pub fn attachments_dir(&self) -> PathBuf {
        self.layout.attachments_dir(&self.notebook)
    }
}
