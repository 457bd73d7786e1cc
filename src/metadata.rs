use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{MigrationError, Result};
use crate::extract::{extract_date, extract_title, extract_url, DateField};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteMetadata {
    /// Evernote identifier, when it could be resolved.
    pub id: Option<String>,
    /// File name of the standardized note.
    pub name: String,
    pub title: Option<String>,
    /// Size of the body in bytes, attachments excluded.
    pub size: u64,
    pub url: Option<String>,
    pub date_created: Option<DateTime<Utc>>,
    pub date_updated: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentMetadata {
    pub name: String,
    pub size: u64,
}

/// One logical report entry: a note and its attachments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub body: NoteMetadata,
    pub attachments: Vec<AttachmentMetadata>,
}

/// Metadata of a standardized note, computed from its final content.
pub fn note_metadata(name: &str, content: &str) -> NoteMetadata {
    NoteMetadata {
        id: None,
        name: name.to_string(),
        title: extract_title(content),
        size: content.len() as u64,
        url: extract_url(content),
        date_created: extract_date(DateField::Created, content),
        date_updated: extract_date(DateField::Updated, content),
    }
}

pub fn attachment_metadata(name: &str, attachment_path: &Path) -> Result<AttachmentMetadata> {
    let size = fs::metadata(attachment_path)
        .map_err(|e| MigrationError::io(attachment_path, e))?
        .len();
    Ok(AttachmentMetadata {
        name: name.to_string(),
        size,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    #[test]
    fn test_note_metadata() {
        let content = "---\ntitle: Café\ncreated: 2020-05-06 07:08:09\n---\n\nBody";
        let metadata = note_metadata("Cafe.md", content);

        assert_eq!(metadata.id, None);
        assert_eq!(metadata.name, "Cafe.md");
        assert_eq!(metadata.title.as_deref(), Some("Café"));
        // Byte length, not character count
        assert_eq!(metadata.size, content.len() as u64);
        assert_eq!(metadata.size, content.chars().count() as u64 + 1);
        assert_eq!(
            metadata.date_created,
            Some(Utc.with_ymd_and_hms(2020, 5, 6, 7, 8, 9).unwrap())
        );
        assert_eq!(metadata.date_updated, None);
        assert_eq!(metadata.url, None);
    }

    #[test]
    fn test_attachment_metadata() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("scan.pdf");
        fs::write(&path, vec![0u8; 1234]).unwrap();

        let metadata = attachment_metadata("abc.pdf", &path).unwrap();
        assert_eq!(metadata.name, "abc.pdf");
        assert_eq!(metadata.size, 1234);

        let missing = attachment_metadata("x.pdf", &temp_dir.path().join("missing.pdf"));
        assert!(matches!(missing, Err(MigrationError::Io { .. })));
    }
}
