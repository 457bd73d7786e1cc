//! CSV migration report.
//!
//! Columns (no header row):
//! id, name, title, date created, date updated, size, attachment name,
//! attachment size.
//!
//! A note gets one row per attachment, or a single row with empty attachment
//! columns when it has none.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use std::fs::{self, OpenOptions};
use std::path::Path;

use crate::error::{MigrationError, Result};
use crate::metadata::{AttachmentMetadata, Note, NoteMetadata};

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const COLUMN_COUNT: usize = 8;

const COL_NOTE_ID: usize = 0;
const COL_NOTE_NAME: usize = 1;
const COL_NOTE_TITLE: usize = 2;
const COL_NOTE_DATE_CREATED: usize = 3;
const COL_NOTE_DATE_UPDATED: usize = 4;
const COL_NOTE_SIZE: usize = 5;
const COL_ATTACHMENT_NAME: usize = 6;
const COL_ATTACHMENT_SIZE: usize = 7;

fn format_datetime(dt: Option<DateTime<Utc>>) -> String {
    dt.map(|dt| dt.format(DATETIME_FORMAT).to_string())
        .unwrap_or_default()
}

fn report_row(note: &NoteMetadata, attachment: Option<&AttachmentMetadata>) -> [String; COLUMN_COUNT] {
    [
        note.id.clone().unwrap_or_default(),
        note.name.clone(),
        note.title.clone().unwrap_or_default(),
        format_datetime(note.date_created),
        format_datetime(note.date_updated),
        note.size.to_string(),
        attachment.map(|a| a.name.clone()).unwrap_or_default(),
        attachment.map(|a| a.size.to_string()).unwrap_or_default(),
    ]
}

/// Discard the report of a previous run.
pub fn remove_report(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_file(path).map_err(|e| MigrationError::io(path, e))?;
    }
    Ok(())
}

/// Append the rows of one note.
pub fn append_report(
    path: &Path,
    note: &NoteMetadata,
    attachments: &[AttachmentMetadata],
) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| MigrationError::io(path, e))?;
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(file);

    if attachments.is_empty() {
        writer.write_record(report_row(note, None))?;
    } else {
        for attachment in attachments {
            writer.write_record(report_row(note, Some(attachment)))?;
        }
    }

    writer.flush().map_err(|e| MigrationError::io(path, e))?;
    Ok(())
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn parse_size(value: &str, line: u64, column: &str) -> Result<u64> {
    value.trim().parse().map_err(|_| MigrationError::Report {
        line,
        message: format!("invalid {} `{}`", column, value),
    })
}

fn parse_datetime(value: &str, line: u64, column: &str) -> Result<Option<DateTime<Utc>>> {
    if value.is_empty() {
        return Ok(None);
    }
    NaiveDateTime::parse_from_str(value, DATETIME_FORMAT)
        .map(|naive| Some(Utc.from_utc_datetime(&naive)))
        .map_err(|_| MigrationError::Report {
            line,
            message: format!("invalid {} `{}`", column, value),
        })
}

fn note_from_row(row: &csv::StringRecord, line: u64) -> Result<NoteMetadata> {
    Ok(NoteMetadata {
        id: non_empty(&row[COL_NOTE_ID]),
        name: row[COL_NOTE_NAME].to_string(),
        title: non_empty(&row[COL_NOTE_TITLE]),
        size: parse_size(&row[COL_NOTE_SIZE], line, "note size")?,
        url: None,
        date_created: parse_datetime(&row[COL_NOTE_DATE_CREATED], line, "creation date")?,
        date_updated: parse_datetime(&row[COL_NOTE_DATE_UPDATED], line, "update date")?,
    })
}

fn attachment_from_row(row: &csv::StringRecord, line: u64) -> Result<Option<AttachmentMetadata>> {
    let name = &row[COL_ATTACHMENT_NAME];
    if name.is_empty() {
        return Ok(None);
    }
    Ok(Some(AttachmentMetadata {
        name: name.to_string(),
        size: parse_size(&row[COL_ATTACHMENT_SIZE], line, "attachment size")?,
    }))
}

/// Read a report back, grouping contiguous rows of the same note.
pub fn read_report(path: &Path) -> Result<Vec<Note>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;

    let mut notes: Vec<Note> = Vec::new();
    for record in reader.records() {
        let record = record?;
        let line = record.position().map(|p| p.line()).unwrap_or_default();
        if record.len() != COLUMN_COUNT {
            return Err(MigrationError::Report {
                line,
                message: format!("expected {} columns, found {}", COLUMN_COUNT, record.len()),
            });
        }

        let attachment = attachment_from_row(&record, line)?;
        match notes.last_mut() {
            Some(note) if note.body.name == record[COL_NOTE_NAME] => {
                note.attachments.extend(attachment);
            }
            _ => notes.push(Note {
                body: note_from_row(&record, line)?,
                attachments: attachment.into_iter().collect(),
            }),
        }
    }

    Ok(notes)
}
