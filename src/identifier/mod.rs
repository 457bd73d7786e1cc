//! Evernote identifier resolution.
//!
//! Links between exported notes still point at Evernote identifiers. The index
//! maps a note title (plus its creation date, for duplicate titles) to that
//! identifier, then the identifier to the file the note was migrated to.
//!
//! Lifecycle: [`IdentifierIndex::new`] is cheap; the external source is
//! scanned once, on [`IdentifierIndex::finalize`] or on the first lookup.

mod evernote_db;

pub use evernote_db::EvernoteDb;

use chrono::{DateTime, TimeZone, Utc};
use once_cell::unsync::OnceCell;
use std::collections::HashMap;

use crate::error::Result;
use crate::normalize::normalize_title;

/// Row of the external identifier source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteRecord {
    pub id: String,
    pub title: String,
    /// Milliseconds since the Unix epoch.
    pub created_ms: Option<i64>,
    /// Logically deleted (in the trash).
    pub deleted: bool,
}

/// Read-only access to the notes known by Evernote.
pub trait NoteIdSource {
    fn scan(&self) -> Result<Vec<NoteRecord>>;
}

impl NoteIdSource for Vec<NoteRecord> {
    fn scan(&self) -> Result<Vec<NoteRecord>> {
        Ok(self.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteId {
    pub id: String,
    pub date_created: Option<DateTime<Utc>>,
}

impl From<&NoteRecord> for NoteId {
    fn from(record: &NoteRecord) -> Self {
        let date_created = record
            .created_ms
            .and_then(|ms| Utc.timestamp_opt(ms.div_euclid(1_000), 0).single());
        Self {
            id: record.id.clone(),
            date_created,
        }
    }
}

pub struct IdentifierIndex {
    source: Box<dyn NoteIdSource>,
    /// Normalized title => candidates, in scan order
    title_to_ids: OnceCell<HashMap<String, Vec<NoteId>>>,
    /// Evernote ID => migrated note file name
    id_to_container: HashMap<String, String>,
}

impl IdentifierIndex {
    pub fn new(source: impl NoteIdSource + 'static) -> Self {
        Self {
            source: Box::new(source),
            title_to_ids: OnceCell::new(),
            id_to_container: HashMap::new(),
        }
    }

    pub fn is_finalized(&self) -> bool {
        self.title_to_ids.get().is_some()
    }

    /// Scan the source and build the title index. Only the first call scans.
    pub fn finalize(&self) -> Result<()> {
        self.titles().map(|_| ())
    }

    fn titles(&self) -> Result<&HashMap<String, Vec<NoteId>>> {
        self.title_to_ids.get_or_try_init(|| {
            let records = self.source.scan()?;
            let mut map: HashMap<String, Vec<NoteId>> = HashMap::new();
            let mut count = 0usize;
            for record in records.iter().filter(|r| !r.deleted) {
                // Duplicate titles are legitimate
                map.entry(normalize_title(&record.title))
                    .or_default()
                    .push(NoteId::from(record));
                count += 1;
            }
            log::info!("Indexed {} Evernote notes under {} titles", count, map.len());
            Ok(map)
        })
    }

    /// Evernote identifier of a note, disambiguated by creation date when
    /// several notes share the title. Lookup failures are logged, not raised.
    pub fn resolve(
        &self,
        title: Option<&str>,
        date_created: Option<DateTime<Utc>>,
    ) -> Result<Option<String>> {
        let Some(title) = title else {
            return Ok(None);
        };
        let title = normalize_title(title);

        let Some(candidates) = self.titles()?.get(&title) else {
            log::warn!("Note ID not found for `{}`", title);
            return Ok(None);
        };

        if let [single] = candidates.as_slice() {
            return Ok(Some(single.id.clone()));
        }

        let Some(date_created) = date_created else {
            log::warn!("Note ID not found for `{}` (can't disambiguate)", title);
            return Ok(None);
        };

        let matching: Vec<&NoteId> = candidates
            .iter()
            .filter(|n| n.date_created == Some(date_created))
            .collect();
        match matching.as_slice() {
            [single] => Ok(Some(single.id.clone())),
            _ => {
                log::warn!(
                    "Ambiguous note title `{}` ({} notes created {})",
                    title,
                    matching.len(),
                    date_created
                );
                Ok(None)
            }
        }
    }

    /// Register the file a note was migrated to. Last write wins.
    pub fn record_container(&mut self, id: &str, filename: &str) {
        self.id_to_container.insert(id.to_string(), filename.to_string());
    }

    pub fn container_of(&self, id: &str) -> Option<&str> {
        self.id_to_container.get(id).map(String::as_str)
    }

    pub fn container_count(&self) -> usize {
        self.id_to_container.len()
    }
}
