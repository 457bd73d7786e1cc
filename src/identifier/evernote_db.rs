use rusqlite::{Connection, OpenFlags};
use std::path::Path;

use super::{NoteIdSource, NoteRecord};
use crate::error::Result;

const SQL_SCAN_NOTES: &str = "SELECT id, label, created, deleted IS NOT NULL FROM Nodes_Note";

/// Evernote local database (the `conduit-storage` SQLite file of Evernote 10).
///
/// Opened read-only: the database belongs to the Evernote client.
pub struct EvernoteDb {
    conn: Connection,
}

impl EvernoteDb {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        conn.execute_batch("PRAGMA query_only=ON;")?;
        log::info!("Opened Evernote database {}", path.display());
        Ok(Self { conn })
    }
}

impl NoteIdSource for EvernoteDb {
    fn scan(&self) -> Result<Vec<NoteRecord>> {
        let mut stmt = self.conn.prepare(SQL_SCAN_NOTES)?;
        let rows = stmt.query_map([], |row| {
            // `created` may be stored as INTEGER or REAL
            let created: Option<f64> = row.get(2)?;
            Ok(NoteRecord {
                id: row.get(0)?,
                title: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                created_ms: created.map(|ms| ms as i64),
                deleted: row.get(3)?,
            })
        })?;
        let records = rows.collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MigrationError;
    use crate::identifier::IdentifierIndex;
    use tempfile::TempDir;

    fn create_database(path: &Path) {
        let conn = Connection::open(path).unwrap();
        conn.execute_batch(
            "CREATE TABLE Nodes_Note (id TEXT PRIMARY KEY, label TEXT, created INTEGER, deleted INTEGER);
             INSERT INTO Nodes_Note VALUES ('n-1', 'Recipes', 1600000000000, NULL);
             INSERT INTO Nodes_Note VALUES ('n-2', 'Trash me', 1600000001000, 1650000000000);
             INSERT INTO Nodes_Note VALUES ('n-3', NULL, NULL, NULL);",
        )
        .unwrap();
    }

    #[test]
    fn test_scan_reads_every_row() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("conduit.sql");
        create_database(&db_path);

        let db = EvernoteDb::open(&db_path).unwrap();
        let mut records = db.scan().unwrap();
        records.sort_by(|a, b| a.id.cmp(&b.id));

        assert_eq!(records.len(), 3);
        assert_eq!(records[0].title, "Recipes");
        assert_eq!(records[0].created_ms, Some(1_600_000_000_000));
        assert!(!records[0].deleted);
        assert!(records[1].deleted);
        assert_eq!(records[2].title, "");
        assert_eq!(records[2].created_ms, None);
    }

    #[test]
    fn test_index_over_database_skips_deleted() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("conduit.sql");
        create_database(&db_path);

        let index = IdentifierIndex::new(EvernoteDb::open(&db_path).unwrap());
        assert_eq!(index.resolve(Some("Recipes"), None).unwrap().as_deref(), Some("n-1"));
        assert_eq!(index.resolve(Some("Trash me"), None).unwrap(), None);
    }

    #[test]
    fn test_database_is_read_only() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("conduit.sql");
        create_database(&db_path);

        let db = EvernoteDb::open(&db_path).unwrap();
        let result = db.conn.execute("DELETE FROM Nodes_Note", []);
        assert!(result.is_err());
    }

    #[test]
    fn test_open_missing_database_fails() {
        let temp_dir = TempDir::new().unwrap();
        let result = EvernoteDb::open(&temp_dir.path().join("missing.sql"));
        assert!(matches!(result, Err(MigrationError::Database(_))));
    }
}
