//! SQLite-backed message persistence.

use rusqlite::{params, Connection};
use snafu::{ResultExt, Snafu};

#[derive(Debug, Snafu)]
pub enum PersistError {
    #[snafu(display("failed to open database at {path}: {source}"))]
    Open { path: String, source: rusqlite::Error },
    #[snafu(display("failed to initialize schema: {source}"))]
    Schema { source: rusqlite::Error },
    #[snafu(display("failed to insert batch: {source}"))]
    Insert { source: rusqlite::Error },
    #[snafu(display("failed to query recent records: {source}"))]
    Query { source: rusqlite::Error },
}

/// One decoded-message row as stored and retrieved from the database.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub id: i64,
    pub timestamp: i64,
    pub band: String,
    pub frequency: f64,
    pub mode: String,
    pub snr: f64,
    pub text: String,
}

/// A row not yet assigned an id, as produced by the decoder thread.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRecord {
    pub timestamp: i64,
    pub band: String,
    pub frequency: f64,
    pub mode: String,
    pub snr: f64,
    pub text: String,
}

pub trait Persister: Send {
    fn insert_batch(&mut self, records: &[NewRecord]) -> Result<(), PersistError>;
    fn recent(&self, limit: usize) -> Result<Vec<Record>, PersistError>;
}

/// `rusqlite`-backed persister. Owned by the persister thread only.
pub struct SqlitePersister {
    conn: Connection,
}

impl SqlitePersister {
    pub fn open(path: &str) -> Result<Self, PersistError> {
        let conn = Connection::open(path).context(OpenSnafu { path })?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS messages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp INTEGER NOT NULL,
                band TEXT NOT NULL,
                frequency REAL NOT NULL,
                mode TEXT NOT NULL,
                snr REAL NOT NULL,
                text TEXT NOT NULL
            )",
            [],
        )
        .context(SchemaSnafu)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self, PersistError> {
        Self::open(":memory:")
    }
}

impl Persister for SqlitePersister {
    /// Inserts the whole batch in a single transaction; any failed insert
    /// rolls back the batch.
    fn insert_batch(&mut self, records: &[NewRecord]) -> Result<(), PersistError> {
        if records.is_empty() {
            return Ok(());
        }

        let tx = self.conn.transaction().context(InsertSnafu)?;
        for record in records {
            tx.execute(
                "INSERT INTO messages (timestamp, band, frequency, mode, snr, text) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![record.timestamp, record.band, record.frequency, record.mode, record.snr, record.text],
            )
            .context(InsertSnafu)?;
        }
        tx.commit().context(InsertSnafu)?;
        Ok(())
    }

    fn recent(&self, limit: usize) -> Result<Vec<Record>, PersistError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, timestamp, band, frequency, mode, snr, text FROM messages ORDER BY id DESC LIMIT ?1")
            .context(QuerySnafu)?;

        let rows = stmt
            .query_map(params![limit as i64], |row| {
                Ok(Record {
                    id: row.get(0)?,
                    timestamp: row.get(1)?,
                    band: row.get(2)?,
                    frequency: row.get(3)?,
                    mode: row.get(4)?,
                    snr: row.get(5)?,
                    text: row.get(6)?,
                })
            })
            .context(QuerySnafu)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row.context(QuerySnafu)?);
        }
        Ok(records)
    }
}

/// Normalize a mode string to the taxonomy's two known values, defaulting
/// unknown input to `"FT8"`.
pub fn normalize_mode(mode: &str) -> &'static str {
    match mode {
        "JS8" => "JS8",
        "FT8" => "FT8",
        _ => "FT8",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(text: &str, id_hint: i64) -> NewRecord {
        NewRecord {
            timestamp: 1_700_000_000 + id_hint,
            band: "40m FT8".to_string(),
            frequency: 1234.5,
            mode: "FT8".to_string(),
            snr: -10.0,
            text: text.to_string(),
        }
    }

    #[test]
    fn insert_then_recent_round_trips_a_batch() {
        let mut db = SqlitePersister::open_in_memory().unwrap();
        let batch = vec![sample("CQ N0CALL EM00", 1), sample("K1ABC W2XYZ R-05", 2), sample("73", 3)];
        db.insert_batch(&batch).unwrap();

        let recent = db.recent(3).unwrap();
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].text, "73");
        assert_eq!(recent[2].text, "CQ N0CALL EM00");
        assert_eq!(recent[0].band, "40m FT8");
    }

    #[test]
    fn empty_batch_is_a_no_op() {
        let mut db = SqlitePersister::open_in_memory().unwrap();
        db.insert_batch(&[]).unwrap();
        assert!(db.recent(10).unwrap().is_empty());
    }

    #[test]
    fn recent_limits_to_the_requested_count() {
        let mut db = SqlitePersister::open_in_memory().unwrap();
        let batch: Vec<_> = (0..5).map(|i| sample(&format!("msg{i}"), i)).collect();
        db.insert_batch(&batch).unwrap();
        assert_eq!(db.recent(2).unwrap().len(), 2);
    }

    #[test]
    fn opens_and_persists_to_a_real_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("messages.db");
        let path_str = path.to_str().unwrap();

        {
            let mut db = SqlitePersister::open(path_str).unwrap();
            db.insert_batch(&[sample("CQ DX", 1)]).unwrap();
        }

        let db = SqlitePersister::open(path_str).unwrap();
        let recent = db.recent(1).unwrap();
        assert_eq!(recent[0].text, "CQ DX");
    }

    #[test]
    fn normalize_mode_defaults_unknown_to_ft8() {
        assert_eq!(normalize_mode("JS8"), "JS8");
        assert_eq!(normalize_mode("FT8"), "FT8");
        assert_eq!(normalize_mode("carrier pigeon"), "FT8");
    }
}
