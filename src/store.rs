use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};
use thiserror::Error;
use tracing::{debug, warn};

use crate::draft::{Side, TeamComposition};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite")]
    Sqlite(#[from] rusqlite::Error),
    #[error("create store directory {path}")]
    CreateDir {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("encode composition")]
    Encode(#[from] serde_json::Error),
    #[error("record {id} has unreadable timestamp {raw:?}")]
    Timestamp { id: i64, raw: String },
    #[error("record {id} has unknown result label {label:?}")]
    ResultLabel { id: i64, label: String },
}

/// A stored prediction. Never updated once written.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionRecord {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub blue: TeamComposition,
    pub red: TeamComposition,
    pub probability_blue: f64,
    pub probability_red: f64,
    pub winner: Side,
}

#[derive(Debug, Clone, Copy)]
pub struct NewPrediction<'a> {
    pub timestamp: DateTime<Utc>,
    pub blue: &'a TeamComposition,
    pub red: &'a TeamComposition,
    pub probability_blue: f64,
    pub probability_red: f64,
    pub winner: Side,
}

/// Append-only prediction log plus the read-only champion catalog.
pub struct MatchStore {
    conn: Mutex<Connection>,
}

impl MatchStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::CreateDir {
                path: parent.display().to_string(),
                source,
            })?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        Self::with_connection(conn)
    }

    pub fn in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Each write is a single statement or transaction; a panicked holder leaves no partial rows.
    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| {
            warn!("store lock was poisoned; recovering connection");
            PoisonError::into_inner(poisoned)
        })
    }

    pub fn append(&self, prediction: &NewPrediction<'_>) -> Result<i64, StoreError> {
        let blue = serde_json::to_string(prediction.blue)?;
        let red = serde_json::to_string(prediction.red)?;
        let conn = self.conn();
        conn.execute(
            r#"
            INSERT INTO predictions (
                created_at, champions_blue, champions_red,
                probability_blue, probability_red, result
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                prediction
                    .timestamp
                    .to_rfc3339_opts(SecondsFormat::Micros, true),
                blue,
                red,
                prediction.probability_blue,
                prediction.probability_red,
                prediction.winner.result_label(),
            ],
        )?;
        let id = conn.last_insert_rowid();
        debug!(id, "prediction stored");
        Ok(id)
    }

    /// Every record in insertion order, read in a single statement.
    pub fn records(&self) -> Result<Vec<PredictionRecord>, StoreError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!("{SELECT_RECORDS} ORDER BY id"))?;
        let raw = stmt
            .query_map([], raw_record)?
            .collect::<Result<Vec<_>, _>>()?;
        raw.into_iter().map(RawRecord::decode).collect()
    }

    pub fn first_record(&self) -> Result<Option<PredictionRecord>, StoreError> {
        let conn = self.conn();
        let raw = conn
            .query_row(
                &format!("{SELECT_RECORDS} ORDER BY id LIMIT 1"),
                [],
                raw_record,
            )
            .optional()?;
        raw.map(RawRecord::decode).transpose()
    }

    pub fn count(&self) -> Result<usize, StoreError> {
        let conn = self.conn();
        let total: i64 = conn.query_row("SELECT COUNT(*) FROM predictions", [], |row| row.get(0))?;
        Ok(usize::try_from(total).unwrap_or_default())
    }

    /// Sorted distinct champion names from the catalog.
    pub fn champion_names(&self) -> Result<Vec<String>, StoreError> {
        let conn = self.conn();
        let mut stmt = conn.prepare("SELECT DISTINCT name FROM champions ORDER BY name")?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(names)
    }

    /// Inserts catalog names not already present; returns how many were new.
    pub fn seed_champions(&self, names: &[String]) -> Result<usize, StoreError> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        let mut inserted = 0usize;
        {
            let mut stmt = tx.prepare("INSERT OR IGNORE INTO champions (name) VALUES (?1)")?;
            for name in names {
                let trimmed = name.trim();
                if trimmed.is_empty() {
                    continue;
                }
                inserted += stmt.execute(params![trimmed])?;
            }
        }
        tx.commit()?;
        Ok(inserted)
    }
}

fn init_schema(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS predictions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            created_at TEXT NOT NULL,
            champions_blue TEXT NOT NULL,
            champions_red TEXT NOT NULL,
            probability_blue REAL NOT NULL,
            probability_red REAL NOT NULL,
            result TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_predictions_result ON predictions(result);

        CREATE TABLE IF NOT EXISTS champions (
            name TEXT PRIMARY KEY
        );
        "#,
    )?;
    Ok(())
}

const SELECT_RECORDS: &str = "SELECT id, created_at, champions_blue, champions_red, \
     probability_blue, probability_red, result FROM predictions";

struct RawRecord {
    id: i64,
    created_at: String,
    blue: String,
    red: String,
    probability_blue: f64,
    probability_red: f64,
    result: String,
}

fn raw_record(row: &Row<'_>) -> rusqlite::Result<RawRecord> {
    Ok(RawRecord {
        id: row.get(0)?,
        created_at: row.get(1)?,
        blue: row.get(2)?,
        red: row.get(3)?,
        probability_blue: row.get(4)?,
        probability_red: row.get(5)?,
        result: row.get(6)?,
    })
}

impl RawRecord {
    fn decode(self) -> Result<PredictionRecord, StoreError> {
        let timestamp = DateTime::parse_from_rfc3339(&self.created_at)
            .map_err(|_| StoreError::Timestamp {
                id: self.id,
                raw: self.created_at.clone(),
            })?
            .with_timezone(&Utc);
        let winner = Side::from_result_label(&self.result).ok_or_else(|| {
            StoreError::ResultLabel {
                id: self.id,
                label: self.result.clone(),
            }
        })?;
        Ok(PredictionRecord {
            id: self.id,
            timestamp,
            blue: serde_json::from_str(&self.blue)?,
            red: serde_json::from_str(&self.red)?,
            probability_blue: self.probability_blue,
            probability_red: self.probability_red,
            winner,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blue() -> TeamComposition {
        TeamComposition::new(["Yone", "Maokai", "Corki", "Ziggs", "Bard"])
    }

    fn red() -> TeamComposition {
        TeamComposition::new(["Jax", "Nocturne", "Tristana", "Sivir", "Alistar"])
    }

    #[test]
    fn appended_records_read_back_in_order() {
        let store = MatchStore::in_memory().unwrap();
        let (blue, red) = (blue(), red());
        let now = Utc::now();
        let first = store
            .append(&NewPrediction {
                timestamp: now,
                blue: &blue,
                red: &red,
                probability_blue: 0.61234567,
                probability_red: 0.4,
                winner: Side::Blue,
            })
            .unwrap();
        let second = store
            .append(&NewPrediction {
                timestamp: now,
                blue: &red,
                red: &blue,
                probability_blue: 0.2,
                probability_red: 0.7,
                winner: Side::Red,
            })
            .unwrap();
        assert!(second > first);

        let records = store.records().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].blue, blue);
        assert_eq!(records[0].probability_blue, 0.61234567);
        assert_eq!(records[0].winner, Side::Blue);
        assert_eq!(records[1].winner, Side::Red);
        assert_eq!(
            records[0].timestamp.timestamp_micros(),
            now.timestamp_micros()
        );
        assert_eq!(store.count().unwrap(), 2);
        assert_eq!(store.first_record().unwrap().map(|r| r.id), Some(first));
    }

    #[test]
    fn empty_store_has_no_first_record() {
        let store = MatchStore::in_memory().unwrap();
        assert!(store.first_record().unwrap().is_none());
        assert_eq!(store.count().unwrap(), 0);
        assert!(store.records().unwrap().is_empty());
    }

    #[test]
    fn panicked_holder_does_not_disable_the_store() {
        let store = MatchStore::in_memory().unwrap();
        std::thread::scope(|scope| {
            let worker = scope.spawn(|| {
                let _guard = store.conn.lock().unwrap();
                panic!("worker died holding the connection");
            });
            assert!(worker.join().is_err());
        });
        assert!(store.conn.is_poisoned());

        let (blue, red) = (blue(), red());
        let id = store
            .append(&NewPrediction {
                timestamp: Utc::now(),
                blue: &blue,
                red: &red,
                probability_blue: 0.6,
                probability_red: 0.4,
                winner: Side::Blue,
            })
            .unwrap();
        assert_eq!(store.count().unwrap(), 1);
        assert_eq!(store.first_record().unwrap().map(|r| r.id), Some(id));
    }

    #[test]
    fn champion_catalog_is_sorted_and_distinct() {
        let store = MatchStore::in_memory().unwrap();
        let names = ["Zed", "Ahri", " Ahri ", "", "Bard"].map(String::from);
        assert_eq!(store.seed_champions(&names).unwrap(), 3);
        assert_eq!(store.seed_champions(&names).unwrap(), 0);
        assert_eq!(store.champion_names().unwrap(), ["Ahri", "Bard", "Zed"]);
    }
}
