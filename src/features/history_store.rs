// Calculation history persisted in SQLite.
// Each operation opens its own connection so the store can be shared with the
// persistence worker thread by cloning the path.

use serde::{Deserialize, Serialize};
use sqlite::{Connection, State, Statement};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

pub const DEFAULT_TYPE_LIMIT: i64 = 50;
pub const DEFAULT_DAYS_TO_KEEP: i64 = 30;
const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;
const BUSY_TIMEOUT_MS: usize = 2_000;

const CREATE_TABLE_SQL: &str = "CREATE TABLE IF NOT EXISTS calculation_history (
    id TEXT PRIMARY KEY NOT NULL,
    type TEXT NOT NULL,
    input TEXT NOT NULL,
    result TEXT NOT NULL,
    timestamp INTEGER NOT NULL,
    is_favorite INTEGER NOT NULL DEFAULT 0
)";

const SELECT_COLUMNS: &str = "SELECT id, type, input, result, timestamp, is_favorite FROM calculation_history";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] sqlite::Error),

    #[error("unknown calculation type: {0}")]
    UnknownType(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CalculationType {
    BasicMath,
    Matrix,
    Electronics,
    Physics,
    Chemistry,
    UnitConversion,
}

impl CalculationType {
    pub fn as_str(self) -> &'static str {
        match self {
            CalculationType::BasicMath => "BASIC_MATH",
            CalculationType::Matrix => "MATRIX",
            CalculationType::Electronics => "ELECTRONICS",
            CalculationType::Physics => "PHYSICS",
            CalculationType::Chemistry => "CHEMISTRY",
            CalculationType::UnitConversion => "UNIT_CONVERSION",
        }
    }
}

impl fmt::Display for CalculationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CalculationType {
    type Err = StoreError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "BASIC_MATH" => Ok(CalculationType::BasicMath),
            "MATRIX" => Ok(CalculationType::Matrix),
            "ELECTRONICS" => Ok(CalculationType::Electronics),
            "PHYSICS" => Ok(CalculationType::Physics),
            "CHEMISTRY" => Ok(CalculationType::Chemistry),
            "UNIT_CONVERSION" => Ok(CalculationType::UnitConversion),
            other => Err(StoreError::UnknownType(other.to_string())),
        }
    }
}

/// A calculation as persisted and listed on the history screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalculationRecord {
    pub id: String,
    pub kind: CalculationType,
    pub input: String,
    pub result: String,
    pub timestamp_ms: i64,
    pub is_favorite: bool,
}

impl CalculationRecord {
    pub fn basic_math(input: &str, result: &str, timestamp_ms: i64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind: CalculationType::BasicMath,
            input: input.to_string(),
            result: result.to_string(),
            timestamp_ms,
            is_favorite: false,
        }
    }
}

/// Query and mutation surface of the history database. Lists are newest first.
pub trait HistoryStore {
    fn get_all(&self) -> StoreResult<Vec<CalculationRecord>>;
    fn get_favorites(&self) -> StoreResult<Vec<CalculationRecord>>;
    fn get_by_type(&self, kind: CalculationType, limit: i64) -> StoreResult<Vec<CalculationRecord>>;
    fn get_by_id(&self, id: &str) -> StoreResult<Option<CalculationRecord>>;
    fn search(&self, query: &str) -> StoreResult<Vec<CalculationRecord>>;
    fn save(&self, record: &CalculationRecord) -> StoreResult<()>;
    fn toggle_favorite(&self, id: &str) -> StoreResult<()>;
    fn delete(&self, id: &str) -> StoreResult<()>;
    fn clear_all(&self) -> StoreResult<()>;
    /// Favorites survive pruning.
    fn delete_older_than(&self, cutoff_ms: i64) -> StoreResult<()>;

    fn clean_old_history(&self, days_to_keep: i64, now_ms: i64) -> StoreResult<()> {
        self.delete_older_than(now_ms - days_to_keep * MILLIS_PER_DAY)
    }
}

#[derive(Debug, Clone)]
pub struct SqliteHistoryStore {
    path: PathBuf,
}

impl SqliteHistoryStore {
    /// Opens (and if needed creates) the database at `path`.
    pub fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let store = Self { path: path.into() };
        store.connect()?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn connect(&self) -> StoreResult<Connection> {
        let mut conn = Connection::open(&self.path)?;
        // The worker thread writes while the UI thread reads.
        conn.set_busy_timeout(BUSY_TIMEOUT_MS)?;
        conn.execute(CREATE_TABLE_SQL)?;
        Ok(conn)
    }

    fn execute_with_id(&self, sql: &str, id: &str) -> StoreResult<()> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(sql)?;
        stmt.bind((1, id))?;
        run_to_completion(&mut stmt)
    }
}

impl HistoryStore for SqliteHistoryStore {
    fn get_all(&self) -> StoreResult<Vec<CalculationRecord>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(format!("{SELECT_COLUMNS} ORDER BY timestamp DESC"))?;
        read_records(&mut stmt)
    }

    fn get_favorites(&self) -> StoreResult<Vec<CalculationRecord>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(format!(
            "{SELECT_COLUMNS} WHERE is_favorite = 1 ORDER BY timestamp DESC"
        ))?;
        read_records(&mut stmt)
    }

    fn get_by_type(&self, kind: CalculationType, limit: i64) -> StoreResult<Vec<CalculationRecord>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(format!(
            "{SELECT_COLUMNS} WHERE type = ? ORDER BY timestamp DESC LIMIT ?"
        ))?;
        stmt.bind((1, kind.as_str()))?;
        stmt.bind((2, limit))?;
        read_records(&mut stmt)
    }

    fn get_by_id(&self, id: &str) -> StoreResult<Option<CalculationRecord>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(format!("{SELECT_COLUMNS} WHERE id = ? LIMIT 1"))?;
        stmt.bind((1, id))?;
        Ok(read_records(&mut stmt)?.into_iter().next())
    }

    fn search(&self, query: &str) -> StoreResult<Vec<CalculationRecord>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(format!(
            "{SELECT_COLUMNS} WHERE input LIKE '%' || ? || '%' OR result LIKE '%' || ? || '%' \
             ORDER BY timestamp DESC"
        ))?;
        stmt.bind((1, query))?;
        stmt.bind((2, query))?;
        read_records(&mut stmt)
    }

    fn save(&self, record: &CalculationRecord) -> StoreResult<()> {
        let id = if record.id.is_empty() {
            Uuid::new_v4().to_string()
        } else {
            record.id.clone()
        };
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "INSERT OR REPLACE INTO calculation_history \
             (id, type, input, result, timestamp, is_favorite) VALUES (?, ?, ?, ?, ?, ?)",
        )?;
        stmt.bind((1, id.as_str()))?;
        stmt.bind((2, record.kind.as_str()))?;
        stmt.bind((3, record.input.as_str()))?;
        stmt.bind((4, record.result.as_str()))?;
        stmt.bind((5, record.timestamp_ms))?;
        stmt.bind((6, i64::from(record.is_favorite)))?;
        run_to_completion(&mut stmt)
    }

    fn toggle_favorite(&self, id: &str) -> StoreResult<()> {
        self.execute_with_id(
            "UPDATE calculation_history \
             SET is_favorite = CASE WHEN is_favorite = 1 THEN 0 ELSE 1 END WHERE id = ?",
            id,
        )
    }

    fn delete(&self, id: &str) -> StoreResult<()> {
        self.execute_with_id("DELETE FROM calculation_history WHERE id = ?", id)
    }

    fn clear_all(&self) -> StoreResult<()> {
        let conn = self.connect()?;
        conn.execute("DELETE FROM calculation_history")?;
        Ok(())
    }

    fn delete_older_than(&self, cutoff_ms: i64) -> StoreResult<()> {
        let conn = self.connect()?;
        let mut stmt = conn
            .prepare("DELETE FROM calculation_history WHERE timestamp < ? AND is_favorite = 0")?;
        stmt.bind((1, cutoff_ms))?;
        run_to_completion(&mut stmt)
    }
}

fn run_to_completion(stmt: &mut Statement<'_>) -> StoreResult<()> {
    while stmt.next()? != State::Done {}
    Ok(())
}

fn read_records(stmt: &mut Statement<'_>) -> StoreResult<Vec<CalculationRecord>> {
    let mut records = Vec::new();
    while stmt.next()? == State::Row {
        let kind = stmt.read::<String, _>("type")?;
        records.push(CalculationRecord {
            id: stmt.read::<String, _>("id")?,
            kind: kind.parse()?,
            input: stmt.read::<String, _>("input")?,
            result: stmt.read::<String, _>("result")?,
            timestamp_ms: stmt.read::<i64, _>("timestamp")?,
            is_favorite: stmt.read::<i64, _>("is_favorite")? != 0,
        });
    }
    Ok(records)
}
