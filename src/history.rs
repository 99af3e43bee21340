//! Persistent record of finished sessions.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Local};
use log::debug;
use rusqlite::{params, Connection};

use crate::app_dirs::AppDirs;
use crate::error::HistoryError;
use crate::session::{EndReason, SessionSummary};
use crate::util::{max, mean, std_dev};

/// Only the most recent sessions are retained.
pub const MAX_HISTORY: usize = 100;

pub trait HistoryStore {
    fn append(&mut self, summary: &SessionSummary) -> Result<(), HistoryError>;
    /// Stored sessions, oldest first.
    fn load(&self) -> Result<Vec<SessionSummary>, HistoryError>;
}

/// SQLite-backed history
#[derive(Debug)]
pub struct HistoryDb {
    conn: Connection,
}

impl HistoryDb {
    /// Open the database at the default state location, creating it if needed.
    pub fn open_default() -> Result<Self, HistoryError> {
        let path = AppDirs::history_db_path().unwrap_or_else(|| PathBuf::from("typerace_history.db"));
        Self::open(path)
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, HistoryError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| HistoryError::CreateDir {
                path: parent.display().to_string(),
                source,
            })?;
        }

        debug!("opening history at {}", path.display());
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, HistoryError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, HistoryError> {
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS sessions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                typing_speed REAL NOT NULL,
                accuracy REAL NOT NULL,
                total_words INTEGER NOT NULL,
                matched_words INTEGER NOT NULL,
                error_count INTEGER NOT NULL,
                duration_ms INTEGER NOT NULL,
                completed_at TEXT NOT NULL,
                end_reason TEXT NOT NULL
            )
            "#,
            [],
        )?;

        Ok(HistoryDb { conn })
    }
}

impl HistoryStore for HistoryDb {
    fn append(&mut self, summary: &SessionSummary) -> Result<(), HistoryError> {
        let tx = self.conn.transaction()?;

        tx.execute(
            r#"
            INSERT INTO sessions
            (typing_speed, accuracy, total_words, matched_words, error_count, duration_ms, completed_at, end_reason)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                summary.typing_speed,
                summary.accuracy,
                summary.total_words as i64,
                summary.matched_words as i64,
                summary.error_count as i64,
                summary.duration.as_millis() as i64,
                summary.completed_at.to_rfc3339(),
                summary.end_reason.to_string(),
            ],
        )?;

        tx.execute(
            "DELETE FROM sessions WHERE id NOT IN (SELECT id FROM sessions ORDER BY id DESC LIMIT ?1)",
            params![MAX_HISTORY as i64],
        )?;

        tx.commit()?;
        Ok(())
    }

    fn load(&self) -> Result<Vec<SessionSummary>, HistoryError> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT typing_speed, accuracy, total_words, matched_words, error_count, duration_ms, completed_at, end_reason
            FROM sessions
            ORDER BY id ASC
            "#,
        )?;

        let rows = stmt.query_map([], |row| {
            let completed_at: String = row.get(6)?;
            let completed_at = DateTime::parse_from_rfc3339(&completed_at)
                .map_err(|_| {
                    rusqlite::Error::InvalidColumnType(
                        6,
                        "completed_at".to_string(),
                        rusqlite::types::Type::Text,
                    )
                })?
                .with_timezone(&Local);

            let end_reason: String = row.get(7)?;
            let end_reason = end_reason.parse::<EndReason>().map_err(|_| {
                rusqlite::Error::InvalidColumnType(
                    7,
                    "end_reason".to_string(),
                    rusqlite::types::Type::Text,
                )
            })?;

            Ok(SessionSummary {
                typing_speed: row.get(0)?,
                accuracy: row.get(1)?,
                total_words: row.get::<_, i64>(2)? as usize,
                matched_words: row.get::<_, i64>(3)? as usize,
                error_count: row.get::<_, i64>(4)? as usize,
                duration: Duration::from_millis(row.get::<_, i64>(5)?.max(0) as u64),
                completed_at,
                end_reason,
            })
        })?;

        let mut sessions = Vec::new();
        for session in rows {
            sessions.push(session?);
        }

        Ok(sessions)
    }
}

/// Aggregates over stored sessions
#[derive(Debug, Clone, PartialEq)]
pub struct HistorySummary {
    pub total_sessions: usize,
    pub average_speed: f64,
    pub best_speed: f64,
    pub speed_std_dev: f64,
    pub average_accuracy: f64,
    pub best_accuracy: f64,
}

impl HistorySummary {
    /// `None` when there is nothing to summarise.
    pub fn from_sessions(sessions: &[SessionSummary]) -> Option<Self> {
        let speeds: Vec<f64> = sessions.iter().map(|s| s.typing_speed).collect();
        let accuracies: Vec<f64> = sessions.iter().map(|s| s.accuracy).collect();

        Some(Self {
            total_sessions: sessions.len(),
            average_speed: mean(&speeds)?,
            best_speed: max(&speeds)?,
            speed_std_dev: std_dev(&speeds)?,
            average_accuracy: mean(&accuracies)?,
            best_accuracy: max(&accuracies)?,
        })
    }
}

/// The last `n` sessions, most recent first.
pub fn recent(sessions: &[SessionSummary], n: usize) -> Vec<&SessionSummary> {
    sessions.iter().rev().take(n).collect()
}

/// Sessions completed within the last `days` days.
pub fn sessions_since(sessions: &[SessionSummary], days: i64) -> Vec<&SessionSummary> {
    let cutoff = Local::now() - chrono::Duration::days(days);
    sessions
        .iter()
        .filter(|s| s.completed_at > cutoff)
        .collect()
}
