//! SQLite persistence layer.
//!
//! RULE: Only store.rs talks to the database.
//! The session calls store methods — it never executes SQL directly.

use crate::{
    analysis::AnalysisResult,
    error::{DeskError, DeskResult},
    event::DeskEvent,
    session::PublishedAnalysis,
};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

/// One row of the event log.
#[derive(Debug, Clone, PartialEq)]
pub struct EventLogEntry {
    pub id:         Option<i64>,
    pub event_type: String,
    pub payload:    String,
    pub created_at: String,
}

pub struct AnalysisStore {
    conn: Connection,
}

impl AnalysisStore {
    /// Open (or create) the database at `path`.
    pub fn open(path: &str) -> DeskResult<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> DeskResult<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn })
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> DeskResult<()> {
        self.conn.execute_batch(include_str!("../migrations/001_analysis.sql"))?;
        Ok(())
    }

    // ── Analysis history ───────────────────────────────────────

    pub fn insert_analysis(&self, published: &PublishedAnalysis) -> DeskResult<()> {
        let stats = &published.result.statistics;
        self.conn.execute(
            "INSERT INTO analysis_run
                (analysis_id, request_id, provenance, published_at,
                 total_transactions, suspicious_count, fraud_rate, total_at_risk, payload)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                published.analysis_id,
                published.request_id as i64,
                published.result.provenance.as_str(),
                published.published_at.to_rfc3339(),
                stats.total_transactions as i64,
                stats.suspicious_count as i64,
                stats.fraud_rate,
                stats.total_at_risk,
                serde_json::to_string(&published.result)?,
            ],
        )?;
        Ok(())
    }

    /// Most recently published analysis, if any.
    pub fn latest_analysis(&self) -> DeskResult<Option<PublishedAnalysis>> {
        let row = self
            .conn
            .query_row(
                "SELECT analysis_id, request_id, published_at, payload
                 FROM analysis_run
                 ORDER BY rowid DESC LIMIT 1",
                [],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                },
            )
            .optional()?;

        let Some((analysis_id, request_id, published_at, payload)) = row else {
            return Ok(None);
        };

        let result: AnalysisResult = serde_json::from_str(&payload)?;
        let published_at = DateTime::parse_from_rfc3339(&published_at)
            .map_err(|e| DeskError::Other(anyhow::anyhow!("bad published_at '{published_at}': {e}")))?
            .with_timezone(&Utc);

        Ok(Some(PublishedAnalysis {
            analysis_id,
            request_id: request_id as u64,
            published_at,
            result,
        }))
    }

    pub fn analysis_count(&self) -> DeskResult<i64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM analysis_run", [], |row| row.get(0))?;
        Ok(count)
    }

    // ── Event log ──────────────────────────────────────────────

    pub fn append_event(&self, event: &DeskEvent) -> DeskResult<()> {
        self.conn.execute(
            "INSERT INTO event_log (event_type, payload, created_at) VALUES (?1, ?2, ?3)",
            params![
                event.type_name(),
                serde_json::to_string(event)?,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn events_of_type(&self, event_type: &str) -> DeskResult<Vec<EventLogEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, event_type, payload, created_at
             FROM event_log WHERE event_type = ?1
             ORDER BY id ASC",
        )?;
        let entries = stmt
            .query_map(params![event_type], |row| {
                Ok(EventLogEntry {
                    id:         Some(row.get(0)?),
                    event_type: row.get(1)?,
                    payload:    row.get(2)?,
                    created_at: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    pub fn event_count(&self) -> DeskResult<i64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM event_log", [], |row| row.get(0))?;
        Ok(count)
    }
}
