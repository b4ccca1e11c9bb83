//! SQLite database storage
//!
//! Two append-only tables: `readings` and `analyses`. An analysis refers to
//! its reading by id; the reference is checked on insert rather than by a
//! SQL foreign key.

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use policy::Severity;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::info;

/// One stored sensor sample
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub tds: f64,
    pub temperature: f64,
    pub is_safe: bool,
    /// Any threshold crossed; not whether the AI was called
    pub ai_triggered: bool,
}

/// One stored AI assessment
#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub reading_id: i64,
    pub analysis: String,
    pub status: Severity,
    pub recommendations: Vec<String>,
    pub response_ms: i64,
}

/// Fields of an analysis before it gets an id
#[derive(Debug, Clone)]
pub struct NewAnalysis {
    pub reading_id: i64,
    pub analysis: String,
    pub status: Severity,
    pub recommendations: Vec<String>,
    pub response_ms: i64,
}

/// Counts over a time window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WindowCounts {
    pub total_readings: i64,
    pub anomalies: i64,
    pub analyses: i64,
}

pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)
            .context("Failed to open database")?;

        // WAL keeps readers off the writer's back
        conn.pragma_update(None, "journal_mode", "WAL")
            .context("Failed to enable WAL mode")?;

        conn.pragma_update(None, "busy_timeout", "5000")
            .context("Failed to set busy timeout")?;

        Ok(Self { conn: Mutex::new(conn) })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .context("Failed to open in-memory database")?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| anyhow!("Database lock poisoned"))
    }

    pub fn initialize(&self) -> Result<()> {
        info!("Initializing database schema");
        let conn = self.conn()?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS readings (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp INTEGER NOT NULL,
                tds REAL NOT NULL,
                temperature REAL NOT NULL,
                is_safe INTEGER NOT NULL,
                ai_triggered INTEGER NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_readings_timestamp ON readings(timestamp)",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS analyses (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp INTEGER NOT NULL,
                reading_id INTEGER NOT NULL,
                analysis TEXT NOT NULL,
                status TEXT NOT NULL,
                recommendations TEXT NOT NULL,
                response_ms INTEGER NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_analyses_timestamp ON analyses(timestamp)",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_analyses_reading ON analyses(reading_id)",
            [],
        )?;

        info!("Database schema initialized");

        Ok(())
    }

    /// Cheap round trip used by the health check
    pub fn ping(&self) -> Result<()> {
        let conn = self.conn()?;
        conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
        Ok(())
    }

    pub fn insert_reading(
        &self,
        recorded_at: DateTime<Utc>,
        tds: f64,
        temperature: f64,
        is_safe: bool,
        ai_triggered: bool,
    ) -> Result<Reading> {
        let timestamp = recorded_at.timestamp();
        let conn = self.conn()?;

        conn.execute(
            "INSERT INTO readings (timestamp, tds, temperature, is_safe, ai_triggered)
            VALUES (?1, ?2, ?3, ?4, ?5)",
            params![timestamp, tds, temperature, is_safe, ai_triggered],
        )
        .context("Failed to store reading")?;

        Ok(Reading {
            id: conn.last_insert_rowid(),
            timestamp: from_unix(timestamp),
            tds,
            temperature,
            is_safe,
            ai_triggered,
        })
    }

    /// Store an analysis; fails if `reading_id` names no reading.
    pub fn insert_analysis(&self, recorded_at: DateTime<Utc>, new: &NewAnalysis) -> Result<Analysis> {
        let timestamp = recorded_at.timestamp();
        let recommendations = serde_json::to_string(&new.recommendations)
            .context("Failed to encode recommendations")?;

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let exists: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM readings WHERE id = ?1)",
            params![new.reading_id],
            |row| row.get(0),
        )?;
        if !exists {
            anyhow::bail!("Analysis refers to unknown reading #{}", new.reading_id);
        }

        tx.execute(
            "INSERT INTO analyses (
                timestamp, reading_id, analysis, status, recommendations, response_ms
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                timestamp,
                new.reading_id,
                &new.analysis,
                new.status.as_str(),
                recommendations,
                new.response_ms,
            ],
        )
        .context("Failed to store analysis")?;
        let id = tx.last_insert_rowid();
        tx.commit()?;

        Ok(Analysis {
            id,
            timestamp: from_unix(timestamp),
            reading_id: new.reading_id,
            analysis: new.analysis.clone(),
            status: new.status,
            recommendations: new.recommendations.clone(),
            response_ms: new.response_ms,
        })
    }

    pub fn latest_reading(&self) -> Result<Option<Reading>> {
        let conn = self.conn()?;
        let reading = conn
            .query_row(
                "SELECT id, timestamp, tds, temperature, is_safe, ai_triggered
                FROM readings
                ORDER BY id DESC
                LIMIT 1",
                [],
                reading_from_row,
            )
            .optional()?;

        Ok(reading)
    }

    pub fn analysis_for_reading(&self, reading_id: i64) -> Result<Option<Analysis>> {
        let conn = self.conn()?;
        let analysis = conn
            .query_row(
                "SELECT id, timestamp, reading_id, analysis, status, recommendations, response_ms
                FROM analyses
                WHERE reading_id = ?1
                ORDER BY id ASC
                LIMIT 1",
                params![reading_id],
                analysis_from_row,
            )
            .optional()?
            .transpose()?;

        Ok(analysis)
    }

    /// Readings at or after `since`, oldest first
    pub fn readings_since(&self, since: DateTime<Utc>) -> Result<Vec<Reading>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, timestamp, tds, temperature, is_safe, ai_triggered
            FROM readings
            WHERE timestamp >= ?1
            ORDER BY timestamp ASC, id ASC",
        )?;

        let readings = stmt
            .query_map(params![since.timestamp()], reading_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(readings)
    }

    pub fn window_counts(&self, since: DateTime<Utc>) -> Result<WindowCounts> {
        let conn = self.conn()?;
        let since = since.timestamp();

        let (total_readings, anomalies): (i64, i64) = conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(ai_triggered), 0)
            FROM readings
            WHERE timestamp >= ?1",
            params![since],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        let analyses: i64 = conn.query_row(
            "SELECT COUNT(*) FROM analyses WHERE timestamp >= ?1",
            params![since],
            |row| row.get(0),
        )?;

        Ok(WindowCounts {
            total_readings,
            anomalies,
            analyses,
        })
    }

    /// Newest analyses first
    pub fn recent_analyses(&self, limit: u32) -> Result<Vec<Analysis>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, timestamp, reading_id, analysis, status, recommendations, response_ms
            FROM analyses
            ORDER BY timestamp DESC, id DESC
            LIMIT ?1",
        )?;

        let analyses = stmt
            .query_map(params![limit], analysis_from_row)?
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .collect::<Result<Vec<_>>>()?;

        Ok(analyses)
    }

    /// Delete every analysis and reading. Returns (readings, analyses) removed.
    pub fn clear_all(&self) -> Result<(usize, usize)> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let analyses_deleted = tx.execute("DELETE FROM analyses", [])?;
        let readings_deleted = tx.execute("DELETE FROM readings", [])?;
        tx.commit()?;

        info!(
            "Deleted {} readings and {} analyses",
            readings_deleted, analyses_deleted
        );

        Ok((readings_deleted, analyses_deleted))
    }
}

fn from_unix(timestamp: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(timestamp, 0).unwrap_or_default()
}

fn reading_from_row(row: &Row<'_>) -> rusqlite::Result<Reading> {
    Ok(Reading {
        id: row.get(0)?,
        timestamp: from_unix(row.get(1)?),
        tds: row.get(2)?,
        temperature: row.get(3)?,
        is_safe: row.get(4)?,
        ai_triggered: row.get(5)?,
    })
}

/// Outer error is SQLite, inner is decoding of the text columns
fn analysis_from_row(row: &Row<'_>) -> rusqlite::Result<Result<Analysis>> {
    let status: String = row.get(4)?;
    let recommendations: String = row.get(5)?;

    let id: i64 = row.get(0)?;
    let timestamp = from_unix(row.get(1)?);
    let reading_id: i64 = row.get(2)?;
    let analysis: String = row.get(3)?;
    let response_ms: i64 = row.get(6)?;

    Ok(decode_analysis(&status, &recommendations).map(|(status, recommendations)| Analysis {
        id,
        timestamp,
        reading_id,
        analysis,
        status,
        recommendations,
        response_ms,
    }))
}

fn decode_analysis(status: &str, recommendations: &str) -> Result<(Severity, Vec<String>)> {
    let status = status
        .parse::<Severity>()
        .with_context(|| format!("Bad stored status {:?}", status))?;
    let recommendations = serde_json::from_str(recommendations)
        .context("Bad stored recommendations")?;
    Ok((status, recommendations))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn db() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();
        db
    }

    fn new_analysis(reading_id: i64) -> NewAnalysis {
        NewAnalysis {
            reading_id,
            analysis: "IMPACT:\nScale risk.".to_string(),
            status: Severity::Warning,
            recommendations: vec!["Flush filter".to_string()],
            response_ms: 420,
        }
    }

    #[test]
    fn test_ids_increase() {
        let db = db();
        let now = Utc::now();
        let a = db.insert_reading(now, 300.0, 22.0, true, false).unwrap();
        let b = db.insert_reading(now, 1100.0, 22.0, false, true).unwrap();
        assert!(b.id > a.id);

        let latest = db.latest_reading().unwrap().unwrap();
        assert_eq!(latest.id, b.id);
        assert_eq!(latest.tds, 1100.0);
        assert!(!latest.is_safe);
        assert!(latest.ai_triggered);
    }

    #[test]
    fn test_latest_on_empty_store() {
        assert!(db().latest_reading().unwrap().is_none());
    }

    #[test]
    fn test_analysis_linked_to_reading() {
        let db = db();
        let now = Utc::now();
        let reading = db.insert_reading(now, 1100.0, 22.0, false, true).unwrap();

        let stored = db.insert_analysis(now, &new_analysis(reading.id)).unwrap();
        assert_eq!(stored.reading_id, reading.id);

        let loaded = db.analysis_for_reading(reading.id).unwrap().unwrap();
        assert_eq!(loaded, stored);
        assert_eq!(loaded.recommendations, vec!["Flush filter"]);
        assert_eq!(loaded.status, Severity::Warning);
    }

    #[test]
    fn test_analysis_for_unknown_reading_rejected() {
        let db = db();
        assert!(db.insert_analysis(Utc::now(), &new_analysis(999)).is_err());
        assert!(db.recent_analyses(10).unwrap().is_empty());
    }

    #[test]
    fn test_history_window() {
        let db = db();
        let now = Utc::now();
        db.insert_reading(now - Duration::hours(30), 300.0, 22.0, true, false).unwrap();
        db.insert_reading(now - Duration::hours(2), 310.0, 22.0, true, false).unwrap();
        db.insert_reading(now, 320.0, 22.0, true, false).unwrap();

        let recent = db.readings_since(now - Duration::hours(24)).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].tds, 310.0);
        assert_eq!(recent[1].tds, 320.0);

        let all = db.readings_since(now - Duration::hours(48)).unwrap();
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn test_window_counts() {
        let db = db();
        let now = Utc::now();
        let r1 = db.insert_reading(now, 1100.0, 22.0, false, true).unwrap();
        db.insert_reading(now, 300.0, 40.0, false, true).unwrap();
        db.insert_reading(now, 300.0, 22.0, true, false).unwrap();
        db.insert_analysis(now, &new_analysis(r1.id)).unwrap();

        let counts = db.window_counts(now - Duration::hours(1)).unwrap();
        assert_eq!(
            counts,
            WindowCounts {
                total_readings: 3,
                anomalies: 2,
                analyses: 1
            }
        );

        let empty = db.window_counts(now + Duration::hours(1)).unwrap();
        assert_eq!(empty, WindowCounts::default());
    }

    #[test]
    fn test_recent_analyses_newest_first_and_limited() {
        let db = db();
        let now = Utc::now();
        for i in 0..5 {
            let at = now - Duration::minutes(10 - i);
            let reading = db.insert_reading(at, 1100.0 + i as f64, 22.0, false, true).unwrap();
            db.insert_analysis(at, &new_analysis(reading.id)).unwrap();
        }

        let recent = db.recent_analyses(3).unwrap();
        assert_eq!(recent.len(), 3);
        assert!(recent[0].id > recent[1].id);
        assert!(recent[0].timestamp >= recent[2].timestamp);
    }

    #[test]
    fn test_clear_all() {
        let db = db();
        let now = Utc::now();
        let reading = db.insert_reading(now, 1100.0, 22.0, false, true).unwrap();
        db.insert_analysis(now, &new_analysis(reading.id)).unwrap();

        assert_eq!(db.clear_all().unwrap(), (1, 1));
        assert!(db.latest_reading().unwrap().is_none());
        assert!(db.readings_since(now - Duration::days(365)).unwrap().is_empty());
        assert!(db.recent_analyses(10).unwrap().is_empty());
    }

    #[test]
    fn test_file_backed_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cooling.db");

        {
            let db = Database::new(&path).unwrap();
            db.initialize().unwrap();
            db.insert_reading(Utc::now(), 300.0, 22.0, true, false).unwrap();
        }

        let db = Database::new(&path).unwrap();
        db.initialize().unwrap();
        assert_eq!(db.latest_reading().unwrap().unwrap().tds, 300.0);
        db.ping().unwrap();
    }
}
