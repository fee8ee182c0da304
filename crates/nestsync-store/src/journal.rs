//! Sync journal
//!
//! One row per nested reconciliation, written inside the same transaction as
//! the changes it describes.

use crate::errors::{from_rusqlite, Result};
use chrono::{DateTime, TimeZone, Utc};
use nestsync_core::{AssociationReport, RecordId};
use nestsync_core_types::SaveContext;
use rusqlite::{Connection, Row};
use serde::Serialize;

/// A recorded reconciliation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JournalEntry {
    pub id: i64,
    pub run_id: String,
    pub trace_id: Option<String>,
    pub entity: String,
    pub parent_id: String,
    pub association: String,
    pub callback: String,
    pub created: u64,
    pub updated: u64,
    pub deleted: u64,
    pub retained: u64,
    pub skipped_blank: u64,
    pub recorded_at: DateTime<Utc>,
}

const SELECT_COLUMNS: &str = "id, run_id, trace_id, entity, parent_id, association, callback,
    created_count, updated_count, deleted_count, retained_count, skipped_blank, recorded_at";

/// Record one association's reconciliation, returning the journal row id
pub fn record_sync(
    conn: &Connection,
    ctx: &SaveContext,
    entity: &str,
    parent_id: &RecordId,
    report: &AssociationReport,
) -> Result<i64> {
    let counts = &report.report;
    conn.execute(
        "INSERT INTO sync_journal (run_id, trace_id, entity, parent_id, association, callback,
            created_count, updated_count, deleted_count, retained_count, skipped_blank, recorded_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        rusqlite::params![
            ctx.run_id.as_str(),
            ctx.trace_id.as_ref().map(|t| t.as_str().to_string()),
            entity,
            parent_id.to_string(),
            report.association,
            report.callback,
            counts.created.len() as i64,
            counts.updated.len() as i64,
            counts.deleted.len() as i64,
            counts.retained.len() as i64,
            counts.skipped_blank as i64,
            Utc::now().timestamp_millis(),
        ],
    )
    .map_err(from_rusqlite)?;

    Ok(conn.last_insert_rowid())
}

/// Journal rows for one parent, oldest first
pub fn list_syncs(conn: &Connection, entity: &str, parent_id: &RecordId) -> Result<Vec<JournalEntry>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {} FROM sync_journal WHERE entity = ?1 AND parent_id = ?2 ORDER BY id",
            SELECT_COLUMNS
        ))
        .map_err(from_rusqlite)?;
    let entries = stmt
        .query_map(rusqlite::params![entity, parent_id.to_string()], read_entry)
        .map_err(from_rusqlite)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(from_rusqlite)?;
    Ok(entries)
}

/// Journal rows written by one save run
pub fn list_run(conn: &Connection, run_id: &str) -> Result<Vec<JournalEntry>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {} FROM sync_journal WHERE run_id = ?1 ORDER BY id",
            SELECT_COLUMNS
        ))
        .map_err(from_rusqlite)?;
    let entries = stmt
        .query_map([run_id], read_entry)
        .map_err(from_rusqlite)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(from_rusqlite)?;
    Ok(entries)
}

fn read_entry(row: &Row<'_>) -> rusqlite::Result<JournalEntry> {
    let count = |index: usize| -> rusqlite::Result<u64> { Ok(row.get::<_, i64>(index)?.max(0) as u64) };
    let recorded_ms: i64 = row.get(12)?;
    Ok(JournalEntry {
        id: row.get(0)?,
        run_id: row.get(1)?,
        trace_id: row.get(2)?,
        entity: row.get(3)?,
        parent_id: row.get(4)?,
        association: row.get(5)?,
        callback: row.get(6)?,
        created: count(7)?,
        updated: count(8)?,
        deleted: count(9)?,
        retained: count(10)?,
        skipped_blank: count(11)?,
        recorded_at: Utc
            .timestamp_millis_opt(recorded_ms)
            .single()
            .unwrap_or_default(),
    })
}
