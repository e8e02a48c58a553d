// SQLite store
// Default persistence for campaigns and the import history. Identity (UUID)
// and timestamps are assigned here, never by the ingestion core.

use crate::importer::CampaignStore;
use crate::locale::DATE_FORMAT;
use crate::model::{
    CampaignRecord, CampaignStatus, ImportOutcome, ImportStatus, StoredCampaign,
    StoredImportOutcome,
};
use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

const CAMPAIGN_COLUMNS: &str = "id, name, status, start_date, end_date, spend, leads_generated,
     conversions, revenue, created_at, updated_at";

const HISTORY_COLUMNS: &str = "id, file_name, record_count, status, error_detail, uploaded_at";

pub fn setup_database(conn: &Connection) -> Result<()> {
    // Enable WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS campaigns (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            status TEXT NOT NULL CHECK (status IN ('active', 'paused', 'completed')),
            start_date TEXT NOT NULL,
            end_date TEXT,
            spend REAL NOT NULL DEFAULT 0,
            leads_generated INTEGER NOT NULL DEFAULT 0,
            conversions INTEGER NOT NULL DEFAULT 0,
            revenue REAL NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        [],
    )?;

    // Append-only audit of import attempts
    conn.execute(
        "CREATE TABLE IF NOT EXISTS import_history (
            id TEXT PRIMARY KEY,
            file_name TEXT NOT NULL,
            record_count INTEGER NOT NULL DEFAULT 0,
            status TEXT NOT NULL CHECK (status IN ('success', 'failure', 'partial')),
            error_detail TEXT,
            uploaded_at TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_campaigns_start_date ON campaigns(start_date)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_import_history_uploaded_at ON import_history(uploaded_at)",
        [],
    )?;

    Ok(())
}

// ============================================================================
// ROW MAPPING
// ============================================================================

fn conversion_error(column: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(column, Type::Text, message.into())
}

fn parse_timestamp(column: usize, value: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_error(column, format!("bad timestamp {:?}: {}", value, e)))
}

fn parse_stored_date(column: usize, value: &str) -> rusqlite::Result<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .map_err(|e| conversion_error(column, format!("bad date {:?}: {}", value, e)))
}

fn campaign_from_row(row: &Row) -> rusqlite::Result<StoredCampaign> {
    let status: String = row.get(2)?;
    let start_date: String = row.get(3)?;
    let end_date: Option<String> = row.get(4)?;
    let created_at: String = row.get(9)?;
    let updated_at: String = row.get(10)?;

    Ok(StoredCampaign {
        id: row.get(0)?,
        record: CampaignRecord {
            name: row.get(1)?,
            status: CampaignStatus::parse(&status)
                .ok_or_else(|| conversion_error(2, format!("unknown status {:?}", status)))?,
            start_date: parse_stored_date(3, &start_date)?,
            end_date: end_date
                .as_deref()
                .map(|value| parse_stored_date(4, value))
                .transpose()?,
            spend: row.get(5)?,
            leads_generated: row.get(6)?,
            conversions: row.get(7)?,
            revenue: row.get(8)?,
        },
        created_at: parse_timestamp(9, &created_at)?,
        updated_at: parse_timestamp(10, &updated_at)?,
    })
}

fn outcome_from_row(row: &Row) -> rusqlite::Result<StoredImportOutcome> {
    let record_count: i64 = row.get(2)?;
    let status: String = row.get(3)?;
    let uploaded_at: String = row.get(5)?;

    Ok(StoredImportOutcome {
        id: row.get(0)?,
        outcome: ImportOutcome {
            file_name: row.get(1)?,
            record_count: usize::try_from(record_count)
                .map_err(|e| conversion_error(2, e.to_string()))?,
            status: ImportStatus::parse(&status)
                .ok_or_else(|| conversion_error(3, format!("unknown status {:?}", status)))?,
            error_detail: row.get(4)?,
        },
        uploaded_at: parse_timestamp(5, &uploaded_at)?,
    })
}

fn insert_campaign_row(conn: &Connection, stored: &StoredCampaign) -> Result<()> {
    let record = &stored.record;
    conn.execute(
        "INSERT INTO campaigns (
            id, name, status, start_date, end_date, spend, leads_generated,
            conversions, revenue, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            stored.id,
            record.name,
            record.status.as_str(),
            record.start_date.format(DATE_FORMAT).to_string(),
            record.end_date.map(|d| d.format(DATE_FORMAT).to_string()),
            record.spend,
            record.leads_generated,
            record.conversions,
            record.revenue,
            stored.created_at.to_rfc3339(),
            stored.updated_at.to_rfc3339(),
        ],
    )
    .with_context(|| format!("Failed to insert campaign {:?}", record.name))?;

    Ok(())
}

fn new_stored_campaign(record: &CampaignRecord, now: DateTime<Utc>) -> StoredCampaign {
    StoredCampaign {
        id: uuid::Uuid::new_v4().to_string(),
        record: record.clone(),
        created_at: now,
        updated_at: now,
    }
}

fn ensure_valid(record: &CampaignRecord) -> Result<()> {
    if let Err(violations) = record.validate() {
        let details: Vec<String> = violations.iter().map(|v| v.to_string()).collect();
        bail!("Invalid campaign: {}", details.join("; "));
    }
    Ok(())
}

// ============================================================================
// STORE
// ============================================================================

/// SQLite-backed store. The connection is shared behind a mutex, so one
/// store can serve the CLI and every request of the HTTP surface.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database file and ensure the schema exists
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;
        setup_database(&conn)?;
        info!(path = %path.display(), "database opened");
        Ok(SqliteStore {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        setup_database(&conn)?;
        Ok(SqliteStore {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("database connection lock poisoned"))
    }

    // ------------------------------------------------------------------------
    // Campaigns
    // ------------------------------------------------------------------------

    /// Insert all records in one transaction; any failure rolls back every row
    pub fn insert_campaigns(&self, records: &[CampaignRecord]) -> Result<Vec<StoredCampaign>> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let now = Utc::now();

        let mut stored = Vec::with_capacity(records.len());
        for record in records {
            let campaign = new_stored_campaign(record, now);
            insert_campaign_row(&tx, &campaign)?;
            stored.push(campaign);
        }

        tx.commit().context("Failed to commit bulk insert")?;
        debug!(count = stored.len(), "inserted campaigns");

        Ok(stored)
    }

    /// Manual entry: validate, then insert one record
    pub fn create_campaign(&self, record: &CampaignRecord) -> Result<StoredCampaign> {
        ensure_valid(record)?;
        let conn = self.conn()?;
        let campaign = new_stored_campaign(record, Utc::now());
        insert_campaign_row(&conn, &campaign)?;
        Ok(campaign)
    }

    pub fn get_campaign(&self, id: &str) -> Result<Option<StoredCampaign>> {
        let conn = self.conn()?;
        let campaign = conn
            .query_row(
                &format!("SELECT {} FROM campaigns WHERE id = ?1", CAMPAIGN_COLUMNS),
                [id],
                campaign_from_row,
            )
            .optional()?;
        Ok(campaign)
    }

    /// Every campaign, newest first
    pub fn list_campaigns(&self) -> Result<Vec<StoredCampaign>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM campaigns ORDER BY created_at DESC, rowid DESC",
            CAMPAIGN_COLUMNS
        ))?;

        let campaigns = stmt
            .query_map([], campaign_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(campaigns)
    }

    /// Campaigns whose start date falls in `[from, to]`, latest start first.
    /// A missing bound leaves that side open.
    pub fn list_campaigns_between(
        &self,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<Vec<StoredCampaign>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM campaigns
             WHERE (?1 IS NULL OR start_date >= ?1) AND (?2 IS NULL OR start_date <= ?2)
             ORDER BY start_date DESC, rowid DESC",
            CAMPAIGN_COLUMNS
        ))?;

        let campaigns = stmt
            .query_map(
                params![
                    from.map(|d| d.format(DATE_FORMAT).to_string()),
                    to.map(|d| d.format(DATE_FORMAT).to_string())
                ],
                campaign_from_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(campaigns)
    }

    /// Replace a campaign's values, keeping its identity. `None` if the id is unknown.
    pub fn update_campaign(
        &self,
        id: &str,
        record: &CampaignRecord,
    ) -> Result<Option<StoredCampaign>> {
        ensure_valid(record)?;
        {
            let conn = self.conn()?;
            let changed = conn.execute(
                "UPDATE campaigns
                 SET name = ?2, status = ?3, start_date = ?4, end_date = ?5, spend = ?6,
                     leads_generated = ?7, conversions = ?8, revenue = ?9, updated_at = ?10
                 WHERE id = ?1",
                params![
                    id,
                    record.name,
                    record.status.as_str(),
                    record.start_date.format(DATE_FORMAT).to_string(),
                    record.end_date.map(|d| d.format(DATE_FORMAT).to_string()),
                    record.spend,
                    record.leads_generated,
                    record.conversions,
                    record.revenue,
                    Utc::now().to_rfc3339(),
                ],
            )?;
            if changed == 0 {
                return Ok(None);
            }
        }
        self.get_campaign(id)
    }

    /// `true` if a row was deleted
    pub fn delete_campaign(&self, id: &str) -> Result<bool> {
        let conn = self.conn()?;
        let deleted = conn.execute("DELETE FROM campaigns WHERE id = ?1", [id])?;
        Ok(deleted > 0)
    }

    pub fn count_campaigns(&self) -> Result<i64> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM campaigns", [], |row| row.get(0))?;
        Ok(count)
    }

    // ------------------------------------------------------------------------
    // Import history
    // ------------------------------------------------------------------------

    pub fn insert_import_outcome(&self, outcome: &ImportOutcome) -> Result<StoredImportOutcome> {
        let stored = StoredImportOutcome {
            id: uuid::Uuid::new_v4().to_string(),
            outcome: outcome.clone(),
            uploaded_at: Utc::now(),
        };

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO import_history (
                id, file_name, record_count, status, error_detail, uploaded_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                stored.id,
                outcome.file_name,
                outcome.record_count as i64,
                outcome.status.as_str(),
                outcome.error_detail,
                stored.uploaded_at.to_rfc3339(),
            ],
        )
        .context("Failed to record import outcome")?;

        Ok(stored)
    }

    /// Import attempts, newest first
    pub fn list_import_history(&self) -> Result<Vec<StoredImportOutcome>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM import_history ORDER BY uploaded_at DESC, rowid DESC",
            HISTORY_COLUMNS
        ))?;

        let history = stmt
            .query_map([], outcome_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(history)
    }
}

#[async_trait]
impl CampaignStore for SqliteStore {
    async fn insert_many(&self, records: &[CampaignRecord]) -> Result<Vec<StoredCampaign>> {
        self.insert_campaigns(records)
    }

    async fn record_import_outcome(&self, outcome: &ImportOutcome) -> Result<StoredImportOutcome> {
        self.insert_import_outcome(outcome)
    }
}
