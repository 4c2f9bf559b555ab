//! SQLite-backed emission ledger.
//!
//! One row per sale key. The claim step is the atomicity anchor of the
//! whole pipeline: `INSERT ... ON CONFLICT DO NOTHING` either wins the
//! key or observes that someone else did, with no read-then-write
//! window. Webhook and poll paths share the same database file, so the
//! same guarantee covers their races too.

use std::collections::BTreeSet;
use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension};

use boletera_recon::{EmissionLedger, LedgerEntry, LedgerStatus, SyncError};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS emissions (
    sale_key    TEXT PRIMARY KEY,
    document_id TEXT,
    customer    TEXT NOT NULL,
    amount      INTEGER NOT NULL,
    status      TEXT NOT NULL,
    detail      TEXT,
    recorded_at TEXT NOT NULL
);
";

pub struct SqliteLedger {
    conn: Connection,
}

impl SqliteLedger {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SyncError> {
        let conn = Connection::open(path).map_err(db_err)?;
        // Poll loop and webhook handler may hold connections to the
        // same file; let writers wait instead of failing.
        conn.busy_timeout(std::time::Duration::from_secs(5)).map_err(db_err)?;
        conn.execute_batch(SCHEMA).map_err(db_err)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self, SyncError> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        conn.execute_batch(SCHEMA).map_err(db_err)?;
        Ok(Self { conn })
    }

    /// Every row, newest first, for the audit listing.
    pub fn audit_rows(&self, limit: usize) -> Result<Vec<LedgerEntry>, SyncError> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT sale_key, document_id, customer, amount, status, detail, recorded_at
                 FROM emissions ORDER BY recorded_at DESC, sale_key DESC LIMIT ?1",
            )
            .map_err(db_err)?;
        let rows = stmt
            .query_map(params![limit as i64], row_to_entry)
            .map_err(db_err)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(db_err)?;
        Ok(rows)
    }

    /// Keys claimed but never given a terminal status (crash leftovers).
    pub fn stuck_pending(&self) -> Result<Vec<String>, SyncError> {
        let mut stmt = self
            .conn
            .prepare("SELECT sale_key FROM emissions WHERE status = 'pending' ORDER BY sale_key")
            .map_err(db_err)?;
        let keys = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(db_err)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(db_err)?;
        Ok(keys)
    }
}

impl EmissionLedger for SqliteLedger {
    fn known_keys(&self) -> Result<BTreeSet<String>, SyncError> {
        let mut stmt = self.conn.prepare("SELECT sale_key FROM emissions").map_err(db_err)?;
        let keys = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(db_err)?
            .collect::<Result<BTreeSet<_>, _>>()
            .map_err(db_err)?;
        Ok(keys)
    }

    fn claim(&mut self, sale_key: &str, customer: &str, amount: i64) -> Result<bool, SyncError> {
        let changed = self
            .conn
            .execute(
                "INSERT INTO emissions (sale_key, customer, amount, status, recorded_at)
                 VALUES (?1, ?2, ?3, 'pending', ?4)
                 ON CONFLICT(sale_key) DO NOTHING",
                params![sale_key, customer, amount, now()],
            )
            .map_err(db_err)?;
        Ok(changed == 1)
    }

    fn record_outcome(&mut self, sale_key: &str, status: &LedgerStatus) -> Result<(), SyncError> {
        let (status_str, document_id, detail) = match status {
            LedgerStatus::Pending => ("pending", None, None),
            LedgerStatus::Ok(id) => ("ok", Some(id.as_str()), None),
            LedgerStatus::Error(msg) => ("error", None, Some(msg.as_str())),
        };
        let changed = self
            .conn
            .execute(
                "UPDATE emissions
                 SET status = ?2, document_id = ?3, detail = ?4, recorded_at = ?5
                 WHERE sale_key = ?1",
                params![sale_key, status_str, document_id, detail, now()],
            )
            .map_err(db_err)?;
        if changed == 0 {
            return Err(SyncError::Ledger(format!("no claimed row for key {sale_key}")));
        }
        Ok(())
    }

    fn get(&self, sale_key: &str) -> Result<Option<LedgerEntry>, SyncError> {
        self.conn
            .query_row(
                "SELECT sale_key, document_id, customer, amount, status, detail, recorded_at
                 FROM emissions WHERE sale_key = ?1",
                params![sale_key],
                row_to_entry,
            )
            .optional()
            .map_err(db_err)
    }
}

fn row_to_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<LedgerEntry> {
    let status_str: String = row.get(4)?;
    let detail: Option<String> = row.get(5)?;
    let document_id: Option<String> = row.get(1)?;
    let status = match status_str.as_str() {
        "ok" => LedgerStatus::Ok(document_id.clone().unwrap_or_default()),
        "error" => LedgerStatus::Error(detail.unwrap_or_default()),
        _ => LedgerStatus::Pending,
    };
    Ok(LedgerEntry {
        sale_key: row.get(0)?,
        document_id,
        customer: row.get(2)?,
        amount: row.get(3)?,
        status,
        recorded_at: row.get(6)?,
    })
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

fn db_err(e: rusqlite::Error) -> SyncError {
    SyncError::Ledger(e.to_string())
}
