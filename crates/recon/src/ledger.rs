//! Emission ledger seam.
//!
//! The ledger is the idempotence authority: a sale key is claimed
//! atomically before any emission attempt, and every claimed key gets a
//! terminal status written afterwards, success or failure. The storage
//! backend lives in its own crate; the orchestrator only sees this
//! trait.

use std::collections::BTreeSet;

use crate::error::SyncError;

/// Terminal (or in-flight) state of one sale key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerStatus {
    /// Claimed, emission attempt in flight. A key stuck here after a
    /// crash is surfaced for operator review, never retried blindly.
    Pending,
    /// Document emitted; carries the Billing Service document id.
    Ok(String),
    /// Attempt failed; carries the failure detail.
    Error(String),
}

impl LedgerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Ok(_) => "ok",
            Self::Error(_) => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// One ledger row, as read back for audit.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerEntry {
    pub sale_key: String,
    pub document_id: Option<String>,
    pub customer: String,
    pub amount: i64,
    pub status: LedgerStatus,
    /// RFC 3339 timestamp of the last write.
    pub recorded_at: String,
}

/// Durable record of which sales have been handled.
pub trait EmissionLedger {
    /// Snapshot of every key present, regardless of status.
    fn known_keys(&self) -> Result<BTreeSet<String>, SyncError>;

    /// Atomically claim a key: insert it as `Pending` if and only if it
    /// is absent. Returns `true` when this caller won the claim. A lost
    /// claim means another writer owns the key; never emit for it.
    fn claim(&mut self, sale_key: &str, customer: &str, amount: i64) -> Result<bool, SyncError>;

    /// Write the terminal status for a claimed key. Mandatory after
    /// every claim, on both the success and failure paths.
    fn record_outcome(&mut self, sale_key: &str, status: &LedgerStatus) -> Result<(), SyncError>;

    fn get(&self, sale_key: &str) -> Result<Option<LedgerEntry>, SyncError>;
}
