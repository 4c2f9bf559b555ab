//! Sync pipeline configuration.
//!
//! Plain data, constructed by the environment-settings crate and handed
//! to the orchestrator. Defaults match the observed deployment (three
//! branches, Chilean IVA, Bsale price list 2).

use std::collections::{BTreeMap, BTreeSet};

use crate::error::SyncError;

#[derive(Debug, Clone, PartialEq)]
pub struct SyncConfig {
    /// Source Ledger branch ids to poll.
    pub branches: Vec<i64>,
    /// Static branch → billing office mapping. A sale from an unmapped
    /// branch is a configuration error, not a per-sale condition.
    pub offices: BTreeMap<i64, i64>,
    /// Jurisdiction tax rate applied to gross unit prices (0.19 = IVA).
    pub tax_rate: f64,
    pub price_list_id: i64,
    /// Document type used when a customer match exists.
    pub doc_type_nominative: i64,
    /// Document type used when no customer is attached.
    pub doc_type_non_nominative: i64,
    /// Catch-all variant for unmapped line items.
    pub generic_variant_id: i64,
    /// House/demo customer ids the resolver must never return.
    pub excluded_customer_ids: BTreeSet<i64>,
    /// Fuzzy-name acceptance threshold (accept at ≥, not >).
    pub similarity_threshold: f64,
    /// Fixed offset from UTC defining the local calendar day.
    pub utc_offset_hours: i32,
    /// Administrative pause: prod emission is suspended while set.
    pub paused: bool,
    /// Opt-in side capability: create a billing customer when resolution
    /// finds none. Default path is resolve-only.
    pub create_missing_customers: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            branches: vec![1, 3, 4],
            offices: BTreeMap::from([(1, 1), (3, 2), (4, 3)]),
            tax_rate: 0.19,
            price_list_id: 2,
            doc_type_nominative: 1,
            doc_type_non_nominative: 2,
            generic_variant_id: 289,
            excluded_customer_ids: BTreeSet::new(),
            similarity_threshold: 0.92,
            utc_offset_hours: -4,
            paused: false,
            create_missing_customers: false,
        }
    }
}

impl SyncConfig {
    /// Billing office for a Source Ledger branch.
    pub fn office_for(&self, branch: i64) -> Result<i64, SyncError> {
        self.offices
            .get(&branch)
            .copied()
            .ok_or_else(|| SyncError::Config(format!("branch {branch} has no office mapping")))
    }

    /// The local calendar day, per the configured UTC offset.
    pub fn today(&self) -> chrono::NaiveDate {
        let offset = chrono::FixedOffset::east_opt(self.utc_offset_hours * 3600)
            .unwrap_or_else(|| chrono::FixedOffset::east_opt(0).unwrap());
        chrono::Utc::now().with_timezone(&offset).date_naive()
    }
}
