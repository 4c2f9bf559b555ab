//! Customer resolution against the Billing Service directory.
//!
//! Resolution is strictly read-only: it finds a customer or it does not,
//! and "not found" is a normal outcome. A false positive here attaches a
//! sale to the wrong customer's legal document, which is strictly worse
//! than emitting a non-nominative one, hence the exclusion rules and
//! the high fuzzy-match threshold.

use std::collections::BTreeSet;

use tracing::warn;

use crate::error::SyncError;
use crate::identity::{name_similarity, normalize_name, normalize_rut};
use crate::model::CustomerIdentity;

/// A customer candidate as returned by the Billing Service.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomerRecord {
    pub id: i64,
    pub name: String,
    pub tax_number: Option<String>,
    /// Secondary code field; some accounts store the tax id here.
    pub code: Option<String>,
}

/// One page of a paginated name search.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomerPage {
    pub items: Vec<CustomerRecord>,
    pub has_more: bool,
}

/// Read-only view of the Billing Service customer directory.
pub trait CustomerDirectory {
    /// All candidates for an exact tax-id query (dedicated filter, with
    /// the implementation free to fall back to text search internally).
    fn find_by_tax_id(&self, tax_id: &str) -> Result<Vec<CustomerRecord>, SyncError>;

    /// One page of a free-text name search. Pages are zero-based.
    fn search_by_name(&self, name: &str, page: u32) -> Result<CustomerPage, SyncError>;
}

/// Pages to walk in the fuzzy-name pass before giving up.
const MAX_SEARCH_PAGES: u32 = 40;

pub struct CustomerResolver<'a, D: CustomerDirectory> {
    directory: &'a D,
    excluded_ids: &'a BTreeSet<i64>,
    similarity_threshold: f64,
}

impl<'a, D: CustomerDirectory> CustomerResolver<'a, D> {
    pub fn new(
        directory: &'a D,
        excluded_ids: &'a BTreeSet<i64>,
        similarity_threshold: f64,
    ) -> Self {
        Self { directory, excluded_ids, similarity_threshold }
    }

    /// Find a matching billing customer, or `None`. Never creates,
    /// updates, or deletes anything. Transport failures degrade to
    /// `None`; one flaky search must not fail the whole sale.
    pub fn resolve(&self, identity: &CustomerIdentity) -> Option<i64> {
        if let Some(tax_id) = identity.tax_id.as_deref() {
            if let Some(id) = self.resolve_by_tax_id(tax_id) {
                return Some(id);
            }
        }
        self.resolve_by_name(&identity.name)
    }

    fn resolve_by_tax_id(&self, tax_id: &str) -> Option<i64> {
        let candidates = match self.directory.find_by_tax_id(tax_id) {
            Ok(c) => c,
            Err(e) => {
                warn!(tax_id, error = %e, "tax-id search failed; degrading to no match");
                return None;
            }
        };
        candidates
            .iter()
            .filter(|c| {
                let stored_tax = c.tax_number.as_deref().and_then(normalize_rut);
                let stored_code = c.code.as_deref().and_then(normalize_rut);
                stored_tax.as_deref() == Some(tax_id) || stored_code.as_deref() == Some(tax_id)
            })
            .filter(|c| self.is_acceptable(c))
            // Highest id = most recently created, presumably cleanest.
            .map(|c| c.id)
            .max()
    }

    fn resolve_by_name(&self, normalized_name: &str) -> Option<i64> {
        if normalized_name.is_empty() {
            return None;
        }
        let mut best: Option<(f64, i64)> = None;
        for page in 0..MAX_SEARCH_PAGES {
            let page_result = match self.directory.search_by_name(normalized_name, page) {
                Ok(p) => p,
                Err(e) => {
                    warn!(name = normalized_name, page, error = %e,
                          "name search failed; degrading to no match");
                    break;
                }
            };
            for candidate in &page_result.items {
                if !self.is_acceptable(candidate) {
                    continue;
                }
                let score = name_similarity(normalized_name, &normalize_name(&candidate.name));
                let better = match best {
                    Some((s, _)) => score > s,
                    None => true,
                };
                if better {
                    best = Some((score, candidate.id));
                }
            }
            if !page_result.has_more {
                break;
            }
        }
        match best {
            // Accept at the threshold exactly (≥, not >).
            Some((score, id)) if score >= self.similarity_threshold => Some(id),
            _ => None,
        }
    }

    fn is_acceptable(&self, candidate: &CustomerRecord) -> bool {
        !self.excluded_ids.contains(&candidate.id) && !is_demo_name(&normalize_name(&candidate.name))
    }
}

/// Demo-account heuristic over a normalized name.
fn is_demo_name(normalized: &str) -> bool {
    normalized.starts_with("inicial")
        || normalized.contains("demo")
        || normalized == "cliente por defecto"
}
