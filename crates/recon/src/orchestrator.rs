//! Per-sale emission pipeline and the polling loop around it.
//!
//! The flow for every sale is fixed: dedupe against the ledger, claim
//! the key atomically, resolve the customer, build the document, submit
//! it, and write a terminal ledger status. A claim without a terminal
//! write is the one state the pipeline is not allowed to leave behind
//! on any code path it controls.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use tracing::{error, info, warn};

use crate::builder::build_document;
use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::identity::{normalize_name, normalize_rut};
use crate::ledger::{EmissionLedger, LedgerStatus};
use crate::model::{
    sale_key, BillingDocument, CustomerIdentity, LineItem, MemberIdentity, RunMode, SaleOutcome,
    SaleRecord,
};
use crate::resolver::{CustomerDirectory, CustomerResolver};
use crate::variants::VariantMap;

/// Read-only view of the Source Ledger.
pub trait SaleSource {
    /// Paid receivables for one branch on one local calendar day.
    /// Records come back without line items; those are fetched per sale.
    fn fetch_receivables(&self, branch: i64, day: NaiveDate) -> Result<Vec<SaleRecord>, SyncError>;

    /// Line items for a sale, from the sale detail endpoint.
    fn sale_items(&self, id_sale: i64) -> Result<Vec<LineItem>, SyncError>;

    /// Member identity behind a sale, when the sale has one.
    fn payer_identity(&self, id_sale: i64) -> Result<Option<MemberIdentity>, SyncError>;
}

/// Write side of the Billing Service.
pub trait DocumentSink {
    /// Submit a document; returns the created document id. Callers must
    /// not retry this blindly: a timed-out create may still have landed.
    fn submit(&self, document: &BillingDocument) -> Result<String, SyncError>;

    /// Create a customer record; returns its id. Only called when
    /// [`SyncConfig::create_missing_customers`] is set.
    fn create_customer(&self, identity: &CustomerIdentity) -> Result<i64, SyncError>;
}

/// Outcome of one polling run.
#[derive(Debug, Clone, PartialEq)]
pub struct PollReport {
    pub day: NaiveDate,
    pub mode: RunMode,
    pub branches: Vec<BranchReport>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BranchReport {
    pub branch: i64,
    /// Receivables returned by the Source Ledger before filtering.
    pub fetched: usize,
    /// Receivables dated other than the run's day.
    pub filtered: usize,
    pub sales: Vec<SaleReport>,
    /// Branch-level fetch failure. Other branches still run.
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SaleReport {
    pub sale_key: String,
    pub outcome: SaleOutcome,
}

impl PollReport {
    pub fn count(&self, matcher: impl Fn(&SaleOutcome) -> bool) -> usize {
        self.branches
            .iter()
            .flat_map(|b| b.sales.iter())
            .filter(|s| matcher(&s.outcome))
            .count()
    }

    pub fn emitted(&self) -> usize {
        self.count(|o| matches!(o, SaleOutcome::Emitted(_)))
    }

    pub fn simulated(&self) -> usize {
        self.count(|o| matches!(o, SaleOutcome::Simulated))
    }

    pub fn duplicated(&self) -> usize {
        self.count(|o| matches!(o, SaleOutcome::Duplicated))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, SaleOutcome::Failed(_)))
    }
}

pub struct Orchestrator<'a, S, B, L>
where
    S: SaleSource,
    B: CustomerDirectory + DocumentSink,
    L: EmissionLedger,
{
    source: &'a S,
    billing: &'a B,
    ledger: &'a mut L,
    variants: &'a mut VariantMap,
    config: &'a SyncConfig,
}

impl<'a, S, B, L> Orchestrator<'a, S, B, L>
where
    S: SaleSource,
    B: CustomerDirectory + DocumentSink,
    L: EmissionLedger,
{
    pub fn new(
        source: &'a S,
        billing: &'a B,
        ledger: &'a mut L,
        variants: &'a mut VariantMap,
        config: &'a SyncConfig,
    ) -> Self {
        Self { source, billing, ledger, variants, config }
    }

    /// Poll every configured branch for today's paid receivables and run
    /// each new sale through the pipeline. Branch fetch failures are
    /// isolated; only a ledger snapshot failure aborts the run.
    pub fn run_poll(&mut self, mode: RunMode) -> Result<PollReport, SyncError> {
        let day = self.config.today();
        let known = self.ledger.known_keys()?;
        let mut seen_this_run: BTreeSet<String> = BTreeSet::new();
        let mut branches = Vec::with_capacity(self.config.branches.len());

        for &branch in &self.config.branches {
            let receivables = match self.source.fetch_receivables(branch, day) {
                Ok(r) => r,
                Err(e) => {
                    warn!(branch, error = %e, "branch fetch failed; continuing with others");
                    branches.push(BranchReport {
                        branch,
                        fetched: 0,
                        filtered: 0,
                        sales: Vec::new(),
                        error: Some(e.to_string()),
                    });
                    continue;
                }
            };

            let fetched = receivables.len();
            let mut filtered = 0usize;
            let mut sales = Vec::new();
            for sale in receivables {
                if sale.sale_date != Some(day) {
                    filtered += 1;
                    continue;
                }
                let key = sale_key(sale.id_receivable);
                // A receivable occasionally surfaces under more than one
                // branch query; first branch wins within a run.
                if !seen_this_run.insert(key.clone()) {
                    sales.push(SaleReport { sale_key: key, outcome: SaleOutcome::Duplicated });
                    continue;
                }
                let outcome = self.process_sale(&sale, mode, &known);
                sales.push(SaleReport { sale_key: key, outcome });
            }
            branches.push(BranchReport { branch, fetched, filtered, sales, error: None });
        }

        let report = PollReport { day, mode, branches };
        info!(
            day = %day,
            mode = mode.as_str(),
            emitted = report.emitted(),
            simulated = report.simulated(),
            duplicated = report.duplicated(),
            failed = report.failed(),
            "poll run finished"
        );
        Ok(report)
    }

    /// Handle one webhook-delivered sale id. Always prod mode, no date
    /// filter: the event itself asserts the sale just happened.
    pub fn process_webhook_sale(
        &mut self,
        id_record: i64,
        id_branch: i64,
    ) -> Result<SaleOutcome, SyncError> {
        let known = self.ledger.known_keys()?;
        let sale = SaleRecord {
            id_sale: id_record,
            id_receivable: id_record,
            id_branch,
            payer_name: None,
            payer_document: None,
            amount_paid: 0,
            sale_date: None,
            items: Vec::new(),
        };
        Ok(self.process_sale(&sale, RunMode::Prod, &known))
    }

    /// The per-sale pipeline. Infallible by construction: every failure
    /// collapses into a [`SaleOutcome`], with the ledger carrying the
    /// detail for claimed keys.
    fn process_sale(
        &mut self,
        sale: &SaleRecord,
        mode: RunMode,
        known: &BTreeSet<String>,
    ) -> SaleOutcome {
        let key = sale_key(sale.id_receivable);
        if known.contains(&key) {
            return SaleOutcome::Duplicated;
        }
        if mode == RunMode::Test {
            // Simulation stops before any external call or ledger write.
            info!(sale_key = %key, "test mode, emission simulated");
            return SaleOutcome::Simulated;
        }
        if self.config.paused {
            return SaleOutcome::Paused;
        }

        let payer = sale.payer_name.clone().unwrap_or_else(|| "sin nombre".to_string());
        match self.ledger.claim(&key, &payer, sale.amount_paid) {
            Ok(true) => {}
            Ok(false) => return SaleOutcome::Duplicated,
            Err(e) => {
                // Could not prove the claim; emitting would risk a double.
                warn!(sale_key = %key, error = %e, "ledger claim failed, sale skipped");
                return SaleOutcome::Failed(format!("ledger claim: {e}"));
            }
        }

        let outcome = match self.attempt_emission(sale) {
            Ok(document_id) => {
                info!(sale_key = %key, document_id = %document_id, "document emitted");
                (LedgerStatus::Ok(document_id.clone()), SaleOutcome::Emitted(document_id))
            }
            Err(e) => {
                warn!(sale_key = %key, error = %e, "emission failed");
                (LedgerStatus::Error(e.to_string()), SaleOutcome::Failed(e.to_string()))
            }
        };

        // The terminal write must happen on both paths. If it fails the
        // key stays pending for operator review; the outcome above still
        // stands and is not masked.
        if let Err(e) = self.ledger.record_outcome(&key, &outcome.0) {
            error!(sale_key = %key, error = %e, "terminal ledger write failed, key left pending");
        }
        outcome.1
    }

    fn attempt_emission(&mut self, sale: &SaleRecord) -> Result<String, SyncError> {
        let office_id = self.config.office_for(sale.id_branch)?;
        let identity = self.payer_identity(sale);

        let resolver = CustomerResolver::new(
            self.billing,
            &self.config.excluded_customer_ids,
            self.config.similarity_threshold,
        );
        let mut client_id = resolver.resolve(&identity);
        if client_id.is_none() && self.config.create_missing_customers && !identity.name.is_empty()
        {
            match self.billing.create_customer(&identity) {
                Ok(id) => client_id = Some(id),
                Err(e) => {
                    // Creation is best effort; fall back to non-nominative.
                    warn!(name = %identity.name, error = %e, "customer creation failed");
                }
            }
        }

        let items = if sale.items.is_empty() {
            self.source.sale_items(sale.id_sale)?
        } else {
            sale.items.clone()
        };
        let sale = SaleRecord { items, ..sale.clone() };

        let document = build_document(
            &sale,
            office_id,
            client_id,
            self.variants,
            self.config,
            chrono::Utc::now().timestamp(),
        )?;
        self.billing.submit(&document)
    }

    /// Best identity available for a sale: the member record when the
    /// Source Ledger has one, the receivable's own payer fields
    /// otherwise. Lookup failures degrade, never fail the sale.
    fn payer_identity(&self, sale: &SaleRecord) -> CustomerIdentity {
        let member = match self.source.payer_identity(sale.id_sale) {
            Ok(m) => m.unwrap_or_default(),
            Err(e) => {
                warn!(id_sale = sale.id_sale, error = %e, "member lookup failed");
                MemberIdentity::default()
            }
        };
        let name = member.name.or_else(|| sale.payer_name.clone()).unwrap_or_default();
        let document = member.document.or_else(|| sale.payer_document.clone());
        CustomerIdentity {
            name: normalize_name(&name),
            tax_id: document.as_deref().and_then(normalize_rut),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::LedgerEntry;
    use crate::model::ItemCategory;
    use crate::resolver::{CustomerPage, CustomerRecord};
    use std::cell::RefCell;
    use std::collections::BTreeMap;

    struct FakeSource {
        receivables: BTreeMap<i64, Result<Vec<SaleRecord>, String>>,
        items: BTreeMap<i64, Vec<LineItem>>,
        members: BTreeMap<i64, MemberIdentity>,
    }

    impl SaleSource for FakeSource {
        fn fetch_receivables(
            &self,
            branch: i64,
            _day: NaiveDate,
        ) -> Result<Vec<SaleRecord>, SyncError> {
            match self.receivables.get(&branch) {
                Some(Ok(v)) => Ok(v.clone()),
                Some(Err(e)) => Err(SyncError::Transport(e.clone())),
                None => Ok(vec![]),
            }
        }

        fn sale_items(&self, id_sale: i64) -> Result<Vec<LineItem>, SyncError> {
            Ok(self.items.get(&id_sale).cloned().unwrap_or_default())
        }

        fn payer_identity(&self, id_sale: i64) -> Result<Option<MemberIdentity>, SyncError> {
            Ok(self.members.get(&id_sale).cloned())
        }
    }

    struct FakeBilling {
        customers: Vec<CustomerRecord>,
        submits: RefCell<Vec<BillingDocument>>,
        fail_submit: bool,
    }

    impl FakeBilling {
        fn empty() -> Self {
            Self { customers: vec![], submits: RefCell::new(vec![]), fail_submit: false }
        }

        fn submit_count(&self) -> usize {
            self.submits.borrow().len()
        }
    }

    impl CustomerDirectory for FakeBilling {
        fn find_by_tax_id(&self, tax_id: &str) -> Result<Vec<CustomerRecord>, SyncError> {
            Ok(self
                .customers
                .iter()
                .filter(|c| c.tax_number.as_deref() == Some(tax_id))
                .cloned()
                .collect())
        }

        fn search_by_name(&self, _name: &str, page: u32) -> Result<CustomerPage, SyncError> {
            if page == 0 {
                Ok(CustomerPage { items: self.customers.clone(), has_more: false })
            } else {
                Ok(CustomerPage { items: vec![], has_more: false })
            }
        }
    }

    impl DocumentSink for FakeBilling {
        fn submit(&self, document: &BillingDocument) -> Result<String, SyncError> {
            if self.fail_submit {
                return Err(SyncError::Emission("rejected by billing service".into()));
            }
            let mut submits = self.submits.borrow_mut();
            submits.push(document.clone());
            Ok(format!("doc-{}", submits.len()))
        }

        fn create_customer(&self, _identity: &CustomerIdentity) -> Result<i64, SyncError> {
            Ok(9001)
        }
    }

    #[derive(Default)]
    struct MemLedger {
        rows: BTreeMap<String, LedgerEntry>,
    }

    impl EmissionLedger for MemLedger {
        fn known_keys(&self) -> Result<BTreeSet<String>, SyncError> {
            Ok(self.rows.keys().cloned().collect())
        }

        fn claim(&mut self, sale_key: &str, customer: &str, amount: i64) -> Result<bool, SyncError> {
            if self.rows.contains_key(sale_key) {
                return Ok(false);
            }
            self.rows.insert(
                sale_key.to_string(),
                LedgerEntry {
                    sale_key: sale_key.to_string(),
                    document_id: None,
                    customer: customer.to_string(),
                    amount,
                    status: LedgerStatus::Pending,
                    recorded_at: String::new(),
                },
            );
            Ok(true)
        }

        fn record_outcome(&mut self, sale_key: &str, status: &LedgerStatus) -> Result<(), SyncError> {
            let entry = self
                .rows
                .get_mut(sale_key)
                .ok_or_else(|| SyncError::Ledger("unknown key".into()))?;
            if let LedgerStatus::Ok(id) = status {
                entry.document_id = Some(id.clone());
            }
            entry.status = status.clone();
            Ok(())
        }

        fn get(&self, sale_key: &str) -> Result<Option<LedgerEntry>, SyncError> {
            Ok(self.rows.get(sale_key).cloned())
        }
    }

    fn sale(id: i64, branch: i64, day: NaiveDate) -> SaleRecord {
        SaleRecord {
            id_sale: id,
            id_receivable: id,
            id_branch: branch,
            payer_name: Some("Juan Pérez".into()),
            payer_document: Some("12345678-5".into()),
            amount_paid: 59500,
            sale_date: Some(day),
            items: vec![],
        }
    }

    fn item(desc: &str, price: i64) -> LineItem {
        LineItem {
            description: desc.into(),
            unit_price: price,
            quantity: 1,
            category: Some(ItemCategory { kind: crate::model::ItemKind::Membership, external_id: 1 }),
        }
    }

    fn variants() -> VariantMap {
        VariantMap::in_memory(BTreeMap::from([("membership:1".to_string(), 101)]), 289)
    }

    fn source_with(branch: i64, sales: Vec<SaleRecord>) -> FakeSource {
        let items = sales.iter().map(|s| (s.id_sale, vec![item("Mensualidad", 50000)])).collect();
        FakeSource {
            receivables: BTreeMap::from([(branch, Ok(sales))]),
            items,
            members: BTreeMap::new(),
        }
    }

    #[test]
    fn second_run_skips_everything_already_emitted() {
        let config = SyncConfig::default();
        let day = config.today();
        let source = source_with(1, vec![sale(10, 1, day), sale(11, 1, day)]);
        let billing = FakeBilling::empty();
        let mut ledger = MemLedger::default();
        let mut vmap = variants();

        let first = Orchestrator::new(&source, &billing, &mut ledger, &mut vmap, &config)
            .run_poll(RunMode::Prod)
            .unwrap();
        assert_eq!(first.emitted(), 2);
        assert_eq!(billing.submit_count(), 2);

        let second = Orchestrator::new(&source, &billing, &mut ledger, &mut vmap, &config)
            .run_poll(RunMode::Prod)
            .unwrap();
        assert_eq!(second.emitted(), 0);
        assert_eq!(second.duplicated(), 2);
        assert_eq!(billing.submit_count(), 2, "no resubmission on the second run");
    }

    #[test]
    fn test_mode_touches_nothing() {
        let config = SyncConfig::default();
        let day = config.today();
        let source = source_with(1, vec![sale(10, 1, day)]);
        let billing = FakeBilling::empty();
        let mut ledger = MemLedger::default();
        let mut vmap = variants();

        let report = Orchestrator::new(&source, &billing, &mut ledger, &mut vmap, &config)
            .run_poll(RunMode::Test)
            .unwrap();
        assert_eq!(report.simulated(), 1);
        assert_eq!(report.emitted(), 0);
        assert_eq!(billing.submit_count(), 0);
        assert!(ledger.rows.is_empty(), "simulation must not write the ledger");
    }

    #[test]
    fn branch_failure_does_not_stop_other_branches() {
        let config = SyncConfig::default();
        let day = config.today();
        let mut source = source_with(3, vec![sale(20, 3, day)]);
        source.receivables.insert(1, Err("gateway timeout".into()));
        let billing = FakeBilling::empty();
        let mut ledger = MemLedger::default();
        let mut vmap = variants();

        let report = Orchestrator::new(&source, &billing, &mut ledger, &mut vmap, &config)
            .run_poll(RunMode::Prod)
            .unwrap();
        assert_eq!(report.emitted(), 1);
        let failed_branch = report.branches.iter().find(|b| b.branch == 1).unwrap();
        assert!(failed_branch.error.as_deref().unwrap().contains("gateway timeout"));
    }

    #[test]
    fn paused_config_emits_nothing_and_claims_nothing() {
        let mut config = SyncConfig::default();
        config.paused = true;
        let day = config.today();
        let source = source_with(1, vec![sale(10, 1, day)]);
        let billing = FakeBilling::empty();
        let mut ledger = MemLedger::default();
        let mut vmap = variants();

        let report = Orchestrator::new(&source, &billing, &mut ledger, &mut vmap, &config)
            .run_poll(RunMode::Prod)
            .unwrap();
        assert_eq!(report.count(|o| matches!(o, SaleOutcome::Paused)), 1);
        assert_eq!(billing.submit_count(), 0);
        assert!(ledger.rows.is_empty());
    }

    #[test]
    fn off_day_receivables_are_filtered() {
        let config = SyncConfig::default();
        let day = config.today();
        let yesterday = day.pred_opt().unwrap();
        let source = source_with(1, vec![sale(10, 1, day), sale(11, 1, yesterday)]);
        let billing = FakeBilling::empty();
        let mut ledger = MemLedger::default();
        let mut vmap = variants();

        let report = Orchestrator::new(&source, &billing, &mut ledger, &mut vmap, &config)
            .run_poll(RunMode::Prod)
            .unwrap();
        assert_eq!(report.emitted(), 1);
        assert_eq!(report.branches[0].fetched, 2);
        assert_eq!(report.branches[0].filtered, 1);
    }

    #[test]
    fn same_receivable_across_branches_emits_once() {
        let config = SyncConfig::default();
        let day = config.today();
        let source = FakeSource {
            receivables: BTreeMap::from([
                (1, Ok(vec![sale(10, 1, day)])),
                (3, Ok(vec![sale(10, 3, day)])),
            ]),
            items: BTreeMap::from([(10, vec![item("Mensualidad", 50000)])]),
            members: BTreeMap::new(),
        };
        let billing = FakeBilling::empty();
        let mut ledger = MemLedger::default();
        let mut vmap = variants();

        let report = Orchestrator::new(&source, &billing, &mut ledger, &mut vmap, &config)
            .run_poll(RunMode::Prod)
            .unwrap();
        assert_eq!(report.emitted(), 1);
        assert_eq!(report.duplicated(), 1);
        assert_eq!(billing.submit_count(), 1);
    }

    #[test]
    fn webhook_duplicate_never_resubmits() {
        let config = SyncConfig::default();
        let source = FakeSource {
            receivables: BTreeMap::new(),
            items: BTreeMap::from([(10, vec![item("Mensualidad", 50000)])]),
            members: BTreeMap::new(),
        };
        let billing = FakeBilling::empty();
        let mut ledger = MemLedger::default();
        let mut vmap = variants();

        let mut orch = Orchestrator::new(&source, &billing, &mut ledger, &mut vmap, &config);
        let first = orch.process_webhook_sale(10, 1).unwrap();
        assert!(matches!(first, SaleOutcome::Emitted(_)));
        let second = orch.process_webhook_sale(10, 1).unwrap();
        assert_eq!(second, SaleOutcome::Duplicated);
        assert_eq!(billing.submit_count(), 1);
    }

    #[test]
    fn webhook_sale_without_billable_items_fails_cleanly() {
        // The synthesized webhook record carries amount 0; if the sale
        // detail yields no valid items either, nothing can be billed.
        let config = SyncConfig::default();
        let source = source_with(1, vec![]);
        let billing = FakeBilling::empty();
        let mut ledger = MemLedger::default();
        let mut vmap = variants();

        let outcome = Orchestrator::new(&source, &billing, &mut ledger, &mut vmap, &config)
            .process_webhook_sale(10, 1)
            .unwrap();
        assert!(matches!(outcome, SaleOutcome::Failed(_)));
        assert_eq!(billing.submit_count(), 0, "a zero-value document must never be submitted");
        let entry = ledger.get("receivable-10").unwrap().unwrap();
        assert!(matches!(entry.status, LedgerStatus::Error(_)));
    }

    #[test]
    fn webhook_unmapped_branch_records_failure_in_ledger() {
        let config = SyncConfig::default();
        let source = source_with(1, vec![]);
        let billing = FakeBilling::empty();
        let mut ledger = MemLedger::default();
        let mut vmap = variants();

        let outcome = Orchestrator::new(&source, &billing, &mut ledger, &mut vmap, &config)
            .process_webhook_sale(10, 99)
            .unwrap();
        assert!(matches!(outcome, SaleOutcome::Failed(_)));
        let entry = ledger.get("receivable-10").unwrap().unwrap();
        assert!(matches!(entry.status, LedgerStatus::Error(_)));
        assert_eq!(billing.submit_count(), 0);
    }

    #[test]
    fn submit_failure_lands_as_terminal_error() {
        let config = SyncConfig::default();
        let day = config.today();
        let source = source_with(1, vec![sale(10, 1, day)]);
        let mut billing = FakeBilling::empty();
        billing.fail_submit = true;
        let mut ledger = MemLedger::default();
        let mut vmap = variants();

        let report = Orchestrator::new(&source, &billing, &mut ledger, &mut vmap, &config)
            .run_poll(RunMode::Prod)
            .unwrap();
        assert_eq!(report.failed(), 1);
        let entry = ledger.get("receivable-10").unwrap().unwrap();
        assert!(matches!(entry.status, LedgerStatus::Error(_)));
    }

    #[test]
    fn matched_customer_yields_nominative_document() {
        let config = SyncConfig::default();
        let day = config.today();
        let source = source_with(1, vec![sale(10, 1, day)]);
        let billing = FakeBilling {
            customers: vec![CustomerRecord {
                id: 77,
                name: "Juan Pérez".into(),
                tax_number: Some("12345678-5".into()),
                code: None,
            }],
            submits: RefCell::new(vec![]),
            fail_submit: false,
        };
        let mut ledger = MemLedger::default();
        let mut vmap = variants();

        Orchestrator::new(&source, &billing, &mut ledger, &mut vmap, &config)
            .run_poll(RunMode::Prod)
            .unwrap();
        let submits = billing.submits.borrow();
        assert_eq!(submits[0].client_id, Some(77));
        assert_eq!(submits[0].document_type_id, config.doc_type_nominative);
        assert_eq!(submits[0].details[0].variant_id, 101);
        assert_eq!(submits[0].details[0].net_unit_value, 42017);
    }

    #[test]
    fn unmatched_customer_yields_non_nominative_document() {
        let config = SyncConfig::default();
        let day = config.today();
        let source = source_with(1, vec![sale(10, 1, day)]);
        let billing = FakeBilling::empty();
        let mut ledger = MemLedger::default();
        let mut vmap = variants();

        Orchestrator::new(&source, &billing, &mut ledger, &mut vmap, &config)
            .run_poll(RunMode::Prod)
            .unwrap();
        let submits = billing.submits.borrow();
        assert_eq!(submits[0].client_id, None);
        assert_eq!(submits[0].document_type_id, config.doc_type_non_nominative);
    }
}
