//! Reconciliation core: turns gym-platform sales into billing documents,
//! exactly once per sale.
//!
//! Everything with decision logic lives here, behind trait seams
//! ([`SaleSource`], [`CustomerDirectory`], [`DocumentSink`],
//! [`EmissionLedger`]) so the vendor HTTP clients and the ledger store
//! stay swappable in tests.

pub mod builder;
pub mod config;
pub mod error;
pub mod identity;
pub mod ledger;
pub mod model;
pub mod orchestrator;
pub mod resolver;
pub mod variants;

pub use builder::{build_document, net_unit_value};
pub use config::SyncConfig;
pub use error::SyncError;
pub use ledger::{EmissionLedger, LedgerEntry, LedgerStatus};
pub use model::{
    sale_key, BillingDocument, CustomerIdentity, DocumentLine, ItemCategory, ItemKind, LineItem,
    MemberIdentity, RunMode, SaleOutcome, SaleRecord,
};
pub use orchestrator::{
    BranchReport, DocumentSink, Orchestrator, PollReport, SaleReport, SaleSource,
};
pub use resolver::{CustomerDirectory, CustomerPage, CustomerRecord, CustomerResolver};
pub use variants::VariantMap;
