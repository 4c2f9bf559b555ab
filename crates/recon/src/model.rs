use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One transaction pulled from the Source Ledger. Immutable once fetched.
///
/// Amounts are integer CLP (no minor units in CLP).
#[derive(Debug, Clone, PartialEq)]
pub struct SaleRecord {
    pub id_sale: i64,
    pub id_receivable: i64,
    pub id_branch: i64,
    /// Payer name as recorded on the receivable; may be absent or stale.
    pub payer_name: Option<String>,
    /// Payer tax id as recorded on the receivable; may be absent or stale.
    pub payer_document: Option<String>,
    pub amount_paid: i64,
    pub sale_date: Option<NaiveDate>,
    pub items: Vec<LineItem>,
}

/// A sale line from the Source Ledger. Unit price is tax-inclusive.
#[derive(Debug, Clone, PartialEq)]
pub struct LineItem {
    pub description: String,
    pub unit_price: i64,
    pub quantity: u32,
    pub category: Option<ItemCategory>,
}

/// Structured category reference for a line item (`kind:external_id`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemCategory {
    pub kind: ItemKind,
    pub external_id: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    Product,
    Service,
    Membership,
    Unknown,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Product => "product",
            Self::Service => "service",
            Self::Membership => "membership",
            Self::Unknown => "unknown",
        }
    }
}

/// Normalized lookup key for customer resolution. Never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomerIdentity {
    /// Output of [`crate::identity::normalize_name`].
    pub name: String,
    /// Output of [`crate::identity::normalize_rut`]; `None` means no
    /// deterministic match is possible.
    pub tax_id: Option<String>,
}

/// Member identity fetched from the Source Ledger member endpoint.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemberIdentity {
    pub name: Option<String>,
    pub document: Option<String>,
    pub email: Option<String>,
}

/// Billing document payload, constructed fresh per sale.
///
/// `client_id` must be omitted from the wire payload when absent: the
/// Billing Service treats an explicit null as its built-in placeholder
/// customer, which is exactly what the two-type split exists to avoid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillingDocument {
    pub emission_date: i64,
    pub document_type_id: i64,
    pub price_list_id: i64,
    pub office_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<i64>,
    pub details: Vec<DocumentLine>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentLine {
    pub quantity: u32,
    pub variant_id: i64,
    pub net_unit_value: i64,
}

/// Emission run mode: `Test` simulates without touching the Billing
/// Service or the ledger, `Prod` emits for real.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Test,
    Prod,
}

impl RunMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Test => "test",
            Self::Prod => "prod",
        }
    }
}

/// Terminal (or deliberately skipped) outcome for one sale key.
#[derive(Debug, Clone, PartialEq)]
pub enum SaleOutcome {
    /// Document created; carries the Billing Service document id.
    Emitted(String),
    /// Test mode: pipeline would have emitted, nothing was called.
    Simulated,
    /// Already claimed or already terminal in the ledger.
    Duplicated,
    /// Emission is administratively paused.
    Paused,
    /// Build or submit failed; detail recorded in the ledger.
    Failed(String),
}

/// Namespaced ledger key for a receivable. Stable, never reused.
pub fn sale_key(id_receivable: i64) -> String {
    format!("receivable-{id_receivable}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sale_key_is_namespaced() {
        assert_eq!(sale_key(42), "receivable-42");
    }

    #[test]
    fn client_id_absent_is_omitted_from_payload() {
        let doc = BillingDocument {
            emission_date: 1_700_000_000,
            document_type_id: 2,
            price_list_id: 2,
            office_id: 1,
            client_id: None,
            details: vec![DocumentLine { quantity: 1, variant_id: 289, net_unit_value: 25210 }],
        };
        let json = serde_json::to_value(&doc).unwrap();
        assert!(json.get("clientId").is_none(), "absent client must not serialize, even as null");
        assert_eq!(json["documentTypeId"], 2);
        assert_eq!(json["details"][0]["netUnitValue"], 25210);
    }

    #[test]
    fn client_id_present_is_serialized() {
        let doc = BillingDocument {
            emission_date: 1_700_000_000,
            document_type_id: 1,
            price_list_id: 2,
            office_id: 3,
            client_id: Some(77),
            details: vec![],
        };
        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["clientId"], 77);
    }
}
