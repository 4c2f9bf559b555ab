//! Source Ledger API client.
//!
//! Read-only: receivables by branch and day, sale detail, member
//! identity. All endpoints use basic auth. Field names mirror the wire
//! format, including its misspellings (`ammountPaid`).

use chrono::NaiveDate;
use serde::Deserialize;
use tracing::warn;

use boletera_http::RetryingClient;
use boletera_recon::{
    ItemCategory, ItemKind, LineItem, MemberIdentity, SaleRecord, SaleSource, SyncError,
};

const PAGE_SIZE: usize = 50;
/// Hard cap on receivable pages per branch per day.
const MAX_PAGES: usize = 200;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ReceivablesResponse {
    Bare(Vec<ReceivableRaw>),
    Wrapped { receivables: Vec<ReceivableRaw> },
}

impl ReceivablesResponse {
    fn into_vec(self) -> Vec<ReceivableRaw> {
        match self {
            Self::Bare(v) => v,
            Self::Wrapped { receivables } => receivables,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReceivableRaw {
    id_receivable: i64,
    #[serde(default)]
    id_sale: Option<i64>,
    #[serde(default)]
    payer_name: Option<String>,
    #[serde(default)]
    document: Option<String>,
    // Vendor misspelling, stable for years.
    #[serde(rename = "ammountPaid", default)]
    ammount_paid: Option<f64>,
    #[serde(default)]
    sale_date: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SaleDetail {
    #[serde(default)]
    id_member: Option<i64>,
    #[serde(rename = "saleItens", default)]
    sale_items: Vec<SaleItemRaw>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SaleItemRaw {
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    item: Option<String>,
    #[serde(default)]
    item_value: Option<f64>,
    #[serde(default)]
    quantity: Option<u32>,
    #[serde(default)]
    id_product: Option<i64>,
    #[serde(default)]
    id_service: Option<i64>,
    #[serde(default)]
    id_membership: Option<i64>,
}

impl SaleItemRaw {
    fn category(&self) -> Option<ItemCategory> {
        // Memberships first: a membership sale sometimes also carries a
        // product reference for the enrollment kit.
        if let Some(id) = self.id_membership {
            return Some(ItemCategory { kind: ItemKind::Membership, external_id: id });
        }
        if let Some(id) = self.id_product {
            return Some(ItemCategory { kind: ItemKind::Product, external_id: id });
        }
        if let Some(id) = self.id_service {
            return Some(ItemCategory { kind: ItemKind::Service, external_id: id });
        }
        None
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MemberRaw {
    #[serde(default)]
    first_name: Option<String>,
    #[serde(default)]
    last_name: Option<String>,
    #[serde(default)]
    document: Option<String>,
    #[serde(default)]
    email: Option<String>,
}

pub struct EvoClient {
    http: RetryingClient,
    base_v1: String,
    base_v2: String,
    username: String,
    password: String,
}

impl EvoClient {
    pub fn new(
        base_v1: impl Into<String>,
        base_v2: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self, SyncError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(20))
            .connect_timeout(std::time::Duration::from_secs(10))
            .build()
            .map_err(|e| SyncError::Config(format!("evo http client: {e}")))?;
        Ok(Self {
            http: RetryingClient::new(client, "evo"),
            base_v1: base_v1.into().trim_end_matches('/').to_string(),
            base_v2: base_v2.into().trim_end_matches('/').to_string(),
            username: username.into(),
            password: password.into(),
        })
    }

    fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, SyncError> {
        let body = self
            .http
            .execute(|| {
                self.http
                    .inner()
                    .get(url)
                    .basic_auth(&self.username, Some(&self.password))
                    .query(query)
            })
            .map_err(|e| SyncError::Transport(format!("{url}: {e}")))?;
        serde_json::from_str(&body)
            .map_err(|e| SyncError::Transport(format!("{url}: bad payload: {e}")))
    }

    fn sale_detail(&self, id_sale: i64) -> Result<SaleDetail, SyncError> {
        self.get_json(&format!("{}/sales/{id_sale}", self.base_v1), &[])
    }
}

fn parse_sale_date(raw: &Option<String>) -> Option<NaiveDate> {
    let raw = raw.as_deref()?;
    // Dates arrive as "2025-08-24T10:31:00"; the date prefix is enough.
    NaiveDate::parse_from_str(raw.get(..10)?, "%Y-%m-%d").ok()
}

impl SaleSource for EvoClient {
    fn fetch_receivables(&self, branch: i64, day: NaiveDate) -> Result<Vec<SaleRecord>, SyncError> {
        let url = format!("{}/receivables", self.base_v1);
        let day_str = day.format("%Y-%m-%d").to_string();
        let mut out = Vec::new();
        for page in 0..MAX_PAGES {
            let skip = page * PAGE_SIZE;
            let query = [
                ("saleDateStart", format!("{day_str}T00:00:00")),
                ("saleDateEnd", format!("{day_str}T23:59:59")),
                ("idBranchMember", branch.to_string()),
                // 2 = paid.
                ("status", "2".to_string()),
                ("take", PAGE_SIZE.to_string()),
                ("skip", skip.to_string()),
            ];
            let batch: ReceivablesResponse = self.get_json(&url, &query)?;
            let batch = batch.into_vec();
            let batch_len = batch.len();
            for raw in batch {
                out.push(SaleRecord {
                    id_sale: raw.id_sale.unwrap_or(raw.id_receivable),
                    id_receivable: raw.id_receivable,
                    id_branch: branch,
                    payer_name: raw.payer_name,
                    payer_document: raw.document,
                    amount_paid: raw.ammount_paid.unwrap_or(0.0).round() as i64,
                    sale_date: parse_sale_date(&raw.sale_date),
                    items: Vec::new(),
                });
            }
            if batch_len < PAGE_SIZE {
                return Ok(out);
            }
        }
        warn!(branch, day = %day, "receivable page cap reached, result truncated");
        Ok(out)
    }

    fn sale_items(&self, id_sale: i64) -> Result<Vec<LineItem>, SyncError> {
        let detail = self.sale_detail(id_sale)?;
        Ok(detail
            .sale_items
            .into_iter()
            .map(|raw| {
                let category = raw.category();
                LineItem {
                    description: raw
                        .description
                        .or(raw.item)
                        .unwrap_or_default(),
                    unit_price: raw.item_value.unwrap_or(0.0).round() as i64,
                    quantity: raw.quantity.unwrap_or(1).max(1),
                    category,
                }
            })
            .collect())
    }

    fn payer_identity(&self, id_sale: i64) -> Result<Option<MemberIdentity>, SyncError> {
        let detail = self.sale_detail(id_sale)?;
        let Some(id_member) = detail.id_member else {
            return Ok(None);
        };
        let member: MemberRaw =
            self.get_json(&format!("{}/members/{id_member}", self.base_v2), &[])?;
        let name = match (member.first_name, member.last_name) {
            (Some(f), Some(l)) => Some(format!("{f} {l}")),
            (Some(f), None) => Some(f),
            (None, Some(l)) => Some(l),
            (None, None) => None,
        };
        Ok(Some(MemberIdentity { name, document: member.document, email: member.email }))
    }
}
