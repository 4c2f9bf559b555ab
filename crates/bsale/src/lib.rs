//! Billing Service API client.
//!
//! Two concerns behind one authenticated client: the read-only customer
//! directory used by resolution, and document emission. Emission never
//! retries; a timed-out create may have landed, and the ledger treats
//! that uncertainty as a failure for operator review rather than
//! risking a duplicate document.

use serde::Deserialize;
use tracing::warn;

use boletera_http::{HttpError, RetryingClient};
use boletera_recon::{
    BillingDocument, CustomerDirectory, CustomerIdentity, CustomerPage, CustomerRecord,
    DocumentSink, SyncError,
};

const PAGE_SIZE: usize = 25;
/// Hard cap on directory pages walked by one lookup.
const MAX_LIST_PAGES: u32 = 40;

/// Placeholder tax number for customers created without one.
const PLACEHOLDER_TAX_NUMBER: &str = "99999999-9";

#[derive(Debug, Deserialize)]
struct ClientList {
    #[serde(default)]
    count: Option<usize>,
    #[serde(default)]
    items: Vec<ClientRaw>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClientRaw {
    id: i64,
    #[serde(default)]
    first_name: Option<String>,
    #[serde(default)]
    last_name: Option<String>,
    #[serde(default)]
    company: Option<String>,
    #[serde(default)]
    tax_number: Option<String>,
    #[serde(default)]
    code: Option<String>,
}

impl ClientRaw {
    fn into_record(self) -> CustomerRecord {
        // Companies store the display name in `company`; persons split
        // it across first/last.
        let name = match self.company {
            Some(c) if !c.trim().is_empty() => c,
            _ => {
                let first = self.first_name.unwrap_or_default();
                let last = self.last_name.unwrap_or_default();
                format!("{first} {last}").trim().to_string()
            }
        };
        CustomerRecord { id: self.id, name, tax_number: self.tax_number, code: self.code }
    }
}

#[derive(Debug, Deserialize)]
struct DocumentResponse {
    #[serde(default)]
    id: Option<i64>,
    #[serde(default)]
    error: Option<String>,
}

pub struct BsaleClient {
    http: RetryingClient,
    base: String,
    token: String,
}

impl BsaleClient {
    pub fn new(base: impl Into<String>, token: impl Into<String>) -> Result<Self, SyncError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| SyncError::Config(format!("bsale http client: {e}")))?;
        Ok(Self {
            http: RetryingClient::new(client, "bsale"),
            base: base.into().trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    fn list_clients(&self, query: &[(&str, String)]) -> Result<ClientList, SyncError> {
        let url = format!("{}/clients.json", self.base);
        let body = self
            .http
            .execute(|| {
                self.http
                    .inner()
                    .get(&url)
                    .header("access_token", &self.token)
                    .query(query)
            })
            .map_err(|e| SyncError::Transport(format!("{url}: {e}")))?;
        serde_json::from_str(&body)
            .map_err(|e| SyncError::Transport(format!("{url}: bad payload: {e}")))
    }

    fn page_query(term_key: &'static str, term: &str, page: u32) -> [(&'static str, String); 3] {
        [
            (term_key, term.to_string()),
            ("limit", PAGE_SIZE.to_string()),
            ("offset", ((page as usize) * PAGE_SIZE).to_string()),
        ]
    }

    fn fetch_page(&self, term_key: &'static str, term: &str, page: u32) -> Result<(Vec<CustomerRecord>, bool), SyncError> {
        let list = self.list_clients(&Self::page_query(term_key, term, page))?;
        let fetched = (page as usize) * PAGE_SIZE + list.items.len();
        let has_more = match list.count {
            Some(count) => fetched < count,
            None => list.items.len() == PAGE_SIZE,
        };
        Ok((list.items.into_iter().map(ClientRaw::into_record).collect(), has_more))
    }

    fn fetch_all(&self, term_key: &'static str, term: &str) -> Result<Vec<CustomerRecord>, SyncError> {
        let mut out = Vec::new();
        for page in 0..MAX_LIST_PAGES {
            let (items, has_more) = self.fetch_page(term_key, term, page)?;
            out.extend(items);
            if !has_more {
                break;
            }
        }
        Ok(out)
    }
}

impl CustomerDirectory for BsaleClient {
    /// Candidates for a tax id, via the dedicated filter first and the
    /// free-text index as fallback (older records only have the tax id
    /// in `code`). Both are walked to the last page: the right customer
    /// can sit anywhere in a loose text-search result. The resolver
    /// re-verifies every candidate.
    fn find_by_tax_id(&self, tax_id: &str) -> Result<Vec<CustomerRecord>, SyncError> {
        let direct = self.fetch_all("taxnumber", tax_id)?;
        if !direct.is_empty() {
            return Ok(direct);
        }
        self.fetch_all("q", tax_id)
    }

    fn search_by_name(&self, name: &str, page: u32) -> Result<CustomerPage, SyncError> {
        let (items, has_more) = self.fetch_page("q", name, page)?;
        Ok(CustomerPage { items, has_more })
    }
}

impl DocumentSink for BsaleClient {
    fn submit(&self, document: &BillingDocument) -> Result<String, SyncError> {
        let url = format!("{}/documents.json", self.base);
        let result = self.http.execute_no_retry(|| {
            self.http
                .inner()
                .post(&url)
                .header("access_token", &self.token)
                .json(document)
        });
        let body = match result {
            Ok(body) => body,
            Err(HttpError::Status { status, body }) => {
                return Err(SyncError::Emission(extract_error(status, &body)))
            }
            Err(e) => return Err(SyncError::Transport(format!("{url}: {e}"))),
        };
        let parsed: DocumentResponse = serde_json::from_str(&body)
            .map_err(|e| SyncError::Emission(format!("unparseable response: {e}")))?;
        match (parsed.id, parsed.error) {
            (Some(id), _) => Ok(id.to_string()),
            // A 200 with an error field happens on validation failures.
            (None, Some(error)) => Err(SyncError::Emission(error)),
            (None, None) => Err(SyncError::Emission("response carried no document id".into())),
        }
    }

    fn create_customer(&self, identity: &CustomerIdentity) -> Result<i64, SyncError> {
        let url = format!("{}/clients.json", self.base);
        let (first_name, last_name) = split_name(&identity.name);
        let tax_number = identity.tax_id.clone().unwrap_or_else(|| {
            warn!(name = %identity.name, "creating customer with placeholder tax number");
            PLACEHOLDER_TAX_NUMBER.to_string()
        });
        let payload = serde_json::json!({
            "firstName": first_name,
            "lastName": last_name,
            "taxNumber": tax_number,
            "email": synthesized_email(&identity.name),
        });
        let body = self
            .http
            .execute_no_retry(|| {
                self.http
                    .inner()
                    .post(&url)
                    .header("access_token", &self.token)
                    .json(&payload)
            })
            .map_err(|e| SyncError::Transport(format!("{url}: {e}")))?;
        let parsed: DocumentResponse = serde_json::from_str(&body)
            .map_err(|e| SyncError::Transport(format!("{url}: bad payload: {e}")))?;
        parsed
            .id
            .ok_or_else(|| SyncError::Emission("customer creation returned no id".into()))
    }
}

fn extract_error(status: u16, body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        if let Some(msg) = value.get("error").and_then(|e| e.as_str()) {
            return msg.to_string();
        }
    }
    format!("http {status}: {}", body.chars().take(200).collect::<String>())
}

fn split_name(name: &str) -> (String, String) {
    match name.split_once(' ') {
        Some((first, rest)) => (first.to_string(), rest.to_string()),
        None => (name.to_string(), String::new()),
    }
}

fn synthesized_email(name: &str) -> String {
    let local: String = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_lowercase();
    let local = if local.is_empty() { "cliente".to_string() } else { local };
    format!("{local}@sin-correo.invalid")
}
