//! Process settings, read from the environment once at startup.
//!
//! Missing credentials are a startup failure, not a per-request one: a
//! process that cannot reach both vendors has no business accepting
//! webhooks. Everything else has deployment defaults.

use std::collections::{BTreeMap, BTreeSet};

use boletera_recon::{SyncConfig, SyncError};

const DEFAULT_EVO_V1: &str = "https://evo-integracao-api.w12app.com.br/api/v1";
const DEFAULT_EVO_V2: &str = "https://evo-integracao-api.w12app.com.br/api/v2";
const DEFAULT_BSALE: &str = "https://api.bsale.io/v1";
const DEFAULT_LISTEN: &str = "0.0.0.0:5000";

#[derive(Debug, Clone)]
pub struct Settings {
    pub evo_base_v1: String,
    pub evo_base_v2: String,
    pub evo_user: String,
    pub evo_pass: String,
    pub bsale_base: String,
    pub bsale_token: String,
    /// Shared secret webhooks must present. Required, no default.
    pub webhook_secret: String,
    pub listen_addr: String,
    pub variant_map_path: String,
    pub ledger_path: String,
    pub sync: SyncConfig,
}

impl Settings {
    pub fn from_env() -> Result<Self, SyncError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from any key → value source. The indirection keeps
    /// tests off the process environment.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, SyncError> {
        let required = |key: &str| -> Result<String, SyncError> {
            match get(key) {
                Some(v) if !v.trim().is_empty() => Ok(v),
                _ => Err(SyncError::Config(format!("missing required env var {key}"))),
            }
        };
        let or_default = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let defaults = SyncConfig::default();
        let sync = SyncConfig {
            branches: match get("SYNC_BRANCHES") {
                Some(raw) => parse_id_list(&raw, "SYNC_BRANCHES")?,
                None => defaults.branches,
            },
            offices: match get("SYNC_OFFICES") {
                Some(raw) => parse_office_map(&raw)?,
                None => defaults.offices,
            },
            tax_rate: parse_or(&get, "SYNC_TAX_RATE", defaults.tax_rate)?,
            price_list_id: parse_or(&get, "SYNC_PRICE_LIST_ID", defaults.price_list_id)?,
            doc_type_nominative: parse_or(&get, "SYNC_DOC_TYPE_NOMINATIVE", defaults.doc_type_nominative)?,
            doc_type_non_nominative: parse_or(
                &get,
                "SYNC_DOC_TYPE_NON_NOMINATIVE",
                defaults.doc_type_non_nominative,
            )?,
            generic_variant_id: parse_or(&get, "SYNC_GENERIC_VARIANT_ID", defaults.generic_variant_id)?,
            excluded_customer_ids: match get("SYNC_EXCLUDED_CUSTOMER_IDS") {
                Some(raw) => parse_id_list(&raw, "SYNC_EXCLUDED_CUSTOMER_IDS")?
                    .into_iter()
                    .collect::<BTreeSet<_>>(),
                None => defaults.excluded_customer_ids,
            },
            similarity_threshold: parse_or(&get, "SYNC_SIMILARITY_THRESHOLD", defaults.similarity_threshold)?,
            utc_offset_hours: parse_or(&get, "SYNC_UTC_OFFSET_HOURS", defaults.utc_offset_hours)?,
            paused: parse_or(&get, "SYNC_PAUSED", defaults.paused)?,
            create_missing_customers: parse_or(
                &get,
                "SYNC_CREATE_MISSING_CUSTOMERS",
                defaults.create_missing_customers,
            )?,
        };

        Ok(Self {
            evo_base_v1: or_default("EVO_API_V1", DEFAULT_EVO_V1),
            evo_base_v2: or_default("EVO_API_V2", DEFAULT_EVO_V2),
            evo_user: required("EVO_USER")?,
            evo_pass: required("EVO_PASS")?,
            bsale_base: or_default("BSALE_API", DEFAULT_BSALE),
            bsale_token: required("BSALE_TOKEN")?,
            webhook_secret: required("WEBHOOK_SECRET")?,
            listen_addr: or_default("LISTEN_ADDR", DEFAULT_LISTEN),
            variant_map_path: or_default("VARIANT_MAP_PATH", "variant_map.json"),
            ledger_path: or_default("LEDGER_PATH", "emissions.sqlite"),
            sync,
        })
    }
}

fn parse_or<T: std::str::FromStr>(
    get: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, SyncError> {
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| SyncError::Config(format!("unparseable value for {key}: {raw:?}"))),
        None => Ok(default),
    }
}

/// `"1,3,4"` → `[1, 3, 4]`.
fn parse_id_list(raw: &str, key: &str) -> Result<Vec<i64>, SyncError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse()
                .map_err(|_| SyncError::Config(format!("bad id {s:?} in {key}")))
        })
        .collect()
}

/// `"1:1,3:2,4:3"` → branch → office.
fn parse_office_map(raw: &str) -> Result<BTreeMap<i64, i64>, SyncError> {
    let mut map = BTreeMap::new();
    for pair in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let (branch, office) = pair
            .split_once(':')
            .ok_or_else(|| SyncError::Config(format!("bad pair {pair:?} in SYNC_OFFICES")))?;
        let branch = branch
            .trim()
            .parse()
            .map_err(|_| SyncError::Config(format!("bad branch {branch:?} in SYNC_OFFICES")))?;
        let office = office
            .trim()
            .parse()
            .map_err(|_| SyncError::Config(format!("bad office {office:?} in SYNC_OFFICES")))?;
        map.insert(branch, office);
    }
    Ok(map)
}
