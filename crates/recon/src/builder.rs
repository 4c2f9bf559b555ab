//! Billing document assembly.
//!
//! Net values are tax-exclusive, computed from the Source Ledger's
//! tax-inclusive prices with half-away-from-zero rounding
//! (`f64::round`). The choice is pinned by tests: 50000 / 1.19 → 42017,
//! 30000 / 1.19 → 25210.

use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::model::{BillingDocument, DocumentLine, SaleRecord};
use crate::variants::VariantMap;

/// Tax-exclusive unit value for a gross (tax-inclusive) price.
pub fn net_unit_value(gross: i64, tax_rate: f64) -> i64 {
    (gross as f64 / (1.0 + tax_rate)).round() as i64
}

/// Assemble the document payload for one sale.
///
/// `office_id` must already be resolved from the branch mapping (an
/// unmapped branch is a configuration error raised by the caller).
/// Every produced document has at least one line with a positive net
/// value: lines with empty descriptions or non-positive computed nets
/// are dropped, and if nothing survives a single generic fallback line
/// is synthesized from the amount paid, since the Billing Service rejects
/// zero-line documents. A sale with no billable line and no positive
/// amount paid cannot satisfy that, and is refused instead of emitted
/// with a zero-value line.
///
/// Variants are resolved for every described item, including ones the
/// price check then drops, so zero-priced products still land in the
/// map for curation.
pub fn build_document(
    sale: &SaleRecord,
    office_id: i64,
    client_id: Option<i64>,
    variants: &mut VariantMap,
    config: &SyncConfig,
    emission_date: i64,
) -> Result<BillingDocument, SyncError> {
    let mut details: Vec<DocumentLine> = Vec::new();
    for item in &sale.items {
        if item.description.trim().is_empty() {
            continue;
        }
        let variant_id = variants.resolve(item.category.as_ref(), &item.description);
        let net = net_unit_value(item.unit_price, config.tax_rate);
        if net <= 0 {
            continue;
        }
        details.push(DocumentLine {
            quantity: item.quantity.max(1),
            variant_id,
            net_unit_value: net,
        });
    }

    if details.is_empty() {
        let net = net_unit_value(sale.amount_paid, config.tax_rate);
        if net <= 0 {
            return Err(SyncError::Emission(format!(
                "sale {} has no billable lines and no positive amount paid",
                sale.id_sale
            )));
        }
        details.push(DocumentLine {
            quantity: 1,
            variant_id: config.generic_variant_id,
            net_unit_value: net,
        });
    }

    let document_type_id = if client_id.is_some() {
        config.doc_type_nominative
    } else {
        config.doc_type_non_nominative
    };

    Ok(BillingDocument {
        emission_date,
        document_type_id,
        price_list_id: config.price_list_id,
        office_id,
        client_id,
        details,
    })
}
