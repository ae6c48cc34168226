//! Invoice amount computation.
//!
//! All five derived amounts are computed here, once, at issuance. The chain is
//! EUR → correction → RON net → VAT → total; no rounding anywhere, full f64
//! precision is stored and display rounding happens only in the PDF layer.

use chrono::{NaiveDate, Utc};

use crate::domain::{partner_key, Contract, Invoice, Partner};
use crate::services::rent;

/// Build an invoice for a contract, addressed to `partner` when given
/// (multi-partner contracts) or to the contract's own partner fields.
///
/// `amount_override` takes precedence over the amendment history; it carries
/// pre-split partner shares and prorated amounts from the due scheduler. When
/// neither resolves the invoice is issued at zero, which the route layer
/// rejects beforehand for normal issuance paths.
pub fn compute_invoice_from_contract(
    contract: &Contract,
    partner: Option<&Partner>,
    issued_at: NaiveDate,
    number: &str,
    amount_override: Option<f64>,
) -> Invoice {
    let amount_eur = amount_override
        .or_else(|| rent::rent_amount_at(contract, issued_at))
        .unwrap_or(0.0);
    let corrected_amount_eur = amount_eur * (1.0 + contract.correction_percent / 100.0);
    let net_ron = corrected_amount_eur * contract.exchange_rate_ron;
    let vat_ron = net_ron * contract.tva_percent / 100.0;
    let total_ron = net_ron + vat_ron;

    let (partner_id, partner_name) = resolve_partner_fields(contract, partner);

    Invoice {
        id: number.to_string(),
        number: number.to_string(),
        contract_id: contract.id.clone(),
        contract_name: contract.name.clone(),
        owner_id: contract.owner_id.clone(),
        owner_name: contract.owner_name.clone(),
        partner_id,
        partner_name,
        issued_at,
        due_days: contract.payment_due_days,
        amount_eur,
        correction_percent: contract.correction_percent,
        corrected_amount_eur,
        exchange_rate_ron: contract.exchange_rate_ron,
        net_ron,
        tva_percent: contract.tva_percent,
        vat_ron,
        total_ron,
        pdf_url: None,
        created_at: Utc::now(),
    }
}

/// The issuance identity of a would-be invoice for a contract/partner pair.
pub fn issuance_key(contract: &Contract, partner: Option<&Partner>) -> String {
    let (partner_id, partner_name) = resolve_partner_fields(contract, partner);
    partner_key(partner_id.as_deref(), &partner_name)
}

/// Without an explicit partner, the first listed partner wins over the
/// legacy single-partner fields, matching the due scheduler's addressing.
fn resolve_partner_fields(
    contract: &Contract,
    partner: Option<&Partner>,
) -> (Option<String>, String) {
    match partner.or_else(|| contract.partners.first()) {
        Some(p) => (p.id.clone(), p.name.clone()),
        None => (
            contract.partner_id.clone(),
            contract.partner_name.clone().unwrap_or_default(),
        ),
    }
}
