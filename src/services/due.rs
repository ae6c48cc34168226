//! Which invoices fall due in a given month, per contract and partner.

use chrono::Datelike;
use chrono::NaiveDate;
use serde::Serialize;

use crate::domain::{clamped_date, next_month, partner_key, Contract, Invoice, RentType};
use crate::services::{proration, rent};

/// One invoice that the month calls for. `partner_share_key` is the partner
/// component of the issuance identity; `already_issued` is filled in by
/// [`mark_issued`] against the stored invoices.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DueOccurrence {
    pub contract_id: String,
    pub contract_name: String,
    pub owner_id: String,
    pub owner_name: String,
    pub partner_id: Option<String>,
    pub partner_name: String,
    #[serde(skip)]
    pub partner_share_key: String,
    pub date: NaiveDate,
    #[serde(rename = "amountEUR")]
    pub amount_eur: f64,
    pub prorated: bool,
    pub already_issued: bool,
}

/// All invoice occurrences the given month calls for, across contracts.
///
/// Monthly contracts produce at most one occurrence per partner; yearly and
/// chosen-dates contracts produce their fixed entries falling in the month,
/// never prorated. Contracts whose rent cannot be valued are skipped.
pub fn due_occurrences(contracts: &[Contract], year: i32, month: u32) -> Vec<DueOccurrence> {
    let mut occurrences = Vec::new();
    for contract in contracts {
        match contract.rent_type {
            RentType::Monthly => {
                if let Some((date, amount, prorated)) = monthly_occurrence(contract, year, month) {
                    push_split(&mut occurrences, contract, date, amount, prorated);
                }
            }
            RentType::Yearly => {
                for entry in &contract.yearly_invoices {
                    if entry.month != month {
                        continue;
                    }
                    let Some(date) = clamped_date(year, month, entry.day) else {
                        continue;
                    };
                    if !contract.is_active_on(date) {
                        continue;
                    }
                    push_split(&mut occurrences, contract, date, entry.amount_eur, false);
                }
            }
            RentType::ChosenDates => {
                for chosen in &contract.chosen_dates {
                    if chosen.date.year() != year || chosen.date.month() != month {
                        continue;
                    }
                    if !contract.is_active_on(chosen.date) {
                        continue;
                    }
                    let Some(amount) = rent::rent_amount_at(contract, chosen.date) else {
                        continue;
                    };
                    push_split(&mut occurrences, contract, chosen.date, amount, false);
                }
            }
        }
    }
    occurrences
}

fn monthly_occurrence(contract: &Contract, year: i32, month: u32) -> Option<(NaiveDate, f64, bool)> {
    // Without an explicit invoice day the contract bills on the day-of-month
    // it started, clamped to the month's length.
    let day = contract
        .monthly_invoice_day
        .unwrap_or_else(|| contract.start_date.day());
    let issue_date = clamped_date(year, month, day)?;
    match contract.invoice_month_mode {
        crate::domain::InvoiceMonthMode::Current => {
            if !contract.is_active_on(issue_date) {
                return None;
            }
            let amount = rent::rent_amount_at(contract, issue_date)?;
            Some((issue_date, amount, false))
        }
        crate::domain::InvoiceMonthMode::Next => {
            let p = proration::compute_next_month_proration(contract, year, month);
            if !p.include {
                return None;
            }
            // Value the rent as of the occupied month, not the issue month.
            let (target_year, target_month) = next_month(year, month);
            let valuation_date = clamped_date(target_year, target_month, 1)?;
            let amount = rent::rent_amount_at(contract, valuation_date)?;
            Some((issue_date, amount * p.fraction, p.fraction < 1.0))
        }
    }
}

/// Append one occurrence per partner, splitting the amount by share when the
/// contract names several partners with a positive share total. The split is
/// exact; nothing is rounded before persistence.
fn push_split(
    occurrences: &mut Vec<DueOccurrence>,
    contract: &Contract,
    date: NaiveDate,
    amount_eur: f64,
    prorated: bool,
) {
    let share_total: f64 = contract
        .partners
        .iter()
        .filter_map(|p| p.share_percent)
        .filter(|s| *s > 0.0)
        .sum();

    if contract.partners.len() > 1 && share_total > 0.0 {
        for partner in &contract.partners {
            let share = partner.share_percent.unwrap_or(0.0);
            if share <= 0.0 {
                continue;
            }
            occurrences.push(DueOccurrence {
                contract_id: contract.id.clone(),
                contract_name: contract.name.clone(),
                owner_id: contract.owner_id.clone(),
                owner_name: contract.owner_name.clone(),
                partner_id: partner.id.clone(),
                partner_name: partner.name.clone(),
                partner_share_key: partner_key(partner.id.as_deref(), &partner.name),
                date,
                amount_eur: amount_eur * share / share_total,
                prorated,
                already_issued: false,
            });
        }
        return;
    }

    let (partner_id, partner_name) = match contract.partners.first() {
        Some(p) => (p.id.clone(), p.name.clone()),
        None => (
            contract.partner_id.clone(),
            contract.partner_name.clone().unwrap_or_default(),
        ),
    };
    occurrences.push(DueOccurrence {
        contract_id: contract.id.clone(),
        contract_name: contract.name.clone(),
        owner_id: contract.owner_id.clone(),
        owner_name: contract.owner_name.clone(),
        partner_share_key: partner_key(partner_id.as_deref(), &partner_name),
        partner_id,
        partner_name,
        date,
        amount_eur,
        prorated,
        already_issued: false,
    });
}

/// Flag occurrences for which an invoice already exists under the same
/// `(contract, partner, date)` identity.
pub fn mark_issued(occurrences: &mut [DueOccurrence], invoices: &[Invoice]) {
    for occurrence in occurrences.iter_mut() {
        occurrence.already_issued = invoices.iter().any(|invoice| {
            invoice.contract_id == occurrence.contract_id
                && invoice.issued_at == occurrence.date
                && invoice.partner_key() == occurrence.partner_share_key
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Partner, ScheduledInvoice};
    use crate::services::billing;
    use serde_json::json;

    fn monthly(day: u32) -> Contract {
        serde_json::from_value(json!({
            "id": "c1",
            "name": "Unit 4",
            "ownerId": "o1",
            "ownerName": "Imob SRL",
            "partnerName": "Acme SRL",
            "startDate": "2025-01-01",
            "endDate": "2025-12-31",
            "rentType": "monthly",
            "monthlyInvoiceDay": day,
            "amountEUR": 1000.0,
            "exchangeRateRON": 4.97,
            "tvaPercent": 19.0
        }))
        .unwrap()
    }

    #[test]
    fn monthly_day_clamps_in_short_months() {
        let due = due_occurrences(&[monthly(31)], 2025, 4);
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].date, "2025-04-30".parse().unwrap());
        assert_eq!(due[0].amount_eur, 1000.0);
        assert!(!due[0].prorated);
    }

    #[test]
    fn monthly_day_defaults_to_contract_start_day() {
        let mut c = monthly(1);
        c.monthly_invoice_day = None;
        c.start_date = "2025-01-15".parse().unwrap();
        let due = due_occurrences(std::slice::from_ref(&c), 2025, 3);
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].date, "2025-03-15".parse().unwrap());

        // A day-31 start still clamps in short months.
        c.start_date = "2025-01-31".parse().unwrap();
        let due = due_occurrences(std::slice::from_ref(&c), 2025, 4);
        assert_eq!(due[0].date, "2025-04-30".parse().unwrap());
    }

    #[test]
    fn inactive_month_produces_nothing() {
        assert!(due_occurrences(&[monthly(1)], 2026, 1).is_empty());
    }

    #[test]
    fn advance_mode_prorates_final_month() {
        let mut c = monthly(15);
        c.invoice_month_mode = crate::domain::InvoiceMonthMode::Next;
        c.end_date = "2025-07-20".parse().unwrap();

        // June evaluation bills July 1..=20.
        let due = due_occurrences(std::slice::from_ref(&c), 2025, 6);
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].date, "2025-06-15".parse().unwrap());
        assert!((due[0].amount_eur - 1000.0 * 20.0 / 31.0).abs() < 1e-9);
        assert!(due[0].prorated);

        // July evaluation would bill August, past the end.
        assert!(due_occurrences(std::slice::from_ref(&c), 2025, 7).is_empty());
    }

    #[test]
    fn yearly_entries_fixed_never_prorated() {
        let mut c = monthly(1);
        c.rent_type = RentType::Yearly;
        c.yearly_invoices = vec![
            ScheduledInvoice {
                month: 3,
                day: 15,
                amount_eur: 5000.0,
            },
            ScheduledInvoice {
                month: 9,
                day: 15,
                amount_eur: 5000.0,
            },
        ];
        let due = due_occurrences(std::slice::from_ref(&c), 2025, 3);
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].amount_eur, 5000.0);
        assert!(!due[0].prorated);
        assert!(due_occurrences(std::slice::from_ref(&c), 2025, 4).is_empty());
    }

    #[test]
    fn sixty_forty_split_is_exact() {
        let mut c = monthly(1);
        c.partners = vec![
            Partner {
                id: Some("p1".into()),
                name: "Alpha".into(),
                share_percent: Some(60.0),
            },
            Partner {
                id: Some("p2".into()),
                name: "Beta".into(),
                share_percent: Some(40.0),
            },
        ];
        let due = due_occurrences(std::slice::from_ref(&c), 2025, 5);
        assert_eq!(due.len(), 2);
        assert_eq!(due[0].amount_eur, 600.0);
        assert_eq!(due[1].amount_eur, 400.0);
        assert_eq!(due[0].amount_eur + due[1].amount_eur, 1000.0);
        assert_eq!(due[0].partner_share_key, "p1");
    }

    #[test]
    fn partners_without_shares_fall_back_to_single() {
        let mut c = monthly(1);
        c.partners = vec![
            Partner {
                id: Some("p1".into()),
                name: "Alpha".into(),
                share_percent: None,
            },
            Partner {
                id: Some("p2".into()),
                name: "Beta".into(),
                share_percent: None,
            },
        ];
        let due = due_occurrences(std::slice::from_ref(&c), 2025, 5);
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].amount_eur, 1000.0);
        assert_eq!(due[0].partner_share_key, "p1");
    }

    #[test]
    fn mark_issued_matches_compound_key() {
        let c = monthly(1);
        let mut due = due_occurrences(std::slice::from_ref(&c), 2025, 5);
        assert!(!due[0].already_issued);

        let invoice = billing::compute_invoice_from_contract(
            &c,
            None,
            "2025-05-01".parse().unwrap(),
            "IMO-2025-001",
            None,
        );
        mark_issued(&mut due, std::slice::from_ref(&invoice));
        assert!(due[0].already_issued);

        // A different issue date does not match.
        let mut due_june = due_occurrences(std::slice::from_ref(&c), 2025, 6);
        mark_issued(&mut due_june, std::slice::from_ref(&invoice));
        assert!(!due_june[0].already_issued);
    }
}
