//! Rent valuation against the contract's amendment history.

use chrono::NaiveDate;

use crate::domain::Contract;

/// Resolve the rent in EUR that applies on `date`.
///
/// The latest amendment whose effective date is on or before `date` wins;
/// amendments sharing an effective date resolve in list order, so the entry
/// written last wins. Contracts predating the amendment history fall back to
/// the legacy flat `amountEUR`. `None` means no rent is defined on that date
/// and callers must skip the contract rather than bill zero.
pub fn rent_amount_at(contract: &Contract, date: NaiveDate) -> Option<f64> {
    let mut resolved: Option<(NaiveDate, f64)> = None;
    for amendment in &contract.rent_history {
        let effective = amendment.effective_date();
        if effective > date {
            continue;
        }
        match resolved {
            Some((best, _)) if effective < best => {}
            _ => resolved = Some((effective, amendment.new_rent_amount)),
        }
    }
    resolved
        .map(|(_, amount)| amount)
        .or(contract.amount_eur)
}

/// The rent applying "today" for an injected today.
pub fn current_rent_amount(contract: &Contract, today: NaiveDate) -> Option<f64> {
    rent_amount_at(contract, today)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RentAmendment;
    use serde_json::json;

    fn contract_with(amount_eur: Option<f64>, history: Vec<RentAmendment>) -> Contract {
        let mut contract: Contract = serde_json::from_value(json!({
            "id": "c1",
            "name": "Unit 4",
            "ownerId": "o1",
            "ownerName": "Imob SRL",
            "startDate": "2024-01-01",
            "endDate": "2026-12-31",
            "rentType": "monthly",
            "exchangeRateRON": 4.97,
            "tvaPercent": 19.0
        }))
        .unwrap();
        contract.amount_eur = amount_eur;
        contract.rent_history = history;
        contract
    }

    fn amendment(effective: &str, amount: f64) -> RentAmendment {
        RentAmendment {
            forecast_date: effective.parse().unwrap(),
            actual_date: None,
            new_rent_amount: amount,
            done: false,
        }
    }

    fn day(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn picks_latest_amendment_not_after_date() {
        let contract = contract_with(
            Some(800.0),
            vec![
                amendment("2024-01-01", 1000.0),
                amendment("2025-01-01", 1100.0),
                amendment("2026-01-01", 1250.0),
            ],
        );
        assert_eq!(rent_amount_at(&contract, day("2024-06-15")), Some(1000.0));
        assert_eq!(rent_amount_at(&contract, day("2025-01-01")), Some(1100.0));
        assert_eq!(rent_amount_at(&contract, day("2025-12-31")), Some(1100.0));
        assert_eq!(rent_amount_at(&contract, day("2026-03-01")), Some(1250.0));
    }

    #[test]
    fn monotone_within_a_segment() {
        let contract = contract_with(
            None,
            vec![
                amendment("2024-01-01", 1000.0),
                amendment("2024-07-01", 1050.0),
            ],
        );
        let a = rent_amount_at(&contract, day("2024-03-01"));
        let b = rent_amount_at(&contract, day("2024-06-30"));
        assert_eq!(a, b);
    }

    #[test]
    fn actual_date_overrides_forecast() {
        let mut late = amendment("2025-01-01", 1100.0);
        late.actual_date = Some(day("2025-02-01"));
        let contract = contract_with(None, vec![amendment("2024-01-01", 1000.0), late]);
        // The confirmed date pushed the increase out by a month.
        assert_eq!(rent_amount_at(&contract, day("2025-01-15")), Some(1000.0));
        assert_eq!(rent_amount_at(&contract, day("2025-02-01")), Some(1100.0));
    }

    #[test]
    fn tied_effective_dates_last_entry_wins() {
        let contract = contract_with(
            None,
            vec![amendment("2025-01-01", 1100.0), amendment("2025-01-01", 1150.0)],
        );
        assert_eq!(rent_amount_at(&contract, day("2025-06-01")), Some(1150.0));
    }

    #[test]
    fn falls_back_to_legacy_amount() {
        let contract = contract_with(Some(750.0), vec![]);
        assert_eq!(rent_amount_at(&contract, day("2025-06-01")), Some(750.0));

        let contract = contract_with(Some(750.0), vec![amendment("2025-07-01", 900.0)]);
        // Before the first amendment takes effect the legacy amount applies.
        assert_eq!(rent_amount_at(&contract, day("2025-06-01")), Some(750.0));
    }

    #[test]
    fn current_rent_matches_valuation_at_today() {
        let contract = contract_with(None, vec![amendment("2025-01-01", 1100.0)]);
        let today = day("2025-06-01");
        assert_eq!(
            current_rent_amount(&contract, today),
            rent_amount_at(&contract, today)
        );
    }

    #[test]
    fn none_when_nothing_resolves() {
        let contract = contract_with(None, vec![amendment("2026-01-01", 900.0)]);
        assert_eq!(rent_amount_at(&contract, day("2025-06-01")), None);
    }
}
