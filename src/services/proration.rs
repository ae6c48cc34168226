//! Advance-billing proration.
//!
//! Contracts billed in "next month" mode issue the invoice for month M+1
//! while month M is being evaluated. When the contract ends partway through
//! M+1 the invoice covers only the occupied fraction, and an end on the 1st
//! or 2nd of M+1 suppresses the invoice entirely.

use chrono::Datelike;

use crate::domain::{clamped_date, days_in_month, next_month, Contract};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NextMonthProration {
    pub include: bool,
    /// Occupied fraction of the billed month, 1.0 for full coverage.
    pub fraction: f64,
}

const SKIP: NextMonthProration = NextMonthProration {
    include: false,
    fraction: 0.0,
};

/// Decide whether evaluating `(year, month)` produces an invoice for the
/// following month, and for what fraction of it.
pub fn compute_next_month_proration(
    contract: &Contract,
    year: i32,
    month: u32,
) -> NextMonthProration {
    let (target_year, target_month) = next_month(year, month);
    let Some(first) = clamped_date(target_year, target_month, 1) else {
        return SKIP;
    };
    let Some(last) = clamped_date(target_year, target_month, 31) else {
        return SKIP;
    };

    let end = contract.effective_end_date();
    if end < first || contract.start_date > last {
        return SKIP;
    }
    // One or two days of occupancy in the billed month is not worth an
    // invoice.
    if end <= last && end.month() == target_month && end.day() <= 2 {
        return SKIP;
    }

    let overlap_start = contract.start_date.max(first);
    let overlap_end = end.min(last);
    let overlap_days = (overlap_end - overlap_start).num_days() + 1;
    if overlap_days <= 0 {
        return SKIP;
    }

    let month_days = i64::from(days_in_month(target_year, target_month));
    NextMonthProration {
        include: true,
        fraction: overlap_days as f64 / month_days as f64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Contract;
    use serde_json::json;

    fn contract(start: &str, end: &str) -> Contract {
        serde_json::from_value(json!({
            "id": "c1",
            "name": "Unit 4",
            "ownerId": "o1",
            "ownerName": "Imob SRL",
            "startDate": start,
            "endDate": end,
            "rentType": "monthly",
            "invoiceMonthMode": "next",
            "amountEUR": 1000.0,
            "exchangeRateRON": 4.97,
            "tvaPercent": 19.0
        }))
        .unwrap()
    }

    #[test]
    fn full_month_has_fraction_one() {
        let c = contract("2025-01-01", "2025-12-31");
        let p = compute_next_month_proration(&c, 2025, 5);
        assert!(p.include);
        assert!((p.fraction - 1.0).abs() < 1e-12);
    }

    #[test]
    fn billed_month_after_end_is_skipped() {
        let c = contract("2025-01-01", "2025-06-30");
        // Evaluating June would bill July, which is past the end.
        assert!(!compute_next_month_proration(&c, 2025, 6).include);
    }

    #[test]
    fn end_on_first_or_second_suppresses() {
        for end in ["2025-07-01", "2025-07-02"] {
            let c = contract("2025-01-01", end);
            assert!(
                !compute_next_month_proration(&c, 2025, 6).include,
                "end {end} should suppress the July invoice"
            );
        }
        let c = contract("2025-01-01", "2025-07-03");
        let p = compute_next_month_proration(&c, 2025, 6);
        assert!(p.include);
        assert!((p.fraction - 3.0 / 31.0).abs() < 1e-12);
    }

    #[test]
    fn mid_month_end_prorates_by_days() {
        let c = contract("2025-01-01", "2025-07-20");
        let p = compute_next_month_proration(&c, 2025, 6);
        assert!(p.include);
        assert!((p.fraction - 20.0 / 31.0).abs() < 1e-12);
    }

    #[test]
    fn mid_month_start_prorates_by_days() {
        let c = contract("2025-07-16", "2026-12-31");
        let p = compute_next_month_proration(&c, 2025, 6);
        assert!(p.include);
        // July 16..=31 is 16 days of a 31-day month.
        assert!((p.fraction - 16.0 / 31.0).abs() < 1e-12);
    }

    #[test]
    fn extension_keeps_billing_alive() {
        let mut c = contract("2025-01-01", "2025-06-30");
        c.extensions = vec![crate::domain::ContractExtension {
            doc_date: None,
            document: None,
            extended_until: "2025-09-30".parse().unwrap(),
        }];
        assert!(compute_next_month_proration(&c, 2025, 6).include);
    }

    #[test]
    fn february_lengths_respected() {
        let c = contract("2024-01-01", "2024-02-15");
        let p = compute_next_month_proration(&c, 2024, 1);
        assert!(p.include);
        assert!((p.fraction - 15.0 / 29.0).abs() < 1e-12);
    }
}
