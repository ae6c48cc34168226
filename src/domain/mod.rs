pub mod contract;
pub mod deposit;
pub mod invoice;

pub use contract::{
    ChosenDate, Contract, ContractExtension, InvoiceMonthMode, Partner, RentAmendment, RentType,
    ScheduledInvoice,
};
pub use deposit::Deposit;
pub use invoice::Invoice;

use chrono::{Datelike, NaiveDate};

pub fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|first| first.pred_opt())
        .map(|last| last.day())
        .unwrap_or(30)
}

/// Build a date clamping the day to the month's length (day 31 in April
/// becomes April 30). Returns `None` only for an invalid month.
pub fn clamped_date(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    if !(1..=12).contains(&month) {
        return None;
    }
    let day = day.clamp(1, days_in_month(year, month));
    NaiveDate::from_ymd_opt(year, month, day)
}

pub fn next_month(year: i32, month: u32) -> (i32, u32) {
    if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    }
}

/// Compound identity of an invoice occurrence. Invoices are unique per
/// `(contract, partner, issue date)`; the partner component falls back to the
/// partner name when no stable id exists.
pub fn partner_key(partner_id: Option<&str>, partner_name: &str) -> String {
    partner_id
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(partner_name.trim())
        .to_string()
}
