use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// An issued invoice. Amounts are computed once at issuance and stored at full
/// precision; nothing downstream recomputes them. `id` doubles as the invoice
/// number.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub id: String,
    pub number: String,
    pub contract_id: String,
    pub contract_name: String,
    pub owner_id: String,
    pub owner_name: String,
    #[serde(default)]
    pub partner_id: Option<String>,
    pub partner_name: String,
    pub issued_at: NaiveDate,
    pub due_days: u32,
    #[serde(rename = "amountEUR")]
    pub amount_eur: f64,
    pub correction_percent: f64,
    #[serde(rename = "correctedAmountEUR")]
    pub corrected_amount_eur: f64,
    #[serde(rename = "exchangeRateRON")]
    pub exchange_rate_ron: f64,
    #[serde(rename = "netRON")]
    pub net_ron: f64,
    pub tva_percent: f64,
    #[serde(rename = "vatRON")]
    pub vat_ron: f64,
    #[serde(rename = "totalRON")]
    pub total_ron: f64,
    #[serde(default)]
    pub pdf_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Invoice {
    /// Partner component of the issuance identity, falling back to the
    /// partner name when no stable id exists.
    pub fn partner_key(&self) -> String {
        super::partner_key(self.partner_id.as_deref(), &self.partner_name)
    }

    pub fn due_date(&self) -> NaiveDate {
        self.issued_at + Duration::days(i64::from(self.due_days))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Invoice {
        Invoice {
            id: "IMO-2025-001".into(),
            number: "IMO-2025-001".into(),
            contract_id: "c1".into(),
            contract_name: "Unit 4".into(),
            owner_id: "o1".into(),
            owner_name: "Imob SRL".into(),
            partner_id: None,
            partner_name: "Acme SRL".into(),
            issued_at: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            due_days: 30,
            amount_eur: 1000.0,
            correction_percent: 0.0,
            corrected_amount_eur: 1000.0,
            exchange_rate_ron: 4.97,
            net_ron: 4970.0,
            tva_percent: 19.0,
            vat_ron: 944.3,
            total_ron: 5914.3,
            pdf_url: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn due_date_adds_due_days() {
        assert_eq!(
            sample().due_date(),
            NaiveDate::from_ymd_opt(2025, 3, 31).unwrap()
        );
    }

    #[test]
    fn partner_key_falls_back_to_name() {
        let mut invoice = sample();
        assert_eq!(invoice.partner_key(), "Acme SRL");
        invoice.partner_id = Some("p9".into());
        assert_eq!(invoice.partner_key(), "p9");
    }

    #[test]
    fn serializes_amount_field_names() {
        let out = serde_json::to_value(sample()).unwrap();
        for key in [
            "amountEUR",
            "correctedAmountEUR",
            "exchangeRateRON",
            "netRON",
            "vatRON",
            "totalRON",
        ] {
            assert!(out.get(key).is_some(), "missing {key}");
        }
    }
}
