use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Security deposit or guarantee attached to a contract. Pure bookkeeping,
/// no computation attaches to it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deposit {
    pub id: String,
    pub contract_id: String,
    pub kind: String,
    #[serde(default)]
    pub is_deposited: bool,
    #[serde(default, rename = "amountEUR")]
    pub amount_eur: Option<f64>,
    #[serde(default)]
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
