//! Domain model for the per-account budget balance singleton.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Created lazily by the first financial transaction; from then on every
/// payment and manual entry adjusts `balance_usd` with an atomic increment
/// in the same batch that appends the ledger entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Budget {
    pub account_id: String,
    pub balance_usd: f64,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

impl Budget {
    pub fn to_dto(&self, rate: Option<f64>) -> shared::BudgetSummary {
        shared::BudgetSummary {
            balance_usd: self.balance_usd,
            balance_display: rate.map(|r| self.balance_usd * r),
            last_updated: Some(self.last_updated.to_rfc3339()),
        }
    }
}
