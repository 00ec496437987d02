//! Domain model for a registered apartment.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Apartment {
    pub id: String,
    pub account_id: String,
    /// Block/section label, stored upper-case
    pub block: String,
    pub number: u32,
    pub owner: String,
    /// Denormalized cache of the apartment's unpaid dues, in USD.
    /// Every mutation path adjusts it with an atomic increment in the same
    /// batch that touches the dues; the dues themselves are the truth.
    pub current_debt_usd: f64,
    pub created_at: DateTime<Utc>,
}

impl Apartment {
    pub fn generate_id() -> String {
        format!("apt-{}", uuid::Uuid::new_v4())
    }

    /// Short label used in ledger entry descriptions, e.g. "A-5".
    pub fn label(&self) -> String {
        format!("{}-{}", self.block, self.number)
    }

    pub fn to_dto(&self, rate: Option<f64>) -> shared::Apartment {
        shared::Apartment {
            id: self.id.clone(),
            block: self.block.clone(),
            number: self.number,
            owner: self.owner.clone(),
            current_debt_usd: self.current_debt_usd,
            current_debt_display: rate.map(|r| self.current_debt_usd * r),
            created_at: self.created_at.to_rfc3339(),
        }
    }
}
