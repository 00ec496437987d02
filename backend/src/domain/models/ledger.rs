//! Domain model for the append-only budget ledger.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntryType {
    Income,
    Expense,
}

impl EntryType {
    /// Sign applied to `amount_usd` when summing the ledger.
    pub fn sign(self) -> f64 {
        match self {
            EntryType::Income => 1.0,
            EntryType::Expense => -1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntryCategory {
    Dues,
    Maintenance,
    Utilities,
    Cleaning,
    Security,
    Repairs,
    Other,
}

/// One immutable income/expense record. Never updated or deleted; the
/// running budget balance must always equal the signed sum of all entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct LedgerEntry {
    pub id: String,
    pub account_id: String,
    /// Absolute USD amount; sign comes from `entry_type`
    pub amount_usd: f64,
    pub amount_display: f64,
    pub entry_type: EntryType,
    pub category: EntryCategory,
    pub description: String,
    pub date: DateTime<Utc>,
    pub rate: f64,
}

impl LedgerEntry {
    pub fn generate_id() -> String {
        format!("txn-{}", uuid::Uuid::new_v4())
    }

    /// The entry's effect on the budget balance, in USD.
    pub fn signed_amount_usd(&self) -> f64 {
        self.entry_type.sign() * self.amount_usd
    }

    pub fn to_dto(&self) -> shared::LedgerEntry {
        shared::LedgerEntry {
            id: self.id.clone(),
            amount_usd: self.amount_usd,
            amount_display: self.amount_display,
            entry_type: match self.entry_type {
                EntryType::Income => shared::EntryType::Income,
                EntryType::Expense => shared::EntryType::Expense,
            },
            category: match self.category {
                EntryCategory::Dues => shared::EntryCategory::Dues,
                EntryCategory::Maintenance => shared::EntryCategory::Maintenance,
                EntryCategory::Utilities => shared::EntryCategory::Utilities,
                EntryCategory::Cleaning => shared::EntryCategory::Cleaning,
                EntryCategory::Security => shared::EntryCategory::Security,
                EntryCategory::Repairs => shared::EntryCategory::Repairs,
                EntryCategory::Other => shared::EntryCategory::Other,
            },
            description: self.description.clone(),
            date: self.date.to_rfc3339(),
            rate: self.rate,
        }
    }
}

impl From<shared::EntryType> for EntryType {
    fn from(t: shared::EntryType) -> Self {
        match t {
            shared::EntryType::Income => EntryType::Income,
            shared::EntryType::Expense => EntryType::Expense,
        }
    }
}

impl From<shared::EntryCategory> for EntryCategory {
    fn from(c: shared::EntryCategory) -> Self {
        match c {
            shared::EntryCategory::Dues => EntryCategory::Dues,
            shared::EntryCategory::Maintenance => EntryCategory::Maintenance,
            shared::EntryCategory::Utilities => EntryCategory::Utilities,
            shared::EntryCategory::Cleaning => EntryCategory::Cleaning,
            shared::EntryCategory::Security => EntryCategory::Security,
            shared::EntryCategory::Repairs => EntryCategory::Repairs,
            shared::EntryCategory::Other => EntryCategory::Other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signed_amount_follows_entry_type() {
        let mut entry = LedgerEntry {
            id: LedgerEntry::generate_id(),
            account_id: "acct".to_string(),
            amount_usd: 15.625,
            amount_display: 500.0,
            entry_type: EntryType::Expense,
            category: EntryCategory::Maintenance,
            description: "Garden hose".to_string(),
            date: Utc::now(),
            rate: 32.0,
        };
        assert_eq!(entry.signed_amount_usd(), -15.625);

        entry.entry_type = EntryType::Income;
        assert_eq!(entry.signed_amount_usd(), 15.625);
    }
}
