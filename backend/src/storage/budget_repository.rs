//! Read queries over the budget singleton and its ledger.

use anyhow::Result;

use crate::db::Db;
use crate::domain::models::{Budget, LedgerEntry};

#[derive(Clone)]
pub struct BudgetRepository {
    db: Db,
}

impl BudgetRepository {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// None until the first financial transaction creates the singleton.
    pub async fn get_budget(&self, account_id: &str) -> Result<Option<Budget>> {
        let budget = sqlx::query_as::<_, Budget>("SELECT * FROM budget WHERE account_id = ?")
            .bind(account_id)
            .fetch_optional(self.db.pool())
            .await?;
        Ok(budget)
    }

    /// Ledger page, newest first.
    pub async fn list_entries(
        &self,
        account_id: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<LedgerEntry>> {
        let entries = sqlx::query_as::<_, LedgerEntry>(
            r#"
            SELECT * FROM ledger_entries
            WHERE account_id = ?
            ORDER BY date DESC, id DESC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(account_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(self.db.pool())
        .await?;
        Ok(entries)
    }

    pub async fn count_entries(&self, account_id: &str) -> Result<i64> {
        let count: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM ledger_entries WHERE account_id = ?")
                .bind(account_id)
                .fetch_one(self.db.pool())
                .await?;
        Ok(count.0)
    }

    /// Signed sum of the full ledger; the balance the budget singleton must
    /// agree with.
    pub async fn signed_entry_sum(&self, account_id: &str) -> Result<f64> {
        let sum: (f64,) = sqlx::query_as(
            r#"
            SELECT COALESCE(SUM(
                CASE entry_type WHEN 'INCOME' THEN amount_usd ELSE -amount_usd END
            ), 0.0)
            FROM ledger_entries
            WHERE account_id = ?
            "#,
        )
        .bind(account_id)
        .fetch_one(self.db.pool())
        .await?;
        Ok(sum.0)
    }
}
