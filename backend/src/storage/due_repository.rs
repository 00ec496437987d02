//! Read queries over per-period dues.

use anyhow::Result;

use crate::db::Db;
use crate::domain::models::Due;

#[derive(Clone)]
pub struct DueRepository {
    db: Db,
}

impl DueRepository {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub async fn get(&self, account_id: &str, due_id: &str) -> Result<Option<Due>> {
        let due = sqlx::query_as::<_, Due>("SELECT * FROM dues WHERE account_id = ? AND id = ?")
            .bind(account_id)
            .bind(due_id)
            .fetch_optional(self.db.pool())
            .await?;
        Ok(due)
    }

    /// Full history for one apartment, newest period first.
    pub async fn list_for_apartment(
        &self,
        account_id: &str,
        apartment_id: &str,
    ) -> Result<Vec<Due>> {
        let dues = sqlx::query_as::<_, Due>(
            r#"
            SELECT * FROM dues
            WHERE account_id = ? AND apartment_id = ?
            ORDER BY year DESC, month DESC
            "#,
        )
        .bind(account_id)
        .bind(apartment_id)
        .fetch_all(self.db.pool())
        .await?;
        Ok(dues)
    }

    /// Dues already accrued for a billing period, across all apartments.
    pub async fn list_for_period(&self, account_id: &str, month: u32, year: i32) -> Result<Vec<Due>> {
        let dues = sqlx::query_as::<_, Due>(
            "SELECT * FROM dues WHERE account_id = ? AND month = ? AND year = ?",
        )
        .bind(account_id)
        .bind(month)
        .bind(year)
        .fetch_all(self.db.pool())
        .await?;
        Ok(dues)
    }

    /// Unpaid dues with a positive remainder, oldest period first so pay-all
    /// settles the longest-standing debt first.
    pub async fn outstanding_for_apartment(
        &self,
        account_id: &str,
        apartment_id: &str,
    ) -> Result<Vec<Due>> {
        let dues = sqlx::query_as::<_, Due>(
            r#"
            SELECT * FROM dues
            WHERE account_id = ? AND apartment_id = ?
              AND is_paid = 0 AND remaining_debt_usd > 0
            ORDER BY year, month
            "#,
        )
        .bind(account_id)
        .bind(apartment_id)
        .fetch_all(self.db.pool())
        .await?;
        Ok(dues)
    }

    /// Sum of unpaid remainders per apartment; the source of truth the
    /// cached `current_debt_usd` is reconciled against.
    pub async fn outstanding_total_for_apartment(
        &self,
        account_id: &str,
        apartment_id: &str,
    ) -> Result<f64> {
        let total: (f64,) = sqlx::query_as(
            r#"
            SELECT COALESCE(SUM(remaining_debt_usd), 0.0)
            FROM dues
            WHERE account_id = ? AND apartment_id = ? AND is_paid = 0
            "#,
        )
        .bind(account_id)
        .bind(apartment_id)
        .fetch_one(self.db.pool())
        .await?;
        Ok(total.0)
    }
}
