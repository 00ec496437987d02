//! Read queries over the apartment registry.

use anyhow::Result;

use crate::db::Db;
use crate::domain::models::Apartment;

#[derive(Clone)]
pub struct ApartmentRepository {
    db: Db,
}

impl ApartmentRepository {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub async fn get(&self, account_id: &str, apartment_id: &str) -> Result<Option<Apartment>> {
        let apartment = sqlx::query_as::<_, Apartment>(
            "SELECT * FROM apartments WHERE account_id = ? AND id = ?",
        )
        .bind(account_id)
        .bind(apartment_id)
        .fetch_optional(self.db.pool())
        .await?;
        Ok(apartment)
    }

    /// All apartments for an account, ordered by block then unit number.
    pub async fn list(&self, account_id: &str) -> Result<Vec<Apartment>> {
        let apartments = sqlx::query_as::<_, Apartment>(
            "SELECT * FROM apartments WHERE account_id = ? ORDER BY block, number",
        )
        .bind(account_id)
        .fetch_all(self.db.pool())
        .await?;
        Ok(apartments)
    }

    /// True when another apartment already occupies the block/number slot.
    /// `exclude_id` lets updates skip the apartment being edited.
    pub async fn unit_taken(
        &self,
        account_id: &str,
        block: &str,
        number: u32,
        exclude_id: Option<&str>,
    ) -> Result<bool> {
        let count: (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM apartments
            WHERE account_id = ? AND block = ? AND number = ? AND id != ?
            "#,
        )
        .bind(account_id)
        .bind(block)
        .bind(number)
        .bind(exclude_id.unwrap_or(""))
        .fetch_one(self.db.pool())
        .await?;
        Ok(count.0 > 0)
    }
}
