//! Atomic multi-document write batches.
//!
//! Every mutation path in the system goes through a [`WriteBatch`]: the
//! operations queued on one batch commit together or not at all, which is
//! what keeps the denormalized balances and their source-of-truth ledgers
//! consistent. A dropped batch rolls back automatically.

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::{Sqlite, Transaction};

use super::changes::{ChangeFeed, Collection};
use crate::domain::models::{Apartment, Due, DuePayment, LedgerEntry, SiteSettings};

pub struct WriteBatch {
    tx: Transaction<'static, Sqlite>,
    changes: ChangeFeed,
    touched: Vec<(String, Collection)>,
}

impl WriteBatch {
    pub(crate) fn new(tx: Transaction<'static, Sqlite>, changes: ChangeFeed) -> Self {
        Self {
            tx,
            changes,
            touched: Vec::new(),
        }
    }

    fn touch(&mut self, account_id: &str, collection: Collection) {
        let key = (account_id.to_string(), collection);
        if !self.touched.contains(&key) {
            self.touched.push(key);
        }
    }

    pub async fn insert_apartment(&mut self, apartment: &Apartment) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO apartments (id, account_id, block, number, owner, current_debt_usd, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&apartment.id)
        .bind(&apartment.account_id)
        .bind(&apartment.block)
        .bind(apartment.number)
        .bind(&apartment.owner)
        .bind(apartment.current_debt_usd)
        .bind(apartment.created_at)
        .execute(&mut *self.tx)
        .await?;

        self.touch(&apartment.account_id, Collection::Apartments);
        Ok(())
    }

    /// Update identity fields only; the debt field is owned by the
    /// accrual/payment operations. Returns false when the row is missing.
    pub async fn update_apartment_identity(
        &mut self,
        account_id: &str,
        apartment_id: &str,
        block: &str,
        number: u32,
        owner: &str,
    ) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE apartments SET block = ?, number = ?, owner = ? WHERE account_id = ? AND id = ?",
        )
        .bind(block)
        .bind(number)
        .bind(owner)
        .bind(account_id)
        .bind(apartment_id)
        .execute(&mut *self.tx)
        .await?;

        self.touch(account_id, Collection::Apartments);
        Ok(result.rows_affected() > 0)
    }

    /// Atomic, commutative debt adjustment, floored at zero. Used instead
    /// of read-modify-write so concurrent batches cannot lose updates.
    pub async fn adjust_apartment_debt(
        &mut self,
        account_id: &str,
        apartment_id: &str,
        delta_usd: f64,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE apartments
            SET current_debt_usd = MAX(0.0, current_debt_usd + ?)
            WHERE account_id = ? AND id = ?
            "#,
        )
        .bind(delta_usd)
        .bind(account_id)
        .bind(apartment_id)
        .execute(&mut *self.tx)
        .await?;

        self.touch(account_id, Collection::Apartments);
        Ok(())
    }

    /// Pay-all sets the cached debt to exactly zero rather than decrementing.
    pub async fn zero_apartment_debt(&mut self, account_id: &str, apartment_id: &str) -> Result<()> {
        sqlx::query("UPDATE apartments SET current_debt_usd = 0 WHERE account_id = ? AND id = ?")
            .bind(account_id)
            .bind(apartment_id)
            .execute(&mut *self.tx)
            .await?;

        self.touch(account_id, Collection::Apartments);
        Ok(())
    }

    pub async fn delete_apartment(&mut self, account_id: &str, apartment_id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM apartments WHERE account_id = ? AND id = ?")
            .bind(account_id)
            .bind(apartment_id)
            .execute(&mut *self.tx)
            .await?;

        self.touch(account_id, Collection::Apartments);
        Ok(result.rows_affected() > 0)
    }

    /// Cascade used by apartment deletion; returns the number of dues removed.
    pub async fn delete_dues_for_apartment(
        &mut self,
        account_id: &str,
        apartment_id: &str,
    ) -> Result<u64> {
        let result = sqlx::query("DELETE FROM dues WHERE account_id = ? AND apartment_id = ?")
            .bind(account_id)
            .bind(apartment_id)
            .execute(&mut *self.tx)
            .await?;

        self.touch(account_id, Collection::Dues);
        Ok(result.rows_affected())
    }

    pub async fn insert_due(&mut self, due: &Due) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO dues (
                id, account_id, apartment_id, amount_usd, remaining_debt_usd,
                month, year, accrual_date, rate, is_paid, paid_amount_usd,
                payment_date, payment_rate, payment_amount_display
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&due.id)
        .bind(&due.account_id)
        .bind(&due.apartment_id)
        .bind(due.amount_usd)
        .bind(due.remaining_debt_usd)
        .bind(due.month)
        .bind(due.year)
        .bind(due.accrual_date)
        .bind(due.rate)
        .bind(due.is_paid)
        .bind(due.paid_amount_usd)
        .bind(due.payment_date)
        .bind(due.payment_rate)
        .bind(due.payment_amount_display)
        .execute(&mut *self.tx)
        .await?;

        self.touch(&due.account_id, Collection::Dues);
        Ok(())
    }

    /// Settle a due: zero the remainder, accumulate the paid total, stamp
    /// the payment metadata.
    pub async fn mark_due_paid(
        &mut self,
        account_id: &str,
        due_id: &str,
        payment: &DuePayment,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE dues
            SET is_paid = 1,
                remaining_debt_usd = 0,
                paid_amount_usd = paid_amount_usd + ?,
                payment_date = ?,
                payment_rate = ?,
                payment_amount_display = ?
            WHERE account_id = ? AND id = ?
            "#,
        )
        .bind(payment.amount_usd)
        .bind(payment.date)
        .bind(payment.rate)
        .bind(payment.amount_display)
        .bind(account_id)
        .bind(due_id)
        .execute(&mut *self.tx)
        .await?;

        self.touch(account_id, Collection::Dues);
        Ok(())
    }

    /// Adjust the budget balance by a signed delta, creating the singleton
    /// lazily. The increment form converges even when two writers race or
    /// when a prior existence check could not be made.
    pub async fn credit_budget(
        &mut self,
        account_id: &str,
        delta_usd: f64,
        now: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO budget (account_id, balance_usd, created_at, last_updated)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(account_id) DO UPDATE SET
                balance_usd = balance_usd + excluded.balance_usd,
                last_updated = excluded.last_updated
            "#,
        )
        .bind(account_id)
        .bind(delta_usd)
        .bind(now)
        .bind(now)
        .execute(&mut *self.tx)
        .await?;

        self.touch(account_id, Collection::Budget);
        Ok(())
    }

    /// Overwrite the balance outright. Reconciliation only; normal
    /// operations must use [`credit_budget`].
    pub async fn set_budget_balance(
        &mut self,
        account_id: &str,
        balance_usd: f64,
        now: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO budget (account_id, balance_usd, created_at, last_updated)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(account_id) DO UPDATE SET
                balance_usd = excluded.balance_usd,
                last_updated = excluded.last_updated
            "#,
        )
        .bind(account_id)
        .bind(balance_usd)
        .bind(now)
        .bind(now)
        .execute(&mut *self.tx)
        .await?;

        self.touch(account_id, Collection::Budget);
        Ok(())
    }

    /// Set the cached debt to an exact value. Reconciliation only.
    pub async fn set_apartment_debt(
        &mut self,
        account_id: &str,
        apartment_id: &str,
        debt_usd: f64,
    ) -> Result<()> {
        sqlx::query("UPDATE apartments SET current_debt_usd = ? WHERE account_id = ? AND id = ?")
            .bind(debt_usd)
            .bind(account_id)
            .bind(apartment_id)
            .execute(&mut *self.tx)
            .await?;

        self.touch(account_id, Collection::Apartments);
        Ok(())
    }

    pub async fn insert_ledger_entry(&mut self, entry: &LedgerEntry) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO ledger_entries (
                id, account_id, amount_usd, amount_display, entry_type,
                category, description, date, rate
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&entry.id)
        .bind(&entry.account_id)
        .bind(entry.amount_usd)
        .bind(entry.amount_display)
        .bind(entry.entry_type)
        .bind(entry.category)
        .bind(&entry.description)
        .bind(entry.date)
        .bind(entry.rate)
        .execute(&mut *self.tx)
        .await?;

        self.touch(&entry.account_id, Collection::LedgerEntries);
        Ok(())
    }

    pub async fn upsert_settings(&mut self, settings: &SiteSettings) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO settings (account_id, site_name, site_type, contact_info, last_updated)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(account_id) DO UPDATE SET
                site_name = excluded.site_name,
                site_type = excluded.site_type,
                contact_info = excluded.contact_info,
                last_updated = excluded.last_updated
            "#,
        )
        .bind(&settings.account_id)
        .bind(&settings.site_name)
        .bind(settings.site_type)
        .bind(&settings.contact_info)
        .bind(settings.last_updated)
        .execute(&mut *self.tx)
        .await?;

        self.touch(&settings.account_id, Collection::Settings);
        Ok(())
    }

    /// Commit every queued write, then announce the touched collections.
    /// On error nothing is visible and no events fire.
    pub async fn commit(self) -> Result<()> {
        self.tx.commit().await?;
        for (account_id, collection) in self.touched {
            self.changes.publish(&account_id, collection);
        }
        Ok(())
    }
}
