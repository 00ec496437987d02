use anyhow::Result;
use sqlx::{migrate::MigrateDatabase, Sqlite, SqlitePool};
use std::sync::Arc;

use crate::storage::{ChangeFeed, WriteBatch};

/// Db manages the connection pool, the schema, and batch creation.
#[derive(Clone)]
pub struct Db {
    pool: Arc<SqlitePool>,
    changes: ChangeFeed,
}

impl Db {
    /// Open (creating if necessary) the database at the given url.
    pub async fn new(url: &str) -> Result<Self> {
        if !Sqlite::database_exists(url).await.unwrap_or(false) {
            Sqlite::create_database(url).await?;
        }

        let pool = SqlitePool::connect(url).await?;
        Self::setup_schema(&pool).await?;

        Ok(Self {
            pool: Arc::new(pool),
            changes: ChangeFeed::new(),
        })
    }

    /// Open a fresh in-memory database with a unique name, so concurrent
    /// tests never share state.
    #[cfg(test)]
    pub async fn init_test() -> Result<Self> {
        let test_id = uuid::Uuid::new_v4().to_string();
        let url = format!("file:memdb_{}?mode=memory&cache=shared", test_id);
        Self::new(&url).await
    }

    async fn setup_schema(pool: &SqlitePool) -> Result<()> {
        // One statement per execute; sqlite prepares a single statement at
        // a time.
        let statements = [
            r#"
            CREATE TABLE IF NOT EXISTS apartments (
                id TEXT PRIMARY KEY,
                account_id TEXT NOT NULL,
                block TEXT NOT NULL,
                number INTEGER NOT NULL,
                owner TEXT NOT NULL,
                current_debt_usd REAL NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            )
            "#,
            r#"
            CREATE INDEX IF NOT EXISTS idx_apartments_account
                ON apartments(account_id, block, number)
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS dues (
                id TEXT PRIMARY KEY,
                account_id TEXT NOT NULL,
                apartment_id TEXT NOT NULL,
                amount_usd REAL NOT NULL,
                remaining_debt_usd REAL NOT NULL,
                month INTEGER NOT NULL,
                year INTEGER NOT NULL,
                accrual_date TEXT NOT NULL,
                rate REAL NOT NULL,
                is_paid INTEGER NOT NULL DEFAULT 0,
                paid_amount_usd REAL NOT NULL DEFAULT 0,
                payment_date TEXT,
                payment_rate REAL,
                payment_amount_display REAL
            )
            "#,
            r#"
            CREATE INDEX IF NOT EXISTS idx_dues_period
                ON dues(account_id, year, month)
            "#,
            r#"
            CREATE INDEX IF NOT EXISTS idx_dues_apartment
                ON dues(account_id, apartment_id)
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS budget (
                account_id TEXT PRIMARY KEY,
                balance_usd REAL NOT NULL,
                created_at TEXT NOT NULL,
                last_updated TEXT NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS ledger_entries (
                id TEXT PRIMARY KEY,
                account_id TEXT NOT NULL,
                amount_usd REAL NOT NULL,
                amount_display REAL NOT NULL,
                entry_type TEXT NOT NULL,
                category TEXT NOT NULL,
                description TEXT NOT NULL,
                date TEXT NOT NULL,
                rate REAL NOT NULL
            )
            "#,
            r#"
            CREATE INDEX IF NOT EXISTS idx_entries_account_date
                ON ledger_entries(account_id, date DESC)
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS settings (
                account_id TEXT PRIMARY KEY,
                site_name TEXT NOT NULL,
                site_type TEXT NOT NULL,
                contact_info TEXT,
                last_updated TEXT NOT NULL
            )
            "#,
        ];

        for statement in statements {
            sqlx::query(statement).execute(pool).await?;
        }

        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn changes(&self) -> &ChangeFeed {
        &self.changes
    }

    /// Start an all-or-nothing write batch. Every mutation in the batch
    /// commits together or not at all; change events fire only on commit.
    pub async fn begin_batch(&self) -> Result<WriteBatch> {
        let tx = self.pool.begin().await?;
        Ok(WriteBatch::new(tx, self.changes.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn schema_bootstrap_is_idempotent() {
        let db = Db::init_test().await.expect("failed to create test db");
        Db::setup_schema(db.pool())
            .await
            .expect("re-running schema setup should succeed");
    }

    #[tokio::test]
    async fn change_events_fire_on_commit_but_not_on_rollback() {
        use crate::storage::{ChangeEvent, Collection};

        let db = Db::init_test().await.unwrap();
        let mut rx = db.changes().subscribe();

        // a dropped batch rolls back and must publish nothing
        let mut batch = db.begin_batch().await.unwrap();
        batch
            .credit_budget("acct", 5.0, chrono::Utc::now())
            .await
            .unwrap();
        drop(batch);
        assert!(rx.try_recv().is_err());

        let mut batch = db.begin_batch().await.unwrap();
        batch
            .credit_budget("acct", 5.0, chrono::Utc::now())
            .await
            .unwrap();
        batch.commit().await.unwrap();

        let event: ChangeEvent = rx.recv().await.unwrap();
        assert_eq!(event.account_id, "acct");
        assert_eq!(event.collection, Collection::Budget);
    }

    #[tokio::test]
    async fn separate_test_databases_do_not_share_state() {
        let db1 = Db::init_test().await.unwrap();
        let db2 = Db::init_test().await.unwrap();

        sqlx::query(
            "INSERT INTO settings (account_id, site_name, site_type, last_updated) VALUES (?, ?, ?, ?)",
        )
        .bind("acct")
        .bind("Maple Court")
        .bind("APARTMENT")
        .bind(chrono::Utc::now())
        .execute(db1.pool())
        .await
        .unwrap();

        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM settings")
            .fetch_one(db2.pool())
            .await
            .unwrap();
        assert_eq!(count.0, 0);
    }
}
