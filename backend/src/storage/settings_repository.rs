//! Read queries over the per-account settings singleton.

use anyhow::Result;

use crate::db::Db;
use crate::domain::models::SiteSettings;

#[derive(Clone)]
pub struct SettingsRepository {
    db: Db,
}

impl SettingsRepository {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub async fn get(&self, account_id: &str) -> Result<Option<SiteSettings>> {
        let settings =
            sqlx::query_as::<_, SiteSettings>("SELECT * FROM settings WHERE account_id = ?")
                .bind(account_id)
                .fetch_optional(self.db.pool())
                .await?;
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::SiteType;
    use chrono::Utc;

    #[tokio::test]
    async fn upsert_then_get_round_trips() {
        let db = Db::init_test().await.unwrap();
        let repo = SettingsRepository::new(db.clone());
        assert!(repo.get("acct").await.unwrap().is_none());

        let settings = SiteSettings {
            account_id: "acct".to_string(),
            site_name: "Maple Court".to_string(),
            site_type: SiteType::Site,
            contact_info: Some("manager@maplecourt.example".to_string()),
            last_updated: Utc::now(),
        };
        let mut batch = db.begin_batch().await.unwrap();
        batch.upsert_settings(&settings).await.unwrap();
        batch.commit().await.unwrap();

        let stored = repo.get("acct").await.unwrap().unwrap();
        assert_eq!(stored.site_name, "Maple Court");
        assert_eq!(stored.site_type, SiteType::Site);
    }
}
