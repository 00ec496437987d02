//! Per-account site settings.

use chrono::Utc;
use shared::UpdateSettingsRequest;
use tracing::info;

use crate::db::Db;
use crate::domain::models::SiteSettings;
use crate::error::{DomainError, DomainResult};
use crate::storage::SettingsRepository;

#[derive(Clone)]
pub struct SettingsService {
    db: Db,
    settings: SettingsRepository,
}

impl SettingsService {
    pub fn new(db: Db) -> Self {
        Self {
            settings: SettingsRepository::new(db.clone()),
            db,
        }
    }

    /// None until the operator has saved settings for the account.
    pub async fn get(&self, account_id: &str) -> DomainResult<Option<SiteSettings>> {
        Ok(self.settings.get(account_id).await?)
    }

    pub async fn update(
        &self,
        account_id: &str,
        request: UpdateSettingsRequest,
    ) -> DomainResult<SiteSettings> {
        let site_name = request.site_name.trim();
        if site_name.is_empty() {
            return Err(DomainError::Validation(
                "site name must not be empty".to_string(),
            ));
        }

        let settings = SiteSettings {
            account_id: account_id.to_string(),
            site_name: site_name.to_string(),
            site_type: request.site_type.into(),
            contact_info: request
                .contact_info
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty()),
            last_updated: Utc::now(),
        };

        let mut batch = self.db.begin_batch().await?;
        batch.upsert_settings(&settings).await?;
        batch.commit().await?;

        info!(site_name = %settings.site_name, "updated site settings");
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::SiteType;

    #[tokio::test]
    async fn update_trims_and_round_trips() {
        let db = Db::init_test().await.unwrap();
        let service = SettingsService::new(db);
        assert!(service.get("acct").await.unwrap().is_none());

        let saved = service
            .update(
                "acct",
                UpdateSettingsRequest {
                    site_name: "  Maple Court  ".to_string(),
                    site_type: shared::SiteType::Site,
                    contact_info: Some("  ".to_string()),
                },
            )
            .await
            .unwrap();
        assert_eq!(saved.site_name, "Maple Court");
        assert_eq!(saved.site_type, SiteType::Site);
        assert!(saved.contact_info.is_none());

        let stored = service.get("acct").await.unwrap().unwrap();
        assert_eq!(stored.site_name, "Maple Court");
    }

    #[tokio::test]
    async fn update_rejects_blank_site_name() {
        let db = Db::init_test().await.unwrap();
        let service = SettingsService::new(db);
        let err = service
            .update(
                "acct",
                UpdateSettingsRequest {
                    site_name: " ".to_string(),
                    site_type: shared::SiteType::Apartment,
                    contact_info: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[tokio::test]
    async fn second_update_replaces_the_singleton() {
        let db = Db::init_test().await.unwrap();
        let service = SettingsService::new(db);
        for name in ["First", "Second"] {
            service
                .update(
                    "acct",
                    UpdateSettingsRequest {
                        site_name: name.to_string(),
                        site_type: shared::SiteType::Apartment,
                        contact_info: None,
                    },
                )
                .await
                .unwrap();
        }
        assert_eq!(service.get("acct").await.unwrap().unwrap().site_name, "Second");
    }
}
