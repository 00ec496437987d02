//! Read-only share projection for a single apartment.
//!
//! This is the page behind a shared link: no account header, no mutations,
//! just the apartment's outstanding debt and the site's recent activity.

use shared::ShareViewResponse;
use tracing::warn;

use crate::db::Db;
use crate::domain::models::{Due, LedgerEntry};
use crate::error::{DomainError, DomainResult};
use crate::storage::{ApartmentRepository, BudgetRepository, DueRepository, SettingsRepository};

const RECENT_ENTRY_COUNT: u32 = 10;

#[derive(Clone)]
pub struct ShareService {
    apartments: ApartmentRepository,
    dues: DueRepository,
    budget: BudgetRepository,
    settings: SettingsRepository,
}

impl ShareService {
    pub fn new(db: Db) -> Self {
        Self {
            apartments: ApartmentRepository::new(db.clone()),
            dues: DueRepository::new(db.clone()),
            budget: BudgetRepository::new(db.clone()),
            settings: SettingsRepository::new(db),
        }
    }

    pub async fn view(
        &self,
        account_id: &str,
        apartment_id: &str,
        rate: Option<f64>,
    ) -> DomainResult<ShareViewResponse> {
        let apartment = self
            .apartments
            .get(account_id, apartment_id)
            .await?
            .ok_or_else(|| DomainError::NotFound("apartment not found".to_string()))?;

        // settings are cosmetic here; a read failure degrades to no header
        let site = match self.settings.get(account_id).await {
            Ok(settings) => settings.map(|s| s.to_dto()),
            Err(e) => {
                warn!("settings lookup failed for share view: {e:#}");
                None
            }
        };

        let outstanding = self
            .dues
            .outstanding_for_apartment(account_id, apartment_id)
            .await?;
        let total_debt_usd: f64 = outstanding.iter().map(|d| d.remaining_debt_usd).sum();

        let recent = self
            .budget
            .list_entries(account_id, RECENT_ENTRY_COUNT, 0)
            .await?;

        Ok(ShareViewResponse {
            apartment: apartment.to_dto(rate),
            site,
            outstanding_dues: outstanding.iter().map(Due::to_dto).collect(),
            total_debt_usd,
            total_debt_display: rate.map(|r| total_debt_usd * r),
            recent_entries: recent.iter().map(LedgerEntry::to_dto).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::RateSnapshot;
    use crate::domain::{ApartmentService, BudgetService, DuesService, SettingsService};
    use chrono::Utc;
    use shared::{AccrueDuesRequest, CreateApartmentRequest, PayDueRequest, UpdateSettingsRequest};

    fn rate() -> Option<RateSnapshot> {
        Some(RateSnapshot {
            rate: 32.0,
            fetched_at: Utc::now(),
            is_fallback: false,
        })
    }

    async fn setup() -> (ShareService, DuesService, Db, String) {
        let db = Db::init_test().await.unwrap();
        let apartment = ApartmentService::new(db.clone())
            .create_apartment(
                "acct",
                CreateApartmentRequest {
                    block: "A".to_string(),
                    number: 5,
                    owner: "Ayşe Demir".to_string(),
                },
            )
            .await
            .unwrap();
        (
            ShareService::new(db.clone()),
            DuesService::new(db.clone(), "TRY".to_string()),
            db,
            apartment.id,
        )
    }

    #[tokio::test]
    async fn unknown_apartment_is_not_found() {
        let (service, _dues, _db, _id) = setup().await;
        let err = service
            .view("acct", "apt-missing", Some(32.0))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));
    }

    #[tokio::test]
    async fn view_tolerates_missing_settings() {
        let (service, _dues, _db, id) = setup().await;
        let view = service.view("acct", &id, Some(32.0)).await.unwrap();
        assert!(view.site.is_none());
        assert_eq!(view.total_debt_usd, 0.0);
        assert!(view.outstanding_dues.is_empty());
    }

    #[tokio::test]
    async fn settled_dues_are_excluded_from_list_and_total() {
        let (service, dues, db, id) = setup().await;
        for month in [1, 2] {
            dues.accrue(
                "acct",
                AccrueDuesRequest {
                    month,
                    year: 2026,
                    amount_display: 1000.0,
                    confirmed: true,
                },
                rate(),
            )
            .await
            .unwrap();
        }
        let january = DueRepository::new(db.clone())
            .list_for_period("acct", 1, 2026)
            .await
            .unwrap()
            .remove(0);
        dues.pay_due("acct", &january.id, PayDueRequest { confirmed: true }, rate())
            .await
            .unwrap();

        let view = service.view("acct", &id, Some(32.0)).await.unwrap();
        assert_eq!(view.outstanding_dues.len(), 1);
        assert_eq!(view.outstanding_dues[0].month, 2);
        assert_eq!(view.total_debt_usd, 31.25);
        assert_eq!(view.total_debt_display, Some(1000.0));
        // the payment shows up in recent activity
        assert_eq!(view.recent_entries.len(), 1);
    }

    #[tokio::test]
    async fn view_carries_site_settings_when_present() {
        let (service, _dues, db, id) = setup().await;
        SettingsService::new(db)
            .update(
                "acct",
                UpdateSettingsRequest {
                    site_name: "Maple Court".to_string(),
                    site_type: shared::SiteType::Site,
                    contact_info: None,
                },
            )
            .await
            .unwrap();

        let view = service.view("acct", &id, None).await.unwrap();
        assert_eq!(view.site.unwrap().site_name, "Maple Court");
        // no rate known: display conversions are absent, USD figures remain
        assert!(view.total_debt_display.is_none());
        assert!(view.apartment.current_debt_display.is_none());
    }

    #[tokio::test]
    async fn recent_entries_are_capped() {
        let (service, _dues, db, id) = setup().await;
        let budget = BudgetService::new(db);
        for i in 0..12 {
            budget
                .create_entry(
                    "acct",
                    shared::CreateLedgerEntryRequest {
                        entry_type: shared::EntryType::Income,
                        category: shared::EntryCategory::Other,
                        amount_display: 100.0 + i as f64,
                        description: format!("entry {i}"),
                        confirmed: false,
                    },
                    rate(),
                )
                .await
                .unwrap();
        }
        let view = service.view("acct", &id, Some(32.0)).await.unwrap();
        assert_eq!(view.recent_entries.len(), 10);
    }
}
