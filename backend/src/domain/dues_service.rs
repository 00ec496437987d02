//! Dues accrual and collection.
//!
//! Every operation here moves money across several documents at once, so each
//! one validates up front, then executes a single write batch: the dues, the
//! apartment's cached debt, the budget balance, and the ledger all change
//! together or not at all.

use chrono::Utc;
use shared::{AccrueDuesRequest, AccrueDuesResponse, PayAllRequest, PayDueRequest, PaymentResponse};
use tracing::{info, warn};

use crate::db::Db;
use crate::domain::models::{
    period_label, Due, DuePayment, EntryCategory, EntryType, LedgerEntry, RateSnapshot,
};
use crate::error::{DomainError, DomainResult};
use crate::storage::{ApartmentRepository, DueRepository};

#[derive(Clone)]
pub struct DuesService {
    db: Db,
    apartments: ApartmentRepository,
    dues: DueRepository,
    display_currency: String,
}

impl DuesService {
    pub fn new(db: Db, display_currency: String) -> Self {
        Self {
            apartments: ApartmentRepository::new(db.clone()),
            dues: DueRepository::new(db.clone()),
            db,
            display_currency,
        }
    }

    /// Accrue one billing period's due against every registered apartment.
    pub async fn accrue(
        &self,
        account_id: &str,
        request: AccrueDuesRequest,
        rate: Option<RateSnapshot>,
    ) -> DomainResult<AccrueDuesResponse> {
        if !(1..=12).contains(&request.month) {
            return Err(DomainError::Validation(
                "month must be between 1 and 12".to_string(),
            ));
        }
        if request.amount_display <= 0.0 {
            return Err(DomainError::Validation(
                "due amount must be positive".to_string(),
            ));
        }
        let rate = rate.ok_or(DomainError::RateUnavailable)?;

        let apartments = self.apartments.list(account_id).await?;
        if apartments.is_empty() {
            return Err(DomainError::Validation(
                "no apartments are registered yet".to_string(),
            ));
        }

        let period = period_label(request.month, request.year);
        let existing = self
            .dues
            .list_for_period(account_id, request.month, request.year)
            .await?;
        if !existing.is_empty() {
            if !request.confirmed {
                return Err(DomainError::ConfirmationRequired(format!(
                    "{} due record(s) already exist for {}. Accrue again for the same period?",
                    existing.len(),
                    period
                )));
            }
            warn!(%period, existing = existing.len(), "re-accruing a period that already has dues");
        }

        let amount_usd = rate.display_to_usd(request.amount_display);
        let now = Utc::now();

        let mut batch = self.db.begin_batch().await?;
        for apartment in &apartments {
            let due = Due {
                id: Due::generate_id(),
                account_id: account_id.to_string(),
                apartment_id: apartment.id.clone(),
                amount_usd,
                remaining_debt_usd: amount_usd,
                month: request.month,
                year: request.year,
                accrual_date: now,
                rate: rate.rate,
                is_paid: false,
                paid_amount_usd: 0.0,
                payment_date: None,
                payment_rate: None,
                payment_amount_display: None,
            };
            batch.insert_due(&due).await?;
            batch
                .adjust_apartment_debt(account_id, &apartment.id, amount_usd)
                .await?;
        }
        batch.commit().await?;

        info!(
            %period,
            apartments = apartments.len(),
            amount_usd,
            "accrued dues"
        );
        Ok(AccrueDuesResponse {
            apartments_debited: apartments.len() as u32,
            amount_usd,
        })
    }

    /// Full due history for one apartment, newest period first.
    pub async fn history(
        &self,
        account_id: &str,
        apartment_id: &str,
    ) -> DomainResult<Vec<shared::Due>> {
        if self.apartments.get(account_id, apartment_id).await?.is_none() {
            return Err(DomainError::NotFound(format!(
                "apartment {apartment_id} not found"
            )));
        }
        let dues = self.dues.list_for_apartment(account_id, apartment_id).await?;
        Ok(dues.iter().map(Due::to_dto).collect())
    }

    /// Collect one outstanding due in full.
    pub async fn pay_due(
        &self,
        account_id: &str,
        due_id: &str,
        request: PayDueRequest,
        rate: Option<RateSnapshot>,
    ) -> DomainResult<PaymentResponse> {
        let rate = rate.ok_or(DomainError::RateUnavailable)?;
        let due = self
            .dues
            .get(account_id, due_id)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("due {due_id} not found")))?;
        if !due.is_outstanding() {
            return Err(DomainError::Validation(format!(
                "the due for {} is already settled",
                due.period_label()
            )));
        }
        let apartment = self
            .apartments
            .get(account_id, &due.apartment_id)
            .await?
            .ok_or_else(|| {
                DomainError::NotFound(format!("apartment {} not found", due.apartment_id))
            })?;

        let amount_usd = due.remaining_debt_usd;
        let amount_display = rate.usd_to_display(amount_usd);
        if !request.confirmed {
            return Err(DomainError::ConfirmationRequired(format!(
                "Collect {:.2} {} (${:.2}) from {} for {}?",
                amount_display,
                self.display_currency,
                amount_usd,
                apartment.label(),
                due.period_label()
            )));
        }

        let now = Utc::now();
        let payment = DuePayment {
            amount_usd,
            amount_display,
            date: now,
            rate: rate.rate,
        };
        let entry = LedgerEntry {
            id: LedgerEntry::generate_id(),
            account_id: account_id.to_string(),
            amount_usd,
            amount_display,
            entry_type: EntryType::Income,
            category: EntryCategory::Dues,
            description: format!("Dues payment - {} {}", apartment.label(), due.period_label()),
            date: now,
            rate: rate.rate,
        };

        let mut batch = self.db.begin_batch().await?;
        batch.mark_due_paid(account_id, &due.id, &payment).await?;
        batch
            .adjust_apartment_debt(account_id, &apartment.id, -amount_usd)
            .await?;
        batch.credit_budget(account_id, amount_usd, now).await?;
        batch.insert_ledger_entry(&entry).await?;
        batch.commit().await?;

        info!(
            apartment = %apartment.label(),
            period = %due.period_label(),
            amount_usd,
            "collected due"
        );
        Ok(PaymentResponse {
            amount_usd,
            amount_display,
            dues_settled: 1,
        })
    }

    /// Collect every outstanding due of one apartment in a single batch,
    /// recorded as one summarizing income entry.
    pub async fn pay_all(
        &self,
        account_id: &str,
        apartment_id: &str,
        request: PayAllRequest,
        rate: Option<RateSnapshot>,
    ) -> DomainResult<PaymentResponse> {
        let rate = rate.ok_or(DomainError::RateUnavailable)?;
        let apartment = self
            .apartments
            .get(account_id, apartment_id)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("apartment {apartment_id} not found")))?;

        let outstanding = self
            .dues
            .outstanding_for_apartment(account_id, apartment_id)
            .await?;
        if outstanding.is_empty() {
            return Err(DomainError::Validation(format!(
                "apartment {} has no outstanding dues",
                apartment.label()
            )));
        }

        // The total is always derived from the stored dues; a caller-supplied
        // figure is only cross-checked, never trusted.
        let total_usd: f64 = outstanding.iter().map(|d| d.remaining_debt_usd).sum();
        if let Some(claimed) = request.total_usd {
            if (claimed - total_usd).abs() > 0.01 {
                return Err(DomainError::Validation(format!(
                    "supplied total ${claimed:.2} does not match the outstanding dues total ${total_usd:.2}"
                )));
            }
        }

        let total_display = rate.usd_to_display(total_usd);
        if !request.confirmed {
            return Err(DomainError::ConfirmationRequired(format!(
                "Collect all outstanding dues from {}: {:.2} {} (${:.2}) across {} period(s)?",
                apartment.label(),
                total_display,
                self.display_currency,
                total_usd,
                outstanding.len()
            )));
        }

        let now = Utc::now();
        let entry = LedgerEntry {
            id: LedgerEntry::generate_id(),
            account_id: account_id.to_string(),
            amount_usd: total_usd,
            amount_display: total_display,
            entry_type: EntryType::Income,
            category: EntryCategory::Dues,
            description: format!(
                "Dues payment - {} ({} periods)",
                apartment.label(),
                outstanding.len()
            ),
            date: now,
            rate: rate.rate,
        };

        let mut batch = self.db.begin_batch().await?;
        for due in &outstanding {
            let payment = DuePayment {
                amount_usd: due.remaining_debt_usd,
                amount_display: rate.usd_to_display(due.remaining_debt_usd),
                date: now,
                rate: rate.rate,
            };
            batch.mark_due_paid(account_id, &due.id, &payment).await?;
        }
        batch.zero_apartment_debt(account_id, apartment_id).await?;
        batch.credit_budget(account_id, total_usd, now).await?;
        batch.insert_ledger_entry(&entry).await?;
        batch.commit().await?;

        info!(
            apartment = %apartment.label(),
            dues = outstanding.len(),
            total_usd,
            "collected all outstanding dues"
        );
        Ok(PaymentResponse {
            amount_usd: total_usd,
            amount_display: total_display,
            dues_settled: outstanding.len() as u32,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ApartmentService;
    use crate::storage::BudgetRepository;
    use shared::CreateApartmentRequest;

    fn rate() -> Option<RateSnapshot> {
        Some(RateSnapshot {
            rate: 32.0,
            fetched_at: Utc::now(),
            is_fallback: false,
        })
    }

    fn accrue_request(month: u32, year: i32, amount_display: f64) -> AccrueDuesRequest {
        AccrueDuesRequest {
            month,
            year,
            amount_display,
            confirmed: false,
        }
    }

    async fn setup(unit_count: u32) -> (DuesService, Db, Vec<String>) {
        let db = Db::init_test().await.unwrap();
        let apartments = ApartmentService::new(db.clone());
        let mut ids = Vec::new();
        for number in 1..=unit_count {
            let apartment = apartments
                .create_apartment(
                    "acct",
                    CreateApartmentRequest {
                        block: "A".to_string(),
                        number,
                        owner: format!("Owner {number}"),
                    },
                )
                .await
                .unwrap();
            ids.push(apartment.id);
        }
        (DuesService::new(db.clone(), "TRY".to_string()), db, ids)
    }

    async fn debt_of(db: &Db, apartment_id: &str) -> f64 {
        ApartmentRepository::new(db.clone())
            .get("acct", apartment_id)
            .await
            .unwrap()
            .unwrap()
            .current_debt_usd
    }

    async fn assert_debts_match_dues(db: &Db, apartment_ids: &[String]) {
        let dues = DueRepository::new(db.clone());
        for id in apartment_ids {
            let cached = debt_of(db, id).await;
            let truth = dues.outstanding_total_for_apartment("acct", id).await.unwrap();
            assert!(
                (cached - truth).abs() < 1e-9,
                "apartment {id}: cached debt {cached} != dues total {truth}"
            );
        }
    }

    #[tokio::test]
    async fn accrual_converts_and_debits_every_apartment() {
        let (service, db, ids) = setup(3).await;

        let response = service
            .accrue("acct", accrue_request(3, 2026, 1000.0), rate())
            .await
            .unwrap();
        assert_eq!(response.apartments_debited, 3);
        assert_eq!(response.amount_usd, 31.25);

        let dues = DueRepository::new(db.clone());
        for id in &ids {
            let apartment_dues = dues.list_for_apartment("acct", id).await.unwrap();
            assert_eq!(apartment_dues.len(), 1);
            assert_eq!(apartment_dues[0].amount_usd, 31.25);
            assert_eq!(apartment_dues[0].remaining_debt_usd, 31.25);
            assert!(!apartment_dues[0].is_paid);
            assert_eq!(debt_of(&db, id).await, 31.25);
        }
        assert_debts_match_dues(&db, &ids).await;
    }

    #[tokio::test]
    async fn accrual_rejects_bad_input_before_writing() {
        let (service, db, ids) = setup(1).await;

        let err = service
            .accrue("acct", accrue_request(13, 2026, 1000.0), rate())
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));

        let err = service
            .accrue("acct", accrue_request(3, 2026, 0.0), rate())
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));

        let err = service
            .accrue("acct", accrue_request(3, 2026, 1000.0), None)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::RateUnavailable));

        assert_eq!(debt_of(&db, &ids[0]).await, 0.0);
    }

    #[tokio::test]
    async fn accrual_with_no_apartments_is_rejected() {
        let (service, _db, _ids) = setup(0).await;
        let err = service
            .accrue("acct", accrue_request(3, 2026, 1000.0), rate())
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[tokio::test]
    async fn duplicate_period_warns_then_allows_when_confirmed() {
        let (service, db, ids) = setup(2).await;
        service
            .accrue("acct", accrue_request(3, 2026, 1000.0), rate())
            .await
            .unwrap();

        let err = service
            .accrue("acct", accrue_request(3, 2026, 1000.0), rate())
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::ConfirmationRequired(_)));

        let mut confirmed = accrue_request(3, 2026, 1000.0);
        confirmed.confirmed = true;
        service.accrue("acct", confirmed, rate()).await.unwrap();

        assert_eq!(debt_of(&db, &ids[0]).await, 62.5);
        assert_debts_match_dues(&db, &ids).await;
    }

    #[tokio::test]
    async fn paying_a_due_settles_it_and_credits_the_budget() {
        let (service, db, ids) = setup(1).await;
        service
            .accrue("acct", accrue_request(3, 2026, 1000.0), rate())
            .await
            .unwrap();
        let dues = DueRepository::new(db.clone());
        let due = dues.list_for_apartment("acct", &ids[0]).await.unwrap().remove(0);

        let err = service
            .pay_due("acct", &due.id, PayDueRequest { confirmed: false }, rate())
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::ConfirmationRequired(_)));

        let response = service
            .pay_due("acct", &due.id, PayDueRequest { confirmed: true }, rate())
            .await
            .unwrap();
        assert_eq!(response.amount_usd, 31.25);
        assert_eq!(response.amount_display, 1000.0);
        assert_eq!(response.dues_settled, 1);

        let paid = dues.get("acct", &due.id).await.unwrap().unwrap();
        assert!(paid.is_paid);
        assert_eq!(paid.remaining_debt_usd, 0.0);
        assert_eq!(paid.paid_amount_usd, 31.25);
        assert!(paid.payment_date.is_some());
        assert_eq!(debt_of(&db, &ids[0]).await, 0.0);

        let budget = BudgetRepository::new(db.clone());
        assert_eq!(budget.get_budget("acct").await.unwrap().unwrap().balance_usd, 31.25);
        let entries = budget.list_entries("acct", 10, 0).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].entry_type, EntryType::Income);
        assert_eq!(entries[0].category, EntryCategory::Dues);
        assert_eq!(entries[0].amount_usd, 31.25);
        assert_eq!(
            budget.signed_entry_sum("acct").await.unwrap(),
            budget.get_budget("acct").await.unwrap().unwrap().balance_usd
        );
        assert_debts_match_dues(&db, &ids).await;
    }

    #[tokio::test]
    async fn paying_a_settled_due_is_rejected() {
        let (service, db, ids) = setup(1).await;
        service
            .accrue("acct", accrue_request(3, 2026, 1000.0), rate())
            .await
            .unwrap();
        let dues = DueRepository::new(db.clone());
        let due = dues.list_for_apartment("acct", &ids[0]).await.unwrap().remove(0);
        service
            .pay_due("acct", &due.id, PayDueRequest { confirmed: true }, rate())
            .await
            .unwrap();

        let err = service
            .pay_due("acct", &due.id, PayDueRequest { confirmed: true }, rate())
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));

        // no double credit
        let budget = BudgetRepository::new(db);
        assert_eq!(budget.get_budget("acct").await.unwrap().unwrap().balance_usd, 31.25);
    }

    #[tokio::test]
    async fn pay_all_clears_every_period_with_one_ledger_entry() {
        let (service, db, ids) = setup(1).await;
        for month in 1..=3 {
            let mut request = accrue_request(month, 2026, 1000.0);
            request.confirmed = true;
            service.accrue("acct", request, rate()).await.unwrap();
        }
        assert_eq!(debt_of(&db, &ids[0]).await, 93.75);

        let err = service
            .pay_all(
                "acct",
                &ids[0],
                PayAllRequest { total_usd: None, confirmed: false },
                rate(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::ConfirmationRequired(_)));

        let response = service
            .pay_all(
                "acct",
                &ids[0],
                PayAllRequest { total_usd: Some(93.75), confirmed: true },
                rate(),
            )
            .await
            .unwrap();
        assert_eq!(response.amount_usd, 93.75);
        assert_eq!(response.dues_settled, 3);

        assert_eq!(debt_of(&db, &ids[0]).await, 0.0);
        let dues = DueRepository::new(db.clone());
        assert!(dues
            .outstanding_for_apartment("acct", &ids[0])
            .await
            .unwrap()
            .is_empty());

        let budget = BudgetRepository::new(db.clone());
        assert_eq!(budget.get_budget("acct").await.unwrap().unwrap().balance_usd, 93.75);
        assert_eq!(budget.count_entries("acct").await.unwrap(), 1);
        assert_debts_match_dues(&db, &ids).await;
    }

    #[tokio::test]
    async fn pay_all_rejects_a_mismatched_caller_total() {
        let (service, db, ids) = setup(1).await;
        service
            .accrue("acct", accrue_request(3, 2026, 1000.0), rate())
            .await
            .unwrap();

        let err = service
            .pay_all(
                "acct",
                &ids[0],
                PayAllRequest { total_usd: Some(50.0), confirmed: true },
                rate(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));

        // nothing was collected
        assert_eq!(debt_of(&db, &ids[0]).await, 31.25);
        assert!(BudgetRepository::new(db)
            .get_budget("acct")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn pay_all_with_nothing_outstanding_is_rejected() {
        let (service, _db, ids) = setup(1).await;
        let err = service
            .pay_all(
                "acct",
                &ids[0],
                PayAllRequest { total_usd: None, confirmed: true },
                rate(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[tokio::test]
    async fn failed_batch_leaves_no_partial_state() {
        let (service, db, ids) = setup(1).await;
        service
            .accrue("acct", accrue_request(3, 2026, 1000.0), rate())
            .await
            .unwrap();

        // Simulate a mid-batch failure: a duplicate primary key on the third
        // write aborts the batch, and the debit from the first write must not
        // survive.
        let dues = DueRepository::new(db.clone());
        let existing = dues.list_for_apartment("acct", &ids[0]).await.unwrap().remove(0);
        let mut batch = db.begin_batch().await.unwrap();
        batch
            .adjust_apartment_debt("acct", &ids[0], 100.0)
            .await
            .unwrap();
        let duplicate = Due {
            id: existing.id.clone(),
            ..existing
        };
        assert!(batch.insert_due(&duplicate).await.is_err());
        drop(batch);

        assert_eq!(debt_of(&db, &ids[0]).await, 31.25);
        assert_debts_match_dues(&db, &ids).await;
    }
}
