//! Shared budget ledger operations.

use chrono::Utc;
use shared::{
    BudgetSummary, CreateLedgerEntryRequest, CreateLedgerEntryResponse, LedgerEntryListResponse,
    ReconcileResponse,
};
use tracing::{info, warn};

use crate::db::Db;
use crate::domain::models::{EntryType, LedgerEntry, RateSnapshot};
use crate::error::{DomainError, DomainResult};
use crate::storage::{ApartmentRepository, BudgetRepository, DueRepository};

/// Drift below this is float noise, not corruption.
const DRIFT_TOLERANCE_USD: f64 = 0.01;

#[derive(Clone)]
pub struct BudgetService {
    db: Db,
    budget: BudgetRepository,
    apartments: ApartmentRepository,
    dues: DueRepository,
}

impl BudgetService {
    pub fn new(db: Db) -> Self {
        Self {
            budget: BudgetRepository::new(db.clone()),
            apartments: ApartmentRepository::new(db.clone()),
            dues: DueRepository::new(db.clone()),
            db,
        }
    }

    /// Record a manual income/expense entry and adjust the balance in the
    /// same batch.
    pub async fn create_entry(
        &self,
        account_id: &str,
        request: CreateLedgerEntryRequest,
        rate: Option<RateSnapshot>,
    ) -> DomainResult<CreateLedgerEntryResponse> {
        if request.amount_display <= 0.0 {
            return Err(DomainError::Validation(
                "amount must be positive".to_string(),
            ));
        }
        let description = request.description.trim();
        if description.is_empty() {
            return Err(DomainError::Validation(
                "description must not be empty".to_string(),
            ));
        }
        let rate = rate.ok_or(DomainError::RateUnavailable)?;

        let amount_usd = rate.display_to_usd(request.amount_display);
        let entry_type = EntryType::from(request.entry_type);
        let signed = entry_type.sign() * amount_usd;

        let balance = self
            .budget
            .get_budget(account_id)
            .await?
            .map(|b| b.balance_usd)
            .unwrap_or(0.0);
        let projected = balance + signed;
        if entry_type == EntryType::Expense && projected < 0.0 && !request.confirmed {
            return Err(DomainError::ConfirmationRequired(format!(
                "This expense overdraws the budget: balance ${balance:.2}, expense ${amount_usd:.2}, projected ${projected:.2}. Record it anyway?"
            )));
        }

        let now = Utc::now();
        let entry = LedgerEntry {
            id: LedgerEntry::generate_id(),
            account_id: account_id.to_string(),
            amount_usd,
            amount_display: request.amount_display,
            entry_type,
            category: request.category.into(),
            description: description.to_string(),
            date: now,
            rate: rate.rate,
        };

        let mut batch = self.db.begin_batch().await?;
        batch.insert_ledger_entry(&entry).await?;
        batch.credit_budget(account_id, signed, now).await?;
        batch.commit().await?;

        // re-read after commit: the stored balance may differ from the
        // pre-read projection when another writer raced this entry
        let new_balance_usd = self
            .budget
            .get_budget(account_id)
            .await?
            .map(|b| b.balance_usd)
            .unwrap_or(projected);

        info!(
            entry_type = ?entry.entry_type,
            category = ?entry.category,
            amount_usd,
            "recorded ledger entry"
        );
        Ok(CreateLedgerEntryResponse {
            entry: entry.to_dto(),
            new_balance_usd,
        })
    }

    pub async fn list_entries(
        &self,
        account_id: &str,
        limit: u32,
        offset: u32,
    ) -> DomainResult<LedgerEntryListResponse> {
        let entries = self.budget.list_entries(account_id, limit, offset).await?;
        let total = self.budget.count_entries(account_id).await?;
        Ok(LedgerEntryListResponse {
            entries: entries.iter().map(LedgerEntry::to_dto).collect(),
            total: total as u32,
        })
    }

    pub async fn summary(&self, account_id: &str, rate: Option<f64>) -> DomainResult<BudgetSummary> {
        let summary = match self.budget.get_budget(account_id).await? {
            Some(budget) => budget.to_dto(rate),
            None => BudgetSummary {
                balance_usd: 0.0,
                balance_display: rate.map(|_| 0.0),
                last_updated: None,
            },
        };
        Ok(summary)
    }

    /// Repair drift between the denormalized balances and their ledgers.
    /// The ledgers are the truth; the cached figures are rewritten to match.
    pub async fn reconcile(&self, account_id: &str) -> DomainResult<ReconcileResponse> {
        let ledger_sum = self.budget.signed_entry_sum(account_id).await?;
        let balance = self
            .budget
            .get_budget(account_id)
            .await?
            .map(|b| b.balance_usd)
            .unwrap_or(0.0);
        let budget_repaired = (balance - ledger_sum).abs() > DRIFT_TOLERANCE_USD;

        let mut apartment_repairs = Vec::new();
        for apartment in self.apartments.list(account_id).await? {
            let expected = self
                .dues
                .outstanding_total_for_apartment(account_id, &apartment.id)
                .await?;
            if (apartment.current_debt_usd - expected).abs() > DRIFT_TOLERANCE_USD {
                warn!(
                    apartment = %apartment.label(),
                    cached = apartment.current_debt_usd,
                    expected,
                    "apartment debt drifted from its dues"
                );
                apartment_repairs.push((apartment.id.clone(), expected));
            }
        }

        if budget_repaired || !apartment_repairs.is_empty() {
            let now = Utc::now();
            let mut batch = self.db.begin_batch().await?;
            if budget_repaired {
                warn!(balance, ledger_sum, "budget balance drifted from the ledger");
                batch.set_budget_balance(account_id, ledger_sum, now).await?;
            }
            for (apartment_id, expected) in &apartment_repairs {
                batch
                    .set_apartment_debt(account_id, apartment_id, *expected)
                    .await?;
            }
            batch.commit().await?;
        }

        Ok(ReconcileResponse {
            budget_balance_usd: balance,
            ledger_sum_usd: ledger_sum,
            budget_repaired,
            apartments_repaired: apartment_repairs.into_iter().map(|(id, _)| id).collect(),
        })
    }
}
