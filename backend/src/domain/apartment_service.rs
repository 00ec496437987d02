//! Apartment registry operations.

use chrono::Utc;
use shared::{ApartmentListResponse, ApartmentWithDues, CreateApartmentRequest, UpdateApartmentRequest};
use tracing::info;

use crate::db::Db;
use crate::domain::models::{Apartment, Due};
use crate::error::{DomainError, DomainResult};
use crate::storage::{ApartmentRepository, DueRepository};

#[derive(Clone)]
pub struct ApartmentService {
    db: Db,
    apartments: ApartmentRepository,
    dues: DueRepository,
}

impl ApartmentService {
    pub fn new(db: Db) -> Self {
        Self {
            apartments: ApartmentRepository::new(db.clone()),
            dues: DueRepository::new(db.clone()),
            db,
        }
    }

    fn validate_identity(
        block: &str,
        number: u32,
        owner: &str,
    ) -> DomainResult<(String, String)> {
        let block = block.trim().to_uppercase();
        if block.is_empty() {
            return Err(DomainError::Validation("block must not be empty".to_string()));
        }
        if number == 0 {
            return Err(DomainError::Validation(
                "unit number must be at least 1".to_string(),
            ));
        }
        let owner = owner.trim();
        if owner.is_empty() {
            return Err(DomainError::Validation(
                "owner name must not be empty".to_string(),
            ));
        }
        Ok((block, owner.to_string()))
    }

    pub async fn create_apartment(
        &self,
        account_id: &str,
        request: CreateApartmentRequest,
    ) -> DomainResult<Apartment> {
        let (block, owner) = Self::validate_identity(&request.block, request.number, &request.owner)?;
        if self
            .apartments
            .unit_taken(account_id, &block, request.number, None)
            .await?
        {
            return Err(DomainError::Validation(format!(
                "apartment {}-{} is already registered",
                block, request.number
            )));
        }

        let apartment = Apartment {
            id: Apartment::generate_id(),
            account_id: account_id.to_string(),
            block,
            number: request.number,
            owner,
            current_debt_usd: 0.0,
            created_at: Utc::now(),
        };

        let mut batch = self.db.begin_batch().await?;
        batch.insert_apartment(&apartment).await?;
        batch.commit().await?;

        info!(apartment = %apartment.label(), "registered apartment");
        Ok(apartment)
    }

    /// List apartments with their outstanding dues, ordered by block/number.
    pub async fn list_apartments(
        &self,
        account_id: &str,
        rate: Option<f64>,
    ) -> DomainResult<ApartmentListResponse> {
        let apartments = self.apartments.list(account_id).await?;
        let mut items = Vec::with_capacity(apartments.len());
        for apartment in apartments {
            let mut outstanding: Vec<shared::Due> = self
                .dues
                .outstanding_for_apartment(account_id, &apartment.id)
                .await?
                .iter()
                .map(Due::to_dto)
                .collect();
            // repository orders oldest first; display wants the newest on top
            outstanding.reverse();
            items.push(ApartmentWithDues {
                apartment: apartment.to_dto(rate),
                outstanding_dues: outstanding,
            });
        }
        Ok(ApartmentListResponse { apartments: items })
    }

    pub async fn update_apartment(
        &self,
        account_id: &str,
        apartment_id: &str,
        request: UpdateApartmentRequest,
    ) -> DomainResult<Apartment> {
        let (block, owner) = Self::validate_identity(&request.block, request.number, &request.owner)?;
        let existing = self
            .apartments
            .get(account_id, apartment_id)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("apartment {apartment_id} not found")))?;
        if self
            .apartments
            .unit_taken(account_id, &block, request.number, Some(apartment_id))
            .await?
        {
            return Err(DomainError::Validation(format!(
                "apartment {}-{} is already registered",
                block, request.number
            )));
        }

        let mut batch = self.db.begin_batch().await?;
        batch
            .update_apartment_identity(account_id, apartment_id, &block, request.number, &owner)
            .await?;
        batch.commit().await?;

        Ok(Apartment {
            block,
            number: request.number,
            owner,
            ..existing
        })
    }

    /// Delete an apartment and all its due records in one batch.
    pub async fn delete_apartment(
        &self,
        account_id: &str,
        apartment_id: &str,
        confirmed: bool,
    ) -> DomainResult<()> {
        let apartment = self
            .apartments
            .get(account_id, apartment_id)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("apartment {apartment_id} not found")))?;
        let dues = self.dues.list_for_apartment(account_id, apartment_id).await?;

        if !confirmed {
            return Err(DomainError::ConfirmationRequired(format!(
                "Delete apartment {} ({}) and its {} due record(s)?",
                apartment.label(),
                apartment.owner,
                dues.len()
            )));
        }

        let mut batch = self.db.begin_batch().await?;
        let removed_dues = batch.delete_dues_for_apartment(account_id, apartment_id).await?;
        batch.delete_apartment(account_id, apartment_id).await?;
        batch.commit().await?;

        info!(
            apartment = %apartment.label(),
            removed_dues,
            "deleted apartment"
        );
        Ok(())
    }
}
