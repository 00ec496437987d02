use axum::{
    extract::{FromRequestParts, Path, Query, State},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use shared::{
    AccrueDuesRequest, CreateApartmentRequest, CreateLedgerEntryRequest, ErrorResponse,
    PayAllRequest, PayDueRequest, UpdateApartmentRequest, UpdateSettingsRequest,
};
use tracing::info;

use crate::config::Config;
use crate::db::Db;
use crate::domain::{
    ApartmentService, BudgetService, DuesService, RateService, SettingsService, ShareService,
};
use crate::error::DomainError;

/// Application state carrying every domain service.
#[derive(Clone)]
pub struct AppState {
    pub apartments: ApartmentService,
    pub dues: DuesService,
    pub budget: BudgetService,
    pub settings: SettingsService,
    pub share: ShareService,
    pub rate: RateService,
}

impl AppState {
    pub fn new(db: Db, config: &Config) -> Self {
        Self {
            apartments: ApartmentService::new(db.clone()),
            dues: DuesService::new(db.clone(), config.display_currency.clone()),
            budget: BudgetService::new(db.clone()),
            settings: SettingsService::new(db.clone()),
            share: ShareService::new(db),
            rate: RateService::new(config),
        }
    }
}

/// Everything under /api except the rate endpoints belongs to one account,
/// named by the `X-Account-Id` header. The share view takes the account from
/// its path instead and needs no header.
pub struct AccountId(pub String);

#[axum::async_trait]
impl<S> FromRequestParts<S> for AccountId
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get("x-account-id")
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(|value| AccountId(value.to_string()))
            .ok_or_else(|| {
                let body = ErrorResponse {
                    error: "missing X-Account-Id header".to_string(),
                    confirmation: None,
                };
                (StatusCode::UNAUTHORIZED, Json(body)).into_response()
            })
    }
}

impl IntoResponse for DomainError {
    fn into_response(self) -> Response {
        let (status, confirmation) = match &self {
            DomainError::Validation(_) => (StatusCode::BAD_REQUEST, None),
            DomainError::NotFound(_) => (StatusCode::NOT_FOUND, None),
            DomainError::ConfirmationRequired(question) => {
                (StatusCode::CONFLICT, Some(question.clone()))
            }
            DomainError::RateUnavailable => (StatusCode::UNPROCESSABLE_ENTITY, None),
            DomainError::Storage(e) => {
                tracing::error!("storage failure: {e:#}");
                let body = ErrorResponse {
                    error: "internal error".to_string(),
                    confirmation: None,
                };
                return (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response();
            }
        };
        let body = ErrorResponse {
            error: self.to_string(),
            confirmation,
        };
        (status, Json(body)).into_response()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/apartments", get(list_apartments).post(create_apartment))
        .route(
            "/api/apartments/:apartment_id",
            put(update_apartment).delete(delete_apartment),
        )
        .route("/api/apartments/:apartment_id/dues", get(list_apartment_dues))
        .route("/api/apartments/:apartment_id/pay-all", post(pay_all))
        .route("/api/dues/accrue", post(accrue_dues))
        .route("/api/dues/:due_id/pay", post(pay_due))
        .route("/api/budget", get(get_budget))
        .route("/api/budget/entries", get(list_entries).post(create_entry))
        .route("/api/settings", get(get_settings).put(update_settings))
        .route("/api/rate", get(get_rate))
        .route("/api/rate/refresh", post(refresh_rate))
        .route("/api/reconcile", post(reconcile))
        .route("/view/:account_id/:apartment_id", get(share_view))
        .with_state(state)
}

/// Axum handler for GET /api/apartments
pub async fn list_apartments(
    State(state): State<AppState>,
    AccountId(account_id): AccountId,
) -> impl IntoResponse {
    info!("GET /api/apartments");
    let rate = state.rate.current_rate().await;
    match state.apartments.list_apartments(&account_id, rate).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Axum handler for POST /api/apartments
pub async fn create_apartment(
    State(state): State<AppState>,
    AccountId(account_id): AccountId,
    Json(request): Json<CreateApartmentRequest>,
) -> impl IntoResponse {
    info!("POST /api/apartments - request: {:?}", request);
    let rate = state.rate.current_rate().await;
    match state.apartments.create_apartment(&account_id, request).await {
        Ok(apartment) => (StatusCode::CREATED, Json(apartment.to_dto(rate))).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Axum handler for PUT /api/apartments/:apartment_id
pub async fn update_apartment(
    State(state): State<AppState>,
    AccountId(account_id): AccountId,
    Path(apartment_id): Path<String>,
    Json(request): Json<UpdateApartmentRequest>,
) -> impl IntoResponse {
    info!("PUT /api/apartments/{apartment_id} - request: {:?}", request);
    let rate = state.rate.current_rate().await;
    match state
        .apartments
        .update_apartment(&account_id, &apartment_id, request)
        .await
    {
        Ok(apartment) => (StatusCode::OK, Json(apartment.to_dto(rate))).into_response(),
        Err(e) => e.into_response(),
    }
}

#[derive(Deserialize, Debug)]
pub struct ConfirmQuery {
    #[serde(default)]
    pub confirmed: bool,
}

/// Axum handler for DELETE /api/apartments/:apartment_id
pub async fn delete_apartment(
    State(state): State<AppState>,
    AccountId(account_id): AccountId,
    Path(apartment_id): Path<String>,
    Query(query): Query<ConfirmQuery>,
) -> impl IntoResponse {
    info!("DELETE /api/apartments/{apartment_id} - confirmed: {}", query.confirmed);
    match state
        .apartments
        .delete_apartment(&account_id, &apartment_id, query.confirmed)
        .await
    {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => e.into_response(),
    }
}

/// Axum handler for GET /api/apartments/:apartment_id/dues
pub async fn list_apartment_dues(
    State(state): State<AppState>,
    AccountId(account_id): AccountId,
    Path(apartment_id): Path<String>,
) -> impl IntoResponse {
    info!("GET /api/apartments/{apartment_id}/dues");
    match state.dues.history(&account_id, &apartment_id).await {
        Ok(dues) => (StatusCode::OK, Json(dues)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Axum handler for POST /api/dues/accrue
pub async fn accrue_dues(
    State(state): State<AppState>,
    AccountId(account_id): AccountId,
    Json(request): Json<AccrueDuesRequest>,
) -> impl IntoResponse {
    info!("POST /api/dues/accrue - request: {:?}", request);
    let rate = state.rate.current().await;
    match state.dues.accrue(&account_id, request, rate).await {
        Ok(response) => (StatusCode::CREATED, Json(response)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Axum handler for POST /api/dues/:due_id/pay
pub async fn pay_due(
    State(state): State<AppState>,
    AccountId(account_id): AccountId,
    Path(due_id): Path<String>,
    Json(request): Json<PayDueRequest>,
) -> impl IntoResponse {
    info!("POST /api/dues/{due_id}/pay");
    let rate = state.rate.current().await;
    match state.dues.pay_due(&account_id, &due_id, request, rate).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Axum handler for POST /api/apartments/:apartment_id/pay-all
pub async fn pay_all(
    State(state): State<AppState>,
    AccountId(account_id): AccountId,
    Path(apartment_id): Path<String>,
    Json(request): Json<PayAllRequest>,
) -> impl IntoResponse {
    info!("POST /api/apartments/{apartment_id}/pay-all - request: {:?}", request);
    let rate = state.rate.current().await;
    match state
        .dues
        .pay_all(&account_id, &apartment_id, request, rate)
        .await
    {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Axum handler for GET /api/budget
pub async fn get_budget(
    State(state): State<AppState>,
    AccountId(account_id): AccountId,
) -> impl IntoResponse {
    info!("GET /api/budget");
    let rate = state.rate.current_rate().await;
    match state.budget.summary(&account_id, rate).await {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(e) => e.into_response(),
    }
}

#[derive(Deserialize, Debug)]
pub struct EntryListQuery {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

/// Axum handler for GET /api/budget/entries
pub async fn list_entries(
    State(state): State<AppState>,
    AccountId(account_id): AccountId,
    Query(query): Query<EntryListQuery>,
) -> impl IntoResponse {
    info!("GET /api/budget/entries - query: {:?}", query);
    let limit = query.limit.unwrap_or(20).min(100);
    let offset = query.offset.unwrap_or(0);
    match state.budget.list_entries(&account_id, limit, offset).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Axum handler for POST /api/budget/entries
pub async fn create_entry(
    State(state): State<AppState>,
    AccountId(account_id): AccountId,
    Json(request): Json<CreateLedgerEntryRequest>,
) -> impl IntoResponse {
    info!("POST /api/budget/entries - request: {:?}", request);
    let rate = state.rate.current().await;
    match state.budget.create_entry(&account_id, request, rate).await {
        Ok(response) => (StatusCode::CREATED, Json(response)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Axum handler for GET /api/settings
pub async fn get_settings(
    State(state): State<AppState>,
    AccountId(account_id): AccountId,
) -> impl IntoResponse {
    info!("GET /api/settings");
    match state.settings.get(&account_id).await {
        Ok(Some(settings)) => (StatusCode::OK, Json(settings.to_dto())).into_response(),
        Ok(None) => DomainError::NotFound("no settings saved yet".to_string()).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Axum handler for PUT /api/settings
pub async fn update_settings(
    State(state): State<AppState>,
    AccountId(account_id): AccountId,
    Json(request): Json<UpdateSettingsRequest>,
) -> impl IntoResponse {
    info!("PUT /api/settings - request: {:?}", request);
    match state.settings.update(&account_id, request).await {
        Ok(settings) => (StatusCode::OK, Json(settings.to_dto())).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Axum handler for GET /api/rate
pub async fn get_rate(State(state): State<AppState>) -> impl IntoResponse {
    info!("GET /api/rate");
    (StatusCode::OK, Json(state.rate.snapshot().await))
}

/// Axum handler for POST /api/rate/refresh
pub async fn refresh_rate(State(state): State<AppState>) -> impl IntoResponse {
    info!("POST /api/rate/refresh");
    (StatusCode::OK, Json(state.rate.refresh().await))
}

/// Axum handler for POST /api/reconcile
pub async fn reconcile(
    State(state): State<AppState>,
    AccountId(account_id): AccountId,
) -> impl IntoResponse {
    info!("POST /api/reconcile");
    match state.budget.reconcile(&account_id).await {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Axum handler for GET /view/:account_id/:apartment_id (no auth header)
pub async fn share_view(
    State(state): State<AppState>,
    Path((account_id, apartment_id)): Path<(String, String)>,
) -> impl IntoResponse {
    info!("GET /view/{account_id}/{apartment_id}");
    let rate = state.rate.current_rate().await;
    match state.share.view(&account_id, &apartment_id, rate).await {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(e) => e.into_response(),
    }
}
