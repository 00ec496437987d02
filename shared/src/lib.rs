use serde::{Deserialize, Serialize};

/// A registered apartment (one unit of the managed site).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Apartment {
    pub id: String,
    /// Block/section label, normalized to upper-case (e.g. "A")
    pub block: String,
    /// Unit number within the block (positive)
    pub number: u32,
    /// Display name of the owner/resident
    pub owner: String,
    /// Denormalized outstanding debt in USD (sum of unpaid dues)
    pub current_debt_usd: f64,
    /// Outstanding debt converted at the latest known rate, if one is known
    pub current_debt_display: Option<f64>,
    /// Creation timestamp (RFC 3339)
    pub created_at: String,
}

/// One apartment's debt obligation for a single billing period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Due {
    pub id: String,
    pub apartment_id: String,
    /// Originally accrued amount in USD
    pub amount_usd: f64,
    /// Unpaid remainder in USD (0 once settled)
    pub remaining_debt_usd: f64,
    /// Billing month, 1-12
    pub month: u32,
    pub year: i32,
    /// Accrual timestamp (RFC 3339)
    pub accrual_date: String,
    /// USD -> display-currency rate at accrual time
    pub rate: f64,
    pub is_paid: bool,
    /// Cumulative USD collected against this due
    pub paid_amount_usd: f64,
    pub payment_date: Option<String>,
    pub payment_rate: Option<f64>,
    /// Collected amount expressed in the display currency
    pub payment_amount_display: Option<f64>,
}

/// Whether a ledger entry adds to or subtracts from the shared budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntryType {
    Income,
    Expense,
}

/// Category tag for ledger entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntryCategory {
    /// Dues collection income
    Dues,
    Maintenance,
    Utilities,
    Cleaning,
    Security,
    Repairs,
    Other,
}

/// An immutable income/expense record in the shared budget ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: String,
    /// Absolute amount in USD; the sign comes from `entry_type`
    pub amount_usd: f64,
    /// Amount in the display currency at `rate`
    pub amount_display: f64,
    pub entry_type: EntryType,
    pub category: EntryCategory,
    pub description: String,
    /// Transaction timestamp (RFC 3339)
    pub date: String,
    /// USD -> display-currency rate at transaction time
    pub rate: f64,
}

/// The running shared-budget balance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetSummary {
    pub balance_usd: f64,
    /// Balance converted at the latest known rate, if one is known
    pub balance_display: Option<f64>,
    pub last_updated: Option<String>,
}

/// Site management type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SiteType {
    Apartment,
    Site,
}

/// Per-account site settings singleton.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteSettings {
    pub site_name: String,
    pub site_type: SiteType,
    pub contact_info: Option<String>,
    pub last_updated: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateApartmentRequest {
    pub block: String,
    pub number: u32,
    pub owner: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateApartmentRequest {
    /// Identity fields only; debt is never edited directly
    pub block: String,
    pub number: u32,
    pub owner: String,
}

/// An apartment together with its outstanding dues, for list display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApartmentWithDues {
    pub apartment: Apartment,
    /// Unpaid dues with a positive remaining balance, newest period first
    pub outstanding_dues: Vec<Due>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApartmentListResponse {
    pub apartments: Vec<ApartmentWithDues>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccrueDuesRequest {
    /// Billing month, 1-12
    pub month: u32,
    pub year: i32,
    /// Per-unit due amount in the display currency
    pub amount_display: f64,
    /// Acknowledges re-accrual for a period that already has dues
    #[serde(default)]
    pub confirmed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccrueDuesResponse {
    /// Number of apartments debited
    pub apartments_debited: u32,
    /// Per-unit amount converted to USD
    pub amount_usd: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayDueRequest {
    /// Acknowledges the amounts shown in the confirmation message
    #[serde(default)]
    pub confirmed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayAllRequest {
    /// Optional caller-computed total; cross-checked against stored dues
    pub total_usd: Option<f64>,
    #[serde(default)]
    pub confirmed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentResponse {
    /// Collected amount in USD
    pub amount_usd: f64,
    /// Collected amount in the display currency
    pub amount_display: f64,
    /// Number of dues settled by this payment
    pub dues_settled: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateLedgerEntryRequest {
    pub entry_type: EntryType,
    pub category: EntryCategory,
    /// Amount in the display currency (positive)
    pub amount_display: f64,
    pub description: String,
    /// Acknowledges an overdraft warning for expenses
    #[serde(default)]
    pub confirmed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateLedgerEntryResponse {
    pub entry: LedgerEntry,
    pub new_balance_usd: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntryListResponse {
    pub entries: Vec<LedgerEntry>,
    /// Total number of entries on the account (for pagination display)
    pub total: u32,
}

/// Latest known currency rate plus the delta against the previous fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateResponse {
    /// USD -> display-currency rate; None until a rate is known
    pub rate: Option<f64>,
    /// Display currency code (e.g. "TRY")
    pub currency: String,
    pub previous_rate: Option<f64>,
    /// Absolute change since the previous fetch
    pub change: Option<f64>,
    /// Percentage change since the previous fetch
    pub change_percent: Option<f64>,
    /// True when the rate is the configured fallback, not a live quote
    pub is_fallback: bool,
    pub fetched_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateSettingsRequest {
    pub site_name: String,
    pub site_type: SiteType,
    pub contact_info: Option<String>,
}

/// Everything the public share page shows for one apartment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShareViewResponse {
    pub apartment: Apartment,
    /// Best-effort; omitted when the account has no settings yet
    pub site: Option<SiteSettings>,
    /// Dues with a positive outstanding balance only
    pub outstanding_dues: Vec<Due>,
    pub total_debt_usd: f64,
    pub total_debt_display: Option<f64>,
    /// Most recent ledger entries account-wide (not apartment-scoped)
    pub recent_entries: Vec<LedgerEntry>,
}

/// Result of a drift check between denormalized balances and the ledgers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconcileResponse {
    /// Budget balance before reconciliation
    pub budget_balance_usd: f64,
    /// Budget balance recomputed from the ledger
    pub ledger_sum_usd: f64,
    pub budget_repaired: bool,
    /// Apartments whose cached debt disagreed with their dues and were fixed
    pub apartments_repaired: Vec<String>,
}

/// Error payload returned by every failing endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    /// Present on 409 responses: the question the operator must confirm
    pub confirmation: Option<String>,
}
