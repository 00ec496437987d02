pub mod apartment_service;
pub mod budget_service;
pub mod dues_service;
pub mod models;
pub mod rate_service;
pub mod settings_service;
pub mod share_service;

pub use apartment_service::ApartmentService;
pub use budget_service::BudgetService;
pub use dues_service::DuesService;
pub use rate_service::RateService;
pub use settings_service::SettingsService;
pub use share_service::ShareService;
