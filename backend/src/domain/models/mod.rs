pub mod apartment;
pub mod budget;
pub mod due;
pub mod ledger;
pub mod rate;
pub mod settings;

pub use apartment::Apartment;
pub use budget::Budget;
pub use due::{period_label, Due, DuePayment};
pub use ledger::{EntryCategory, EntryType, LedgerEntry};
pub use rate::RateSnapshot;
pub use settings::{SiteSettings, SiteType};
