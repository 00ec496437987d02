//! Storage layer: read repositories, write batches, and the change feed.
//!
//! Reads go through per-collection repositories; all mutations are assembled
//! on a [`WriteBatch`] so related documents commit atomically.

pub mod apartment_repository;
pub mod batch;
pub mod budget_repository;
pub mod changes;
pub mod due_repository;
pub mod settings_repository;

pub use apartment_repository::ApartmentRepository;
pub use batch::WriteBatch;
pub use budget_repository::BudgetRepository;
pub use changes::{ChangeEvent, ChangeFeed, Collection};
pub use due_repository::DueRepository;
pub use settings_repository::SettingsRepository;
