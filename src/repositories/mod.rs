//! Repositorios
//!
//! Acceso a SQLite. Las lecturas usan el pool del repositorio; las
//! escrituras que forman parte de una transacción reciben la conexión.

pub mod branch_repository;
pub mod event_repository;
pub mod expense_repository;
pub mod file_repository;
pub mod google_token_repository;
pub mod link_repository;
pub mod transfer_repository;
pub mod vehicle_repository;
pub mod visit_repository;

pub use branch_repository::BranchRepository;
pub use event_repository::EventRepository;
pub use expense_repository::ExpenseRepository;
pub use file_repository::FileRepository;
pub use google_token_repository::{GoogleTokenRepository, TokenGrant};
pub use link_repository::LinkRepository;
pub use transfer_repository::TransferRepository;
pub use vehicle_repository::VehicleRepository;
pub use visit_repository::{CalendarSyncState, VisitFields, VisitRepository};
