//! Services module
//!
//! Este módulo contiene la lógica de negocio de la aplicación. Los servicios
//! se construyen por petición a partir del pool y encapsulan operaciones que
//! tocan varios repositorios, el storage o integraciones externas.

pub mod backup_service;
pub mod branch_service;
pub mod calendar_service;
pub mod expense_service;
pub mod export_service;
pub mod file_service;
pub mod link_service;
pub mod report_service;
pub mod system_service;
pub mod timeline_service;
pub mod transfer_service;
pub mod vehicle_service;
pub mod visit_service;

pub use backup_service::BackupService;
pub use branch_service::BranchService;
pub use calendar_service::CalendarService;
pub use expense_service::ExpenseService;
pub use export_service::{ExportResource, ExportService};
pub use file_service::{FileService, UploadedFile};
pub use link_service::LinkService;
pub use report_service::ReportService;
pub use system_service::SystemService;
pub use timeline_service::TimelineService;
pub use transfer_service::TransferService;
pub use vehicle_service::VehicleService;
pub use visit_service::VisitService;
