//! Modelos del sistema
//!
//! Este módulo contiene todos los modelos de datos que mapean exactamente
//! al schema SQLite de `migrations/`, junto con los requests de entrada.

pub mod branch;
pub mod event;
pub mod expense;
pub mod file;
pub mod google_token;
pub mod link;
pub mod transfer;
pub mod vehicle;
pub mod visit;

pub use branch::{Branch, BranchRequest};
pub use event::{NewVehicleEvent, VehicleEvent, VehicleEventType, VehicleStatusEvent};
pub use expense::{CreateExpenseRequest, UpdateExpenseRequest, VehicleExpense};
pub use file::{FileCategory, NewVehicleFile, VehicleFile};
pub use google_token::GoogleToken;
pub use link::{CreateLinkRequest, VehicleLink};
pub use transfer::{BranchTransfer, MoveBranchRequest};
pub use vehicle::{CreateVehicleRequest, UpdateVehicleRequest, Vehicle};
pub use visit::{VehicleVisit, VisitRequest};
