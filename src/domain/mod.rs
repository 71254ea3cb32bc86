//! Reglas de negocio puras
//!
//! Flujo de estados, categorías de gasto y cálculos financieros. Sin acceso
//! a base de datos ni a red: lo usan tanto el servidor como el cliente.

pub mod expense;
pub mod finance;
pub mod plate;
pub mod status;

pub use expense::ExpenseCategory;
pub use finance::{ExpenseAmount, VehicleFinancials, VehicleKpis};
pub use plate::{copy_plate, normalize_plate, vehicle_storage_key};
pub use status::{StatusChange, TransitionError, VehicleStatus};
