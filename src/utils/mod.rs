//! Utilidades del sistema
//!
//! Este módulo contiene utilidades para manejo de errores, validación y
//! ficheros zip.

pub mod archive;
pub mod errors;
pub mod validation;

pub use errors::{AppError, AppResult};
