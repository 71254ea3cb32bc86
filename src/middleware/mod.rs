//! Middleware del sistema
//!
//! CORS y la restricción de acceso local de las rutas de administración.

pub mod cors;
pub mod local_only;

pub use cors::*;
pub use local_only::*;
