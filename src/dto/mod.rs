//! Data Transfer Objects
//!
//! Respuestas y parámetros de consulta de la API que no mapean 1:1 a una
//! tabla.

pub mod admin_dto;
pub mod report_dto;
pub mod timeline_dto;
pub mod vehicle_dto;

pub use admin_dto::*;
pub use report_dto::*;
pub use timeline_dto::*;
pub use vehicle_dto::*;
