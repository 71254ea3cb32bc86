//! Módulo de base de datos
//!
//! Maneja la conexión, migraciones y datos iniciales de SQLite

pub mod connection;

pub use connection::{schema_version, DatabaseConnection};
