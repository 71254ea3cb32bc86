//! Sahocars: back-office de compraventa de vehículos
//!
//! La librería contiene el servidor REST completo (rutas, servicios,
//! repositorios SQLite) y `client`, la pasarela HTTP tipada que usan los
//! frontends para hablar con él.

pub mod client;
pub mod config;
pub mod database;
pub mod domain;
pub mod dto;
pub mod middleware;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod services;
pub mod state;
pub mod utils;

pub use routes::create_app_router;
pub use state::AppState;
