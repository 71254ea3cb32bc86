//! Modelo de Branch
//!
//! Sucursales físicas donde se encuentra cada vehículo.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::utils::validation::validate_not_blank;

/// Branch principal - mapea exactamente a la tabla branch
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq, Eq)]
pub struct Branch {
    pub id: i64,
    pub name: String,
}

/// Request para crear o renombrar una sucursal
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct BranchRequest {
    #[validate(length(min = 1, max = 100), custom = "validate_not_blank")]
    pub name: String,
}
