//! Flujo de estados del vehículo
//!
//! Tabla fija de transiciones: desde cada estado solo se puede saltar a los
//! estados listados, en un único paso. `sold` y `discarded` son terminales.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Estado del vehículo - se guarda como texto en minúsculas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum VehicleStatus {
    Intake,
    Prep,
    Ready,
    Published,
    Reserved,
    Sold,
    Discarded,
}

impl VehicleStatus {
    pub const ALL: [VehicleStatus; 7] = [
        VehicleStatus::Intake,
        VehicleStatus::Prep,
        VehicleStatus::Ready,
        VehicleStatus::Published,
        VehicleStatus::Reserved,
        VehicleStatus::Sold,
        VehicleStatus::Discarded,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            VehicleStatus::Intake => "intake",
            VehicleStatus::Prep => "prep",
            VehicleStatus::Ready => "ready",
            VehicleStatus::Published => "published",
            VehicleStatus::Reserved => "reserved",
            VehicleStatus::Sold => "sold",
            VehicleStatus::Discarded => "discarded",
        }
    }

    /// Estados alcanzables en una transición
    pub fn allowed_transitions(&self) -> &'static [VehicleStatus] {
        use VehicleStatus::*;
        match self {
            Intake => &[Prep, Ready, Discarded],
            Prep => &[Ready, Discarded],
            Ready => &[Published, Discarded],
            Published => &[Reserved, Sold, Discarded, Ready],
            Reserved => &[Sold, Published, Discarded],
            Sold | Discarded => &[],
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, VehicleStatus::Sold | VehicleStatus::Discarded)
    }

    /// En stock = ni vendido ni descartado
    pub fn is_in_stock(&self) -> bool {
        !self.is_terminal()
    }

    pub fn can_transition_to(&self, to: VehicleStatus) -> bool {
        self.allowed_transitions().contains(&to)
    }
}

impl Default for VehicleStatus {
    fn default() -> Self {
        VehicleStatus::Intake
    }
}

impl fmt::Display for VehicleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Estado invalido: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for VehicleStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        VehicleStatus::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == normalized)
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

/// Motivos por los que una transición no es válida
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("El vehiculo ya tiene ese estado")]
    SameStatus,

    #[error("El estado actual es terminal y no admite cambios")]
    Terminal(VehicleStatus),

    #[error("Transicion invalida: {from} -> {to}")]
    NotAllowed { from: VehicleStatus, to: VehicleStatus },

    #[error("reserved_until es requerido para reservar")]
    MissingReservedUntil,

    #[error("sold_at es requerido para marcar como vendido")]
    MissingSoldAt,
}

/// Valida un salto de estado contra la tabla.
///
/// El orden de comprobación es: mismo estado, estado terminal, transición no
/// listada.
pub fn validate_transition(from: VehicleStatus, to: VehicleStatus) -> Result<(), TransitionError> {
    if from == to {
        return Err(TransitionError::SameStatus);
    }
    if from.is_terminal() {
        return Err(TransitionError::Terminal(from));
    }
    if !from.can_transition_to(to) {
        return Err(TransitionError::NotAllowed { from, to });
    }
    Ok(())
}

/// Petición de cambio de estado
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusChange {
    pub to_status: VehicleStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reserved_until: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sold_at: Option<NaiveDate>,
}

impl StatusChange {
    pub fn new(to_status: VehicleStatus) -> Self {
        Self {
            to_status,
            note: None,
            reserved_until: None,
            sold_at: None,
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    pub fn with_reserved_until(mut self, date: NaiveDate) -> Self {
        self.reserved_until = Some(date);
        self
    }

    pub fn with_sold_at(mut self, date: NaiveDate) -> Self {
        self.sold_at = Some(date);
        self
    }

    /// Fechas obligatorias antes de enviar la petición: reservar exige
    /// `reserved_until` y vender exige `sold_at`.
    pub fn check_required_dates(&self) -> Result<(), TransitionError> {
        match self.to_status {
            VehicleStatus::Reserved if self.reserved_until.is_none() => {
                Err(TransitionError::MissingReservedUntil)
            }
            VehicleStatus::Sold if self.sold_at.is_none() => Err(TransitionError::MissingSoldAt),
            _ => Ok(()),
        }
    }

    /// Validación completa cuando se conoce el estado actual
    pub fn validate_from(&self, current: VehicleStatus) -> Result<(), TransitionError> {
        self.check_required_dates()?;
        validate_transition(current, self.to_status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_statuses_have_no_options() {
        for status in VehicleStatus::ALL {
            if status.is_terminal() {
                assert!(status.allowed_transitions().is_empty(), "{status}");
            } else {
                assert!(!status.allowed_transitions().is_empty(), "{status}");
            }
        }
        assert!(VehicleStatus::Sold.is_terminal());
        assert!(VehicleStatus::Discarded.is_terminal());
    }

    #[test]
    fn test_transition_table() {
        use VehicleStatus::*;
        assert_eq!(Intake.allowed_transitions(), &[Prep, Ready, Discarded]);
        assert_eq!(Prep.allowed_transitions(), &[Ready, Discarded]);
        assert_eq!(Ready.allowed_transitions(), &[Published, Discarded]);
        assert_eq!(
            Published.allowed_transitions(),
            &[Reserved, Sold, Discarded, Ready]
        );
        assert_eq!(Reserved.allowed_transitions(), &[Sold, Published, Discarded]);
    }

    #[test]
    fn test_validate_transition_precedence() {
        use VehicleStatus::*;
        assert_eq!(validate_transition(Sold, Sold), Err(TransitionError::SameStatus));
        assert_eq!(
            validate_transition(Sold, Published),
            Err(TransitionError::Terminal(Sold))
        );
        assert_eq!(
            validate_transition(Intake, Sold),
            Err(TransitionError::NotAllowed { from: Intake, to: Sold })
        );
        assert!(validate_transition(Published, Ready).is_ok());
    }

    #[test]
    fn test_required_dates() {
        let reserve = StatusChange::new(VehicleStatus::Reserved);
        assert_eq!(
            reserve.check_required_dates(),
            Err(TransitionError::MissingReservedUntil)
        );
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        assert!(reserve.with_reserved_until(date).check_required_dates().is_ok());

        let sell = StatusChange::new(VehicleStatus::Sold);
        assert_eq!(sell.check_required_dates(), Err(TransitionError::MissingSoldAt));
        assert!(sell.with_sold_at(date).check_required_dates().is_ok());

        assert!(StatusChange::new(VehicleStatus::Prep).check_required_dates().is_ok());
    }

    #[test]
    fn test_parse_status() {
        assert_eq!("Published".parse::<VehicleStatus>(), Ok(VehicleStatus::Published));
        assert_eq!(" sold ".parse::<VehicleStatus>(), Ok(VehicleStatus::Sold));
        assert!("vendido".parse::<VehicleStatus>().is_err());
    }

    #[test]
    fn test_serde_wire_names() {
        let json = serde_json::to_string(&VehicleStatus::Discarded).unwrap();
        assert_eq!(json, "\"discarded\"");
        let change: StatusChange =
            serde_json::from_str(r#"{"to_status":"reserved","reserved_until":"2024-06-01"}"#)
                .unwrap();
        assert_eq!(change.to_status, VehicleStatus::Reserved);
        assert!(change.check_required_dates().is_ok());
    }
}
