//! Categorías de gasto

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub const DEFAULT_CURRENCY: &str = "EUR";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(rename_all = "UPPERCASE")]
pub enum ExpenseCategory {
    Purchase,
    Mechanical,
    Tires,
    Transport,
    Admin,
    Cleaning,
    Other,
}

impl ExpenseCategory {
    pub const ALL: [ExpenseCategory; 7] = [
        ExpenseCategory::Purchase,
        ExpenseCategory::Mechanical,
        ExpenseCategory::Tires,
        ExpenseCategory::Transport,
        ExpenseCategory::Admin,
        ExpenseCategory::Cleaning,
        ExpenseCategory::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExpenseCategory::Purchase => "PURCHASE",
            ExpenseCategory::Mechanical => "MECHANICAL",
            ExpenseCategory::Tires => "TIRES",
            ExpenseCategory::Transport => "TRANSPORT",
            ExpenseCategory::Admin => "ADMIN",
            ExpenseCategory::Cleaning => "CLEANING",
            ExpenseCategory::Other => "OTHER",
        }
    }

    pub fn is_purchase(&self) -> bool {
        matches!(self, ExpenseCategory::Purchase)
    }
}

impl fmt::Display for ExpenseCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExpenseCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        ExpenseCategory::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == upper)
            .ok_or_else(|| format!("Categoria de gasto invalida: {}", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_category() {
        assert_eq!("purchase".parse::<ExpenseCategory>(), Ok(ExpenseCategory::Purchase));
        assert_eq!("TIRES".parse::<ExpenseCategory>(), Ok(ExpenseCategory::Tires));
        assert!("FUEL".parse::<ExpenseCategory>().is_err());
    }

    #[test]
    fn test_only_purchase_is_purchase() {
        let purchases: Vec<_> = ExpenseCategory::ALL.iter().filter(|c| c.is_purchase()).collect();
        assert_eq!(purchases, vec![&ExpenseCategory::Purchase]);
    }
}
