//! Spending category shared by cards and businesses.
//!
//! A card may only pay businesses of its own category.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Fixed set of benefit categories, persisted as lowercase text.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Supermarkets and grocery stores
    #[sea_orm(string_value = "groceries")]
    Groceries,
    /// Restaurants and food service
    #[sea_orm(string_value = "restaurant")]
    Restaurant,
    /// Public transport, fuel, ride sharing
    #[sea_orm(string_value = "transport")]
    Transport,
    /// Schools, courses, books
    #[sea_orm(string_value = "education")]
    Education,
    /// Pharmacies, clinics
    #[sea_orm(string_value = "health")]
    Health,
}

impl Category {
    /// Lowercase name as stored in the database.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Groceries => "groceries",
            Self::Restaurant => "restaurant",
            Self::Transport => "transport",
            Self::Education => "education",
            Self::Health => "health",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
