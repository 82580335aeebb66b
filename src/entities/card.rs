//! Card entity - A benefit card issued to an employee for one spending category.
//!
//! A card without `password` is unactivated; setting it is the one-way activation.
//! `security_code` and `password` only ever hold digests. There is no stored
//! balance: it is always derived from the `recharges` and `payments` ledgers.

use super::Category;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Card database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "cards")]
pub struct Model {
    /// Unique identifier for the card
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning employee
    pub employee_id: i64,
    /// Card number as issued
    pub number: String,
    /// Name printed on the card, e.g. `"FULANO R SILVA"`
    pub cardholder_name: String,
    /// Digest of the security code (CVC)
    #[serde(skip_serializing)]
    pub security_code: String,
    /// Expiration month/year formatted `MM/YY`
    pub expiration_date: String,
    /// Digest of the 4-character password, `None` until activation
    #[serde(skip_serializing)]
    pub password: Option<String>,
    /// Virtual cards are not issued by this core; always false
    pub is_virtual: bool,
    /// Reserved flag, not changed by any current operation
    pub is_blocked: bool,
    /// Category this card may spend in
    pub category: Category,
}

impl Model {
    /// Whether the card has been activated (a password digest is stored).
    #[must_use]
    pub const fn is_activated(&self) -> bool {
        self.password.is_some()
    }

    /// Card number with everything but the last four digits hidden.
    #[must_use]
    pub fn masked_number(&self) -> String {
        let digits: Vec<char> = self.number.chars().filter(char::is_ascii_digit).collect();
        let tail: String = digits[digits.len().saturating_sub(4)..].iter().collect();
        format!("**** **** **** {tail}")
    }
}

/// Defines relationships between Card and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each card belongs to one employee
    #[sea_orm(
        belongs_to = "super::employee::Entity",
        from = "Column::EmployeeId",
        to = "super::employee::Column::Id"
    )]
    Employee,
    /// Recharge ledger entries for this card
    #[sea_orm(has_many = "super::recharge::Entity")]
    Recharges,
    /// Payment ledger entries for this card
    #[sea_orm(has_many = "super::payment::Entity")]
    Payments,
}

impl Related<super::employee::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Employee.def()
    }
}

impl Related<super::recharge::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Recharges.def()
    }
}

impl Related<super::payment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Payments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
