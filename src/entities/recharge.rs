//! Recharge entity - Append-only ledger entry crediting a card.
//!
//! Entries are inserted once and never updated or deleted.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Recharge database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "recharges")]
pub struct Model {
    /// Unique identifier; also gives insertion order
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Credited card
    pub card_id: i64,
    /// Positive amount in cents
    pub amount: i64,
    /// When the recharge was recorded
    pub timestamp: DateTimeUtc,
}

/// Defines relationships between Recharge and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each recharge belongs to one card
    #[sea_orm(
        belongs_to = "super::card::Entity",
        from = "Column::CardId",
        to = "super::card::Column::Id"
    )]
    Card,
}

impl Related<super::card::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Card.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
