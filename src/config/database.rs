//! Database configuration module.
//!
//! This module handles `SQLite` database connection and table creation using `SeaORM`.
//! Tables are generated from the entity definitions with `Schema::create_table_from_entity`,
//! so the schema always matches the Rust models. The one constraint entities cannot
//! express, the composite uniqueness of `(employee_id, category)` on cards, is added
//! here as an explicit unique index; it is what makes concurrent card creation safe.

use crate::entities::{Business, Card, Company, Employee, Payment, Recharge, card};
use crate::errors::Result;
use sea_orm::sea_query::Index;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, EntityTrait, Schema};
use tracing::{debug, info};

/// Used when `DATABASE_URL` is not set.
pub const DEFAULT_DATABASE_URL: &str = "sqlite://data/benefit_cards.sqlite?mode=rwc";

/// Name of the unique index guarding one card per employee and category.
pub const CARD_OWNER_CATEGORY_INDEX: &str = "idx_cards_employee_category";

/// Gets the database URL from the `DATABASE_URL` environment variable or returns the
/// default `SQLite` path.
#[must_use]
pub fn get_database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string())
}

/// Establishes a connection to the database named by `DATABASE_URL`.
pub async fn create_connection() -> Result<DatabaseConnection> {
    let database_url = get_database_url();
    debug!("Connecting to database at {}", database_url);
    Database::connect(&database_url).await.map_err(Into::into)
}

async fn create_table<C, E>(db: &C, entity: E) -> Result<()>
where
    C: ConnectionTrait,
    E: EntityTrait,
{
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);
    let mut statement = schema.create_table_from_entity(entity);
    statement.if_not_exists();
    db.execute(builder.build(&statement)).await?;
    Ok(())
}

/// Creates every table (if missing) plus the card ownership unique index.
///
/// Safe to call on every start: existing tables and indexes are left untouched.
pub async fn create_tables<C>(db: &C) -> Result<()>
where
    C: ConnectionTrait,
{
    // Parents before children so foreign keys resolve on every backend
    create_table(db, Company).await?;
    create_table(db, Employee).await?;
    create_table(db, Business).await?;
    create_table(db, Card).await?;
    create_table(db, Recharge).await?;
    create_table(db, Payment).await?;

    let unique_owner_category = Index::create()
        .name(CARD_OWNER_CATEGORY_INDEX)
        .table(Card)
        .col(card::Column::EmployeeId)
        .col(card::Column::Category)
        .unique()
        .if_not_exists()
        .to_owned();
    let builder = db.get_database_backend();
    db.execute(builder.build(&unique_owner_category)).await?;

    info!("Database tables ensured");
    Ok(())
}
