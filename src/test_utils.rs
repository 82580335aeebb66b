//! Shared test utilities.
//!
//! This module provides in-memory database setup, a seeded directory,
//! deterministic capabilities and helpers that issue cards with sensible
//! defaults.

#![allow(clippy::unwrap_used)]

use crate::{
    config::{
        AppConfig, CredentialSettings,
        database::create_tables,
        settings::{BusinessSeed, CompanySeed, EmployeeSeed},
    },
    core::{
        Clock, CredentialService, SecretGenerator,
        card::IssuedCard,
        identity::seed_directory,
        service::CardService,
    },
    entities::{Category, card},
    errors::Result,
};
use chrono::{DateTime, TimeZone, Utc};
use sea_orm::{DatabaseConnection, SqlxSqliteConnector};
use std::sync::Arc;

/// API key of the seeded company
pub const TEST_API_KEY: &str = "zadKLNx.DzvOVjQH01TumGl2urPjPQSxUbf67vs0";
/// Seeded employee with interior names
pub const TEST_EMPLOYEE_ID: i64 = 1;
/// Full name of [`TEST_EMPLOYEE_ID`]
pub const TEST_EMPLOYEE_NAME: &str = "Fulano Rubens da Silva";
/// Second seeded employee of the same company
pub const SECOND_EMPLOYEE_ID: i64 = 2;
/// Seeded groceries business
pub const GROCERIES_BUSINESS_ID: i64 = 1;
/// Seeded restaurant business
pub const RESTAURANT_BUSINESS_ID: i64 = 2;
/// Number produced by [`FixedSecrets`]
pub const TEST_CARD_NUMBER: &str = "5555555555554444";
/// Security code produced by [`FixedSecrets`]
pub const TEST_SECURITY_CODE: &str = "123";
/// Password used by [`issue_activated_card`]
pub const TEST_PASSWORD: &str = "1234";

/// Clock frozen at a fixed instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl FixedClock {
    /// Noon UTC on the given day.
    pub fn on(year: i32, month: u32, day: u32) -> Self {
        Self(Utc.with_ymd_and_hms(year, month, day, 12, 0, 0).unwrap())
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Always yields [`TEST_CARD_NUMBER`] and [`TEST_SECURITY_CODE`].
#[derive(Debug, Clone, Copy)]
pub struct FixedSecrets;

impl SecretGenerator for FixedSecrets {
    fn card_number(&self) -> String {
        TEST_CARD_NUMBER.to_string()
    }

    fn security_code(&self) -> String {
        TEST_SECURITY_CODE.to_string()
    }
}

/// Credential service at Argon2's minimum cost, to keep tests fast.
pub fn fast_credentials() -> CredentialService {
    CredentialService::new(&CredentialSettings {
        memory_kib: 8,
        iterations: 1,
        parallelism: 1,
    })
    .unwrap()
}

/// One company, two employees, a groceries and a restaurant business.
pub fn test_directory() -> AppConfig {
    AppConfig {
        companies: vec![CompanySeed {
            id: 1,
            name: "Driven Ltda".to_string(),
            api_key: TEST_API_KEY.to_string(),
        }],
        employees: vec![
            EmployeeSeed {
                id: TEST_EMPLOYEE_ID,
                full_name: TEST_EMPLOYEE_NAME.to_string(),
                email: "fulano.silva@gmail.com".to_string(),
                company_id: 1,
            },
            EmployeeSeed {
                id: SECOND_EMPLOYEE_ID,
                full_name: "Ciclana Maria Madeira".to_string(),
                email: "ciclaninha@gmail.com".to_string(),
                company_id: 1,
            },
        ],
        businesses: vec![
            BusinessSeed {
                id: GROCERIES_BUSINESS_ID,
                name: "Extra".to_string(),
                category: Category::Groceries,
            },
            BusinessSeed {
                id: RESTAURANT_BUSINESS_ID,
                name: "Outback".to_string(),
                category: Category::Restaurant,
            },
        ],
        ..AppConfig::default()
    }
}

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    create_tables(&db).await?;
    Ok(db)
}

/// In-memory database with [`test_directory`] seeded.
pub async fn setup_seeded_db() -> Result<DatabaseConnection> {
    let db = setup_test_db().await?;
    seed_directory(&db, &test_directory()).await?;
    Ok(db)
}

/// Second handle on the `SQLite` pool behind `db`.
///
/// `DatabaseConnection` is not `Clone` once the `mock` feature is enabled, so
/// the pool is shared explicitly.
pub fn share_pool(db: &DatabaseConnection) -> DatabaseConnection {
    SqlxSqliteConnector::from_sqlx_sqlite_pool(db.get_sqlite_connection_pool().clone())
}

/// Service over `db` with fixed secrets and the given clock.
///
/// The new service shares `db`'s pool, so a second service with a later
/// clock can observe cards from the first.
pub fn service_at(db: &DatabaseConnection, clock: FixedClock) -> CardService {
    service_on(share_pool(db), clock)
}

/// Service that takes ownership of `db`, e.g. a `MockDatabase` connection.
pub fn service_on(db: DatabaseConnection, clock: FixedClock) -> CardService {
    CardService::new(
        db,
        fast_credentials(),
        Arc::new(clock),
        Arc::new(FixedSecrets),
    )
}

/// Seeded service with the clock on 2024-03-15; cards issued now expire 03/29.
pub async fn setup_service() -> Result<CardService> {
    let db = setup_seeded_db().await?;
    Ok(service_at(&db, FixedClock::on(2024, 3, 15)))
}

/// Issues an unactivated card to [`TEST_EMPLOYEE_ID`].
pub async fn issue_test_card(service: &CardService, category: Category) -> Result<IssuedCard> {
    service
        .create_card(TEST_API_KEY, TEST_EMPLOYEE_ID, category)
        .await
}

/// Issues a card to [`TEST_EMPLOYEE_ID`] and activates it with [`TEST_PASSWORD`].
pub async fn issue_activated_card(
    service: &CardService,
    category: Category,
) -> Result<card::Model> {
    let issued = issue_test_card(service, category).await?;
    service
        .activate_card(issued.card.id, &issued.security_code, TEST_PASSWORD)
        .await
}
