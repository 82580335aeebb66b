//! Identity and authorization gate.
//!
//! Pure lookups run before any mutating operation: they resolve the calling
//! company by API key, the employee a card is issued to, and the business a
//! payment goes to. Each maps "absent" onto the error kind its caller expects.
//! This module also seeds the directory from the settings file.

use crate::{
    config::AppConfig,
    entities::{Business, Company, Employee, business, company, employee},
    errors::{Error, Result},
};
use sea_orm::{Set, prelude::*};
use tracing::info;

/// Resolves the company owning `api_key`.
///
/// # Errors
/// [`Error::Unauthorized`] when no company holds the key.
pub async fn resolve_company<C>(db: &C, api_key: &str) -> Result<company::Model>
where
    C: ConnectionTrait,
{
    Company::find()
        .filter(company::Column::ApiKey.eq(api_key))
        .one(db)
        .await?
        .ok_or_else(|| Error::unauthorized("unknown API key"))
}

/// Resolves an employee by id.
///
/// # Errors
/// [`Error::BadRequest`] when the id does not exist.
pub async fn resolve_employee<C>(db: &C, employee_id: i64) -> Result<employee::Model>
where
    C: ConnectionTrait,
{
    Employee::find_by_id(employee_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::bad_request(format!("employee {employee_id} does not exist")))
}

/// Resolves a business by id.
///
/// # Errors
/// [`Error::NotFound`] when the id does not exist.
pub async fn resolve_business<C>(db: &C, business_id: i64) -> Result<business::Model>
where
    C: ConnectionTrait,
{
    Business::find_by_id(business_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found(format!("business {business_id}")))
}

/// Counts of directory records inserted by [`seed_directory`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    /// Companies inserted
    pub companies: usize,
    /// Employees inserted
    pub employees: usize,
    /// Businesses inserted
    pub businesses: usize,
}

/// Inserts the companies, employees and businesses listed in `config` whose ids
/// are not present yet. Existing rows are never modified.
pub async fn seed_directory<C>(db: &C, config: &AppConfig) -> Result<SeedSummary>
where
    C: ConnectionTrait,
{
    let mut summary = SeedSummary::default();

    for seed in &config.companies {
        if Company::find_by_id(seed.id).one(db).await?.is_none() {
            company::ActiveModel {
                id: Set(seed.id),
                name: Set(seed.name.clone()),
                api_key: Set(seed.api_key.clone()),
            }
            .insert(db)
            .await?;
            summary.companies += 1;
        }
    }

    for seed in &config.employees {
        if Employee::find_by_id(seed.id).one(db).await?.is_none() {
            employee::ActiveModel {
                id: Set(seed.id),
                full_name: Set(seed.full_name.clone()),
                email: Set(seed.email.clone()),
                company_id: Set(seed.company_id),
            }
            .insert(db)
            .await?;
            summary.employees += 1;
        }
    }

    for seed in &config.businesses {
        if Business::find_by_id(seed.id).one(db).await?.is_none() {
            business::ActiveModel {
                id: Set(seed.id),
                name: Set(seed.name.clone()),
                category: Set(seed.category),
            }
            .insert(db)
            .await?;
            summary.businesses += 1;
        }
    }

    info!(
        companies = summary.companies,
        employees = summary.employees,
        businesses = summary.businesses,
        "Directory seeded"
    );
    Ok(summary)
}
