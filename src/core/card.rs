//! Card lifecycle - issuing and activating cards.
//!
//! A card is created unactivated and becomes activated once a password is set.
//! The transition is one-way. Independently of that state, a card whose
//! expiration month/year lies strictly in the past rejects every operation.

use super::{identity, service::CardService};
use crate::{
    entities::{Card, Category, card},
    errors::{Error, Result},
};
use chrono::{Datelike, Months, NaiveDate};
use sea_orm::{Set, SqlErr, prelude::*, sea_query::Expr};
use std::fmt;
use tracing::{info, instrument};

/// How long a newly issued card stays valid.
pub const VALIDITY_YEARS: u32 = 5;

/// Exact number of characters in a card password.
pub const PASSWORD_LENGTH: usize = 4;

/// Last month/year in which a card is usable, stored as `MM/YY`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Expiration {
    // Field order gives year-then-month ordering
    year: i32,
    month: u32,
}

impl Expiration {
    /// The month containing `date`.
    #[must_use]
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// Parses `MM/YY`; two-digit years are taken as 20YY.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        let (month, year) = value.split_once('/')?;
        if month.len() != 2 || year.len() != 2 {
            return None;
        }
        if !month.bytes().chain(year.bytes()).all(|b| b.is_ascii_digit()) {
            return None;
        }
        let month: u32 = month.parse().ok()?;
        let year: i32 = year.parse().ok()?;
        (1..=12)
            .contains(&month)
            .then_some(Self {
                year: 2000 + year,
                month,
            })
    }

    /// True when `today` falls in a later month than this expiration.
    #[must_use]
    pub fn is_past(self, today: NaiveDate) -> bool {
        Self::from_date(today) > self
    }

    /// Expiration month, 1-12.
    #[must_use]
    pub const fn month(self) -> u32 {
        self.month
    }

    /// Four-digit expiration year.
    #[must_use]
    pub const fn year(self) -> i32 {
        self.year
    }
}

impl fmt::Display for Expiration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}/{:02}", self.month, self.year.rem_euclid(100))
    }
}

/// Derives the printed cardholder name from an employee's full name.
///
/// First and last names are kept whole; interior names of three or more
/// characters are reduced to their initial and shorter ones ("da", "de")
/// are dropped. The result is uppercase:
/// `"Fulano Rubens da Silva"` becomes `"FULANO R SILVA"`.
/// With no interior names the result is just `"FIRST LAST"`.
#[must_use]
pub fn cardholder_name(full_name: &str) -> String {
    let words: Vec<&str> = full_name.split_whitespace().collect();
    let name = match words.as_slice() {
        [] => String::new(),
        [only] => (*only).to_string(),
        [first, interior @ .., last] => {
            let mut parts = vec![(*first).to_string()];
            parts.extend(
                interior
                    .iter()
                    .filter(|word| word.chars().count() >= 3)
                    .filter_map(|word| word.chars().next())
                    .map(String::from),
            );
            parts.push((*last).to_string());
            parts.join(" ")
        }
    };
    name.to_uppercase()
}

/// A freshly created card together with its plaintext security code.
///
/// Only the digest of the code is stored; this is the one chance to hand the
/// code to the cardholder.
#[derive(Clone, PartialEq, Eq)]
pub struct IssuedCard {
    /// The stored card record
    pub card: card::Model,
    /// Plaintext security code (CVC)
    pub security_code: String,
}

impl fmt::Debug for IssuedCard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IssuedCard")
            .field("card", &self.card)
            .field("security_code", &"***")
            .finish()
    }
}

/// Loads a card by id.
///
/// # Errors
/// [`Error::NotFound`] when the card does not exist.
pub async fn find_card<C>(db: &C, card_id: i64) -> Result<card::Model>
where
    C: ConnectionTrait,
{
    Card::find_by_id(card_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found(format!("card {card_id}")))
}

/// Rejects cards whose expiration month is before `today`'s month.
pub(crate) fn ensure_not_expired(card: &card::Model, today: NaiveDate) -> Result<()> {
    let expiration = Expiration::parse(&card.expiration_date).ok_or_else(|| {
        Error::internal(format!(
            "card {} has malformed expiration date {:?}",
            card.id, card.expiration_date
        ))
    })?;
    if expiration.is_past(today) {
        return Err(Error::bad_request(format!(
            "card {} expired in {expiration}",
            card.id
        )));
    }
    Ok(())
}

fn duplicate_as_conflict(err: DbErr, employee_id: i64, category: Category) -> Error {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => Error::conflict(format!(
            "employee {employee_id} already has a {category} card"
        )),
        _ => Error::Database(err),
    }
}

impl CardService {
    pub(crate) fn today(&self) -> NaiveDate {
        self.clock.now().date_naive()
    }

    /// Issues a new unactivated card of `category` to an employee.
    ///
    /// # Errors
    /// - [`Error::Unauthorized`] for an unknown API key
    /// - [`Error::BadRequest`] for an unknown employee
    /// - [`Error::Conflict`] if the employee already has a card in `category`,
    ///   including when a concurrent creation wins the race
    #[instrument(skip(self, api_key))]
    pub async fn create_card(
        &self,
        api_key: &str,
        employee_id: i64,
        category: Category,
    ) -> Result<IssuedCard> {
        identity::resolve_company(&self.db, api_key).await?;
        let employee = identity::resolve_employee(&self.db, employee_id).await?;

        let existing = Card::find()
            .filter(card::Column::EmployeeId.eq(employee_id))
            .filter(card::Column::Category.eq(category))
            .one(&self.db)
            .await?;
        if existing.is_some() {
            return Err(Error::conflict(format!(
                "employee {employee_id} already has a {category} card"
            )));
        }

        let expiration = self
            .today()
            .checked_add_months(Months::new(VALIDITY_YEARS * 12))
            .map(Expiration::from_date)
            .ok_or_else(|| Error::internal("expiration date out of range"))?;
        let security_code = self.secrets.security_code();

        let card = card::ActiveModel {
            employee_id: Set(employee_id),
            number: Set(self.secrets.card_number()),
            cardholder_name: Set(cardholder_name(&employee.full_name)),
            security_code: Set(self.credentials.hash(&security_code).await?),
            expiration_date: Set(expiration.to_string()),
            password: Set(None),
            is_virtual: Set(false),
            is_blocked: Set(false),
            category: Set(category),
            ..Default::default()
        }
        .insert(&self.db)
        .await
        .map_err(|e| duplicate_as_conflict(e, employee_id, category))?;

        info!(card_id = card.id, employee_id, %category, "Card issued");
        Ok(IssuedCard {
            card,
            security_code,
        })
    }

    /// Activates a card by setting its password.
    ///
    /// Checks run in order, each short-circuiting: existence, expiry, already
    /// activated, security code, password format.
    ///
    /// # Errors
    /// - [`Error::NotFound`] for an unknown card
    /// - [`Error::BadRequest`] if the card is expired or already activated, or
    ///   the password is not exactly four characters
    /// - [`Error::Unauthorized`] if `cvc` does not match
    #[instrument(skip(self, cvc, password))]
    pub async fn activate_card(
        &self,
        card_id: i64,
        cvc: &str,
        password: &str,
    ) -> Result<card::Model> {
        let card = find_card(&self.db, card_id).await?;
        ensure_not_expired(&card, self.today())?;
        if card.is_activated() {
            return Err(Error::bad_request(format!(
                "card {card_id} is already activated"
            )));
        }
        if !self.credentials.verify(cvc, &card.security_code).await? {
            return Err(Error::unauthorized("security code does not match"));
        }
        if password.chars().count() != PASSWORD_LENGTH {
            return Err(Error::bad_request(format!(
                "password must be exactly {PASSWORD_LENGTH} characters"
            )));
        }

        let digest = self.credentials.hash(password).await?;
        // Conditional on the password still being unset, so a concurrent
        // activation that got here first cannot be overwritten
        let result = Card::update_many()
            .col_expr(card::Column::Password, Expr::value(digest))
            .filter(card::Column::Id.eq(card_id))
            .filter(card::Column::Password.is_null())
            .exec(&self.db)
            .await?;
        if result.rows_affected == 0 {
            return Err(Error::bad_request(format!(
                "card {card_id} is already activated"
            )));
        }

        let activated = find_card(&self.db, card_id).await?;
        info!(card_id, "Card activated");
        Ok(activated)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::errors::ErrorKind;
    use crate::test_utils::*;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    #[test]
    fn test_cardholder_name() {
        assert_eq!(cardholder_name("Fulano Rubens da Silva"), "FULANO R SILVA");
        assert_eq!(cardholder_name("Ciclana Maria Madeira"), "CICLANA M MADEIRA");
        assert_eq!(
            cardholder_name("Maria de la Cruz Fernandes Santos"),
            "MARIA C F SANTOS"
        );
        assert_eq!(cardholder_name("  Ana   Paula  Souza "), "ANA P SOUZA");
    }

    #[test]
    fn test_cardholder_name_keeps_short_anchors() {
        assert_eq!(cardholder_name("Bo Rubens Li"), "BO R LI");
    }

    #[test]
    fn test_cardholder_name_without_interior() {
        assert_eq!(cardholder_name("João Silva"), "JOÃO SILVA");
        assert_eq!(cardholder_name("João da Silva"), "JOÃO SILVA");
        assert_eq!(cardholder_name("Cher"), "CHER");
        assert_eq!(cardholder_name(""), "");
    }

    #[test]
    fn test_expiration_parse_and_format() {
        let expiration = Expiration::parse("03/29").unwrap();
        assert_eq!(expiration.month(), 3);
        assert_eq!(expiration.year(), 2029);
        assert_eq!(expiration.to_string(), "03/29");
        assert_eq!(Expiration::from_date(date(2031, 11, 2)).to_string(), "11/31");

        assert!(Expiration::parse("13/29").is_none());
        assert!(Expiration::parse("00/29").is_none());
        assert!(Expiration::parse("3/29").is_none());
        assert!(Expiration::parse("03-29").is_none());
        assert!(Expiration::parse("+3/29").is_none());
        assert!(Expiration::parse("").is_none());
    }

    #[test]
    fn test_expiration_is_month_granular() {
        let expiration = Expiration::parse("03/29").unwrap();
        assert!(!expiration.is_past(date(2029, 3, 1)));
        assert!(!expiration.is_past(date(2029, 3, 31)));
        assert!(expiration.is_past(date(2029, 4, 1)));
        assert!(expiration.is_past(date(2030, 1, 1)));
        assert!(!expiration.is_past(date(2028, 12, 31)));
    }

    #[tokio::test]
    async fn test_create_card() -> Result<()> {
        let service = setup_service().await?;

        let issued = service
            .create_card(TEST_API_KEY, TEST_EMPLOYEE_ID, Category::Groceries)
            .await?;
        let card = &issued.card;

        assert_eq!(card.employee_id, TEST_EMPLOYEE_ID);
        assert_eq!(card.number, TEST_CARD_NUMBER);
        assert_eq!(card.cardholder_name, "FULANO R SILVA");
        // Issued 2024-03-15, valid through March 2029
        assert_eq!(card.expiration_date, "03/29");
        assert_eq!(card.category, Category::Groceries);
        assert!(!card.is_activated());
        assert!(!card.is_blocked);
        assert!(!card.is_virtual);

        assert_eq!(issued.security_code, TEST_SECURITY_CODE);
        assert_ne!(card.security_code, TEST_SECURITY_CODE);
        assert!(
            service
                .credentials
                .verify(TEST_SECURITY_CODE, &card.security_code)
                .await?
        );

        assert_eq!(find_card(service.database(), card.id).await?, *card);
        Ok(())
    }

    #[tokio::test]
    async fn test_issued_card_debug_hides_code() -> Result<()> {
        let service = setup_service().await?;
        let issued = issue_test_card(&service, Category::Health).await?;
        assert!(!format!("{issued:?}").contains(TEST_SECURITY_CODE));
        Ok(())
    }

    #[tokio::test]
    async fn test_create_card_unknown_api_key() -> Result<()> {
        let service = setup_service().await?;
        let err = service
            .create_card("bogus", TEST_EMPLOYEE_ID, Category::Groceries)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthorized);
        assert!(Card::find().all(service.database()).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_create_card_unknown_employee() -> Result<()> {
        let service = setup_service().await?;
        let err = service
            .create_card(TEST_API_KEY, 999, Category::Groceries)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadRequest);
        Ok(())
    }

    #[tokio::test]
    async fn test_create_card_conflict() -> Result<()> {
        let service = setup_service().await?;
        issue_test_card(&service, Category::Groceries).await?;

        let err = service
            .create_card(TEST_API_KEY, TEST_EMPLOYEE_ID, Category::Groceries)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);

        // Other categories and other employees are unaffected
        service
            .create_card(TEST_API_KEY, TEST_EMPLOYEE_ID, Category::Restaurant)
            .await?;
        let other = service
            .create_card(TEST_API_KEY, SECOND_EMPLOYEE_ID, Category::Groceries)
            .await?;
        assert_eq!(other.card.cardholder_name, "CICLANA M MADEIRA");

        assert_eq!(Card::find().all(service.database()).await?.len(), 3);
        Ok(())
    }

    #[tokio::test]
    async fn test_concurrent_create_only_one_succeeds() -> Result<()> {
        let service = setup_service().await?;

        let (first, second) = tokio::join!(
            service.create_card(TEST_API_KEY, TEST_EMPLOYEE_ID, Category::Transport),
            service.create_card(TEST_API_KEY, TEST_EMPLOYEE_ID, Category::Transport),
        );

        let outcomes = [first, second];
        assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
        let failure = outcomes.iter().find_map(|r| r.as_ref().err()).unwrap();
        assert_eq!(failure.kind(), ErrorKind::Conflict);

        assert_eq!(Card::find().all(service.database()).await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_unique_index_rejects_duplicate_insert() -> Result<()> {
        let service = setup_service().await?;
        let issued = issue_test_card(&service, Category::Education).await?;

        // Bypass the pre-check to hit the store constraint directly
        let mut duplicate = card::ActiveModel::from(issued.card).reset_all();
        duplicate.id = sea_orm::ActiveValue::NotSet;
        let err = duplicate
            .insert(service.database())
            .await
            .map_err(|e| duplicate_as_conflict(e, TEST_EMPLOYEE_ID, Category::Education))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        Ok(())
    }

    #[tokio::test]
    async fn test_activate_card() -> Result<()> {
        let service = setup_service().await?;
        let issued = issue_test_card(&service, Category::Groceries).await?;

        let card = service
            .activate_card(issued.card.id, TEST_SECURITY_CODE, TEST_PASSWORD)
            .await?;

        assert!(card.is_activated());
        let digest = card.password.as_deref().unwrap();
        assert_ne!(digest, TEST_PASSWORD);
        assert!(service.credentials.verify(TEST_PASSWORD, digest).await?);
        Ok(())
    }

    #[tokio::test]
    async fn test_activate_unknown_card() -> Result<()> {
        let service = setup_service().await?;
        let err = service
            .activate_card(999, TEST_SECURITY_CODE, TEST_PASSWORD)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        Ok(())
    }

    #[tokio::test]
    async fn test_activate_is_one_way() -> Result<()> {
        let service = setup_service().await?;
        let card = issue_activated_card(&service, Category::Groceries).await?;

        // Correct credentials still rejected
        let err = service
            .activate_card(card.id, TEST_SECURITY_CODE, "9999")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadRequest);

        // Wrong credentials report the lifecycle error, not the credential one
        let err = service
            .activate_card(card.id, "000", "9999")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadRequest);

        // The original password is untouched
        let stored = find_card(service.database(), card.id).await?;
        assert_eq!(stored.password, card.password);
        Ok(())
    }

    #[tokio::test]
    async fn test_activate_wrong_security_code() -> Result<()> {
        let service = setup_service().await?;
        let issued = issue_test_card(&service, Category::Groceries).await?;

        let err = service
            .activate_card(issued.card.id, "999", TEST_PASSWORD)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthorized);

        // Credential is checked before password format
        let err = service
            .activate_card(issued.card.id, "999", "12")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthorized);

        assert!(!find_card(service.database(), issued.card.id).await?.is_activated());
        Ok(())
    }

    #[tokio::test]
    async fn test_activate_password_format() -> Result<()> {
        let service = setup_service().await?;
        let issued = issue_test_card(&service, Category::Groceries).await?;

        for password in ["", "123", "12345"] {
            let err = service
                .activate_card(issued.card.id, TEST_SECURITY_CODE, password)
                .await
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::BadRequest, "password {password:?}");
        }
        assert!(!find_card(service.database(), issued.card.id).await?.is_activated());

        // Four characters, counted as characters rather than bytes
        service
            .activate_card(issued.card.id, TEST_SECURITY_CODE, "ção1")
            .await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_activate_expired_card() -> Result<()> {
        let service = setup_service().await?;
        let issued = issue_test_card(&service, Category::Groceries).await?;

        let still_valid = service_at(service.database(), FixedClock::on(2029, 3, 31));
        let expired = service_at(service.database(), FixedClock::on(2029, 4, 1));

        let err = expired
            .activate_card(issued.card.id, TEST_SECURITY_CODE, TEST_PASSWORD)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadRequest);

        still_valid
            .activate_card(issued.card.id, TEST_SECURITY_CODE, TEST_PASSWORD)
            .await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_concurrent_activation_only_one_succeeds() -> Result<()> {
        let service = setup_service().await?;
        let issued = issue_test_card(&service, Category::Groceries).await?;

        let (first, second) = tokio::join!(
            service.activate_card(issued.card.id, TEST_SECURITY_CODE, "1111"),
            service.activate_card(issued.card.id, TEST_SECURITY_CODE, "2222"),
        );

        let outcomes = [first, second];
        assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
        let failure = outcomes.iter().find_map(|r| r.as_ref().err()).unwrap();
        assert_eq!(failure.kind(), ErrorKind::BadRequest);
        Ok(())
    }

    #[tokio::test]
    async fn test_malformed_stored_expiration_is_internal() -> Result<()> {
        let service = setup_service().await?;
        let issued = issue_test_card(&service, Category::Groceries).await?;

        let mut corrupt: card::ActiveModel = issued.card.into();
        corrupt.expiration_date = Set("2029-03".to_string());
        let corrupt = corrupt.update(service.database()).await?;

        let err = service
            .activate_card(corrupt.id, TEST_SECURITY_CODE, TEST_PASSWORD)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Internal);
        Ok(())
    }
}
