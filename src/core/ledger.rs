//! Ledger engine - recharges, payments and derived balances.
//!
//! A card's balance is never stored. It is recomputed from the complete
//! recharge and payment history every time it is needed:
//! `balance = sum(recharges) - sum(payments)`.
//!
//! A payment reads the ledger and appends to it. Both steps run inside one
//! database transaction while holding the card's lock, so two concurrent
//! payments cannot both spend the same funds.

use super::{
    card::{ensure_not_expired, find_card},
    identity,
    service::CardService,
};
use crate::{
    entities::{Payment, Recharge, payment, recharge},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use serde::Serialize;
use tracing::{info, instrument};

/// Balance and full ledger history of one card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CardStatement {
    /// Card the statement belongs to
    pub card_id: i64,
    /// Derived balance in cents
    pub balance: i64,
    /// Recharges in insertion order
    pub recharges: Vec<recharge::Model>,
    /// Payments in insertion order
    pub payments: Vec<payment::Model>,
}

fn ensure_positive(amount: i64) -> Result<()> {
    if amount <= 0 {
        return Err(Error::bad_request(format!(
            "amount must be positive, got {amount}"
        )));
    }
    Ok(())
}

fn total(amounts: impl IntoIterator<Item = i64>) -> Result<i64> {
    amounts
        .into_iter()
        .try_fold(0_i64, i64::checked_add)
        .ok_or_else(|| Error::internal("ledger total overflows"))
}

fn balance_of(recharges: &[recharge::Model], payments: &[payment::Model]) -> Result<i64> {
    let credited = total(recharges.iter().map(|r| r.amount))?;
    let debited = total(payments.iter().map(|p| p.amount))?;
    credited
        .checked_sub(debited)
        .ok_or_else(|| Error::internal("ledger balance overflows"))
}

async fn load_ledger<C>(
    db: &C,
    card_id: i64,
) -> Result<(Vec<recharge::Model>, Vec<payment::Model>)>
where
    C: ConnectionTrait,
{
    let recharges = Recharge::find()
        .filter(recharge::Column::CardId.eq(card_id))
        .order_by_asc(recharge::Column::Id)
        .all(db)
        .await?;
    let payments = Payment::find()
        .filter(payment::Column::CardId.eq(card_id))
        .order_by_asc(payment::Column::Id)
        .all(db)
        .await?;
    Ok((recharges, payments))
}

/// Recomputes a card's balance from its full ledger.
///
/// Accepts a connection or an open transaction; inside a transaction the
/// result is consistent with writes made in that transaction.
pub async fn ledger_balance<C>(db: &C, card_id: i64) -> Result<i64>
where
    C: ConnectionTrait,
{
    let (recharges, payments) = load_ledger(db, card_id).await?;
    balance_of(&recharges, &payments)
}

impl CardService {
    /// Credits an activated card on behalf of a company.
    ///
    /// # Errors
    /// - [`Error::Unauthorized`] for an unknown API key, whatever the amount
    /// - [`Error::BadRequest`] for a non-positive amount, an expired card or a
    ///   card that has not been activated yet
    /// - [`Error::NotFound`] for an unknown card
    #[instrument(skip(self, api_key))]
    pub async fn recharge(
        &self,
        api_key: &str,
        card_id: i64,
        amount: i64,
    ) -> Result<recharge::Model> {
        identity::resolve_company(&self.db, api_key).await?;
        ensure_positive(amount)?;
        let card = find_card(&self.db, card_id).await?;
        ensure_not_expired(&card, self.today())?;
        if !card.is_activated() {
            return Err(Error::bad_request(format!(
                "card {card_id} is not activated"
            )));
        }

        let entry = recharge::ActiveModel {
            card_id: Set(card_id),
            amount: Set(amount),
            timestamp: Set(self.clock.now()),
            ..Default::default()
        }
        .insert(&self.db)
        .await?;

        info!(card_id, amount, recharge_id = entry.id, "Recharge recorded");
        Ok(entry)
    }

    /// Pays `amount` from a card to a business of the same category.
    ///
    /// Checks run in order: card exists, not expired, password matches (an
    /// unactivated card never matches), business exists, categories agree,
    /// balance covers the amount.
    ///
    /// # Errors
    /// - [`Error::BadRequest`] for a non-positive amount, an expired card, a
    ///   category mismatch or insufficient balance
    /// - [`Error::NotFound`] for an unknown card or business
    /// - [`Error::Unauthorized`] for a wrong password
    #[instrument(skip(self, password))]
    pub async fn pay(
        &self,
        card_id: i64,
        password: &str,
        business_id: i64,
        amount: i64,
    ) -> Result<payment::Model> {
        ensure_positive(amount)?;
        let card = find_card(&self.db, card_id).await?;
        ensure_not_expired(&card, self.today())?;
        if !self
            .credentials
            .verify_optional(password, card.password.as_deref())
            .await?
        {
            return Err(Error::unauthorized("password does not match"));
        }
        let business = identity::resolve_business(&self.db, business_id).await?;
        if business.category != card.category {
            return Err(Error::bad_request(format!(
                "{} card cannot pay a {} business",
                card.category, business.category
            )));
        }

        let _guard = self.card_locks.acquire(card_id).await;
        let txn = self.db.begin().await?;

        let balance = ledger_balance(&txn, card_id).await?;
        if balance < amount {
            return Err(Error::bad_request(format!(
                "insufficient balance: {balance} available, {amount} requested"
            )));
        }

        let entry = payment::ActiveModel {
            card_id: Set(card_id),
            business_id: Set(business_id),
            amount: Set(amount),
            timestamp: Set(self.clock.now()),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        txn.commit().await?;

        info!(
            card_id,
            business_id,
            amount,
            remaining = balance - amount,
            "Payment recorded"
        );
        Ok(entry)
    }

    /// Current balance of a card.
    ///
    /// # Errors
    /// [`Error::NotFound`] for an unknown card.
    pub async fn card_balance(&self, card_id: i64) -> Result<i64> {
        find_card(&self.db, card_id).await?;
        ledger_balance(&self.db, card_id).await
    }

    /// Balance together with every recharge and payment of a card, read from
    /// one consistent snapshot.
    ///
    /// # Errors
    /// [`Error::NotFound`] for an unknown card.
    pub async fn card_statement(&self, card_id: i64) -> Result<CardStatement> {
        let txn = self.db.begin().await?;
        find_card(&txn, card_id).await?;
        let (recharges, payments) = load_ledger(&txn, card_id).await?;
        txn.commit().await?;

        Ok(CardStatement {
            card_id,
            balance: balance_of(&recharges, &payments)?,
            recharges,
            payments,
        })
    }
}
