//! The card service: shared context for every card operation.
//!
//! It owns the database handle and the injected capabilities (credentials,
//! clock, secret generator). Lifecycle operations live in [`super::card`],
//! ledger operations in [`super::ledger`].

use super::{
    credential::CredentialService,
    providers::{Clock, RandomSecretGenerator, SecretGenerator, SystemClock},
};
use dashmap::DashMap;
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Per-card mutual exclusion for read-then-write ledger sequences.
///
/// A payment reads the ledger, checks the balance and appends. Two payments on
/// the same card must not interleave those steps or both could pass the
/// balance check. Guards are held across `.await`, hence `tokio::sync::Mutex`.
///
/// Only cards with a holder or a waiter have an entry; the last guard to be
/// released removes it.
#[derive(Debug, Default)]
pub struct CardLocks {
    locks: DashMap<i64, Arc<Mutex<()>>>,
}

impl CardLocks {
    /// Waits until no other holder has `card_id` and returns the guard.
    pub async fn acquire(&self, card_id: i64) -> CardLockGuard<'_> {
        // Clone the Arc out so the map shard is released before awaiting
        let lock = Arc::clone(self.locks.entry(card_id).or_default().value());
        CardLockGuard {
            locks: self,
            card_id,
            guard: Some(lock.lock_owned().await),
        }
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.locks.len()
    }
}

/// Exclusive hold on one card, released on drop.
#[derive(Debug)]
pub struct CardLockGuard<'a> {
    locks: &'a CardLocks,
    card_id: i64,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for CardLockGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        // Waiters hold their own clone of the Arc, so a count of one means
        // only the map still refers to the lock
        self.locks
            .locks
            .remove_if(&self.card_id, |_, lock| Arc::strong_count(lock) == 1);
    }
}

/// Entry point for create, activate, recharge and payment.
pub struct CardService {
    pub(crate) db: DatabaseConnection,
    pub(crate) credentials: CredentialService,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) secrets: Arc<dyn SecretGenerator>,
    pub(crate) card_locks: CardLocks,
}

impl CardService {
    /// Creates a service with explicit capabilities.
    #[must_use]
    pub fn new(
        db: DatabaseConnection,
        credentials: CredentialService,
        clock: Arc<dyn Clock>,
        secrets: Arc<dyn SecretGenerator>,
    ) -> Self {
        Self {
            db,
            credentials,
            clock,
            secrets,
            card_locks: CardLocks::default(),
        }
    }

    /// Creates a service using the wall clock and random card secrets.
    #[must_use]
    pub fn with_system_defaults(db: DatabaseConnection, credentials: CredentialService) -> Self {
        Self::new(
            db,
            credentials,
            Arc::new(SystemClock),
            Arc::new(RandomSecretGenerator),
        )
    }

    /// The underlying database connection.
    #[must_use]
    pub const fn database(&self) -> &DatabaseConnection {
        &self.db
    }
}

impl std::fmt::Debug for CardService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CardService")
            .field("credentials", &self.credentials)
            .finish_non_exhaustive()
    }
}
