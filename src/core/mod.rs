//! Core business logic - card lifecycle, ledger and the checks guarding them.
//!
//! Operations are methods on [`CardService`]; the identity gate and ledger
//! queries are also exposed as free functions generic over
//! `sea_orm::ConnectionTrait` so they run on a connection or in a transaction.

/// Card creation, activation and expiry
pub mod card;
/// Secret hashing and verification
pub mod credential;
/// Company, employee and business lookups; directory seeding
pub mod identity;
/// Recharges, payments and derived balances
pub mod ledger;
/// Clock and secret generator capabilities
pub mod providers;
/// Service context shared by all operations
pub mod service;

pub use card::{Expiration, IssuedCard, cardholder_name};
pub use credential::CredentialService;
pub use ledger::CardStatement;
pub use providers::{Clock, RandomSecretGenerator, SecretGenerator, SystemClock};
pub use service::CardService;
