/// Database connection and schema management
pub mod database;

/// Settings file: credential work factor and seed directory
pub mod settings;

pub use settings::{AppConfig, CredentialSettings, load_app_configuration};
