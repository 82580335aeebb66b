//! Application settings loaded from `config.toml`.
//!
//! The file holds the credential work factor and the directory of companies,
//! employees and businesses to seed on start. Every section is optional.

use crate::entities::Category;
use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;

/// Environment variable naming the settings file.
pub const CONFIG_PATH_ENV: &str = "BENEFIT_CARDS_CONFIG";

/// Settings file used when [`CONFIG_PATH_ENV`] is not set.
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Structure of the whole settings file
#[derive(Debug, Default, Deserialize)]
pub struct AppConfig {
    /// Work factor for secret hashing
    #[serde(default)]
    pub credentials: CredentialSettings,
    /// Companies to seed
    #[serde(default)]
    pub companies: Vec<CompanySeed>,
    /// Employees to seed
    #[serde(default)]
    pub employees: Vec<EmployeeSeed>,
    /// Businesses to seed
    #[serde(default)]
    pub businesses: Vec<BusinessSeed>,
}

/// Argon2 cost parameters.
///
/// Defaults follow the OWASP baseline for Argon2id (19 MiB, 2 passes, 1 lane).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CredentialSettings {
    /// Memory cost in KiB
    pub memory_kib: u32,
    /// Number of passes
    pub iterations: u32,
    /// Degree of parallelism
    pub parallelism: u32,
}

impl Default for CredentialSettings {
    fn default() -> Self {
        Self {
            memory_kib: 19 * 1024,
            iterations: 2,
            parallelism: 1,
        }
    }
}

/// A company entry in the seed directory
#[derive(Debug, Clone, Deserialize)]
pub struct CompanySeed {
    /// Fixed identifier
    pub id: i64,
    /// Company name
    pub name: String,
    /// Key the company authenticates with
    pub api_key: String,
}

/// An employee entry in the seed directory
#[derive(Debug, Clone, Deserialize)]
pub struct EmployeeSeed {
    /// Fixed identifier
    pub id: i64,
    /// Full registered name
    pub full_name: String,
    /// Contact email
    pub email: String,
    /// Employing company id
    pub company_id: i64,
}

/// A business entry in the seed directory
#[derive(Debug, Clone, Deserialize)]
pub struct BusinessSeed {
    /// Fixed identifier
    pub id: i64,
    /// Business name
    pub name: String,
    /// Category the business sells in
    pub category: Category,
}

/// Loads settings from a TOML file
///
/// # Errors
/// Returns [`Error::Config`] if the file cannot be read or is not valid TOML
/// for [`AppConfig`].
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let path_ref = path.as_ref();
    tracing::debug!("Attempting to load configuration from: {:?}", path_ref);
    let contents = std::fs::read_to_string(path_ref).map_err(|e| Error::Config {
        message: format!("Failed to read config file {}: {e}", path_ref.display()),
    })?;

    toml::from_str(&contents).map_err(|e| Error::Config {
        message: format!("Failed to parse {}: {e}", path_ref.display()),
    })
}

/// Loads settings from `BENEFIT_CARDS_CONFIG`, or `./config.toml`.
///
/// A missing default file is not an error: built-in defaults with an empty
/// directory are returned. A missing file named explicitly through the
/// environment is reported.
pub fn load_app_configuration() -> Result<AppConfig> {
    match std::env::var(CONFIG_PATH_ENV) {
        Ok(path) => load_config(path),
        Err(_) if Path::new(DEFAULT_CONFIG_PATH).exists() => load_config(DEFAULT_CONFIG_PATH),
        Err(_) => {
            tracing::info!("No {DEFAULT_CONFIG_PATH} found, using built-in defaults");
            Ok(AppConfig::default())
        }
    }
}
