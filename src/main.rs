use benefit_cards::{
    config::{self, database},
    core::{CardService, CredentialService, identity},
    errors::Result,
};
use dotenvy::dotenv;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; env vars can also be set externally
    dotenv().ok();
    info!("Attempted to load .env file.");

    // 3. Load settings (credential work factor and seed directory)
    let app_config = config::load_app_configuration()
        .inspect_err(|e| error!("Failed to load configuration: {}", e))?;
    let credentials = CredentialService::new(&app_config.credentials)
        .inspect_err(|e| error!("Invalid credential settings: {}", e))?;

    // 4. Connect and ensure the schema
    let db = database::create_connection()
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    database::create_tables(&db)
        .await
        .inspect_err(|e| error!("Failed to create tables: {}", e))?;

    // 5. Seed companies, employees and businesses that are not present yet
    identity::seed_directory(&db, &app_config)
        .await
        .inspect_err(|e| error!("Failed to seed directory: {}", e))?;

    let service = CardService::with_system_defaults(db, credentials);
    info!(?service, "Card service ready");

    Ok(())
}
