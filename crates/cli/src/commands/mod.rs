//! Subcommand implementations.

pub mod migrate;
pub mod seed;
pub mod user;

use secrecy::SecretString;
use sqlx::PgPool;
use thiserror::Error;

use openweed_storefront::db::{self, OrderUpdateError, PlaceOrderError, RepositoryError};
use openweed_storefront::services::auth::AuthError;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("{0}")]
    Repository(#[from] RepositoryError),

    #[error("{0}")]
    Auth(#[from] AuthError),

    #[error("Could not place order: {0}")]
    PlaceOrder(#[from] PlaceOrderError),

    #[error("Could not update order: {0}")]
    OrderUpdate(#[from] OrderUpdateError),

    #[error("Invalid role: {0}. Valid roles: buyer, driver, admin")]
    InvalidRole(String),

    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    #[error("Account already exists with email: {0}")]
    UserExists(String),

    #[error("No account with email: {0}")]
    UnknownUser(String),

    #[error("Could not read seed file {path}: {source}")]
    SeedFile {
        path: String,
        source: std::io::Error,
    },

    #[error("Invalid seed data: {0}")]
    SeedData(String),
}

/// Connect using `OPENWEED_DATABASE_URL`, falling back to `DATABASE_URL`.
async fn connect() -> Result<PgPool, CliError> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("OPENWEED_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| CliError::MissingEnvVar("OPENWEED_DATABASE_URL"))?;

    tracing::info!("Connecting to database...");
    Ok(db::create_pool(&database_url).await?)
}
