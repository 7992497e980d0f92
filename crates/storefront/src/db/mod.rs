//! Database access for the marketplace.
//!
//! # Schema: `marketplace`
//!
//! - `user_account` - buyers, drivers, and admins
//! - `driver_profile` - one storefront per driver account
//! - `product` - driver catalogs
//! - `customer_order` / `order_item` - orders with purchase-time prices
//! - `chat_message` - lounge history
//! - `zone` - service areas
//!
//! The `tower_sessions` table is owned by the session store.
//!
//! # Migrations
//!
//! Migrations live in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p openweed-cli -- migrate
//! ```
//!
//! Queries are built at runtime with `sqlx::query_as::<_, Row>` so the crate
//! builds without a live database or an offline query cache.

pub mod chat;
pub mod drivers;
pub mod orders;
pub mod products;
pub mod stats;
pub mod users;
pub mod zones;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use chat::ChatRepository;
pub use drivers::DriverRepository;
pub use orders::{OrderFilter, OrderRepository, OrderRequest, OrderUpdateError, PlaceOrderError};
pub use products::{ProductFilter, ProductRepository};
pub use stats::StatsRepository;
pub use users::UserRepository;
pub use zones::ZoneRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored value no longer parses as its domain type.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    #[error("not found")]
    NotFound,

    /// Constraint violation; carries the constraint name when Postgres reports one.
    #[error("constraint violation: {0}")]
    Conflict(String),
}

impl RepositoryError {
    /// Map unique violations to [`RepositoryError::Conflict`].
    pub(crate) fn from_write(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db_err) = err
            && db_err.is_unique_violation()
        {
            return Self::Conflict(db_err.constraint().unwrap_or("unique").to_owned());
        }
        Self::Database(err)
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
