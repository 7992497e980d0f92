//! Seed the database with a demo dataset.
//!
//! The bundled `seed/demo.yaml` gives a working Austin marketplace: one zone,
//! a live driver with a small catalog, a buyer with a delivered order, and a
//! few lounge messages. Running it twice changes nothing.

use std::collections::HashMap;
use std::path::Path;

use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::PgPool;
use tracing::info;

use openweed_core::geo::zips_in_region;
use openweed_core::ordering::LineRequest;
use openweed_core::{
    DriverHandle, Email, MessageType, OrderStatus, ProductCategory, ProductId, UserRole,
};
use openweed_storefront::db::{
    ChatRepository, DriverRepository, OrderFilter, OrderRepository, OrderRequest,
    ProductFilter, ProductRepository, UserRepository, ZoneRepository,
};
use openweed_storefront::models::{
    Driver, DriverChanges, NewDriver, NewProduct, NewZone, OrderChanges, User,
};
use openweed_storefront::services::auth::hash_password;

use super::{CliError, connect};

const BUNDLED_DEMO: &str = include_str!("../../seed/demo.yaml");

/// How many recent lounge messages are checked for duplicates.
const MESSAGE_LOOKBACK: i64 = 200;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DemoData {
    #[serde(default)]
    zones: Vec<NewZone>,
    #[serde(default)]
    users: Vec<SeedUser>,
    #[serde(default)]
    drivers: Vec<SeedDriver>,
    #[serde(default)]
    orders: Vec<SeedOrder>,
    #[serde(default)]
    messages: Vec<SeedMessage>,
}

#[derive(Debug, Deserialize)]
struct SeedUser {
    email: String,
    name: String,
    #[serde(default)]
    role: UserRole,
    password: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SeedDriver {
    owner: String,
    handle: String,
    region: String,
    bio: Option<String>,
    license: Option<String>,
    #[serde(default)]
    products: Vec<SeedProduct>,
}

#[derive(Debug, Deserialize)]
struct SeedProduct {
    name: String,
    description: Option<String>,
    category: ProductCategory,
    price: Decimal,
    stock: i32,
    thc: Option<f64>,
    cbd: Option<f64>,
    strain: Option<String>,
    photo: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SeedOrder {
    buyer: String,
    driver: String,
    delivery_address: String,
    notes: Option<String>,
    #[serde(default)]
    status: OrderStatus,
    items: Vec<SeedLine>,
}

#[derive(Debug, Deserialize)]
struct SeedLine {
    product: String,
    quantity: i32,
}

#[derive(Debug, Deserialize)]
struct SeedMessage {
    author: String,
    room: String,
    message: String,
}

/// Seeding state carried between sections, keyed the way the YAML refers to rows.
#[derive(Default)]
struct Seeded {
    users: HashMap<String, User>,
    drivers: HashMap<String, Driver>,
    /// `(handle, product name)` to product id.
    products: HashMap<(String, String), ProductId>,
}

/// Load the demo dataset, from `file` or the bundled YAML.
///
/// # Errors
///
/// Returns `CliError` if the file can't be read or parsed, references an
/// unknown account, driver, or product, or a database write fails.
pub async fn demo(file: Option<&str>) -> Result<(), CliError> {
    let content = match file {
        Some(path) => {
            info!(path, "Loading seed data from file");
            tokio::fs::read_to_string(Path::new(path))
                .await
                .map_err(|source| CliError::SeedFile {
                    path: path.to_owned(),
                    source,
                })?
        }
        None => BUNDLED_DEMO.to_owned(),
    };
    let data = parse(&content)?;

    let pool = connect().await?;
    let mut seeded = Seeded::default();

    seed_zones(&pool, data.zones).await?;
    seed_users(&pool, &data.users, &mut seeded).await?;
    seed_drivers(&pool, &data.drivers, &mut seeded).await?;
    seed_orders(&pool, &data.orders, &seeded).await?;
    seed_messages(&pool, &data.messages, &seeded).await?;

    info!("Seeding complete!");
    Ok(())
}

fn parse(content: &str) -> Result<DemoData, CliError> {
    serde_yaml::from_str(content).map_err(|e| CliError::SeedData(e.to_string()))
}

/// Fill in an empty ZIP list from the built-in table.
fn with_default_zips(mut zone: NewZone) -> NewZone {
    if zone.zip_codes.is_empty() {
        zone.zip_codes = zips_in_region(&zone.key)
            .into_iter()
            .map(String::from)
            .collect();
    }
    zone
}

async fn seed_zones(pool: &PgPool, zones: Vec<NewZone>) -> Result<(), CliError> {
    let repo = ZoneRepository::new(pool);
    for zone in zones.into_iter().map(with_default_zips) {
        let zone = repo.upsert(&zone).await?;
        info!(key = %zone.key, zips = zone.zip_codes.len(), "Zone ready");
    }
    Ok(())
}

async fn seed_users(
    pool: &PgPool,
    users: &[SeedUser],
    seeded: &mut Seeded,
) -> Result<(), CliError> {
    let repo = UserRepository::new(pool);
    for seed in users {
        let email =
            Email::parse(&seed.email).map_err(|_| CliError::InvalidEmail(seed.email.clone()))?;

        let user = if let Some((user, _)) = repo.get_with_password_hash(&email).await? {
            info!(email = %email, "Account exists, skipping");
            user
        } else {
            let password_hash = seed.password.as_deref().map(hash_password).transpose()?;
            let user = repo
                .create(&seed.name, &email, password_hash.as_deref(), seed.role)
                .await?;
            info!(email = %email, role = %user.role, "Account created");
            user
        };
        seeded.users.insert(seed.email.to_ascii_lowercase(), user);
    }
    Ok(())
}

fn lookup_user<'s>(seeded: &'s Seeded, email: &str) -> Result<&'s User, CliError> {
    seeded
        .users
        .get(&email.to_ascii_lowercase())
        .ok_or_else(|| CliError::UnknownUser(email.to_owned()))
}

async fn seed_drivers(
    pool: &PgPool,
    drivers: &[SeedDriver],
    seeded: &mut Seeded,
) -> Result<(), CliError> {
    let repo = DriverRepository::new(pool);
    for seed in drivers {
        let handle =
            DriverHandle::parse(&seed.handle).map_err(|e| CliError::SeedData(e.to_string()))?;

        let driver = if let Some(driver) = repo.get_by_handle(handle.as_str()).await? {
            info!(handle = %handle, "Driver exists, skipping");
            driver
        } else {
            let owner = lookup_user(seeded, &seed.owner)?;
            let new = NewDriver {
                user_id: owner.id,
                handle: handle.clone(),
                region: seed.region.trim().to_ascii_lowercase(),
                bio: seed.bio.clone(),
                license: seed.license.clone(),
            };
            let (driver, _) = repo.create_and_promote(&new).await?;
            // Demo drivers go straight to live
            let live = DriverChanges {
                is_active: Some(true),
                is_verified: Some(true),
                ..DriverChanges::default()
            };
            let driver = repo.update(driver.id, &live).await?;
            info!(handle = %handle, "Driver created");
            driver
        };

        seed_products(pool, &driver, &seed.products, seeded).await?;
        seeded.drivers.insert(handle.as_str().to_owned(), driver);
    }
    Ok(())
}

async fn seed_products(
    pool: &PgPool,
    driver: &Driver,
    products: &[SeedProduct],
    seeded: &mut Seeded,
) -> Result<(), CliError> {
    let repo = ProductRepository::new(pool);
    let existing = repo
        .search(&ProductFilter {
            driver_id: Some(driver.id),
            ..ProductFilter::default()
        })
        .await?;

    for seed in products {
        let id = if let Some(listing) = existing.iter().find(|l| l.product.name == seed.name) {
            listing.product.id
        } else {
            let product = repo
                .create(&NewProduct {
                    driver_id: driver.id,
                    name: seed.name.clone(),
                    description: seed.description.clone(),
                    category: seed.category,
                    price: seed.price,
                    photo: seed.photo.clone(),
                    stock: seed.stock,
                    thc: seed.thc,
                    cbd: seed.cbd,
                    strain: seed.strain.clone(),
                })
                .await?;
            info!(handle = %driver.handle, product = %product.name, "Product created");
            product.id
        };
        seeded
            .products
            .insert((driver.handle.as_str().to_owned(), seed.name.clone()), id);
    }
    Ok(())
}

async fn seed_orders(pool: &PgPool, orders: &[SeedOrder], seeded: &Seeded) -> Result<(), CliError> {
    let repo = OrderRepository::new(pool);
    for seed in orders {
        let buyer = lookup_user(seeded, &seed.buyer)?;
        let driver = seeded
            .drivers
            .get(&seed.driver)
            .ok_or_else(|| CliError::SeedData(format!("unknown driver: {}", seed.driver)))?;

        let existing = repo
            .list(OrderFilter {
                buyer_id: Some(buyer.id),
                driver_id: Some(driver.id),
                status: None,
            })
            .await?;
        if !existing.is_empty() {
            info!(buyer = %buyer.email, driver = %driver.handle, "Order exists, skipping");
            continue;
        }

        let lines = seed
            .items
            .iter()
            .map(|line| {
                seeded
                    .products
                    .get(&(seed.driver.clone(), line.product.clone()))
                    .map(|&product_id| LineRequest {
                        product_id,
                        quantity: line.quantity,
                    })
                    .ok_or_else(|| CliError::SeedData(format!("unknown product: {}", line.product)))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let placed = repo
            .place(&OrderRequest {
                buyer_id: buyer.id,
                driver_id: driver.id,
                lines,
                delivery_address: seed.delivery_address.clone(),
                notes: seed.notes.clone(),
            })
            .await?;

        // Walk the delivery path one step at a time up to the seeded status
        let mut status = placed.order.status;
        while status != seed.status {
            let next = if seed.status == OrderStatus::Cancelled {
                Some(OrderStatus::Cancelled)
            } else {
                status.next()
            };
            let Some(next) = next else { break };
            let changes = OrderChanges {
                status: Some(next),
                ..OrderChanges::default()
            };
            status = repo.update(placed.order.id, &changes).await?.status;
        }

        info!(
            order = %placed.order.id,
            total = %placed.order.total,
            status = %status,
            "Order created"
        );
    }
    Ok(())
}

async fn seed_messages(
    pool: &PgPool,
    messages: &[SeedMessage],
    seeded: &Seeded,
) -> Result<(), CliError> {
    let repo = ChatRepository::new(pool);
    let mut posted = 0_usize;
    for seed in messages {
        let author = lookup_user(seeded, &seed.author)?;
        let history = repo.recent(&seed.room, MESSAGE_LOOKBACK, None).await?;
        if history
            .iter()
            .any(|m| m.user_id == author.id && m.message == seed.message)
        {
            continue;
        }
        repo.post(author.id, &seed.room, &seed.message, MessageType::Text)
            .await?;
        posted += 1;
    }
    info!(posted, skipped = messages.len() - posted, "Lounge messages ready");
    Ok(())
}
