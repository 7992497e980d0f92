//! Domain models returned by repositories and serialized by the JSON API.
//!
//! Field names serialize as camelCase to match the browser client.

pub mod chat;
pub mod driver;
pub mod order;
pub mod product;
pub mod session;
pub mod stats;
pub mod user;
pub mod zone;

pub use chat::{ChatAuthor, ChatMessage};
pub use driver::{Driver, DriverChanges, DriverDetail, DriverListing, DriverOwner, NewDriver};
pub use order::{
    Order, OrderChanges, OrderDetail, OrderDriver, OrderItemDetail, OrderParty,
};
pub use product::{NewProduct, Product, ProductChanges, ProductDriver, ProductListing, ProductSummary};
pub use session::{CurrentUser, keys as session_keys};
pub use stats::{Analytics, DashboardStats, MonthlyRevenue, RegionCount, TopProduct};
pub use user::User;
pub use zone::{NewZone, Zone, ZoneChanges};
