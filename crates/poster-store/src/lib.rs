//! # poster-store
//!
//! Catalog and purchase persistence for the poster shop.
//!
//! Two tables are read and written: `posters` (the catalog) and `purchases`
//! (one row per completed checkout session). Both live behind the
//! [`CatalogStore`] and [`PurchaseStore`] traits so handlers can run against
//! PostgreSQL in production and [`MemoryStore`] in tests or local development.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use poster_store::{NewPurchase, PgStore, PurchaseStore};
//!
//! let store = PgStore::connect("postgres://localhost/posters", 5).await?;
//!
//! let outcome = store.insert_if_absent(&NewPurchase::completed("cs_test_123", poster_id)).await?;
//! if outcome.is_created() {
//!     // first delivery for this session
//! }
//! ```

mod error;
mod memory;
mod model;
mod postgres;
mod store;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use model::{
    InsertOutcome, NewPurchase, Poster, PosterSummary, Purchase, PurchaseDetails, PurchaseStatus,
};
pub use postgres::PgStore;
pub use store::{CatalogStore, PurchaseStore, Store};
