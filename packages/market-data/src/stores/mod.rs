//! Cache store backends.
//!
//! - `MemoryCacheStore` - in-process map (always available)
//! - `SqliteCacheStore` - SQLite, tables created on connect (requires `sqlite` feature)
//! - `PostgresCacheStore` - PostgreSQL with jsonb columns (requires `postgres` feature)

pub mod memory;

#[cfg(any(feature = "sqlite", feature = "postgres"))]
mod schema;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "postgres")]
pub mod postgres;

pub use memory::MemoryCacheStore;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteCacheStore;

#[cfg(feature = "postgres")]
pub use postgres::PostgresCacheStore;
