//! # Repository Pattern Implementation
//!
//! Repository traits and implementations for catalog data access.
//!
//! ## Architecture
//!
//! - Traits define the interface for each store
//! - The SQLite implementation uses sqlx for async database access
//! - All operations return `Result<T>` for error handling
//!
//! ## Available Repositories
//!
//! - `LocalCatalogRepository` - on-device catalog mirror with cache state and page counts
//! - `RemoteCatalogStore` - durable remote catalog mirror, implemented by providers

pub mod catalog;
pub mod remote;

pub use catalog::{LocalCatalogRepository, ReconcileOutcome, SqliteLocalCatalogRepository};
pub use remote::RemoteCatalogStore;
