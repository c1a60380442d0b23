//! # Library Management Module
//!
//! Owns the local catalog database and the store interfaces the catalog sync
//! pipeline writes through.
//!
//! ## Overview
//!
//! This module manages:
//! - SQLite connection pooling and embedded migrations
//! - Catalog domain models (`CatalogEntry`, `LocalCatalogRecord`, `CacheState`)
//! - The local catalog repository with set reconciliation
//! - The remote catalog store trait implemented by provider crates

pub mod db;
pub mod error;
pub mod models;
pub mod repositories;

pub use error::{LibraryError, Result};
pub use models::{dedup_last_wins, Audience, CacheState, CatalogEntry, LocalCatalogRecord};
pub use repositories::{
    LocalCatalogRepository, ReconcileOutcome, RemoteCatalogStore, SqliteLocalCatalogRepository,
};
