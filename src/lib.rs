//! Workspace umbrella crate.
//!
//! Hosts can depend on `shelf-workspace` alone: with the default
//! `desktop-shims` feature it re-exports `core-service` built against the
//! desktop bridges (reqwest, tokio fs, SQLite settings).

#[cfg(feature = "desktop-shims")]
pub use core_service::*;
