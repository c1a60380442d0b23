//! # Catalog Sync
//!
//! Keeps the local catalog and the document cache consistent with the remote
//! catalog.
//!
//! ## Overview
//!
//! ```text
//!                     ┌──────────────────┐
//!  refresh_if_needed ─┤ StalenessPolicy  │── fresh ──> RefreshOutcome::Fresh
//!                     └────────┬─────────┘
//!                              │ stale
//!                     ┌────────▼─────────┐
//!  refresh ──────────>│ SyncOrchestrator │ (one refresh at a time)
//!                     └────────┬─────────┘
//!        ┌───────────────┬─────┴─────────┬──────────────────┐
//!  ┌─────▼──────┐  ┌─────▼──────┐  ┌─────▼──────┐   ┌───────▼──────┐
//!  │  Catalog   │  │   Remote   │  │   Local    │   │   Content    │
//!  │  Fetcher   │  │  Catalog   │  │  Catalog   │   │    Cache     │
//!  └────────────┘  └────────────┘  └────────────┘   └──────────────┘
//! ```
//!
//! ## Components
//!
//! - **Staleness Policy** (`staleness`): decides whether a refresh is due
//! - **Catalog Fetcher** (`fetcher`): lists the content host's audience folders
//! - **Sync Orchestrator** (`orchestrator`): the clear, populate and
//!   materialize pipeline behind the refresh lock

pub mod error;
pub mod fetcher;
pub mod orchestrator;
pub mod staleness;

pub use error::{EntryFailure, ErrorKind, Result, SyncError};
pub use fetcher::CatalogFetcher;
pub use orchestrator::{ClearPolicy, RefreshOutcome, SyncOrchestrator, SyncReport};
pub use staleness::{StalenessPolicy, LAST_FULL_SYNC_KEY};
