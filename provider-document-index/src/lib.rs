//! # Document Index Provider
//!
//! Implements [`RemoteCatalogStore`](core_library::RemoteCatalogStore) on top
//! of a REST JSON document index.
//!
//! ## Overview
//!
//! One document per catalog entry lives under
//! `{base_url}/collections/{collection}/documents/{id}`:
//!
//! ```text
//! GET    /collections/books/documents        -> { "documents": [ ... ] }
//! PUT    /collections/books/documents/Alpha  <- { id, title, role, document_url }
//! DELETE /collections/books/documents/Alpha  (404 counts as deleted)
//! ```
//!
//! Writes and deletes fan out with a bounded number of requests in flight.
//! Transient statuses (5xx, 429) are retried with exponential backoff.

pub mod error;
pub mod store;
pub mod types;

pub use error::{DocumentIndexError, Result};
pub use store::DocumentIndexCatalogStore;
