//! # Content Host Provider
//!
//! Implements `StorageProvider` for directory-style content hosts that answer
//! a folder listing with a JSON array of entries (the GitHub contents API and
//! compatible static hosts).
//!
//! ## Overview
//!
//! This module provides:
//! - Folder listings with optional bearer authentication
//! - Retry with exponential backoff for 5xx and 429 responses
//! - Mapping of host entries to [`RemoteFile`](bridge_traits::RemoteFile)

pub mod connector;
pub mod error;
pub mod types;

pub use connector::ContentHostConnector;
pub use error::{ContentHostError, Result};
