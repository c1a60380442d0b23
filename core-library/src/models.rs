//! Domain models for the reading shelf catalog
//!
//! This module contains the catalog entry, the local record with its
//! device-local fields, and the row mapping used by the SQLite repository.

use crate::error::LibraryError;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

// =============================================================================
// Audience
// =============================================================================

/// Who a catalog document is meant for.
///
/// Stored and transmitted as `"parent"` / `"child"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Audience {
    Parent,
    Child,
}

impl Audience {
    /// Every audience partition, in listing order.
    pub const ALL: [Audience; 2] = [Audience::Parent, Audience::Child];

    pub fn as_str(&self) -> &'static str {
        match self {
            Audience::Parent => "parent",
            Audience::Child => "child",
        }
    }
}

impl fmt::Display for Audience {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Audience {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "parent" => Ok(Audience::Parent),
            "child" => Ok(Audience::Child),
            other => Err(format!("Unknown audience: {}", other)),
        }
    }
}

// =============================================================================
// Catalog Entry
// =============================================================================

/// One document in the canonical remote catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Stable identifier derived from the file name
    pub id: String,
    /// Human-readable title
    pub title: String,
    pub audience: Audience,
    /// Where the document bytes are downloaded from
    pub document_url: String,
}

impl CatalogEntry {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        audience: Audience,
        document_url: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            audience,
            document_url: document_url.into(),
        }
    }

    /// Validate entry data
    pub fn validate(&self) -> Result<(), String> {
        if self.id.trim().is_empty() {
            return Err("Catalog entry id cannot be empty".to_string());
        }

        if self.title.trim().is_empty() {
            return Err(format!("Catalog entry {} has an empty title", self.id));
        }

        if self.document_url.trim().is_empty() {
            return Err(format!("Catalog entry {} has no document URL", self.id));
        }

        Ok(())
    }
}

/// Collapses entries sharing an id, keeping the last occurrence.
///
/// Returns the surviving entries in their original relative order together
/// with the ids that had duplicates.
pub fn dedup_last_wins(entries: &[CatalogEntry]) -> (Vec<CatalogEntry>, Vec<String>) {
    let mut last_index: HashMap<&str, usize> = HashMap::with_capacity(entries.len());
    let mut duplicates = Vec::new();

    for (index, entry) in entries.iter().enumerate() {
        if last_index.insert(entry.id.as_str(), index).is_some() {
            duplicates.push(entry.id.clone());
        }
    }

    let survivors = entries
        .iter()
        .enumerate()
        .filter(|(index, entry)| last_index.get(entry.id.as_str()) == Some(index))
        .map(|(_, entry)| entry.clone())
        .collect();

    duplicates.sort();
    duplicates.dedup();
    (survivors, duplicates)
}

// =============================================================================
// Cache State
// =============================================================================

/// Whether a record's document is available on local disk.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(tag = "state", content = "path", rename_all = "snake_case")]
pub enum CacheState {
    #[default]
    NotCached,
    Cached(PathBuf),
}

impl CacheState {
    pub fn path(&self) -> Option<&Path> {
        match self {
            CacheState::NotCached => None,
            CacheState::Cached(path) => Some(path.as_path()),
        }
    }

    pub fn is_cached(&self) -> bool {
        matches!(self, CacheState::Cached(_))
    }

    /// Value stored in the nullable `local_file_path` column.
    pub fn to_column(&self) -> Option<String> {
        self.path().map(|path| path.to_string_lossy().into_owned())
    }

    pub fn from_column(value: Option<String>) -> Self {
        match value {
            Some(path) if !path.is_empty() => CacheState::Cached(PathBuf::from(path)),
            _ => CacheState::NotCached,
        }
    }
}

// =============================================================================
// Local Catalog Record
// =============================================================================

/// Local mirror of a catalog entry plus device-local fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalCatalogRecord {
    pub id: String,
    pub title: String,
    pub audience: Audience,
    pub document_url: String,
    /// Where the downloaded document lives, if anywhere
    pub cache: CacheState,
    /// Page count reported by the reader once the document was opened
    pub page_count: Option<u32>,
    /// Unix seconds
    pub created_at: i64,
    /// Unix seconds
    pub updated_at: i64,
}

impl LocalCatalogRecord {
    /// A fresh record for `entry` with empty local fields.
    pub fn from_entry(entry: &CatalogEntry, now: i64) -> Self {
        Self {
            id: entry.id.clone(),
            title: entry.title.clone(),
            audience: entry.audience,
            document_url: entry.document_url.clone(),
            cache: CacheState::NotCached,
            page_count: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// The catalog portion of this record.
    pub fn entry(&self) -> CatalogEntry {
        CatalogEntry {
            id: self.id.clone(),
            title: self.title.clone(),
            audience: self.audience,
            document_url: self.document_url.clone(),
        }
    }

    /// Whether the remote fields differ from `entry`.
    pub fn differs_from(&self, entry: &CatalogEntry) -> bool {
        self.title != entry.title
            || self.audience != entry.audience
            || self.document_url != entry.document_url
    }
}

/// Raw `catalog_records` row.
#[derive(Debug, Clone, FromRow)]
pub(crate) struct CatalogRecordRow {
    pub id: String,
    pub title: String,
    pub audience: String,
    pub document_url: String,
    pub local_file_path: Option<String>,
    pub total_pages: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl TryFrom<CatalogRecordRow> for LocalCatalogRecord {
    type Error = LibraryError;

    fn try_from(row: CatalogRecordRow) -> Result<Self, Self::Error> {
        let audience = row
            .audience
            .parse::<Audience>()
            .map_err(|message| LibraryError::InvalidInput {
                field: "audience".to_string(),
                message,
            })?;

        let page_count = row
            .total_pages
            .map(u32::try_from)
            .transpose()
            .map_err(|_| LibraryError::InvalidInput {
                field: "total_pages".to_string(),
                message: format!("Record {} has an out-of-range page count", row.id),
            })?;

        Ok(LocalCatalogRecord {
            id: row.id,
            title: row.title,
            audience,
            document_url: row.document_url,
            cache: CacheState::from_column(row.local_file_path),
            page_count,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
