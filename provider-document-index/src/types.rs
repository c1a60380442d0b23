//! Document index wire types

use core_library::models::{Audience, CatalogEntry};
use serde::{Deserialize, Serialize};

use crate::error::DocumentIndexError;

/// One catalog document as stored in the index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDocument {
    pub id: String,
    pub title: String,
    /// `"parent"` or `"child"`
    pub role: String,
    pub document_url: String,
}

/// Response of the collection listing endpoint
#[derive(Debug, Deserialize)]
pub struct DocumentsListResponse {
    #[serde(default)]
    pub documents: Vec<IndexDocument>,
}

impl From<&CatalogEntry> for IndexDocument {
    fn from(entry: &CatalogEntry) -> Self {
        Self {
            id: entry.id.clone(),
            title: entry.title.clone(),
            role: entry.audience.as_str().to_string(),
            document_url: entry.document_url.clone(),
        }
    }
}

impl TryFrom<IndexDocument> for CatalogEntry {
    type Error = DocumentIndexError;

    fn try_from(document: IndexDocument) -> Result<Self, Self::Error> {
        let audience = document
            .role
            .parse::<Audience>()
            .map_err(|message| DocumentIndexError::InvalidDocument {
                id: document.id.clone(),
                message,
            })?;

        Ok(CatalogEntry::new(
            document.id,
            document.title,
            audience,
            document.document_url,
        ))
    }
}
