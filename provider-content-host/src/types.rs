//! Content host API response types
//!
//! Data structures for deserializing folder listings. Only the fields the
//! catalog needs are modelled; anything else the host sends is ignored.

use serde::Deserialize;

/// Kind of a listing entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentsItemKind {
    File,
    Dir,
    Symlink,
    Submodule,
    #[serde(other)]
    Other,
}

/// One entry of a folder listing
///
/// See: https://docs.github.com/en/rest/repos/contents#get-repository-content
#[derive(Debug, Clone, Deserialize)]
pub struct ContentsItem {
    /// File or folder name
    pub name: String,

    /// Path relative to the repository root
    #[serde(default)]
    pub path: String,

    #[serde(rename = "type")]
    pub kind: ContentsItemKind,

    /// Size in bytes (0 for folders)
    #[serde(default)]
    pub size: Option<u64>,

    /// Raw download link, `null` for folders
    #[serde(default)]
    pub download_url: Option<String>,

    /// Git blob SHA
    #[serde(default)]
    pub sha: Option<String>,
}

impl ContentsItem {
    pub fn is_folder(&self) -> bool {
        matches!(self.kind, ContentsItemKind::Dir | ContentsItemKind::Submodule)
    }
}
