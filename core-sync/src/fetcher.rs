//! # Catalog Fetcher
//!
//! Builds the canonical catalog from the content host's audience folders.

use crate::error::Result;
use bridge_traits::storage::{RemoteFile, StorageProvider};
use core_library::models::{dedup_last_wins, Audience, CatalogEntry};
use core_runtime::config::ContentHostConfig;
use futures::future::try_join_all;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Lists every audience folder and turns recognized document files into
/// catalog entries.
pub struct CatalogFetcher {
    provider: Arc<dyn StorageProvider>,
    partitions: Vec<(Audience, String)>,
    extension: String,
}

impl CatalogFetcher {
    pub fn new(provider: Arc<dyn StorageProvider>, config: &ContentHostConfig) -> Self {
        Self {
            provider,
            partitions: vec![
                (Audience::Parent, config.parent_path.clone()),
                (Audience::Child, config.child_path.clone()),
            ],
            extension: config.document_extension.trim().to_string(),
        }
    }

    /// Folder listed for each audience
    pub fn partitions(&self) -> &[(Audience, String)] {
        &self.partitions
    }

    /// Fetch every partition concurrently.
    ///
    /// A failed listing fails the whole fetch. Ids are unique in the result;
    /// when a file name maps to an id seen before, the later entry wins.
    #[instrument(skip(self))]
    pub async fn fetch_catalog(&self) -> Result<Vec<CatalogEntry>> {
        let listings = try_join_all(
            self.partitions
                .iter()
                .map(|(audience, path)| self.fetch_partition(*audience, path)),
        )
        .await?;

        let entries: Vec<CatalogEntry> = listings.into_iter().flatten().collect();
        let (entries, duplicates) = dedup_last_wins(&entries);
        if !duplicates.is_empty() {
            warn!(ids = ?duplicates, "Duplicate catalog ids; keeping the last occurrence");
        }

        info!(entries = entries.len(), "Fetched catalog");
        Ok(entries)
    }

    async fn fetch_partition(&self, audience: Audience, path: &str) -> Result<Vec<CatalogEntry>> {
        let files = self.provider.list_directory(path).await?;
        let listed = files.len();

        let entries: Vec<CatalogEntry> = files
            .into_iter()
            .filter_map(|file| self.entry_from(audience, file))
            .collect();

        debug!(%audience, path, listed, kept = entries.len(), "Listed audience folder");
        Ok(entries)
    }

    fn entry_from(&self, audience: Audience, file: RemoteFile) -> Option<CatalogEntry> {
        if file.is_folder {
            return None;
        }

        let title = document_stem(&file.name, &self.extension)?.trim();
        let id = entry_id(title);
        if id.is_empty() {
            warn!(name = %file.name, "Skipping document with an empty name");
            return None;
        }

        let Some(document_url) = file.download_url else {
            warn!(name = %file.name, "Skipping document without a download URL");
            return None;
        };

        Some(CatalogEntry::new(id, title, audience, document_url))
    }
}

/// The file name without its extension, if the extension matches
/// (case-insensitively).
pub fn document_stem<'a>(name: &'a str, extension: &str) -> Option<&'a str> {
    let (stem, ext) = name.rsplit_once('.')?;
    ext.eq_ignore_ascii_case(extension).then_some(stem)
}

/// Stable id for a title: every whitespace character removed.
pub fn entry_id(title: &str) -> String {
    title.chars().filter(|c| !c.is_whitespace()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SyncError;
    use async_trait::async_trait;
    use bridge_traits::error::{BridgeError, Result as BridgeResult};
    use mockall::mock;
    use mockall::predicate::eq;

    mock! {
        Host {}

        #[async_trait]
        impl StorageProvider for Host {
            async fn list_directory(&self, path: &str) -> BridgeResult<Vec<RemoteFile>>;
        }
    }

    fn file(folder: &str, name: &str) -> RemoteFile {
        RemoteFile {
            name: name.to_string(),
            path: format!("{}/{}", folder, name),
            download_url: Some(format!("https://raw.example.com/{}/{}", folder, name)),
            size: Some(1024),
            is_folder: false,
        }
    }

    fn fetcher(host: MockHost) -> CatalogFetcher {
        CatalogFetcher::new(
            Arc::new(host),
            &ContentHostConfig::new("https://api.example.com/contents"),
        )
    }

    #[test]
    fn test_document_stem_matches_extension_case_insensitively() {
        assert_eq!(document_stem("Alpha.pdf", "pdf"), Some("Alpha"));
        assert_eq!(document_stem("Alpha.PDF", "pdf"), Some("Alpha"));
        assert_eq!(document_stem("notes.v2.pdf", "pdf"), Some("notes.v2"));
        assert_eq!(document_stem("Alpha.epub", "pdf"), None);
        assert_eq!(document_stem("README", "pdf"), None);
    }

    #[test]
    fn test_entry_id_strips_all_whitespace() {
        assert_eq!(entry_id("The Little Prince"), "TheLittlePrince");
        assert_eq!(entry_id("Tab\tand  spaces"), "Tabandspaces");
        assert_eq!(entry_id(""), "");
    }

    #[core_async::test]
    async fn test_fetch_catalog_maps_both_partitions() {
        let mut host = MockHost::new();
        host.expect_list_directory()
            .with(eq("parent"))
            .times(1)
            .returning(|_| Ok(vec![file("parent", "Guide for Parents.pdf")]));
        host.expect_list_directory()
            .with(eq("child"))
            .times(1)
            .returning(|_| {
                Ok(vec![
                    file("child", "Alpha.pdf"),
                    file("child", " Beta .PDF"),
                    file("child", "cover.png"),
                ])
            });

        let mut entries = fetcher(host).fetch_catalog().await.unwrap();
        entries.sort_by(|a, b| a.id.cmp(&b.id));

        let ids: Vec<&str> = entries.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["Alpha", "Beta", "GuideforParents"]);

        assert_eq!(entries[1].title, "Beta");
        assert_eq!(entries[1].audience, Audience::Child);
        assert_eq!(entries[2].title, "Guide for Parents");
        assert_eq!(entries[2].audience, Audience::Parent);
        assert_eq!(
            entries[0].document_url,
            "https://raw.example.com/child/Alpha.pdf"
        );
    }

    #[core_async::test]
    async fn test_folders_and_unusable_files_are_skipped() {
        let mut host = MockHost::new();
        host.expect_list_directory().times(2).returning(|path| {
            if path == "parent" {
                return Ok(Vec::new());
            }
            let mut folder = file("child", "archive.pdf");
            folder.is_folder = true;
            let mut no_url = file("child", "Gamma.pdf");
            no_url.download_url = None;
            Ok(vec![folder, no_url, file("child", "   .pdf"), file("child", "Alpha.pdf")])
        });

        let entries = fetcher(host).fetch_catalog().await.unwrap();

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, "Alpha");
    }

    #[core_async::test]
    async fn test_duplicate_ids_keep_last() {
        let mut host = MockHost::new();
        host.expect_list_directory().times(2).returning(|path| {
            if path == "parent" {
                Ok(vec![file("parent", "Alpha.pdf")])
            } else {
                Ok(vec![file("child", "Al pha.pdf")])
            }
        });

        let entries = fetcher(host).fetch_catalog().await.unwrap();

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, "Alpha");
        assert_eq!(entries[0].audience, Audience::Child);
    }

    #[core_async::test]
    async fn test_one_failed_partition_fails_the_fetch() {
        let mut host = MockHost::new();
        host.expect_list_directory().returning(|path| {
            if path == "parent" {
                Err(BridgeError::HttpStatus {
                    status: 500,
                    url: "https://api.example.com/contents/parent".to_string(),
                })
            } else {
                Ok(vec![file("child", "Alpha.pdf")])
            }
        });

        let result = fetcher(host).fetch_catalog().await;

        assert!(matches!(result, Err(SyncError::Transport(_))));
    }

    #[core_async::test]
    async fn test_custom_partitions_and_extension() {
        let config = ContentHostConfig::new("https://api.example.com/contents")
            .with_partition_paths("books/grownups", "books/kids")
            .with_document_extension("epub");

        let mut host = MockHost::new();
        host.expect_list_directory()
            .with(eq("books/grownups"))
            .times(1)
            .returning(|_| Ok(Vec::new()));
        host.expect_list_directory()
            .with(eq("books/kids"))
            .times(1)
            .returning(|_| Ok(vec![file("books/kids", "Alpha.epub"), file("books/kids", "Beta.pdf")]));

        let fetcher = CatalogFetcher::new(Arc::new(host), &config);
        let entries = fetcher.fetch_catalog().await.unwrap();

        assert_eq!(fetcher.partitions().len(), 2);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, "Alpha");
    }
}
