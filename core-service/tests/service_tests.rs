//! End-to-end tests for the service façade.
//!
//! The real providers, SQLite stores and content cache are wired by
//! `bootstrap`; only HTTP is faked. `FakeBackend` answers the content host
//! listing endpoint, the document index REST API and document downloads.

use async_trait::async_trait;
use bridge_desktop::{SqliteSettingsStore, TokioFileSystem};
use bridge_traits::error::{BridgeError, Result as BridgeResult};
use bridge_traits::http::HttpMethod;
use bridge_traits::time::ManualClock;
use bridge_traits::{DynAsyncRead, HttpClient, HttpRequest, HttpResponse};
use bytes::Bytes;
use chrono::{TimeZone, Utc};
use core_runtime::config::{ContentHostConfig, CoreConfig, DocumentIndexConfig};
use core_runtime::events::SyncEvent;
use core_service::{Audience, CacheState, CoreError, CoreEvent, CoreService, RefreshOutcome};
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap};
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

const HOST_URL: &str = "https://host.example.com/contents";
const INDEX_URL: &str = "https://index.example.com";
const COLLECTION_URL: &str = "https://index.example.com/collections/books/documents";
const PDF_BYTES: &[u8] = b"%PDF-1.4 shelf";

#[derive(Default)]
struct FakeBackend {
    listings: Mutex<HashMap<String, Vec<&'static str>>>,
    index: Mutex<BTreeMap<String, Value>>,
    downloads: AtomicUsize,
}

impl FakeBackend {
    fn list(&self, folder: &str, names: Vec<&'static str>) {
        self.listings
            .lock()
            .unwrap()
            .insert(folder.to_string(), names);
    }

    fn index_ids(&self) -> Vec<String> {
        self.index.lock().unwrap().keys().cloned().collect()
    }

    fn downloads(&self) -> usize {
        self.downloads.load(Ordering::SeqCst)
    }

    fn respond(status: u16, body: Value) -> BridgeResult<HttpResponse> {
        Ok(HttpResponse {
            status,
            headers: HashMap::new(),
            body: Bytes::from(body.to_string()),
        })
    }

    fn listing(&self, folder: &str) -> Value {
        let names = self
            .listings
            .lock()
            .unwrap()
            .get(folder)
            .cloned()
            .unwrap_or_default();

        Value::Array(
            names
                .into_iter()
                .map(|name| {
                    json!({
                        "name": name,
                        "path": format!("{}/{}", folder, name),
                        "type": "file",
                        "size": PDF_BYTES.len(),
                        "sha": "0000",
                        "download_url": format!("https://raw.example.com/{}/{}", folder, name),
                    })
                })
                .collect(),
        )
    }
}

#[async_trait]
impl HttpClient for FakeBackend {
    async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse> {
        if let Some(folder) = request.url.strip_prefix(&format!("{}/", HOST_URL)) {
            return Self::respond(200, self.listing(folder));
        }

        if request.url == COLLECTION_URL {
            let documents: Vec<Value> = self.index.lock().unwrap().values().cloned().collect();
            return Self::respond(200, json!({ "documents": documents }));
        }

        let Some(id) = request.url.strip_prefix(&format!("{}/", COLLECTION_URL)) else {
            return Self::respond(404, json!({ "error": "no route" }));
        };

        match request.method {
            HttpMethod::Put => {
                let body = request.body.unwrap_or_default();
                let document: Value = serde_json::from_slice(&body)
                    .map_err(|e| BridgeError::Decode(e.to_string()))?;
                self.index.lock().unwrap().insert(id.to_string(), document);
                Self::respond(200, json!({ "ok": true }))
            }
            HttpMethod::Delete => match self.index.lock().unwrap().remove(id) {
                Some(_) => Self::respond(204, Value::Null),
                None => Self::respond(404, json!({ "error": "not found" })),
            },
            _ => Self::respond(405, Value::Null),
        }
    }

    async fn download_stream(&self, _url: String) -> BridgeResult<Box<DynAsyncRead>> {
        self.downloads.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(io::Cursor::new(PDF_BYTES.to_vec())))
    }
}

struct Fixture {
    _root: TempDir,
    backend: Arc<FakeBackend>,
    clock: Arc<ManualClock>,
    core: CoreService,
}

async fn fixture(clear_local_state: bool) -> Fixture {
    fixture_with_host(clear_local_state, ContentHostConfig::new(HOST_URL)).await
}

async fn fixture_with_host(clear_local_state: bool, content_host: ContentHostConfig) -> Fixture {
    let root = tempfile::tempdir().unwrap();
    let backend = Arc::new(FakeBackend::default());
    backend.list("parent", vec!["Guide for Parents.pdf"]);
    backend.list("child", vec!["Alpha.pdf", "Beta.pdf", "cover.png"]);

    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap(),
    ));

    let config = CoreConfig::builder()
        .database_path(root.path().join("db").join("shelf.db"))
        .content_host(content_host)
        .document_index(DocumentIndexConfig::new(INDEX_URL))
        .clear_local_state(clear_local_state)
        .http_client(backend.clone())
        .file_system(Arc::new(TokioFileSystem::with_data_directory(root.path().join("data"))))
        .settings_store(Arc::new(SqliteSettingsStore::in_memory().await.unwrap()))
        .clock(clock.clone())
        .build()
        .unwrap();

    let core = core_service::bootstrap(config).await.unwrap();

    Fixture {
        _root: root,
        backend,
        clock,
        core,
    }
}

#[core_async::test]
async fn test_first_launch_populates_catalog_index_and_cache() {
    let f = fixture(true).await;
    f.backend.index.lock().unwrap().insert(
        "Retired".to_string(),
        json!({"id": "Retired", "title": "Retired", "role": "child", "document_url": "https://raw.example.com/child/Retired.pdf"}),
    );

    let outcome = f.core.refresh_if_needed().await.unwrap();

    let report = outcome.report().unwrap();
    assert_eq!(report.entries_fetched, 3);
    assert_eq!(report.documents_downloaded, 3);
    assert_eq!(f.backend.downloads(), 3);
    assert_eq!(
        f.backend.index_ids(),
        vec!["Alpha".to_string(), "Beta".to_string(), "GuideforParents".to_string()]
    );
    assert_eq!(
        f.backend.index.lock().unwrap()["GuideforParents"]["role"],
        json!("parent")
    );

    let children = f.core.catalog_for(Audience::Child).await.unwrap();
    assert_eq!(children.len(), 2);
    for record in &children {
        let path = record.cache.path().expect("child document cached");
        assert_eq!(std::fs::read(path).unwrap(), PDF_BYTES);
    }

    let everything = f.core.catalog().await.unwrap();
    assert_eq!(everything.len(), 3);
    assert_eq!(
        f.core.last_refreshed_at().await.unwrap(),
        Some(Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap())
    );
}

#[core_async::test]
async fn test_cached_files_take_the_catalog_extension() {
    let f = fixture_with_host(true, ContentHostConfig::new(HOST_URL).with_document_extension("epub"))
        .await;
    f.backend.list("parent", vec![]);
    f.backend.list("child", vec!["Alpha.epub", "Beta.pdf"]);

    f.core.refresh().await.unwrap();

    let catalog = f.core.catalog().await.unwrap();
    assert_eq!(catalog.len(), 1);
    let path = catalog[0].cache.path().expect("document cached");
    assert_eq!(path.extension().and_then(|ext| ext.to_str()), Some("epub"));
    assert_eq!(f.backend.downloads(), 1);
}

#[core_async::test]
async fn test_fresh_catalog_skips_network() {
    let f = fixture(true).await;
    f.core.refresh_if_needed().await.unwrap();

    f.clock.advance(chrono::Duration::hours(2));
    let outcome = f.core.refresh_if_needed().await.unwrap();

    assert_eq!(outcome, RefreshOutcome::Fresh);
    assert_eq!(f.backend.downloads(), 3);
}

#[core_async::test]
async fn test_invalidate_forces_refresh_and_keeps_page_counts() {
    let f = fixture(false).await;
    f.core.refresh_if_needed().await.unwrap();
    f.core.record_page_count("Alpha", 32).await.unwrap();

    f.core.invalidate().await.unwrap();
    assert!(f.core.last_refreshed_at().await.unwrap().is_none());

    let outcome = f.core.refresh_if_needed().await.unwrap();

    assert!(matches!(outcome, RefreshOutcome::Refreshed(_)));
    let alpha = f.core.record("Alpha").await.unwrap().unwrap();
    assert_eq!(alpha.page_count, Some(32));
    assert!(alpha.cache.is_cached());
    assert_eq!(f.backend.downloads(), 3);
}

#[core_async::test]
async fn test_missing_file_is_reported_not_cached() {
    let f = fixture(false).await;
    f.core.refresh().await.unwrap();

    let beta = f.core.record("Beta").await.unwrap().unwrap();
    std::fs::remove_file(beta.cache.path().unwrap()).unwrap();

    let beta = f.core.record("Beta").await.unwrap().unwrap();
    assert_eq!(beta.cache, CacheState::NotCached);

    f.core.refresh().await.unwrap();
    assert!(f.core.record("Beta").await.unwrap().unwrap().cache.is_cached());
    assert_eq!(f.backend.downloads(), 4);
}

#[core_async::test]
async fn test_removed_upstream_document_disappears() {
    let f = fixture(false).await;
    f.core.refresh().await.unwrap();
    let beta_path = f
        .core
        .record("Beta")
        .await
        .unwrap()
        .unwrap()
        .cache
        .path()
        .unwrap()
        .to_path_buf();

    f.backend.list("child", vec!["Alpha.pdf"]);
    let report = f.core.refresh().await.unwrap();

    assert_eq!(report.records_removed, 1);
    assert!(f.core.record("Beta").await.unwrap().is_none());
    assert!(!beta_path.exists());
    assert!(!f.backend.index_ids().contains(&"Beta".to_string()));
}

#[core_async::test]
async fn test_page_count_for_unknown_record_fails() {
    let f = fixture(true).await;

    let result = f.core.record_page_count("Nope", 10).await;

    assert!(matches!(result, Err(CoreError::Library(_))));
    assert!(f.core.record("Nope").await.unwrap().is_none());
}

#[core_async::test]
async fn test_subscribers_see_refresh_lifecycle() {
    let f = fixture(true).await;
    let mut events = f.core.subscribe();

    f.core.refresh().await.unwrap();
    assert!(!f.core.is_refreshing());

    let mut lifecycle = Vec::new();
    while let Ok(event) = events.try_recv() {
        match event {
            CoreEvent::Sync(SyncEvent::Started { .. }) => lifecycle.push("started"),
            CoreEvent::Sync(SyncEvent::Completed {
                documents_downloaded,
                ..
            }) => {
                assert_eq!(documents_downloaded, 3);
                lifecycle.push("completed");
            }
            _ => {}
        }
    }
    assert_eq!(lifecycle, vec!["started", "completed"]);
}
