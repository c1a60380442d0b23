//! # Core Events
//!
//! Typed progress and outcome events for the reading shelf core, delivered over
//! a `broadcast` channel so the host UI, logging and tests can observe a catalog
//! refresh without coupling to the orchestrator.
//!
//! ```text
//! ┌───────────────────┐  emit   ┌───────────┐  subscribe  ┌────────────┐
//! │ Sync Orchestrator ├────────>│           ├────────────>│ Host UI    │
//! └───────────────────┘         │ EventBus  │             └────────────┘
//! ┌───────────────────┐  emit   │ (broadcast│  subscribe  ┌────────────┐
//! │ Content Cache     ├────────>│  channel) ├────────────>│ Test probe │
//! └───────────────────┘         └───────────┘             └────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, EventBus, SyncEvent};
//!
//! let bus = EventBus::default();
//! let mut subscriber = bus.subscribe();
//!
//! bus
//!     .emit(CoreEvent::Sync(SyncEvent::Skipped {
//!         last_refreshed_at: 1_700_000_000,
//!     }))
//!     .ok();
//!
//! assert!(subscriber.try_recv().is_ok());
//! ```
//!
//! A subscriber that falls more than the buffer size behind gets
//! `RecvError::Lagged(n)` once and then continues with the newest events.
//! Publishers ignore the "no subscribers" error with `.ok()`; nothing in the
//! pipeline waits on an event being observed.

use core_async::sync::broadcast;
use serde::{Deserialize, Serialize};
use std::fmt;

pub use core_async::sync::broadcast::error::{RecvError, SendError};
pub use core_async::sync::broadcast::Receiver;

/// Events buffered per subscriber before it starts lagging
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

/// Everything the core publishes on the [`EventBus`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Catalog refresh lifecycle
    Sync(SyncEvent),
    /// Per-document cache activity
    Cache(CacheEvent),
}

impl CoreEvent {
    /// Fixed one-line summary, suitable for a status bar.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Sync(e) => e.description(),
            CoreEvent::Cache(e) => e.description(),
        }
    }

    /// How loudly a host should surface the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Sync(SyncEvent::Failed { .. }) => EventSeverity::Error,
            CoreEvent::Cache(CacheEvent::DocumentFailed { .. }) => EventSeverity::Warning,
            CoreEvent::Sync(SyncEvent::Progress { .. }) => EventSeverity::Debug,
            _ => EventSeverity::Info,
        }
    }
}

/// Event severity levels for filtering and display purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

/// Pipeline stage of a catalog refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStage {
    /// Remote index, cache and local records are wiped
    Clear,
    /// Catalog is listed, mirrored remotely and reconciled locally
    Populate,
    /// Missing documents are downloaded into the cache
    Materialize,
}

impl SyncStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStage::Clear => "clear",
            SyncStage::Populate => "populate",
            SyncStage::Materialize => "materialize",
        }
    }
}

impl fmt::Display for SyncStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Events describing one catalog refresh.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum SyncEvent {
    /// A refresh acquired the lock and began.
    Started {
        /// Identifier shared by every event of this refresh.
        run_id: String,
        /// Whether local records and cached files are wiped first.
        clears_local_state: bool,
    },
    /// A pipeline stage began.
    StageStarted { run_id: String, stage: SyncStage },
    /// Incremental progress inside a stage.
    Progress {
        run_id: String,
        stage: SyncStage,
        completed: u64,
        total: u64,
    },
    /// Every stage succeeded and the refresh was marked fresh.
    Completed {
        run_id: String,
        entries_fetched: u64,
        records_inserted: u64,
        records_updated: u64,
        records_removed: u64,
        documents_downloaded: u64,
        documents_reused: u64,
        duration_ms: u64,
    },
    /// The refresh stopped; the staleness timestamp was not advanced.
    Failed {
        run_id: String,
        /// Stage that failed, if the failure happened inside one.
        stage: Option<SyncStage>,
        message: String,
        /// Whether retrying later is expected to help.
        recoverable: bool,
    },
    /// `refresh_if_needed` found the catalog fresh and did nothing.
    Skipped {
        /// Unix seconds of the last successful refresh.
        last_refreshed_at: i64,
    },
}

impl SyncEvent {
    fn description(&self) -> &str {
        match self {
            SyncEvent::Started { .. } => "Catalog refresh started",
            SyncEvent::StageStarted { .. } => "Catalog refresh stage started",
            SyncEvent::Progress { .. } => "Catalog refresh in progress",
            SyncEvent::Completed { .. } => "Catalog refresh completed successfully",
            SyncEvent::Failed { .. } => "Catalog refresh failed",
            SyncEvent::Skipped { .. } => "Catalog is fresh; refresh skipped",
        }
    }
}

/// Events describing document cache activity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum CacheEvent {
    /// A document is available locally, either freshly downloaded or reused.
    DocumentCached {
        entry_id: String,
        /// Cache file name (never the full path).
        file_name: String,
        /// Bytes transferred; zero when an existing file was reused.
        bytes: u64,
    },
    /// Downloading a document failed; other documents are unaffected.
    DocumentFailed { entry_id: String, message: String },
    /// A cached file was removed because no record references it anymore.
    DocumentEvicted { file_name: String },
    /// The cache directory was emptied.
    Cleared { files_removed: u64 },
}

impl CacheEvent {
    fn description(&self) -> &str {
        match self {
            CacheEvent::DocumentCached { .. } => "Document cached",
            CacheEvent::DocumentFailed { .. } => "Document download failed",
            CacheEvent::DocumentEvicted { .. } => "Orphaned document evicted",
            CacheEvent::Cleared { .. } => "Document cache cleared",
        }
    }
}

/// Broadcast channel shared by every publisher in the core.
///
/// Clones share the channel. Subscribers only see events emitted after they
/// subscribed.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// `capacity` events are buffered for each subscriber.
    pub fn new(capacity: usize) -> Self {
        Self {
            tx: broadcast::channel(capacity).0,
        }
    }

    /// Number of subscribers reached, or an error when nobody is listening.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.tx.send(event)
    }

    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventBus({} subscribers)", self.subscriber_count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn completed(run_id: &str) -> CoreEvent {
        CoreEvent::Sync(SyncEvent::Completed {
            run_id: run_id.to_string(),
            entries_fetched: 2,
            records_inserted: 2,
            records_updated: 0,
            records_removed: 0,
            documents_downloaded: 2,
            documents_reused: 0,
            duration_ms: 420,
        })
    }

    #[test]
    fn test_dropped_receivers_stop_counting() {
        let bus = EventBus::new(4);
        let first = bus.subscribe();
        let second = bus.clone().subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        drop(first);
        assert_eq!(bus.subscriber_count(), 1);
        drop(second);
        assert_eq!(format!("{:?}", bus), "EventBus(0 subscribers)");
    }

    #[core_async::test]
    async fn test_event_emission_no_subscribers() {
        let bus = EventBus::default();
        assert!(bus.emit(completed("run-1")).is_err());
    }

    #[core_async::test]
    async fn test_multiple_subscribers_receive_same_event() {
        let bus = EventBus::new(10);
        let mut sub1 = bus.subscribe();
        let mut sub2 = bus.subscribe();

        let event = CoreEvent::Sync(SyncEvent::Started {
            run_id: "run-1".to_string(),
            clears_local_state: true,
        });

        assert_eq!(bus.emit(event.clone()).unwrap(), 2);
        assert_eq!(sub1.recv().await.unwrap(), event);
        assert_eq!(sub2.recv().await.unwrap(), event);
    }

    #[core_async::test]
    async fn test_cache_events_follow_sync_events_in_order() {
        let bus = EventBus::new(10);
        let mut sub = bus.subscribe();

        bus.emit(completed("run-1")).ok();
        let cache_event = CoreEvent::Cache(CacheEvent::DocumentCached {
            entry_id: "Alpha".to_string(),
            file_name: "3f2a.pdf".to_string(),
            bytes: 2048,
        });
        bus.emit(cache_event.clone()).ok();

        assert_eq!(sub.recv().await.unwrap(), completed("run-1"));
        assert_eq!(sub.recv().await.unwrap(), cache_event);
        assert!(sub.try_recv().is_err());
    }

    #[core_async::test]
    async fn test_lagged_subscriber() {
        let bus = EventBus::new(2);
        let mut sub = bus.subscribe();

        for i in 0..5 {
            bus.emit(CoreEvent::Sync(SyncEvent::Progress {
                run_id: "run-1".to_string(),
                stage: SyncStage::Materialize,
                completed: i,
                total: 5,
            }))
            .ok();
        }

        assert!(matches!(sub.recv().await, Err(RecvError::Lagged(_))));
    }

    #[test]
    fn test_event_severity() {
        let failed = CoreEvent::Sync(SyncEvent::Failed {
            run_id: "run-1".to_string(),
            stage: Some(SyncStage::Populate),
            message: "listing failed".to_string(),
            recoverable: true,
        });
        assert_eq!(failed.severity(), EventSeverity::Error);

        let document_failed = CoreEvent::Cache(CacheEvent::DocumentFailed {
            entry_id: "Beta".to_string(),
            message: "HTTP 404".to_string(),
        });
        assert_eq!(document_failed.severity(), EventSeverity::Warning);

        assert_eq!(completed("run-1").severity(), EventSeverity::Info);
        assert!(EventSeverity::Debug < EventSeverity::Error);
    }

    #[test]
    fn test_event_description() {
        let event = CoreEvent::Sync(SyncEvent::Skipped {
            last_refreshed_at: 1_700_000_000,
        });
        assert_eq!(event.description(), "Catalog is fresh; refresh skipped");
        assert_eq!(SyncStage::Materialize.to_string(), "materialize");
    }

    #[core_async::test]
    async fn test_spawned_publishers_share_one_channel() {
        let bus = EventBus::default();
        let mut events = bus.subscribe();

        let publishers: Vec<_> = (0..4)
            .map(|worker| {
                let bus = bus.clone();
                core_async::task::spawn(async move {
                    for n in 0..5 {
                        bus.emit(CoreEvent::Cache(CacheEvent::DocumentCached {
                            entry_id: format!("w{}-{}", worker, n),
                            file_name: format!("{}{}.pdf", worker, n),
                            bytes: 0,
                        }))
                        .ok();
                    }
                })
            })
            .collect();
        for publisher in publishers {
            publisher.await.unwrap();
        }

        let mut received = 0;
        while let Ok(CoreEvent::Cache(_)) = events.try_recv() {
            received += 1;
        }
        assert_eq!(received, 20);
    }

    #[test]
    fn test_event_serialization() {
        let event = CoreEvent::Sync(SyncEvent::StageStarted {
            run_id: "run-123".to_string(),
            stage: SyncStage::Populate,
        });

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "Sync");
        assert_eq!(value["payload"]["event"], "StageStarted");
        assert_eq!(value["payload"]["stage"], "populate");

        let back: CoreEvent = serde_json::from_value(value).unwrap();
        assert_eq!(back, event);
    }
}
