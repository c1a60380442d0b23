//! # Staleness Policy
//!
//! Decides whether the catalog is due for a full refresh, based on the time
//! of the last successful one.
//!
//! The timestamp lives in the host's [`SettingsStore`] under
//! [`LAST_FULL_SYNC_KEY`] as unix seconds. It is written only by
//! [`StalenessPolicy::mark_refreshed`], which the orchestrator calls after a
//! refresh succeeded end to end.

use crate::error::{Result, SyncError};
use bridge_traits::error::BridgeError;
use bridge_traits::storage::SettingsStore;
use bridge_traits::time::Clock;
use chrono::{DateTime, TimeZone, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Settings key holding the last successful refresh (unix seconds)
pub const LAST_FULL_SYNC_KEY: &str = "catalog_sync.last_full_sync_at";

pub struct StalenessPolicy {
    settings: Arc<dyn SettingsStore>,
    clock: Arc<dyn Clock>,
    interval: Duration,
}

impl StalenessPolicy {
    pub fn new(settings: Arc<dyn SettingsStore>, clock: Arc<dyn Clock>, interval: Duration) -> Self {
        Self {
            settings,
            clock,
            interval,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// `true` when no refresh has succeeded yet or the last one is at least
    /// `interval` old.
    ///
    /// A timestamp in the future counts as stale so a clock that moved
    /// backwards cannot suppress refreshes.
    pub async fn should_refresh(&self) -> Result<bool> {
        let Some(last) = self.last_refreshed_secs().await? else {
            debug!("No previous catalog refresh recorded");
            return Ok(true);
        };

        let now = self.clock.unix_timestamp();
        if last > now {
            warn!(last, now, "Last refresh is in the future; treating catalog as stale");
            return Ok(true);
        }

        let interval = i64::try_from(self.interval.as_secs()).unwrap_or(i64::MAX);
        let age = now - last;
        debug!(age_secs = age, interval_secs = interval, "Checked catalog staleness");
        Ok(age >= interval)
    }

    /// Record that a refresh succeeded now.
    pub async fn mark_refreshed(&self) -> Result<()> {
        let now = self.clock.unix_timestamp();
        self.settings
            .set_i64(LAST_FULL_SYNC_KEY, now)
            .await
            .map_err(settings_error)?;
        debug!(at = now, "Marked catalog refreshed");
        Ok(())
    }

    pub async fn last_refreshed_at(&self) -> Result<Option<DateTime<Utc>>> {
        Ok(self
            .last_refreshed_secs()
            .await?
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single()))
    }

    /// Forget the last refresh so the next `refresh_if_needed` runs.
    pub async fn invalidate(&self) -> Result<()> {
        self.settings
            .delete(LAST_FULL_SYNC_KEY)
            .await
            .map_err(settings_error)
    }

    async fn last_refreshed_secs(&self) -> Result<Option<i64>> {
        self.settings
            .get_i64(LAST_FULL_SYNC_KEY)
            .await
            .map_err(settings_error)
    }
}

fn settings_error(error: BridgeError) -> SyncError {
    SyncError::Storage(format!("Settings store: {}", error))
}
