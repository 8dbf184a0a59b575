//! Per-worker cache over `ClaimProtocol::count_today` (spec.md §4.5).
//!
//! Grounded on the original's `_SUCC_CACHE`/`success_count_cache_seconds`
//! and structurally on
//! `sa-sessions::store::SessionStore`'s read/replace-on-stale pattern: a
//! cached value is returned until it goes stale, then re-fetched and
//! replaced in place.

use std::collections::HashMap;
use std::time::Instant;

use chrono::NaiveDate;

use crate::backing_store::StoreError;
use crate::protocol::ClaimProtocol;

/// Default cache freshness window (spec.md §3, `SUCCESS_CACHE_TTL_SECONDS`).
pub const SUCCESS_CACHE_TTL_SECONDS: u64 = 30;

struct CachedCount {
    count: i64,
    ts: Instant,
}

/// Advisory, per-worker success counter. The authoritative cap enforcement
/// lives in the backing store; this only avoids re-querying on every loop
/// iteration.
pub struct DailyCounter {
    protocol: ClaimProtocol,
    ttl_secs: u64,
    cache: HashMap<(i64, NaiveDate), CachedCount>,
}

impl DailyCounter {
    pub fn new(protocol: ClaimProtocol) -> Self {
        Self {
            protocol,
            ttl_secs: SUCCESS_CACHE_TTL_SECONDS,
            cache: HashMap::new(),
        }
    }

    #[cfg(test)]
    pub fn with_ttl(protocol: ClaimProtocol, ttl_secs: u64) -> Self {
        Self { protocol, ttl_secs, cache: HashMap::new() }
    }

    /// Today's successful-terminal count for `(campaign_id, date)`, served
    /// from cache when fresh (spec.md §4.5).
    pub async fn get(&mut self, campaign_id: i64, date: NaiveDate) -> Result<i64, StoreError> {
        let key = (campaign_id, date);
        if let Some(entry) = self.cache.get(&key) {
            if entry.ts.elapsed().as_secs() < self.ttl_secs {
                return Ok(entry.count);
            }
        }
        let count = self.protocol.count_today(campaign_id, date).await?;
        self.cache.insert(key, CachedCount { count, ts: Instant::now() });
        Ok(count)
    }

    /// Invalidate the cached entry after a locally-observed successful
    /// `mark_done` (spec.md §4.5), so the next `get` re-queries instead of
    /// returning a now-stale count.
    pub fn invalidate(&mut self, campaign_id: i64, date: NaiveDate) {
        self.cache.remove(&(campaign_id, date));
    }
}
