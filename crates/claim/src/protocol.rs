//! `ClaimProtocol`: a thin, stateless adapter around a shared
//! [`BackingStore`] that adds JST→UTC boundary conversion and bounded
//! retry on transient transport errors (spec.md §4.3).

use std::sync::Arc;

use chrono::{DateTime, Datelike, Duration as ChronoDuration, NaiveDate, TimeZone, Utc};
use chrono_tz::Asia::Tokyo;

use fsr_domain::Backoff;

use crate::backing_store::{BackingStore, ClaimRequest, MarkDoneRequest, StoreError};

/// Bounded retry budget for transient RPC failures, reusing the same
/// jittered-exponential shape as the worker's idle backoff (spec.md §4.3;
/// grounded on `sa-node-sdk::reconnect::ReconnectBackoff`), but with a
/// small `max_attempts` instead of the node-sdk's unlimited default — a
/// stuck claim call must surface to the worker loop rather than retry
/// forever.
fn retry_policy() -> Backoff {
    Backoff {
        initial: std::time::Duration::from_millis(200),
        max: std::time::Duration::from_secs(5),
        factor: 2.0,
        jitter_ratio: 0.2,
        max_attempts: 4,
    }
}

/// Current instant as JST wall-clock time.
pub fn jst_now() -> DateTime<chrono_tz::Tz> {
    Utc::now().with_timezone(&Tokyo)
}

/// Converts a JST calendar date into its `[start, end)` UTC instant range
/// (spec.md §4.3, "JST→UTC boundary conversion on `count_today`"). JST is a
/// fixed UTC+9 offset with no DST, so this is a pure, allocation-free
/// computation.
pub fn jst_day_bounds_utc(target_date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start_naive = target_date.and_hms_opt(0, 0, 0).expect("valid midnight");
    let end_naive = (target_date + ChronoDuration::days(1))
        .and_hms_opt(0, 0, 0)
        .expect("valid midnight");
    let start_jst = Tokyo.from_local_datetime(&start_naive).single().expect("unambiguous JST offset");
    let end_jst = Tokyo.from_local_datetime(&end_naive).single().expect("unambiguous JST offset");
    (start_jst.with_timezone(&Utc), end_jst.with_timezone(&Utc))
}

/// JST calendar date for "now".
pub fn jst_today() -> NaiveDate {
    let now = jst_now();
    NaiveDate::from_ymd_opt(now.year(), now.month(), now.day()).expect("valid date")
}

/// Stateless adapter over a shared [`BackingStore`]. Cheap to clone
/// (`Arc` internally); every worker holds its own instance but they all
/// point at the same backing store handle.
#[derive(Clone)]
pub struct ClaimProtocol {
    store: Arc<dyn BackingStore>,
}

impl ClaimProtocol {
    pub fn new(store: Arc<dyn BackingStore>) -> Self {
        Self { store }
    }

    pub async fn claim_next(&self, req: ClaimRequest) -> Result<Vec<i64>, StoreError> {
        self.with_retry("claim_next", || self.store.claim_next(req.clone()))
            .await
    }

    pub async fn fetch_company(
        &self,
        company_id: i64,
    ) -> Result<Option<fsr_domain::Company>, StoreError> {
        self.with_retry("fetch_company", || self.store.fetch_company(company_id))
            .await
    }

    pub async fn mark_done(&self, req: MarkDoneRequest) -> Result<(), StoreError> {
        self.with_retry("mark_done", || self.store.mark_done(req.clone()))
            .await
    }

    /// Successful terminals for `campaign_id` over the JST calendar day
    /// `target_date`. The UTC boundary conversion ([`jst_day_bounds_utc`])
    /// is the caller-visible contract; the concrete store decides how to
    /// apply it against its own schema.
    pub async fn count_today(
        &self,
        campaign_id: i64,
        target_date: NaiveDate,
    ) -> Result<i64, StoreError> {
        self.with_retry("count_today", || self.store.count_today(campaign_id, target_date))
            .await
    }

    /// Runs `op` with bounded exponential-backoff retry on
    /// [`StoreError::Transient`]; a [`StoreError::Permanent`] is surfaced
    /// immediately with no retry (spec.md §7).
    async fn with_retry<T, F, Fut>(&self, op_name: &str, op: F) -> Result<T, StoreError>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T, StoreError>>,
    {
        let policy = retry_policy();
        let mut attempt = 0u32;
        loop {
            match op().await {
                Ok(v) => return Ok(v),
                Err(StoreError::Permanent(msg)) => {
                    tracing::error!(op = op_name, error = %msg, "permanent store error");
                    return Err(StoreError::Permanent(msg));
                }
                Err(StoreError::Transient(msg)) => {
                    if policy.should_give_up(attempt) {
                        tracing::error!(
                            op = op_name,
                            error = %msg,
                            attempts = attempt,
                            "transient store error, retry budget exhausted"
                        );
                        return Err(StoreError::Transient(msg));
                    }
                    let delay = policy.delay_for_attempt(attempt);
                    tracing::warn!(
                        op = op_name,
                        error = %msg,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "transient store error, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
