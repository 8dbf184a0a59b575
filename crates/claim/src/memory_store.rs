//! Deterministic in-memory [`BackingStore`] double.
//!
//! Grounded structurally on the teacher's in-crate test doubles (e.g.
//! `sa-sessions`'s and `sa-mcp-client`'s own fixtures) but enforces the
//! same atomicity/idempotency guarantees a real transactional store would
//! (spec.md §8): claim exclusivity and first-write-wins `mark_done`. Used
//! by every property/scenario test in this workspace (spec.md §8 "genuine
//! behavioral tests, not mocks-calling-mocks").

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use parking_lot::Mutex;

use fsr_domain::Company;

use crate::backing_store::{BackingStore, ClaimRequest, MarkDoneRequest, StoreError};
use crate::protocol::jst_day_bounds_utc;

type QueueKey = (NaiveDate, i64);
type TerminalKey = (NaiveDate, i64, i64);

#[derive(Default)]
struct State {
    companies: HashMap<i64, Company>,
    queues: HashMap<QueueKey, VecDeque<i64>>,
    terminals: HashMap<TerminalKey, MarkDoneRequest>,
    claimed: Vec<(QueueKey, i64)>,
}

/// In-memory double for [`BackingStore`]. Cheap to clone (shares an `Arc`).
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_company(&self, company: Company) {
        self.state.lock().companies.insert(company.company_id, company);
    }

    /// Seed the claimable queue for `(target_date, campaign_id)`.
    pub fn seed_queue(&self, target_date: NaiveDate, campaign_id: i64, company_ids: impl IntoIterator<Item = i64>) {
        self.state
            .lock()
            .queues
            .entry((target_date, campaign_id))
            .or_default()
            .extend(company_ids);
    }

    /// All `company_id`s ever returned by `claim_next` for this key, in
    /// claim order — used by disjointness property tests (spec.md §8.2).
    pub fn claimed_for(&self, target_date: NaiveDate, campaign_id: i64) -> Vec<i64> {
        let key = (target_date, campaign_id);
        self.state
            .lock()
            .claimed
            .iter()
            .filter(|(k, _)| *k == key)
            .map(|(_, id)| *id)
            .collect()
    }

    pub fn terminal(&self, target_date: NaiveDate, campaign_id: i64, company_id: i64) -> Option<MarkDoneRequest> {
        self.state
            .lock()
            .terminals
            .get(&(target_date, campaign_id, company_id))
            .cloned()
    }

    pub fn terminal_count(&self) -> usize {
        self.state.lock().terminals.len()
    }
}

#[async_trait]
impl BackingStore for MemoryStore {
    async fn claim_next(&self, req: ClaimRequest) -> Result<Vec<i64>, StoreError> {
        let mut state = self.state.lock();
        let key = (req.target_date, req.campaign_id);
        let queue = state.queues.entry(key).or_default();
        let mut claimed = Vec::new();
        for _ in 0..req.limit {
            match queue.pop_front() {
                Some(id) => claimed.push(id),
                None => break,
            }
        }
        for id in &claimed {
            state.claimed.push((key, *id));
        }
        Ok(claimed)
    }

    async fn fetch_company(&self, company_id: i64) -> Result<Option<Company>, StoreError> {
        Ok(self.state.lock().companies.get(&company_id).cloned())
    }

    async fn mark_done(&self, req: MarkDoneRequest) -> Result<(), StoreError> {
        let key = (req.target_date, req.campaign_id, req.company_id);
        let mut state = self.state.lock();
        state.terminals.entry(key).or_insert(req);
        Ok(())
    }

    async fn count_today(&self, campaign_id: i64, target_date: NaiveDate) -> Result<i64, StoreError> {
        let (start, end) = jst_day_bounds_utc(target_date);
        let state = self.state.lock();
        let count = state
            .terminals
            .values()
            .filter(|t| {
                t.campaign_id == campaign_id
                    && t.success
                    && t.submitted_at.with_timezone(&Utc) >= start
                    && t.submitted_at.with_timezone(&Utc) < end
            })
            .count();
        Ok(count as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    fn jst_offset() -> FixedOffset {
        FixedOffset::east_opt(9 * 3600).unwrap()
    }

    #[tokio::test]
    async fn claim_next_drains_queue_once() {
        let store = MemoryStore::new();
        let date = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();
        store.seed_queue(date, 7, [42]);

        let req = ClaimRequest {
            target_date: date,
            campaign_id: 7,
            run_id: "r1".into(),
            limit: 1,
            shard_id: None,
        };
        let first = store.claim_next(req.clone()).await.unwrap();
        assert_eq!(first, vec![42]);

        let second = store.claim_next(req).await.unwrap();
        assert!(second.is_empty());
    }

    #[tokio::test]
    async fn mark_done_is_first_write_wins() {
        let store = MemoryStore::new();
        let date = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();
        let submitted_at = Utc::now().with_timezone(&jst_offset());

        let first = MarkDoneRequest {
            target_date: date,
            campaign_id: 7,
            company_id: 42,
            success: true,
            error_code: None,
            classify_detail: None,
            bot_protection: false,
            submitted_at,
        };
        let mut second = first.clone();
        second.success = false;

        store.mark_done(first).await.unwrap();
        store.mark_done(second).await.unwrap();

        let terminal = store.terminal(date, 7, 42).unwrap();
        assert!(terminal.success, "first write should win");
        assert_eq!(store.terminal_count(), 1);
    }
}
