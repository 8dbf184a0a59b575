//! Top-level fan-out: one Tokio task per worker, wired to a shared
//! shutdown flag (spec.md §4.1).

use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use chrono::NaiveDate;

use fsr_claim::ClaimProtocol;
use fsr_domain::CampaignProfile;
use fsr_worker::{BrowserDriver, HeadlessMode, StopReason, WorkerActor, WorkerConfig};

use crate::shutdown::{spawn_signal_handler, ShutdownController};

/// Everything the supervisor needs to launch a fleet for one campaign run,
/// independent of where the caller sourced it from (CLI flags, in this
/// workspace's `fsr` binary).
#[derive(Debug, Clone)]
pub struct SupervisorPlan {
    pub campaign_id: i64,
    pub config_path: PathBuf,
    pub headless: HeadlessMode,
    pub target_date: NaiveDate,
    pub num_workers: u32,
    pub shard_id: Option<i64>,
    pub run_id: String,
    pub max_processed: Option<u32>,
    pub fixed_company_id: Option<i64>,
}

impl SupervisorPlan {
    /// Worker count after clamping to spec.md §6's 1-4 range and forcing
    /// exactly 1 when a fixed-company override is set (spec.md §4.1).
    pub fn effective_worker_count(&self) -> u32 {
        if self.fixed_company_id.is_some() {
            1
        } else {
            self.num_workers.clamp(1, 4)
        }
    }
}

/// Spawns `plan.effective_worker_count()` `WorkerActor`s against `profile`,
/// each with its own `BrowserDriver` produced by `driver_factory`, and
/// drives them to completion or forced shutdown. Returns each worker's
/// `StopReason` in worker-id order.
pub async fn run(
    plan: SupervisorPlan,
    profile: CampaignProfile,
    protocol: ClaimProtocol,
    driver_factory: impl Fn(u32) -> Arc<dyn BrowserDriver>,
) -> Vec<StopReason> {
    let shutdown = Arc::new(AtomicBool::new(false));
    let controller = Arc::new(ShutdownController::new(shutdown.clone()));

    let worker_count = plan.effective_worker_count();
    let mut handles = Vec::with_capacity(worker_count as usize);
    for worker_id in 1..=worker_count {
        let config = WorkerConfig {
            worker_id,
            campaign_id: plan.campaign_id,
            config_path: plan.config_path.clone(),
            headless: plan.headless,
            target_date: plan.target_date,
            shard_id: plan.shard_id,
            run_id: plan.run_id.clone(),
            max_processed: plan.max_processed,
            fixed_company_id: plan.fixed_company_id,
        };
        let mut worker = WorkerActor::new(
            config,
            profile.clone(),
            driver_factory(worker_id),
            protocol.clone(),
            shutdown.clone(),
        );
        handles.push(tokio::spawn(async move { worker.run().await }));
    }

    let abort_handles = handles.iter().map(|h| h.abort_handle()).collect();
    spawn_signal_handler(controller, abort_handles);

    let mut results = Vec::with_capacity(handles.len());
    for handle in handles {
        match handle.await {
            Ok(reason) => results.push(reason),
            Err(join_err) => {
                tracing::warn!(
                    cancelled = join_err.is_cancelled(),
                    "worker task did not complete normally"
                );
                results.push(StopReason::ShutdownRequested);
            }
        }
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn worker_count_clamps_to_range() {
        let mut plan = plan_with(0);
        assert_eq!(plan.effective_worker_count(), 1);
        plan.num_workers = 9;
        assert_eq!(plan.effective_worker_count(), 4);
        plan.num_workers = 3;
        assert_eq!(plan.effective_worker_count(), 3);
    }

    #[test]
    fn fixed_company_forces_single_worker() {
        let mut plan = plan_with(4);
        plan.fixed_company_id = Some(123);
        assert_eq!(plan.effective_worker_count(), 1);
    }

    fn plan_with(num_workers: u32) -> SupervisorPlan {
        SupervisorPlan {
            campaign_id: 1,
            config_path: "unused.json".into(),
            headless: HeadlessMode::Auto,
            target_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            num_workers,
            shard_id: None,
            run_id: "r".into(),
            max_processed: None,
            fixed_company_id: None,
        }
    }
}
