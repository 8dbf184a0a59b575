//! Multi-worker fan-out against the in-memory store: claim exclusivity
//! must hold across concurrently running workers (spec.md §8.2), not just
//! within a single `WorkerActor`.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;

use fsr_claim::{BackingStore, ClaimProtocol, MemoryStore};
use fsr_domain::{CampaignPolicy, CampaignProfile, Company, SenderProfile, WorkOutcome};
use fsr_supervisor::{run, SupervisorPlan};
use fsr_worker::{BrowserDriver, HeadlessMode, ProcessRequest, StopReason};

fn sender() -> SenderProfile {
    SenderProfile {
        company_name: "Acme".into(),
        company_name_kana: "アクメ".into(),
        sender_name: "Taro".into(),
        last_name: "Yamada".into(),
        first_name: "Taro".into(),
        last_name_kana: "ヤマダ".into(),
        first_name_kana: "タロウ".into(),
        last_name_hiragana: "やまだ".into(),
        first_name_hiragana: "たろう".into(),
        position: "Manager".into(),
        gender: "male".into(),
        email_1: "taro@example.com".into(),
        email_2: None,
        postal_code_1: "100-0001".into(),
        postal_code_2: None,
        address_1: "Tokyo".into(),
        address_2: "Chiyoda".into(),
        address_3: "1-1-1".into(),
        address_4: None,
        phone_1: "03-1234-5678".into(),
        phone_2: None,
        phone_3: None,
    }
}

fn profile(campaign_id: i64) -> CampaignProfile {
    CampaignProfile {
        campaign_id,
        sender: sender(),
        policy: CampaignPolicy {
            max_daily_sends: None,
            send_days_of_week: None,
            send_start: "00:00".into(),
            send_end: "23:59".into(),
            subject: "Hello".into(),
            body: "Body".into(),
        },
    }
}

struct AlwaysSucceeds;

#[async_trait]
impl BrowserDriver for AlwaysSucceeds {
    async fn process(&self, _req: ProcessRequest<'_>) -> Result<WorkOutcome, String> {
        Ok(WorkOutcome::Success)
    }
}

#[tokio::test]
async fn concurrent_workers_never_claim_the_same_company() {
    let store = MemoryStore::new();
    let date = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();
    let campaign_id = 7;
    let company_ids: Vec<i64> = (0..12).collect();
    for id in &company_ids {
        store.add_company(Company { company_id: *id, form_url: Some("https://x".into()), company_name: None });
    }
    store.seed_queue(date, campaign_id, company_ids.clone());

    let protocol = ClaimProtocol::new(Arc::new(store.clone()));
    let plan = SupervisorPlan {
        campaign_id,
        config_path: "unused.json".into(),
        headless: HeadlessMode::Auto,
        target_date: date,
        num_workers: 3,
        shard_id: None,
        run_id: "fleet-test".into(),
        max_processed: Some(4),
        fixed_company_id: None,
    };

    let results = run(plan, profile(campaign_id), protocol, |_worker_id| Arc::new(AlwaysSucceeds)).await;

    assert_eq!(results.len(), 3);
    assert!(results.iter().all(|r| *r == StopReason::MaxProcessedReached));

    let claimed = store.claimed_for(date, campaign_id);
    assert_eq!(claimed.len(), 12, "each company claimed exactly once across the fleet");
    let mut unique = claimed.clone();
    unique.sort_unstable();
    unique.dedup();
    assert_eq!(unique.len(), claimed.len(), "no company claimed twice");
    assert_eq!(store.terminal_count(), 12);
}

#[tokio::test]
async fn fixed_company_plan_runs_exactly_one_worker() {
    let store = MemoryStore::new();
    let date = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();
    let campaign_id = 9;
    store.add_company(Company { company_id: 55, form_url: Some("https://x".into()), company_name: None });

    let protocol = ClaimProtocol::new(Arc::new(store.clone()));
    let plan = SupervisorPlan {
        campaign_id,
        config_path: "unused.json".into(),
        headless: HeadlessMode::Auto,
        target_date: date,
        num_workers: 4,
        shard_id: None,
        run_id: "fixed-test".into(),
        max_processed: None,
        fixed_company_id: Some(55),
    };

    let results = run(plan, profile(campaign_id), protocol, |_worker_id| Arc::new(AlwaysSucceeds)).await;

    assert_eq!(results, vec![StopReason::FixedCompanyProcessed]);
    assert_eq!(store.terminal_count(), 1);
}
