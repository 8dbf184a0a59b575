//! End-to-end scenarios from spec.md §8 (S1, S2, S3, S5), driven against
//! the deterministic `MemoryStore` double and a scripted `BrowserDriver`.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;

use fsr_claim::{BackingStore, ClaimProtocol, MemoryStore};
use fsr_domain::{CampaignPolicy, CampaignProfile, Company, SenderProfile, WorkOutcome};
use fsr_worker::{BrowserDriver, HeadlessMode, ProcessRequest, StopReason, WorkerActor, WorkerConfig};

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

fn profile(campaign_id: i64, max_daily_sends: Option<u32>) -> CampaignProfile {
    CampaignProfile {
        campaign_id,
        sender: sender(),
        policy: CampaignPolicy {
            max_daily_sends,
            send_days_of_week: None,
            send_start: "00:00".into(),
            send_end: "23:59".into(),
            subject: "Hello".into(),
            body: "Body".into(),
        },
    }
}

fn worker_config(campaign_id: i64, target_date: NaiveDate, max_processed: Option<u32>) -> WorkerConfig {
    WorkerConfig {
        worker_id: 1,
        campaign_id,
        config_path: "unused.json".into(),
        headless: HeadlessMode::Auto,
        target_date,
        shard_id: None,
        run_id: "test-run".into(),
        max_processed,
        fixed_company_id: None,
    }
}

struct ScriptedDriver {
    outcome: WorkOutcome,
}

#[async_trait]
impl BrowserDriver for ScriptedDriver {
    async fn process(&self, _req: ProcessRequest<'_>) -> Result<WorkOutcome, String> {
        Ok(self.outcome.clone())
    }
}

#[tokio::test]
async fn s1_happy_path_single_claim() {
    let store = MemoryStore::new();
    let date = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();
    store.add_company(Company {
        company_id: 42,
        form_url: Some("https://ex.example/contact".into()),
        company_name: None,
    });
    store.seed_queue(date, 7, [42]);

    let protocol = ClaimProtocol::new(Arc::new(store.clone()));
    let driver = Arc::new(ScriptedDriver { outcome: WorkOutcome::Success });
    let shutdown = Arc::new(AtomicBool::new(false));

    let mut worker = WorkerActor::new(
        worker_config(7, date, Some(1)),
        profile(7, None),
        driver,
        protocol,
        shutdown,
    );

    let stop = worker.run().await;
    assert_eq!(stop, StopReason::MaxProcessedReached);

    let terminal = store.terminal(date, 7, 42).expect("terminal written");
    assert!(terminal.success);
    assert_eq!(terminal.error_code, None);
    assert_eq!(store.terminal_count(), 1);
}

#[tokio::test]
async fn s2_missing_form_url() {
    let store = MemoryStore::new();
    let date = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();
    store.add_company(Company { company_id: 99, form_url: None, company_name: None });
    store.seed_queue(date, 7, [99]);

    let protocol = ClaimProtocol::new(Arc::new(store.clone()));
    let driver = Arc::new(ScriptedDriver { outcome: WorkOutcome::Success });
    let shutdown = Arc::new(AtomicBool::new(false));

    let mut worker = WorkerActor::new(
        worker_config(7, date, Some(1)),
        profile(7, None),
        driver,
        protocol,
        shutdown,
    );
    worker.run().await;

    let terminal = store.terminal(date, 7, 99).expect("terminal written");
    assert!(!terminal.success);
    assert_eq!(terminal.error_code.as_deref(), Some("NO_FORM_URL"));
    let detail = terminal.classify_detail.expect("classify detail present");
    assert!(!detail.retryable);
}

#[tokio::test]
async fn s3_bot_detected_rewrites_error_code() {
    let store = MemoryStore::new();
    let date = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();
    store.add_company(Company {
        company_id: 5,
        form_url: Some("https://ex.example/contact".into()),
        company_name: None,
    });
    store.seed_queue(date, 7, [5]);

    let protocol = ClaimProtocol::new(Arc::new(store.clone()));
    let driver = Arc::new(ScriptedDriver {
        outcome: WorkOutcome::Failure {
            error_type: None,
            error_message: Some("challenge".into()),
            http_status: Some(403),
            page_content_snippet: Some("Access Denied".into()),
            bot_protection_detected: true,
        },
    });
    let shutdown = Arc::new(AtomicBool::new(false));

    let mut worker = WorkerActor::new(
        worker_config(7, date, Some(1)),
        profile(7, None),
        driver,
        protocol,
        shutdown,
    );
    worker.run().await;

    let terminal = store.terminal(date, 7, 5).expect("terminal written");
    assert!(!terminal.success);
    assert!(terminal.bot_protection);
    assert_eq!(terminal.error_code.as_deref(), Some("BOT_DETECTED"));
    let detail = terminal.classify_detail.expect("classify detail present");
    assert_eq!(detail.category, fsr_domain::FailureCategory::Bot);
    assert!(!detail.retryable);
}

#[tokio::test]
async fn s5_daily_cap_reached_skips_claim() {
    let store = MemoryStore::new();
    let date = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();
    // Seed 50 pre-existing successful terminals for today so count_today == 50.
    for company_id in 0..50 {
        store.add_company(Company { company_id, form_url: Some("https://x".into()), company_name: None });
        let submitted_at = fsr_claim::jst_now().fixed_offset();
        store
            .mark_done(fsr_claim::MarkDoneRequest {
                target_date: date,
                campaign_id: 7,
                company_id,
                success: true,
                error_code: None,
                classify_detail: None,
                bot_protection: false,
                submitted_at,
            })
            .await
            .unwrap();
    }
    // A claimable row exists, but the cap should prevent the worker from
    // ever calling claim_next.
    store.seed_queue(date, 7, [999]);

    let protocol = ClaimProtocol::new(Arc::new(store.clone()));
    let driver = Arc::new(ScriptedDriver { outcome: WorkOutcome::Success });
    let shutdown = Arc::new(AtomicBool::new(false));

    let mut worker = WorkerActor::new(
        worker_config(7, date, None),
        profile(7, Some(50)),
        driver,
        protocol,
        shutdown,
    );

    let stop = worker.run().await;
    assert_eq!(stop, StopReason::DailyCapReached);
    assert!(store.claimed_for(date, 7).is_empty(), "must not claim once cap reached");
}

#[tokio::test]
async fn fixed_company_mode_skips_claim_and_stops_after_one() {
    let store = MemoryStore::new();
    let date = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();
    store.add_company(Company {
        company_id: 321,
        form_url: Some("https://ex.example/contact".into()),
        company_name: None,
    });
    // Intentionally do NOT seed the queue — fixed-company mode must not
    // call claim_next at all.

    let protocol = ClaimProtocol::new(Arc::new(store.clone()));
    let driver = Arc::new(ScriptedDriver { outcome: WorkOutcome::Success });
    let shutdown = Arc::new(AtomicBool::new(false));

    let mut config = worker_config(7, date, None);
    config.fixed_company_id = Some(321);

    let mut worker = WorkerActor::new(config, profile(7, None), driver, protocol, shutdown);
    let stop = worker.run().await;

    assert_eq!(stop, StopReason::FixedCompanyProcessed);
    assert!(store.claimed_for(date, 7).is_empty());
    let terminal = store.terminal(date, 7, 321).expect("terminal written");
    assert!(terminal.success);
}
