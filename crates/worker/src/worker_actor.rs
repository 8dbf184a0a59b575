//! `WorkerActor`: the per-task claim loop (spec.md §4.2).
//!
//! Implements the eight-step loop verbatim, including the error-code
//! precedence rewrite for bot detection and all four termination
//! conditions. Runs as a Tokio task, not an OS process (SPEC_FULL.md §2):
//! isolation comes from giving each actor its own `BrowserDriver` instance
//! and per-actor classifier/counter state, not from process boundaries.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::NaiveDate;

use fsr_classifier::{ClassifyInput, FailureClassifier};
use fsr_claim::{ClaimProtocol, ClaimRequest, DailyCounter, MarkDoneRequest};
use fsr_domain::{Backoff, CampaignProfile, ClassifyContext, FailureCode, WorkOutcome};

use crate::browser_driver::{BrowserDriver, HeadlessMode, ProcessRequest};
use crate::business_hours;

/// Static configuration for one worker, supplied by the supervisor
/// (spec.md §4.1).
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub worker_id: u32,
    pub campaign_id: i64,
    pub config_path: PathBuf,
    pub headless: HeadlessMode,
    pub target_date: NaiveDate,
    pub shard_id: Option<i64>,
    pub run_id: String,
    pub max_processed: Option<u32>,
    pub fixed_company_id: Option<i64>,
}

/// Why a worker's loop stopped (spec.md §4.2 "Termination conditions").
///
/// `FixedCompanyProcessed` is not one of the four conditions spec.md names
/// explicitly — see DESIGN.md for why fixed-company mode is resolved as
/// "process the one override id, then stop" rather than looping forever
/// against the same id with no claim to drain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    ShutdownRequested,
    MaxProcessedReached,
    DailyCapReached,
    FixedCompanyProcessed,
}

pub struct WorkerActor {
    config: WorkerConfig,
    profile: CampaignProfile,
    driver: Arc<dyn BrowserDriver>,
    protocol: ClaimProtocol,
    daily_counter: DailyCounter,
    classifier: FailureClassifier,
    backoff: Backoff,
    backoff_attempt: u32,
    shutdown: Arc<AtomicBool>,
    processed: u32,
}

impl WorkerActor {
    pub fn new(
        config: WorkerConfig,
        profile: CampaignProfile,
        driver: Arc<dyn BrowserDriver>,
        protocol: ClaimProtocol,
        shutdown: Arc<AtomicBool>,
    ) -> Self {
        let daily_counter = DailyCounter::new(protocol.clone());
        Self {
            config,
            profile,
            driver,
            protocol,
            daily_counter,
            classifier: FailureClassifier::new(),
            backoff: Backoff::default(),
            backoff_attempt: 0,
            shutdown,
            processed: 0,
        }
    }

    /// Runs the claim loop until one of the four (or the fixed-company)
    /// termination conditions fires.
    pub async fn run(&mut self) -> StopReason {
        loop {
            if self.shutdown.load(Ordering::Relaxed) {
                return StopReason::ShutdownRequested;
            }

            let now = fsr_claim::jst_now();
            if !business_hours::is_open(&self.profile.policy, now) {
                self.sleep_checking_shutdown(std::time::Duration::from_secs(60)).await;
                continue;
            }

            if let Some(cap) = self.profile.policy.max_daily_sends {
                match self.daily_counter.get(self.config.campaign_id, self.config.target_date).await {
                    Ok(count) if count as u32 >= cap => return StopReason::DailyCapReached,
                    Ok(_) => {}
                    Err(e) => {
                        tracing::warn!(
                            worker_id = self.config.worker_id,
                            campaign_id = self.config.campaign_id,
                            error = %e,
                            "daily counter unavailable, proceeding without cap check this iteration"
                        );
                    }
                }
            }

            if self.shutdown.load(Ordering::Relaxed) {
                return StopReason::ShutdownRequested;
            }

            let company_id = match self.config.fixed_company_id {
                Some(id) => id,
                None => match self.claim_one().await {
                    Some(id) => id,
                    None => {
                        self.apply_idle_backoff_and_sleep().await;
                        continue;
                    }
                },
            };

            let company = match self.protocol.fetch_company(company_id).await {
                Ok(Some(company)) => company,
                Ok(None) => {
                    self.finalize_not_found(company_id).await;
                    self.reset_backoff();
                    if self.after_unit(true) {
                        return self.terminal_stop_reason();
                    }
                    continue;
                }
                Err(e) => {
                    tracing::error!(
                        worker_id = self.config.worker_id,
                        company_id,
                        error = %e,
                        "fetch_company failed, leaving claim for lease reclaim"
                    );
                    self.apply_idle_backoff_and_sleep().await;
                    continue;
                }
            };

            if !company.has_form_url() {
                self.finalize_no_form_url(company_id).await;
                self.reset_backoff();
                if self.after_unit(true) {
                    return self.terminal_stop_reason();
                }
                continue;
            }

            let outcome = match self
                .driver
                .process(ProcessRequest {
                    company: &company,
                    campaign_profile: &self.profile,
                    worker_id: self.config.worker_id,
                    headless: self.config.headless,
                })
                .await
            {
                Ok(outcome) => outcome,
                Err(err_msg) => WorkOutcome::Failure {
                    error_type: Some("WORKER_ERROR".into()),
                    error_message: Some(err_msg),
                    http_status: None,
                    page_content_snippet: None,
                    bot_protection_detected: false,
                },
            };

            self.finalize_outcome(company_id, outcome).await;
            self.reset_backoff();

            if self.after_unit(true) {
                return self.terminal_stop_reason();
            }
        }
    }

    fn terminal_stop_reason(&self) -> StopReason {
        if self.config.fixed_company_id.is_some() {
            StopReason::FixedCompanyProcessed
        } else {
            StopReason::MaxProcessedReached
        }
    }

    /// Returns `true` when the loop must stop after this unit of work:
    /// fixed-company mode always stops after its one id; otherwise stop
    /// once `max_processed` is reached.
    fn after_unit(&mut self, did_work: bool) -> bool {
        if did_work {
            self.processed += 1;
        }
        if self.config.fixed_company_id.is_some() {
            return true;
        }
        matches!(self.config.max_processed, Some(max) if self.processed >= max)
    }

    async fn claim_one(&self) -> Option<i64> {
        let req = ClaimRequest {
            target_date: self.config.target_date,
            campaign_id: self.config.campaign_id,
            run_id: self.config.run_id.clone(),
            limit: 1,
            shard_id: self.config.shard_id,
        };
        match self.protocol.claim_next(req).await {
            Ok(ids) => ids.into_iter().next(),
            Err(e) => {
                tracing::error!(
                    worker_id = self.config.worker_id,
                    campaign_id = self.config.campaign_id,
                    error = %e,
                    "claim_next failed"
                );
                None
            }
        }
    }

    async fn finalize_not_found(&mut self, company_id: i64) {
        self.finalize_terminal(
            company_id,
            false,
            Some(FailureCode::NotFound.as_str().to_string()),
            Some(fsr_domain::Classification::not_found()),
            false,
        )
        .await;
    }

    async fn finalize_no_form_url(&mut self, company_id: i64) {
        self.finalize_terminal(
            company_id,
            false,
            Some(FailureCode::NoFormUrl.as_str().to_string()),
            Some(fsr_domain::Classification::no_form_url()),
            false,
        )
        .await;
    }

    async fn finalize_outcome(&mut self, company_id: i64, outcome: WorkOutcome) {
        if outcome.is_success() {
            self.finalize_terminal(company_id, true, None, None, false).await;
            return;
        }

        let ctx = ClassifyContext::from_outcome(&outcome).expect("failure outcome has a context");
        let mut detail = self.classifier.classify(ClassifyInput {
            error_message: ctx.error_message,
            http_status: ctx.http_status,
            error_type_hint: ctx.error_type_hint,
            page_content_snippet: ctx.page_content_snippet,
        });

        let bot_protection = ctx.bot_protection_detected || detail.code.is_bot_code();

        // Error-code precedence rewrite (spec.md §4.2, §9's resolved open
        // question): applied exactly once, here, immediately before
        // `mark_done`. `FailureClassifier` itself never inspects
        // `bot_protection`. The whole `Classification` is rewritten, not
        // just the code string, so `classify_detail.category` stays
        // consistent with the stored `error_code` (spec.md §8 S3).
        if bot_protection && !detail.code.is_bot_code() {
            detail = fsr_domain::Classification::bot_detected();
        }

        let error_code = Some(detail.code.as_str().to_string());

        self.finalize_terminal(company_id, false, error_code, Some(detail), bot_protection)
            .await;
    }

    async fn finalize_terminal(
        &mut self,
        company_id: i64,
        success: bool,
        error_code: Option<String>,
        classify_detail: Option<fsr_domain::Classification>,
        bot_protection: bool,
    ) {
        let submitted_at = fsr_claim::jst_now().fixed_offset();
        let req = MarkDoneRequest {
            target_date: self.config.target_date,
            campaign_id: self.config.campaign_id,
            company_id,
            success,
            error_code: error_code.clone(),
            classify_detail,
            bot_protection,
            submitted_at,
        };

        // Never interpolate raw error messages, URLs, or page snippets
        // here — only ids, success, and the classification code
        // (spec.md §7 "User-visible behavior").
        if success {
            tracing::info!(
                company_id,
                worker_id = self.config.worker_id,
                campaign_id = self.config.campaign_id,
                success = true,
                "process_done"
            );
        } else {
            tracing::info!(
                company_id,
                worker_id = self.config.worker_id,
                campaign_id = self.config.campaign_id,
                success = false,
                reason = error_code.as_deref().unwrap_or("UNKNOWN"),
                "process_done"
            );
        }

        if let Err(e) = self.protocol.mark_done(req).await {
            tracing::error!(company_id, error = %e, "mark_done RPC error");
            return;
        }

        if success {
            self.daily_counter.invalidate(self.config.campaign_id, self.config.target_date);
        }
    }

    fn reset_backoff(&mut self) {
        self.backoff_attempt = 0;
    }

    async fn apply_idle_backoff_and_sleep(&mut self) {
        let delay = self.backoff.delay_for_attempt(self.backoff_attempt);
        self.backoff_attempt += 1;
        self.sleep_checking_shutdown(delay).await;
    }

    async fn sleep_checking_shutdown(&self, duration: std::time::Duration) {
        if self.shutdown.load(Ordering::Relaxed) {
            return;
        }
        tokio::time::sleep(duration).await;
    }
}
