//! `fsr`: the form-submission worker fleet runner's CLI entry point.
//!
//! Grounded on `serial_assistant`'s and `sa-gateway`'s `main.rs`: parse
//! CLI/env synchronously, init JSON tracing, build the async dependency
//! graph, hand off to the supervisor, then translate the outcome into a
//! process exit code the way `sa-gateway` does for its subcommands
//! (`std::process::exit(1)` on a validation failure before entering the
//! async runtime proper).

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use fsr_claim::{ClaimProtocol, HttpBackingStore, HttpStoreConfig};
use fsr_supervisor::{run, SupervisorPlan};
use fsr_worker::{ConfigResolver, HeadlessMode, UnimplementedBrowserDriver};

/// Drains one day's queue of target companies for a campaign, one
/// `BrowserDriver::process` call at a time, across 1-4 concurrent workers.
#[derive(Debug, Parser)]
#[command(name = "fsr", version, about)]
struct Cli {
    /// Campaign to process.
    #[arg(long)]
    campaign_id: i64,

    /// Path or single-`*`-wildcard pattern to the campaign config JSON.
    #[arg(long)]
    config_file: String,

    /// Number of concurrent workers (clamped to 1-4; forced to 1 when
    /// `--company-id` is set).
    #[arg(long, default_value_t = 4)]
    num_workers: u32,

    /// `on`, `off`, or `auto`.
    #[arg(long, default_value = "auto")]
    headless: String,

    /// Target calendar date in JST, `YYYY-MM-DD`. Defaults to today in JST.
    #[arg(long)]
    target_date: Option<String>,

    /// Optional queue shard to restrict claims to.
    #[arg(long)]
    shard_id: Option<i64>,

    /// Stop this worker after processing this many companies.
    #[arg(long)]
    max_processed: Option<u32>,

    /// Process exactly this company id, skipping `claim_next` entirely.
    #[arg(long)]
    company_id: Option<i64>,
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,fsr=debug")))
        .json()
        .init();
}

fn env_flag(name: &str) -> bool {
    std::env::var(name).map(|v| v.eq_ignore_ascii_case("true") || v == "1").unwrap_or(false)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    let headless: HeadlessMode = cli.headless.parse().map_err(|e: String| {
        tracing::error!(error = %e, "invalid --headless value");
        anyhow::anyhow!(e)
    })?;

    let target_date = match cli.target_date {
        Some(s) => chrono::NaiveDate::parse_from_str(&s, "%Y-%m-%d")
            .map_err(|e| anyhow::anyhow!("invalid --target-date {s:?}: {e}"))?,
        None => fsr_claim::jst_today(),
    };

    let config_path = ConfigResolver::resolve(&cli.config_file).map_err(|e| {
        tracing::error!(error = %e, pattern = %cli.config_file, "config resolution failed");
        anyhow::anyhow!(e)
    })?;
    let profile = ConfigResolver::load(&config_path).map_err(|e| {
        tracing::error!(error = %e, path = %config_path.display(), "config validation failed");
        anyhow::anyhow!(e)
    })?;

    let dev_mode = env_flag("FSR_DEV_MODE");
    let store_url = match std::env::var("FSR_STORE_URL") {
        Ok(v) => v,
        Err(_) if dev_mode => {
            tracing::warn!("FSR_STORE_URL missing, dev mode: falling back to http://localhost:8080");
            "http://localhost:8080".to_string()
        }
        Err(_) => {
            tracing::error!("FSR_STORE_URL is required outside dev mode");
            std::process::exit(1);
        }
    };
    let store_token = std::env::var("FSR_STORE_TOKEN").ok();
    if store_token.is_none() && !dev_mode {
        tracing::error!("FSR_STORE_TOKEN is required outside dev mode");
        std::process::exit(1);
    }

    let run_id = std::env::var("FSR_RUN_ID").unwrap_or_else(|_| uuid::Uuid::new_v4().to_string());
    let env_tag = std::env::var("FSR_ENV").unwrap_or_else(|_| "local".to_string());

    tracing::info!(
        campaign_id = cli.campaign_id,
        env = %env_tag,
        run_id = %run_id,
        num_workers = cli.num_workers,
        target_date = %target_date,
        dev_mode,
        "fsr starting"
    );

    let store = HttpBackingStore::new(HttpStoreConfig {
        base_url: store_url,
        token: store_token,
        timeout: Duration::from_secs(30),
        max_retries: 2,
    })
    .map_err(|e| anyhow::anyhow!("failed to build backing-store client: {e}"))?;
    let protocol = ClaimProtocol::new(Arc::new(store));

    let plan = SupervisorPlan {
        campaign_id: cli.campaign_id,
        config_path,
        headless,
        target_date,
        num_workers: cli.num_workers,
        shard_id: cli.shard_id,
        run_id,
        max_processed: cli.max_processed,
        fixed_company_id: cli.company_id,
    };

    let results = run(plan, profile, protocol, |_worker_id| {
        Arc::new(UnimplementedBrowserDriver) as Arc<dyn fsr_worker::BrowserDriver>
    })
    .await;

    for (worker_id, reason) in (1u32..).zip(results.iter()) {
        tracing::info!(worker_id, stop_reason = ?reason, "worker stopped");
    }

    Ok(())
}
