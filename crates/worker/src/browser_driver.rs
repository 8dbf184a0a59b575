//! `BrowserDriver`: the out-of-scope headless-browser collaborator
//! (spec.md §1, "external collaborators"). The runner core only depends on
//! this trait; the concrete implementation (real Playwright/WebDriver
//! automation, form-field analysis) lives outside this workspace.

use async_trait::async_trait;

use fsr_domain::{CampaignProfile, Company, WorkOutcome};

/// Tri-state headless override (spec.md §6 CLI surface, `--headless`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeadlessMode {
    On,
    Off,
    Auto,
}

impl std::str::FromStr for HeadlessMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "on" => Ok(HeadlessMode::On),
            "off" => Ok(HeadlessMode::Off),
            "auto" => Ok(HeadlessMode::Auto),
            other => Err(format!("invalid headless mode: {other}")),
        }
    }
}

/// One unit of work handed to the driver: a target company, the campaign
/// profile to fill the form from, and the claiming worker's ordinal id
/// (used only for the driver's own logging/metrics).
#[derive(Debug, Clone)]
pub struct ProcessRequest<'a> {
    pub company: &'a Company,
    pub campaign_profile: &'a CampaignProfile,
    pub worker_id: u32,
    pub headless: HeadlessMode,
}

/// The headless-browser driver contract (spec.md §1, §4.2 step 5).
///
/// `process` enforces its own upper time budget internally; the worker
/// does not impose a separate timer (spec.md §5). Any error returned here
/// is treated by the worker as `error_type=WORKER_ERROR` with the error's
/// `Display` text as `error_message` (spec.md §4.2 step 5).
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    async fn process(&self, req: ProcessRequest<'_>) -> Result<WorkOutcome, String>;
}

/// Placeholder `BrowserDriver` for wiring the binary before a real
/// automation collaborator is injected. Always returns a `WORKER_ERROR`
/// failure — it exists so `fsr` can construct a complete `WorkerActor`
/// graph without depending on the out-of-scope browser automation crate
/// (spec.md §1).
#[derive(Debug, Default)]
pub struct UnimplementedBrowserDriver;

#[async_trait]
impl BrowserDriver for UnimplementedBrowserDriver {
    async fn process(&self, _req: ProcessRequest<'_>) -> Result<WorkOutcome, String> {
        Err("no BrowserDriver implementation is wired into this build".into())
    }
}
