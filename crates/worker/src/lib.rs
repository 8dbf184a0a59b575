//! Per-worker claim loop: business-hours gating, config resolution, the
//! `BrowserDriver` contract, and the `WorkerActor` itself.

pub mod browser_driver;
pub mod business_hours;
pub mod config_resolver;
pub mod worker_actor;

pub use browser_driver::{BrowserDriver, HeadlessMode, ProcessRequest, UnimplementedBrowserDriver};
pub use config_resolver::ConfigResolver;
pub use worker_actor::{StopReason, WorkerActor, WorkerConfig};
