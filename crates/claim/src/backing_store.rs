//! The `BackingStore` trait: the transport-agnostic seam between the runner
//! core and the transactional queue service (spec.md §6).
//!
//! Grounded on the `#[async_trait]` adapter-trait shape used at the two
//! transport boundaries in the teacher repo —
//! `sa-providers::traits::LlmProvider` (provider-agnostic chat/embeddings)
//! and `sa-mcp-client::transport::McpTransport` (provider-agnostic JSON-RPC
//! transport) — generalized here to the four claim/finalize RPCs.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use fsr_domain::{Classification, Company};

/// One `claim_next` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimRequest {
    pub target_date: NaiveDate,
    pub campaign_id: i64,
    pub run_id: String,
    pub limit: u32,
    pub shard_id: Option<i64>,
}

/// One `mark_done` request: the terminal write for a single claimed company.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkDoneRequest {
    pub target_date: NaiveDate,
    pub campaign_id: i64,
    pub company_id: i64,
    pub success: bool,
    pub error_code: Option<String>,
    pub classify_detail: Option<Classification>,
    pub bot_protection: bool,
    /// ISO-8601 with explicit offset, per spec.md §6.
    pub submitted_at: chrono::DateTime<chrono::FixedOffset>,
}

/// Errors a `BackingStore` implementation can surface.
///
/// The transient/permanent split drives retry policy (spec.md §7):
/// `Transient` is retried by `ClaimProtocol` with a bounded budget;
/// `Permanent` is surfaced immediately and logged, never retried.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    #[error("transient store error: {0}")]
    Transient(String),
    #[error("permanent store error: {0}")]
    Permanent(String),
}

impl StoreError {
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Transient(_))
    }
}

/// The four RPCs a transactional backing store must expose (spec.md §6).
///
/// Implementations are expected to provide the atomicity guarantees
/// described in spec.md §3/§5: `claim_next` never returns the same
/// `company_id` to two callers for the same `(target_date, campaign_id)`,
/// and `mark_done` is first-write-wins.
#[async_trait]
pub trait BackingStore: Send + Sync {
    async fn claim_next(&self, req: ClaimRequest) -> Result<Vec<i64>, StoreError>;

    async fn fetch_company(&self, company_id: i64) -> Result<Option<Company>, StoreError>;

    async fn mark_done(&self, req: MarkDoneRequest) -> Result<(), StoreError>;

    /// Successful terminals only, for the JST calendar day named by
    /// `target_date` (converted to a UTC range by the caller — see
    /// [`crate::protocol::jst_day_bounds_utc`]).
    async fn count_today(&self, campaign_id: i64, target_date: NaiveDate) -> Result<i64, StoreError>;
}
