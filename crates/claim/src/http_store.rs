//! [`BackingStore`] over the transactional queue service's HTTP API
//! (spec.md §1 calls this service out-of-scope; this is the transport
//! binding the CLI needs to actually talk to it).
//!
//! Grounded on `SerialMemoryClient`
//! (`src/memory/client.rs` in the teacher repo): a `reqwest::Client` with
//! default headers for auth, JSON request/response bodies, bounded retry
//! with exponential backoff on the transport call itself, and a 4xx/5xx
//! split on the HTTP status (4xx treated as a store-level permanent error,
//! since the store never asks to be retried on a client mistake; 5xx and
//! transport errors are transient and handed to [`crate::protocol::ClaimProtocol`]
//! for its own retry budget on top).

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};

use fsr_domain::Company;

use crate::backing_store::{BackingStore, ClaimRequest, MarkDoneRequest, StoreError};

#[derive(Debug, Clone)]
pub struct HttpStoreConfig {
    pub base_url: String,
    pub token: Option<String>,
    pub timeout: Duration,
    pub max_retries: u32,
}

pub struct HttpBackingStore {
    http: reqwest::Client,
    base_url: String,
    max_retries: u32,
}

impl HttpBackingStore {
    pub fn new(config: HttpStoreConfig) -> Result<Self, StoreError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(token) = &config.token {
            let value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| StoreError::Permanent(format!("invalid store token: {e}")))?;
            headers.insert(AUTHORIZATION, value);
        }

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| StoreError::Permanent(format!("HTTP client build failed: {e}")))?;

        Ok(Self { http, base_url: config.base_url, max_retries: config.max_retries })
    }

    async fn post_json<Req, Resp>(&self, path: &str, body: &Req) -> Result<Resp, StoreError>
    where
        Req: Serialize,
        Resp: for<'de> Deserialize<'de>,
    {
        let url = format!("{}{}", self.base_url, path);
        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                tokio::time::sleep(Duration::from_millis(200 * 2u64.pow(attempt))).await;
            }

            match self.http.post(&url).json(body).send().await {
                Ok(resp) => {
                    let status = resp.status().as_u16();
                    if resp.status().is_success() {
                        return resp
                            .json::<Resp>()
                            .await
                            .map_err(|e| StoreError::Permanent(format!("{path}: malformed response: {e}")));
                    }

                    let text = resp.text().await.unwrap_or_default();
                    let msg = format!("{path} returned {status}: {text}");
                    if (400..500).contains(&status) {
                        return Err(StoreError::Permanent(msg));
                    }
                    last_err = Some(StoreError::Transient(msg));
                }
                Err(e) => last_err = Some(StoreError::Transient(format!("{path}: {e}"))),
            }
        }

        Err(last_err.unwrap_or_else(|| StoreError::Transient(format!("{path}: retries exhausted"))))
    }
}

#[async_trait::async_trait]
impl BackingStore for HttpBackingStore {
    async fn claim_next(&self, req: ClaimRequest) -> Result<Vec<i64>, StoreError> {
        #[derive(Serialize)]
        struct Body {
            target_date: chrono::NaiveDate,
            campaign_id: i64,
            run_id: String,
            limit: u32,
            shard_id: Option<i64>,
        }
        #[derive(Deserialize)]
        struct Resp {
            company_ids: Vec<i64>,
        }
        let body = Body {
            target_date: req.target_date,
            campaign_id: req.campaign_id,
            run_id: req.run_id,
            limit: req.limit,
            shard_id: req.shard_id,
        };
        let resp: Resp = self.post_json("/v1/claim_next", &body).await?;
        Ok(resp.company_ids)
    }

    async fn fetch_company(&self, company_id: i64) -> Result<Option<Company>, StoreError> {
        #[derive(Serialize)]
        struct Body {
            company_id: i64,
        }
        #[derive(Deserialize)]
        struct Resp {
            company: Option<Company>,
        }
        let resp: Resp = self.post_json("/v1/fetch_company", &Body { company_id }).await?;
        Ok(resp.company)
    }

    async fn mark_done(&self, req: MarkDoneRequest) -> Result<(), StoreError> {
        #[derive(Deserialize)]
        struct Resp {}
        let _: Resp = self.post_json("/v1/mark_done", &req).await?;
        Ok(())
    }

    async fn count_today(&self, campaign_id: i64, target_date: chrono::NaiveDate) -> Result<i64, StoreError> {
        #[derive(Serialize)]
        struct Body {
            campaign_id: i64,
            target_date: chrono::NaiveDate,
        }
        #[derive(Deserialize)]
        struct Resp {
            count: i64,
        }
        let resp: Resp = self.post_json("/v1/count_today", &Body { campaign_id, target_date }).await?;
        Ok(resp.count)
    }
}
