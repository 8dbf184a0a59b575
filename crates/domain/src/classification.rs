//! Stable failure taxonomy produced by the classifier.

use serde::{Deserialize, Serialize};

/// Stable failure code. Never renamed or removed across deploys — downstream
/// consumers (dashboards, alerting) key off the `&str` form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureCode {
    AuthRequired,
    NotFound,
    RateLimited,
    ServerError,
    WafChallenge,
    BotDetected,
    Timeout,
    ConnectError,
    NoFormUrl,
    Unknown,
}

impl FailureCode {
    pub fn as_str(self) -> &'static str {
        match self {
            FailureCode::AuthRequired => "AUTH_REQUIRED",
            FailureCode::NotFound => "NOT_FOUND",
            FailureCode::RateLimited => "RATE_LIMITED",
            FailureCode::ServerError => "SERVER_ERROR",
            FailureCode::WafChallenge => "WAF_CHALLENGE",
            FailureCode::BotDetected => "BOT_DETECTED",
            FailureCode::Timeout => "TIMEOUT",
            FailureCode::ConnectError => "CONNECT_ERROR",
            FailureCode::NoFormUrl => "NO_FORM_URL",
            FailureCode::Unknown => "UNKNOWN",
        }
    }

    /// `true` for the two codes the claim-finalize path treats as bot
    /// protection for the purpose of the `bot_protection_detected` override
    /// (spec.md §4.2/§9: a collaborator-reported bot flag is coerced onto
    /// `error_code` only when the classifier did not already land on one of
    /// these two).
    pub fn is_bot_code(self) -> bool {
        matches!(self, FailureCode::BotDetected | FailureCode::WafChallenge)
    }
}

impl std::fmt::Display for FailureCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureCategory {
    Http,
    Bot,
    Network,
    Config,
    Unknown,
}

/// Output of [`FailureCode`] classification for one failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub code: FailureCode,
    pub category: FailureCategory,
    pub retryable: bool,
    pub cooldown_secs: u32,
    pub confidence: f32,
}

impl Classification {
    pub fn auth_required() -> Self {
        Self { code: FailureCode::AuthRequired, category: FailureCategory::Http, retryable: false, cooldown_secs: 0, confidence: 1.0 }
    }
    pub fn not_found() -> Self {
        Self { code: FailureCode::NotFound, category: FailureCategory::Http, retryable: false, cooldown_secs: 0, confidence: 1.0 }
    }
    pub fn rate_limited() -> Self {
        Self { code: FailureCode::RateLimited, category: FailureCategory::Http, retryable: true, cooldown_secs: 60, confidence: 1.0 }
    }
    pub fn server_error() -> Self {
        Self { code: FailureCode::ServerError, category: FailureCategory::Http, retryable: true, cooldown_secs: 30, confidence: 1.0 }
    }
    pub fn waf_challenge() -> Self {
        Self { code: FailureCode::WafChallenge, category: FailureCategory::Bot, retryable: false, cooldown_secs: 0, confidence: 0.8 }
    }
    pub fn bot_detected() -> Self {
        Self { code: FailureCode::BotDetected, category: FailureCategory::Bot, retryable: false, cooldown_secs: 0, confidence: 0.8 }
    }
    pub fn timeout() -> Self {
        Self { code: FailureCode::Timeout, category: FailureCategory::Network, retryable: true, cooldown_secs: 15, confidence: 0.6 }
    }
    pub fn connect_error() -> Self {
        Self { code: FailureCode::ConnectError, category: FailureCategory::Network, retryable: true, cooldown_secs: 30, confidence: 0.6 }
    }
    pub fn no_form_url() -> Self {
        Self { code: FailureCode::NoFormUrl, category: FailureCategory::Config, retryable: false, cooldown_secs: 0, confidence: 1.0 }
    }
    pub fn unknown() -> Self {
        Self { code: FailureCode::Unknown, category: FailureCategory::Unknown, retryable: true, cooldown_secs: 0, confidence: 0.3 }
    }
}
