//! Deterministic failure classification with a bounded, TTL-swept cache.
//!
//! Grounded structurally on
//! `examples/sblanchard-SerialAgent/crates/providers/src/classifier.rs`'s
//! `EmbeddingClassifier` (a `parking_lot::RwLock<HashMap<_>>` cache keyed by
//! a content hash, swept on write), and numerically on the original's
//! `_CLASSIFY_CACHE`/`_prune_classify_cache` constants
//! (`CLASSIFY_CACHE_MAX_SIZE=256`, `CLASSIFY_CACHE_TTL_SEC=600`, a 64-key
//! opportunistic sweep per write).

use std::collections::{HashMap, VecDeque};
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;
use sha1::{Digest, Sha1};

use fsr_domain::{Classification, FailureCode};

/// Entries are truncated to this many characters before matching or hashing.
const TRUNCATE_LEN: usize = 160;

/// Maximum number of cached classification entries.
pub const MAX_CACHE_SIZE: usize = 256;

/// Cache entry lifetime before a recompute is forced.
pub const TTL_SECONDS: u64 = 600;

/// Number of keys scanned per opportunistic sweep.
const SWEEP_SCAN_LIMIT: usize = 64;

/// WAF/CDN challenge-page phrase markers.
///
/// Drawn from the vocabulary in
/// `examples/original_source/src/form_sender/detection/bot_detector.py`
/// (Cloudflare challenge-platform detection) plus generic WAF block pages;
/// this rule never re-runs DOM heuristics, only matches on the snippet text
/// the `BrowserDriver` collaborator already extracted.
const WAF_SIGNATURES: &[&str] = &[
    "access denied",
    "request blocked",
    "cdn-cgi/challenge-platform",
    "cf-browser-verification",
    "cf-wrapper",
    "attention required! | cloudflare",
    "sorry, you have been blocked",
];

/// CAPTCHA/bot-check phrase markers, mirroring the reCAPTCHA signals
/// `_detect_strict_recaptcha` looks for in the original (`g-recaptcha`,
/// `grecaptcha`, the reCAPTCHA API script), restated here as snippet text
/// rather than DOM queries.
const CAPTCHA_SIGNATURES: &[&str] = &[
    "g-recaptcha",
    "grecaptcha",
    "recaptcha/api.js",
    "recaptcha/api2/anchor",
    "hcaptcha",
    "please verify you are a human",
    "i'm not a robot",
];

const TIMEOUT_PATTERNS: &[&str] = &["timed out", "timeout", "deadline exceeded"];

const CONNECT_ERROR_PATTERNS: &[&str] = &[
    "connection refused",
    "name or service not known",
    "could not resolve host",
    "dns",
    "connection reset",
    "econnrefused",
];

/// Input tuple the classifier operates on. Each field is truncated to
/// [`TRUNCATE_LEN`] characters before use (matching and hashing alike).
#[derive(Debug, Clone, Copy, Default)]
pub struct ClassifyInput<'a> {
    pub error_message: Option<&'a str>,
    pub http_status: Option<u16>,
    pub error_type_hint: Option<&'a str>,
    pub page_content_snippet: Option<&'a str>,
}

struct CacheEntry {
    detail: Classification,
    ts: u64,
}

/// Process-local failure classifier. One instance per worker; never shared
/// across workers (spec.md §9: "no singletons cross process boundaries").
pub struct FailureClassifier {
    cache: Mutex<Cache>,
}

struct Cache {
    entries: HashMap<String, CacheEntry>,
    order: VecDeque<String>,
}

impl Default for FailureClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl FailureClassifier {
    pub fn new() -> Self {
        Self {
            cache: Mutex::new(Cache {
                entries: HashMap::new(),
                order: VecDeque::new(),
            }),
        }
    }

    /// Classify an input tuple, consulting and maintaining the cache.
    ///
    /// Classification is a pure function of the (truncated) input modulo
    /// cache freshness (spec.md §8.3): a cold cache always recomputes via
    /// [`classify_pure`].
    pub fn classify(&self, input: ClassifyInput<'_>) -> Classification {
        let msg = truncate(input.error_message.unwrap_or(""));
        let snippet = truncate(input.page_content_snippet.unwrap_or(""));
        let hint = input.error_type_hint.unwrap_or("");
        let key = cache_key(msg, input.http_status, hint, snippet);

        let now = now_secs();
        {
            let cache = self.cache.lock();
            if let Some(entry) = cache.entries.get(&key) {
                if now.saturating_sub(entry.ts) <= TTL_SECONDS {
                    return entry.detail;
                }
            }
        }

        let detail = classify_pure(ClassifyInput {
            error_message: Some(msg),
            http_status: input.http_status,
            error_type_hint: Some(hint),
            page_content_snippet: Some(snippet),
        });

        let mut cache = self.cache.lock();
        if !cache.entries.contains_key(&key) {
            cache.order.push_back(key.clone());
        }
        cache.entries.insert(key, CacheEntry { detail, ts: now });
        sweep(&mut cache, now);
        detail
    }

    #[cfg(test)]
    fn cache_len(&self) -> usize {
        self.cache.lock().entries.len()
    }
}

fn sweep(cache: &mut Cache, now: u64) {
    let scan: Vec<String> = cache.order.iter().take(SWEEP_SCAN_LIMIT).cloned().collect();
    for key in scan {
        let expired = cache
            .entries
            .get(&key)
            .map(|e| now.saturating_sub(e.ts) > TTL_SECONDS)
            .unwrap_or(true);
        if expired {
            cache.entries.remove(&key);
            cache.order.retain(|k| k != &key);
        }
    }

    while cache.entries.len() > MAX_CACHE_SIZE {
        let Some(oldest) = cache.order.pop_front() else {
            break;
        };
        cache.entries.remove(&oldest);
    }
}

fn cache_key(msg: &str, http_status: Option<u16>, hint: &str, snippet: &str) -> String {
    let status_str = http_status.map(|s| s.to_string()).unwrap_or_default();
    let raw = format!("{msg}|{status_str}|{hint}|{snippet}");
    let mut hasher = Sha1::new();
    hasher.update(raw.as_bytes());
    let digest = hasher.finalize();
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

fn truncate(s: &str) -> &str {
    match s.char_indices().nth(TRUNCATE_LEN) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// The ten ordered rules from spec.md §4.4, first match wins. No I/O, no
/// clock access — a pure function suitable for property testing
/// (spec.md §8.3).
pub fn classify_pure(input: ClassifyInput<'_>) -> Classification {
    let msg = input.error_message.unwrap_or("").to_lowercase();
    let snippet = input.page_content_snippet.unwrap_or("").to_lowercase();
    let hint = input.error_type_hint.unwrap_or("");

    if matches!(input.http_status, Some(401) | Some(403)) {
        return Classification::auth_required();
    }
    if input.http_status == Some(404) || hint == "NOT_FOUND" {
        return Classification::not_found();
    }
    if input.http_status == Some(429) {
        return Classification::rate_limited();
    }
    if input.http_status.is_some_and(|s| s >= 500) {
        return Classification::server_error();
    }
    if WAF_SIGNATURES.iter().any(|sig| snippet.contains(sig)) {
        return Classification::waf_challenge();
    }
    if CAPTCHA_SIGNATURES.iter().any(|sig| snippet.contains(sig)) {
        return Classification::bot_detected();
    }
    if TIMEOUT_PATTERNS.iter().any(|p| msg.contains(p)) {
        return Classification::timeout();
    }
    if CONNECT_ERROR_PATTERNS.iter().any(|p| msg.contains(p)) {
        return Classification::connect_error();
    }
    if hint == "NO_FORM_URL" {
        return Classification::no_form_url();
    }

    Classification::unknown()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_required_takes_precedence() {
        let c = classify_pure(ClassifyInput {
            http_status: Some(403),
            page_content_snippet: Some("Access Denied"),
            ..Default::default()
        });
        assert_eq!(c.code, FailureCode::AuthRequired);
    }

    #[test]
    fn waf_before_captcha() {
        let c = classify_pure(ClassifyInput {
            page_content_snippet: Some("Request blocked by WAF and g-recaptcha present"),
            ..Default::default()
        });
        assert_eq!(c.code, FailureCode::WafChallenge);
    }

    #[test]
    fn captcha_signature_detected() {
        let c = classify_pure(ClassifyInput {
            page_content_snippet: Some("Please solve the g-recaptcha challenge"),
            ..Default::default()
        });
        assert_eq!(c.code, FailureCode::BotDetected);
        assert_eq!(c.category, fsr_domain::FailureCategory::Bot);
    }

    #[test]
    fn timeout_message_detected() {
        let c = classify_pure(ClassifyInput {
            error_message: Some("Connection timed out after 30s"),
            ..Default::default()
        });
        assert_eq!(c.code, FailureCode::Timeout);
        assert!(c.retryable);
    }

    #[test]
    fn connect_error_detected() {
        let c = classify_pure(ClassifyInput {
            error_message: Some("dns lookup failed: Name or service not known"),
            ..Default::default()
        });
        assert_eq!(c.code, FailureCode::ConnectError);
    }

    #[test]
    fn no_form_url_hint() {
        let c = classify_pure(ClassifyInput {
            error_type_hint: Some("NO_FORM_URL"),
            ..Default::default()
        });
        assert_eq!(c.code, FailureCode::NoFormUrl);
        assert!(!c.retryable);
    }

    #[test]
    fn default_is_unknown_low_confidence() {
        let c = classify_pure(ClassifyInput::default());
        assert_eq!(c.code, FailureCode::Unknown);
        assert!(c.confidence <= 0.3);
    }

    #[test]
    fn classification_is_a_pure_function() {
        let input = ClassifyInput {
            http_status: Some(500),
            error_message: Some("internal error"),
            ..Default::default()
        };
        let a = classify_pure(input);
        let b = classify_pure(input);
        assert_eq!(a, b);
    }

    #[test]
    fn truncates_long_inputs_before_matching() {
        let long_prefix = "x".repeat(200);
        let msg = format!("{long_prefix} timed out");
        // The "timed out" marker falls past the 160-char truncation point,
        // so it must NOT be detected.
        let c = classify_pure(ClassifyInput {
            error_message: Some(&msg),
            ..Default::default()
        });
        assert_eq!(c.code, FailureCode::Unknown);
    }

    #[test]
    fn cache_returns_same_result_for_same_key() {
        let classifier = FailureClassifier::new();
        let input = ClassifyInput {
            http_status: Some(500),
            error_message: Some("boom"),
            ..Default::default()
        };
        let a = classifier.classify(input);
        let b = classifier.classify(input);
        assert_eq!(a, b);
        assert_eq!(classifier.cache_len(), 1);
    }

    #[test]
    fn cache_evicts_when_over_capacity() {
        let classifier = FailureClassifier::new();
        for i in 0..(MAX_CACHE_SIZE + 10) {
            let msg = format!("unique error {i}");
            classifier.classify(ClassifyInput {
                error_message: Some(&msg),
                ..Default::default()
            });
        }
        assert!(classifier.cache_len() <= MAX_CACHE_SIZE);
    }
}
