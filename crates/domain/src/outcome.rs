//! Result of a single company/form submission attempt.

use serde::{Deserialize, Serialize};

/// What a worker's form-submission attempt produced, before classification.
///
/// This is the contract boundary with the (out-of-scope) browser-automation
/// collaborator: the worker hands it a [`crate::company::Company`] and gets
/// one of these back.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum WorkOutcome {
    Success,
    Failure {
        #[serde(default)]
        error_type: Option<String>,
        #[serde(default)]
        error_message: Option<String>,
        #[serde(default)]
        http_status: Option<u16>,
        #[serde(default)]
        page_content_snippet: Option<String>,
        /// Set by the automation collaborator when it already recognized a
        /// WAF/CAPTCHA challenge page, independent of classifier string
        /// matching. See [`crate::classification`] for how this combines
        /// with classifier output.
        #[serde(default)]
        bot_protection_detected: bool,
    },
}

impl WorkOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, WorkOutcome::Success)
    }
}

/// Everything the classifier needs to turn a raw failure into a stable code.
///
/// Each field is truncated to 160 characters by the classifier before use
/// (spec'd cache-key and matching discipline); this type carries the raw
/// values as received from the outcome.
#[derive(Debug, Clone, Copy)]
pub struct ClassifyContext<'a> {
    pub error_message: Option<&'a str>,
    pub http_status: Option<u16>,
    pub error_type_hint: Option<&'a str>,
    pub page_content_snippet: Option<&'a str>,
    pub bot_protection_detected: bool,
}

impl<'a> ClassifyContext<'a> {
    /// Builds the classify input from a failed outcome. Returns `None` for a
    /// successful outcome, which has nothing to classify.
    pub fn from_outcome(outcome: &'a WorkOutcome) -> Option<Self> {
        match outcome {
            WorkOutcome::Success => None,
            WorkOutcome::Failure {
                error_type,
                error_message,
                http_status,
                page_content_snippet,
                bot_protection_detected,
            } => Some(ClassifyContext {
                error_message: error_message.as_deref(),
                http_status: *http_status,
                error_type_hint: error_type.as_deref(),
                page_content_snippet: page_content_snippet.as_deref(),
                bot_protection_detected: *bot_protection_detected,
            }),
        }
    }
}
