//! The unit of work a worker claims and finalizes.

use serde::{Deserialize, Serialize};

/// A single company/target record claimed from the shared queue.
///
/// `form_url` is optional: rows without one are rejected by the worker
/// before any network call is attempted (see [`crate::outcome::WorkOutcome`]).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Company {
    pub company_id: i64,
    #[serde(default)]
    pub form_url: Option<String>,
    #[serde(default)]
    pub company_name: Option<String>,
}

impl Company {
    pub fn has_form_url(&self) -> bool {
        self.form_url.as_deref().is_some_and(|s| !s.trim().is_empty())
    }
}
