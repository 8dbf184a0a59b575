//! `BusinessHoursGate`: a pure `(policy, now)` → open/closed decision
//! (spec.md §4.6).
//!
//! Grounded on the original's `_within_business_hours` and structurally on
//! `sa-sessions::lifecycle::LifecycleManager::should_reset`'s pure
//! `(config, now)` evaluation shape — no I/O, no clock access beyond the
//! `now` argument the caller supplies exactly once per decision.

use chrono_tz::Tz;
use fsr_domain::CampaignPolicy;

/// Evaluate whether `policy` allows sending at `now_jst`.
///
/// Fails open (returns `true`) on malformed weekday/time fields, matching
/// the original's fail-safe default for benign policy gaps (spec.md §4.6).
pub fn is_open(policy: &CampaignPolicy, now_jst: chrono::DateTime<Tz>) -> bool {
    use chrono::{Datelike, Timelike};

    if let Some(days) = &policy.send_days_of_week {
        if !days.is_empty() {
            // chrono's `weekday().num_days_from_monday()` is already
            // 0=Monday..6=Sunday, matching spec.md's Python-compatible
            // convention.
            let weekday = now_jst.weekday().num_days_from_monday() as u8;
            if !days.contains(&weekday) {
                return false;
            }
        }
    }

    let (Some(start), Some(end)) = (policy.start_minutes(), policy.end_minutes()) else {
        return true;
    };

    let now_minutes = now_jst.hour() * 60 + now_jst.minute();
    start <= now_minutes && now_minutes < end
}
