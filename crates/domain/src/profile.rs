//! Campaign profile types.
//!
//! A `CampaignProfile` is the immutable, validated record a worker loads
//! once at startup: a stable campaign id, the sender identity used to fill
//! contact forms, and the scheduling/quota policy that gates when and how
//! much the worker is allowed to send.

use serde::{Deserialize, Serialize};

/// Validated campaign profile, exclusively owned by the worker that loaded it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CampaignProfile {
    pub campaign_id: i64,
    pub sender: SenderProfile,
    pub policy: CampaignPolicy,
}

/// Identity/address fields used to fill contact forms.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SenderProfile {
    pub company_name: String,
    pub company_name_kana: String,
    pub sender_name: String,
    pub last_name: String,
    pub first_name: String,
    pub last_name_kana: String,
    pub first_name_kana: String,
    pub last_name_hiragana: String,
    pub first_name_hiragana: String,
    pub position: String,
    pub gender: String,
    pub email_1: String,
    #[serde(default)]
    pub email_2: Option<String>,
    pub postal_code_1: String,
    #[serde(default)]
    pub postal_code_2: Option<String>,
    pub address_1: String,
    pub address_2: String,
    pub address_3: String,
    #[serde(default)]
    pub address_4: Option<String>,
    pub phone_1: String,
    #[serde(default)]
    pub phone_2: Option<String>,
    #[serde(default)]
    pub phone_3: Option<String>,
}

/// Scheduling and quota policy, plus the free-form message content.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CampaignPolicy {
    /// `None` means uncapped.
    #[serde(default)]
    pub max_daily_sends: Option<u32>,
    /// `None` means every day of the week is a send day.
    #[serde(default)]
    pub send_days_of_week: Option<Vec<u8>>,
    /// `HH:MM`, inclusive lower bound.
    pub send_start: String,
    /// `HH:MM`, exclusive upper bound.
    pub send_end: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub body: String,
}

impl CampaignPolicy {
    /// Minutes-of-day for `send_start`, or `None` if malformed.
    pub fn start_minutes(&self) -> Option<u32> {
        parse_hhmm(&self.send_start)
    }

    /// Minutes-of-day for `send_end`, or `None` if malformed.
    pub fn end_minutes(&self) -> Option<u32> {
        parse_hhmm(&self.send_end)
    }
}

/// Parse `HH:MM` into minutes-of-day. Returns `None` on any malformed input.
pub(crate) fn parse_hhmm(s: &str) -> Option<u32> {
    let (h, m) = s.split_once(':')?;
    let h: u32 = h.parse().ok()?;
    let m: u32 = m.parse().ok()?;
    if h > 23 || m > 59 {
        return None;
    }
    Some(h * 60 + m)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_hhmm_valid() {
        assert_eq!(parse_hhmm("09:30"), Some(9 * 60 + 30));
        assert_eq!(parse_hhmm("00:00"), Some(0));
        assert_eq!(parse_hhmm("23:59"), Some(23 * 60 + 59));
    }

    #[test]
    fn parse_hhmm_malformed() {
        assert_eq!(parse_hhmm("24:00"), None);
        assert_eq!(parse_hhmm("9:3"), Some(9 * 60 + 3));
        assert_eq!(parse_hhmm("not-a-time"), None);
        assert_eq!(parse_hhmm(""), None);
    }
}
