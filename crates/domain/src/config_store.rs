//! Validates and normalizes the two-sheet campaign config produced upstream
//! (spreadsheet export, out of scope) into a [`CampaignProfile`].
//!
//! Grounded field-for-field on the original's `_validate_2sheet_config`:
//! the `client` section supplies sender identity, the `targeting` section
//! supplies scheduling/quota/message policy.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::profile::{CampaignPolicy, CampaignProfile, SenderProfile};

fn time_pattern() -> &'static Regex {
    static TIME_PATTERN: OnceLock<Regex> = OnceLock::new();
    TIME_PATTERN.get_or_init(|| Regex::new(r"^([01]\d|2[0-3]):([0-5]\d)$").expect("static regex"))
}

const CLIENT_REQUIRED_FIELDS: &[&str] = &[
    "company_name",
    "company_name_kana",
    "form_sender_name",
    "last_name",
    "first_name",
    "last_name_kana",
    "first_name_kana",
    "last_name_hiragana",
    "first_name_hiragana",
    "position",
    "gender",
    "email_1",
    "postal_code_1",
    "address_1",
    "address_2",
    "address_3",
    "phone_1",
];

const CLIENT_OPTIONAL_NOT_EMPTY: &[&str] =
    &["postal_code_2", "address_4", "phone_2", "phone_3", "email_2"];

const TARGETING_REQUIRED_FIELDS: &[&str] = &[
    "subject",
    "message",
    "max_daily_sends",
    "send_start_time",
    "send_end_time",
    "send_days_of_week",
];

/// Stateless validator/normalizer for the two-sheet config shape.
///
/// Does not cache: config loading happens once per worker startup (see
/// `ConfigResolver`), so the original's 300-second validation-result cache
/// has no analogous hot path here and is intentionally dropped (see
/// DESIGN.md).
pub struct ClientConfigStore;

impl ClientConfigStore {
    /// Validates `raw` (the parsed two-sheet JSON document) and converts it
    /// into a [`CampaignProfile`]. Returns [`Error::Config`] describing the
    /// first validation failure encountered.
    pub fn transform(raw: &Value) -> Result<CampaignProfile> {
        let obj = raw
            .as_object()
            .ok_or_else(|| Error::Config("config root is not an object".into()))?;

        let campaign_id = obj
            .get("targeting_id")
            .ok_or_else(|| Error::Config("missing required field 'targeting_id'".into()))?
            .as_i64()
            .ok_or_else(|| Error::Config("'targeting_id' must be an integer".into()))?;

        if obj.get("client_id").is_none() {
            return Err(Error::Config("missing required field 'client_id'".into()));
        }

        let client = obj
            .get("client")
            .ok_or_else(|| Error::Config("missing 'client' section".into()))?
            .as_object()
            .ok_or_else(|| Error::Config("'client' section is not an object".into()))?;

        let targeting = obj
            .get("targeting")
            .ok_or_else(|| Error::Config("missing 'targeting' section".into()))?
            .as_object()
            .ok_or_else(|| Error::Config("'targeting' section is not an object".into()))?;

        let missing_client: Vec<&str> = CLIENT_REQUIRED_FIELDS
            .iter()
            .copied()
            .filter(|f| is_blank(client.get(*f)))
            .collect();
        if !missing_client.is_empty() {
            return Err(Error::Config(format!(
                "client section missing required fields: {missing_client:?}"
            )));
        }

        for f in CLIENT_OPTIONAL_NOT_EMPTY {
            if client.contains_key(*f) && is_blank(client.get(*f)) {
                tracing::debug!(field = %f, "client optional field left blank");
            }
        }

        let missing_targeting: Vec<&str> = TARGETING_REQUIRED_FIELDS
            .iter()
            .copied()
            .filter(|f| targeting.get(*f).is_none() || targeting.get(*f) == Some(&Value::Null))
            .collect();
        if !missing_targeting.is_empty() {
            return Err(Error::Config(format!(
                "targeting section missing required fields: {missing_targeting:?}"
            )));
        }

        let send_start = string_field(targeting, "send_start_time")?;
        let send_end = string_field(targeting, "send_end_time")?;

        if !time_pattern().is_match(&send_start) {
            return Err(Error::Config(
                "targeting.send_start_time must be 'HH:MM'".into(),
            ));
        }
        if !time_pattern().is_match(&send_end) {
            return Err(Error::Config(
                "targeting.send_end_time must be 'HH:MM'".into(),
            ));
        }

        let days_raw = targeting
            .get("send_days_of_week")
            .and_then(Value::as_array)
            .ok_or_else(|| {
                Error::Config("targeting.send_days_of_week must be a list".into())
            })?;
        let mut days = Vec::with_capacity(days_raw.len());
        for d in days_raw {
            let n = d
                .as_i64()
                .ok_or_else(|| Error::Config("send_days_of_week entries must be integers".into()))?;
            if !(0..=6).contains(&n) {
                return Err(Error::Config(
                    "send_days_of_week entries must be 0-6".into(),
                ));
            }
            days.push(n as u8);
        }

        let max_daily_sends = targeting
            .get("max_daily_sends")
            .and_then(Value::as_i64)
            .ok_or_else(|| Error::Config("targeting.max_daily_sends must be an integer".into()))?;
        if max_daily_sends < 0 {
            return Err(Error::Config(
                "targeting.max_daily_sends must not be negative".into(),
            ));
        }

        let sender = SenderProfile {
            company_name: string_field(client, "company_name")?,
            company_name_kana: string_field(client, "company_name_kana")?,
            sender_name: string_field(client, "form_sender_name")?,
            last_name: string_field(client, "last_name")?,
            first_name: string_field(client, "first_name")?,
            last_name_kana: string_field(client, "last_name_kana")?,
            first_name_kana: string_field(client, "first_name_kana")?,
            last_name_hiragana: string_field(client, "last_name_hiragana")?,
            first_name_hiragana: string_field(client, "first_name_hiragana")?,
            position: string_field(client, "position")?,
            gender: string_field(client, "gender")?,
            email_1: string_field(client, "email_1")?,
            email_2: optional_string_field(client, "email_2"),
            postal_code_1: string_field(client, "postal_code_1")?,
            postal_code_2: optional_string_field(client, "postal_code_2"),
            address_1: string_field(client, "address_1")?,
            address_2: string_field(client, "address_2")?,
            address_3: string_field(client, "address_3")?,
            address_4: optional_string_field(client, "address_4"),
            phone_1: string_field(client, "phone_1")?,
            phone_2: optional_string_field(client, "phone_2"),
            phone_3: optional_string_field(client, "phone_3"),
        };

        let policy = CampaignPolicy {
            max_daily_sends: if max_daily_sends > 0 {
                Some(max_daily_sends as u32)
            } else {
                None
            },
            send_days_of_week: if days.is_empty() { None } else { Some(days) },
            send_start,
            send_end,
            subject: string_field(targeting, "subject")?,
            body: string_field(targeting, "message")?,
        };

        Ok(CampaignProfile {
            campaign_id,
            sender,
            policy,
        })
    }
}

fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        _ => false,
    }
}

fn string_field(obj: &serde_json::Map<String, Value>, field: &str) -> Result<String> {
    obj.get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| Error::Config(format!("field '{field}' must be a non-null string")))
}

fn optional_string_field(obj: &serde_json::Map<String, Value>, field: &str) -> Option<String> {
    obj.get(field).and_then(Value::as_str).map(str::to_string)
}
