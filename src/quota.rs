use chrono::{DateTime, TimeZone as _, Utc};
use reqwest::Method;
use serde::Deserialize;
use serde_json::Value;

use crate::types::QuotaSnapshot;
use crate::{ChatClient, Error, Result};

/// Epoch values above this are read as milliseconds rather than seconds.
const MILLIS_CUTOFF: i64 = 100_000_000_000;

#[derive(Debug, Deserialize)]
struct RateLimitResponse {
    #[serde(default)]
    remaining: Option<i64>,
    #[serde(default)]
    limit: Option<i64>,
    #[serde(default)]
    reset_time: Option<Value>,
}

impl ChatClient {
    /// Reads the session's message allowance.
    ///
    /// `premium_threshold` is the total allowance above which an account is treated as premium;
    /// the service itself does not expose plan tiers.
    pub async fn quota(&self, session_token: &str, premium_threshold: u32) -> Result<QuotaSnapshot> {
        let request = self.request(Method::GET, "rate-limit", Some(session_token))?;
        let (status_code, text) = Self::send(request).await?;
        if !status_code.is_success() {
            return Err(Error::QuotaQuery {
                status_code,
                message: text,
            });
        }

        let response: RateLimitResponse = serde_json::from_str(&text)?;
        let remaining = clamp(response.remaining);
        let total = clamp(response.limit);
        Ok(QuotaSnapshot {
            remaining,
            total,
            is_premium: total > premium_threshold,
            reset_at: response.reset_time.as_ref().and_then(parse_reset_time),
        })
    }
}

fn clamp(value: Option<i64>) -> u32 {
    value
        .unwrap_or_default()
        .clamp(0, i64::from(u32::MAX))
        .try_into()
        .unwrap_or_default()
}

fn parse_reset_time(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(text) => DateTime::parse_from_rfc3339(text)
            .map(|at| at.with_timezone(&Utc))
            .ok()
            .or_else(|| text.parse::<i64>().ok().and_then(from_epoch)),
        Value::Number(number) => number.as_i64().and_then(from_epoch),
        _ => None,
    }
}

fn from_epoch(epoch: i64) -> Option<DateTime<Utc>> {
    if epoch > MILLIS_CUTOFF {
        Utc.timestamp_millis_opt(epoch).single()
    } else {
        Utc.timestamp_opt(epoch, 0).single()
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone as _;
    use serde_json::json;

    use super::*;

    #[test]
    fn reset_time_accepts_rfc3339_and_epochs() {
        let expected = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();

        assert_eq!(parse_reset_time(&json!("2025-03-01T12:00:00Z")), Some(expected));
        assert_eq!(parse_reset_time(&json!(expected.timestamp())), Some(expected));
        assert_eq!(parse_reset_time(&json!(expected.timestamp_millis())), Some(expected));
        assert_eq!(parse_reset_time(&json!(expected.timestamp().to_string())), Some(expected));
        assert_eq!(parse_reset_time(&json!("tomorrow")), None);
        assert_eq!(parse_reset_time(&Value::Null), None);
    }

    #[test]
    fn negative_and_missing_counts_clamp_to_zero() {
        assert_eq!(clamp(Some(-3)), 0);
        assert_eq!(clamp(None), 0);
        assert_eq!(clamp(Some(42)), 42);
    }
}
