use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use derive_builder::Builder;
use url::Url;

use crate::errors::Error;
use crate::types::QuotaSnapshot;
use crate::{
    DEFAULT_BASE_URL, DEFAULT_DOMAIN, DEFAULT_LANGUAGE, DEFAULT_MODEL, DEFAULT_ORIGIN,
    DEFAULT_USER_AGENT, PRIVATE_KEY_VAR, PRIVATE_KEYS_VAR, Result,
};

const CONSERVATIVE_CAP: u32 = 3;
const ADAPTIVE_FREE_CAP: u32 = 5;
const ADAPTIVE_HIGH_WATERMARK: u32 = 20;

/// How much of the remaining quota one cycle spends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ScheduleMode {
    /// Everything that is left.
    Aggressive,
    /// At most three messages.
    Conservative,
    /// Half of the quota for premium or large allowances, otherwise up to five.
    #[default]
    Adaptive,
}

impl ScheduleMode {
    /// Number of messages to send this cycle. Never exceeds `quota.remaining`.
    #[must_use]
    pub fn chat_count(self, quota: &QuotaSnapshot) -> u32 {
        let remaining = quota.remaining;
        match self {
            Self::Aggressive => remaining,
            Self::Conservative => remaining.min(CONSERVATIVE_CAP),
            Self::Adaptive => {
                if quota.is_premium || remaining > ADAPTIVE_HIGH_WATERMARK {
                    remaining.div_ceil(2)
                } else {
                    remaining.min(ADAPTIVE_FREE_CAP)
                }
            }
        }
    }
}

impl FromStr for ScheduleMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "aggressive" => Ok(Self::Aggressive),
            "conservative" => Ok(Self::Conservative),
            "adaptive" => Ok(Self::Adaptive),
            other => Err(Error::Validation(format!("unknown schedule mode `{other}`"))),
        }
    }
}

impl fmt::Display for ScheduleMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Aggressive => "aggressive",
            Self::Conservative => "conservative",
            Self::Adaptive => "adaptive",
        };
        f.write_str(name)
    }
}

/// HTTP-level settings shared by every request.
#[derive(Debug, Clone, Builder)]
#[builder(default, setter(into), build_fn(error = "Error"))]
pub struct ClientConfig {
    /// Sent as `origin`, `referer` and used as the SIWE `URI`.
    pub origin: String,
    /// SIWE domain line.
    pub domain: String,
    pub user_agent: String,
    pub model: String,
    pub language: String,
    #[builder(setter(strip_option))]
    pub proxy: Option<Url>,
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            origin: DEFAULT_ORIGIN.to_owned(),
            domain: DEFAULT_DOMAIN.to_owned(),
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            model: DEFAULT_MODEL.to_owned(),
            language: DEFAULT_LANGUAGE.to_owned(),
            proxy: None,
            timeout: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone, Builder)]
#[builder(default, build_fn(error = "Error"))]
pub struct SchedulerConfig {
    pub schedule_mode: ScheduleMode,
    /// Keep one conversation thread per wallet across messages and cycles.
    pub persistent_threads: bool,
    pub message_delay_min: Duration,
    pub message_delay_max: Duration,
    pub max_thread_age: Duration,
    /// Pause after each wallet's turn.
    pub wallet_delay: Duration,
    /// Pause after a full pass over all wallets.
    pub pass_delay: Duration,
    /// Accounts whose total allowance exceeds this are treated as premium.
    pub premium_threshold: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            schedule_mode: ScheduleMode::default(),
            persistent_threads: true,
            message_delay_min: Duration::from_millis(5_000),
            message_delay_max: Duration::from_millis(10_000),
            max_thread_age: Duration::from_secs(24 * 60 * 60),
            wallet_delay: Duration::from_millis(5_000),
            pass_delay: Duration::from_secs(5 * 60),
            premium_threshold: 10,
        }
    }
}

impl SchedulerConfig {
    pub(crate) fn validate(&self) -> Result<()> {
        if self.message_delay_min > self.message_delay_max {
            return Err(Error::Validation(format!(
                "message delay window is inverted: {:?} > {:?}",
                self.message_delay_min, self.message_delay_max
            )));
        }
        Ok(())
    }
}

/// Everything the `klokbot` binary reads from the environment.
#[derive(Debug, Clone)]
pub struct Settings {
    pub base_url: String,
    pub client: ClientConfig,
    pub scheduler: SchedulerConfig,
    pub referral_code: Option<String>,
    pub private_keys: Vec<String>,
}

impl Settings {
    /// Reads settings from process environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).map(|v| v.trim().to_owned()).filter(|v| !v.is_empty());

        let mut scheduler = SchedulerConfig::default();
        if let Some(mode) = var("SCHEDULE_MODE") {
            scheduler.schedule_mode = mode.parse()?;
        }
        if let Some(persistent) = var("PERSISTENT_THREADS") {
            scheduler.persistent_threads = !persistent.eq_ignore_ascii_case("false");
        }
        if let Some(ms) = var("MIN_CHAT_INTERVAL") {
            scheduler.message_delay_min = parse_millis("MIN_CHAT_INTERVAL", &ms)?;
        }
        if let Some(ms) = var("MAX_CHAT_DELAY") {
            scheduler.message_delay_max = parse_millis("MAX_CHAT_DELAY", &ms)?;
        }
        if let Some(ms) = var("MAX_THREAD_AGE") {
            scheduler.max_thread_age = parse_millis("MAX_THREAD_AGE", &ms)?;
        }
        if let Some(threshold) = var("PREMIUM_THRESHOLD") {
            scheduler.premium_threshold = threshold.parse().map_err(|_| {
                Error::Validation(format!("PREMIUM_THRESHOLD must be an integer, got `{threshold}`"))
            })?;
        }
        scheduler.validate()?;

        let mut client = ClientConfig::default();
        if let Some(proxy) = var("PROXY_URL") {
            client.proxy = Some(Url::parse(&proxy)?);
        }

        let private_keys = var(PRIVATE_KEYS_VAR)
            .or_else(|| var(PRIVATE_KEY_VAR))
            .map(|keys| {
                keys.split(',')
                    .map(str::trim)
                    .filter(|key| !key.is_empty())
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            base_url: var("BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_owned()),
            client,
            scheduler,
            referral_code: var("REFERRAL_CODE"),
            private_keys,
        })
    }
}

fn parse_millis(name: &str, value: &str) -> Result<Duration> {
    value
        .parse::<u64>()
        .map(Duration::from_millis)
        .map_err(|_| Error::Validation(format!("{name} must be milliseconds, got `{value}`")))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn quota(remaining: u32, is_premium: bool) -> QuotaSnapshot {
        QuotaSnapshot {
            remaining,
            total: remaining,
            is_premium,
            reset_at: None,
        }
    }

    #[test]
    fn chat_count_per_mode() {
        assert_eq!(ScheduleMode::Conservative.chat_count(&quota(7, false)), 3);
        assert_eq!(ScheduleMode::Aggressive.chat_count(&quota(7, false)), 7);
        assert_eq!(ScheduleMode::Adaptive.chat_count(&quota(30, true)), 15);
        assert_eq!(ScheduleMode::Adaptive.chat_count(&quota(4, false)), 4);
        assert_eq!(ScheduleMode::Adaptive.chat_count(&quota(10, false)), 5);
        assert_eq!(ScheduleMode::Adaptive.chat_count(&quota(21, false)), 11);
        assert_eq!(ScheduleMode::Adaptive.chat_count(&quota(1, true)), 1);
    }

    #[test]
    fn chat_count_never_exceeds_remaining() {
        for mode in [
            ScheduleMode::Aggressive,
            ScheduleMode::Conservative,
            ScheduleMode::Adaptive,
        ] {
            for remaining in 0..64 {
                for premium in [false, true] {
                    assert!(mode.chat_count(&quota(remaining, premium)) <= remaining);
                }
            }
        }
    }

    #[test]
    fn schedule_mode_parses_case_insensitively() {
        assert_eq!("Aggressive".parse::<ScheduleMode>().unwrap(), ScheduleMode::Aggressive);
        assert!("turbo".parse::<ScheduleMode>().is_err());
    }

    #[test]
    fn settings_from_lookup() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("SCHEDULE_MODE", "conservative"),
            ("PERSISTENT_THREADS", "false"),
            ("MIN_CHAT_INTERVAL", "1000"),
            ("MAX_CHAT_DELAY", "2000"),
            ("PRIVATE_KEYS", "0xaa, 0xbb ,"),
            ("REFERRAL_CODE", "ABC123"),
        ]);
        let settings = Settings::from_lookup(|k| env.get(k).map(|v| (*v).to_owned())).unwrap();

        assert_eq!(settings.scheduler.schedule_mode, ScheduleMode::Conservative);
        assert!(!settings.scheduler.persistent_threads);
        assert_eq!(settings.scheduler.message_delay_min, Duration::from_millis(1000));
        assert_eq!(settings.scheduler.message_delay_max, Duration::from_millis(2000));
        assert_eq!(settings.private_keys, vec!["0xaa", "0xbb"]);
        assert_eq!(settings.referral_code.as_deref(), Some("ABC123"));
        assert_eq!(settings.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn inverted_delay_window_is_rejected() {
        let env = HashMap::from([("MIN_CHAT_INTERVAL", "9000"), ("MAX_CHAT_DELAY", "100")]);
        let result = Settings::from_lookup(|k| env.get(k).map(|v| (*v).to_owned()));

        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[test]
    fn builder_fills_defaults() {
        let config = SchedulerConfigBuilder::default()
            .schedule_mode(ScheduleMode::Aggressive)
            .build()
            .unwrap();

        assert_eq!(config.schedule_mode, ScheduleMode::Aggressive);
        assert!(config.persistent_threads);
        assert_eq!(config.premium_threshold, 10);
    }
}
