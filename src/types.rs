use std::time::Duration;

use alloy::primitives::Address;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A session token issued by `verify`, bound to one wallet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub address: Address,
    pub token: String,
    pub established_at: DateTime<Utc>,
}

impl Session {
    #[must_use]
    pub fn new(address: Address, token: String) -> Self {
        Self {
            address,
            token,
            established_at: Utc::now(),
        }
    }
}

/// A server-side conversation context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thread {
    pub address: Address,
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl Thread {
    #[must_use]
    pub fn new(address: Address) -> Self {
        Self {
            address,
            id: Uuid::new_v4(),
            created_at: Utc::now(),
        }
    }

    /// A thread is expired once it is strictly older than `max_age`.
    #[must_use]
    pub fn is_expired(&self, max_age: Duration, now: DateTime<Utc>) -> bool {
        let age = now.signed_duration_since(self.created_at);
        age.to_std().is_ok_and(|age| age > max_age)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaSnapshot {
    pub remaining: u32,
    pub total: u32,
    /// Derived from `total`, the service does not report plan tiers.
    pub is_premium: bool,
    pub reset_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct VerifyRequest {
    #[serde(rename = "signedMessage")]
    pub signed_message: String,
    pub message: String,
    pub referral_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recaptcha_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hcaptcha_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cf_turnstile_token: Option<String>,
}

impl VerifyRequest {
    #[must_use]
    pub fn new(signed_message: String, message: String, referral_code: Option<String>) -> Self {
        Self {
            signed_message,
            message,
            referral_code,
            recaptcha_token: None,
            hcaptcha_token: None,
            cf_turnstile_token: None,
        }
    }

    /// Copy of this request carrying `token` in the field `kind` expects.
    #[must_use]
    pub fn with_captcha(&self, kind: CaptchaKind, token: String) -> Self {
        let mut request = Self::new(
            self.signed_message.clone(),
            self.message.clone(),
            self.referral_code.clone(),
        );
        match kind {
            CaptchaKind::Recaptcha => request.recaptcha_token = Some(token),
            CaptchaKind::Hcaptcha => request.hcaptcha_token = Some(token),
            CaptchaKind::Turnstile => request.cf_turnstile_token = Some(token),
        }
        request
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptchaKind {
    Recaptcha,
    Hcaptcha,
    Turnstile,
}

impl CaptchaKind {
    /// Endpoint handing out a challenge token of this kind, if the service has one.
    #[must_use]
    pub fn challenge_path(self) -> Option<&'static str> {
        match self {
            Self::Recaptcha => None,
            Self::Hcaptcha => Some("hcaptcha"),
            Self::Turnstile => Some("turnstile"),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct VerifyResponse {
    pub session_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChallengeResponse {
    pub token: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage<'a> {
    pub role: &'static str,
    pub content: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest<'a> {
    pub id: String,
    pub title: &'static str,
    pub messages: Vec<ChatMessage<'a>>,
    pub sources: Vec<String>,
    pub model: &'a str,
    pub created_at: String,
    pub language: &'a str,
}
