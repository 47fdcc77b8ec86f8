use async_trait::async_trait;

use crate::types::{CaptchaKind, VerifyRequest};
use crate::{ChatClient, Error, Result};

/// Recaptcha-shaped tokens the service has accepted without validating them.
pub const DUMMY_RECAPTCHA_TOKENS: &[&str] = &[
    "03AKH6MRHPV5S6TlaFdK3aGgJVkFELJvLwVcUlbRg0lymXwLWfLQqvZGqWQ8zYM5W2jsH9KKCU",
    "03AKH6MRHsRyFQDmQm8hCEKkJgYFr4WtMSlYfCcw4jOWTuL0h3KpV5vtdCeNaZZdFFFgFesrhFK",
    "03AKH6MRH2YFgm6BZb1NlYpeuBtW85Yif_0yYM1tLwfW88CnNfDwxRNmwQl5QGtYmIZXQ99vIVP",
];

/// Endpoints that have handed out recaptcha tokens to unauthenticated callers, tried in order.
pub const RECAPTCHA_TOKEN_PATHS: &[&str] =
    &["recaptcha", "recaptcha-token", "captcha", "auth/recaptcha", "token"];

/// Submitted when none of [`RECAPTCHA_TOKEN_PATHS`] yields a token.
pub const FALLBACK_RECAPTCHA_TOKEN: &str =
    "03AKH6MRHYFxkYVZeqJg9HM3ZkRHPl_5EH4Qh_M_OTGKBTSOKbmXXkZFEfdZkH_8E";

/// One way of turning a signed sign-in message into a session token.
#[async_trait]
pub trait VerificationStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// `request` carries the signature and message but no captcha token.
    async fn attempt(&self, client: &ChatClient, request: &VerifyRequest) -> Result<String>;
}

/// Submits the signed message as is.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainVerification;

#[async_trait]
impl VerificationStrategy for PlainVerification {
    fn name(&self) -> &'static str {
        "direct"
    }

    async fn attempt(&self, client: &ChatClient, request: &VerifyRequest) -> Result<String> {
        client.verify(request).await
    }
}

/// Resubmits with each of a fixed set of recaptcha tokens, in order.
#[derive(Debug, Clone)]
pub struct DummyCaptchaVerification {
    tokens: Vec<String>,
}

impl DummyCaptchaVerification {
    #[must_use]
    pub fn new(tokens: Vec<String>) -> Self {
        Self { tokens }
    }
}

impl Default for DummyCaptchaVerification {
    fn default() -> Self {
        Self::new(DUMMY_RECAPTCHA_TOKENS.iter().map(|t| (*t).to_owned()).collect())
    }
}

#[async_trait]
impl VerificationStrategy for DummyCaptchaVerification {
    fn name(&self) -> &'static str {
        "dummy-recaptcha"
    }

    async fn attempt(&self, client: &ChatClient, request: &VerifyRequest) -> Result<String> {
        let mut last_error = Error::MissingCredential;
        for token in &self.tokens {
            let request = request.with_captcha(CaptchaKind::Recaptcha, token.clone());
            match client.verify(&request).await {
                Ok(session) => return Ok(session),
                Err(e) => {
                    tracing::debug!(error = %e, "dummy recaptcha token rejected");
                    last_error = e;
                }
            }
        }
        Err(last_error)
    }
}

/// Fetches a challenge token from the service and submits it alongside the message.
#[derive(Debug, Clone, Copy)]
pub struct ChallengeVerification {
    kind: CaptchaKind,
}

impl ChallengeVerification {
    #[must_use]
    pub fn hcaptcha() -> Self {
        Self {
            kind: CaptchaKind::Hcaptcha,
        }
    }

    #[must_use]
    pub fn turnstile() -> Self {
        Self {
            kind: CaptchaKind::Turnstile,
        }
    }
}

#[async_trait]
impl VerificationStrategy for ChallengeVerification {
    fn name(&self) -> &'static str {
        match self.kind {
            CaptchaKind::Hcaptcha => "hcaptcha",
            CaptchaKind::Turnstile => "turnstile",
            CaptchaKind::Recaptcha => "recaptcha",
        }
    }

    async fn attempt(&self, client: &ChatClient, request: &VerifyRequest) -> Result<String> {
        let token = client.challenge_token(self.kind).await?;
        client.verify(&request.with_captcha(self.kind, token)).await
    }
}

/// Looks for a recaptcha token on the service's own endpoints and submits the first one found,
/// or a fallback token when every endpoint comes up empty.
#[derive(Debug, Clone)]
pub struct RecaptchaEndpointVerification {
    paths: Vec<&'static str>,
    fallback: String,
}

impl RecaptchaEndpointVerification {
    #[must_use]
    pub fn new(paths: Vec<&'static str>, fallback: impl Into<String>) -> Self {
        Self {
            paths,
            fallback: fallback.into(),
        }
    }

    async fn find_token(&self, client: &ChatClient) -> String {
        for &path in &self.paths {
            match client.fetch_token(path).await {
                Ok(token) => {
                    tracing::debug!(path, "recaptcha token found");
                    return token;
                }
                Err(e) => tracing::debug!(path, error = %e, "no recaptcha token"),
            }
        }
        tracing::debug!("no endpoint issued a recaptcha token, using fallback");
        self.fallback.clone()
    }
}

impl Default for RecaptchaEndpointVerification {
    fn default() -> Self {
        Self::new(RECAPTCHA_TOKEN_PATHS.to_vec(), FALLBACK_RECAPTCHA_TOKEN)
    }
}

#[async_trait]
impl VerificationStrategy for RecaptchaEndpointVerification {
    fn name(&self) -> &'static str {
        "recaptcha-endpoint"
    }

    async fn attempt(&self, client: &ChatClient, request: &VerifyRequest) -> Result<String> {
        let token = self.find_token(client).await;
        client.verify(&request.with_captcha(CaptchaKind::Recaptcha, token)).await
    }
}
