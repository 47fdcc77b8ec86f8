//! Wallet sign-in.
//!
//! The service has changed which captcha, if any, it demands on `verify` more than once. Rather
//! than betting on one, [`VerificationChain`] signs a single SIWE message and walks an ordered list
//! of [`VerificationStrategy`]s until one of them yields a session token.

mod siwe;
mod strategy;

pub use siwe::SiweMessage;
pub use strategy::{
    ChallengeVerification, DUMMY_RECAPTCHA_TOKENS, DummyCaptchaVerification,
    FALLBACK_RECAPTCHA_TOKEN, PlainVerification, RECAPTCHA_TOKEN_PATHS,
    RecaptchaEndpointVerification, VerificationStrategy,
};

use crate::types::{Session, VerifyRequest};
use crate::wallet::Wallet;
use crate::{ChatClient, Error, Result, short_address};

pub struct VerificationChain {
    strategies: Vec<Box<dyn VerificationStrategy>>,
    referral_code: Option<String>,
}

impl VerificationChain {
    #[must_use]
    pub fn new(strategies: Vec<Box<dyn VerificationStrategy>>) -> Self {
        Self {
            strategies,
            referral_code: None,
        }
    }

    #[must_use]
    pub fn with_referral_code(mut self, referral_code: Option<String>) -> Self {
        self.referral_code = referral_code;
        self
    }

    /// Chain used when signing up new accounts: the recaptcha endpoint lookup first, then the
    /// same methods as [`VerificationChain::default`].
    #[must_use]
    pub fn registration() -> Self {
        let mut chain = Self::default();
        chain
            .strategies
            .insert(0, Box::new(RecaptchaEndpointVerification::default()));
        chain
    }

    pub fn strategy_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.strategies.iter().map(|strategy| strategy.name())
    }

    /// Signs in `wallet`, trying each strategy in order until one succeeds.
    ///
    /// The message is signed once and the signature reused for every attempt. Individual
    /// strategy failures are logged and skipped; only exhausting the list is an error.
    pub async fn authenticate(&self, client: &ChatClient, wallet: &Wallet) -> Result<Session> {
        let address = wallet.address();
        let short = short_address(&address);
        let config = client.config();

        let message = SiweMessage::new(&config.domain, &config.origin, address).to_string();
        let signature = wallet.sign(&message).await?;
        let request = VerifyRequest::new(signature, message, self.referral_code.clone());

        for strategy in &self.strategies {
            tracing::debug!(wallet = %short, strategy = strategy.name(), "attempting verification");
            match strategy.attempt(client, &request).await {
                Ok(token) => {
                    tracing::info!(wallet = %short, strategy = strategy.name(), "verification succeeded");
                    return Ok(Session::new(address, token));
                }
                Err(e) => {
                    tracing::warn!(wallet = %short, strategy = strategy.name(), error = %e, "verification failed");
                }
            }
        }

        Err(Error::AuthExhausted {
            address: address.to_string(),
        })
    }
}

impl Default for VerificationChain {
    /// Direct, dummy recaptcha, hCaptcha, then Turnstile.
    fn default() -> Self {
        Self::new(vec![
            Box::new(PlainVerification),
            Box::new(DummyCaptchaVerification::default()),
            Box::new(ChallengeVerification::hcaptcha()),
            Box::new(ChallengeVerification::turnstile()),
        ])
    }
}
