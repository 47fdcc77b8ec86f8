#![allow(dead_code, reason = "each test binary uses a different subset")]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use httpmock::MockServer;
use httpmock::prelude::HttpMockRequest;
use klokapp_client_sdk::auth::VerificationChain;
use klokapp_client_sdk::config::{ClientConfig, SchedulerConfig};
use klokapp_client_sdk::pacing::{NoSleep, RandomSource, Sleeper};
use klokapp_client_sdk::scheduler::Scheduler;
use klokapp_client_sdk::wallet::Wallet;
use klokapp_client_sdk::{ChatClient, Result};

// Well-known development keys; never hold funds.
pub const PRIVATE_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
pub const SECOND_PRIVATE_KEY: &str =
    "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";

pub const SESSION_TOKEN: &str = "session-a";
pub const SECOND_SESSION_TOKEN: &str = "session-b";

pub fn client(server: &MockServer) -> Result<ChatClient> {
    ChatClient::new(&server.base_url(), ClientConfig::default())
}

pub fn wallet(key: &str) -> Result<Wallet> {
    Wallet::from_private_key(key)
}

/// Scheduler with no delays and a fixed random source, built around `wallets`.
pub fn scheduler(server: &MockServer, wallets: Vec<Wallet>, config: SchedulerConfig) -> Result<Scheduler> {
    Ok(Scheduler::new(client(server)?, VerificationChain::default(), wallets, config)?
        .with_sleeper(NoSleep)
        .with_random(ScriptedRandom::default()))
}

/// True when a `verify` body carries any captcha field.
pub fn carries_captcha(req: &HttpMockRequest) -> bool {
    req.body
        .as_deref()
        .map(String::from_utf8_lossy)
        .is_some_and(|body| {
            body.contains("recaptcha_token")
                || body.contains("hcaptcha_token")
                || body.contains("cf_turnstile_token")
        })
}

/// Replays scripted indices (then zeros) and always picks the low end of delay windows.
#[derive(Debug, Default)]
pub struct ScriptedRandom {
    indices: VecDeque<usize>,
}

impl ScriptedRandom {
    pub fn new(indices: impl IntoIterator<Item = usize>) -> Self {
        Self {
            indices: indices.into_iter().collect(),
        }
    }
}

impl RandomSource for ScriptedRandom {
    fn index(&mut self, len: usize) -> usize {
        self.indices.pop_front().unwrap_or(0) % len
    }

    fn duration_between(&mut self, min: Duration, _max: Duration) -> Duration {
        min
    }
}

/// Records every requested sleep without waiting.
#[derive(Debug, Clone, Default)]
pub struct RecordingSleeper {
    slept: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingSleeper {
    pub fn recorded(&self) -> Vec<Duration> {
        self.slept.lock().map(|slept| slept.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        if let Ok(mut slept) = self.slept.lock() {
            slept.push(duration);
        }
    }
}
