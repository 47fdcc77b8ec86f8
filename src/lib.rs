//! Client and scheduler for the KlokApp chat API.
//!
//! A [`Scheduler`](scheduler::Scheduler) owns a set of wallets. Each cycle it signs a wallet in
//! through the [`VerificationChain`](auth::VerificationChain), reads the wallet's remaining
//! message quota and spends part of it on scripted prompts. A
//! [`Registrar`](registration::Registrar) signs fresh wallets up under a referral code.

pub mod auth;
pub mod chat;
pub mod client;
pub mod config;
pub mod errors;
pub mod pacing;
pub mod questions;
pub mod quota;
pub mod registration;
pub mod scheduler;
pub mod stats;
pub mod types;
pub mod wallet;

pub use client::ChatClient;
pub use errors::{Error, Result};

pub const DEFAULT_BASE_URL: &str = "https://api1-pp.klokapp.ai/v1";
pub const DEFAULT_ORIGIN: &str = "https://klokapp.ai";
pub const DEFAULT_DOMAIN: &str = "klokapp.ai";
pub const DEFAULT_MODEL: &str = "llama-3.3-70b-instruct";
pub const DEFAULT_LANGUAGE: &str = "english";
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/133.0.0.0 Safari/537.36";

/// Header carrying the session token on authenticated calls.
pub const SESSION_HEADER: &str = "x-session-token";

pub const PRIVATE_KEYS_VAR: &str = "PRIVATE_KEYS";
pub const PRIVATE_KEY_VAR: &str = "PRIVATE_KEY";

/// Shortens an address for log output, e.g. `0x1234...abcd`.
#[must_use]
pub fn short_address(address: &alloy::primitives::Address) -> String {
    let full = address.to_string();
    format!("{}...{}", &full[..6], &full[full.len() - 4..])
}
